use turret_link::services::StreamingService;

use crate::info;

#[cfg(feature = "camera")]
extern "C" {
    /// From the esp32-camera web server component
    fn startCameraServer();
}

/// MJPEG stream server on the camera module
#[derive(Default)]
pub struct CameraServer {
    started: bool,
}

impl StreamingService for CameraServer {
    fn start_streaming(&mut self) {
        // The server keeps running across reconnects
        if self.started {
            info!("Camera server already running");
            return;
        }

        #[cfg(feature = "camera")]
        {
            unsafe { startCameraServer() };
            self.started = true;
            info!("Camera server started");
        }

        #[cfg(not(feature = "camera"))]
        crate::warn!("Built without the camera component, not streaming");
    }
}
