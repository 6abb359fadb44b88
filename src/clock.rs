use std::time::{Duration, Instant};

/// Time source for everything that waits or measures uptime.
pub trait Clock: Send + Sync {
    /// Milliseconds since boot
    fn now_ms(&self) -> u64;
    fn sleep_ms(&self, ms: u64);
}

/// Wall clock backed by `Instant`, counting from construction.
#[derive(Debug)]
pub struct SystemClock {
    boot: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.boot.elapsed().as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(Duration::from_millis(ms));
    }
}
