use anyhow::Error;
use common::{Decoder, Frame, FrameEncoding, OutboundPacket};
use log::{debug, warn};
use std::collections::VecDeque;

#[cfg(feature = "pi")]
use rppal::uart::{Parity, Uart};
#[cfg(feature = "pi")]
use std::time::Duration;

#[cfg(feature = "pi")]
use crate::config::SerialConfig;

#[cfg(feature = "bench")]
mod stdio;
#[cfg(feature = "bench")]
pub use stdio::StdioPort;

/// Bytes read per poll
const READ_CHUNK: usize = 64;

/// Raw byte transport to the controller board.
pub trait SerialPort: Send {
    /// Read whatever is available without blocking. `Ok(0)` means nothing
    /// arrived yet.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error>;
}

/// Where outbound frames go. Fire-and-forget: the result only says whether
/// the bytes left, never whether anyone read them.
pub trait FrameOutput {
    fn send(&mut self, packet: &OutboundPacket) -> bool;
}

/// Frames over a serial port: decodes inbound bytes into frames and encodes
/// outbound packets, both in the configured framing.
pub struct FrameLink<P> {
    port: P,
    encoding: FrameEncoding,
    decoder: Decoder,
    /// Bytes already read but not yet fed to the decoder
    backlog: VecDeque<u8>,
}

impl<P: SerialPort> FrameLink<P> {
    pub fn new(port: P, encoding: FrameEncoding) -> Self {
        Self {
            port,
            encoding,
            decoder: Decoder::new(encoding),
            backlog: VecDeque::with_capacity(READ_CHUNK),
        }
    }

    /// Returns at most one frame. Bytes after the end of that frame stay
    /// buffered for the next call.
    pub fn poll_frame(&mut self) -> Option<Frame> {
        if self.backlog.is_empty() {
            let mut buf = [0u8; READ_CHUNK];
            match self.port.read(&mut buf) {
                Ok(n) => self.backlog.extend(&buf[..n]),
                Err(e) => {
                    warn!("Serial read failed: {}", e);
                    return None;
                }
            }
        }

        while let Some(byte) = self.backlog.pop_front() {
            if let Some(packet) = self.decoder.push(byte) {
                debug!("<- {}", packet.tag());
                return Some(Frame::from_packet(&packet));
            }
        }
        None
    }

    pub fn encoding(&self) -> FrameEncoding {
        self.encoding
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}

impl<P: SerialPort> FrameOutput for FrameLink<P> {
    fn send(&mut self, packet: &OutboundPacket) -> bool {
        let bytes = common::encode(self.encoding, packet);
        match self.port.write_all(&bytes) {
            Ok(()) => {
                debug!("-> {} ({} bytes)", packet.tag(), bytes.len());
                true
            }
            Err(e) => {
                warn!("Failed to send {} frame: {}", packet.tag(), e);
                false
            }
        }
    }
}

/// The Pi's primary UART
#[cfg(feature = "pi")]
pub struct PiUart {
    uart: Uart,
}

#[cfg(feature = "pi")]
impl PiUart {
    pub fn open(config: &SerialConfig) -> Result<Self, Error> {
        let mut uart = Uart::with_path(&config.path, config.baud, Parity::None, 8, 1)?;

        // Reads return immediately with whatever is buffered
        uart.set_read_mode(0, Duration::ZERO)?;
        uart.set_write_mode(true)?;

        Ok(PiUart { uart })
    }
}

#[cfg(feature = "pi")]
impl SerialPort for PiUart {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        Ok(self.uart.read(buf)?)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let mut written = 0;
        while written < bytes.len() {
            written += self.uart.write(&bytes[written..])?;
        }
        Ok(())
    }
}
