use anyhow::Error;
use log::{error, info};
use std::io::{Read, Write};
use tokio::sync::mpsc;

use super::SerialPort;

/// Bench transport: stdin stands in for the controller's TX line, stdout for
/// its RX line.
pub struct StdioPort {
    inbound: mpsc::Receiver<Vec<u8>>,
    /// Tail of a chunk that did not fit the caller's buffer
    pending: Vec<u8>,
}

impl StdioPort {
    /// Start a reader thread on stdin. A plain thread rather than a task so
    /// a blocked read never holds up runtime shutdown.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(100);

        std::thread::spawn(move || {
            let mut stdin = std::io::stdin();
            let mut buf = [0u8; 256];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => {
                        info!("stdin closed");
                        break;
                    }
                    Ok(n) => {
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to read stdin: {}", e);
                        break;
                    }
                }
            }
        });

        Self {
            inbound: rx,
            pending: Vec::new(),
        }
    }
}

impl SerialPort for StdioPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if self.pending.is_empty() {
            match self.inbound.try_recv() {
                Ok(chunk) => self.pending = chunk,
                // Empty or reader gone, either way nothing to hand out
                Err(_) => return Ok(0),
            }
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(bytes)?;
        stdout.flush()?;
        Ok(())
    }
}
