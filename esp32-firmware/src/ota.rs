//! Network firmware updates.
//!
//! Once armed, a listener thread accepts one image at a time on
//! [`UPDATE_PORT`]: a little-endian `u32` length followed by that many bytes
//! of application image, written straight into the next OTA slot. The thread
//! only queues lifecycle events; the control loop replays them through its
//! hooks and restarts the chip after a good image.

use anyhow::{bail, Context, Result};
use esp_idf_svc::ota::EspOta;
use std::{
    collections::VecDeque,
    io::Read,
    net::{TcpListener, TcpStream},
    sync::{Arc, Mutex},
    thread,
};
use turret_link::update::{UpdateError, UpdateEvent, UpdateHooks, UpdateService, UpdateTarget};

use crate::{error, info, warn};

pub const UPDATE_PORT: u16 = 3232;

const CHUNK_SIZE: usize = 4096;

type EventQueue = Arc<Mutex<VecDeque<UpdateEvent>>>;

#[derive(Default)]
pub struct NetworkUpdates {
    events: EventQueue,
    listening: bool,
}

impl NetworkUpdates {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UpdateService for NetworkUpdates {
    fn arm(&mut self) {
        // Reconnects keep the listener from the first link
        if self.listening {
            return;
        }

        let events = self.events.clone();
        let spawned = thread::Builder::new()
            .name("ota".into())
            .stack_size(8 * 1024)
            .spawn(move || {
                if let Err(e) = listen(&events) {
                    error!("Update listener stopped: {:#}", e);
                }
            });

        match spawned {
            Ok(_) => {
                self.listening = true;
                info!("Listening for updates on port {}", UPDATE_PORT);
            }
            Err(e) => error!("Could not start update listener: {}", e),
        }
    }

    fn handle(&mut self, hooks: &mut dyn UpdateHooks) {
        let pending: Vec<_> = match self.events.lock() {
            Ok(mut events) => events.drain(..).collect(),
            Err(_) => return,
        };

        for event in pending {
            event.deliver(hooks);
            if event == UpdateEvent::Complete {
                info!("Restarting into new firmware");
                unsafe {
                    esp_idf_sys::esp_restart();
                }
            }
        }
    }
}

fn push(events: &EventQueue, event: UpdateEvent) {
    if let Ok(mut events) = events.lock() {
        events.push_back(event);
    }
}

fn listen(events: &EventQueue) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", UPDATE_PORT))?;

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Update connection failed: {}", e);
                push(events, UpdateEvent::Error(UpdateError::Connect));
                continue;
            }
        };

        match receive(stream, events) {
            Ok(()) => {
                push(events, UpdateEvent::Complete);
                // The control loop restarts us; nothing else to accept
                return Ok(());
            }
            Err((kind, e)) => {
                warn!("Update failed: {:#}", e);
                push(events, UpdateEvent::Error(kind));
            }
        }
    }
    Ok(())
}

fn receive(
    mut stream: TcpStream,
    events: &EventQueue,
) -> std::result::Result<(), (UpdateError, anyhow::Error)> {
    let mut header = [0u8; 4];
    stream
        .read_exact(&mut header)
        .context("reading image length")
        .map_err(|e| (UpdateError::Begin, e))?;
    let total = u32::from_le_bytes(header);

    let mut ota = EspOta::new()
        .context("opening OTA partitions")
        .map_err(|e| (UpdateError::Begin, e))?;
    let mut update = ota
        .initiate_update()
        .context("Failed to initiate OTA update")
        .map_err(|e| (UpdateError::Begin, e))?;

    push(events, UpdateEvent::Start(UpdateTarget::Firmware));

    let mut buffer = [0u8; CHUNK_SIZE];
    let mut done = 0u32;
    let copied = (|| -> Result<()> {
        while done < total {
            let want = CHUNK_SIZE.min((total - done) as usize);
            let n = stream.read(&mut buffer[..want])?;
            if n == 0 {
                bail!("sender closed after {} of {} bytes", done, total);
            }
            update
                .write(&buffer[..n])
                .context("Failed to write to OTA partition")?;
            done += n as u32;
            push(events, UpdateEvent::Progress { done, total });
        }
        Ok(())
    })();

    if let Err(e) = copied {
        if let Err(abort) = update.abort() {
            warn!("Could not abort update: {}", abort);
        }
        return Err((UpdateError::Receive, e));
    }

    update
        .complete()
        .context("Failed to complete OTA update")
        .map_err(|e| (UpdateError::End, e))
}
