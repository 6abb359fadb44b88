//! Firmware update lifecycle.
//!
//! The update collaborator owns the transfer itself. The node arms it once a
//! link is up and gives it a slice of time on every loop iteration, handing
//! it a set of hooks to report what happened.

use log::{error, info};
use std::fmt;

/// What an update is going to overwrite
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateTarget {
    Firmware,
    Filesystem,
}

impl fmt::Display for UpdateTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateTarget::Firmware => write!(f, "sketch"),
            UpdateTarget::Filesystem => write!(f, "filesystem"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateError {
    Auth,
    Begin,
    Connect,
    Receive,
    End,
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            UpdateError::Auth => "Auth Failed",
            UpdateError::Begin => "Begin Failed",
            UpdateError::Connect => "Connect Failed",
            UpdateError::Receive => "Receive Failed",
            UpdateError::End => "End Failed",
        };
        write!(f, "{}", message)
    }
}

impl std::error::Error for UpdateError {}

/// Callbacks an update service reports through
pub trait UpdateHooks {
    fn on_start(&mut self, target: UpdateTarget);
    fn on_progress(&mut self, done: u32, total: u32);
    fn on_error(&mut self, error: UpdateError);
    fn on_complete(&mut self);
}

/// A lifecycle event, for services that collect events on another thread
/// and replay them from `handle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateEvent {
    Start(UpdateTarget),
    Progress { done: u32, total: u32 },
    Error(UpdateError),
    Complete,
}

impl UpdateEvent {
    pub fn deliver(self, hooks: &mut dyn UpdateHooks) {
        match self {
            UpdateEvent::Start(target) => hooks.on_start(target),
            UpdateEvent::Progress { done, total } => hooks.on_progress(done, total),
            UpdateEvent::Error(e) => hooks.on_error(e),
            UpdateEvent::Complete => hooks.on_complete(),
        }
    }
}

pub trait UpdateService: Send {
    /// Start listening for updates. Called on every transition to Connected.
    fn arm(&mut self);

    /// Do a bounded amount of update work and report it through `hooks`.
    fn handle(&mut self, hooks: &mut dyn UpdateHooks);
}

/// Update service for builds without update support
#[derive(Debug, Default)]
pub struct NoUpdates;

impl UpdateService for NoUpdates {
    fn arm(&mut self) {}

    fn handle(&mut self, _hooks: &mut dyn UpdateHooks) {}
}

/// Completed share of a transfer, 0..=100. An unknown total reads as 0.
pub fn percent(done: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((u64::from(done) * 100) / u64::from(total)).min(100) as u32
}

/// Default hooks: log every lifecycle step.
#[derive(Debug, Default)]
pub struct LoggingHooks {
    last_percent: Option<u32>,
}

impl UpdateHooks for LoggingHooks {
    fn on_start(&mut self, target: UpdateTarget) {
        self.last_percent = None;
        info!("Start updating {}", target);
    }

    fn on_progress(&mut self, done: u32, total: u32) {
        let now = percent(done, total);
        // One line per percent, not per chunk
        if self.last_percent != Some(now) {
            self.last_percent = Some(now);
            info!("Progress: {}%", now);
        }
    }

    fn on_error(&mut self, error: UpdateError) {
        error!("Update error: {}", error);
    }

    fn on_complete(&mut self) {
        info!("Update complete");
    }
}
