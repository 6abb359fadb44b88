//! The camera node's control loop and the state it owns.

use log::{debug, info};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    clock::Clock,
    config::Config,
    credentials::CredentialStore,
    dispatch::{CommandDispatcher, DispatchOutcome},
    lights::{ActuatorState, DigitalOutput},
    link::{FallbackTimer, LinkManager, LinkState},
    report::StatusReporter,
    services::{NetworkAssociation, StreamingService},
    uart::{FrameLink, SerialPort},
    update::{LoggingHooks, UpdateHooks, UpdateService},
};

/// Everything the control loop mutates. Only ever touched from the loop
/// thread, so nothing here is locked.
#[derive(Clone, Debug, Default)]
pub struct NodeContext {
    pub credentials: CredentialStore,
    pub link_state: LinkState,
    pub fallback: FallbackTimer,
    pub actuators: ActuatorState,
}

/// Hardware and services a node is built from
pub struct Collaborators<P> {
    pub port: P,
    pub radio: Box<dyn NetworkAssociation>,
    pub streaming: Box<dyn StreamingService>,
    pub updates: Box<dyn UpdateService>,
    pub indicator: Box<dyn DigitalOutput>,
    pub clock: Arc<dyn Clock>,
}

pub struct Node<P> {
    ctx: NodeContext,
    link: LinkManager,
    dispatcher: CommandDispatcher,
    serial: FrameLink<P>,
    hooks: Box<dyn UpdateHooks + Send>,
    clock: Arc<dyn Clock>,
    loop_idle_ms: u64,
}

impl<P: SerialPort> Node<P> {
    pub fn new(config: &Config, parts: Collaborators<P>) -> Self {
        let mut link = LinkManager::new(
            parts.radio,
            parts.streaming,
            parts.updates,
            parts.clock.clone(),
            config.link.clone(),
            config.backup.clone(),
        );
        link.set_hostname(&config.hostname);

        Self {
            ctx: NodeContext::default(),
            link,
            dispatcher: CommandDispatcher::new(parts.indicator),
            serial: FrameLink::new(parts.port, config.serial.encoding),
            hooks: Box::new(LoggingHooks::default()),
            clock: parts.clock,
            loop_idle_ms: config.link.loop_idle_ms,
        }
    }

    /// Replace the default logging update hooks
    pub fn with_update_hooks(mut self, hooks: Box<dyn UpdateHooks + Send>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Boot-time connection attempt. Credentials start out empty, so this
    /// only does something when the context was seeded beforehand.
    pub fn start(&mut self) {
        info!("Node up, {:?} framing", self.serial.encoding());
        let mut reporter = StatusReporter::new(&mut self.serial);
        let outcome = self.link.connect(&mut self.ctx, &mut reporter);
        debug!("Boot connection: {:?}", outcome);
    }

    /// One control loop iteration: give the update service its turn,
    /// dispatch at most one frame, then look at the link and the fallback.
    pub fn poll_once(&mut self) -> Option<DispatchOutcome> {
        self.link.service_updates(self.hooks.as_mut());

        let outcome = self.serial.poll_frame().map(|frame| {
            let mut reporter = StatusReporter::new(&mut self.serial);
            self.dispatcher
                .dispatch(frame, &mut self.ctx, &mut self.link, &mut reporter)
        });
        if let Some(outcome) = outcome {
            debug!("Dispatched: {:?}", outcome);
        }

        self.link.observe(&mut self.ctx);

        let mut reporter = StatusReporter::new(&mut self.serial);
        self.link.check_fallback(&mut self.ctx, &mut reporter);

        outcome
    }

    pub fn run(&mut self) -> ! {
        self.start();
        loop {
            self.poll_once();
            self.idle();
        }
    }

    /// Like `run`, but returns once `stop` is set
    pub fn run_until(&mut self, stop: &AtomicBool) {
        self.start();
        while !stop.load(Ordering::Relaxed) {
            self.poll_once();
            self.idle();
        }
        info!("Control loop stopped");
    }

    fn idle(&self) {
        if self.loop_idle_ms > 0 {
            self.clock.sleep_ms(self.loop_idle_ms);
        }
    }

    pub fn context(&self) -> &NodeContext {
        &self.ctx
    }

    /// For seeding credentials before `start`
    pub fn context_mut(&mut self) -> &mut NodeContext {
        &mut self.ctx
    }

    pub fn link_state(&self) -> LinkState {
        self.ctx.link_state
    }

    pub fn serial_mut(&mut self) -> &mut FrameLink<P> {
        &mut self.serial
    }
}
