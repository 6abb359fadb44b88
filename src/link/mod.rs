//! Connectivity state machine.
//!
//! ```text
//!   Idle --connect()--> Connecting --associated--> Connected
//!    ^                      |                          |
//!    |                      +--timeout/begin error--> Failed
//!    +------------------ association lost -------------+
//! ```
//!
//! `connect()` only starts from Idle or Failed. It is a no-op while
//! Connected (reports success) and while Connecting, and is skipped when the
//! stored credentials are incomplete. A connection attempt blocks the caller
//! for up to `connect_timeout_ms`; nothing retries automatically.

use log::{debug, error, info, warn};
use std::{net::Ipv4Addr, sync::Arc};

use crate::{
    clock::Clock,
    config::{BackupNetwork, LinkConfig},
    credentials::Masked,
    node::NodeContext,
    report::StatusReporter,
    services::{NetworkAssociation, StreamingService},
    update::{UpdateHooks, UpdateService},
};

mod fallback;

pub use fallback::FallbackTimer;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Failed,
}

/// What a `connect()` call did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Already connected, nothing was done
    AlreadyConnected,
    /// Associated within the timeout
    Connected,
    /// An attempt is already running
    Busy,
    /// Name or passphrase empty, no attempt made
    IncompleteCredentials,
    /// The radio refused to start the attempt
    BeginFailed,
    /// No association before the timeout
    TimedOut,
}

impl ConnectOutcome {
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            ConnectOutcome::AlreadyConnected | ConnectOutcome::Connected
        )
    }
}

/// Drives the radio and the services that come up with the link.
pub struct LinkManager {
    radio: Box<dyn NetworkAssociation>,
    streaming: Box<dyn StreamingService>,
    updates: Box<dyn UpdateService>,
    clock: Arc<dyn Clock>,
    config: LinkConfig,
    backup: BackupNetwork,
}

impl LinkManager {
    pub fn new(
        radio: Box<dyn NetworkAssociation>,
        streaming: Box<dyn StreamingService>,
        updates: Box<dyn UpdateService>,
        clock: Arc<dyn Clock>,
        config: LinkConfig,
        backup: BackupNetwork,
    ) -> Self {
        Self {
            radio,
            streaming,
            updates,
            clock,
            config,
            backup,
        }
    }

    pub fn set_hostname(&mut self, hostname: &str) {
        match self.radio.set_hostname(hostname) {
            Ok(()) => info!("Hostname set to {}", hostname),
            Err(e) => warn!("Could not set hostname {}: {}", hostname, e),
        }
    }

    /// Try to join the network in `ctx.credentials`.
    pub fn connect(
        &mut self,
        ctx: &mut NodeContext,
        reporter: &mut StatusReporter<'_>,
    ) -> ConnectOutcome {
        match ctx.link_state {
            LinkState::Connected => {
                debug!("Already connected");
                return ConnectOutcome::AlreadyConnected;
            }
            LinkState::Connecting => {
                warn!("Connection attempt already in progress, ignoring");
                return ConnectOutcome::Busy;
            }
            LinkState::Idle | LinkState::Failed => {}
        }

        if !ctx.credentials.is_complete() {
            info!("No complete credentials, not connecting");
            return ConnectOutcome::IncompleteCredentials;
        }

        let network_name = ctx.credentials.network_name();
        info!(
            "Connecting to '{}' (passphrase {})",
            network_name,
            Masked(ctx.credentials.passphrase())
        );
        ctx.link_state = LinkState::Connecting;

        if let Err(e) = self
            .radio
            .begin(network_name, ctx.credentials.passphrase())
        {
            error!("Could not start joining '{}': {}", network_name, e);
            ctx.link_state = LinkState::Failed;
            return ConnectOutcome::BeginFailed;
        }

        let deadline = self.clock.now_ms() + self.config.connect_timeout_ms;
        while !self.radio.is_associated() && self.clock.now_ms() < deadline {
            self.clock.sleep_ms(self.config.poll_interval_ms.max(1));
        }

        if !self.radio.is_associated() {
            warn!(
                "Connection to '{}' failed after {} ms",
                network_name, self.config.connect_timeout_ms
            );
            ctx.link_state = LinkState::Failed;
            return ConnectOutcome::TimedOut;
        }

        ctx.link_state = LinkState::Connected;
        let address = self.address();
        info!("Connected to '{}' as {}", network_name, address);

        info!("Starting camera");
        self.streaming.start_streaming();

        info!("Arming update service");
        self.updates.arm();

        reporter.report_address(&address);
        ConnectOutcome::Connected
    }

    /// Notice a link that dropped since the last check. The node goes back
    /// to Idle; no teardown and no reconnect happen here.
    pub fn observe(&mut self, ctx: &mut NodeContext) {
        if ctx.link_state == LinkState::Connected && !self.radio.is_associated() {
            warn!("Association with '{}' lost", ctx.credentials.network_name());
            ctx.link_state = LinkState::Idle;
        }
    }

    /// Current address as reported to the controller, `0.0.0.0` when there
    /// is none.
    pub fn address(&mut self) -> String {
        self.radio
            .local_address()
            .unwrap_or(Ipv4Addr::UNSPECIFIED)
            .to_string()
    }

    /// Give the update service its slice of the loop
    pub fn service_updates(&mut self, hooks: &mut dyn UpdateHooks) {
        self.updates.handle(hooks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{
        MemoryPort, RecordingStreaming, RecordingUpdates, SimClock, SimNetwork, SimRadio,
    };
    use crate::uart::FrameLink;
    use common::{FrameEncoding, ADDRESS_TAG};

    struct Harness {
        clock: Arc<SimClock>,
        radio: SimRadio,
        streaming: RecordingStreaming,
        updates: RecordingUpdates,
        port: MemoryPort,
        link: FrameLink<MemoryPort>,
        manager: LinkManager,
        ctx: NodeContext,
    }

    fn harness(associate_after_ms: u64) -> Harness {
        let clock = Arc::new(SimClock::new());
        let radio = SimRadio::new(clock.clone());
        radio.add_network(SimNetwork {
            name: "HomeNet".to_string(),
            passphrase: "secret123".to_string(),
            address: Ipv4Addr::new(192, 168, 1, 42),
            associate_after_ms,
        });
        let streaming = RecordingStreaming::new();
        let updates = RecordingUpdates::new();
        let port = MemoryPort::new();

        let manager = LinkManager::new(
            Box::new(radio.clone()),
            Box::new(streaming.clone()),
            Box::new(updates.clone()),
            clock.clone(),
            LinkConfig::default(),
            BackupNetwork::default(),
        );

        Harness {
            clock,
            radio,
            streaming,
            updates,
            link: FrameLink::new(port.clone(), FrameEncoding::Ascii),
            port,
            manager,
            ctx: NodeContext::default(),
        }
    }

    impl Harness {
        fn connect(&mut self) -> ConnectOutcome {
            let mut reporter = StatusReporter::new(&mut self.link);
            self.manager.connect(&mut self.ctx, &mut reporter)
        }
    }

    #[test]
    fn test_connects_and_brings_up_services() {
        let mut h = harness(2_000);
        h.ctx.credentials.set("HomeNet", "secret123", "");

        assert_eq!(h.connect(), ConnectOutcome::Connected);
        assert_eq!(h.ctx.link_state, LinkState::Connected);
        assert_eq!(h.streaming.starts(), 1);
        assert_eq!(h.updates.arms(), 1);

        let sent = h.port.sent_packets(FrameEncoding::Ascii);
        assert_eq!(sent.len(), 1);
        assert!(sent[0].full_match(ADDRESS_TAG));
        assert_eq!(
            sent[0].fields().next_string::<31>().as_str(),
            "192.168.1.42"
        );
        // Polled in 500 ms steps rather than spinning
        assert_eq!(h.clock.now_ms(), 2_000);
    }

    #[test]
    fn test_connect_is_idempotent_when_connected() {
        let mut h = harness(0);
        h.ctx.credentials.set("HomeNet", "secret123", "");
        assert_eq!(h.connect(), ConnectOutcome::Connected);
        h.port.take_outbound();

        assert_eq!(h.connect(), ConnectOutcome::AlreadyConnected);
        assert!(h.connect().is_connected());
        assert_eq!(h.radio.begin_calls(), 1);
        assert_eq!(h.streaming.starts(), 1);
        assert_eq!(h.ctx.link_state, LinkState::Connected);
        assert!(h.port.take_outbound().is_empty());
    }

    #[test]
    fn test_incomplete_credentials_skip_attempt() {
        let mut h = harness(0);
        h.ctx.credentials.set("HomeNet", "", "");

        assert_eq!(h.connect(), ConnectOutcome::IncompleteCredentials);
        assert_eq!(h.ctx.link_state, LinkState::Idle);
        assert_eq!(h.radio.begin_calls(), 0);
    }

    #[test]
    fn test_timeout_fails_without_connected_side_effects() {
        let mut h = harness(0);
        h.ctx.credentials.set("Elsewhere", "nope", "");

        assert_eq!(h.connect(), ConnectOutcome::TimedOut);
        assert_eq!(h.ctx.link_state, LinkState::Failed);
        assert_eq!(h.clock.now_ms(), 30_000);
        assert_eq!(h.streaming.starts(), 0);
        assert_eq!(h.updates.arms(), 0);
        assert!(h.port.take_outbound().is_empty());
    }

    #[test]
    fn test_failed_link_can_retry() {
        let mut h = harness(0);
        h.ctx.credentials.set("Elsewhere", "nope", "");
        assert_eq!(h.connect(), ConnectOutcome::TimedOut);

        h.ctx.credentials.set("HomeNet", "secret123", "");
        assert_eq!(h.connect(), ConnectOutcome::Connected);
        assert_eq!(h.radio.begin_calls(), 2);
    }

    #[test]
    fn test_busy_while_connecting() {
        let mut h = harness(0);
        h.ctx.credentials.set("HomeNet", "secret123", "");
        h.ctx.link_state = LinkState::Connecting;

        assert_eq!(h.connect(), ConnectOutcome::Busy);
        assert_eq!(h.radio.begin_calls(), 0);
        assert_eq!(h.ctx.link_state, LinkState::Connecting);
    }

    #[test]
    fn test_begin_error_fails_attempt() {
        let mut h = harness(0);
        h.ctx.credentials.set("HomeNet", "secret123", "");
        h.radio.fail_begin(true);

        assert_eq!(h.connect(), ConnectOutcome::BeginFailed);
        assert_eq!(h.ctx.link_state, LinkState::Failed);
        assert_eq!(h.clock.now_ms(), 0);
    }

    #[test]
    fn test_lost_association_returns_to_idle() {
        let mut h = harness(0);
        h.ctx.credentials.set("HomeNet", "secret123", "");
        h.connect();

        h.manager.observe(&mut h.ctx);
        assert_eq!(h.ctx.link_state, LinkState::Connected);

        h.radio.drop_association();
        h.manager.observe(&mut h.ctx);
        assert_eq!(h.ctx.link_state, LinkState::Idle);
        assert_eq!(h.manager.address(), "0.0.0.0");
    }
}
