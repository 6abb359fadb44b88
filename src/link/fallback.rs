//! One-shot switch to the backup network.

use log::info;

use super::{LinkManager, LinkState};
use crate::{node::NodeContext, report::StatusReporter};

/// Boot-relative time of the one fallback attempt, or none yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FallbackTimer {
    /// 0 while unarmed
    armed_at_ms: u64,
}

impl FallbackTimer {
    pub fn is_armed(&self) -> bool {
        self.armed_at_ms != 0
    }

    pub fn armed_at_ms(&self) -> Option<u64> {
        self.is_armed().then_some(self.armed_at_ms)
    }

    /// Once armed it stays armed until reboot
    pub fn arm(&mut self, now_ms: u64) {
        self.armed_at_ms = now_ms.max(1);
    }
}

impl LinkManager {
    /// Switch to the backup network once per boot if the node is still not
    /// connected after the grace period. Returns whether the fallback fired.
    ///
    /// The report address is kept as it is; only the name and passphrase
    /// are replaced.
    pub fn check_fallback(
        &mut self,
        ctx: &mut NodeContext,
        reporter: &mut StatusReporter<'_>,
    ) -> bool {
        let now = self.clock.now_ms();
        if now <= self.config.grace_period_ms
            || ctx.fallback.is_armed()
            || ctx.link_state == LinkState::Connected
        {
            return false;
        }

        ctx.fallback.arm(now);
        info!(
            "Not connected after {} ms, falling back to '{}'",
            now, self.backup.network_name
        );

        let report_address = ctx.credentials.report_address().to_string();
        ctx.credentials.set(
            &self.backup.network_name,
            &self.backup.passphrase,
            &report_address,
        );

        let outcome = self.connect(ctx, reporter);
        info!("Fallback connection: {:?}", outcome);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{BackupNetwork, LinkConfig},
        link::ConnectOutcome,
        sim::{MemoryPort, RecordingStreaming, RecordingUpdates, SimClock, SimNetwork, SimRadio},
        uart::FrameLink,
    };
    use common::FrameEncoding;
    use std::{net::Ipv4Addr, sync::Arc};

    fn manager(clock: Arc<SimClock>, radio: &SimRadio) -> LinkManager {
        LinkManager::new(
            Box::new(radio.clone()),
            Box::new(RecordingStreaming::new()),
            Box::new(RecordingUpdates::new()),
            clock,
            LinkConfig::default(),
            BackupNetwork {
                network_name: "LocalNetwork".to_string(),
                passphrase: "LocalNetworkPassword".to_string(),
            },
        )
    }

    fn check(
        manager: &mut LinkManager,
        ctx: &mut NodeContext,
        link: &mut FrameLink<MemoryPort>,
    ) -> bool {
        let mut reporter = StatusReporter::new(link);
        manager.check_fallback(ctx, &mut reporter)
    }

    #[test]
    fn test_timer_arm() {
        let mut timer = FallbackTimer::default();
        assert!(!timer.is_armed());
        assert_eq!(timer.armed_at_ms(), None);

        timer.arm(61_000);
        assert_eq!(timer.armed_at_ms(), Some(61_000));

        // Zero would read as unarmed
        let mut early = FallbackTimer::default();
        early.arm(0);
        assert!(early.is_armed());
    }

    #[test]
    fn test_fires_once_after_grace() {
        let clock = Arc::new(SimClock::new());
        let radio = SimRadio::new(clock.clone());
        let mut manager = manager(clock.clone(), &radio);
        let mut link = FrameLink::new(MemoryPort::new(), FrameEncoding::Ascii);
        let mut ctx = NodeContext::default();
        ctx.credentials.set("", "", "10.0.0.2");

        clock.set(60_000);
        assert!(!check(&mut manager, &mut ctx, &mut link));
        assert!(!ctx.fallback.is_armed());

        clock.set(60_001);
        assert!(check(&mut manager, &mut ctx, &mut link));
        assert_eq!(ctx.fallback.armed_at_ms(), Some(60_001));
        assert_eq!(ctx.credentials.network_name(), "LocalNetwork");
        assert_eq!(ctx.credentials.passphrase(), "LocalNetworkPassword");
        assert_eq!(ctx.credentials.report_address(), "10.0.0.2");
        assert_eq!(radio.begin_calls(), 1);
        // Nobody answers, so the attempt ran the full timeout
        assert_eq!(ctx.link_state, LinkState::Failed);

        clock.advance(10_000);
        assert!(!check(&mut manager, &mut ctx, &mut link));
        assert_eq!(ctx.fallback.armed_at_ms(), Some(60_001));
        assert_eq!(radio.begin_calls(), 1);
    }

    #[test]
    fn test_skipped_when_connected() {
        let clock = Arc::new(SimClock::new());
        let radio = SimRadio::new(clock.clone());
        radio.add_network(SimNetwork {
            name: "HomeNet".to_string(),
            passphrase: "secret123".to_string(),
            address: Ipv4Addr::new(192, 168, 1, 42),
            associate_after_ms: 0,
        });
        let mut manager = manager(clock.clone(), &radio);
        let mut link = FrameLink::new(MemoryPort::new(), FrameEncoding::Ascii);
        let mut ctx = NodeContext::default();
        ctx.credentials.set("HomeNet", "secret123", "");
        {
            let mut reporter = StatusReporter::new(&mut link);
            assert_eq!(
                manager.connect(&mut ctx, &mut reporter),
                ConnectOutcome::Connected
            );
        }

        clock.set(120_000);
        assert!(!check(&mut manager, &mut ctx, &mut link));
        assert!(!ctx.fallback.is_armed());
        assert_eq!(ctx.credentials.network_name(), "HomeNet");
    }
}
