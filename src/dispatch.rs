use common::Frame;
use log::{debug, info, warn};

use crate::{
    credentials::Masked,
    lights::DigitalOutput,
    link::{ConnectOutcome, LinkManager, LinkState},
    node::NodeContext,
    report::StatusReporter,
};

/// What a dispatched frame led to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// New credentials stored and a connection attempted
    CredentialsApplied(ConnectOutcome),
    /// Credentials not taken; the current address was re-reported instead
    CredentialsRedundant,
    /// The indicator was driven to this level
    IndicatorSet(bool),
    /// Unknown tag, dropped
    Ignored,
}

/// Routes decoded frames to the part of the node that handles them.
pub struct CommandDispatcher {
    indicator: Box<dyn DigitalOutput>,
}

impl CommandDispatcher {
    pub fn new(indicator: Box<dyn DigitalOutput>) -> Self {
        Self { indicator }
    }

    pub fn dispatch(
        &mut self,
        frame: Frame,
        ctx: &mut NodeContext,
        link: &mut LinkManager,
        reporter: &mut StatusReporter<'_>,
    ) -> DispatchOutcome {
        match frame {
            Frame::CredentialUpdate {
                mode,
                network_name,
                passphrase,
                report_address,
            } => {
                debug!(
                    "Credential update: mode {}, name '{}', passphrase {}, report to '{}'",
                    mode,
                    network_name,
                    Masked(&passphrase),
                    report_address
                );

                // Only a pair that differs in both fields is taken, and never
                // while a link is up. Anything else gets the current address.
                if ctx.credentials.is_fresh_pair(&network_name, &passphrase)
                    && ctx.link_state != LinkState::Connected
                {
                    info!("New credentials for '{}'", network_name);
                    ctx.credentials
                        .set(&network_name, &passphrase, &report_address);
                    DispatchOutcome::CredentialsApplied(link.connect(ctx, reporter))
                } else {
                    info!("Credentials not applied, re-reporting address");
                    let address = link.address();
                    reporter.report_address(&address);
                    DispatchOutcome::CredentialsRedundant
                }
            }
            Frame::ActuatorCommand {
                aux_a,
                local_indicator,
                aux_b,
            } => {
                let active = local_indicator != 0;
                debug!(
                    "Actuator command: indicator {}, aux {} {} (not driven)",
                    local_indicator, aux_a, aux_b
                );
                if let Err(e) = self.indicator.set_active(active) {
                    warn!("Could not drive indicator: {}", e);
                }
                ctx.actuators.local_indicator = active;
                DispatchOutcome::IndicatorSet(active)
            }
            Frame::Unrecognized { tag } => {
                debug!("Ignoring frame with tag '{}'", tag);
                DispatchOutcome::Ignored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{BackupNetwork, LinkConfig},
        sim::{
            MemoryPort, RecordingIndicator, RecordingStreaming, RecordingUpdates, SimClock,
            SimNetwork, SimRadio,
        },
        uart::FrameLink,
    };
    use common::{bounded, FrameEncoding, Tag, ADDRESS_TAG};
    use std::{net::Ipv4Addr, sync::Arc};

    struct Harness {
        radio: SimRadio,
        indicator: RecordingIndicator,
        port: MemoryPort,
        link: FrameLink<MemoryPort>,
        manager: LinkManager,
        dispatcher: CommandDispatcher,
        ctx: NodeContext,
    }

    fn harness() -> Harness {
        let clock = Arc::new(SimClock::new());
        let radio = SimRadio::new(clock.clone());
        radio.add_network(SimNetwork {
            name: "HomeNet".to_string(),
            passphrase: "secret123".to_string(),
            address: Ipv4Addr::new(192, 168, 1, 42),
            associate_after_ms: 500,
        });
        let indicator = RecordingIndicator::new();
        let port = MemoryPort::new();

        Harness {
            manager: LinkManager::new(
                Box::new(radio.clone()),
                Box::new(RecordingStreaming::new()),
                Box::new(RecordingUpdates::new()),
                clock,
                LinkConfig::default(),
                BackupNetwork::default(),
            ),
            dispatcher: CommandDispatcher::new(Box::new(indicator.clone())),
            link: FrameLink::new(port.clone(), FrameEncoding::Ascii),
            radio,
            indicator,
            port,
            ctx: NodeContext::default(),
        }
    }

    impl Harness {
        fn dispatch(&mut self, frame: Frame) -> DispatchOutcome {
            let mut reporter = StatusReporter::new(&mut self.link);
            self.dispatcher
                .dispatch(frame, &mut self.ctx, &mut self.manager, &mut reporter)
        }

        fn reported(&self) -> Vec<String> {
            self.port
                .sent_packets(FrameEncoding::Ascii)
                .iter()
                .filter(|p| p.full_match(ADDRESS_TAG))
                .map(|p| p.fields().next_string::<31>().to_string())
                .collect()
        }
    }

    fn credentials(name: &str, passphrase: &str, report_address: &str) -> Frame {
        Frame::CredentialUpdate {
            mode: 1,
            network_name: bounded(name),
            passphrase: bounded(passphrase),
            report_address: bounded(report_address),
        }
    }

    #[test]
    fn test_fresh_credentials_connect() {
        let mut h = harness();

        assert_eq!(
            h.dispatch(credentials("HomeNet", "secret123", "10.0.0.2")),
            DispatchOutcome::CredentialsApplied(ConnectOutcome::Connected)
        );
        assert_eq!(h.ctx.credentials.network_name(), "HomeNet");
        assert_eq!(h.ctx.credentials.report_address(), "10.0.0.2");
        assert_eq!(h.ctx.link_state, LinkState::Connected);
        assert_eq!(h.reported(), vec!["192.168.1.42"]);
    }

    #[test]
    fn test_redundant_credentials_rereport() {
        let mut h = harness();
        h.ctx.credentials.set("HomeNet", "secret123", "10.0.0.2");

        assert_eq!(
            h.dispatch(credentials("HomeNet", "secret123", "10.0.0.9")),
            DispatchOutcome::CredentialsRedundant
        );
        // Nothing stored, nothing attempted
        assert_eq!(h.ctx.credentials.report_address(), "10.0.0.2");
        assert_eq!(h.radio.begin_calls(), 0);
        assert_eq!(h.reported(), vec!["0.0.0.0"]);
    }

    #[test]
    fn test_single_field_change_is_not_fresh() {
        let mut h = harness();
        h.ctx.credentials.set("HomeNet", "secret123", "");

        assert_eq!(
            h.dispatch(credentials("HomeNet", "other-pass", "")),
            DispatchOutcome::CredentialsRedundant
        );
        assert_eq!(h.ctx.credentials.passphrase(), "secret123");
    }

    #[test]
    fn test_empty_field_is_not_fresh() {
        let mut h = harness();

        assert_eq!(
            h.dispatch(credentials("HomeNet", "", "")),
            DispatchOutcome::CredentialsRedundant
        );
        assert_eq!(h.ctx.credentials.network_name(), "");
        assert_eq!(h.reported(), vec!["0.0.0.0"]);
    }

    #[test]
    fn test_credentials_while_connected_report_current_address() {
        let mut h = harness();
        h.dispatch(credentials("HomeNet", "secret123", ""));
        h.port.take_outbound();

        assert_eq!(
            h.dispatch(credentials("Elsewhere", "other-pass", "")),
            DispatchOutcome::CredentialsRedundant
        );
        assert_eq!(h.ctx.credentials.network_name(), "HomeNet");
        assert_eq!(h.radio.begin_calls(), 1);
        assert_eq!(h.reported(), vec!["192.168.1.42"]);
    }

    #[test]
    fn test_actuator_drives_indicator() {
        let mut h = harness();

        let on = Frame::ActuatorCommand {
            aux_a: 0,
            local_indicator: 1,
            aux_b: 0,
        };
        assert_eq!(h.dispatch(on), DispatchOutcome::IndicatorSet(true));
        assert!(h.ctx.actuators.local_indicator);

        let off = Frame::ActuatorCommand {
            aux_a: 7,
            local_indicator: 0,
            aux_b: -3,
        };
        assert_eq!(h.dispatch(off), DispatchOutcome::IndicatorSet(false));
        assert!(!h.ctx.actuators.local_indicator);

        assert_eq!(h.indicator.history(), vec![true, false]);
        assert!(h.port.take_outbound().is_empty());
    }

    #[test]
    fn test_any_nonzero_level_is_on() {
        let mut h = harness();
        let frame = Frame::ActuatorCommand {
            aux_a: 0,
            local_indicator: -1,
            aux_b: 0,
        };
        assert_eq!(h.dispatch(frame), DispatchOutcome::IndicatorSet(true));
    }

    #[test]
    fn test_indicator_fault_still_records_state() {
        let mut h = harness();
        h.indicator.fail(true);

        let frame = Frame::ActuatorCommand {
            aux_a: 0,
            local_indicator: 1,
            aux_b: 0,
        };
        assert_eq!(h.dispatch(frame), DispatchOutcome::IndicatorSet(true));
        assert!(h.ctx.actuators.local_indicator);
    }

    #[test]
    fn test_unknown_tag_ignored() {
        let mut h = harness();
        let before = h.ctx.credentials.clone();

        let tag: Tag = bounded("mOV");
        assert_eq!(
            h.dispatch(Frame::Unrecognized { tag }),
            DispatchOutcome::Ignored
        );
        assert_eq!(h.ctx.credentials, before);
        assert_eq!(h.ctx.link_state, LinkState::Idle);
        assert!(h.port.take_outbound().is_empty());
    }
}
