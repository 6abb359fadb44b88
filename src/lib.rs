//! Link state and command handling for the rover's turret camera node.
//!
//! The node sits on a serial line to the rover's controller board. It takes
//! network credentials and actuator commands from that line, joins the
//! network, and reports back the address its camera stream is reachable on.

pub mod clock;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod lights;
pub mod link;
pub mod node;
pub mod report;
pub mod services;
pub mod sim;
pub mod uart;
pub mod update;

pub mod prelude {
    pub use crate::{
        clock::{Clock, SystemClock},
        config::Config,
        credentials::CredentialStore,
        dispatch::{CommandDispatcher, DispatchOutcome},
        lights::{ActuatorState, DigitalOutput},
        link::{ConnectOutcome, FallbackTimer, LinkManager, LinkState},
        node::{Collaborators, Node, NodeContext},
        report::StatusReporter,
        services::{NetworkAssociation, StreamingService},
        uart::{FrameLink, FrameOutput, SerialPort},
        update::{UpdateHooks, UpdateService},
    };
    pub use common::{Frame, FrameEncoding};
}
