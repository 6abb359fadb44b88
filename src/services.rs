//! Collaborators the link manager drives but does not implement: the radio
//! and the camera streaming server.

use anyhow::Result;
use log::info;
use std::net::Ipv4Addr;

/// The radio's station interface.
pub trait NetworkAssociation: Send {
    /// Name the station announces to the access point and DHCP server
    fn set_hostname(&mut self, _hostname: &str) -> Result<()> {
        Ok(())
    }

    /// Start joining a network. Returns once the request is issued, not once
    /// it succeeded; progress is observed through `is_associated`.
    fn begin(&mut self, network_name: &str, passphrase: &str) -> Result<()>;

    fn is_associated(&mut self) -> bool;

    fn local_address(&mut self) -> Option<Ipv4Addr>;
}

/// The image streaming server. Started on every successful connection.
pub trait StreamingService: Send {
    fn start_streaming(&mut self);
}

/// Stand-in used where no camera is attached
#[derive(Debug, Default)]
pub struct NoCamera;

impl StreamingService for NoCamera {
    fn start_streaming(&mut self) {
        info!("No camera attached, streaming not started");
    }
}
