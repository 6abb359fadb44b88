use common::Frame;
use log::info;

use crate::uart::FrameOutput;

/// Tells the controller which address the node currently has.
///
/// Borrowed per use from the frame link; every report is exactly one frame,
/// with no buffering and no retry.
pub struct StatusReporter<'a> {
    out: &'a mut dyn FrameOutput,
}

impl<'a> StatusReporter<'a> {
    pub fn new(out: &'a mut dyn FrameOutput) -> Self {
        Self { out }
    }

    pub fn report_address(&mut self, address: &str) -> bool {
        info!("Reporting address {}", address);
        self.out.send(&Frame::address_report(address))
    }
}
