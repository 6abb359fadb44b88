use anyhow::{Context, Result};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};
use std::sync::Arc;
use turret_link::{
    clock::{Clock, SystemClock},
    config::Config,
    node::{Collaborators, Node},
};

mod camera;
mod hardware;
mod logging;
mod ota;
mod wifi;

use crate::{
    camera::CameraServer,
    hardware::{ControllerUart, FlashLed},
    ota::NetworkUpdates,
    wifi::StationRadio,
};

fn main() -> Result<()> {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!(
        "Turret camera node starting, built {}",
        env!("BUILD_TIMESTAMP")
    );

    let peripherals = Peripherals::take().context("peripherals already taken")?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut config = Config::default();
    // The loop is the only task that needs the core between frames
    config.link.loop_idle_ms = 0;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    let mut node = Node::new(
        &config,
        Collaborators {
            port: ControllerUart::new(
                peripherals.uart0,
                peripherals.pins.gpio1,
                peripherals.pins.gpio3,
            )?,
            radio: Box::new(StationRadio::new(peripherals.modem, sysloop, nvs)?),
            streaming: Box::new(CameraServer::default()),
            updates: Box::new(NetworkUpdates::new()),
            indicator: Box::new(FlashLed::new(peripherals.pins.gpio4)?),
            clock,
        },
    );

    node.run()
}
