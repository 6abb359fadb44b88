use anyhow::Error;
use log::info;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use turret_link::prelude::*;
use turret_link::{
    config::CONFIG_PATH,
    services::NoCamera,
    sim::SimRadio,
    update::NoUpdates,
};

#[cfg(feature = "pi")]
use turret_link::{lights::GpioIndicator, uart::PiUart};
#[cfg(not(feature = "pi"))]
use turret_link::{lights::ConsoleIndicator, uart::StdioPort};

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load the config file
    let config = if std::path::Path::new(CONFIG_PATH).exists() {
        Config::load()?
    } else {
        info!("No {} found, using defaults", CONFIG_PATH);
        Config::default()
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    // The radio is simulated on every host target; real association only
    // happens on the ESP32 build.
    info!(
        "Starting simulated radio with {} known network(s)...",
        config.bench.networks.len()
    );
    let radio = SimRadio::from_config(&config.bench, clock.clone());

    #[cfg(feature = "pi")]
    let (port, indicator) = {
        info!("Starting UART on {}...", config.serial.path);
        let port = PiUart::open(&config.serial)?;
        let indicator = GpioIndicator::init(&config.indicator)?;
        (port, indicator)
    };

    #[cfg(not(feature = "pi"))]
    let (port, indicator) = {
        info!("Reading frames from stdin...");
        (StdioPort::spawn(), ConsoleIndicator::default())
    };

    let mut node = Node::new(
        &config,
        Collaborators {
            port,
            radio: Box::new(radio),
            streaming: Box::new(NoCamera),
            updates: Box::new(NoUpdates),
            indicator: Box::new(indicator),
            clock,
        },
    );

    let stop = Arc::new(AtomicBool::new(false));
    let loop_stop = stop.clone();
    let control_loop = tokio::task::spawn_blocking(move || node.run_until(&loop_stop));

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutting down");
            stop.store(true, Ordering::Relaxed);
        }
        result = control_loop => {
            result?;
        }
    }

    Ok(())
}
