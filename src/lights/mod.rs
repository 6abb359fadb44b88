use anyhow::Error;
use log::info;

#[cfg(feature = "pi")]
use rppal::gpio::{Gpio, OutputPin};

#[cfg(feature = "pi")]
use crate::config::IndicatorConfig;

/// A single on/off output such as the turret LED.
pub trait DigitalOutput: Send {
    fn set_active(&mut self, active: bool) -> Result<(), Error>;
}

/// Last commanded actuator values. No history is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActuatorState {
    pub local_indicator: bool,
}

/// Turret LED on a Raspberry Pi GPIO
#[cfg(feature = "pi")]
pub struct GpioIndicator {
    pin: OutputPin,
    active_high: bool,
}

#[cfg(feature = "pi")]
impl GpioIndicator {
    pub fn init(config: &IndicatorConfig) -> Result<Self, Error> {
        info!("Indicator: initializing on GPIO {}", config.gpio);

        let mut pin = Gpio::new()?.get(config.gpio)?.into_output();

        // Start switched off
        if config.active_high {
            pin.set_low();
        } else {
            pin.set_high();
        }

        Ok(Self {
            pin,
            active_high: config.active_high,
        })
    }
}

#[cfg(feature = "pi")]
impl DigitalOutput for GpioIndicator {
    fn set_active(&mut self, active: bool) -> Result<(), Error> {
        // Some boards wire the LED to sink current, so the level is inverted
        if active == self.active_high {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }
}

/// Indicator that only logs, for hosts without GPIO
#[derive(Debug, Default)]
pub struct ConsoleIndicator {
    active: Option<bool>,
}

impl DigitalOutput for ConsoleIndicator {
    fn set_active(&mut self, active: bool) -> Result<(), Error> {
        if self.active != Some(active) {
            info!("Indicator: {}", if active { "on" } else { "off" });
        }
        self.active = Some(active);
        Ok(())
    }
}
