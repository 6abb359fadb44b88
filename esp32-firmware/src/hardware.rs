use anyhow::Result;
use esp_idf_hal::{
    delay::NON_BLOCK,
    gpio::{AnyIOPin, Gpio4, Output, PinDriver},
    peripheral::Peripheral,
    uart::{config::Config, Uart, UartDriver},
    units::Hertz,
};
use turret_link::{lights::DigitalOutput, uart::SerialPort};

use crate::info;

/// Controller board link runs at the Arduino default speed
pub const BAUD_RATE: u32 = 9600;

/// The ESP32-CAM's on-board flash LED on GPIO4
pub struct FlashLed {
    pin: PinDriver<'static, Gpio4, Output>,
}

impl FlashLed {
    pub fn new(pin: Gpio4) -> Result<Self> {
        let mut pin = PinDriver::output(pin)?;
        pin.set_low()?;
        info!("Flash LED ready on GPIO4");
        Ok(Self { pin })
    }
}

impl DigitalOutput for FlashLed {
    fn set_active(&mut self, active: bool) -> Result<()> {
        if active {
            self.pin.set_high()?;
        } else {
            self.pin.set_low()?;
        }
        Ok(())
    }
}

/// UART to the controller board
pub struct ControllerUart {
    uart: UartDriver<'static>,
}

impl ControllerUart {
    pub fn new<U: Uart>(
        uart: impl Peripheral<P = U> + 'static,
        tx: impl Peripheral<P = impl esp_idf_hal::gpio::OutputPin> + 'static,
        rx: impl Peripheral<P = impl esp_idf_hal::gpio::InputPin> + 'static,
    ) -> Result<Self> {
        let config = Config::default().baudrate(Hertz(BAUD_RATE));
        let uart = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &config,
        )?;
        info!("Controller UART ready at {} baud", BAUD_RATE);
        Ok(Self { uart })
    }
}

impl SerialPort for ControllerUart {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.uart.read(buf, NON_BLOCK)?)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < bytes.len() {
            written += self.uart.write(&bytes[written..])?;
        }
        Ok(())
    }
}
