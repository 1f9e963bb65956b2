//! Board glue: the library traits bound to ESP32-S3 peripherals

use embassy_time::{Delay, Duration, Instant, Timer};
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiDevice;
use esp_hal::gpio::{Input, Output};
use log::warn;
use mealtag_firmware::clock::Clock;
use mealtag_firmware::display::{Panel, PanelError};
use mealtag_firmware::epd::Ssd1680;
use mealtag_firmware::framebuffer::Framebuffer;
use mealtag_firmware::input::{Button, ButtonPins};
use mealtag_firmware::power::{Feedback, Indicator, PowerRails};

use crate::pmic::Axp2101;
use crate::wifi::{self, SharedRadio};

/// A full SSD1680 refresh takes ~3 s; anything past this is a stuck panel
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);
const BUSY_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn pause(&mut self, duration: Duration) {
        Timer::after(duration).await;
    }
}

/// ALDO1 on the PMIC plus the WiFi radio
pub struct BoardRails<I2C> {
    pmic: Axp2101<I2C>,
    radio: &'static SharedRadio,
}

impl<I2C: I2c> BoardRails<I2C> {
    pub fn new(pmic: Axp2101<I2C>, radio: &'static SharedRadio) -> Self {
        Self { pmic, radio }
    }
}

impl<I2C: I2c> PowerRails for BoardRails<I2C> {
    async fn set_aux_power(&mut self, enabled: bool) {
        if let Err(e) = self.pmic.set_aux(enabled) {
            warn!("Aux rail switch failed: {:?}", e);
        }
    }

    async fn set_radio_power(&mut self, enabled: bool) {
        wifi::set_radio_power(self.radio, enabled).await;
    }
}

/// Red/green status LED, both active low
pub struct StatusLed {
    red: Output<'static>,
    green: Output<'static>,
}

impl StatusLed {
    pub fn new(red: Output<'static>, green: Output<'static>) -> Self {
        Self { red, green }
    }

    fn set(&mut self, red: bool, green: bool) {
        self.red.set_level((!red).into());
        self.green.set_level((!green).into());
    }
}

impl Indicator for StatusLed {
    fn show(&mut self, feedback: Feedback) {
        let (red, green) = match feedback {
            Feedback::Connecting | Feedback::Sleep => (true, false),
            Feedback::Fetching | Feedback::Refresh => (false, true),
            // Both dies lit read as orange / white through the diffuser
            Feedback::Error | Feedback::Navigate => (true, true),
        };
        self.set(red, green);
    }

    fn clear(&mut self) {
        self.set(false, false);
    }
}

/// Buttons A-D in scan order
pub struct FrontButtons {
    pins: [Input<'static>; 4],
}

impl FrontButtons {
    pub fn new(pins: [Input<'static>; 4]) -> Self {
        Self { pins }
    }
}

impl ButtonPins for FrontButtons {
    fn is_low(&mut self, button: Button) -> bool {
        self.pins[button.index()].is_low()
    }
}

/// SSD1680 with async busy polling so the executor keeps running
pub struct EpdPanel<SPI, BUSY, DC, RST> {
    epd: Ssd1680<SPI, BUSY, DC, RST>,
    delay: Delay,
}

impl<SPI, BUSY, DC, RST> EpdPanel<SPI, BUSY, DC, RST>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
{
    pub fn new(epd: Ssd1680<SPI, BUSY, DC, RST>) -> Self {
        Self { epd, delay: Delay }
    }

    async fn wait_idle(&mut self) -> Result<(), PanelError> {
        let started = Instant::now();
        while self.epd.is_busy() {
            if started.elapsed() > BUSY_TIMEOUT {
                return Err(PanelError::Timeout);
            }
            Timer::after(BUSY_POLL).await;
        }
        Ok(())
    }
}

impl<SPI, BUSY, DC, RST> Panel for EpdPanel<SPI, BUSY, DC, RST>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
{
    async fn refresh(&mut self, frame: &Framebuffer) -> Result<(), PanelError> {
        self.wait_idle().await?;
        self.epd
            .display_start(frame.as_slice())
            .map_err(|_| PanelError::Bus)?;
        self.wait_idle().await
    }

    async fn sleep(&mut self) -> Result<(), PanelError> {
        self.wait_idle().await?;
        self.epd.sleep(&mut self.delay).map_err(|_| PanelError::Bus)
    }
}
