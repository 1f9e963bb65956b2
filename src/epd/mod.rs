//! Driver for the SSD1680 controller on 2.9" 296x128 monochrome e-paper
//!
//! RAM is written in the controller's native orientation (128 sources by 296
//! gates); [`crate::framebuffer::Framebuffer`] already stores that order.

mod command;

use command::Command;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use crate::framebuffer::{BUFFER_SIZE, ROW_BYTES, WIDTH};

/// Last gate line (295)
const LAST_GATE: u16 = WIDTH as u16 - 1;

/// Driver for the SSD1680 panel
pub struct Ssd1680<SPI, BUSY, DC, RST> {
    spi: SPI,
    busy: BUSY,
    dc: DC,
    rst: RST,
}

impl<SPI, BUSY, DC, RST> Ssd1680<SPI, BUSY, DC, RST>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
{
    /// Create a new display driver instance.
    ///
    /// Performs hardware reset and initialization.
    pub fn new<DELAY: DelayNs>(
        spi: SPI,
        busy: BUSY,
        dc: DC,
        rst: RST,
        delay: &mut DELAY,
    ) -> Result<Self, SPI::Error> {
        let mut epd = Self { spi, busy, dc, rst };

        epd.hardware_reset(delay);
        epd.init(delay)?;

        Ok(epd)
    }

    fn hardware_reset<DELAY: DelayNs>(&mut self, delay: &mut DELAY) {
        let _ = self.rst.set_high();
        delay.delay_ms(10);
        let _ = self.rst.set_low();
        delay.delay_ms(10);
        let _ = self.rst.set_high();
        delay.delay_ms(10);
    }

    /// Wait for the controller to become idle (BUSY pin low)
    pub fn wait_until_idle<DELAY: DelayNs>(&mut self, delay: &mut DELAY) {
        while self.is_busy() {
            delay.delay_ms(10);
        }
    }

    /// BUSY is active high on the SSD1680
    pub fn is_busy(&mut self) -> bool {
        self.busy.is_high().unwrap_or(true)
    }

    fn send_command(&mut self, command: Command) -> Result<(), SPI::Error> {
        let _ = self.dc.set_low();
        self.spi.write(&[command.addr()])
    }

    fn send_data(&mut self, data: &[u8]) -> Result<(), SPI::Error> {
        let _ = self.dc.set_high();
        self.spi.write(data)
    }

    fn cmd_with_data(&mut self, command: Command, data: &[u8]) -> Result<(), SPI::Error> {
        self.send_command(command)?;
        self.send_data(data)
    }

    fn init<DELAY: DelayNs>(&mut self, delay: &mut DELAY) -> Result<(), SPI::Error> {
        self.wait_until_idle(delay);
        self.send_command(Command::SwReset)?;
        delay.delay_ms(10);
        self.wait_until_idle(delay);

        // 296 gates, default scan
        let [gates_lo, gates_hi] = LAST_GATE.to_le_bytes();
        self.cmd_with_data(Command::DriverOutput, &[gates_lo, gates_hi, 0x00])?;

        // X increments, then Y
        self.cmd_with_data(Command::DataEntryMode, &[0x03])?;
        self.cmd_with_data(Command::RamXRange, &[0x00, ROW_BYTES as u8 - 1])?;
        self.cmd_with_data(Command::RamYRange, &[0x00, 0x00, gates_lo, gates_hi])?;

        self.cmd_with_data(Command::BorderWaveform, &[0x05])?;
        // Internal temperature sensor
        self.cmd_with_data(Command::TempSensor, &[0x80])?;

        self.set_ram_counter()?;
        self.wait_until_idle(delay);

        Ok(())
    }

    fn set_ram_counter(&mut self) -> Result<(), SPI::Error> {
        self.cmd_with_data(Command::RamXCounter, &[0x00])?;
        self.cmd_with_data(Command::RamYCounter, &[0x00, 0x00])
    }

    /// Load a full frame and start a full refresh (non-blocking).
    ///
    /// Poll [`Self::is_busy`] until it returns false before the next command.
    pub fn display_start(&mut self, buffer: &[u8]) -> Result<(), SPI::Error> {
        let frame = &buffer[..buffer.len().min(BUFFER_SIZE)];

        self.set_ram_counter()?;
        self.cmd_with_data(Command::WriteRamBw, frame)?;

        // Red RAM cleared so the full waveform treats every pixel as changed
        self.set_ram_counter()?;
        self.send_command(Command::WriteRamRed)?;
        let _ = self.dc.set_high();
        let blank = [0x00; ROW_BYTES * 8];
        for _ in 0..(BUFFER_SIZE / blank.len()) {
            self.spi.write(&blank)?;
        }

        self.cmd_with_data(Command::UpdateControl2, &[0xF7])?;
        self.send_command(Command::MasterActivate)
    }

    /// Put the display into deep sleep mode; a reset is needed to wake it
    pub fn sleep<DELAY: DelayNs>(&mut self, delay: &mut DELAY) -> Result<(), SPI::Error> {
        self.wait_until_idle(delay);
        self.cmd_with_data(Command::DeepSleep, &[0x01])?;
        delay.delay_ms(100);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use core::convert::Infallible;
    use std::rc::Rc;
    use std::vec::Vec;

    /// Bytes on the bus, tagged with the DC level they were sent at
    type Bus = Rc<RefCell<(bool, Vec<(bool, u8)>)>>;

    struct FakeSpi(Bus);
    struct FakeDc(Bus);
    struct Pin(bool);
    struct NoDelay;

    impl embedded_hal::spi::ErrorType for FakeSpi {
        type Error = Infallible;
    }

    impl SpiDevice for FakeSpi {
        fn transaction(
            &mut self,
            operations: &mut [embedded_hal::spi::Operation<'_, u8>],
        ) -> Result<(), Infallible> {
            let mut bus = self.0.borrow_mut();
            let dc = bus.0;
            for op in operations {
                if let embedded_hal::spi::Operation::Write(data) = op {
                    bus.1.extend(data.iter().map(|b| (dc, *b)));
                }
            }
            Ok(())
        }
    }

    impl embedded_hal::digital::ErrorType for FakeDc {
        type Error = Infallible;
    }

    impl OutputPin for FakeDc {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().0 = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().0 = true;
            Ok(())
        }
    }

    impl embedded_hal::digital::ErrorType for Pin {
        type Error = Infallible;
    }

    impl InputPin for Pin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0)
        }
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0 = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0 = true;
            Ok(())
        }
    }

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn commands(bus: &Bus) -> Vec<u8> {
        bus.borrow().1.iter().filter(|(dc, _)| !dc).map(|(_, b)| *b).collect()
    }

    fn driver() -> (Ssd1680<FakeSpi, Pin, FakeDc, Pin>, Bus) {
        let bus: Bus = Rc::new(RefCell::new((false, Vec::new())));
        let epd = Ssd1680::new(
            FakeSpi(bus.clone()),
            Pin(false),
            FakeDc(bus.clone()),
            Pin(true),
            &mut NoDelay,
        )
        .unwrap();
        (epd, bus)
    }

    #[test]
    fn test_init_sequence() {
        let (_epd, bus) = driver();
        assert_eq!(
            commands(&bus),
            vec![0x12, 0x01, 0x11, 0x44, 0x45, 0x3C, 0x18, 0x4E, 0x4F]
        );
        // Driver output: 296 gates
        assert_eq!(&bus.borrow().1[2..5], &[(true, 0x27), (true, 0x01), (true, 0x00)]);
    }

    #[test]
    fn test_display_ships_full_frame() {
        let (mut epd, bus) = driver();
        bus.borrow_mut().1.clear();

        let frame = [0xAAu8; BUFFER_SIZE];
        epd.display_start(&frame).unwrap();

        let data: Vec<u8> = bus.borrow().1.iter().filter(|(dc, _)| *dc).map(|(_, b)| *b).collect();
        // counters (1 + 2) + frame + counters again + red RAM
        assert_eq!(data.len(), 3 + BUFFER_SIZE + 3 + BUFFER_SIZE + 1);
        assert_eq!(&data[3..3 + BUFFER_SIZE], &frame[..]);
        assert_eq!(
            commands(&bus),
            vec![0x4E, 0x4F, 0x24, 0x4E, 0x4F, 0x26, 0x22, 0x20]
        );
    }

    #[test]
    fn test_sleep_command() {
        let (mut epd, bus) = driver();
        bus.borrow_mut().1.clear();
        epd.sleep(&mut NoDelay).unwrap();
        assert_eq!(bus.borrow().1, vec![(false, 0x10), (true, 0x01)]);
    }
}
