//! AXP2101 PMIC: auxiliary rail switch and battery voltage

use embedded_hal::i2c::I2c;
use log::debug;
use mealtag_firmware::battery::{BatteryMonitor, SensorError};

const ADDR: u8 = 0x34;
const ADC_CHANNEL_CTRL: u8 = 0x30; // bit 0: VBAT measurement
const VBAT_H: u8 = 0x34; // bits 5:0
const VBAT_L: u8 = 0x35;
const LDO_ONOFF_CTRL0: u8 = 0x90;
const ALDO1_VOL_CTRL: u8 = 0x92;

const ALDO1_EN: u8 = 1 << 0;
/// (3300 - 500) / 100
const ALDO1_3V3: u8 = 0x1C;

/// Anything outside this window is a bad conversion, not a battery level
const PLAUSIBLE_MV: core::ops::RangeInclusive<u16> = 2500..=4600;

pub struct Axp2101<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Axp2101<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Set ALDO1 to 3.3V (left off) and enable the VBAT ADC channel
    pub fn init(&mut self) -> Result<(), I2C::Error> {
        self.i2c.write(ADDR, &[ALDO1_VOL_CTRL, ALDO1_3V3])?;
        let channels = self.read_reg(ADC_CHANNEL_CTRL)?;
        self.i2c.write(ADDR, &[ADC_CHANNEL_CTRL, channels | 0x01])?;
        self.set_aux(false)
    }

    /// Switch ALDO1, which feeds the LEDs and onboard sensors
    pub fn set_aux(&mut self, enabled: bool) -> Result<(), I2C::Error> {
        let ctrl = self.read_reg(LDO_ONOFF_CTRL0)?;
        let ctrl = if enabled { ctrl | ALDO1_EN } else { ctrl & !ALDO1_EN };
        self.i2c.write(ADDR, &[LDO_ONOFF_CTRL0, ctrl])
    }

    fn read_vbat_mv(&mut self) -> Result<u16, I2C::Error> {
        let high = self.read_reg(VBAT_H)?;
        let low = self.read_reg(VBAT_L)?;
        Ok(((high as u16 & 0x3F) << 8) | low as u16)
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, I2C::Error> {
        let mut buf = [0u8; 1];
        self.i2c.write_read(ADDR, &[reg], &mut buf)?;
        Ok(buf[0])
    }
}

impl<I2C: I2c> BatteryMonitor for Axp2101<I2C> {
    fn read_voltage(&mut self) -> Result<f32, SensorError> {
        let mv = self.read_vbat_mv().map_err(|_| SensorError::Bus)?;
        debug!("VBAT raw: {}mV", mv);
        if !PLAUSIBLE_MV.contains(&mv) {
            return Err(SensorError::OutOfRange);
        }
        Ok(mv as f32 / 1000.0)
    }
}
