//! Battery sample and indicator for the e-paper display
//!
//! The battery is sampled once per wake cycle, before the radio comes up, and
//! the reading is passed by value to every render of that cycle.

use core::fmt::Write as FmtWrite;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use heapless::String;
use log::{info, warn};

/// Below this voltage the label is flagged with `!`
pub const LOW_VOLTAGE: f32 = 3.5;

/// LiPo discharge range used for the fill level
pub const EMPTY_VOLTAGE: f32 = 3.0;
pub const FULL_VOLTAGE: f32 = 4.2;

/// Battery icon dimensions
pub const ICON_WIDTH: u32 = 22;
pub const ICON_HEIGHT: u32 = 10;

/// Battery channel read failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SensorError {
    #[error("sensor bus error")]
    Bus,
    #[error("reading out of range")]
    OutOfRange,
}

/// Voltage source for the battery
pub trait BatteryMonitor {
    fn read_voltage(&mut self) -> Result<f32, SensorError>;
}

/// One sample for the current cycle; `None` when the read failed
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatteryReading {
    pub volts: Option<f32>,
}

impl BatteryReading {
    /// Sample the monitor. A failed read is logged and recorded as unknown.
    pub fn sample<M: BatteryMonitor>(monitor: &mut M) -> Self {
        match monitor.read_voltage() {
            Ok(volts) => {
                info!("Battery: {}mV", (volts * 1000.0) as u32);
                Self { volts: Some(volts) }
            }
            Err(e) => {
                warn!("Battery read failed: {}", e);
                Self { volts: None }
            }
        }
    }

    pub fn from_volts(volts: f32) -> Self {
        Self { volts: Some(volts) }
    }

    pub fn unknown() -> Self {
        Self { volts: None }
    }

    pub fn is_low(&self) -> bool {
        self.volts.is_some_and(|v| v < LOW_VOLTAGE)
    }

    /// Linear charge estimate, 0-100
    pub fn percentage(&self) -> Option<u8> {
        let v = self.volts?;
        let ratio = (v - EMPTY_VOLTAGE) / (FULL_VOLTAGE - EMPTY_VOLTAGE);
        Some((ratio.clamp(0.0, 1.0) * 100.0 + 0.5) as u8)
    }

    /// Short label: `4.01v`, `!3.42v` when low, `--v` when unknown
    pub fn label(&self) -> String<8> {
        let mut s = String::new();
        match self.volts {
            Some(v) if v < LOW_VOLTAGE => {
                let _ = write!(s, "!{:.2}v", v);
            }
            Some(v) => {
                let _ = write!(s, "{:.2}v", v);
            }
            None => {
                let _ = s.push_str("--v");
            }
        }
        s
    }
}

/// Draw the battery icon with its top-left corner at `origin`.
///
/// Tip on the right; fill grows left to right. An unknown reading draws an
/// empty outline.
pub fn draw_battery<D>(target: &mut D, origin: Point, reading: &BatteryReading) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let outline = PrimitiveStyle::with_stroke(BinaryColor::On, 1);
    let filled = PrimitiveStyle::with_fill(BinaryColor::On);
    let body_width = ICON_WIDTH - 2;

    Rectangle::new(origin, Size::new(body_width, ICON_HEIGHT))
        .into_styled(outline)
        .draw(target)?;

    // Positive terminal
    let tip_height = ICON_HEIGHT / 2;
    Rectangle::new(
        origin + Point::new(body_width as i32, ((ICON_HEIGHT - tip_height) / 2) as i32),
        Size::new(2, tip_height),
    )
    .into_styled(filled)
    .draw(target)?;

    let max_fill = body_width - 4;
    let fill = reading
        .percentage()
        .map(|pct| (max_fill * pct as u32) / 100)
        .unwrap_or(0);
    if fill > 0 {
        Rectangle::new(origin + Point::new(2, 2), Size::new(fill, ICON_HEIGHT - 4))
            .into_styled(filled)
            .draw(target)?;
    }

    Ok(())
}
