//! Auxiliary and radio power rails
//!
//! The auxiliary rail feeds the status LEDs and onboard sensors. It is off by
//! default and only switched on for short feedback. The radio rail follows
//! the network: on for connect + fetch, off otherwise, and always switched off
//! as the last rail operation before deep sleep.

use embassy_time::Duration;
use log::debug;

use crate::clock::Clock;

/// How long a feedback flash stays lit
pub const FLASH_DURATION: Duration = Duration::from_millis(150);

/// Board-level power switches
pub trait PowerRails {
    async fn set_aux_power(&mut self, enabled: bool);
    async fn set_radio_power(&mut self, enabled: bool);
}

/// Status indicator signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    /// Joining the network (red)
    Connecting,
    /// Waiting for the schedule service (blue)
    Fetching,
    /// Fetch failed (orange)
    Error,
    /// Page changed (white flash)
    Navigate,
    /// Manual refresh requested (blue flash)
    Refresh,
    /// Going to sleep on request (red flash)
    Sleep,
}

/// Status LEDs; only visible while the auxiliary rail is powered
pub trait Indicator {
    fn show(&mut self, feedback: Feedback);
    fn clear(&mut self);
}

/// Tracks rail state and enforces the ordering rules around it
pub struct PowerRailManager<R, I> {
    rails: R,
    indicator: I,
    aux_on: bool,
    radio_on: bool,
}

impl<R: PowerRails, I: Indicator> PowerRailManager<R, I> {
    /// Rails are assumed off at boot
    pub fn new(rails: R, indicator: I) -> Self {
        Self {
            rails,
            indicator,
            aux_on: false,
            radio_on: false,
        }
    }

    pub async fn set_aux_power(&mut self, enabled: bool) {
        debug!("Aux rail {}", if enabled { "on" } else { "off" });
        self.aux_on = enabled;
        self.rails.set_aux_power(enabled).await;
    }

    pub async fn set_radio_power(&mut self, enabled: bool) {
        debug!("Radio rail {}", if enabled { "on" } else { "off" });
        self.radio_on = enabled;
        self.rails.set_radio_power(enabled).await;
    }

    pub fn aux_on(&self) -> bool {
        self.aux_on
    }

    pub fn radio_on(&self) -> bool {
        self.radio_on
    }

    /// Light the indicator until `clear_status` is called
    pub async fn show_status(&mut self, feedback: Feedback) {
        if !self.aux_on {
            self.set_aux_power(true).await;
        }
        self.indicator.show(feedback);
    }

    /// Turn the indicator off and drop the auxiliary rail
    pub async fn clear_status(&mut self) {
        self.indicator.clear();
        if self.aux_on {
            self.set_aux_power(false).await;
        }
    }

    /// Brief indicator flash for button feedback
    pub async fn flash<C: Clock>(&mut self, feedback: Feedback, clock: &mut C) {
        self.show_status(feedback).await;
        clock.pause(FLASH_DURATION).await;
        self.clear_status().await;
    }

    /// Final rail sequence before deep sleep: aux off, then radio off last.
    ///
    /// The radio is switched off even when it is already believed off.
    pub async fn prepare_for_sleep(&mut self) {
        self.indicator.clear();
        self.set_aux_power(false).await;
        self.set_radio_power(false).await;
    }
}
