//! Wake conditions armed before deep sleep

use embassy_time::{Duration, Instant};
use heapless::Vec;

use crate::input::Button;

/// One timer alarm plus zero or more button alarms.
///
/// Built fresh for each sleep transition; nothing of it survives the sleep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SleepPlan {
    pub deadline: Instant,
    pub wake_buttons: Vec<Button, 4>,
}

impl SleepPlan {
    pub fn new(deadline: Instant, wake_buttons: &[Button]) -> Self {
        let mut buttons = Vec::new();
        for button in wake_buttons {
            if !buttons.contains(button) {
                // At most four distinct buttons exist
                let _ = buttons.push(*button);
            }
        }
        Self {
            deadline,
            wake_buttons: buttons,
        }
    }

    /// Time left until the timer alarm, zero if already due
    pub fn duration_from(&self, now: Instant) -> Duration {
        self.deadline.saturating_duration_since(now)
    }

    pub fn is_timer_only(&self) -> bool {
        self.wake_buttons.is_empty()
    }

    /// RTC GPIO bit mask of the armed buttons, using `pins` for the mapping
    pub fn pin_mask(&self, pins: &[(Button, u8)]) -> u64 {
        pins.iter()
            .filter(|(button, gpio)| *gpio < 64 && self.wake_buttons.contains(button))
            .fold(0, |mask, (_, gpio)| mask | (1 << gpio))
    }
}
