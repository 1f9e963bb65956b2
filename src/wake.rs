//! Why this process is running
//!
//! Deep sleep resets the chip, so every wake is a fresh start. The platform
//! reports the last wake cause once; it is classified here and passed along
//! explicitly from then on.

use log::{info, warn};

use crate::input::Button;

/// Wake cause as reported by the RTC, before interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformWake {
    /// Power-on, reset button or flashing: no wake cause recorded
    Undefined,
    /// RTC timer alarm
    Timer,
    /// GPIO alarm, one bit per RTC GPIO number that was active
    Pins { mask: u64 },
    /// Any other source (touch, ULP, UART, ...)
    Other,
}

/// Classified wake reason, immutable for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    FreshBoot,
    TimerWake,
    ButtonWake(Button),
}

impl WakeReason {
    pub fn is_fresh_boot(self) -> bool {
        self == WakeReason::FreshBoot
    }
}

/// Classify the platform wake cause.
///
/// `pins` maps each button to its GPIO number. When several armed pins are
/// active the first button in scan order wins.
pub fn classify(cause: PlatformWake, pins: &[(Button, u8)]) -> WakeReason {
    let reason = match cause {
        PlatformWake::Undefined => WakeReason::FreshBoot,
        PlatformWake::Timer => WakeReason::TimerWake,
        PlatformWake::Pins { mask } => {
            let fired = Button::ALL.into_iter().find(|button| {
                pins.iter()
                    .any(|(b, gpio)| b == button && *gpio < 64 && mask & (1 << gpio) != 0)
            });
            match fired {
                Some(button) => WakeReason::ButtonWake(button),
                None => {
                    warn!("Pin wake with unknown mask {:#x}, treating as fresh boot", mask);
                    WakeReason::FreshBoot
                }
            }
        }
        PlatformWake::Other => {
            warn!("Unexpected wake source, treating as fresh boot");
            WakeReason::FreshBoot
        }
    };

    info!("Wake reason: {:?} (cause {:?})", reason, cause);
    reason
}
