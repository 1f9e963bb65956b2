//! RTC wake cause and deep sleep entry

use core::time::Duration as CoreDuration;

use embassy_time::{Delay, Instant};
use embedded_hal::delay::DelayNs;
use esp_hal::{
    gpio::{RtcPin, RtcPinWithResistors},
    peripherals::{GPIO11, GPIO12, GPIO14, GPIO15, LPWR},
    rtc_cntl::{
        Rtc,
        sleep::{Ext1WakeupSource, TimerWakeupSource, WakeupLevel},
    },
    system::SleepSource,
};
use log::info;
use mealtag_firmware::input::Button;
use mealtag_firmware::sleep::SleepPlan;
use mealtag_firmware::wake::PlatformWake;

use crate::BUTTON_PINS;

/// Raw wake cause; EXT1 wakes carry the RTC GPIO status mask
pub fn platform_wake() -> PlatformWake {
    match esp_hal::rtc_cntl::wakeup_cause() {
        SleepSource::Undefined => PlatformWake::Undefined,
        SleepSource::Timer => PlatformWake::Timer,
        SleepSource::Ext1 => {
            let mask = LPWR::regs()
                .ext_wakeup1_status()
                .read()
                .ext_wakeup1_status()
                .bits();
            PlatformWake::Pins { mask: mask as u64 }
        }
        _ => PlatformWake::Other,
    }
}

/// Arm the plan's wake sources and power down. Never returns; the chip
/// resets on wake.
pub fn enter(rtc: &mut Rtc<'_>, plan: &SleepPlan, delay: &mut Delay) -> ! {
    let duration = plan.duration_from(Instant::now());
    let timer = TimerWakeupSource::new(CoreDuration::from_micros(duration.as_micros()));

    // Reclaim the button pins for the RTC domain
    let mut a = unsafe { GPIO15::steal() };
    let mut b = unsafe { GPIO14::steal() };
    let mut c = unsafe { GPIO12::steal() };
    let mut d = unsafe { GPIO11::steal() };
    let pins: [(Button, &mut dyn RtcPinWithResistors); 4] = [
        (Button::A, &mut a),
        (Button::B, &mut b),
        (Button::C, &mut c),
        (Button::D, &mut d),
    ];

    let mut armed: heapless::Vec<&mut dyn RtcPin, 4> = heapless::Vec::new();
    for (button, pin) in pins {
        if plan.wake_buttons.contains(&button) {
            // Keep the pull-up through sleep so the line doesn't float
            pin.rtcio_pullup(true);
            pin.rtcio_pulldown(false);
            let _ = armed.push(pin);
        }
    }

    info!(
        "Entering deep sleep for {}s, pin mask {:#x}",
        duration.as_secs(),
        plan.pin_mask(&BUTTON_PINS)
    );
    // Let serial output flush
    delay.delay_ms(100);

    if armed.is_empty() {
        rtc.sleep_deep(&[&timer])
    } else {
        let ext1 = Ext1WakeupSource::new(&mut armed, WakeupLevel::Low);
        rtc.sleep_deep(&[&timer, &ext1])
    }
}
