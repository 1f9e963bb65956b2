//! Button polling with a single shared debounce timer
//!
//! The four front buttons are wired with pull-ups, so a pressed button reads
//! low. A press is the transition from released to pressed; holding a button
//! produces one event, not a stream.

use embassy_time::{Duration, Instant};
use log::debug;

/// Reference debounce interval between reported presses
pub const DEBOUNCE: Duration = Duration::from_millis(300);

/// Physical buttons, in scan order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Button {
    A = 0,
    B = 1,
    C = 2,
    D = 3,
}

impl Button {
    pub const ALL: [Button; 4] = [Button::A, Button::B, Button::C, Button::D];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Legend label used on screen (`[A]`, `[B]`, ...)
    pub const fn label(self) -> &'static str {
        match self {
            Button::A => "A",
            Button::B => "B",
            Button::C => "C",
            Button::D => "D",
        }
    }
}

/// What a button does in the interactive loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PreviousPage,
    NextPage,
    Refresh,
    Sleep,
}

/// Button to action assignment for one interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonMap {
    actions: [Option<Action>; 4],
}

impl ButtonMap {
    /// A/B page back and forward, C refreshes, D sleeps
    pub const fn interactive() -> Self {
        Self {
            actions: [
                Some(Action::PreviousPage),
                Some(Action::NextPage),
                Some(Action::Refresh),
                Some(Action::Sleep),
            ],
        }
    }

    /// Only C and D do anything; they double as wake buttons
    pub const fn headless() -> Self {
        Self {
            actions: [None, None, Some(Action::Refresh), Some(Action::Sleep)],
        }
    }

    pub const fn action(&self, button: Button) -> Option<Action> {
        self.actions[button.index()]
    }

    /// First button bound to `action`
    pub fn button_for(&self, action: Action) -> Option<Button> {
        Button::ALL
            .into_iter()
            .find(|b| self.action(*b) == Some(action))
    }
}

/// Raw electrical level of the buttons
pub trait ButtonPins {
    /// True when the pin reads low (pressed, with pull-up wiring)
    fn is_low(&mut self, button: Button) -> bool;
}

/// A single logical press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub at: Instant,
}

/// Edge-detecting poller with one debounce window shared by all buttons.
///
/// Presses that land inside the window are dropped, not queued, and
/// presses on different buttons inside one window coalesce to the first.
pub struct InputPoller<B> {
    pins: B,
    debounce: Duration,
    last_press: Instant,
    /// Bit per button, set while the button was held at the previous poll
    held: u8,
}

impl<B: ButtonPins> InputPoller<B> {
    /// Start polling at `now`; the first debounce window opens immediately.
    pub fn new(pins: B, debounce: Duration, now: Instant) -> Self {
        Self {
            pins,
            debounce,
            last_press: now,
            held: 0,
        }
    }

    /// Sample every button once and report at most one new press.
    pub fn poll(&mut self, now: Instant) -> Option<ButtonEvent> {
        let mut held = 0u8;
        let mut pressed = None;

        for button in Button::ALL {
            if !self.pins.is_low(button) {
                continue;
            }
            let bit = 1 << button.index();
            held |= bit;
            if pressed.is_none() && self.held & bit == 0 {
                pressed = Some(button);
            }
        }
        self.held = held;

        let button = pressed?;
        if now.saturating_duration_since(self.last_press) < self.debounce {
            debug!("Dropped press on {:?} inside debounce window", button);
            return None;
        }

        self.last_press = now;
        Some(ButtonEvent { button, at: now })
    }

    pub fn pins_mut(&mut self) -> &mut B {
        &mut self.pins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Levels {
        low: [bool; 4],
    }

    impl ButtonPins for Levels {
        fn is_low(&mut self, button: Button) -> bool {
            self.low[button.index()]
        }
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn poller() -> InputPoller<Levels> {
        InputPoller::new(Levels::default(), DEBOUNCE, at(0))
    }

    #[test]
    fn test_no_event_while_released() {
        let mut p = poller();
        for t in (400..2000).step_by(100) {
            assert_eq!(p.poll(at(t)), None);
        }
    }

    #[test]
    fn test_press_reported_once_while_held() {
        let mut p = poller();
        p.pins_mut().low[1] = true;

        let event = p.poll(at(500)).unwrap();
        assert_eq!(event.button, Button::B);
        assert_eq!(event.at, at(500));

        // Still held: no new transition
        assert_eq!(p.poll(at(900)), None);
        assert_eq!(p.poll(at(1500)), None);

        // Release and press again
        p.pins_mut().low[1] = false;
        assert_eq!(p.poll(at(1600)), None);
        p.pins_mut().low[1] = true;
        assert_eq!(p.poll(at(1700)).map(|e| e.button), Some(Button::B));
    }

    #[test]
    fn test_press_inside_initial_window_is_dropped() {
        let mut p = poller();
        p.pins_mut().low[0] = true;
        assert_eq!(p.poll(at(100)), None);
        // The edge was consumed, holding does not replay it
        assert_eq!(p.poll(at(400)), None);
    }

    #[test]
    fn test_first_button_in_scan_order_wins() {
        let mut p = poller();
        p.pins_mut().low[3] = true;
        p.pins_mut().low[2] = true;
        assert_eq!(p.poll(at(400)).map(|e| e.button), Some(Button::C));
    }

    #[test]
    fn test_shared_window_coalesces_buttons() {
        let mut p = poller();
        let mut events = 0;

        // Alternate A and B every 50 ms for one debounce window
        let mut t = 400;
        for i in 0..6 {
            let levels = &mut p.pins_mut().low;
            *levels = [false; 4];
            levels[i % 2] = true;
            if p.poll(at(t)).is_some() {
                events += 1;
            }
            t += 50;
        }
        assert_eq!(events, 1);
    }

    #[test]
    fn test_one_event_per_window_under_rapid_toggling() {
        let mut p = poller();
        let mut reported = heapless::Vec::<u64, 16>::new();

        // Toggle B every 50 ms, starting as the first window closes
        for step in 0..24u64 {
            let t = 300 + step * 50;
            p.pins_mut().low[1] = step % 2 == 0;
            if let Some(e) = p.poll(at(t)) {
                reported.push(e.at.as_millis()).unwrap();
            }
        }

        assert_eq!(reported.as_slice(), &[300, 600, 900, 1200]);
        for pair in reported.windows(2) {
            assert!(pair[1] - pair[0] >= DEBOUNCE.as_millis());
        }
    }

    #[test]
    fn test_button_maps() {
        let interactive = ButtonMap::interactive();
        assert_eq!(interactive.action(Button::A), Some(Action::PreviousPage));
        assert_eq!(interactive.action(Button::D), Some(Action::Sleep));
        assert_eq!(interactive.button_for(Action::Refresh), Some(Button::C));

        let headless = ButtonMap::headless();
        assert_eq!(headless.action(Button::A), None);
        assert_eq!(headless.button_for(Action::NextPage), None);
        assert_eq!(headless.button_for(Action::Sleep), Some(Button::D));
    }
}
