//! Duty-cycle controller
//!
//! One instance runs per wake. It walks
//! `Booting → Connecting → Fetching → {Displaying, ErrorDisplayed}`,
//! optionally stays in the interactive loop, and ends by returning the
//! [`SleepPlan`] the firmware hands to the deep-sleep call.
//!
//! Every external failure ends up as an error page; nothing here retries or
//! skips the sleep transition.

use embassy_time::Instant;
use log::{debug, info, warn};

use crate::battery::{BatteryMonitor, BatteryReading};
use crate::cache::ScheduleCache;
use crate::clock::Clock;
use crate::config::{Config, InteractionMode};
use crate::display::{Panel, PanelError, RenderDispatcher};
use crate::input::{Action, Button, ButtonMap, ButtonPins, InputPoller};
use crate::layout::{fit, Layout, LoadingContext, PageChrome, MAX_CHARS};
use crate::network::{Credentials, FetchError, NetworkSession, Transport};
use crate::power::{Feedback, Indicator, PowerRailManager, PowerRails};
use crate::sleep::SleepPlan;
use crate::wake::WakeReason;

/// Controller states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Booting,
    Connecting,
    Fetching,
    Displaying,
    ErrorDisplayed,
    InteractiveLoop,
    Sleeping,
}

/// Hardware handed to the controller for one wake cycle
pub struct Devices<R, I, T, B, M, P> {
    pub rails: R,
    pub indicator: I,
    pub transport: T,
    pub buttons: B,
    pub battery: M,
    pub panel: P,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Sleep,
}

pub struct DutyCycleController<R, I, T, B, M, P, C> {
    config: Config,
    wake: WakeReason,
    buttons: ButtonMap,
    rails: PowerRailManager<R, I>,
    session: NetworkSession<T>,
    input: InputPoller<B>,
    battery_monitor: M,
    display: RenderDispatcher<P, Layout, C>,
    clock: C,
    cache: ScheduleCache,
    battery: BatteryReading,
    state: State,
    visited: u8,
}

impl<R, I, T, B, M, P, C> DutyCycleController<R, I, T, B, M, P, C>
where
    R: PowerRails,
    I: Indicator,
    T: Transport,
    B: ButtonPins,
    M: BatteryMonitor,
    P: Panel,
    C: Clock,
{
    pub fn new(config: Config, wake: WakeReason, devices: Devices<R, I, T, B, M, P>, clock: C) -> Self {
        let buttons = config.buttons();
        let layout = Layout::new(config.layout, PageChrome::new(&buttons, config.refresh_minutes));
        let now = clock.now();

        Self {
            wake,
            buttons,
            rails: PowerRailManager::new(devices.rails, devices.indicator),
            session: NetworkSession::new(devices.transport),
            input: InputPoller::new(devices.buttons, config.debounce, now),
            battery_monitor: devices.battery,
            display: RenderDispatcher::new(devices.panel, layout, clock.clone(), config.min_refresh_interval),
            clock,
            cache: ScheduleCache::new(),
            battery: BatteryReading::unknown(),
            state: State::Booting,
            visited: 1 << State::Booting as u8,
            config,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Whether `state` was entered at any point during this cycle
    pub fn has_visited(&self, state: State) -> bool {
        self.visited & (1 << state as u8) != 0
    }

    pub fn cache(&self) -> &ScheduleCache {
        &self.cache
    }

    /// Run the whole wake cycle and return what to arm before sleeping
    pub async fn run(&mut self) -> SleepPlan {
        info!("Wake cycle start: {:?}, {:?} mode", self.wake, self.config.mode);

        if self.wake.is_fresh_boot() {
            let result = self.display.render_loading(&LoadingContext::default()).await;
            log_render(result);
        }

        let shown = self.fetch_cycle().await;

        if self.config.mode == InteractionMode::Interactive {
            if shown {
                self.enter(State::InteractiveLoop);
            }
            self.interactive_loop().await;
        }

        self.sleep_transition().await
    }

    /// Battery sample, connect, fetch, render. Returns whether a schedule
    /// ended up on screen.
    async fn fetch_cycle(&mut self) -> bool {
        self.battery = BatteryReading::sample(&mut self.battery_monitor);

        self.enter(State::Connecting);
        self.rails.set_radio_power(true).await;
        self.rails.show_status(Feedback::Connecting).await;

        let credentials = Credentials {
            ssid: &self.config.wifi_ssid,
            password: &self.config.wifi_pass,
        };
        let result = match self.session.connect(&credentials).await {
            Ok(_) => {
                self.enter(State::Fetching);
                self.rails.show_status(Feedback::Fetching).await;
                self.session.fetch_schedule(&self.config.base_url).await
            }
            Err(e) => Err(FetchError::from(e)),
        };

        self.session.disconnect().await;
        self.rails.set_radio_power(false).await;

        match result {
            Ok(schedule) => {
                self.rails.clear_status().await;
                self.cache.store(schedule);
                self.show_current_page().await;
                true
            }
            Err(e) => {
                warn!("Fetch cycle failed: {}", e);
                self.rails.flash(Feedback::Error, &mut self.clock).await;
                self.show_error(&e).await;
                false
            }
        }
    }

    async fn show_current_page(&mut self) {
        if !self.cache.has_schedule() {
            return;
        }
        self.enter(State::Displaying);
        let Some(schedule) = self.cache.schedule() else {
            return;
        };
        let result = self
            .display
            .render_page(schedule, self.cache.pagination(), &self.battery)
            .await;
        log_render(result);
    }

    async fn show_error(&mut self, error: &FetchError) {
        self.enter(State::ErrorDisplayed);
        let message = fit(MAX_CHARS, format_args!("{}", error));
        let result = self.display.render_error(&message, &self.battery).await;
        log_render(result);
    }

    /// Poll buttons until the sleep button or the idle timeout
    async fn interactive_loop(&mut self) {
        let mut last_activity = self.clock.now();
        info!(
            "Waiting for input (idle timeout {}s)",
            self.config.idle_timeout.as_secs()
        );

        loop {
            let now = self.clock.now();
            if now.saturating_duration_since(last_activity) >= self.config.idle_timeout {
                info!("Idle timeout, going to sleep");
                return;
            }

            if let Some(event) = self.input.poll(now) {
                last_activity = event.at;
                match self.buttons.action(event.button) {
                    Some(action) => {
                        info!("Button {}: {:?}", event.button.label(), action);
                        if self.dispatch(action).await == Flow::Sleep {
                            return;
                        }
                    }
                    None => debug!("Button {} has no action", event.button.label()),
                }
            }

            self.clock.pause(self.config.poll_interval).await;
        }
    }

    async fn dispatch(&mut self, action: Action) -> Flow {
        match action {
            Action::PreviousPage | Action::NextPage => {
                self.rails.flash(Feedback::Navigate, &mut self.clock).await;
                if !self.cache.has_schedule() {
                    debug!("No schedule to page through");
                    return Flow::Continue;
                }

                // Coming back from an error page shows the cached day first
                let moved = self.state == State::ErrorDisplayed
                    || match action {
                        Action::PreviousPage => self.cache.previous_page(),
                        _ => self.cache.next_page(),
                    };
                if moved {
                    self.show_current_page().await;
                    self.enter(State::InteractiveLoop);
                } else {
                    debug!("Already on page {}", self.cache.pagination().current_index() + 1);
                }
                Flow::Continue
            }
            Action::Refresh => {
                self.rails.flash(Feedback::Refresh, &mut self.clock).await;
                if self.fetch_cycle().await {
                    self.enter(State::InteractiveLoop);
                }
                Flow::Continue
            }
            Action::Sleep => {
                self.rails.flash(Feedback::Sleep, &mut self.clock).await;
                Flow::Sleep
            }
        }
    }

    async fn sleep_transition(&mut self) -> SleepPlan {
        let shown = matches!(self.state, State::Displaying | State::InteractiveLoop);
        self.enter(State::Sleeping);

        self.session.disconnect().await;
        if let Err(e) = self.display.finish().await {
            warn!("Display sleep failed: {}", e);
        }
        self.rails.prepare_for_sleep().await;

        let now = self.clock.now();
        let deadline = now + self.config.refresh_interval();
        let plan = match self.config.mode {
            // After a failure only the timer is armed
            InteractionMode::Headless if shown => {
                let pins: heapless::Vec<Button, 2> = [Action::Refresh, Action::Sleep]
                    .into_iter()
                    .filter_map(|a| self.buttons.button_for(a))
                    .collect();
                SleepPlan::new(deadline, &pins)
            }
            _ => SleepPlan::new(deadline, &[]),
        };

        info!(
            "Sleeping for {}s, wake buttons {:?}",
            plan.duration_from(now).as_secs(),
            plan.wake_buttons
        );
        plan
    }

    fn enter(&mut self, state: State) {
        if self.state != state {
            debug!("State {:?} -> {:?}", self.state, state);
        }
        self.state = state;
        self.visited |= 1 << state as u8;
    }

    /// Monotonic time of the controller's clock
    pub fn now(&self) -> Instant {
        self.clock.now()
    }
}

fn log_render(result: Result<(), PanelError>) {
    if let Err(e) = result {
        warn!("Render failed: {}", e);
    }
}
