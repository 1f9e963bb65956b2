//! Runtime configuration
//!
//! The firmware collects raw strings at build time (`env!`/`option_env!`)
//! and validates them here once at boot.

use embassy_time::Duration;
use heapless::String;
use log::info;

use crate::input::{ButtonMap, DEBOUNCE};
use crate::layout::LayoutKind;

/// Default refresh interval when `REFRESH_MINUTES` is unset
pub const DEFAULT_REFRESH_MINUTES: u32 = 30;
/// Default idle timeout when `IDLE_TIMEOUT_SECONDS` is unset
pub const DEFAULT_IDLE_TIMEOUT_SECONDS: u32 = 120;
/// Pause between button polls in the interactive loop
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Minimum time between two display refreshes
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// How the device behaves after showing the schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    /// Stay awake for paging until idle timeout or the sleep button
    #[default]
    Interactive,
    /// Show and go straight back to sleep; buttons only wake the device
    Headless,
}

impl InteractionMode {
    pub fn buttons(self) -> ButtonMap {
        match self {
            InteractionMode::Interactive => ButtonMap::interactive(),
            InteractionMode::Headless => ButtonMap::headless(),
        }
    }
}

/// Unvalidated settings as read from the environment
#[derive(Debug, Clone, Copy, Default)]
pub struct RawConfig<'a> {
    pub wifi_ssid: Option<&'a str>,
    pub wifi_pass: Option<&'a str>,
    pub base_url: Option<&'a str>,
    pub refresh_minutes: Option<&'a str>,
    pub idle_timeout_seconds: Option<&'a str>,
    pub interaction_mode: Option<&'a str>,
    pub page_layout: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{0} is too long")]
    TooLong(&'static str),
    #[error("{0} must be a positive integer")]
    InvalidNumber(&'static str),
    #[error("MEAL_PLANNER_URL must start with http://")]
    InvalidUrl,
    #[error("unknown interaction mode")]
    UnknownMode,
    #[error("unknown page layout")]
    UnknownLayout,
}

/// Validated configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub wifi_ssid: String<32>,
    pub wifi_pass: String<64>,
    pub base_url: String<128>,
    pub refresh_minutes: u32,
    pub idle_timeout: Duration,
    pub mode: InteractionMode,
    pub layout: LayoutKind,
    pub debounce: Duration,
    pub poll_interval: Duration,
    pub min_refresh_interval: Duration,
}

impl Config {
    pub fn from_raw(raw: &RawConfig<'_>) -> Result<Self, ConfigError> {
        let wifi_ssid = required(raw.wifi_ssid, "WIFI_SSID")?;
        let wifi_pass = bounded(raw.wifi_pass.unwrap_or(""), "WIFI_PASS")?;
        let base_url: String<128> = required(raw.base_url, "MEAL_PLANNER_URL")?;
        if !base_url.starts_with("http://") {
            return Err(ConfigError::InvalidUrl);
        }

        let refresh_minutes = positive(raw.refresh_minutes, "REFRESH_MINUTES", DEFAULT_REFRESH_MINUTES)?;
        let idle_seconds = positive(
            raw.idle_timeout_seconds,
            "IDLE_TIMEOUT_SECONDS",
            DEFAULT_IDLE_TIMEOUT_SECONDS,
        )?;

        let mode = match raw.interaction_mode.map(str::trim) {
            None | Some("") => InteractionMode::default(),
            Some(m) if m.eq_ignore_ascii_case("interactive") => InteractionMode::Interactive,
            Some(m) if m.eq_ignore_ascii_case("headless") => InteractionMode::Headless,
            Some(_) => return Err(ConfigError::UnknownMode),
        };

        let layout = match raw.page_layout.map(str::trim) {
            None | Some("") => LayoutKind::default(),
            Some(l) if l.eq_ignore_ascii_case("day") => LayoutKind::Day,
            Some(l) if l.eq_ignore_ascii_case("slots") => LayoutKind::MealSlots,
            Some(_) => return Err(ConfigError::UnknownLayout),
        };

        let config = Self {
            wifi_ssid,
            wifi_pass,
            base_url,
            refresh_minutes,
            idle_timeout: Duration::from_secs(idle_seconds as u64),
            mode,
            layout,
            debounce: DEBOUNCE,
            poll_interval: POLL_INTERVAL,
            min_refresh_interval: MIN_REFRESH_INTERVAL,
        };
        info!(
            "Config: {:?} mode, {:?} layout, refresh every {}m, idle {}s",
            config.mode, config.layout, config.refresh_minutes, idle_seconds
        );
        Ok(config)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_minutes as u64 * 60)
    }

    pub fn buttons(&self) -> ButtonMap {
        self.mode.buttons()
    }
}

fn required<const N: usize>(value: Option<&str>, name: &'static str) -> Result<String<N>, ConfigError> {
    match value.map(str::trim) {
        None | Some("") => Err(ConfigError::Missing(name)),
        Some(v) => bounded(v, name),
    }
}

fn bounded<const N: usize>(value: &str, name: &'static str) -> Result<String<N>, ConfigError> {
    String::try_from(value).map_err(|_| ConfigError::TooLong(name))
}

fn positive(value: Option<&str>, name: &'static str, default: u32) -> Result<u32, ConfigError> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(v) => match v.parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidNumber(name)),
        },
    }
}
