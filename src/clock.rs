//! Monotonic time source shared by the poller, the dispatcher and the controller

use embassy_time::{Duration, Instant};

/// Monotonic clock with a cooperative pause.
///
/// Idle timeout, debounce and display cooldown all read the same clock, so
/// every component holds a clone of one source.
pub trait Clock: Clone {
    fn now(&self) -> Instant;

    /// Suspend the current cycle for `duration`
    async fn pause(&mut self, duration: Duration);
}
