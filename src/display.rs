//! Render dispatcher: layout → framebuffer → panel
//!
//! Each render call draws the whole screen and returns only after the panel
//! finished its refresh. Refreshes closer together than the panel's minimum
//! interval are delayed, not dropped.

use embassy_time::{Duration, Instant};
use log::{debug, info};

use crate::battery::BatteryReading;
use crate::cache::PaginationState;
use crate::clock::Clock;
use crate::framebuffer::Framebuffer;
use crate::layout::{LoadingContext, PageLayout};
use crate::schedule::Schedule;

/// Panel failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    #[error("display bus error")]
    Bus,
    #[error("display stayed busy")]
    Timeout,
}

/// Physical e-paper panel
pub trait Panel {
    /// Ship `frame` and wait for the full refresh to complete
    async fn refresh(&mut self, frame: &Framebuffer) -> Result<(), PanelError>;

    /// Wait for any outstanding refresh and put the panel to sleep
    async fn sleep(&mut self) -> Result<(), PanelError>;
}

/// Minimum spacing between refresh starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshCooldown {
    min_interval: Duration,
    last: Option<Instant>,
}

impl RefreshCooldown {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Time to wait before the next refresh may start
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last {
            Some(last) => (last + self.min_interval).saturating_duration_since(now),
            None => Duration::from_ticks(0),
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

pub struct RenderDispatcher<P, L, C> {
    panel: P,
    layout: L,
    clock: C,
    frame: Framebuffer,
    cooldown: RefreshCooldown,
}

impl<P: Panel, L: PageLayout, C: Clock> RenderDispatcher<P, L, C> {
    pub fn new(panel: P, layout: L, clock: C, min_interval: Duration) -> Self {
        Self {
            panel,
            layout,
            clock,
            frame: Framebuffer::new(),
            cooldown: RefreshCooldown::new(min_interval),
        }
    }

    pub async fn render_loading(&mut self, context: &LoadingContext<'_>) -> Result<(), PanelError> {
        let Ok(()) = self.layout.draw_loading(&mut self.frame, context);
        info!("Rendering loading page");
        self.show().await
    }

    pub async fn render_page(
        &mut self,
        schedule: &Schedule,
        pagination: PaginationState,
        battery: &BatteryReading,
    ) -> Result<(), PanelError> {
        let Ok(()) = self.layout.draw_page(&mut self.frame, schedule, pagination, battery);
        if let Some(day) = schedule.day(pagination.current_index()) {
            info!(
                "Rendering page {}/{}: {} {}",
                pagination.current_index() + 1,
                pagination.len(),
                day.day,
                day.date
            );
        }
        self.show().await
    }

    pub async fn render_error(&mut self, message: &str, battery: &BatteryReading) -> Result<(), PanelError> {
        let Ok(()) = self.layout.draw_error(&mut self.frame, message, battery);
        info!("Rendering error page: {}", message);
        self.show().await
    }

    /// Let the last refresh settle and send the panel to sleep
    pub async fn finish(&mut self) -> Result<(), PanelError> {
        debug!("Putting display to sleep");
        self.panel.sleep().await
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    async fn show(&mut self) -> Result<(), PanelError> {
        let wait = self.cooldown.remaining(self.clock.now());
        if wait > Duration::from_ticks(0) {
            debug!("Display cooldown: waiting {}ms", wait.as_millis());
            self.clock.pause(wait).await;
        }

        self.cooldown.mark(self.clock.now());
        self.panel.refresh(&self.frame).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ButtonMap;
    use crate::layout::{Layout, LayoutKind, PageChrome};
    use crate::mock::{Event, ManualClock, Recorder};
    use crate::schedule::parse_schedule;
    use embassy_futures::block_on;

    fn dispatcher(rec: &Recorder) -> RenderDispatcher<crate::mock::FakePanel, Layout, ManualClock> {
        let layout = Layout::new(LayoutKind::Day, PageChrome::new(&ButtonMap::interactive(), 30));
        RenderDispatcher::new(rec.panel(), layout, rec.clock(), Duration::from_secs(5))
    }

    #[test]
    fn test_cooldown() {
        let mut cooldown = RefreshCooldown::new(Duration::from_secs(5));
        assert_eq!(cooldown.remaining(Instant::from_secs(0)), Duration::from_ticks(0));

        cooldown.mark(Instant::from_secs(10));
        assert_eq!(cooldown.remaining(Instant::from_secs(12)), Duration::from_secs(3));
        assert_eq!(cooldown.remaining(Instant::from_secs(15)), Duration::from_ticks(0));
        assert_eq!(cooldown.remaining(Instant::from_secs(40)), Duration::from_ticks(0));
    }

    #[test]
    fn test_back_to_back_renders_wait_out_cooldown() {
        let rec = Recorder::default();
        let mut display = dispatcher(&rec);
        let battery = BatteryReading::from_volts(3.9);

        block_on(async {
            display.render_loading(&LoadingContext::default()).await.unwrap();
            display.render_error("HTTP 500", &battery).await.unwrap();
        });

        assert_eq!(rec.refresh_times(), vec![0, 5000]);
    }

    #[test]
    fn test_render_page_draws_current_day() {
        let rec = Recorder::default();
        let mut display = dispatcher(&rec);
        let schedule =
            parse_schedule(r#"{"days":[{"date":"Mar 3","day":"Monday"},{"date":"Mar 4","day":"Tuesday"}]}"#)
                .unwrap();
        let battery = BatteryReading::from_volts(3.9);
        let mut pagination = PaginationState::new(2);
        pagination.next();

        block_on(display.render_page(&schedule, pagination, &battery)).unwrap();

        let mut expected = Framebuffer::new();
        let Ok(()) = display.layout().draw_page(&mut expected, &schedule, pagination, &battery);
        assert_eq!(rec.frames(), vec![expected.as_slice().to_vec()]);
    }

    #[test]
    fn test_panel_error_propagates() {
        let rec = Recorder::default();
        rec.fail_panel(PanelError::Bus);
        let mut display = dispatcher(&rec);

        let result = block_on(display.render_loading(&LoadingContext::default()));
        assert_eq!(result, Err(PanelError::Bus));
        assert!(rec.frames().is_empty());
    }

    #[test]
    fn test_finish_sleeps_panel() {
        let rec = Recorder::default();
        let mut display = dispatcher(&rec);
        block_on(display.finish()).unwrap();
        assert_eq!(rec.events(), vec![Event::PanelSleep]);
    }
}
