//! In-memory schedule cache with the pagination cursor
//!
//! Lives for one wake cycle only. A fresh fetch replaces the schedule and
//! moves the cursor back to the first day; a failed fetch leaves both alone.

use log::debug;

use crate::schedule::Schedule;

/// Cursor into the day sequence.
///
/// Invariant: `current_index < len` whenever `len > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaginationState {
    current_index: usize,
    len: usize,
}

impl PaginationState {
    pub fn new(len: usize) -> Self {
        Self {
            current_index: 0,
            len,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_first(&self) -> bool {
        self.current_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 >= self.len
    }

    /// Step forward, clamped at the last page. Returns whether the index moved.
    pub fn next(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current_index += 1;
        true
    }

    /// Step back, clamped at the first page. Returns whether the index moved.
    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.current_index -= 1;
        true
    }
}

/// Most recently fetched schedule
#[derive(Debug, Default)]
pub struct ScheduleCache {
    schedule: Option<Schedule>,
    cursor: PaginationState,
}

impl ScheduleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached schedule and reset pagination to the first day
    pub fn store(&mut self, schedule: Schedule) {
        debug!(
            "Caching {} days (updated {:?})",
            schedule.len(),
            schedule.updated_at.as_deref()
        );
        self.cursor = PaginationState::new(schedule.len());
        self.schedule = Some(schedule);
    }

    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    pub fn has_schedule(&self) -> bool {
        self.schedule.is_some()
    }

    pub fn pagination(&self) -> PaginationState {
        self.cursor
    }

    /// Move to the next day; false when already on the last one
    pub fn next_page(&mut self) -> bool {
        self.cursor.next()
    }

    /// Move to the previous day; false when already on the first one
    pub fn previous_page(&mut self) -> bool {
        self.cursor.previous()
    }
}
