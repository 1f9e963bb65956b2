//! Breakfast, lunch and dinner of one day in three columns

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use heapless::Vec;

use super::{
    day_title, fit, separator, status_line, status_right, text, truncate, Line, PageChrome, PageLayout,
    LEGEND_Y, LINE_HEIGHT, MARGIN, MAX_CHARS,
};
use crate::battery::BatteryReading;
use crate::cache::PaginationState;
use crate::schedule::{text_or_none, DayPlan, MealSlot, Schedule};

/// Column pitch in pixels
const COLUMN_WIDTH: i32 = 97;
/// Characters per column
const COLUMN_CHARS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotsLayout {
    chrome: PageChrome,
}

impl SlotsLayout {
    pub fn new(chrome: PageChrome) -> Self {
        Self { chrome }
    }
}

/// Lines of one column below its heading: the adult meal, then baby items
pub(super) fn slot_lines(day: &DayPlan, slot: MealSlot) -> Vec<Line, 5> {
    let mut lines = Vec::new();
    let _ = lines.push(truncate(day.adult_meal(slot).unwrap_or("-"), COLUMN_CHARS));

    let baby = day.baby_meal(slot);
    let items = [
        ("Cer", &baby.cereal),
        ("Fru", &baby.fruit),
        ("Yog", &baby.yogurt),
        ("Veg", &baby.vegetable),
    ];
    for (label, value) in items {
        if let Some(v) = text_or_none(value) {
            let _ = lines.push(fit(COLUMN_CHARS, format_args!("{}: {}", label, v)));
        }
    }
    lines
}

impl PageLayout for SlotsLayout {
    fn chrome(&self) -> &PageChrome {
        &self.chrome
    }

    fn draw_page<D>(
        &self,
        target: &mut D,
        schedule: &Schedule,
        pagination: PaginationState,
        battery: &BatteryReading,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        target.clear(BinaryColor::Off)?;
        let Some(day) = schedule.day(pagination.current_index()) else {
            return Ok(());
        };

        let top = 6;
        text(target, &day_title(&day.day, pagination.current_index()), MARGIN, top)?;
        status_right(target, &status_line(&day.date, pagination, battery), battery, top)?;
        separator(target, top + LINE_HEIGHT - 4)?;

        for (column, slot) in MealSlot::ALL.into_iter().enumerate() {
            let x = MARGIN + column as i32 * COLUMN_WIDTH;
            let mut y = top + LINE_HEIGHT;
            text(target, slot.title(), x, y)?;
            for line in slot_lines(day, slot) {
                y += LINE_HEIGHT;
                text(target, &line, x, y)?;
            }
        }

        text(target, &truncate(&self.chrome.legend, MAX_CHARS), MARGIN, LEGEND_Y)?;
        Ok(())
    }
}
