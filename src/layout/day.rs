//! One day per page: adult dinner on top, baby lunch and dinner below

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use super::{
    day_title, fit, separator, status_line, status_right, text, truncate, Line, PageChrome, PageLayout,
    LEGEND_Y, LINE_HEIGHT, MARGIN, MAX_CHARS,
};
use crate::battery::BatteryReading;
use crate::cache::PaginationState;
use crate::schedule::{text_or_none, BabyMeal, DayPlan, Schedule, Text};

/// Left edge of the second baby column
const COLUMN_2_X: i32 = 152;
/// Characters per baby column
const COLUMN_CHARS: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayLayout {
    chrome: PageChrome,
}

impl DayLayout {
    pub fn new(chrome: PageChrome) -> Self {
        Self { chrome }
    }
}

/// Baby rows as `(lunch, dinner)` pairs
pub(super) fn baby_rows(lunch: &BabyMeal, dinner: &BabyMeal) -> [(Line, Line); 3] {
    let cell = |label: &str, value: &Option<Text>| {
        fit(
            COLUMN_CHARS,
            format_args!("{}{}", label, text_or_none(value).unwrap_or("-")),
        )
    };
    [
        (cell("Cereal: ", &lunch.cereal), cell("Cereal: ", &dinner.cereal)),
        (cell("Fruit:  ", &lunch.fruit), cell("Fruit:  ", &dinner.fruit)),
        (cell("Yogurt: ", &lunch.yogurt), cell("Veg:    ", &dinner.vegetable)),
    ]
}

fn dinner_line(day: &DayPlan) -> Line {
    let dinner = text_or_none(&day.adult.dinner).unwrap_or("-");
    fit(MAX_CHARS, format_args!("DINNER: {}", dinner))
}

impl PageLayout for DayLayout {
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

        let mut y = 6;
        text(target, &day_title(&day.day, pagination.current_index()), MARGIN, y)?;
        status_right(target, &status_line(&day.date, pagination, battery), battery, y)?;
        y += LINE_HEIGHT;
        separator(target, y - 4)?;

        text(target, &dinner_line(day), MARGIN, y)?;
        y += LINE_HEIGHT;

        if let Some(note) = day.note() {
            text(target, &fit(MAX_CHARS, format_args!("  Note: {}", note)), MARGIN, y)?;
            y += LINE_HEIGHT;
        }
        separator(target, y - 4)?;

        text(target, "BABY LUNCH", MARGIN, y)?;
        text(target, "BABY DINNER", COLUMN_2_X, y)?;
        for (lunch, dinner) in baby_rows(&day.baby.lunch, &day.baby.dinner) {
            y += LINE_HEIGHT;
            text(target, &lunch, MARGIN, y)?;
            text(target, &dinner, COLUMN_2_X, y)?;
        }

        text(target, &truncate(&self.chrome.legend, MAX_CHARS), MARGIN, LEGEND_Y)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::Framebuffer;
    use crate::input::ButtonMap;
    use crate::schedule::parse_schedule;

    fn schedule() -> Schedule {
        parse_schedule(
            r#"{"days":[
                {"date":"Mar 3","day":"Monday",
                 "adult":{"dinner":"Lentil soup","note":"Defrost bread"},
                 "baby":{"lunch":{"cereal":"Oat","fruit":"Pear"},
                         "dinner":{"vegetable":"Carrot and sweet potato mash with peas"}}},
                {"date":"Mar 4","day":"Tuesday"}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_baby_rows() {
        let s = schedule();
        let day = s.day(0).unwrap();
        let rows = baby_rows(&day.baby.lunch, &day.baby.dinner);

        assert_eq!(rows[0].0.as_str(), "Cereal: Oat");
        assert_eq!(rows[0].1.as_str(), "Cereal: -");
        assert_eq!(rows[1].0.as_str(), "Fruit:  Pear");
        assert_eq!(rows[2].0.as_str(), "Yogurt: -");
        assert_eq!(rows[2].1.as_str(), "Veg:    Carrot and swe..");
    }

    #[test]
    fn test_dinner_line_placeholder() {
        let s = schedule();
        assert_eq!(dinner_line(s.day(0).unwrap()).as_str(), "DINNER: Lentil soup");
        assert_eq!(dinner_line(s.day(1).unwrap()).as_str(), "DINNER: -");
    }

    #[test]
    fn test_draw_page() {
        let layout = DayLayout::new(PageChrome::new(&ButtonMap::interactive(), 30));
        let s = schedule();
        let battery = BatteryReading::from_volts(3.9);

        let mut fb = Framebuffer::new();
        layout.draw_page(&mut fb, &s, PaginationState::new(2), &battery).unwrap();
        let with_note = fb.ink_count();
        assert!(with_note > 0);

        let mut p = PaginationState::new(2);
        p.next();
        let mut fb = Framebuffer::new();
        layout.draw_page(&mut fb, &s, p, &battery).unwrap();
        assert!(fb.ink_count() > 0);
        assert!(fb.ink_count() < with_note);
    }
}
