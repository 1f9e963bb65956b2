//! Page layouts for the 296x128 landscape screen
//!
//! Every page is plain 6x10 text on white, laid out on a 14 px line grid.
//! Layouts only draw; they never touch the schedule or the cursor.

mod day;
mod slots;

use core::fmt::{self, Write as FmtWrite};

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line as RuleLine, PrimitiveStyle};
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyle, TextStyleBuilder};
use heapless::String;

pub use day::DayLayout;
pub use slots::SlotsLayout;

use crate::battery::{draw_battery, BatteryReading, ICON_HEIGHT, ICON_WIDTH};
use crate::cache::PaginationState;
use crate::framebuffer::{HEIGHT, WIDTH};
use crate::input::{Action, Button, ButtonMap};
use crate::schedule::Schedule;

/// Text font
pub const FONT: &MonoFont = &FONT_6X10;
/// Glyph advance in pixels
pub const CHAR_WIDTH: u32 = 6;
/// Line pitch in pixels
pub const LINE_HEIGHT: i32 = 14;
/// Left and right page margin
pub const MARGIN: i32 = 4;
/// Characters that fit across the screen
pub const MAX_CHARS: usize = (WIDTH / CHAR_WIDTH) as usize;
/// Vertical center of the bottom legend line
pub const LEGEND_Y: i32 = HEIGHT as i32 - 10;

/// Byte capacity of a rendered line (multi-byte text included)
pub const LINE_CAPACITY: usize = 200;

pub type Line = String<LINE_CAPACITY>;

pub const INK: MonoTextStyle<'static, BinaryColor> = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

/// Anchor text at its left edge, vertically centered on `y`
pub const LEFT: TextStyle = TextStyleBuilder::new()
    .alignment(Alignment::Left)
    .baseline(Baseline::Middle)
    .build();

/// Anchor text at its right edge, vertically centered on `y`
pub const RIGHT: TextStyle = TextStyleBuilder::new()
    .alignment(Alignment::Right)
    .baseline(Baseline::Middle)
    .build();

/// Header text on the loading screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadingContext<'a> {
    pub title: &'a str,
    pub message: &'a str,
}

impl Default for LoadingContext<'static> {
    fn default() -> Self {
        Self {
            title: "MEAL PLANNER",
            message: "Loading...",
        }
    }
}

/// Text shared by every layout: the button legend and the retry hint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageChrome {
    pub legend: String<48>,
    pub retry_minutes: u32,
}

impl PageChrome {
    pub fn new(buttons: &ButtonMap, retry_minutes: u32) -> Self {
        Self {
            legend: legend(buttons),
            retry_minutes,
        }
    }
}

/// A way of drawing one page of the schedule.
///
/// Loading and error screens have shared defaults; layouts only differ in
/// how a day is presented.
pub trait PageLayout {
    fn chrome(&self) -> &PageChrome;

    fn draw_page<D>(
        &self,
        target: &mut D,
        schedule: &Schedule,
        pagination: PaginationState,
        battery: &BatteryReading,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>;

    fn draw_loading<D>(&self, target: &mut D, context: &LoadingContext<'_>) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        target.clear(BinaryColor::Off)?;
        text(target, context.title, MARGIN, 10)?;
        separator(target, 20)?;
        text(target, context.message, MARGIN, 40)?;
        Ok(())
    }

    fn draw_error<D>(&self, target: &mut D, message: &str, battery: &BatteryReading) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        target.clear(BinaryColor::Off)?;
        text(target, "MEAL PLANNER", MARGIN, 10)?;
        status_right(target, &battery.label(), battery, 10)?;
        separator(target, 20)?;
        text(target, "Could not fetch meals:", MARGIN, 34)?;
        text(target, &truncate(message, MAX_CHARS), MARGIN, 52)?;
        text(
            target,
            &fit(MAX_CHARS, format_args!("Retrying in {}m", self.chrome().retry_minutes)),
            MARGIN,
            74,
        )?;
        Ok(())
    }
}

/// Configured page layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutKind {
    /// One day per page
    #[default]
    Day,
    /// Breakfast, lunch and dinner side by side
    MealSlots,
}

/// Layout selected at configuration time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Day(DayLayout),
    MealSlots(SlotsLayout),
}

impl Layout {
    pub fn new(kind: LayoutKind, chrome: PageChrome) -> Self {
        match kind {
            LayoutKind::Day => Layout::Day(DayLayout::new(chrome)),
            LayoutKind::MealSlots => Layout::MealSlots(SlotsLayout::new(chrome)),
        }
    }
}

impl PageLayout for Layout {
    fn chrome(&self) -> &PageChrome {
        match self {
            Layout::Day(l) => l.chrome(),
            Layout::MealSlots(l) => l.chrome(),
        }
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
        match self {
            Layout::Day(l) => l.draw_page(target, schedule, pagination, battery),
            Layout::MealSlots(l) => l.draw_page(target, schedule, pagination, battery),
        }
    }
}

/// Button legend for the bottom line, e.g. `[A]<  [B]>  [C]Refresh  [D]Sleep`
pub fn legend(buttons: &ButtonMap) -> String<48> {
    let mut s = String::new();
    for button in Button::ALL {
        let Some(action) = buttons.action(button) else {
            continue;
        };
        let name = match action {
            Action::PreviousPage => "<",
            Action::NextPage => ">",
            Action::Refresh => "Refresh",
            Action::Sleep => "Sleep",
        };
        let sep = if s.is_empty() { "" } else { "  " };
        let _ = write!(s, "{}[{}]{}", sep, button.label(), name);
    }
    s
}

/// Title for a day page: upper-cased weekday, `(Today)` on the first page
pub fn day_title(day_name: &str, index: usize) -> Line {
    let mut line = Line::new();
    for c in day_name.chars().flat_map(char::to_uppercase) {
        if line.push(c).is_err() {
            break;
        }
    }
    if index == 0 {
        let _ = line.push_str(" (Today)");
    }
    line
}

/// Right side of the title row: `date  i/n  battery`
pub fn status_line(date: &str, pagination: PaginationState, battery: &BatteryReading) -> Line {
    fit(
        MAX_CHARS,
        format_args!(
            "{}  {}/{}  {}",
            date,
            pagination.current_index() + 1,
            pagination.len(),
            battery.label()
        ),
    )
}

/// Cut `text` to `max_chars` characters, ending in `..` when shortened
pub fn truncate(text: &str, max_chars: usize) -> Line {
    fit(max_chars, format_args!("{}", text))
}

/// Format into a line of at most `max_chars` characters.
///
/// Overlong output keeps its first `max_chars - 2` characters followed by `..`.
pub fn fit(max_chars: usize, args: fmt::Arguments<'_>) -> Line {
    let mut writer = Fitted {
        line: Line::new(),
        max_chars,
        chars: 0,
        overflow: false,
    };
    let _ = writer.write_fmt(args);

    let mut line = writer.line;
    if writer.overflow {
        let keep = max_chars.saturating_sub(2);
        while line.chars().count() > keep {
            line.pop();
        }
        let _ = line.push_str(&".."[..max_chars.min(2)]);
    }
    line
}

struct Fitted {
    line: Line,
    max_chars: usize,
    chars: usize,
    overflow: bool,
}

impl fmt::Write for Fitted {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.chars >= self.max_chars || self.line.push(c).is_err() {
                self.overflow = true;
                return Ok(());
            }
            self.chars += 1;
        }
        Ok(())
    }
}

/// Draw left-anchored text centered on `y`
pub fn text<D>(target: &mut D, s: &str, x: i32, y: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Text::with_text_style(s, Point::new(x, y), INK, LEFT).draw(target)?;
    Ok(())
}

/// Battery icon flush with the right margin and `status` just left of it,
/// both centered on `y`
pub fn status_right<D>(target: &mut D, status: &str, battery: &BatteryReading, y: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let icon_x = WIDTH as i32 - MARGIN - ICON_WIDTH as i32;
    draw_battery(target, Point::new(icon_x, y - ICON_HEIGHT as i32 / 2), battery)?;
    Text::with_text_style(status, Point::new(icon_x - 4, y), INK, RIGHT).draw(target)?;
    Ok(())
}

/// 1 px horizontal rule between the margins
pub fn separator<D>(target: &mut D, y: i32) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    RuleLine::new(Point::new(MARGIN, y), Point::new(WIDTH as i32 - MARGIN - 1, y))
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(target)
}
