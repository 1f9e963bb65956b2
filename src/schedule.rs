//! Meal schedule types matching the planner API
//!
//! JSON format from `GET {base}/api/schedule/upcoming`:
//! ```json
//! {
//!   "days": [
//!     {
//!       "date": "Mar 3",
//!       "day": "Monday",
//!       "adult": { "dinner": "Pasta", "note": null },
//!       "baby": {
//!         "lunch": { "cereal": "Oat", "fruit": "Pear", "yogurt": null },
//!         "dinner": { "cereal": null, "fruit": "Apple", "vegetable": "Carrot" }
//!       }
//!     }
//!   ],
//!   "updated_at": "Mar 3 07:30"
//! }
//! ```
//!
//! Every meal field exists on the Rust side whether or not the server sent
//! it; absent and `null` both decode to `None`. Overlong text is clipped at
//! a char boundary and days past [`MAX_DAYS`] are dropped, so a well-formed
//! body never fails on capacity.

use core::fmt::{self, Write as FmtWrite};

use heapless::{String, Vec};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;

/// Maximum number of days in one schedule
pub const MAX_DAYS: usize = 7;

/// Maximum length of a meal or note text
pub const MAX_TEXT_LEN: usize = 64;

/// Maximum length of a date or weekday label
pub const MAX_LABEL_LEN: usize = 24;

/// Longest single string, after unescaping, the decoder accepts
pub const MAX_ESCAPED_LEN: usize = 512;

/// Maximum length of the full schedule URL
pub const MAX_URL_LEN: usize = 160;

/// Path of the upcoming-days endpoint
pub const SCHEDULE_PATH: &str = "/api/schedule/upcoming";

pub type Text = String<MAX_TEXT_LEN>;
pub type Label = String<MAX_LABEL_LEN>;

/// Adult meals of one day
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdultMeals {
    #[serde(deserialize_with = "clipped_opt")]
    pub breakfast: Option<Text>,
    #[serde(deserialize_with = "clipped_opt")]
    pub lunch: Option<Text>,
    #[serde(deserialize_with = "clipped_opt")]
    pub dinner: Option<Text>,
    #[serde(deserialize_with = "clipped_opt")]
    pub note: Option<Text>,
}

/// Baby food by category for one meal slot
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BabyMeal {
    #[serde(deserialize_with = "clipped_opt")]
    pub cereal: Option<Text>,
    #[serde(deserialize_with = "clipped_opt")]
    pub fruit: Option<Text>,
    #[serde(deserialize_with = "clipped_opt")]
    pub yogurt: Option<Text>,
    #[serde(deserialize_with = "clipped_opt")]
    pub vegetable: Option<Text>,
}

impl BabyMeal {
    pub fn is_empty(&self) -> bool {
        [&self.cereal, &self.fruit, &self.yogurt, &self.vegetable]
            .iter()
            .all(|v| text_or_none(v).is_none())
    }
}

/// Baby meals grouped by slot
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BabyMeals {
    pub breakfast: BabyMeal,
    pub lunch: BabyMeal,
    pub dinner: BabyMeal,
}

/// Meal slot of the day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 3] = [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner];

    pub fn title(self) -> &'static str {
        match self {
            MealSlot::Breakfast => "BREAKFAST",
            MealSlot::Lunch => "LUNCH",
            MealSlot::Dinner => "DINNER",
        }
    }
}

/// One day of the plan
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DayPlan {
    #[serde(deserialize_with = "clipped")]
    pub date: Label,
    #[serde(deserialize_with = "clipped")]
    pub day: Label,
    pub adult: AdultMeals,
    pub baby: BabyMeals,
}

impl DayPlan {
    pub fn adult_meal(&self, slot: MealSlot) -> Option<&str> {
        let meal = match slot {
            MealSlot::Breakfast => &self.adult.breakfast,
            MealSlot::Lunch => &self.adult.lunch,
            MealSlot::Dinner => &self.adult.dinner,
        };
        text_or_none(meal)
    }

    pub fn baby_meal(&self, slot: MealSlot) -> &BabyMeal {
        match slot {
            MealSlot::Breakfast => &self.baby.breakfast,
            MealSlot::Lunch => &self.baby.lunch,
            MealSlot::Dinner => &self.baby.dinner,
        }
    }

    pub fn note(&self) -> Option<&str> {
        text_or_none(&self.adult.note)
    }
}

/// Upcoming days as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Schedule {
    #[serde(deserialize_with = "first_days")]
    pub days: Vec<DayPlan, MAX_DAYS>,
    #[serde(default, deserialize_with = "lenient_label")]
    pub updated_at: Option<Label>,
}

impl Schedule {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn day(&self, index: usize) -> Option<&DayPlan> {
        self.days.get(index)
    }
}

/// Schedule decode error
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid JSON")]
    Json,
    #[error("no days in schedule")]
    Empty,
}

/// Parse the response body into a schedule.
///
/// A schedule without days is rejected; a partial decode never yields a value.
pub fn parse_schedule(json: &str) -> Result<Schedule, ScheduleError> {
    let mut scratch = [0u8; MAX_ESCAPED_LEN];
    let (schedule, _): (Schedule, usize) =
        serde_json_core::from_str_escaped(json, &mut scratch).map_err(|_| ScheduleError::Json)?;

    if schedule.is_empty() {
        return Err(ScheduleError::Empty);
    }

    Ok(schedule)
}

/// Build the schedule URL from the configured base URL
pub fn schedule_url(base_url: &str) -> Option<String<MAX_URL_LEN>> {
    let mut url = String::new();
    write!(url, "{}{}", base_url.trim_end_matches('/'), SCHEDULE_PATH).ok()?;
    Some(url)
}

/// Longest prefix of `s` that fits in `N` bytes without splitting a char
pub fn clip<const N: usize>(s: &str) -> String<N> {
    let mut end = s.len().min(N);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = String::new();
    let _ = out.push_str(&s[..end]);
    out
}

struct Clipped<const N: usize>(String<N>);

impl<'de, const N: usize> Deserialize<'de> for Clipped<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ClipVisitor<const N: usize>;

        impl<'de, const N: usize> Visitor<'de> for ClipVisitor<N> {
            type Value = Clipped<N>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(Clipped(clip(v)))
            }
        }

        deserializer.deserialize_str(ClipVisitor)
    }
}

fn clipped<'de, D, const N: usize>(deserializer: D) -> Result<String<N>, D::Error>
where
    D: Deserializer<'de>,
{
    Clipped::deserialize(deserializer).map(|c| c.0)
}

fn clipped_opt<'de, D, const N: usize>(deserializer: D) -> Result<Option<String<N>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Clipped<N>>::deserialize(deserializer).map(|c| c.map(|c| c.0))
}

/// Keep the first `N` days and skip the rest
fn first_days<'de, D, const N: usize>(deserializer: D) -> Result<Vec<DayPlan, N>, D::Error>
where
    D: Deserializer<'de>,
{
    struct DaysVisitor<const N: usize>;

    impl<'de, const N: usize> Visitor<'de> for DaysVisitor<N> {
        type Value = Vec<DayPlan, N>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of days")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut days = Vec::new();
            while !days.is_full() {
                match seq.next_element::<DayPlan>()? {
                    Some(day) => {
                        let _ = days.push(day);
                    }
                    None => return Ok(days),
                }
            }
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(days)
        }
    }

    deserializer.deserialize_seq(DaysVisitor)
}

/// Strings are clipped; `null` or any other value reads as absent
fn lenient_label<'de, D, const N: usize>(deserializer: D) -> Result<Option<String<N>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientVisitor<const N: usize>;

    impl<'de, const N: usize> Visitor<'de> for LenientVisitor<N> {
        type Value = Option<String<N>>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("any value")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(clip(v)))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(None)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
            Ok(None)
        }
    }

    deserializer.deserialize_ignored_any(LenientVisitor)
}

/// Present, non-blank text
pub fn text_or_none(value: &Option<Text>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
