//! Meal types and serving windows.
//!
//! QR codes can only be issued while the matching window is open, so the
//! window bounds here are the single source of truth for "is this meal on".

use std::fmt;

use chrono::{Local, NaiveTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serving windows, start inclusive and end exclusive.
const WINDOWS: [(MealType, (u32, u32), (u32, u32)); 3] = [
    (MealType::Breakfast, (7, 0), (10, 30)),
    (MealType::Lunch, (12, 0), (15, 30)),
    (MealType::Dinner, (19, 0), (23, 30)),
];

pub fn active_meal(at: NaiveTime) -> Option<MealType> {
    for (meal, (start_h, start_m), (end_h, end_m)) in WINDOWS {
        let start = NaiveTime::from_hms_opt(start_h, start_m, 0)?;
        let end = NaiveTime::from_hms_opt(end_h, end_m, 0)?;

        if at >= start && at < end {
            return Some(meal);
        }
    }
    None
}

pub fn active_meal_now() -> Option<MealType> {
    active_meal(Local::now().time())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_breakfast_bounds() {
        assert_eq!(active_meal(at(6, 59)), None);
        assert_eq!(active_meal(at(7, 0)), Some(MealType::Breakfast));
        assert_eq!(active_meal(at(10, 29)), Some(MealType::Breakfast));
        assert_eq!(active_meal(at(10, 30)), None);
    }

    #[test]
    fn test_lunch_bounds() {
        assert_eq!(active_meal(at(11, 59)), None);
        assert_eq!(active_meal(at(12, 0)), Some(MealType::Lunch));
        assert_eq!(active_meal(at(15, 29)), Some(MealType::Lunch));
        assert_eq!(active_meal(at(15, 30)), None);
    }

    #[test]
    fn test_dinner_bounds() {
        assert_eq!(active_meal(at(18, 59)), None);
        assert_eq!(active_meal(at(19, 0)), Some(MealType::Dinner));
        assert_eq!(active_meal(at(23, 29)), Some(MealType::Dinner));
        assert_eq!(active_meal(at(23, 30)), None);
    }

    #[test]
    fn test_gaps_have_no_meal() {
        assert_eq!(active_meal(at(0, 0)), None);
        assert_eq!(active_meal(at(11, 0)), None);
        assert_eq!(active_meal(at(17, 0)), None);
    }
}
