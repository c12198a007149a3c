//! Calendar month value type.
//!
//! chrono has no year-month type; income periods and reporting deadlines
//! are month-granular, so dates are widened to this type at the boundary.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A calendar month (year + month), ordered chronologically.
///
/// Serialized as `YYYY-MM`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarMonth {
    year: i32,
    month: u32,
}

/// Error parsing a `YYYY-MM` string.
#[derive(Debug, Error)]
#[error("invalid calendar month: {0}")]
pub struct ParseCalendarMonthError(String);

impl CalendarMonth {
    /// Creates a calendar month. Panics if `month` is outside `1..=12`.
    pub fn new(year: i32, month: u32) -> Self {
        assert!((1..=12).contains(&month), "month must be in 1..=12");
        Self { year, month }
    }

    /// The month containing the given date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn plus_months(self, months: u32) -> Self {
        Self::from_month_index(self.month_index() + i64::from(months))
    }

    pub fn minus_months(self, months: u32) -> Self {
        Self::from_month_index(self.month_index() - i64::from(months))
    }

    /// The first day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).expect("month is in 1..=12")
    }

    /// All months from `self` through `end`, inclusive. Empty if `end < self`.
    pub fn through(self, end: CalendarMonth) -> impl Iterator<Item = CalendarMonth> {
        let count = (end.month_index() - self.month_index() + 1).max(0) as u32;
        (0..count).map(move |i| self.plus_months(i))
    }

    fn month_index(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    fn from_month_index(index: i64) -> Self {
        Self {
            year: index.div_euclid(12) as i32,
            month: (index.rem_euclid(12) + 1) as u32,
        }
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Debug for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl FromStr for CalendarMonth {
    type Err = ParseCalendarMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseCalendarMonthError(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        if !(1..=12).contains(&month) {
            return Err(err());
        }
        Ok(Self { year, month })
    }
}

impl Serialize for CalendarMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CalendarMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
