//! Calendar months used to key monthly archive packages

use crate::error::{Result, TedError};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A calendar month, e.g. `2021-03`.
///
/// Ordering is chronological. Serialized as the `YYYY-MM` string, which is
/// also the `MONTH` column value of every extracted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Create a month, rejecting month numbers outside 1..=12
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(TedError::InvalidMonth(format!("{year}-{month}")));
        }
        if !(0..=9999).contains(&year) {
            return Err(TedError::InvalidMonth(format!("{year}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// The current month in UTC
    pub fn current() -> Self {
        let now = Utc::now();
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following month
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = TedError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || TedError::InvalidMonth(s.to_string());

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;

        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for YearMonth {
    type Error = TedError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// An inclusive range of months, iterated in chronological order
///
/// Deserialization goes through [`MonthRange::new`], so a reversed range is
/// rejected there too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct MonthRange {
    start: YearMonth,
    end: YearMonth,
}

#[derive(Deserialize)]
struct RangeBounds {
    start: YearMonth,
    end: YearMonth,
}

impl TryFrom<RangeBounds> for MonthRange {
    type Error = TedError;

    fn try_from(bounds: RangeBounds) -> Result<Self> {
        Self::new(bounds.start, bounds.end)
    }
}

impl MonthRange {
    /// Create a range; `end` must not precede `start`
    pub fn new(start: YearMonth, end: YearMonth) -> Result<Self> {
        if end < start {
            return Err(TedError::InvalidRange(format!(
                "end month {end} must be greater than or equal to start month {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> YearMonth {
        self.start
    }

    pub fn end(&self) -> YearMonth {
        self.end
    }

    /// Reject ranges starting before `first_year` or ending after `latest`
    pub fn check_bounds(&self, first_year: i32, latest: YearMonth) -> Result<()> {
        if self.start.year() < first_year {
            return Err(TedError::InvalidRange(format!(
                "start month {} is before {first_year}",
                self.start
            )));
        }
        if self.end > latest {
            return Err(TedError::InvalidRange(format!(
                "end month {} must not be in the future",
                self.end
            )));
        }
        Ok(())
    }

    /// Number of months in the range
    pub fn len(&self) -> usize {
        let months = |m: YearMonth| i64::from(m.year()) * 12 + i64::from(m.month());
        (months(self.end) - months(self.start) + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl IntoIterator for MonthRange {
    type Item = YearMonth;
    type IntoIter = Months;

    fn into_iter(self) -> Months {
        Months {
            next: Some(self.start),
            end: self.end,
        }
    }
}

/// Iterator over the months of a [`MonthRange`]
#[derive(Debug, Clone)]
pub struct Months {
    next: Option<YearMonth>,
    end: YearMonth,
}

impl Iterator for Months {
    type Item = YearMonth;

    fn next(&mut self) -> Option<YearMonth> {
        let current = self.next?;
        self.next = (current < self.end).then(|| current.next());
        Some(current)
    }
}
