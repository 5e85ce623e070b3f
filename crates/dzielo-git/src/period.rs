// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Calendar period resolution
//!
//! A [`Period`] is a half-open date range `[start, end)` covering one calendar
//! month. Both bounds are midnights in a time zone fixed at construction
//! (the local zone unless another is given), stored as UTC instants for
//! comparison against commit timestamps.

use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

/// Which month a run should cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeriodSelector {
    /// The month containing the reference date
    #[default]
    CurrentMonth,
    /// The month before the one containing the reference date
    PreviousMonth,
    /// An explicitly requested month (1-12) and year
    Explicit {
        /// Month number, 1 through 12
        month: u32,
        /// Calendar year
        year: i32,
    },
}

/// Errors produced while resolving a period
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    /// Month outside 1-12
    #[error("invalid period: month must be between 1 and 12, got {month}")]
    InvalidMonth {
        /// The rejected month value
        month: u32,
    },

    /// Year outside the range chrono can represent
    #[error("invalid period: {year}-{month:02} is outside the supported calendar range")]
    OutOfRange {
        /// Requested year
        year: i32,
        /// Requested month
        month: u32,
    },
}

/// Half-open date range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
}

impl Period {
    /// The full calendar month `month` of `year` in the local time zone
    ///
    /// # Errors
    ///
    /// Returns `PeriodError::InvalidMonth` if `month` is not in 1-12, or
    /// `PeriodError::OutOfRange` if the month cannot be represented.
    pub fn month(year: i32, month: u32) -> Result<Self, PeriodError> {
        Self::month_in(year, month, &Local)
    }

    /// The full calendar month `month` of `year`, bounded by midnights in `tz`
    ///
    /// # Errors
    ///
    /// Same as [`Period::month`].
    pub fn month_in<Tz: TimeZone>(year: i32, month: u32, tz: &Tz) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth { month });
        }
        let (next_year, next_month) = if month == 12 {
            (year.checked_add(1), 1)
        } else {
            (Some(year), month + 1)
        };

        let out_of_range = || PeriodError::OutOfRange { year, month };
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(out_of_range)?;
        let end = next_year
            .and_then(|y| NaiveDate::from_ymd_opt(y, next_month, 1))
            .ok_or_else(out_of_range)?;

        Ok(Self {
            start,
            end,
            start_at: first_instant(start, tz),
            end_at: first_instant(end, tz),
        })
    }

    /// Resolve a selector against a reference date in the local time zone
    ///
    /// # Errors
    ///
    /// Returns `PeriodError` when an explicit selector names an invalid month
    /// or when the resulting month falls outside the supported range.
    pub fn resolve(selector: PeriodSelector, today: NaiveDate) -> Result<Self, PeriodError> {
        Self::resolve_in(selector, today, &Local)
    }

    /// Resolve a selector with bounds at midnights in `tz`
    ///
    /// # Errors
    ///
    /// Same as [`Period::resolve`].
    pub fn resolve_in<Tz: TimeZone>(
        selector: PeriodSelector,
        today: NaiveDate,
        tz: &Tz,
    ) -> Result<Self, PeriodError> {
        match selector {
            PeriodSelector::CurrentMonth => Self::month_in(today.year(), today.month(), tz),
            PeriodSelector::PreviousMonth => {
                if today.month() == 1 {
                    let year = today.year().checked_sub(1).ok_or(PeriodError::OutOfRange {
                        year: today.year(),
                        month: 1,
                    })?;
                    Self::month_in(year, 12, tz)
                } else {
                    Self::month_in(today.year(), today.month() - 1, tz)
                }
            }
            PeriodSelector::Explicit { month, year } => Self::month_in(year, month, tz),
        }
    }

    /// First day of the period (inclusive)
    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day after the period (exclusive)
    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive lower bound as a UTC instant
    #[must_use]
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start_at
    }

    /// Exclusive upper bound as a UTC instant
    #[must_use]
    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end_at
    }

    /// Whether `timestamp` satisfies `start <= timestamp < end`
    #[must_use]
    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        *timestamp >= self.start_at && *timestamp < self.end_at
    }

    /// Year of the period start
    #[must_use]
    pub fn year(&self) -> i32 {
        self.start.year()
    }

    /// Month of the period start
    #[must_use]
    pub fn month_number(&self) -> u32 {
        self.start.month()
    }

    /// `YYYY_MM` label used in output file names
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}_{:02}", self.year(), self.month_number())
    }
}

/// First instant of `date` in `tz`
///
/// A midnight skipped by a daylight-saving jump resolves to the first hour
/// that exists; an ambiguous one to its earlier reading.
fn first_instant<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    (0..=2)
        .find_map(|hour| {
            tz.from_local_datetime(&(midnight + chrono::Duration::hours(hour)))
                .earliest()
        })
        .map_or_else(|| midnight.and_utc(), |instant| instant.with_timezone(&Utc))
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: end is always the first day of the following calendar month
        #[test]
        fn prop_explicit_end_is_next_month_start(month in 1u32..=12, year in 1900i32..2200) {
            let period = Period::month(year, month).expect("valid period");
            prop_assert_eq!(period.start().day(), 1);
            prop_assert_eq!(period.end().day(), 1);
            prop_assert!(period.start() < period.end());
            if month == 12 {
                prop_assert_eq!(period.end().year(), year + 1);
                prop_assert_eq!(period.end().month(), 1);
            } else {
                prop_assert_eq!(period.end().year(), year);
                prop_assert_eq!(period.end().month(), month + 1);
            }
        }

        /// Property: months outside 1-12 are always rejected
        #[test]
        fn prop_out_of_range_month_rejected(month in 13u32..1000, year in 1900i32..2200) {
            prop_assert_eq!(
                Period::month(year, month),
                Err(PeriodError::InvalidMonth { month })
            );
        }

        /// Property: the previous month ends exactly where the current month starts
        #[test]
        fn prop_previous_month_adjoins_current(days in 0i64..80_000) {
            let today = NaiveDate::from_ymd_opt(1950, 1, 1).expect("base date")
                + chrono::Duration::days(days);
            let current = Period::resolve(PeriodSelector::CurrentMonth, today).expect("current");
            let previous = Period::resolve(PeriodSelector::PreviousMonth, today).expect("previous");
            prop_assert_eq!(previous.end(), current.start());
        }
    }
}
