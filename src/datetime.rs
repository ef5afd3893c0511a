//! UTC timestamps in the fixed `YYYYMMDDThhmmssZ` wire format.

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use pest::Parser as _;
use pest_derive::Parser;
use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Parser)]
#[grammar = "datetime.pest"]
struct DateTimeParser;

/// Days between 0001-01-01 and 1970-01-01.
const EPOCH_DAYS_FROM_CE: i64 = 719_163;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DateTimeError {
    #[error("{0:?} does not match YYYYMMDDThhmmssZ")]
    Malformed(String),

    #[error("{field} must be in range [{low}, {high}], was {value}")]
    OutOfRange {
        field: String,
        value: u32,
        low: u32,
        high: u32,
    },
}

/// A calendar-validated UTC timestamp.
///
/// Ordering and equality go through the derived epoch value, so
/// `20230101T240000Z` and `20230102T000000Z` compare equal even though they
/// render differently.
#[derive(Clone, Copy, Debug)]
pub struct UtcDateTime {
    year: u32,
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    second: u32,
    epoch: i64,
}

fn is_leap_year(year: u32) -> bool {
    year % 400 == 0 || (year % 4 == 0 && year % 100 != 0)
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn check_range(field: impl Into<String>, value: u32, low: u32, high: u32) -> Result<(), DateTimeError> {
    if value < low || value > high {
        return Err(DateTimeError::OutOfRange {
            field: field.into(),
            value,
            low,
            high,
        });
    }
    Ok(())
}

impl UtcDateTime {
    pub fn new(
        year: u32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: u32,
    ) -> Result<Self, DateTimeError> {
        check_range("Year", year, 0, 9999)?;
        check_range("Month", month, 1, 12)?;
        check_range(
            format!("Day in month {} of year {}", month, year),
            day,
            1,
            days_in_month(year, month),
        )?;
        check_range("Hour", hour, 0, 24)?;
        check_range("Minute", minute, 0, 60)?;
        check_range("Second", second, 0, 60)?;

        let date = NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(|| {
            DateTimeError::OutOfRange {
                field: "Day".to_owned(),
                value: day,
                low: 1,
                high: days_in_month(year, month),
            }
        })?;
        let days = i64::from(date.num_days_from_ce()) - EPOCH_DAYS_FROM_CE;
        let epoch = days * 86_400 + i64::from(hour) * 3_600 + i64::from(minute) * 60 + i64::from(second);

        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            epoch,
        })
    }

    /// Seconds since 1970-01-01T00:00:00Z.
    pub fn epoch_seconds(&self) -> i64 {
        self.epoch
    }

    pub fn year(&self) -> u32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }
}

impl FromStr for UtcDateTime {
    type Err = DateTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DateTimeError::Malformed(s.to_owned());
        let pair = DateTimeParser::parse(Rule::date_time, s)
            .map_err(|_| malformed())?
            .next()
            .ok_or_else(malformed)?;

        let mut fields = [0u32; 6];
        for part in pair.into_inner() {
            let slot = match part.as_rule() {
                Rule::year => 0,
                Rule::month => 1,
                Rule::day => 2,
                Rule::hour => 3,
                Rule::minute => 4,
                Rule::second => 5,
                _ => continue,
            };
            fields[slot] = part.as_str().parse().map_err(|_| malformed())?;
        }

        let [year, month, day, hour, minute, second] = fields;
        Self::new(year, month, day, hour, minute, second)
    }
}

impl fmt::Display for UtcDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}{:02}{:02}T{:02}{:02}{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

impl PartialEq for UtcDateTime {
    fn eq(&self, other: &Self) -> bool {
        self.epoch == other.epoch
    }
}

impl Eq for UtcDateTime {}

impl PartialOrd for UtcDateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UtcDateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch.cmp(&other.epoch)
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
