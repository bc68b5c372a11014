use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, SignageError};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A birthday-relevant calendar position: month and day, no year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalendarDate {
    pub month: u8,
    pub day: u8,
}

impl CalendarDate {
    pub fn new(month: u8, day: u8) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(SignageError::InvalidDate(format!(
                "month {} is out of range 1-12",
                month
            )));
        }
        if !(1..=31).contains(&day) {
            return Err(SignageError::InvalidDate(format!(
                "day {} is out of range 1-31",
                day
            )));
        }
        Ok(Self { month, day })
    }

    pub fn month_name(&self) -> &'static str {
        month_name(self.month)
    }
}

/// Name of a month in 1..=12, empty for anything else.
pub fn month_name(month: u8) -> &'static str {
    match month {
        1..=12 => MONTH_NAMES[usize::from(month - 1)],
        _ => "",
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_name(), self.day)
    }
}

/// Parses `MM-DD`, e.g. `03-05`.
impl FromStr for CalendarDate {
    type Err = SignageError;

    fn from_str(s: &str) -> Result<Self> {
        let (month, day) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| SignageError::InvalidDate(s.to_string()))?;
        let month = month
            .parse::<u8>()
            .map_err(|_| SignageError::InvalidDate(s.to_string()))?;
        let day = day
            .parse::<u8>()
            .map_err(|_| SignageError::InvalidDate(s.to_string()))?;
        CalendarDate::new(month, day)
    }
}

/// Which wall clock decides what "today" is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockMode {
    #[default]
    Local,
    Utc,
}

pub trait Clock: Send + Sync {
    fn today(&self) -> CalendarDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    mode: ClockMode,
}

impl SystemClock {
    pub fn new(mode: ClockMode) -> Self {
        Self { mode }
    }
}

impl Clock for SystemClock {
    fn today(&self) -> CalendarDate {
        let (month, day) = match self.mode {
            ClockMode::Local => {
                let now = Local::now();
                (now.month(), now.day())
            }
            ClockMode::Utc => {
                let now = Utc::now();
                (now.month(), now.day())
            }
        };
        // chrono guarantees 1..=12 and 1..=31
        CalendarDate {
            month: month as u8,
            day: day as u8,
        }
    }
}

/// Always reports the same date. Used by `--date` and in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub CalendarDate);

impl Clock for FixedClock {
    fn today(&self) -> CalendarDate {
        self.0
    }
}
