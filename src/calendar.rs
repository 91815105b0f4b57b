//! Calendar-day arithmetic shared by analytics and filters.
//!
//! Every "day" decision in the crate (overdue checks, the `today` quick
//! filter, completion-trend buckets) goes through a [`Clock`], so a board
//! uses exactly one definition of where a day starts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which timezone decides calendar-day boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Calendar {
    #[default]
    Local,
    Utc,
}

impl Calendar {
    /// Calendar date an instant falls on.
    pub fn date_of(self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Calendar::Local => instant.with_timezone(&Local).date_naive(),
            Calendar::Utc => instant.date_naive(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Calendar::Local => "local",
            Calendar::Utc => "utc",
        }
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Calendar {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Calendar::Local),
            "utc" => Ok(Calendar::Utc),
            other => Err(Error::InvalidArgument(format!(
                "invalid calendar '{other}' (expected local|utc)"
            ))),
        }
    }
}

/// A point in time paired with the calendar used to interpret it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    now: DateTime<Utc>,
    calendar: Calendar,
}

impl Clock {
    /// Clock reading the system time.
    pub fn system(calendar: Calendar) -> Self {
        Self {
            now: Utc::now(),
            calendar,
        }
    }

    /// Clock frozen at `now`.
    pub fn fixed(now: DateTime<Utc>, calendar: Calendar) -> Self {
        Self { now, calendar }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    pub fn today(&self) -> NaiveDate {
        self.calendar.date_of(self.now)
    }

    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.calendar.date_of(instant)
    }
}
