//! Time-of-day type for the daily invitation trigger.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A daily trigger time in `HH:MM`, always interpreted as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DailyTime {
    hour: u32,
    minute: u32,
}

impl DailyTime {
    /// Used when a stored value cannot be parsed.
    pub const FALLBACK: DailyTime = DailyTime { hour: 9, minute: 0 };

    /// Seeded into the settings row on first start.
    pub const DEFAULT: DailyTime = DailyTime { hour: 8, minute: 0 };

    pub fn new(hour: u32, minute: u32) -> Result<Self, ConfigError> {
        if hour > 23 || minute > 59 {
            return Err(ConfigError::InvalidDailyTime(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// Parse a stored value, degrading to [`DailyTime::FALLBACK`].
    pub fn parse_or_fallback(s: &str) -> Self {
        s.parse().unwrap_or(Self::FALLBACK)
    }
}

impl Default for DailyTime {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for DailyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for DailyTime {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidDailyTime(s.to_string());
        let (hh, mm) = s.trim().split_once(':').ok_or_else(invalid)?;
        let well_formed = |part: &str| (1..=2).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit());
        if !well_formed(hh) || !well_formed(mm) {
            return Err(invalid());
        }
        let hour: u32 = hh.parse().map_err(|_| invalid())?;
        let minute: u32 = mm.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for DailyTime {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DailyTime> for String {
    fn from(value: DailyTime) -> Self {
        value.to_string()
    }
}
