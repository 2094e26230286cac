//! Shared types used across Tidemark.
//!
//! This module defines the enums and newtypes that describe a backup
//! schedule and the kind of artifact a job produces.

use crate::error::TidemarkError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// How often scheduled backups run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFrequency {
    /// Only run when explicitly requested
    Manual,
    /// At the start of every hour
    Hourly,
    /// Once a day at the scheduled time
    #[default]
    Daily,
    /// Once a week on the configured weekday
    Weekly,
    /// Once a month on the configured day of month
    Monthly,
}

impl fmt::Display for BackupFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Manual => "manual",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        };
        write!(f, "{s}")
    }
}

/// Day of week for weekly backups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    /// Sunday
    #[default]
    Sunday,
    /// Monday
    Monday,
    /// Tuesday
    Tuesday,
    /// Wednesday
    Wednesday,
    /// Thursday
    Thursday,
    /// Friday
    Friday,
    /// Saturday
    Saturday,
}

impl From<Weekday> for chrono::Weekday {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Sunday => chrono::Weekday::Sun,
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
        }
    }
}

/// Serialization format of a backup artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFormat {
    /// JSON document
    #[default]
    Json,
    /// XML document
    Xml,
}

impl BackupFormat {
    /// File extension used for this format (without the leading dot).
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }

    /// Parse a file extension back into a format.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(Self::Json),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

/// Kind of backup a job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    /// Self-sufficient artifact with all in-scope data
    Full,
    /// Only data changed since the previous backup
    Differential,
}

impl JobType {
    /// Whether this is a differential backup.
    #[must_use]
    pub fn is_differential(self) -> bool {
        matches!(self, Self::Differential)
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Differential => write!(f, "differential"),
        }
    }
}

/// Time of day at which daily, weekly and monthly backups run.
///
/// Serialized as a zero-padded `"HH:MM"` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScheduledTime {
    hour: u32,
    minute: u32,
}

impl ScheduledTime {
    /// Create a scheduled time from an hour (0-23) and minute (0-59).
    ///
    /// # Errors
    /// Returns error if either component is out of range.
    pub fn new(hour: u32, minute: u32) -> Result<Self, TidemarkError> {
        if hour > 23 || minute > 59 {
            return Err(TidemarkError::Validation(format!(
                "invalid scheduled time: {hour:02}:{minute:02} is out of range"
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Parse a `"HH:MM"` string.
    ///
    /// # Errors
    /// Returns error if the string is not a valid 24-hour time.
    pub fn parse(s: &str) -> Result<Self, TidemarkError> {
        static TIME_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = TIME_REGEX
            .get_or_init(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("valid regex"));

        let caps = regex.captures(s.trim()).ok_or_else(|| {
            TidemarkError::Validation(format!("invalid scheduled time: expected HH:MM, got '{s}'"))
        })?;
        let hour = caps[1]
            .parse()
            .map_err(|_| TidemarkError::Validation(format!("invalid hour in '{s}'")))?;
        let minute = caps[2]
            .parse()
            .map_err(|_| TidemarkError::Validation(format!("invalid minute in '{s}'")))?;
        Self::new(hour, minute)
    }

    /// Hour component (0-23).
    #[must_use]
    pub fn hour(self) -> u32 {
        self.hour
    }

    /// Minute component (0-59).
    #[must_use]
    pub fn minute(self) -> u32 {
        self.minute
    }

    /// Convert to a `chrono::NaiveTime` at second zero.
    #[must_use]
    pub fn to_naive_time(self) -> chrono::NaiveTime {
        chrono::NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(chrono::NaiveTime::MIN)
    }
}

impl Default for ScheduledTime {
    fn default() -> Self {
        Self { hour: 3, minute: 0 }
    }
}

impl fmt::Display for ScheduledTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl TryFrom<String> for ScheduledTime {
    type Error = TidemarkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ScheduledTime> for String {
    fn from(time: ScheduledTime) -> Self {
        time.to_string()
    }
}
