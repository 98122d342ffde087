//! Session configuration for temporal parsing

use crate::error::{TemporalError, TemporalResult};
use crate::format::{DEFAULT_DATE_FORMAT, DEFAULT_TIME_FORMAT, DEFAULT_TIMESTAMP_FORMAT};
use crate::timezone::{DEFAULT_TIMEZONE_ID, LOCAL_TIMEZONE_ID};
use crate::types::TemporalKind;
use serde::{Deserialize, Serialize};

/// Connection property naming the DATE pattern
pub const DATE_FORMAT_PROPERTY: &str = "query.dateFormat";
/// Connection property naming the TIME pattern
pub const TIME_FORMAT_PROPERTY: &str = "query.timeFormat";
/// Connection property naming the TIMESTAMP pattern
pub const TIMESTAMP_FORMAT_PROPERTY: &str = "query.timestampFormat";
/// Connection property naming the default timezone
pub const TIMEZONE_PROPERTY: &str = "query.dateFormatTimeZone";

/// Temporal settings of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemporalConfig {
    /// Zone literals are interpreted in when none is given
    pub timezone: String,

    /// Pattern for DATE literals
    pub date_format: String,

    /// Pattern for TIME literals
    pub time_format: String,

    /// Pattern for the whole-second part of TIMESTAMP literals
    pub timestamp_format: String,
}

impl TemporalConfig {
    /// Create a configuration with custom settings
    pub fn new(
        timezone: impl Into<String>,
        date_format: impl Into<String>,
        time_format: impl Into<String>,
        timestamp_format: impl Into<String>,
    ) -> Self {
        Self {
            timezone: timezone.into(),
            date_format: date_format.into(),
            time_format: time_format.into(),
            timestamp_format: timestamp_format.into(),
        }
    }

    /// Default patterns interpreted in UTC
    pub fn utc() -> Self {
        Self::default().with_timezone("UTC")
    }

    /// Default patterns interpreted in the platform zone
    pub fn platform() -> Self {
        Self::default().with_timezone(LOCAL_TIMEZONE_ID)
    }

    /// Replace the default timezone
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Replace the DATE pattern
    pub fn with_date_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_format = pattern.into();
        self
    }

    /// Replace the TIME pattern
    pub fn with_time_format(mut self, pattern: impl Into<String>) -> Self {
        self.time_format = pattern.into();
        self
    }

    /// Replace the TIMESTAMP pattern
    pub fn with_timestamp_format(mut self, pattern: impl Into<String>) -> Self {
        self.timestamp_format = pattern.into();
        self
    }

    /// Pattern configured for a temporal kind
    pub fn format_for(&self, kind: TemporalKind) -> &str {
        match kind {
            TemporalKind::Date => &self.date_format,
            TemporalKind::Time => &self.time_format,
            TemporalKind::Timestamp => &self.timestamp_format,
        }
    }

    /// Build from connection properties, unknown keys are ignored
    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut config = Self::default();
        for (key, value) in properties {
            match key.as_ref() {
                DATE_FORMAT_PROPERTY => config.date_format = value.into(),
                TIME_FORMAT_PROPERTY => config.time_format = value.into(),
                TIMESTAMP_FORMAT_PROPERTY => config.timestamp_format = value.into(),
                TIMEZONE_PROPERTY => config.timezone = value.into(),
                _ => {}
            }
        }
        config
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> TemporalResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| TemporalError::InvalidConfiguration(err.to_string()))
    }
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE_ID.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}
