//! Canonical numeric form of a parsed temporal literal

use crate::error::{TemporalError, TemporalResult};
use crate::types::LogicalType;
use chrono::{DateTime, SecondsFormat, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Nanoseconds in one second
pub const NANOS_PER_SECOND: i32 = 1_000_000_000;

/// Nanoseconds in one millisecond
pub const NANOS_PER_MILLI: i32 = 1_000_000;

/// Milliseconds since the Unix epoch plus a sub-second nanosecond addition
///
/// The represented instant is `millis` milliseconds plus `nanos` nanoseconds
/// after 1970-01-01T00:00:00Z. `nanos` is always in `0..1_000_000_000`.
///
/// Equality, ordering and hashing compare instants, so two values are equal
/// exactly when they denote the same nanosecond. In particular
/// `(120055 ms, 60 ns)` and `(120100 ms, 60 ns)` are different values.
#[derive(Debug, Clone, Copy)]
pub struct ParsedTemporal {
    millis: i64,
    nanos: i32,
}

impl ParsedTemporal {
    /// The epoch itself
    pub const EPOCH: ParsedTemporal = ParsedTemporal {
        millis: 0,
        nanos: 0,
    };

    /// Build a value from epoch millis and an additional nanosecond count
    pub fn new(millis: i64, nanos: i32) -> TemporalResult<Self> {
        if !(0..NANOS_PER_SECOND).contains(&nanos) {
            return Err(TemporalError::ValueOutOfRange {
                logical_type: LogicalType::Timestamp,
                reason: format!("nanos {nanos} outside 0..{NANOS_PER_SECOND}"),
            });
        }
        if millis.checked_add(i64::from(nanos / NANOS_PER_MILLI)).is_none() {
            return Err(TemporalError::ValueOutOfRange {
                logical_type: LogicalType::Timestamp,
                reason: format!("{millis} ms + {nanos} ns overflows"),
            });
        }
        Ok(Self { millis, nanos })
    }

    /// Build a value with millisecond precision
    pub fn from_millis(millis: i64) -> Self {
        Self { millis, nanos: 0 }
    }

    /// Build a value from nanoseconds since the epoch
    pub fn from_epoch_nanos(total: i128) -> Option<Self> {
        let per_milli = i128::from(NANOS_PER_MILLI);
        let millis = i64::try_from(total.div_euclid(per_milli)).ok()?;
        let nanos = total.rem_euclid(per_milli) as i32;
        Some(Self { millis, nanos })
    }

    /// Build a value from a chrono instant
    pub fn from_datetime(instant: &DateTime<Utc>) -> Self {
        Self {
            millis: instant.timestamp_millis(),
            nanos: (instant.timestamp_subsec_nanos() % NANOS_PER_MILLI as u32) as i32,
        }
    }

    /// Milliseconds part as stored
    pub fn millis(&self) -> i64 {
        self.millis
    }

    /// Nanosecond addition as stored
    pub fn nanos(&self) -> i32 {
        self.nanos
    }

    /// Instant in whole milliseconds, sub-millisecond nanos dropped
    pub fn epoch_millis(&self) -> i64 {
        self.millis + i64::from(self.nanos / NANOS_PER_MILLI)
    }

    /// Instant in nanoseconds since the epoch
    pub fn epoch_nanos(&self) -> i128 {
        i128::from(self.millis) * i128::from(NANOS_PER_MILLI) + i128::from(self.nanos)
    }

    /// Same instant with whole milliseconds folded into `millis`
    pub fn normalized(&self) -> Self {
        Self {
            millis: self.epoch_millis(),
            nanos: self.nanos % NANOS_PER_MILLI,
        }
    }

    /// Same instant truncated to millisecond precision
    pub fn truncated_to_millis(&self) -> Self {
        Self::from_millis(self.epoch_millis())
    }

    /// Convert to a chrono instant, `None` outside chrono's range
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let total = self.epoch_nanos();
        let per_second = i128::from(NANOS_PER_SECOND);
        let secs = i64::try_from(total.div_euclid(per_second)).ok()?;
        let subsec = total.rem_euclid(per_second) as u32;
        DateTime::from_timestamp(secs, subsec)
    }
}

impl Default for ParsedTemporal {
    fn default() -> Self {
        Self::EPOCH
    }
}

impl PartialEq for ParsedTemporal {
    fn eq(&self, other: &Self) -> bool {
        self.epoch_nanos() == other.epoch_nanos()
    }
}

impl Eq for ParsedTemporal {}

impl PartialOrd for ParsedTemporal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParsedTemporal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch_nanos().cmp(&other.epoch_nanos())
    }
}

impl Hash for ParsedTemporal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch_nanos().hash(state);
    }
}

impl fmt::Display for ParsedTemporal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => write!(f, "{}ms+{}ns", self.millis, self.nanos),
        }
    }
}

impl From<DateTime<Utc>> for ParsedTemporal {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::from_datetime(&instant)
    }
}
