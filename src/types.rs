//! Logical SQL types and sort orders understood by the temporal codecs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical data type of a column or expression
///
/// Only the temporal variants have parsers and codecs. The remaining variants
/// exist so that callers holding an arbitrary type can ask and be refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogicalType {
    /// Calendar date, stored with millisecond precision
    Date,
    /// Time of day, stored with millisecond precision
    Time,
    /// Instant with nanosecond precision
    Timestamp,
    /// Date restricted to non-negative epoch millis
    UnsignedDate,
    /// Time restricted to non-negative epoch millis
    UnsignedTime,
    /// Timestamp restricted to non-negative epoch millis
    UnsignedTimestamp,
    /// Boolean
    Boolean,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// Arbitrary precision decimal
    Decimal,
    /// Variable length string
    Varchar,
    /// Variable length bytes
    Binary,
}

/// Kind of temporal literal a type is parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    /// `yyyy-MM-dd`
    Date,
    /// `HH:mm:ss`
    Time,
    /// `yyyy-MM-dd HH:mm:ss[.fraction]`
    Timestamp,
}

impl LogicalType {
    /// SQL name of the type
    pub fn sql_name(&self) -> &'static str {
        match self {
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::UnsignedDate => "UNSIGNED_DATE",
            Self::UnsignedTime => "UNSIGNED_TIME",
            Self::UnsignedTimestamp => "UNSIGNED_TIMESTAMP",
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::BigInt => "BIGINT",
            Self::Decimal => "DECIMAL",
            Self::Varchar => "VARCHAR",
            Self::Binary => "BINARY",
        }
    }

    /// Temporal kind of the type, `None` for non-temporal types
    pub fn temporal_kind(&self) -> Option<TemporalKind> {
        match self {
            Self::Date | Self::UnsignedDate => Some(TemporalKind::Date),
            Self::Time | Self::UnsignedTime => Some(TemporalKind::Time),
            Self::Timestamp | Self::UnsignedTimestamp => Some(TemporalKind::Timestamp),
            _ => None,
        }
    }

    /// Check if this type has a temporal codec
    pub fn is_temporal(&self) -> bool {
        self.temporal_kind().is_some()
    }

    /// Check if the type rejects values before the epoch
    pub fn is_unsigned(&self) -> bool {
        matches!(
            self,
            Self::UnsignedDate | Self::UnsignedTime | Self::UnsignedTimestamp
        )
    }

    /// Check if the type keeps sub-millisecond precision
    pub fn has_nanos(&self) -> bool {
        matches!(self, Self::Timestamp | Self::UnsignedTimestamp)
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

impl FromStr for LogicalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let ty = match upper.as_str() {
            "DATE" => Self::Date,
            "TIME" => Self::Time,
            "TIMESTAMP" => Self::Timestamp,
            "UNSIGNED_DATE" => Self::UnsignedDate,
            "UNSIGNED_TIME" => Self::UnsignedTime,
            "UNSIGNED_TIMESTAMP" => Self::UnsignedTimestamp,
            "BOOLEAN" => Self::Boolean,
            "INTEGER" | "INT" => Self::Integer,
            "BIGINT" => Self::BigInt,
            "DECIMAL" => Self::Decimal,
            "VARCHAR" => Self::Varchar,
            "BINARY" | "VARBINARY" => Self::Binary,
            _ => return Err(format!("Unknown type '{s}'")),
        };
        Ok(ty)
    }
}

/// Sort order of an encoded key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Natural byte order
    #[default]
    Asc,
    /// Every byte inverted, reversing the order
    Desc,
}

impl SortOrder {
    /// Apply the order to freshly encoded ascending bytes, or undo it
    pub(crate) fn apply(self, bytes: &mut [u8]) {
        if self == SortOrder::Desc {
            for b in bytes.iter_mut() {
                *b = !*b;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sql_names() {
        assert_eq!("date".parse::<LogicalType>(), Ok(LogicalType::Date));
        assert_eq!(
            " unsigned_timestamp ".parse::<LogicalType>(),
            Ok(LogicalType::UnsignedTimestamp)
        );
        assert_eq!("INT".parse::<LogicalType>(), Ok(LogicalType::Integer));
        assert!("INTERVAL".parse::<LogicalType>().is_err());
    }

    #[test]
    fn test_temporal_classification() {
        assert_eq!(LogicalType::UnsignedTime.temporal_kind(), Some(TemporalKind::Time));
        assert!(LogicalType::Timestamp.has_nanos());
        assert!(!LogicalType::Date.has_nanos());
        assert!(!LogicalType::Varchar.is_temporal());
        assert!(LogicalType::UnsignedDate.is_unsigned());
    }

    #[test]
    fn test_sort_order_inverts() {
        let mut bytes = [0x00, 0x7f, 0xff];
        SortOrder::Desc.apply(&mut bytes);
        assert_eq!(bytes, [0xff, 0x80, 0x00]);
        SortOrder::Asc.apply(&mut bytes);
        assert_eq!(bytes, [0xff, 0x80, 0x00]);
    }
}
