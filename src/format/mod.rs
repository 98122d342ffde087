//! Date/time format patterns
//!
//! Patterns use the familiar letter syntax (`yyyy-MM-dd HH:mm:ss`). They are
//! compiled once with nom into a list of items and then matched against
//! literal text without backtracking beyond optional sections.

mod parser;
mod pattern;

pub use parser::FormatParser;
pub use pattern::{Field, FormatItem, FormatItems, compile};

/// Default pattern for DATE literals; the time of day is optional
pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd[ HH:mm:ss[.SSS]]";

/// Default pattern for TIME literals; a leading date is optional
pub const DEFAULT_TIME_FORMAT: &str = "[yyyy-MM-dd ]HH:mm:ss[.SSS]";

/// Default pattern for the whole-second part of TIMESTAMP literals
///
/// The fractional seconds after the first `.` are handled separately so that
/// up to nine digits survive.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "yyyy-MM-dd HH:mm:ss";
