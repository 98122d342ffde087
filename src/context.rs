// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-session temporal context
//!
//! A [`TemporalContext`] is created when a session starts and handed to
//! everything that parses or encodes temporal values. It owns the session's
//! default timezone and patterns and a concurrent cache of compiled parsers.

use crate::codec::TemporalCodec;
use crate::config::TemporalConfig;
use crate::error::{TemporalError, TemporalResult};
use crate::format::{Field, FormatItem, FormatParser, compile};
use crate::timezone::Timezone;
use crate::types::{LogicalType, TemporalKind};
use crate::value::{NANOS_PER_SECOND, ParsedTemporal};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// Most fractional-second digits a timestamp literal may carry
pub const MAX_FRACTION_DIGITS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ParserKey {
    pattern: String,
    timezone: Timezone,
}

/// Temporal configuration and parser cache of one session
#[derive(Debug)]
pub struct TemporalContext {
    config: TemporalConfig,
    default_timezone: Timezone,
    date_parser: Arc<FormatParser>,
    time_parser: Arc<FormatParser>,
    timestamp_parser: Arc<FormatParser>,
    parsers: DashMap<ParserKey, Arc<FormatParser>>,
}

impl TemporalContext {
    /// Create a context, resolving the timezone and compiling the default patterns
    pub fn new(config: TemporalConfig) -> TemporalResult<Self> {
        let default_timezone = Timezone::parse(&config.timezone)?;
        check_timestamp_format(&config.timestamp_format)?;
        let parsers = DashMap::new();
        let date_parser = cached_parser(&parsers, &config.date_format, default_timezone)?;
        let time_parser = cached_parser(&parsers, &config.time_format, default_timezone)?;
        let timestamp_parser =
            cached_parser(&parsers, &config.timestamp_format, default_timezone)?;

        log::debug!(
            "Created temporal context in {default_timezone} (date '{}', time '{}', timestamp '{}')",
            config.date_format,
            config.time_format,
            config.timestamp_format
        );

        Ok(Self {
            config,
            default_timezone,
            date_parser,
            time_parser,
            timestamp_parser,
            parsers,
        })
    }

    /// Configuration the context was built from
    pub fn config(&self) -> &TemporalConfig {
        &self.config
    }

    /// Zone used when callers do not name one
    pub fn default_timezone(&self) -> &Timezone {
        &self.default_timezone
    }

    /// Parser for `pattern` (or the type's configured pattern) in `timezone_id`
    /// (or the default zone)
    ///
    /// Parsers are cached by pattern and resolved zone, so `GMT+1` and
    /// `GMT+01:00` share an entry.
    pub fn get_date_time_parser(
        &self,
        pattern: Option<&str>,
        logical_type: LogicalType,
        timezone_id: Option<&str>,
    ) -> TemporalResult<Arc<FormatParser>> {
        let kind = temporal_kind(logical_type)?;
        let pattern = pattern.unwrap_or_else(|| self.config.format_for(kind));
        let timezone = match timezone_id {
            Some(id) => Timezone::parse(id)?,
            None => self.default_timezone,
        };
        self.get_parser(pattern, timezone)
    }

    /// Parser for an explicit pattern and resolved zone
    pub fn get_parser(&self, pattern: &str, timezone: Timezone) -> TemporalResult<Arc<FormatParser>> {
        cached_parser(&self.parsers, pattern, timezone)
    }

    /// Codec for a temporal type
    pub fn get_codec_for(&self, logical_type: LogicalType) -> TemporalResult<TemporalCodec> {
        TemporalCodec::for_type(logical_type)
    }

    /// Parse a DATE literal with the default pattern and zone
    pub fn parse_date(&self, text: &str) -> TemporalResult<ParsedTemporal> {
        Ok(ParsedTemporal::from_millis(self.date_parser.parse_date_time(text)?))
    }

    /// Parse a TIME literal with the default pattern and zone
    pub fn parse_time(&self, text: &str) -> TemporalResult<ParsedTemporal> {
        Ok(ParsedTemporal::from_millis(self.time_parser.parse_date_time(text)?))
    }

    /// Parse a TIMESTAMP literal with up to nine fractional-second digits
    pub fn parse_timestamp(&self, text: &str) -> TemporalResult<ParsedTemporal> {
        parse_timestamp_with(&self.timestamp_parser, text)
    }

    /// Parse a literal of any temporal type, optionally in an explicit zone
    pub fn parse_literal(
        &self,
        text: &str,
        logical_type: LogicalType,
        timezone_id: Option<&str>,
    ) -> TemporalResult<ParsedTemporal> {
        let kind = temporal_kind(logical_type)?;
        let parser = match timezone_id {
            Some(_) => self.get_date_time_parser(None, logical_type, timezone_id)?,
            None => Arc::clone(self.default_parser(kind)),
        };
        match kind {
            TemporalKind::Timestamp => parse_timestamp_with(&parser, text),
            TemporalKind::Date | TemporalKind::Time => {
                Ok(ParsedTemporal::from_millis(parser.parse_date_time(text)?))
            }
        }
    }

    /// Render a value with the type's default pattern in the default zone
    ///
    /// Timestamps get their fractional seconds appended with trailing zeros
    /// removed.
    pub fn format_literal(
        &self,
        value: &ParsedTemporal,
        logical_type: LogicalType,
    ) -> TemporalResult<String> {
        let kind = temporal_kind(logical_type)?;
        let parser = self.default_parser(kind);
        if kind != TemporalKind::Timestamp {
            return parser.format(value.epoch_millis());
        }

        let total = value.epoch_nanos();
        let per_second = i128::from(NANOS_PER_SECOND);
        let seconds = i64::try_from(total.div_euclid(per_second)).map_err(|_| {
            TemporalError::ValueOutOfRange {
                logical_type,
                reason: format!("{value:?} cannot be formatted"),
            }
        })?;
        let fraction = total.rem_euclid(per_second);
        let whole = seconds
            .checked_mul(1000)
            .ok_or_else(|| TemporalError::ValueOutOfRange {
                logical_type,
                reason: format!("{value:?} cannot be formatted"),
            })?;

        let mut text = parser.format(whole)?;
        if fraction != 0 {
            let digits = format!("{fraction:09}");
            text.push('.');
            text.push_str(digits.trim_end_matches('0'));
        }
        Ok(text)
    }

    /// Render a timestamp with the default pattern and zone
    pub fn format_timestamp(&self, value: &ParsedTemporal) -> TemporalResult<String> {
        self.format_literal(value, LogicalType::Timestamp)
    }

    /// Number of compiled parsers held by the cache
    pub fn cached_parser_count(&self) -> usize {
        self.parsers.len()
    }

    fn default_parser(&self, kind: TemporalKind) -> &Arc<FormatParser> {
        match kind {
            TemporalKind::Date => &self.date_parser,
            TemporalKind::Time => &self.time_parser,
            TemporalKind::Timestamp => &self.timestamp_parser,
        }
    }
}

fn temporal_kind(logical_type: LogicalType) -> TemporalResult<TemporalKind> {
    logical_type
        .temporal_kind()
        .ok_or(TemporalError::UnsupportedTemporalType { logical_type })
}

/// The whole-second part of a timestamp literal ends at its first `.`, so
/// its pattern may hold neither a `.` nor a fraction field
fn check_timestamp_format(pattern: &str) -> TemporalResult<()> {
    fn offending(items: &[FormatItem]) -> Option<&'static str> {
        items.iter().find_map(|item| match item {
            FormatItem::Literal(text) if text.contains('.') => {
                Some("timestamp pattern may not contain '.'")
            }
            FormatItem::Numeric {
                field: Field::Fraction,
                ..
            } => Some("fractional seconds follow the timestamp pattern, remove 'S'"),
            FormatItem::Optional(inner) => offending(inner),
            _ => None,
        })
    }

    match offending(&compile(pattern)?) {
        Some(reason) => Err(TemporalError::invalid_pattern(pattern, reason)),
        None => Ok(()),
    }
}

fn cached_parser(
    parsers: &DashMap<ParserKey, Arc<FormatParser>>,
    pattern: &str,
    timezone: Timezone,
) -> TemporalResult<Arc<FormatParser>> {
    let key = ParserKey {
        pattern: pattern.to_string(),
        timezone,
    };

    // Fast path: already compiled
    if let Some(parser) = parsers.get(&key) {
        return Ok(Arc::clone(&parser));
    }

    // Slow path: compile outside the shard lock, first insert wins
    let parser = Arc::new(FormatParser::new(pattern, timezone)?);
    match parsers.entry(key) {
        Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
        Entry::Vacant(entry) => {
            log::debug!("Compiled parser for '{pattern}' in {timezone}");
            entry.insert(Arc::clone(&parser));
            Ok(parser)
        }
    }
}

/// Parse a timestamp literal: whole seconds with `parser`, then the fraction
/// after the first `.` as nanoseconds
pub fn parse_timestamp_with(parser: &FormatParser, text: &str) -> TemporalResult<ParsedTemporal> {
    let (seconds, fraction) = match text.split_once('.') {
        Some((seconds, fraction)) => (seconds, Some(fraction)),
        None => (text, None),
    };

    let millis = parser.parse_date_time(seconds).map_err(|err| match err {
        TemporalError::MalformedTemporalLiteral { reason, .. } => {
            TemporalError::malformed(text, reason)
        }
        other => other,
    })?;
    let nanos = match fraction {
        Some(fraction) => parse_fractional_seconds(text, fraction)?,
        None => 0,
    };

    ParsedTemporal::new(millis, nanos)
}

/// Nanoseconds denoted by fractional-second digits
///
/// The digits are right-padded with zeros to nine places, so `"123"` is
/// 123 000 000 ns. More than nine digits is an overflow, not a truncation.
pub fn parse_fractional_seconds(literal: &str, fraction: &str) -> TemporalResult<i32> {
    let digits = fraction.chars().count();
    if digits > MAX_FRACTION_DIGITS {
        return Err(TemporalError::FractionalSecondOverflow {
            literal: literal.to_string(),
            digits,
        });
    }
    if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TemporalError::malformed(
            literal,
            format!("fractional seconds '{fraction}' must be 1 to 9 digits"),
        ));
    }

    let padded = format!("{fraction:0<width$}", width = MAX_FRACTION_DIGITS);
    padded
        .parse()
        .map_err(|_| TemporalError::malformed(literal, format!("invalid fraction '{fraction}'")))
}
