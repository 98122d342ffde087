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

//! Compiled (pattern, timezone) parsers

use super::pattern::{Field, FormatItem, FormatItems, compile};
use crate::error::{TemporalError, TemporalResult};
use crate::timezone::Timezone;
use crate::types::LogicalType;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Longest digit run read for a field that is not followed by another field
const MAX_FIELD_DIGITS: usize = 9;

/// Parser for one pattern interpreted in one timezone
///
/// Immutable once built; share it freely between threads.
#[derive(Debug, Clone)]
pub struct FormatParser {
    pattern: String,
    timezone: Timezone,
    items: FormatItems,
}

#[derive(Debug, Clone, Copy, Default)]
struct Fields {
    year: Option<u64>,
    month: Option<u64>,
    day: Option<u64>,
    hour: Option<u64>,
    hour12: Option<u64>,
    minute: Option<u64>,
    second: Option<u64>,
    millis: Option<u64>,
    pm: Option<bool>,
}

impl FormatParser {
    /// Compile `pattern` for literals written in `timezone`
    pub fn new(pattern: &str, timezone: Timezone) -> TemporalResult<Self> {
        let items = compile(pattern)?;
        Ok(Self {
            pattern: pattern.to_string(),
            timezone,
            items,
        })
    }

    /// Pattern this parser was compiled from
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Zone wall-clock fields are interpreted in
    pub fn timezone(&self) -> &Timezone {
        &self.timezone
    }

    /// Parse `text` into milliseconds since the epoch
    pub fn parse_date_time(&self, text: &str) -> TemporalResult<i64> {
        let local = self.parse_local(text)?;
        let instant = self
            .timezone
            .to_instant(&local)
            .ok_or_else(|| TemporalError::malformed(text, "instant is out of range"))?;
        let millis = instant.timestamp_millis();
        log::trace!(
            "Parsed '{text}' with '{}' in {} as {millis}",
            self.pattern,
            self.timezone
        );
        Ok(millis)
    }

    /// Parse `text` into its wall-clock date-time without applying the zone
    pub fn parse_local(&self, text: &str) -> TemporalResult<NaiveDateTime> {
        let mut fields = Fields::default();
        let end = match_items(&self.items, text, 0, &mut fields)
            .map_err(|reason| TemporalError::malformed(text, reason))?;
        if end != text.len() {
            return Err(TemporalError::malformed(
                text,
                format!("unexpected trailing input at offset {end}"),
            ));
        }
        fields
            .to_naive()
            .map_err(|reason| TemporalError::malformed(text, reason))
    }

    /// Render epoch millis with this pattern in this zone
    ///
    /// Optional sections are left out when all their fields hold the values
    /// parsing assumes for them. Years are printed in full and zero-padded to
    /// the letter count.
    pub fn format(&self, millis: i64) -> TemporalResult<String> {
        let instant =
            DateTime::from_timestamp_millis(millis).ok_or(TemporalError::ValueOutOfRange {
                logical_type: LogicalType::Timestamp,
                reason: format!("{millis} ms cannot be formatted"),
            })?;
        let local = self.timezone.to_local(&instant);
        let mut out = String::with_capacity(self.pattern.len() + 8);
        render_items(&self.items, &local, &mut out);
        Ok(out)
    }
}

fn match_items(
    items: &[FormatItem],
    text: &str,
    mut pos: usize,
    fields: &mut Fields,
) -> Result<usize, String> {
    let bytes = text.as_bytes();

    for (i, item) in items.iter().enumerate() {
        match item {
            FormatItem::Literal(expected) => {
                if !bytes[pos..].starts_with(expected.as_bytes()) {
                    return Err(format!("expected '{expected}' at offset {pos}"));
                }
                pos += expected.len();
            }
            FormatItem::Numeric { field, width } => {
                let available = bytes[pos..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count();
                let adjacent = items.get(i + 1).is_some_and(starts_with_digits);
                let take = if adjacent {
                    if available < *width {
                        return Err(format!(
                            "expected {width} digits for {field} at offset {pos}"
                        ));
                    }
                    *width
                } else {
                    if available > MAX_FIELD_DIGITS {
                        return Err(format!("too many digits for {field} at offset {pos}"));
                    }
                    available
                };
                if take == 0 {
                    return Err(format!("expected digits for {field} at offset {pos}"));
                }

                let digits = &text[pos..pos + take];
                let parsed: u64 = digits
                    .parse()
                    .map_err(|_| format!("invalid {field} '{digits}'"))?;
                fields.set(*field, parsed, take)?;
                pos += take;
            }
            FormatItem::AmPm => {
                let marker = text.get(pos..pos + 2).unwrap_or_default();
                let pm = if marker.eq_ignore_ascii_case("AM") {
                    false
                } else if marker.eq_ignore_ascii_case("PM") {
                    true
                } else {
                    return Err(format!("expected AM or PM at offset {pos}"));
                };
                fields.pm = Some(pm);
                pos += 2;
            }
            FormatItem::Optional(inner) => {
                let snapshot = *fields;
                match match_items(inner, text, pos, fields) {
                    Ok(next) => pos = next,
                    Err(_) => *fields = snapshot,
                }
            }
        }
    }

    Ok(pos)
}

/// True when `item` begins by reading digits, looking into optional sections
fn starts_with_digits(item: &FormatItem) -> bool {
    match item {
        FormatItem::Numeric { .. } => true,
        FormatItem::Optional(inner) => inner.first().is_some_and(starts_with_digits),
        FormatItem::Literal(_) | FormatItem::AmPm => false,
    }
}

impl Fields {
    fn set(&mut self, field: Field, value: u64, digits: usize) -> Result<(), String> {
        let slot = match field {
            Field::Year => &mut self.year,
            Field::Month => &mut self.month,
            Field::Day => &mut self.day,
            Field::Hour => &mut self.hour,
            Field::Hour12 => &mut self.hour12,
            Field::Minute => &mut self.minute,
            Field::Second => &mut self.second,
            Field::Fraction => {
                if digits > 3 {
                    return Err(format!(
                        "fraction of second has {digits} digits, at most 3 are allowed"
                    ));
                }
                self.millis = Some(value * 10u64.pow(3 - digits as u32));
                return Ok(());
            }
        };
        *slot = Some(value);
        Ok(())
    }

    fn to_naive(self) -> Result<NaiveDateTime, String> {
        let year = self.year.unwrap_or(1970);
        let month = self.month.unwrap_or(1);
        let day = self.day.unwrap_or(1);

        let year = i32::try_from(year).map_err(|_| format!("year {year} is out of range"))?;
        if !(1..=12).contains(&month) {
            return Err(format!("month {month} is out of range"));
        }
        let date = NaiveDate::from_ymd_opt(year, month as u32, day as u32)
            .ok_or_else(|| format!("day {day} is out of range for {year}-{month:02}"))?;

        let hour = match (self.hour, self.hour12) {
            (Some(hour), _) => hour,
            (None, Some(h)) => {
                if !(1..=12).contains(&h) {
                    return Err(format!("hour {h} is out of range 1-12"));
                }
                h % 12 + if self.pm == Some(true) { 12 } else { 0 }
            }
            (None, None) => 0,
        };
        let minute = self.minute.unwrap_or(0);
        let second = self.second.unwrap_or(0);
        let millis = self.millis.unwrap_or(0);
        if hour > 23 || minute > 59 || second > 59 {
            return Err(format!(
                "time {hour:02}:{minute:02}:{second:02} is out of range"
            ));
        }
        let time =
            NaiveTime::from_hms_milli_opt(hour as u32, minute as u32, second as u32, millis as u32)
                .ok_or_else(|| "time is out of range".to_string())?;

        Ok(date.and_time(time))
    }
}

/// True when every field in `items` holds the value parsing assumes for an
/// absent field, so leaving the section out parses back to the same instant
fn holds_defaults(items: &[FormatItem], local: &NaiveDateTime) -> bool {
    items.iter().all(|item| match item {
        FormatItem::Literal(_) => true,
        FormatItem::AmPm => local.hour() < 12,
        FormatItem::Optional(inner) => holds_defaults(inner, local),
        FormatItem::Numeric { field, .. } => match field {
            Field::Year => local.year() == 1970,
            Field::Month => local.month() == 1,
            Field::Day => local.day() == 1,
            Field::Hour | Field::Hour12 => local.hour() == 0,
            Field::Minute => local.minute() == 0,
            Field::Second => local.second() == 0,
            Field::Fraction => local.nanosecond() / 1_000_000 == 0,
        },
    })
}

fn render_items(items: &[FormatItem], local: &NaiveDateTime, out: &mut String) {
    for item in items {
        match item {
            FormatItem::Literal(text) => out.push_str(text),
            FormatItem::AmPm => out.push_str(if local.hour() < 12 { "AM" } else { "PM" }),
            FormatItem::Optional(inner) => {
                if !holds_defaults(inner, local) {
                    render_items(inner, local, out);
                }
            }
            FormatItem::Numeric { field, width } => {
                let width = *width;
                let value = match field {
                    Field::Year => i64::from(local.year()),
                    Field::Month => i64::from(local.month()),
                    Field::Day => i64::from(local.day()),
                    Field::Hour => i64::from(local.hour()),
                    Field::Hour12 => match local.hour() % 12 {
                        0 => 12,
                        h => i64::from(h),
                    },
                    Field::Minute => i64::from(local.minute()),
                    Field::Second => i64::from(local.second()),
                    Field::Fraction => {
                        let millis = format!("{:03}", local.nanosecond() / 1_000_000 % 1000);
                        out.push_str(&millis[..width]);
                        continue;
                    }
                };
                out.push_str(&format!("{value:0width$}"));
            }
        }
    }
}
