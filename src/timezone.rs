//! Timezone resolution
//!
//! Identifiers come in three shapes: fixed offsets (`GMT+1`, `UTC-05:30`,
//! `+01:00`), zone database names (`Europe/Berlin`) and the `LOCAL` keyword for
//! the platform zone. All of them resolve to a [`Timezone`] that maps wall-clock
//! date-times to instants and back.

use crate::error::{TemporalError, TemporalResult};
use chrono::{
    DateTime, FixedOffset, MappedLocalTime, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Keyword resolving to the platform zone
pub const LOCAL_TIMEZONE_ID: &str = "LOCAL";

/// Zone the default configuration uses
pub const DEFAULT_TIMEZONE_ID: &str = "GMT";

const MAX_OFFSET_HOURS: i32 = 23;

/// A resolved timezone
#[derive(Debug, Clone, Copy)]
pub enum Timezone {
    /// Constant offset from UTC
    Fixed(FixedOffset),
    /// Zone database entry with its DST rules
    Named(Tz),
}

impl Timezone {
    /// Coordinated universal time
    pub fn utc() -> Self {
        Timezone::Fixed(Utc.fix())
    }

    /// Resolve a timezone identifier
    pub fn parse(id: &str) -> TemporalResult<Self> {
        let trimmed = id.trim();
        let invalid = || TemporalError::InvalidTimezone { id: id.to_string() };
        if trimmed.is_empty() {
            return Err(invalid());
        }

        if trimmed.eq_ignore_ascii_case(LOCAL_TIMEZONE_ID) {
            return Ok(Self::local());
        }

        if let Some(rest) = strip_utc_prefix(trimmed) {
            if rest.is_empty() {
                return Ok(Self::utc());
            }
            return parse_offset(rest).map(Timezone::Fixed).ok_or_else(invalid);
        }

        if trimmed.starts_with('+') || trimmed.starts_with('-') {
            return parse_offset(trimmed).map(Timezone::Fixed).ok_or_else(invalid);
        }

        trimmed
            .parse::<Tz>()
            .ok()
            .or_else(|| Tz::from_str_insensitive(trimmed).ok())
            .map(Timezone::Named)
            .ok_or_else(invalid)
    }

    /// The platform zone, or UTC when it cannot be determined
    pub fn local() -> Self {
        match iana_time_zone::get_timezone() {
            Ok(name) => match name.parse::<Tz>() {
                Ok(tz) => Timezone::Named(tz),
                Err(_) => {
                    log::warn!("Platform timezone '{name}' is unknown, falling back to UTC");
                    Self::utc()
                }
            },
            Err(err) => {
                log::warn!("Could not determine platform timezone ({err}), falling back to UTC");
                Self::utc()
            }
        }
    }

    /// Canonical identifier, equal for equal zones
    pub fn id(&self) -> String {
        match self {
            Timezone::Fixed(offset) => {
                let secs = offset.local_minus_utc();
                if secs == 0 {
                    return "UTC".to_string();
                }
                let sign = if secs < 0 { '-' } else { '+' };
                let abs = secs.abs();
                let (h, m, s) = (abs / 3600, (abs % 3600) / 60, abs % 60);
                if s == 0 {
                    format!("GMT{sign}{h:02}:{m:02}")
                } else {
                    format!("GMT{sign}{h:02}:{m:02}:{s:02}")
                }
            }
            Timezone::Named(tz) => tz.name().to_string(),
        }
    }

    /// Interpret a wall-clock date-time in this zone
    ///
    /// Times falling into a DST gap use the offset in force before the gap.
    /// Times repeated by a DST overlap resolve to the earlier instant. Returns
    /// `None` when the result is outside the representable range.
    pub fn to_instant(&self, local: &NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Timezone::Fixed(offset) => resolve(*offset, local),
            Timezone::Named(tz) => resolve(*tz, local),
        }
    }

    /// Both instants of a wall-clock time repeated by a DST overlap, earlier first
    ///
    /// `None` when `local` occurs at most once in this zone.
    pub fn overlap_instants(
        &self,
        local: &NaiveDateTime,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            Timezone::Fixed(_) => None,
            Timezone::Named(tz) => match tz.from_local_datetime(local) {
                MappedLocalTime::Ambiguous(earliest, latest) => Some((
                    earliest.with_timezone(&Utc),
                    latest.with_timezone(&Utc),
                )),
                _ => None,
            },
        }
    }

    /// Wall-clock date-time of an instant in this zone
    pub fn to_local(&self, instant: &DateTime<Utc>) -> NaiveDateTime {
        match self {
            Timezone::Fixed(offset) => instant.with_timezone(offset).naive_local(),
            Timezone::Named(tz) => instant.with_timezone(tz).naive_local(),
        }
    }

    /// Offset from UTC in force at the given instant, in seconds
    pub fn offset_seconds_at(&self, instant: &DateTime<Utc>) -> i32 {
        match self {
            Timezone::Fixed(offset) => offset.local_minus_utc(),
            Timezone::Named(tz) => tz
                .offset_from_utc_datetime(&instant.naive_utc())
                .fix()
                .local_minus_utc(),
        }
    }
}

fn resolve<Z: TimeZone>(zone: Z, local: &NaiveDateTime) -> Option<DateTime<Utc>> {
    match zone.from_local_datetime(local) {
        MappedLocalTime::Single(dt) => Some(dt.with_timezone(&Utc)),
        MappedLocalTime::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        MappedLocalTime::None => {
            let probe = local.checked_sub_signed(TimeDelta::days(1))?;
            let before = zone.offset_from_utc_datetime(&probe).fix();
            local
                .checked_sub_signed(TimeDelta::seconds(i64::from(before.local_minus_utc())))
                .map(|utc| utc.and_utc())
        }
    }
}

fn strip_utc_prefix(id: &str) -> Option<&str> {
    ["GMT", "UTC", "UT", "Z"].iter().find_map(|prefix| {
        let head = id.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        let rest = &id[prefix.len()..];
        (rest.is_empty() || rest.starts_with('+') || rest.starts_with('-')).then_some(rest)
    })
}

/// Parse `+H`, `+HH`, `+HHmm`, `+H:mm` or `+HH:mm` (and the `-` forms)
fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (negative, body) = match text.as_bytes().first()? {
        b'+' => (false, &text[1..]),
        b'-' => (true, &text[1..]),
        _ => return None,
    };
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }

    let (hours, minutes) = match body.split_once(':') {
        Some((h, m)) if (1..=2).contains(&h.len()) && m.len() == 2 => (h, m),
        Some(_) => return None,
        None => match body.len() {
            1 | 2 => (body, "0"),
            4 => body.split_at(2),
            _ => return None,
        },
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > MAX_OFFSET_HOURS || minutes > 59 {
        return None;
    }

    let secs = hours * 3600 + minutes * 60;
    FixedOffset::east_opt(if negative { -secs } else { secs })
}

impl Default for Timezone {
    fn default() -> Self {
        Self::utc()
    }
}

impl PartialEq for Timezone {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Timezone::Fixed(a), Timezone::Fixed(b)) => a.local_minus_utc() == b.local_minus_utc(),
            (Timezone::Named(a), Timezone::Named(b)) => a.name() == b.name(),
            _ => false,
        }
    }
}

impl Eq for Timezone {}

impl Hash for Timezone {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Timezone::Fixed(offset) => {
                0u8.hash(state);
                offset.local_minus_utc().hash(state);
            }
            Timezone::Named(tz) => {
                1u8.hash(state);
                tz.name().hash(state);
            }
        }
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
