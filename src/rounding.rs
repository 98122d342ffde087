//! Calendar truncation of instants
//!
//! One function, [`round_instant`], handles every [`Granularity`]. The zone
//! is always explicit: the instant is converted to wall-clock time in that
//! zone, rounded there, and converted back.

use crate::error::{TemporalError, TemporalResult};
use crate::timezone::Timezone;
use crate::types::LogicalType;
use crate::value::ParsedTemporal;
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar period an instant is rounded to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Granularity {
    /// Whole milliseconds
    Millisecond,
    /// Whole seconds
    Second,
    /// Whole minutes
    Minute,
    /// Whole hours
    Hour,
    /// Midnight
    Day,
    /// Monday midnight
    Week,
    /// First day of the month, midnight
    Month,
    /// January 1st, midnight
    Year,
}

/// Direction of rounding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoundingMode {
    /// Start of the containing period
    #[default]
    Floor,
    /// Start of the next period, unless already on a period start
    Ceil,
}

impl Granularity {
    /// All granularities from finest to coarsest
    pub const ALL: [Granularity; 8] = [
        Granularity::Millisecond,
        Granularity::Second,
        Granularity::Minute,
        Granularity::Hour,
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
        Granularity::Year,
    ];

    /// Upper-case name as used in SQL
    pub fn name(&self) -> &'static str {
        match self {
            Granularity::Millisecond => "MILLISECOND",
            Granularity::Second => "SECOND",
            Granularity::Minute => "MINUTE",
            Granularity::Hour => "HOUR",
            Granularity::Day => "DAY",
            Granularity::Week => "WEEK",
            Granularity::Month => "MONTH",
            Granularity::Year => "YEAR",
        }
    }

    fn is_sub_daily(&self) -> bool {
        matches!(
            self,
            Granularity::Millisecond | Granularity::Second | Granularity::Minute | Granularity::Hour
        )
    }

    fn floor_local(&self, local: &NaiveDateTime) -> NaiveDateTime {
        let date = local.date();
        let time = local.time();
        match self {
            Granularity::Millisecond => {
                let nanos = time.nanosecond() / 1_000_000 * 1_000_000;
                local.with_nanosecond(nanos).unwrap_or(*local)
            }
            Granularity::Second => local.with_nanosecond(0).unwrap_or(*local),
            Granularity::Minute => date.and_time(hms(time.hour(), time.minute(), 0)),
            Granularity::Hour => date.and_time(hms(time.hour(), 0, 0)),
            Granularity::Day => date.and_time(NaiveTime::MIN),
            Granularity::Week => {
                let back = TimeDelta::days(i64::from(date.weekday().num_days_from_monday()));
                date.checked_sub_signed(back)
                    .unwrap_or(date)
                    .and_time(NaiveTime::MIN)
            }
            Granularity::Month => first_of(date.year(), date.month())
                .unwrap_or(date)
                .and_time(NaiveTime::MIN),
            Granularity::Year => first_of(date.year(), 1)
                .unwrap_or(date)
                .and_time(NaiveTime::MIN),
        }
    }

    fn next_local(&self, floor: &NaiveDateTime) -> Option<NaiveDateTime> {
        match self {
            Granularity::Millisecond => floor.checked_add_signed(TimeDelta::milliseconds(1)),
            Granularity::Second => floor.checked_add_signed(TimeDelta::seconds(1)),
            Granularity::Minute => floor.checked_add_signed(TimeDelta::minutes(1)),
            Granularity::Hour => floor.checked_add_signed(TimeDelta::hours(1)),
            Granularity::Day => floor.checked_add_signed(TimeDelta::days(1)),
            Granularity::Week => floor.checked_add_signed(TimeDelta::weeks(1)),
            Granularity::Month => floor.checked_add_months(Months::new(1)),
            Granularity::Year => floor.checked_add_months(Months::new(12)),
        }
    }
}

fn hms(hour: u32, minute: u32, second: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, second).unwrap_or(NaiveTime::MIN)
}

fn first_of(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Granularity::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("Unknown time unit '{s}'"))
    }
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RoundingMode::Floor => "FLOOR",
            RoundingMode::Ceil => "CEIL",
        })
    }
}

/// Round `value` to `granularity` in `zone`, returning epoch millis
///
/// Hours and finer are rounded on the wall clock of the offset in force at
/// `value`, so both passes through a repeated hour stay in their own pass.
/// Days and coarser are rounded on the zone's calendar, where a period starts
/// the first time the wall clock shows its start.
pub fn round_instant(
    value: &ParsedTemporal,
    granularity: Granularity,
    mode: RoundingMode,
    zone: &Timezone,
) -> TemporalResult<i64> {
    let out_of_range = || TemporalError::ValueOutOfRange {
        logical_type: LogicalType::Timestamp,
        reason: format!("{value:?} cannot be rounded to {granularity}"),
    };

    let instant = value.to_datetime().ok_or_else(out_of_range)?;
    let rounded = if granularity.is_sub_daily() {
        let offset = TimeDelta::seconds(i64::from(zone.offset_seconds_at(&instant)));
        let local = instant
            .naive_utc()
            .checked_add_signed(offset)
            .ok_or_else(out_of_range)?;
        let floor = granularity.floor_local(&local);
        let target = match mode {
            RoundingMode::Ceil if floor != local => granularity.next_local(&floor),
            _ => Some(floor),
        };
        target
            .and_then(|target| target.checked_sub_signed(offset))
            .map(|utc| utc.and_utc())
    } else {
        let floor_local = granularity.floor_local(&zone.to_local(&instant));
        let floor = zone.to_instant(&floor_local).ok_or_else(out_of_range)?;
        match mode {
            RoundingMode::Ceil if floor != instant => granularity
                .next_local(&floor_local)
                .and_then(|next| zone.to_instant(&next)),
            _ => Some(floor),
        }
    }
    .ok_or_else(out_of_range)?;

    log::trace!("{mode} {value} to {granularity} in {zone}: {rounded}");
    Ok(rounded.timestamp_millis())
}

/// Start of the period containing `value`, in epoch millis
pub fn truncate(
    value: &ParsedTemporal,
    granularity: Granularity,
    zone: &Timezone,
) -> TemporalResult<i64> {
    round_instant(value, granularity, RoundingMode::Floor, zone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> ParsedTemporal {
        let dt = NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
            .and_utc();
        ParsedTemporal::from(dt)
    }

    fn millis(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> i64 {
        at(y, mo, d, h, mi, s).epoch_millis()
    }

    #[test]
    fn test_floor_each_granularity_in_utc() {
        let utc = Timezone::utc();
        // Thursday
        let value =
            ParsedTemporal::new(at(2024, 5, 16, 13, 45, 30).millis() + 250, 42).unwrap();

        let expected = [
            (Granularity::Millisecond, millis(2024, 5, 16, 13, 45, 30) + 250),
            (Granularity::Second, millis(2024, 5, 16, 13, 45, 30)),
            (Granularity::Minute, millis(2024, 5, 16, 13, 45, 0)),
            (Granularity::Hour, millis(2024, 5, 16, 13, 0, 0)),
            (Granularity::Day, millis(2024, 5, 16, 0, 0, 0)),
            (Granularity::Week, millis(2024, 5, 13, 0, 0, 0)),
            (Granularity::Month, millis(2024, 5, 1, 0, 0, 0)),
            (Granularity::Year, millis(2024, 1, 1, 0, 0, 0)),
        ];
        for (granularity, want) in expected {
            assert_eq!(truncate(&value, granularity, &utc), Ok(want), "{granularity}");
        }
    }

    #[test]
    fn test_floor_month_uses_given_zone() {
        // 2024-03-31 23:30 UTC is already April 1st in GMT+1
        let value = at(2024, 3, 31, 23, 30, 0);
        assert_eq!(
            truncate(&value, Granularity::Month, &Timezone::utc()),
            Ok(millis(2024, 3, 1, 0, 0, 0))
        );
        let plus_one = Timezone::parse("GMT+1").unwrap();
        assert_eq!(
            truncate(&value, Granularity::Month, &plus_one),
            Ok(millis(2024, 3, 31, 23, 0, 0))
        );
    }

    #[test]
    fn test_floor_day_across_dst_change() {
        let berlin = Timezone::parse("Europe/Berlin").unwrap();
        // 2021-03-28 12:00 CEST; midnight that day was still CET
        let value = at(2021, 3, 28, 10, 0, 0);
        assert_eq!(
            truncate(&value, Granularity::Day, &berlin),
            Ok(millis(2021, 3, 27, 23, 0, 0))
        );
    }

    #[rstest]
    #[case::first_pass_second(at(2021, 10, 31, 0, 30, 45), Granularity::Second, RoundingMode::Floor, at(2021, 10, 31, 0, 30, 45))]
    #[case::second_pass_second(at(2021, 10, 31, 1, 30, 45), Granularity::Second, RoundingMode::Floor, at(2021, 10, 31, 1, 30, 45))]
    #[case::first_pass_minute(at(2021, 10, 31, 0, 30, 45), Granularity::Minute, RoundingMode::Floor, at(2021, 10, 31, 0, 30, 0))]
    #[case::second_pass_minute(at(2021, 10, 31, 1, 30, 45), Granularity::Minute, RoundingMode::Floor, at(2021, 10, 31, 1, 30, 0))]
    #[case::first_pass_hour(at(2021, 10, 31, 0, 30, 45), Granularity::Hour, RoundingMode::Floor, at(2021, 10, 31, 0, 0, 0))]
    #[case::second_pass_hour(at(2021, 10, 31, 1, 30, 45), Granularity::Hour, RoundingMode::Floor, at(2021, 10, 31, 1, 0, 0))]
    #[case::first_pass_ceil_hour(at(2021, 10, 31, 0, 30, 45), Granularity::Hour, RoundingMode::Ceil, at(2021, 10, 31, 1, 0, 0))]
    #[case::second_pass_ceil_hour(at(2021, 10, 31, 1, 30, 45), Granularity::Hour, RoundingMode::Ceil, at(2021, 10, 31, 2, 0, 0))]
    #[case::second_pass_floor_day(at(2021, 10, 31, 1, 30, 45), Granularity::Day, RoundingMode::Floor, at(2021, 10, 30, 22, 0, 0))]
    fn test_rounding_in_repeated_hour(
        #[case] value: ParsedTemporal,
        #[case] granularity: Granularity,
        #[case] mode: RoundingMode,
        #[case] expected: ParsedTemporal,
    ) {
        // Berlin repeats 02:00-03:00 on 2021-10-31: first as CEST, then as CET
        let berlin = Timezone::parse("Europe/Berlin").unwrap();
        assert_eq!(
            round_instant(&value, granularity, mode, &berlin),
            Ok(expected.epoch_millis())
        );
    }

    #[test]
    fn test_day_starts_at_first_of_repeated_midnight() {
        // Havana fell back from 01:00 CDT to 00:00 CST on 2021-11-07
        let havana = Timezone::parse("America/Havana").unwrap();
        let midnight = NaiveDate::from_ymd_opt(2021, 11, 7)
            .unwrap()
            .and_time(NaiveTime::MIN);
        let (first, second) = havana.overlap_instants(&midnight).unwrap();

        for offset in [TimeDelta::minutes(30), TimeDelta::minutes(90)] {
            let value = ParsedTemporal::from(second + offset);
            assert_eq!(
                truncate(&value, Granularity::Day, &havana),
                Ok(first.timestamp_millis())
            );
        }

        // Second midnight is inside the day, not on its boundary
        let next_day = NaiveDate::from_ymd_opt(2021, 11, 8)
            .unwrap()
            .and_time(NaiveTime::MIN);
        assert_eq!(
            round_instant(
                &ParsedTemporal::from(second),
                Granularity::Day,
                RoundingMode::Ceil,
                &havana
            ),
            Ok(havana.to_instant(&next_day).unwrap().timestamp_millis())
        );
        assert_eq!(
            round_instant(
                &ParsedTemporal::from(first),
                Granularity::Day,
                RoundingMode::Ceil,
                &havana
            ),
            Ok(first.timestamp_millis())
        );
    }

    #[test]
    fn test_floor_before_epoch() {
        let value = ParsedTemporal::new(-1, 0).unwrap();
        assert_eq!(
            truncate(&value, Granularity::Year, &Timezone::utc()),
            Ok(millis(1969, 1, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_ceil() {
        let utc = Timezone::utc();
        let value = at(2024, 1, 31, 10, 0, 0);
        assert_eq!(
            round_instant(&value, Granularity::Month, RoundingMode::Ceil, &utc),
            Ok(millis(2024, 2, 1, 0, 0, 0))
        );

        let on_boundary = at(2024, 2, 1, 0, 0, 0);
        assert_eq!(
            round_instant(&on_boundary, Granularity::Month, RoundingMode::Ceil, &utc),
            Ok(on_boundary.epoch_millis())
        );

        let with_nanos = ParsedTemporal::new(on_boundary.millis(), 1).unwrap();
        assert_eq!(
            round_instant(&with_nanos, Granularity::Second, RoundingMode::Ceil, &utc),
            Ok(on_boundary.epoch_millis() + 1000)
        );
    }

    #[test]
    fn test_granularity_names() {
        assert_eq!("month".parse::<Granularity>(), Ok(Granularity::Month));
        assert_eq!(" WEEK ".parse::<Granularity>(), Ok(Granularity::Week));
        assert!("fortnight".parse::<Granularity>().is_err());
        assert_eq!(Granularity::Millisecond.to_string(), "MILLISECOND");
    }
}
