// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Clock and duration functions. Wall-clock values honour the caller's `TZ` attribute, which
//! holds either a zone name (`Europe/Paris`) or a whole-hour offset from UTC (`-5`).

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::Tz;
use demuse_common::Dbref;

use crate::builtins::Arity::{Fixed, Variable};
use crate::builtins::{BfCallState, Builtin};
use crate::errors::EvalError;
use crate::eval::text::atol;

const DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y %Z";
const DATETIME_INPUTS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];
const DATE_INPUTS: &[&str] = &["%m/%d/%Y"];

/// Asks for the caller's own zone.
const DEFAULT_ZONE: &str = "D";

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const YEAR: i64 = 365 * DAY;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Zone {
    Named(Tz),
    Offset(FixedOffset),
}

impl Zone {
    fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        if let Ok(tz) = Tz::from_str(spec) {
            return Some(Zone::Named(tz));
        }
        let hours: i32 = spec.parse().ok()?;
        if !(-24..=24).contains(&hours) {
            return None;
        }
        FixedOffset::east_opt(hours * 3600).map(Zone::Offset)
    }

    fn format(&self, timestamp: i64, fmt: &str) -> Option<String> {
        let utc = DateTime::from_timestamp(timestamp, 0)?;
        Some(match self {
            Zone::Named(tz) => utc.with_timezone(tz).format(fmt).to_string(),
            Zone::Offset(offset) => utc.with_timezone(offset).format(fmt).to_string(),
        })
    }

    /// Hour, minute and second of the wall clock at `timestamp`.
    fn clock(&self, timestamp: i64) -> Option<(u32, u32, u32)> {
        let utc = DateTime::from_timestamp(timestamp, 0)?;
        let local = match self {
            Zone::Named(tz) => utc.with_timezone(tz).naive_local(),
            Zone::Offset(offset) => utc.with_timezone(offset).naive_local(),
        };
        Some((local.hour(), local.minute(), local.second()))
    }

    fn timestamp_of(&self, local: &NaiveDateTime) -> Option<i64> {
        let instant = match self {
            Zone::Named(tz) => tz.from_local_datetime(local).earliest(),
            Zone::Offset(offset) => offset
                .from_local_datetime(local)
                .earliest()
                .map(|t| t.with_timezone(&Tz::UTC)),
        };
        instant.map(|t| t.timestamp())
    }
}

fn parse_local(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_INPUTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_INPUTS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

impl BfCallState<'_, '_> {
    /// The zone named by `spec`, or `who`'s own zone for `D` or nothing.
    fn zone(&self, spec: &str, who: Dbref) -> Option<Zone> {
        if spec.is_empty() || spec == DEFAULT_ZONE {
            let own = self.exec.attr_text(who, "TZ");
            return Some(Zone::parse(&own).unwrap_or(Zone::Named(Tz::UTC)));
        }
        Zone::parse(spec)
    }

    /// The wall clock now, in the caller's zone.
    fn wall_clock(&self) -> Result<(u32, u32, u32), EvalError> {
        let zone = self.zone(DEFAULT_ZONE, self.privs).ok_or(EvalError::Failed)?;
        zone.clock(self.exec.rt.now()).ok_or(EvalError::Failed)
    }
}

/// Usage: `time()`
/// The caller's local time on a 12 hour clock.
fn bf_time(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let (hour, minute, _) = bf_args.wall_clock()?;
    let twelve = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    let meridian = if hour > 11 { 'P' } else { 'A' };
    Ok(format!("{twelve:2}:{minute:02} {meridian}M"))
}

fn bf_mtime(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let (hour, minute, _) = bf_args.wall_clock()?;
    Ok(format!("{hour}:{minute}"))
}

fn bf_mstime(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    let (hour, minute, second) = bf_args.wall_clock()?;
    Ok(format!("{hour:02}:{minute:02}:{second:02}"))
}

/// Usage: `timedate([zone [, seconds]])`
/// A full date. Without `seconds`, now; without `zone` (or with `D`), the caller's zone.
fn bf_timedate(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    if bf_args.nargs() > 2 {
        return Err(EvalError::WrongNumberOfArgs);
    }
    let when = if bf_args.nargs() == 2 {
        bf_args.int(1)
    } else {
        bf_args.exec.rt.now()
    };
    let zone = bf_args
        .zone(bf_args.arg(0), bf_args.privs)
        .ok_or(EvalError::Failed)?;
    zone.format(when, DATE_FORMAT).ok_or(EvalError::Failed)
}

/// Usage: `xtime([date [, zone]])`
/// Seconds since the epoch of `date` (`YYYY-MM-DD HH:MM:SS`, `YYYY/MM/DD HH:MM:SS` or
/// `MM/DD/YYYY`) read in `zone`, or of now.
fn bf_xtime(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    if bf_args.nargs() == 0 {
        return Ok(bf_args.exec.rt.now().to_string());
    }
    if bf_args.nargs() > 2 {
        return Err(EvalError::WrongNumberOfArgs);
    }
    let zone = bf_args
        .zone(bf_args.arg(1), bf_args.privs)
        .ok_or(EvalError::Failed)?;
    let local = parse_local(bf_args.arg(0)).ok_or(EvalError::Failed)?;
    let timestamp = zone.timestamp_of(&local).ok_or(EvalError::Failed)?;
    Ok(timestamp.to_string())
}

fn plural(n: i64, one: &str, unit: &str) -> String {
    if n == 1 {
        one.to_string()
    } else {
        format!("{n} {unit}s")
    }
}

/// `1w 02:03`, `3d 04:05` or `06:07`.
pub fn duration_long(secs: i64) -> String {
    let days = secs % YEAR / DAY;
    let (hours, minutes) = (secs % DAY / HOUR, secs % HOUR / MINUTE);
    match days {
        d if d >= 7 => format!("{}w {hours:02}:{minutes:02}", d / 7),
        d if d > 0 => format!("{d}d {hours:02}:{minutes:02}"),
        _ => format!("{hours:02}:{minutes:02}"),
    }
}

/// The largest unit only: `2w`, `3d`, `4h`, `5m` or `6s`.
pub fn duration_short(secs: i64) -> String {
    let days = secs % YEAR / DAY;
    if days >= 7 {
        format!("{}w", days / 7)
    } else if days > 0 {
        format!("{days}d")
    } else if secs % DAY >= HOUR {
        format!("{}h", secs % DAY / HOUR)
    } else if secs % HOUR >= MINUTE {
        format!("{}m", secs % HOUR / MINUTE)
    } else {
        format!("{}s", secs % MINUTE)
    }
}

/// The largest unit in words: `a week`, `3 days`, `an hour`.
fn duration_words(secs: i64) -> String {
    let days = secs % YEAR / DAY;
    let (hours, minutes, seconds) = (secs % DAY / HOUR, secs % HOUR / MINUTE, secs % MINUTE);
    if days == 1 {
        "a day".to_string()
    } else if days >= 7 {
        plural(days / 7, "a week", "week")
    } else if days > 0 {
        plural(days, "a day", "day")
    } else if hours > 0 {
        plural(hours, "an hour", "hour")
    } else if minutes > 0 {
        plural(minutes, "a minute", "minute")
    } else {
        plural(seconds, "a second", "second")
    }
}

/// Every unit in words: `a day, 2 hours, and a second`.
pub fn duration_full(secs: i64) -> String {
    let years = secs / YEAR;
    let mut days = secs % YEAR / DAY;
    let mut parts = vec![];
    if years > 0 {
        parts.push(plural(years, "a year", "year"));
    }
    if days > 7 {
        parts.push(plural(days / 7, "a week", "week"));
        days %= 7;
    }
    for (n, one, unit) in [
        (days, "a day", "day"),
        (secs % DAY / HOUR, "an hour", "hour"),
        (secs % HOUR / MINUTE, "a minute", "minute"),
        (secs % MINUTE, "a second", "second"),
    ] {
        if n > 0 {
            parts.push(plural(n, one, unit));
        }
    }
    match parts.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [init @ .., last] => format!("{}, and {last}", init.join(", ")),
    }
}

fn duration_arg(bf_args: &BfCallState<'_, '_>, fmt: fn(i64) -> String) -> Result<String, EvalError> {
    let secs = atol(bf_args.arg(0));
    if secs < 0 {
        return Err(EvalError::Failed);
    }
    Ok(fmt(secs))
}

fn bf_tms(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    duration_arg(bf_args, duration_short)
}

fn bf_tml(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    duration_arg(bf_args, duration_long)
}

fn bf_tmf(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    duration_arg(bf_args, duration_words)
}

fn bf_tmfl(bf_args: &mut BfCallState<'_, '_>) -> Result<String, EvalError> {
    duration_arg(bf_args, duration_full)
}

pub(crate) fn register_bf_time(builtins: &mut Vec<Builtin>) {
    builtins.extend([
        Builtin::new("time", Variable, bf_time),
        Builtin::new("mtime", Variable, bf_mtime),
        Builtin::new("mstime", Variable, bf_mstime),
        Builtin::new("timedate", Variable, bf_timedate),
        Builtin::new("xtime", Variable, bf_xtime),
        Builtin::new("tms", Fixed(1), bf_tms),
        Builtin::new("tml", Fixed(1), bf_tml),
        Builtin::new("tmf", Fixed(1), bf_tmf),
        Builtin::new("tmfl", Fixed(1), bf_tmfl),
    ]);
}
