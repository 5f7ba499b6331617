//! Calendar arithmetic at the fixed UTC+9 offset.
//!
//! Instants are `Ms`; dates are `NaiveDate` and times of day are
//! `TimeOfDay`, both read on the UTC+9 wall clock.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::model::Ms;

pub const OFFSET_SECS: i32 = 9 * 3600;
const OFFSET_MS: Ms = OFFSET_SECS as Ms * 1000;
const MINUTE_MS: Ms = 60_000;
const DAY_MS: Ms = 86_400_000;
const MINUTES_PER_DAY: u16 = 24 * 60;

/// Wall-clock time with minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour as u16 * 60 + minute as u16))
        } else {
            None
        }
    }

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(Self(minutes))
    }

    /// Minutes since midnight.
    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    pub fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }

    /// `self + minutes`, never later than `cap`.
    pub fn plus_clamped(self, minutes: u16, cap: TimeOfDay) -> TimeOfDay {
        Self(self.0.saturating_add(minutes).min(cap.0))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeError;

    /// Accepts `HH:MM` and `HH:MM:SS` (seconds are dropped).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TimeError::Malformed(s.to_string());
        let mut parts = s.trim().split(':');
        let hour: u8 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        let minute: u8 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        if let Some(sec) = parts.next() {
            sec.parse::<u8>().map_err(|_| malformed())?;
        }
        if parts.next().is_some() {
            return Err(malformed());
        }
        TimeOfDay::new(hour, minute).ok_or_else(malformed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeError {
    Malformed(String),
    OutOfRange(Ms),
}

impl fmt::Display for TimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeError::Malformed(s) => write!(f, "malformed date/time: {s:?}"),
            TimeError::OutOfRange(ms) => write!(f, "instant out of range: {ms}"),
        }
    }
}

impl std::error::Error for TimeError {}

/// The instant `time` on `date`, UTC+9.
pub fn at(date: NaiveDate, time: TimeOfDay) -> Ms {
    let midnight = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
    midnight + time.minutes() as Ms * MINUTE_MS - OFFSET_MS
}

fn wall_clock(ms: Ms) -> NaiveDateTime {
    // Stored instants are range-checked on insert, so saturation never shows.
    DateTime::<Utc>::from_timestamp_millis(ms + OFFSET_MS)
        .unwrap_or_default()
        .naive_utc()
}

pub fn date_of(ms: Ms) -> NaiveDate {
    wall_clock(ms).date()
}

pub fn time_of(ms: Ms) -> TimeOfDay {
    TimeOfDay(((ms + OFFSET_MS).rem_euclid(DAY_MS) / MINUTE_MS) as u16)
}

/// `YYYY-MM-DDTHH:MM:SS+09:00`
pub fn format_iso(ms: Ms) -> String {
    wall_clock(ms).format("%Y-%m-%dT%H:%M:%S+09:00").to_string()
}

/// Parse an RFC 3339 timestamp with any offset.
pub fn parse_iso(s: &str) -> Result<Ms, TimeError> {
    DateTime::parse_from_rfc3339(s.trim())
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| TimeError::Malformed(s.to_string()))
}

/// Parse `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Result<NaiveDate, TimeError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| TimeError::Malformed(s.to_string()))
}

/// Whole days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

pub fn add_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days))
}

pub fn sub_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(days))
}
