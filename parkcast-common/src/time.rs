//! Time context derivation
//!
//! Weekdays are ISO (Monday = 1 … Sunday = 7) throughout parkcast.

use crate::holidays::HolidayCalendar;
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Calendar features of one prediction instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeContext {
    pub instant: NaiveDateTime,
    pub date: NaiveDate,
    pub hour: u32,
    pub minute: u32,
    /// `hour * 60 + minute`, 0..=1439
    pub minute_of_day: u32,
    /// ISO weekday, Monday = 1
    pub weekday: u32,
    pub is_weekend: bool,
    pub is_holiday: bool,
}

impl TimeContext {
    /// Derive the context for `instant` (no clock read)
    pub fn from_instant(instant: NaiveDateTime, calendar: &HolidayCalendar) -> Self {
        let date = instant.date();
        let hour = instant.hour();
        let minute = instant.minute();
        let weekday = date.weekday().number_from_monday();
        Self {
            instant,
            date,
            hour,
            minute,
            minute_of_day: hour * 60 + minute,
            weekday,
            is_weekend: weekday >= 6,
            is_holiday: calendar.is_holiday(date),
        }
    }
}

/// Current local time truncated to the minute
pub fn now_local_minute() -> NaiveDateTime {
    let now = Local::now().naive_local();
    truncate_to_minute(now)
}

pub fn truncate_to_minute(t: NaiveDateTime) -> NaiveDateTime {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

pub fn truncate_to_hour(t: NaiveDateTime) -> NaiveDateTime {
    truncate_to_minute(t).with_minute(0).unwrap_or(t)
}

/// Instants from `start` (inclusive) every `step`, strictly before `start + horizon`
pub fn forecast_instants(start: NaiveDateTime, horizon: Duration, step: Duration) -> Vec<NaiveDateTime> {
    if step <= Duration::zero() || horizon <= Duration::zero() {
        return Vec::new();
    }
    let end = start + horizon;
    let mut out = Vec::new();
    let mut t = start;
    while t < end {
        out.push(t);
        t += step;
    }
    out
}
