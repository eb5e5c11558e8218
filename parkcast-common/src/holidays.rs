//! Regional public-holiday calendar (Saxony)
//!
//! Queried by calendar date only. Movable feasts are derived from Easter
//! Sunday (Gregorian computus); Repentance Day is the Wednesday before 23 Nov.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeSet;

/// Public holidays for the Free State of Saxony
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    /// Locally configured additional closing days
    extra: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn saxony() -> Self {
        Self::default()
    }

    /// Add locally configured dates (e.g. city festival days)
    pub fn with_extra_dates(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.extra.extend(dates);
        self
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        if self.extra.contains(&date) {
            return true;
        }
        holidays_in(date.year()).iter().any(|(d, _)| *d == date)
    }
}

/// All statutory holidays in Saxony for `year`, in calendar order
pub fn holidays_in(year: i32) -> Vec<(NaiveDate, &'static str)> {
    let fixed = |month: u32, day: u32| NaiveDate::from_ymd_opt(year, month, day);
    let mut days = Vec::with_capacity(11);

    if let Some(d) = fixed(1, 1) {
        days.push((d, "Neujahr"));
    }
    if let Some(easter) = easter_sunday(year) {
        days.push((easter - Duration::days(2), "Karfreitag"));
        days.push((easter + Duration::days(1), "Ostermontag"));
        days.push((easter + Duration::days(39), "Christi Himmelfahrt"));
        days.push((easter + Duration::days(50), "Pfingstmontag"));
    }
    if let Some(d) = fixed(5, 1) {
        days.push((d, "Tag der Arbeit"));
    }
    if let Some(d) = fixed(10, 3) {
        days.push((d, "Tag der Deutschen Einheit"));
    }
    if let Some(d) = fixed(10, 31) {
        days.push((d, "Reformationstag"));
    }
    if let Some(d) = repentance_day(year) {
        days.push((d, "Buß- und Bettag"));
    }
    if let Some(d) = fixed(12, 25) {
        days.push((d, "1. Weihnachtstag"));
    }
    if let Some(d) = fixed(12, 26) {
        days.push((d, "2. Weihnachtstag"));
    }

    days.sort_by_key(|(d, _)| *d);
    days
}

/// Easter Sunday (anonymous Gregorian algorithm)
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Wednesday strictly before 23 November
fn repentance_day(year: i32) -> Option<NaiveDate> {
    let nov22 = NaiveDate::from_ymd_opt(year, 11, 22)?;
    // Wednesday is 2 days from Monday
    let back = (nov22.weekday().num_days_from_monday() + 7 - 2) % 7;
    Some(nov22 - Duration::days(i64::from(back)))
}
