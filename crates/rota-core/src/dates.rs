//! Calendar arithmetic over plain dates.
//!
//! Days of week are numbered 0 (Sunday) through 6 (Saturday), matching the
//! weekly template document. No time-of-day or timezone is involved.

use chrono::{Datelike, Duration, NaiveDate};

/// Day of week of `date`, 0 = Sunday.
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn shift_by_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// The first day of the week containing `date`, for a week that begins on
/// `week_starts_on`.
pub fn start_of_week(date: NaiveDate, week_starts_on: u8) -> NaiveDate {
    let offset = (i64::from(day_of_week(date)) - i64::from(week_starts_on % 7)).rem_euclid(7);
    shift_by_days(date, -offset)
}

/// Every date in `[start, end]`, ascending. Empty when `start > end`.
pub fn enumerate_dates(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Whether two dates fall in the same calendar week.
pub fn same_week(a: NaiveDate, b: NaiveDate, week_starts_on: u8) -> bool {
    start_of_week(a, week_starts_on) == start_of_week(b, week_starts_on)
}

/// Forward distance in days from one weekday to another, in `0..7`.
pub fn day_shift(from_dow: u8, to_dow: u8) -> i64 {
    (i64::from(to_dow) - i64::from(from_dow)).rem_euclid(7)
}

/// Number of days in `[start, end]`, or 0 when `start > end`.
pub fn span_days(start: NaiveDate, end: NaiveDate) -> i64 {
    ((end - start).num_days() + 1).max(0)
}
