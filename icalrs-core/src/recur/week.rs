//! ISO week-number policy parameterized by `WKST` (spec §4.6.5).

use chrono::{Datelike, NaiveDate, Weekday};
use icalrs_ical::values::recur::WeekDay;

fn days_from_monday(weekday: Weekday) -> i64 {
    weekday.num_days_from_monday() as i64
}

/// The start of the `WKST`-aligned week containing `date`.
pub fn week_start_containing(date: NaiveDate, wkst: WeekDay) -> NaiveDate {
    let offset = (days_from_monday(date.weekday()) - days_from_monday(wkst.to_chrono())).rem_euclid(7);
    date - chrono::Duration::days(offset)
}

/// Computes `date`'s week number per spec §4.6.5: the ISO week (which is
/// always Monday-based), shifted back by one when `date` falls earlier in
/// its Monday-week than `WKST` does — i.e. under WKST-relative numbering it
/// belongs to the previous week.
pub fn week_number(date: NaiveDate, wkst: WeekDay) -> u32 {
    let monday_week = date.iso_week().week();
    let weekday_from_monday = days_from_monday(date.weekday());
    let wkst_from_monday = days_from_monday(wkst.to_chrono());

    if wkst_from_monday != 0 && weekday_from_monday < wkst_from_monday {
        monday_week.saturating_sub(1)
    } else {
        monday_week
    }
}

/// The 7 dates making up ISO week `week` of `year`, aligned to `WKST`.
pub fn days_in_week(year: i32, week: u32, wkst: WeekDay) -> Vec<NaiveDate> {
    let Some(monday) = NaiveDate::from_isoywd_opt(year, week.max(1), Weekday::Mon) else {
        return Vec::new();
    };

    let start = week_start_containing(monday, wkst);
    (0..7).map(|offset| start + chrono::Duration::days(offset)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monday_wkst_matches_iso_week() {
        let date = NaiveDate::from_ymd_opt(2021, 1, 5).unwrap();
        assert_eq!(week_number(date, WeekDay::Monday), date.iso_week().week());
    }

    #[test]
    fn week_start_is_seven_days_wide() {
        let days = days_in_week(2021, 1, WeekDay::Monday);
        assert_eq!(days.len(), 7);
        assert_eq!(days[6] - days[0], chrono::Duration::days(6));
    }
}
