//! The BY-part expand/limit pipeline (spec §4.6.2): one small transformer
//! per rule part, mapping a candidate stream to a candidate stream,
//! composed in the canonical order BYMONTH → BYWEEKNO → BYYEARDAY →
//! BYMONTHDAY → BYDAY → BYHOUR → BYMINUTE → BYSECOND, with BYSETPOS as the
//! terminal filter (design note §9: "staged iterator pipeline").

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use icalrs_ical::values::recur::{Freq, Recur, WeekDay, WeekDayNum};

use super::week;

fn days_in_month(year: i32, month: u32) -> u32 {
    let next_month_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next_month_first
        .and_then(|first| NaiveDate::from_ymd_opt(year, month, 1).map(|this| (first - this).num_days() as u32))
        .unwrap_or(30)
}

fn days_in_year(year: i32) -> i64 {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    let next = NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap();
    (next - start).num_days()
}

/// Resolves a `±n` ordinal against a span of `len` positions into a
/// 0-based index, or `None` if out of range.
fn resolve_ordinal(spec: i32, len: i64) -> Option<i64> {
    if spec > 0 {
        let index = spec as i64 - 1;
        (index < len).then_some(index)
    } else if spec < 0 {
        let index = len + spec as i64;
        (index >= 0).then_some(index)
    } else {
        None
    }
}

pub fn apply_bymonth(candidates: Vec<NaiveDateTime>, recur: &Recur, freq: Freq) -> Vec<NaiveDateTime> {
    if recur.bymonth.is_empty() {
        return candidates;
    }

    if freq == Freq::Yearly {
        candidates
            .into_iter()
            .flat_map(|c| {
                recur.bymonth.iter().filter_map(move |&month| {
                    NaiveDate::from_ymd_opt(c.year(), month, c.day()).map(|date| date.and_time(c.time()))
                })
            })
            .collect()
    } else {
        candidates.into_iter().filter(|c| recur.bymonth.contains(&c.month())).collect()
    }
}

pub fn apply_byweekno(candidates: Vec<NaiveDateTime>, recur: &Recur, freq: Freq) -> Vec<NaiveDateTime> {
    if recur.byweekno.is_empty() || freq != Freq::Yearly {
        return candidates;
    }

    let wkst = recur.wkst;

    candidates
        .into_iter()
        .flat_map(|c| {
            let year = c.year();
            let week_count = week::week_number(NaiveDate::from_ymd_opt(year, 12, 28).unwrap(), wkst);
            recur.byweekno.iter().flat_map(move |&spec| {
                let week = if spec > 0 { spec as u32 } else { (week_count as i32 + spec + 1).max(1) as u32 };
                week::days_in_week(year, week, wkst).into_iter().map(move |date| date.and_time(c.time()))
            })
        })
        .collect()
}

pub fn apply_byyearday(candidates: Vec<NaiveDateTime>, recur: &Recur, freq: Freq) -> Vec<NaiveDateTime> {
    if recur.byyearday.is_empty() {
        return candidates;
    }

    let expand = freq == Freq::Yearly;

    if expand {
        candidates
            .into_iter()
            .flat_map(|c| {
                let year = c.year();
                let len = days_in_year(year);
                recur.byyearday.iter().filter_map(move |&spec| {
                    let ordinal = resolve_ordinal(spec, len)? + 1;
                    NaiveDate::from_yo_opt(year, ordinal as u32).map(|date| date.and_time(c.time()))
                })
            })
            .collect()
    } else {
        candidates
            .into_iter()
            .filter(|c| {
                let len = days_in_year(c.year());
                recur.byyearday.iter().any(|&spec| resolve_ordinal(spec, len).map(|i| i + 1) == Some(c.ordinal() as i64))
            })
            .collect()
    }
}

pub fn apply_bymonthday(candidates: Vec<NaiveDateTime>, recur: &Recur, freq: Freq) -> Vec<NaiveDateTime> {
    if recur.bymonthday.is_empty() {
        return candidates;
    }

    let expand = matches!(freq, Freq::Monthly | Freq::Yearly);

    if expand {
        candidates
            .into_iter()
            .flat_map(|c| {
                let (year, month) = (c.year(), c.month());
                let len = days_in_month(year, month) as i64;
                recur.bymonthday.iter().filter_map(move |&spec| {
                    let day = resolve_ordinal(spec, len)? + 1;
                    NaiveDate::from_ymd_opt(year, month, day as u32).map(|date| date.and_time(c.time()))
                })
            })
            .collect()
    } else {
        candidates
            .into_iter()
            .filter(|c| {
                let len = days_in_month(c.year(), c.month()) as i64;
                recur.bymonthday.iter().any(|&spec| resolve_ordinal(spec, len).map(|i| i + 1) == Some(c.day() as i64))
            })
            .collect()
    }
}

fn weekday_matches(date: NaiveDate, target: WeekDay) -> bool {
    date.weekday() == target.to_chrono()
}

/// Every date in `[from, to]` (inclusive) whose weekday is `target`.
fn weekdays_in_range(from: NaiveDate, to: NaiveDate, target: WeekDay) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut cursor = from;
    while cursor <= to {
        if weekday_matches(cursor, target) {
            dates.push(cursor);
        }
        cursor += chrono::Duration::days(1);
    }
    dates
}

fn nth_weekday_in_range(from: NaiveDate, to: NaiveDate, ordinal: i32, target: WeekDay) -> Option<NaiveDate> {
    let all = weekdays_in_range(from, to, target);
    let len = all.len() as i64;
    let index = resolve_ordinal(ordinal, len)?;
    all.get(index as usize).copied()
}

pub fn apply_byday(candidates: Vec<NaiveDateTime>, recur: &Recur, freq: Freq) -> Vec<NaiveDateTime> {
    if recur.byday.is_empty() {
        return candidates;
    }

    match freq {
        Freq::Monthly => candidates
            .into_iter()
            .flat_map(|c| {
                let (year, month) = (c.year(), c.month());
                let from = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
                let to = NaiveDate::from_ymd_opt(year, month, days_in_month(year, month)).unwrap();
                recur.byday.iter().flat_map(move |entry| match entry {
                    WeekDayNum(None, day) => weekdays_in_range(from, to, *day).into_iter().map(move |d| d.and_time(c.time())).collect::<Vec<_>>(),
                    WeekDayNum(Some(ordinal), day) => nth_weekday_in_range(from, to, *ordinal, *day)
                        .map(|d| d.and_time(c.time()))
                        .into_iter()
                        .collect(),
                })
            })
            .collect(),
        // YEARLY with BYDAY expanding (no BYYEARDAY/BYMONTHDAY limiting it): per
        // RFC 5545 §3.3.10 Note 2, a BYMONTH or BYWEEKNO already on the rule
        // scopes the BYDAY expansion to that month/week rather than the whole
        // year — each candidate here was already narrowed there by the
        // BYMONTH/BYWEEKNO stages earlier in the pipeline.
        Freq::Yearly if recur.byyearday.is_empty() && recur.bymonthday.is_empty() => candidates
            .into_iter()
            .flat_map(|c| {
                let wkst = recur.wkst;
                let (from, to) = if !recur.bymonth.is_empty() {
                    let (year, month) = (c.year(), c.month());
                    (NaiveDate::from_ymd_opt(year, month, 1).unwrap(), NaiveDate::from_ymd_opt(year, month, days_in_month(year, month)).unwrap())
                } else if !recur.byweekno.is_empty() {
                    let week_start = week::week_start_containing(c.date(), wkst);
                    (week_start, week_start + chrono::Duration::days(6))
                } else {
                    let year = c.year();
                    (NaiveDate::from_ymd_opt(year, 1, 1).unwrap(), NaiveDate::from_ymd_opt(year, 12, 31).unwrap())
                };
                recur.byday.iter().flat_map(move |entry| match entry {
                    WeekDayNum(None, day) => weekdays_in_range(from, to, *day).into_iter().map(move |d| d.and_time(c.time())).collect::<Vec<_>>(),
                    WeekDayNum(Some(ordinal), day) => nth_weekday_in_range(from, to, *ordinal, *day)
                        .map(|d| d.and_time(c.time()))
                        .into_iter()
                        .collect(),
                })
            })
            .collect(),
        Freq::Weekly => {
            let wkst = recur.wkst;
            candidates
                .into_iter()
                .flat_map(|c| {
                    let week_start = week::week_start_containing(c.date(), wkst);
                    recur
                        .byday
                        .iter()
                        .filter_map(move |entry| {
                            let WeekDayNum(_, day) = entry;
                            (0..7)
                                .map(|offset| week_start + chrono::Duration::days(offset))
                                .find(|d| weekday_matches(*d, *day))
                                .map(|d| d.and_time(c.time()))
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        }
        // YEARLY with BYYEARDAY/BYMONTHDAY present, or any sub-day FREQ: limit.
        _ => candidates
            .into_iter()
            .filter(|c| recur.byday.iter().any(|WeekDayNum(_, day)| weekday_matches(c.date(), *day)))
            .collect(),
    }
}

fn apply_time_part<S, E>(
    candidates: Vec<NaiveDateTime>,
    values: &[u32],
    freq: Freq,
    expand_freqs: &[Freq],
    set_component: S,
    extract_component: E,
) -> Vec<NaiveDateTime>
where
    S: Fn(NaiveTime, u32) -> Option<NaiveTime>,
    E: Fn(NaiveTime) -> u32,
{
    if values.is_empty() {
        return candidates;
    }

    if expand_freqs.contains(&freq) {
        candidates
            .into_iter()
            .flat_map(|c| {
                let set_component = &set_component;
                values.iter().filter_map(move |&v| set_component(c.time(), v).map(|t| c.date().and_time(t)))
            })
            .collect()
    } else {
        candidates.into_iter().filter(|c| values.contains(&extract_component(c.time()))).collect()
    }
}

pub fn apply_byhour(candidates: Vec<NaiveDateTime>, recur: &Recur, freq: Freq) -> Vec<NaiveDateTime> {
    apply_time_part(
        candidates,
        &recur.byhour,
        freq,
        &[Freq::Daily, Freq::Weekly, Freq::Monthly, Freq::Yearly],
        |t, h| NaiveTime::from_hms_opt(h, t.minute(), t.second()),
        |t| t.hour(),
    )
}

pub fn apply_byminute(candidates: Vec<NaiveDateTime>, recur: &Recur, freq: Freq) -> Vec<NaiveDateTime> {
    apply_time_part(
        candidates,
        &recur.byminute,
        freq,
        &[Freq::Daily, Freq::Weekly, Freq::Monthly, Freq::Yearly, Freq::Hourly],
        |t, m| NaiveTime::from_hms_opt(t.hour(), m, t.second()),
        |t| t.minute(),
    )
}

pub fn apply_bysecond(candidates: Vec<NaiveDateTime>, recur: &Recur, freq: Freq) -> Vec<NaiveDateTime> {
    apply_time_part(
        candidates,
        &recur.bysecond,
        freq,
        &[Freq::Daily, Freq::Weekly, Freq::Monthly, Freq::Yearly, Freq::Hourly, Freq::Minutely],
        |t, s| NaiveTime::from_hms_opt(t.hour(), t.minute(), s),
        |t| t.second(),
    )
}

/// The terminal positional filter (spec §4.6.2): candidates are sorted
/// ascending first, then the 1-based (negative = from end) positions in
/// `BYSETPOS` are selected.
pub fn apply_bysetpos(mut candidates: Vec<NaiveDateTime>, recur: &Recur) -> Vec<NaiveDateTime> {
    if recur.bysetpos.is_empty() {
        return candidates;
    }

    candidates.sort();
    let len = candidates.len() as i64;

    let mut selected: Vec<NaiveDateTime> = recur
        .bysetpos
        .iter()
        .filter_map(|&pos| resolve_ordinal(pos, len))
        .filter_map(|index| candidates.get(index as usize).copied())
        .collect();

    selected.sort();
    selected.dedup();
    selected
}
