//! The recurrence expander (spec §4.6): the heart of the crate. Drives an
//! `INTERVAL`×`FREQ` stepper, runs each step's candidates through the
//! canonical BY-part pipeline, and applies COUNT/UNTIL/window termination.

mod byparts;
pub mod week;

use chrono::{Datelike, Duration as ChronoDuration, NaiveDateTime};
use icalrs_ical::values::recur::{Freq, Recur};

use crate::event::{DateOrDateTime, Event};

/// One computed occurrence: its point plus the duration to apply when
/// materializing an end/slot (an RDATE PERIOD can override the event's own
/// duration for that single occurrence, spec §4.6.7).
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub start: DateOrDateTime,
    pub duration: ChronoDuration,
}

fn step_by_interval(from: NaiveDateTime, freq: Freq, interval: u32) -> NaiveDateTime {
    let interval = interval.max(1) as i64;
    match freq {
        Freq::Secondly => from + ChronoDuration::seconds(interval),
        Freq::Minutely => from + ChronoDuration::minutes(interval),
        Freq::Hourly => from + ChronoDuration::hours(interval),
        Freq::Daily => from + ChronoDuration::days(interval),
        Freq::Weekly => from + ChronoDuration::weeks(interval),
        Freq::Monthly | Freq::Yearly => unreachable!("monthly/yearly stepping uses month_anchor, not step_by_interval"),
    }
}

/// Resolves the `anchor`-th month step from `dtstart`, keeping `dtstart`'s
/// day-of-month and time fixed. Spec §4.6.2 "invalid date policy": when the
/// day does not exist in the target month (e.g. Jan 31 + 1 month = Feb 31),
/// this step contributes no candidate, but the month anchor still advances
/// normally on the next call — it is never clamped or rolled forward.
fn month_anchor_date(dtstart: NaiveDateTime, anchor: i64) -> Option<NaiveDateTime> {
    let total = dtstart.year() as i64 * 12 + (dtstart.month() as i64 - 1) + anchor;
    let year = total.div_euclid(12) as i32;
    let month = total.rem_euclid(12) as u32 + 1;
    chrono::NaiveDate::from_ymd_opt(year, month, dtstart.day()).map(|date| date.and_time(dtstart.time()))
}

/// Applies the BY-part pipeline in canonical order (spec §4.6.2) to one
/// interval step's seed candidate.
fn apply_by_parts(seed: NaiveDateTime, recur: &Recur, freq: Freq) -> Vec<NaiveDateTime> {
    let mut candidates = vec![seed];
    candidates = byparts::apply_bymonth(candidates, recur, freq);
    candidates = byparts::apply_byweekno(candidates, recur, freq);
    candidates = byparts::apply_byyearday(candidates, recur, freq);
    candidates = byparts::apply_bymonthday(candidates, recur, freq);
    candidates = byparts::apply_byday(candidates, recur, freq);
    candidates = byparts::apply_byhour(candidates, recur, freq);
    candidates = byparts::apply_byminute(candidates, recur, freq);
    candidates = byparts::apply_bysecond(candidates, recur, freq);
    byparts::apply_bysetpos(candidates, recur)
}

/// Safety net against pathological rules (e.g. `FREQ=YEARLY` with a
/// BY-part set that matches nothing) so expansion always terminates.
const MAX_INTERVAL_STEPS: u32 = 500_000;

/// Generates the full RRULE-driven recurrence set for `event`, ignoring
/// window clipping, honoring COUNT against the unclipped set (spec §8:
/// "COUNT bound"). Returns candidate instants only; RDATE/EXDATE union and
/// window clipping happen in [`expand_event`].
fn expand_rrule(event: &Event, recur: &Recur, window_end: Option<NaiveDateTime>) -> Vec<NaiveDateTime> {
    let Some(dtstart) = event.dtstart.to_naive() else { return Vec::new() };
    let freq = match recur.freq {
        Some(freq) => freq,
        None => return Vec::new(),
    };

    let until = event.until_naive();
    let interval = recur.interval.max(1);
    let is_monthly_family = matches!(freq, Freq::Monthly | Freq::Yearly);
    let month_step = if freq == Freq::Yearly { interval as i64 * 12 } else { interval as i64 };

    let mut out = Vec::new();
    let mut cursor = dtstart;
    let mut month_anchor: i64 = 0;
    let mut steps = 0;

    loop {
        if steps >= MAX_INTERVAL_STEPS {
            break;
        }
        if let Some(count) = recur.count {
            if out.len() as u32 >= count {
                break;
            }
        }

        let seed = if is_monthly_family { month_anchor_date(dtstart, month_anchor) } else { Some(cursor) };

        if let (Some(seed), Some(until)) = (seed, until) {
            if seed > until {
                break;
            }
        }
        if recur.count.is_none() {
            if let (Some(seed), Some(window_end)) = (seed, window_end) {
                if seed > window_end {
                    break;
                }
            }
        }

        if let Some(seed) = seed {
            for candidate in apply_by_parts(seed, recur, freq) {
                if candidate < dtstart {
                    continue;
                }
                if let Some(until) = until {
                    if candidate > until {
                        continue;
                    }
                }
                out.push(candidate);
                if let Some(count) = recur.count {
                    if out.len() as u32 >= count {
                        break;
                    }
                }
            }
        }

        if is_monthly_family {
            month_anchor += month_step;
        } else {
            cursor = step_by_interval(cursor, freq, recur.interval);
        }
        steps += 1;
    }

    out.sort();
    out.dedup();
    out
}

/// Produces every occurrence of `event` whose start falls within
/// `[window_start, window_end]`, sorted ascending (spec §4.6.3's two-phase
/// algorithm: generate the full rule-driven set, then clip to the window;
/// RDATE/EXDATE are unioned/subtracted before clipping).
pub fn expand_event(event: &Event, window_start: NaiveDateTime, window_end: NaiveDateTime) -> Vec<Occurrence> {
    let Some(dtstart) = event.dtstart.to_naive() else { return Vec::new() };

    let mut points: Vec<(NaiveDateTime, ChronoDuration)> = Vec::new();
    points.push((dtstart, event.base_duration()));

    if let Some(recur) = &event.rrule {
        let window_end_for_rrule = recur.count.is_none().then_some(window_end);
        for candidate in expand_rrule(event, recur, window_end_for_rrule) {
            points.push((candidate, event.base_duration()));
        }
    }

    for entry in &event.rdate {
        if let Some(naive) = entry.point.to_naive() {
            let duration = entry.duration_override.unwrap_or_else(|| event.base_duration());
            points.push((naive, duration));
        }
    }

    let exdates: Vec<NaiveDateTime> = event.exdate.iter().filter_map(DateOrDateTime::to_naive).collect();

    points.sort_by_key(|(instant, _)| *instant);
    points.dedup_by_key(|(instant, _)| *instant);

    points
        .into_iter()
        .filter(|(instant, _)| !exdates.contains(instant))
        .filter(|(instant, _)| *instant >= window_start && *instant <= window_end)
        .map(|(instant, duration)| Occurrence { start: event.dtstart.with_naive(instant), duration })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use icalrs_ical::component::parse;
    use icalrs_ical::diagnostics::DiagnosticBus;

    fn expand(body: &str, window_start: &str, window_end: &str) -> Vec<NaiveDateTime> {
        let input = format!("BEGIN:VCALENDAR\r\nPRODID:-//test//EN\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\n{body}END:VEVENT\r\nEND:VCALENDAR\r\n");
        let mut bus = DiagnosticBus::new(false);
        let calendar = parse(&input, &mut bus).unwrap();
        let vevent = calendar.components_named("VEVENT").next().unwrap();
        let event = crate::event::validate_event(vevent, &mut bus).unwrap();

        let parse_stamp = |s: &str| chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S").unwrap();
        expand_event(&event, parse_stamp(window_start), parse_stamp(window_end))
            .into_iter()
            .filter_map(|occ| occ.start.to_naive())
            .collect()
    }

    #[test]
    fn weekly_tuesday_thursday_count_ten() {
        let occurrences = expand(
            "UID:1\r\nDTSTART:20210105T090000\r\nRRULE:FREQ=WEEKLY;BYDAY=TU,TH;COUNT=10\r\n",
            "20210101T000000",
            "20211231T235959",
        );
        assert_eq!(occurrences.len(), 10);
        assert!(occurrences.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn daily_with_rdate_and_exdate() {
        let occurrences = expand(
            "UID:1\r\nDTSTART:20210101T090000\r\nRRULE:FREQ=DAILY;COUNT=3\r\nRDATE:20210110T090000\r\nEXDATE:20210102T090000\r\n",
            "20210101T000000",
            "20210201T000000",
        );
        assert_eq!(occurrences.len(), 3);
        assert!(occurrences.contains(&chrono::NaiveDateTime::parse_from_str("20210110T090000", "%Y%m%dT%H%M%S").unwrap()));
        assert!(!occurrences.iter().any(|o| o.day() == 2 && o.month() == 1));
    }

    #[test]
    fn monthly_last_friday_until() {
        let occurrences = expand(
            "UID:1\r\nDTSTART:20210101T090000\r\nRRULE:FREQ=MONTHLY;BYDAY=-1FR;UNTIL=20210401T000000\r\n",
            "20210101T000000",
            "20211231T235959",
        );
        assert!(occurrences.iter().all(|o| o.weekday() == chrono::Weekday::Fri));
        assert!(!occurrences.is_empty());
    }

    #[test]
    fn yearly_byday_scoped_to_bymonth() {
        let occurrences = expand(
            "UID:1\r\nDTSTART:20210101T090000\r\nRRULE:FREQ=YEARLY;BYMONTH=3;BYDAY=MO;COUNT=8\r\n",
            "20210101T000000",
            "20221231T235959",
        );
        assert!(occurrences.iter().all(|o| o.month() == 3 && o.weekday() == chrono::Weekday::Mon));
    }
}
