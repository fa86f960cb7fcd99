//! RECUR value decoding (spec §3, §4.3, §4.5): the `FREQ=...;INTERVAL=...;...`
//! rule-part grammar. Decoding here only validates syntax and rule-part
//! cardinality; semantic legality of a BY-part combination for a given FREQ
//! (spec §4.6.1) is the event validator's job in `icalrs-core`.

use crate::diagnostics::{Diagnostic, DiagnosticBus, Severity};
use crate::values::date_time::DateTimeValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freq {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Freq {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "SECONDLY" => Some(Freq::Secondly),
            "MINUTELY" => Some(Freq::Minutely),
            "HOURLY" => Some(Freq::Hourly),
            "DAILY" => Some(Freq::Daily),
            "WEEKLY" => Some(Freq::Weekly),
            "MONTHLY" => Some(Freq::Monthly),
            "YEARLY" => Some(Freq::Yearly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum WeekDay {
    Sunday,
    #[default]
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl WeekDay {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "SU" => Some(WeekDay::Sunday),
            "MO" => Some(WeekDay::Monday),
            "TU" => Some(WeekDay::Tuesday),
            "WE" => Some(WeekDay::Wednesday),
            "TH" => Some(WeekDay::Thursday),
            "FR" => Some(WeekDay::Friday),
            "SA" => Some(WeekDay::Saturday),
            _ => None,
        }
    }

    /// `chrono::Weekday` numbering starts at Monday; RFC 5545 numbers weeks
    /// from `WKST` instead, so this is only used for `Weekday`-trait interop.
    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            WeekDay::Sunday => chrono::Weekday::Sun,
            WeekDay::Monday => chrono::Weekday::Mon,
            WeekDay::Tuesday => chrono::Weekday::Tue,
            WeekDay::Wednesday => chrono::Weekday::Wed,
            WeekDay::Thursday => chrono::Weekday::Thu,
            WeekDay::Friday => chrono::Weekday::Fri,
            WeekDay::Saturday => chrono::Weekday::Sat,
        }
    }
}

/// A `BYDAY` entry: an optional ordinal (`+1MO`, `-1FR`) paired with a
/// weekday. `None` means "every occurrence of this weekday in scope".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekDayNum(pub Option<i32>, pub WeekDay);

impl WeekDayNum {
    fn parse(raw: &str) -> Option<Self> {
        let split_at = raw.find(|c: char| c.is_ascii_alphabetic())?;
        let (ordinal_part, day_part) = raw.split_at(split_at);

        let ordinal = if ordinal_part.is_empty() {
            None
        } else {
            Some(ordinal_part.parse::<i32>().ok()?)
        };

        let day = WeekDay::parse(day_part)?;
        Some(WeekDayNum(ordinal, day))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Until {
    Date(crate::values::date::Date),
    DateTime(DateTimeValue),
}

/// A decoded `RECUR` value (spec §3, §4.6). Rule parts absent from the raw
/// text are left empty/`None`; cardinality and FREQ-compatibility are
/// enforced by the event validator, not here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Recur {
    pub freq: Option<Freq>,
    pub interval: u32,
    pub count: Option<u32>,
    pub until: Option<Until>,
    pub bysecond: Vec<u32>,
    pub byminute: Vec<u32>,
    pub byhour: Vec<u32>,
    pub byday: Vec<WeekDayNum>,
    pub bymonthday: Vec<i32>,
    pub byyearday: Vec<i32>,
    pub byweekno: Vec<i32>,
    pub bymonth: Vec<u32>,
    pub bysetpos: Vec<i32>,
    pub wkst: WeekDay,
}

impl Recur {
    fn new() -> Self {
        Self { interval: 1, wkst: WeekDay::Monday, ..Default::default() }
    }
}

fn parse_int_list<T: std::str::FromStr>(raw: &str) -> Option<Vec<T>> {
    raw.split(',').map(|part| part.parse::<T>().ok()).collect()
}

/// Decodes a `RECUR` value's rule-part list. Each `NAME=value` segment is
/// separated by `;` (spec §3). Unknown rule-part names and malformed values
/// are diagnosed and skipped rather than aborting the whole value, matching
/// the lenient-by-default parsing stance (spec §4.4).
pub fn decode_recur(raw: &str, line_number: u32, bus: &mut DiagnosticBus) -> Recur {
    let mut recur = Recur::new();
    let mut seen_freq = false;
    let mut seen_until = false;
    let mut seen_count = false;

    for part in raw.split(';') {
        let Some((name, value)) = part.split_once('=') else {
            if !part.is_empty() {
                bus.push(
                    Diagnostic::new("4.3.10_1", line_number, raw)
                        .with_annotation(format!("malformed RECUR rule-part: {part}")),
                );
            }
            continue;
        };

        match name {
            "FREQ" => match Freq::parse(value) {
                Some(freq) => {
                    recur.freq = Some(freq);
                    seen_freq = true;
                }
                None => bus.push(
                    Diagnostic::new("4.3.10_2", line_number, raw)
                        .with_annotation(format!("unrecognized FREQ value: {value}")),
                ),
            },
            "INTERVAL" => match value.parse::<u32>() {
                Ok(interval) if interval > 0 => recur.interval = interval,
                _ => bus.push(
                    Diagnostic::new("4.3.10_3", line_number, raw)
                        .with_annotation("INTERVAL must be a positive integer"),
                ),
            },
            "COUNT" => match value.parse::<u32>() {
                Ok(count) => {
                    recur.count = Some(count);
                    seen_count = true;
                }
                Err(_) => bus.push(Diagnostic::new("4.3.10_4", line_number, raw)),
            },
            "UNTIL" => {
                seen_until = true;
                recur.until = decode_until(value, line_number, bus);
            }
            "BYSECOND" => recur.bysecond = parse_int_list(value).unwrap_or_default(),
            "BYMINUTE" => recur.byminute = parse_int_list(value).unwrap_or_default(),
            "BYHOUR" => recur.byhour = parse_int_list(value).unwrap_or_default(),
            "BYDAY" => {
                recur.byday = value.split(',').filter_map(WeekDayNum::parse).collect();
            }
            "BYMONTHDAY" => recur.bymonthday = parse_int_list(value).unwrap_or_default(),
            "BYYEARDAY" => recur.byyearday = parse_int_list(value).unwrap_or_default(),
            "BYWEEKNO" => recur.byweekno = parse_int_list(value).unwrap_or_default(),
            "BYMONTH" => recur.bymonth = parse_int_list(value).unwrap_or_default(),
            "BYSETPOS" => recur.bysetpos = parse_int_list(value).unwrap_or_default(),
            "WKST" => match WeekDay::parse(value) {
                Some(day) => recur.wkst = day,
                None => bus.push(Diagnostic::new("4.3.10_5", line_number, raw)),
            },
            _ => bus.push(
                Diagnostic::new("4.3.10_6", line_number, raw)
                    .with_annotation(format!("unrecognized RECUR rule-part: {name}")),
            ),
        }
    }

    if !seen_freq {
        bus.push(
            Diagnostic::new("4.3.10_7", line_number, raw)
                .with_annotation("RECUR value missing mandatory FREQ rule-part")
                .with_severity(Severity::Fatal),
        );
    }

    if seen_until && seen_count {
        bus.push(
            Diagnostic::new("4.3.10_8", line_number, raw)
                .with_annotation("UNTIL and COUNT MUST NOT both appear in the same RECUR value"),
        );
    }

    recur
}

fn decode_until(raw: &str, line_number: u32, bus: &mut DiagnosticBus) -> Option<Until> {
    use crate::values::date_time::decode_date_or_date_time;
    use crate::value::Value;

    match decode_date_or_date_time(raw, None, false, line_number, bus) {
        Value::Date(date) => Some(Until::Date(date)),
        Value::DateTime(date_time) => Some(Until::DateTime(date_time)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_weekly_with_count() {
        let mut bus = DiagnosticBus::new(false);
        let recur = decode_recur("FREQ=WEEKLY;COUNT=10;BYDAY=TU,TH", 1, &mut bus);
        assert_eq!(recur.freq, Some(Freq::Weekly));
        assert_eq!(recur.count, Some(10));
        assert_eq!(recur.byday, vec![WeekDayNum(None, WeekDay::Tuesday), WeekDayNum(None, WeekDay::Thursday)]);
        assert!(bus.is_compliant());
    }

    #[test]
    fn decodes_ordinal_byday() {
        let mut bus = DiagnosticBus::new(false);
        let recur = decode_recur("FREQ=MONTHLY;BYDAY=-1FR", 1, &mut bus);
        assert_eq!(recur.byday, vec![WeekDayNum(Some(-1), WeekDay::Friday)]);
    }

    #[test]
    fn missing_freq_is_fatal() {
        let mut bus = DiagnosticBus::new(false);
        decode_recur("COUNT=5", 1, &mut bus);
        assert!(bus.has_fatal());
    }

    #[test]
    fn flags_until_and_count_together() {
        let mut bus = DiagnosticBus::new(false);
        decode_recur("FREQ=DAILY;COUNT=5;UNTIL=20211231", 1, &mut bus);
        assert!(bus.log().iter().any(|d| d.rfc_tag == "4.3.10_8"));
    }
}
