//! DATE-TIME value decoding (spec §3, §4.3): `YYYYMMDDTHHMMSS`, optionally
//! suffixed with `Z`, optionally accompanied by a `TZID=` parameter. The
//! three forms are mutually exclusive (design note §9: "three-way DATE-TIME
//! zone variant").

use chrono::NaiveTime;

use crate::diagnostics::{Diagnostic, DiagnosticBus};
use crate::value::Value;
use crate::values::date::{decode_date, Date};

/// A decoded DATE-TIME, keeping the zone classification the RFC gives it
/// rather than eagerly converting to UTC (design note §9): `Floating` has
/// no zone, `Utc` carried a trailing `Z`, `Zoned` carried a `TZID=`
/// parameter whose rules this crate does not interpret.
#[derive(Debug, Clone, PartialEq)]
pub enum DateTimeValue {
    Floating(Date, NaiveTime),
    Utc(Date, NaiveTime),
    Zoned(Date, NaiveTime, String),
}

impl DateTimeValue {
    pub fn date(&self) -> Date {
        match self {
            DateTimeValue::Floating(date, _)
            | DateTimeValue::Utc(date, _)
            | DateTimeValue::Zoned(date, _, _) => *date,
        }
    }

    pub fn time(&self) -> NaiveTime {
        match self {
            DateTimeValue::Floating(_, time)
            | DateTimeValue::Utc(_, time)
            | DateTimeValue::Zoned(_, time, _) => *time,
        }
    }

    pub fn tzid(&self) -> Option<&str> {
        match self {
            DateTimeValue::Zoned(_, _, tzid) => Some(tzid.as_str()),
            _ => None,
        }
    }

    /// Two DATE-TIMEs are only directly comparable without a zone database
    /// when they share the same "label": both floating, both UTC, or both
    /// zoned under the identical TZID (design note §9).
    pub fn comparison_label(&self) -> &str {
        match self {
            DateTimeValue::Floating(_, _) => "",
            DateTimeValue::Utc(_, _) => "Z",
            DateTimeValue::Zoned(_, _, tzid) => tzid.as_str(),
        }
    }

    pub fn with_date(&self, date: Date) -> Self {
        match self {
            DateTimeValue::Floating(_, time) => DateTimeValue::Floating(date, *time),
            DateTimeValue::Utc(_, time) => DateTimeValue::Utc(date, *time),
            DateTimeValue::Zoned(_, time, tzid) => DateTimeValue::Zoned(date, *time, tzid.clone()),
        }
    }

    pub fn to_naive_date_time(&self) -> Option<chrono::NaiveDateTime> {
        self.date().to_naive_date().map(|date| date.and_time(self.time()))
    }

    pub fn with_naive_date_time(&self, date_time: chrono::NaiveDateTime) -> Self {
        let date = Date::from_naive_date(date_time.date());
        let time = date_time.time();

        match self {
            DateTimeValue::Floating(_, _) => DateTimeValue::Floating(date, time),
            DateTimeValue::Utc(_, _) => DateTimeValue::Utc(date, time),
            DateTimeValue::Zoned(_, _, tzid) => DateTimeValue::Zoned(date, time, tzid.clone()),
        }
    }
}

fn decode_time(raw: &str) -> Option<NaiveTime> {
    if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hour: u32 = raw[0..2].parse().ok()?;
    let minute: u32 = raw[2..4].parse().ok()?;
    let second: u32 = raw[4..6].parse().ok()?;

    NaiveTime::from_hms_opt(hour, minute, second)
}

/// Decodes either a DATE or a DATE-TIME value, routed by length and the
/// presence of a `T` separator; `tzid` comes from the `TZID=` content-line
/// parameter, if any.
pub fn decode_date_or_date_time(
    raw: &str,
    tzid: Option<&str>,
    explicit_value_is_date: bool,
    line_number: u32,
    bus: &mut DiagnosticBus,
) -> Value {
    let (date_part, rest) = match raw.split_once('T') {
        Some((date_part, rest)) => (date_part, Some(rest)),
        None => (raw, None),
    };

    if rest.is_none() {
        if raw.len() > 8 && explicit_value_is_date {
            bus.push(
                Diagnostic::new("3.3.4_1", line_number, raw)
                    .with_annotation("VALUE=DATE declared but value is longer than 8 characters"),
            );
        }
        return Value::Date(decode_date(date_part, line_number, bus));
    }

    let rest = rest.unwrap();
    let (time_part, has_utc_marker) = match rest.strip_suffix('Z') {
        Some(stripped) => (stripped, true),
        None => (rest, false),
    };

    let date = decode_date(date_part, line_number, bus);
    let time = decode_time(time_part).unwrap_or_else(|| {
        bus.push(
            Diagnostic::new("3.3.5_2", line_number, raw)
                .with_annotation("malformed TIME component, defaulting to midnight"),
        );
        NaiveTime::from_hms_opt(0, 0, 0).unwrap()
    });

    if has_utc_marker && tzid.is_some() {
        bus.push(
            Diagnostic::new("3.3.5_3", line_number, raw)
                .with_annotation("TZID MUST NOT accompany a UTC ('Z') DATE-TIME"),
        );
    }

    let date_time_value = if has_utc_marker {
        DateTimeValue::Utc(date, time)
    } else if let Some(tzid) = tzid {
        DateTimeValue::Zoned(date, time, tzid.to_string())
    } else {
        DateTimeValue::Floating(date, time)
    };

    Value::DateTime(date_time_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_floating_date_time() {
        let mut bus = DiagnosticBus::new(false);
        let value = decode_date_or_date_time("20210105T090000", None, false, 1, &mut bus);

        match value {
            Value::DateTime(DateTimeValue::Floating(date, time)) => {
                assert_eq!(date, Date::new(2021, 1, 5));
                assert_eq!(time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
            }
            other => panic!("unexpected value: {other:?}"),
        }
        assert!(bus.is_compliant());
    }

    #[test]
    fn decodes_utc_date_time() {
        let mut bus = DiagnosticBus::new(false);
        let value = decode_date_or_date_time("20210105T090000Z", None, false, 1, &mut bus);
        assert!(matches!(value, Value::DateTime(DateTimeValue::Utc(_, _))));
    }

    #[test]
    fn utc_with_tzid_is_diagnosed() {
        let mut bus = DiagnosticBus::new(false);
        decode_date_or_date_time("20210105T090000Z", Some("America/New_York"), false, 1, &mut bus);
        assert!(bus.log().iter().any(|d| d.rfc_tag == "3.3.5_3"));
    }

    #[test]
    fn decodes_plain_date_value() {
        let mut bus = DiagnosticBus::new(false);
        let value = decode_date_or_date_time("20210105", None, true, 1, &mut bus);
        assert_eq!(value, Value::Date(Date::new(2021, 1, 5)));
    }
}
