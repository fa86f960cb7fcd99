//! PERIOD value decoding (spec §3): `start/end` where `end` is either a
//! DATE-TIME or a positive DURATION.

use crate::diagnostics::{Diagnostic, DiagnosticBus};
use crate::values::date_time::{decode_date_or_date_time, DateTimeValue};
use crate::values::duration::{decode_duration, Duration};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum PeriodEnd {
    DateTime(DateTimeValue),
    Duration(Duration),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub start: DateTimeValue,
    pub end: PeriodEnd,
}

impl Period {
    /// The occurrence's effective end point, resolving a DURATION-typed end
    /// against `start` (spec §3 PERIOD: "start and a positive duration").
    pub fn effective_end(&self) -> Option<DateTimeValue> {
        match &self.end {
            PeriodEnd::DateTime(end) => Some(end.clone()),
            PeriodEnd::Duration(duration) => {
                let start = self.start.to_naive_date_time()?;
                Some(self.start.with_naive_date_time(start + duration.to_chrono_duration()))
            }
        }
    }
}

pub fn decode_period(raw: &str, tzid: Option<&str>, line_number: u32, bus: &mut DiagnosticBus) -> Period {
    let Some((start_raw, end_raw)) = raw.split_once('/') else {
        bus.push(
            Diagnostic::new("3.3.9_1", line_number, raw)
                .with_annotation("PERIOD value must contain '/'"),
        );
        let start = decode_date_or_date_time(raw, tzid, false, line_number, bus);
        let start = as_date_time(start);
        return Period { start: start.clone(), end: PeriodEnd::Duration(Duration::default()) };
    };

    let start = as_date_time(decode_date_or_date_time(start_raw, tzid, false, line_number, bus));

    let end = if end_raw.starts_with('P') || end_raw.starts_with("-P") || end_raw.starts_with("+P") {
        PeriodEnd::Duration(decode_duration(end_raw, line_number, bus, false))
    } else {
        PeriodEnd::DateTime(as_date_time(decode_date_or_date_time(end_raw, tzid, false, line_number, bus)))
    };

    Period { start, end }
}

fn as_date_time(value: Value) -> DateTimeValue {
    match value {
        Value::DateTime(date_time) => date_time,
        Value::Date(date) => DateTimeValue::Floating(date, chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap()),
        _ => unreachable!("decode_date_or_date_time only returns Date or DateTime"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_datetime_end() {
        let mut bus = DiagnosticBus::new(false);
        let period = decode_period("20210101T100000Z/20210101T120000Z", None, 1, &mut bus);
        assert!(matches!(period.end, PeriodEnd::DateTime(_)));
    }

    #[test]
    fn decodes_duration_end() {
        let mut bus = DiagnosticBus::new(false);
        let period = decode_period("20210101T100000Z/PT2H", None, 1, &mut bus);

        let Some(end) = period.effective_end() else { panic!("expected resolvable end") };
        assert_eq!(end.time(), chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap());
    }
}
