//! A validated `VEVENT` (spec §4.5) and the `DateOrDateTime` point type that
//! unifies `icalrs_ical`'s DATE and DATE-TIME value forms for the
//! recurrence expander.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use icalrs_ical::values::date::Date;
use icalrs_ical::values::date_time::DateTimeValue;
use icalrs_ical::values::duration::Duration as IcalDuration;
use icalrs_ical::values::period::PeriodEnd;
use icalrs_ical::values::recur::{Recur, Until};
use icalrs_ical::{Component, Diagnostic, DiagnosticBus, ParseError, Value};

/// A DTSTART/DTEND/RDATE/EXDATE point, unifying DATE and DATE-TIME so the
/// expander can work in `chrono::NaiveDateTime` uniformly (design note §9:
/// the zone classification is carried but never interpreted).
#[derive(Debug, Clone, PartialEq)]
pub enum DateOrDateTime {
    Date(Date),
    DateTime(DateTimeValue),
}

impl DateOrDateTime {
    pub fn is_date(&self) -> bool {
        matches!(self, DateOrDateTime::Date(_))
    }

    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        match self {
            DateOrDateTime::Date(date) => date.to_naive_date().map(|d| d.and_time(NaiveTime::MIN)),
            DateOrDateTime::DateTime(dt) => dt.to_naive_date_time(),
        }
    }

    /// Reconstructs a point of the same shape/zone-label at a new instant,
    /// used by the expander to emit each computed candidate.
    pub fn with_naive(&self, naive: NaiveDateTime) -> Self {
        match self {
            DateOrDateTime::Date(_) => DateOrDateTime::Date(Date::from_naive_date(naive.date())),
            DateOrDateTime::DateTime(dt) => DateOrDateTime::DateTime(dt.with_naive_date_time(naive)),
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Date(date) => Some(DateOrDateTime::Date(*date)),
            Value::DateTime(dt) => Some(DateOrDateTime::DateTime(dt.clone())),
            _ => None,
        }
    }
}

/// One RDATE entry: a point, and — for PERIOD-typed RDATEs — the duration
/// that overrides the event's own DTEND/DURATION for that occurrence
/// (SPEC_FULL §4.6.7).
#[derive(Debug, Clone, PartialEq)]
pub struct RdateEntry {
    pub point: DateOrDateTime,
    pub duration_override: Option<chrono::Duration>,
}

/// A validated event, ready for the recurrence expander. Built once by
/// [`crate::validate::validate_event`] and treated as immutable thereafter
/// (spec §3 "Lifecycle").
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub uid: String,
    pub summary: Option<String>,
    pub sequence: i32,
    pub dtstart: DateOrDateTime,
    pub dtend: Option<DateOrDateTime>,
    pub duration: Option<IcalDuration>,
    pub rrule: Option<Recur>,
    pub rdate: Vec<RdateEntry>,
    pub exdate: Vec<DateOrDateTime>,
}

impl Event {
    /// The effective duration of the "canonical" occurrence (DTEND−DTSTART,
    /// or DURATION, or zero). Individual RDATE entries may override this
    /// per-occurrence (spec §4.6.7).
    pub fn base_duration(&self) -> chrono::Duration {
        if let (Some(dtend), Some(dtstart)) = (self.dtend.as_ref().and_then(DateOrDateTime::to_naive), self.dtstart.to_naive()) {
            return dtend - dtstart;
        }
        if let Some(duration) = &self.duration {
            return duration.to_chrono_duration();
        }
        chrono::Duration::zero()
    }

    pub fn until_naive(&self) -> Option<NaiveDateTime> {
        self.rrule.as_ref().and_then(|recur| recur.until.as_ref()).map(|until| match until {
            Until::Date(date) => date.to_naive_date().unwrap_or(NaiveDate::MIN).and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap()),
            Until::DateTime(dt) => dt.to_naive_date_time().unwrap_or_default(),
        })
    }
}

/// Resolves a RECURRENCE-ID/RDATE/PERIOD point into a concrete point plus an
/// optional duration override.
fn period_to_rdate_entry(period: &icalrs_ical::values::period::Period) -> RdateEntry {
    let point = DateOrDateTime::DateTime(period.start.clone());
    let duration_override = match &period.end {
        PeriodEnd::Duration(duration) => Some(duration.to_chrono_duration()),
        PeriodEnd::DateTime(end) => match (period.start.to_naive_date_time(), end.to_naive_date_time()) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        },
    };
    RdateEntry { point, duration_override }
}

fn list_points(value: &Value) -> Vec<DateOrDateTime> {
    match value {
        Value::List(values) => values.iter().filter_map(DateOrDateTime::from_value).collect(),
        other => DateOrDateTime::from_value(other).into_iter().collect(),
    }
}

fn list_rdate_entries(value: &Value) -> Vec<RdateEntry> {
    match value {
        Value::List(values) => values
            .iter()
            .map(|v| match v {
                Value::Period(period) => period_to_rdate_entry(period),
                other => RdateEntry { point: DateOrDateTime::from_value(other).unwrap_or(DateOrDateTime::Date(Date::new(1970, 1, 1))), duration_override: None },
            })
            .collect(),
        Value::Period(period) => vec![period_to_rdate_entry(period)],
        other => DateOrDateTime::from_value(other).map(|point| RdateEntry { point, duration_override: None }).into_iter().collect(),
    }
}

/// Runs the event validator (spec §4.5) over a `VEVENT` component, pushing
/// every repairable non-conformance to `bus`. Fails only when DTSTART is
/// absent, since no expansion can proceed without it.
pub fn validate_event(component: &Component, bus: &mut DiagnosticBus) -> Result<Event, ParseError> {
    let uid = match component.property("UID").and_then(|p| p.value.as_text()) {
        Some(uid) => uid.to_string(),
        None => {
            bus.push(
                Diagnostic::new("4.8.4.7_1", component.property("DTSTART").map(|p| p.line_number).unwrap_or(0), "")
                    .with_annotation("UID missing; synthesizing one"),
            );
            uuid::Uuid::new_v4().to_string()
        }
    };

    let Some(dtstart_property) = component.property("DTSTART") else {
        return Err(ParseError::Malformed { line: 0, message: "VEVENT has no DTSTART".to_string() });
    };

    let dtstart = DateOrDateTime::from_value(&dtstart_property.value).ok_or_else(|| ParseError::Malformed {
        line: dtstart_property.line_number,
        message: "DTSTART did not decode to DATE or DATE-TIME".to_string(),
    })?;

    if component.properties_named("DTEND").count() > 1
        || component.properties_named("DTSTART").count() > 1
        || component.properties_named("UID").count() > 1
    {
        bus.push(Diagnostic::new("3.8_1", dtstart_property.line_number, "").with_annotation("property MUST NOT appear more than once"));
    }

    let has_dtend = component.property("DTEND").is_some();
    let has_duration = component.property("DURATION").is_some();

    if has_dtend && has_duration {
        bus.push(
            Diagnostic::new("3.6.1_2", dtstart_property.line_number, "")
                .with_annotation("DTEND and DURATION MUST NOT both appear"),
        );
    }

    let mut dtend = if has_dtend {
        component.property("DTEND").and_then(|p| DateOrDateTime::from_value(&p.value))
    } else {
        None
    };

    let duration = (!has_dtend && has_duration)
        .then(|| component.property("DURATION").map(|p| match &p.value {
            Value::Duration(d) => *d,
            _ => IcalDuration::default(),
        }))
        .flatten();

    if let (Some(end), Some(start_naive)) = (dtend.as_ref(), dtstart.to_naive()) {
        if end.to_naive().map(|e| e <= start_naive).unwrap_or(false) {
            bus.push(
                Diagnostic::new("3.8.5.3_1", dtstart_property.line_number, "")
                    .with_annotation("DTEND is not after DTSTART; repairing DTEND to DTSTART"),
            );
            dtend = Some(dtstart.clone());
        }
    }

    if dtstart.is_date() {
        if let Some(end) = &dtend {
            if !end.is_date() {
                bus.push(Diagnostic::new("3.8.2.4_1", dtstart_property.line_number, "").with_annotation("DTEND value type must match DTSTART"));
            }
        }
    }

    let rrule_count = component.properties_named("RRULE").count();
    if rrule_count > 1 {
        bus.push(
            Diagnostic::new("3.8.5.3_2", dtstart_property.line_number, "")
                .with_annotation("multiple RRULEs on one VEVENT; semantics are undefined, only the first is used"),
        );
    }

    let rrule = component.property("RRULE").and_then(|p| p.value.as_recur().cloned());

    if let Some(recur) = &rrule {
        if dtstart.is_date() && (!recur.byhour.is_empty() || !recur.byminute.is_empty() || !recur.bysecond.is_empty()) {
            bus.push(
                Diagnostic::new("3.3.10_1", dtstart_property.line_number, "")
                    .with_annotation("BYHOUR/BYMINUTE/BYSECOND are meaningless when DTSTART is a DATE"),
            );
        }

        if let Some(until) = &recur.until {
            let until_is_date = matches!(until, Until::Date(_));
            if until_is_date != dtstart.is_date() {
                bus.push(
                    Diagnostic::new("3.3.10_2", dtstart_property.line_number, "")
                        .with_annotation("RRULE UNTIL value type must match DTSTART"),
                );
            }
        }
    }

    let rdate = component
        .properties_named("RDATE")
        .flat_map(|p| list_rdate_entries(&p.value))
        .collect::<Vec<_>>();

    let exdate = component
        .properties_named("EXDATE")
        .flat_map(|p| list_points(&p.value))
        .collect::<Vec<_>>();

    for point in exdate.iter().chain(rdate.iter().map(|e| &e.point)) {
        if point.is_date() != dtstart.is_date() {
            bus.push(
                Diagnostic::new("3.3.10_3", dtstart_property.line_number, "")
                    .with_annotation("RDATE/EXDATE value type must match DTSTART"),
            );
        }
    }

    let sequence = component.property("SEQUENCE").and_then(|p| match p.value {
        Value::Integer(n) => Some(n),
        _ => None,
    }).unwrap_or(0);

    let summary = component.property("SUMMARY").and_then(|p| p.value.as_text()).map(str::to_string);

    Ok(Event { uid, summary, sequence, dtstart, dtend, duration, rrule, rdate, exdate })
}

#[cfg(test)]
mod tests {
    use super::*;
    use icalrs_ical::component::parse;

    fn parse_event(body: &str) -> (Event, DiagnosticBus) {
        let input = format!(
            "BEGIN:VCALENDAR\r\nPRODID:-//test//EN\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\n{body}END:VEVENT\r\nEND:VCALENDAR\r\n"
        );
        let mut bus = DiagnosticBus::new(false);
        let calendar = parse(&input, &mut bus).unwrap();
        let vevent = calendar.components_named("VEVENT").next().unwrap();
        let event = validate_event(vevent, &mut bus).unwrap();
        (event, bus)
    }

    #[test]
    fn synthesizes_missing_uid() {
        let (event, bus) = parse_event("DTSTART;VALUE=DATE:20210105\r\n");
        assert!(!event.uid.is_empty());
        assert!(bus.log().iter().any(|d| d.rfc_tag == "4.8.4.7_1"));
    }

    #[test]
    fn repairs_dtend_before_dtstart() {
        let (event, bus) = parse_event("UID:1\r\nDTSTART:20210105T100000\r\nDTEND:20210105T090000\r\n");
        assert_eq!(event.dtend, Some(event.dtstart.clone()));
        assert!(bus.log().iter().any(|d| d.rfc_tag == "3.8.5.3_1"));
    }

    #[test]
    fn rdate_period_carries_duration_override() {
        let (event, _bus) = parse_event(
            "UID:1\r\nDTSTART:20210105T090000\r\nRDATE;VALUE=PERIOD:20210106T090000/PT2H\r\n",
        );
        assert_eq!(event.rdate.len(), 1);
        assert_eq!(event.rdate[0].duration_override, Some(chrono::Duration::hours(2)));
    }
}
