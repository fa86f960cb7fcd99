//! The round-trip-capable generator (spec §10): renders a [`Component`]
//! tree back to folded, CRLF-terminated iCalendar text, and builds the
//! `VEVENT` component tree for a validated [`Event`].

use icalrs_ical::component::Component;
use icalrs_ical::property::{Parameter, Property};
use icalrs_ical::value::Value;
use chrono::Timelike;
use icalrs_ical::values::date_time::DateTimeValue;
use icalrs_ical::values::recur::{Recur, Until, WeekDayNum};

use crate::event::{DateOrDateTime, Event, RdateEntry};

const FOLD_WIDTH: usize = 75;

/// Folds one logical content line at `FOLD_WIDTH` octets, continuation
/// lines prefixed with a single space (spec §3.1, the inverse of
/// `icalrs_ical::unfold`).
fn fold_line(line: &str, out: &mut String) {
    let bytes = line.as_bytes();
    if bytes.len() <= FOLD_WIDTH {
        out.push_str(line);
        out.push_str("\r\n");
        return;
    }

    let mut start = 0;
    let mut first = true;
    while start < bytes.len() {
        let budget = if first { FOLD_WIDTH } else { FOLD_WIDTH - 1 };
        let mut end = (start + budget).min(bytes.len());
        // Never split a UTF-8 sequence across a fold boundary.
        while end < bytes.len() && (bytes[end] & 0b1100_0000) == 0b1000_0000 {
            end -= 1;
        }

        if !first {
            out.push(' ');
        }
        out.push_str(&line[start..end]);
        out.push_str("\r\n");

        start = end;
        first = false;
    }
}

fn render_date_time(value: &DateTimeValue) -> String {
    let date = value.date();
    let time = value.time();
    let stamp = format!("{:04}{:02}{:02}T{:02}{:02}{:02}", date.year, date.month, date.day, time.hour(), time.minute(), time.second());

    match value {
        DateTimeValue::Floating(..) => stamp,
        DateTimeValue::Utc(..) => format!("{stamp}Z"),
        DateTimeValue::Zoned(..) => stamp,
    }
}

fn render_date(point: &DateOrDateTime) -> String {
    match point {
        DateOrDateTime::Date(date) => format!("{:04}{:02}{:02}", date.year, date.month, date.day),
        DateOrDateTime::DateTime(dt) => render_date_time(dt),
    }
}

fn render_byday(entry: &WeekDayNum) -> String {
    let code = match entry.1 {
        icalrs_ical::values::recur::WeekDay::Sunday => "SU",
        icalrs_ical::values::recur::WeekDay::Monday => "MO",
        icalrs_ical::values::recur::WeekDay::Tuesday => "TU",
        icalrs_ical::values::recur::WeekDay::Wednesday => "WE",
        icalrs_ical::values::recur::WeekDay::Thursday => "TH",
        icalrs_ical::values::recur::WeekDay::Friday => "FR",
        icalrs_ical::values::recur::WeekDay::Saturday => "SA",
    };

    match entry.0 {
        Some(ordinal) => format!("{ordinal}{code}"),
        None => code.to_string(),
    }
}

fn render_list<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    items.iter().map(render).collect::<Vec<_>>().join(",")
}

/// Renders a `Recur` back to its `FREQ=...;...` rule-part text.
pub fn render_recur(recur: &Recur) -> String {
    let mut parts = Vec::new();

    if let Some(freq) = recur.freq {
        let name = match freq {
            icalrs_ical::values::recur::Freq::Secondly => "SECONDLY",
            icalrs_ical::values::recur::Freq::Minutely => "MINUTELY",
            icalrs_ical::values::recur::Freq::Hourly => "HOURLY",
            icalrs_ical::values::recur::Freq::Daily => "DAILY",
            icalrs_ical::values::recur::Freq::Weekly => "WEEKLY",
            icalrs_ical::values::recur::Freq::Monthly => "MONTHLY",
            icalrs_ical::values::recur::Freq::Yearly => "YEARLY",
        };
        parts.push(format!("FREQ={name}"));
    }

    if recur.interval > 1 {
        parts.push(format!("INTERVAL={}", recur.interval));
    }
    if let Some(count) = recur.count {
        parts.push(format!("COUNT={count}"));
    }
    if let Some(until) = &recur.until {
        let rendered = match until {
            Until::Date(date) => format!("{:04}{:02}{:02}", date.year, date.month, date.day),
            Until::DateTime(dt) => render_date_time(dt),
        };
        parts.push(format!("UNTIL={rendered}"));
    }
    if !recur.bysecond.is_empty() {
        parts.push(format!("BYSECOND={}", render_list(&recur.bysecond, u32::to_string)));
    }
    if !recur.byminute.is_empty() {
        parts.push(format!("BYMINUTE={}", render_list(&recur.byminute, u32::to_string)));
    }
    if !recur.byhour.is_empty() {
        parts.push(format!("BYHOUR={}", render_list(&recur.byhour, u32::to_string)));
    }
    if !recur.byday.is_empty() {
        parts.push(format!("BYDAY={}", render_list(&recur.byday, |d| render_byday(d))));
    }
    if !recur.bymonthday.is_empty() {
        parts.push(format!("BYMONTHDAY={}", render_list(&recur.bymonthday, i32::to_string)));
    }
    if !recur.byyearday.is_empty() {
        parts.push(format!("BYYEARDAY={}", render_list(&recur.byyearday, i32::to_string)));
    }
    if !recur.byweekno.is_empty() {
        parts.push(format!("BYWEEKNO={}", render_list(&recur.byweekno, i32::to_string)));
    }
    if !recur.bymonth.is_empty() {
        parts.push(format!("BYMONTH={}", render_list(&recur.bymonth, u32::to_string)));
    }
    if !recur.bysetpos.is_empty() {
        parts.push(format!("BYSETPOS={}", render_list(&recur.bysetpos, i32::to_string)));
    }

    parts.join(";")
}

fn property(name: &str, value: Value) -> Property {
    Property { name: name.to_string(), parameters: Vec::<Parameter>::new(), value, line_number: 0 }
}

fn text_property(name: &str, text: &str) -> Property {
    property(name, Value::Text(text.to_string()))
}

/// Renders one RDATE entry, carrying a PERIOD-typed `VALUE=PERIOD` override
/// through when the entry has its own duration (spec §4.6.7) rather than
/// losing it back to a plain DATE-TIME on round-trip.
fn rdate_property(entry: &RdateEntry) -> Property {
    let Some(duration) = entry.duration_override else {
        return text_property("RDATE", &render_date(&entry.point));
    };

    let mut rdate = property("RDATE", Value::Text(format!("{}/{}", render_date(&entry.point), format_duration_seconds(duration.num_seconds()))));
    rdate.parameters.push(Parameter { name: "VALUE".to_string(), values: vec!["PERIOD".to_string()] });
    rdate
}

/// Builds the `VEVENT` component for `event`, synthesizing a DTSTAMP at
/// render time since it is not retained on the validated `Event` (spec §6
/// "synthesize PRODID/VERSION/UID/DTSTAMP when absent").
pub fn event_to_component(event: &Event) -> Component {
    let mut properties = vec![text_property("UID", &event.uid), text_property("DTSTART", &render_date(&event.dtstart))];

    let now = chrono::Utc::now().naive_utc();
    properties.push(text_property(
        "DTSTAMP",
        &render_date_time(&DateTimeValue::Utc(icalrs_ical::values::date::Date::from_naive_date(now.date()), now.time())),
    ));

    if event.sequence != 0 {
        properties.push(property("SEQUENCE", Value::Integer(event.sequence)));
    }

    if let Some(summary) = &event.summary {
        properties.push(text_property("SUMMARY", summary));
    }

    if let Some(dtend) = &event.dtend {
        properties.push(text_property("DTEND", &render_date(dtend)));
    } else if let Some(duration) = &event.duration {
        let seconds = duration.to_seconds();
        properties.push(text_property("DURATION", &format_duration_seconds(seconds)));
    }

    if let Some(recur) = &event.rrule {
        properties.push(text_property("RRULE", &render_recur(recur)));
    }

    for entry in &event.rdate {
        properties.push(rdate_property(entry));
    }

    if !event.exdate.is_empty() {
        properties.push(text_property("EXDATE", &render_list(&event.exdate, render_date)));
    }

    Component { name: "VEVENT".to_string(), properties, components: Vec::new() }
}

fn format_duration_seconds(total: i64) -> String {
    let sign = if total < 0 { "-" } else { "" };
    let mut remaining = total.unsigned_abs();

    let days = remaining / 86_400;
    remaining %= 86_400;
    let hours = remaining / 3_600;
    remaining %= 3_600;
    let minutes = remaining / 60;
    let seconds = remaining % 60;

    let mut text = format!("{sign}P");
    if days > 0 {
        text.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 {
        text.push('T');
        if hours > 0 {
            text.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            text.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 || (days == 0 && hours == 0 && minutes == 0) {
            text.push_str(&format!("{seconds}S"));
        }
    }
    text
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Text(text) => icalrs_ical::values::text::encode_text(text),
        Value::Integer(n) => n.to_string(),
        Value::Date(date) => format!("{:04}{:02}{:02}", date.year, date.month, date.day),
        Value::DateTime(dt) => render_date_time(dt),
        Value::Duration(duration) => format_duration_seconds(duration.to_seconds()),
        Value::Recur(recur) => render_recur(recur),
        Value::CalAddress(text) | Value::Uri(text) => text.clone(),
        Value::Geo(lat, long) => format!("{lat};{long}"),
        Value::Period(period) => match &period.end {
            icalrs_ical::values::period::PeriodEnd::DateTime(end) => format!("{}/{}", render_date_time(&period.start), render_date_time(end)),
            icalrs_ical::values::period::PeriodEnd::Duration(duration) => {
                format!("{}/{}", render_date_time(&period.start), format_duration_seconds(duration.to_seconds()))
            }
        },
        Value::List(values) => values.iter().map(render_value).collect::<Vec<_>>().join(","),
    }
}

fn render_property(property: &Property, out: &mut String) {
    let mut line = property.name.clone();
    for parameter in &property.parameters {
        line.push(';');
        line.push_str(&parameter.name);
        line.push('=');
        line.push_str(&parameter.values.join(","));
    }
    line.push(':');
    line.push_str(&render_value(&property.value));
    fold_line(&line, out);
}

fn render_component(component: &Component, out: &mut String) {
    fold_line(&format!("BEGIN:{}", component.name), out);
    for property in &component.properties {
        render_property(property, out);
    }
    for child in &component.components {
        render_component(child, out);
    }
    fold_line(&format!("END:{}", component.name), out);
}

/// Serializes a full `Component` tree (normally a `VCALENDAR` built by
/// [`crate::calendar::to_component`]) to CRLF-terminated, 75-octet-folded
/// iCalendar text.
pub fn serialize(root: &Component) -> String {
    let mut out = String::new();
    render_component(root, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use icalrs_ical::component::parse;
    use icalrs_ical::diagnostics::DiagnosticBus;

    #[test]
    fn folds_long_lines_at_75_octets() {
        let long_summary = "x".repeat(200);
        let mut out = String::new();
        fold_line(&format!("SUMMARY:{long_summary}"), &mut out);
        for line in out.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(line.len() <= FOLD_WIDTH);
        }
    }

    #[test]
    fn round_trips_simple_event() {
        let input = "BEGIN:VCALENDAR\r\nPRODID:-//test//EN\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:1\r\nDTSTART:20210105T090000\r\nSUMMARY:Standup\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let mut bus = DiagnosticBus::new(false);
        let calendar = parse(input, &mut bus).unwrap();
        let vevent = calendar.components_named("VEVENT").next().unwrap();
        let event = crate::event::validate_event(vevent, &mut bus).unwrap();

        let component = event_to_component(&event);
        let rendered = serialize(&component);

        assert!(rendered.contains("SUMMARY:Standup"));
        assert!(rendered.contains("DTSTART:20210105T090000"));

        let mut bus2 = DiagnosticBus::new(false);
        let reparsed = parse(&format!("BEGIN:VCALENDAR\r\nPRODID:-//test//EN\r\nVERSION:2.0\r\n{rendered}END:VCALENDAR\r\n"), &mut bus2).unwrap();
        assert_eq!(reparsed.components_named("VEVENT").count(), 1);
    }

    #[test]
    fn escapes_special_characters_in_text() {
        assert_eq!(render_value(&Value::Text("A, B; C\\D\nE".to_string())), "A\\, B\\; C\\\\D\\nE");
    }

    #[test]
    fn rdate_period_survives_round_trip() {
        let input = "BEGIN:VCALENDAR\r\nPRODID:-//test//EN\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:1\r\nDTSTART:20210105T090000\r\nRDATE;VALUE=PERIOD:20210106T090000/PT2H\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
        let mut bus = DiagnosticBus::new(false);
        let calendar = parse(input, &mut bus).unwrap();
        let vevent = calendar.components_named("VEVENT").next().unwrap();
        let event = crate::event::validate_event(vevent, &mut bus).unwrap();

        let rendered = serialize(&event_to_component(&event));
        assert!(rendered.contains("RDATE;VALUE=PERIOD:20210106T090000/PT2H"));

        let mut bus2 = DiagnosticBus::new(false);
        let reparsed = parse(&format!("BEGIN:VCALENDAR\r\nPRODID:-//test//EN\r\nVERSION:2.0\r\n{rendered}END:VCALENDAR\r\n"), &mut bus2).unwrap();
        let reloaded = crate::event::validate_event(reparsed.components_named("VEVENT").next().unwrap(), &mut bus2).unwrap();
        assert_eq!(reloaded.rdate[0].duration_override, Some(chrono::Duration::hours(2)));
    }
}
