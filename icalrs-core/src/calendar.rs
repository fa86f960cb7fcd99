//! The `Calendar` facade (spec §6): `load`/`validate_strict`/`enumerate`/
//! `serialize`/`update_event`, the crate's one public entry point.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use icalrs_ical::component::parse;
use icalrs_ical::{Component, DiagnosticBus, ParseError};

use crate::event::{validate_event, Event};
use crate::recur::{expand_event, Occurrence};

/// A loaded, validated calendar: one `VEVENT` per UID, plus the diagnostic
/// log accumulated while parsing and validating it (spec §4.4).
#[derive(Debug)]
pub struct Calendar {
    prodid: String,
    version: String,
    events: HashMap<String, Event>,
    order: Vec<String>,
    bus: DiagnosticBus,
}

/// One expanded occurrence, tagged with the event it came from (spec §6
/// `enumerate`).
#[derive(Debug, Clone)]
pub struct EnumeratedOccurrence {
    pub uid: String,
    pub summary: Option<String>,
    pub occurrence: Occurrence,
}

impl Calendar {
    /// Parses and validates `input` as a full iCalendar stream. Fatal parse
    /// errors (spec §7) abort loading entirely; everything else lands on
    /// the bus and the calendar loads with whatever could be salvaged.
    pub fn load(input: &str, conformance: bool) -> Result<Self, ParseError> {
        let mut bus = DiagnosticBus::new(conformance);
        let root = parse(input, &mut bus)?;

        let prodid = root.property("PRODID").and_then(|p| p.value.as_text()).unwrap_or("").to_string();
        let version = root.property("VERSION").and_then(|p| p.value.as_text()).unwrap_or("2.0").to_string();

        let mut events = HashMap::new();
        let mut order = Vec::new();

        for vevent in root.components_named("VEVENT") {
            match validate_event(vevent, &mut bus) {
                Ok(event) => {
                    order.push(event.uid.clone());
                    events.insert(event.uid.clone(), event);
                }
                Err(error) => {
                    tracing::warn!(%error, "dropping VEVENT that failed validation");
                }
            }
        }

        Ok(Self { prodid, version, events, order, bus })
    }

    /// Spec §6 `validate_strict`: true iff nothing was ever diagnosed.
    pub fn validate_strict(&self) -> bool {
        self.bus.is_compliant()
    }

    pub fn diagnostics(&self) -> &DiagnosticBus {
        &self.bus
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.order.iter().filter_map(|uid| self.events.get(uid))
    }

    pub fn event(&self, uid: &str) -> Option<&Event> {
        self.events.get(uid)
    }

    /// Every occurrence, across every event, whose start falls within
    /// `[window_start, window_end]`, sorted ascending by start (spec §4.6.4
    /// multi-slot expansion: each event is expanded independently, then the
    /// results are merged).
    pub fn enumerate(&self, window_start: NaiveDateTime, window_end: NaiveDateTime) -> Vec<EnumeratedOccurrence> {
        let mut out: Vec<EnumeratedOccurrence> = self
            .order
            .iter()
            .filter_map(|uid| self.events.get(uid))
            .flat_map(|event| {
                expand_event(event, window_start, window_end).into_iter().map(move |occurrence| EnumeratedOccurrence {
                    uid: event.uid.clone(),
                    summary: event.summary.clone(),
                    occurrence,
                })
            })
            .collect();

        out.sort_by(|a, b| {
            let a_naive = a.occurrence.start.to_naive();
            let b_naive = b.occurrence.start.to_naive();
            a_naive.cmp(&b_naive).then_with(|| a.uid.cmp(&b.uid))
        });

        out
    }

    /// Replaces the SUMMARY of the event identified by `uid`, bumping
    /// SEQUENCE as RFC 5545 §3.8.7.4 requires on any update (spec §6
    /// `update_event`). No-op if the UID is unknown.
    pub fn update_event(&mut self, uid: &str, summary: Option<String>) -> bool {
        let Some(event) = self.events.get_mut(uid) else { return false };
        event.summary = summary;
        event.sequence += 1;
        true
    }

    pub fn prodid(&self) -> &str {
        &self.prodid
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

/// Rebuilds a minimal top-level `Component` tree reflecting the calendar's
/// current event set, for the serializer to walk (spec §10).
pub fn to_component(calendar: &Calendar) -> Component {
    use icalrs_ical::property::Parameter;
    use icalrs_ical::value::Value;
    use icalrs_ical::Property;

    let text_property = |name: &str, text: &str| Property {
        name: name.to_string(),
        parameters: Vec::<Parameter>::new(),
        value: Value::Text(text.to_string()),
        line_number: 0,
    };

    let mut root = Component {
        name: "VCALENDAR".to_string(),
        properties: vec![text_property("PRODID", calendar.prodid()), text_property("VERSION", calendar.version())],
        components: Vec::new(),
    };

    for event in calendar.events() {
        root.components.push(crate::serializer::event_to_component(event));
    }

    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal_calendar(body: &str) -> String {
        format!("BEGIN:VCALENDAR\r\nPRODID:-//test//EN\r\nVERSION:2.0\r\n{body}END:VCALENDAR\r\n")
    }

    #[test]
    fn loads_and_enumerates_one_event() {
        let input = minimal_calendar("BEGIN:VEVENT\r\nUID:1\r\nDTSTART:20210105T090000\r\nSUMMARY:Standup\r\nEND:VEVENT\r\n");
        let calendar = Calendar::load(&input, false).unwrap();

        let window_start = NaiveDateTime::parse_from_str("20210101T000000", "%Y%m%dT%H%M%S").unwrap();
        let window_end = NaiveDateTime::parse_from_str("20210201T000000", "%Y%m%dT%H%M%S").unwrap();
        let occurrences = calendar.enumerate(window_start, window_end);

        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].summary.as_deref(), Some("Standup"));
    }

    #[test]
    fn update_event_bumps_sequence() {
        let input = minimal_calendar("BEGIN:VEVENT\r\nUID:1\r\nDTSTART:20210105T090000\r\nEND:VEVENT\r\n");
        let mut calendar = Calendar::load(&input, false).unwrap();

        assert!(calendar.update_event("1", Some("Renamed".to_string())));
        assert_eq!(calendar.event("1").unwrap().sequence, 1);
        assert_eq!(calendar.event("1").unwrap().summary.as_deref(), Some("Renamed"));
    }

    #[test]
    fn validate_strict_reflects_diagnostic_log() {
        let input = minimal_calendar("BEGIN:VEVENT\r\nDTSTART:20210105T090000\r\nEND:VEVENT\r\n");
        let calendar = Calendar::load(&input, false).unwrap();
        assert!(!calendar.validate_strict());
    }

    #[test]
    fn serializes_calendar_to_component_and_back() {
        let input = minimal_calendar("BEGIN:VEVENT\r\nUID:1\r\nDTSTART:20210105T090000\r\nSUMMARY:Standup\r\nEND:VEVENT\r\n");
        let calendar = Calendar::load(&input, false).unwrap();

        let component = to_component(&calendar);
        let rendered = crate::serializer::serialize(&component);

        let reloaded = Calendar::load(&rendered, false).unwrap();
        assert_eq!(reloaded.event("1").unwrap().summary.as_deref(), Some("Standup"));
    }
}
