//! The `BEGIN`/`END` pushdown automaton (spec §4.2) and the top-level
//! `parse` entry point tying the lexer, content-line splitter and value
//! decoders together.

use crate::content_line::parse_content_line;
use crate::diagnostics::DiagnosticBus;
use crate::error::ParseError;
use crate::property::{decode_property, Property};
use crate::unfold::unfold;

/// One `BEGIN:name ... END:name` component, holding its own properties and
/// any nested sub-components (VALARM inside VEVENT, VEVENT/VTIMEZONE inside
/// VCALENDAR, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub properties: Vec<Property>,
    pub components: Vec<Component>,
}

impl Component {
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|property| property.name.eq_ignore_ascii_case(name))
    }

    pub fn properties_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Property> {
        self.properties.iter().filter(move |property| property.name.eq_ignore_ascii_case(name))
    }

    pub fn components_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Component> {
        self.components.iter().filter(move |component| component.name.eq_ignore_ascii_case(name))
    }
}

struct Frame {
    name: String,
    properties: Vec<Property>,
    components: Vec<Component>,
}

/// Parses a full iCalendar stream into its outermost `Component` (normally
/// `VCALENDAR`), unfolding, lexing and value-decoding every content line
/// along the way. Every repairable non-conformance lands on `bus`; only
/// structural breakage (mismatched `BEGIN`/`END`, no components at all)
/// produces a [`ParseError`].
pub fn parse(input: &str, bus: &mut DiagnosticBus) -> Result<Component, ParseError> {
    let lines = unfold(input, bus)?;
    let mut stack: Vec<Frame> = Vec::new();
    let mut finished: Vec<Component> = Vec::new();

    for line in &lines {
        let content_line = parse_content_line(line, bus)?;

        match content_line.name.as_str() {
            "BEGIN" => {
                let name = content_line.raw_value.to_ascii_uppercase();

                if name == "VEVENT" {
                    let nested_in_non_calendar = stack.last().map(|frame| frame.name != "VCALENDAR").unwrap_or(false);
                    if nested_in_non_calendar {
                        return Err(ParseError::EventNesting { line: content_line.line_number });
                    }
                }

                stack.push(Frame { name, properties: Vec::new(), components: Vec::new() });
            }
            "END" => {
                let expected = content_line.raw_value.to_ascii_uppercase();

                let Some(frame) = stack.pop() else {
                    return Err(ParseError::UnmatchedEnd { line: content_line.line_number, component: expected });
                };

                if frame.name != expected {
                    return Err(ParseError::MismatchedEnd {
                        line: content_line.line_number,
                        expected: frame.name,
                        found: expected,
                    });
                }

                let component = Component { name: frame.name, properties: frame.properties, components: frame.components };

                match stack.last_mut() {
                    Some(parent) => parent.components.push(component),
                    None => finished.push(component),
                }
            }
            _ => {
                let property = decode_property(&content_line, bus);

                match stack.last_mut() {
                    Some(frame) => frame.properties.push(property),
                    None => {
                        return Err(ParseError::Malformed {
                            line: content_line.line_number,
                            message: format!("property '{}' outside of any component", content_line.name),
                        });
                    }
                }
            }
        }
    }

    if let Some(frame) = stack.pop() {
        return Err(ParseError::UnmatchedEnd { line: lines.last().map(|l| l.line_number).unwrap_or(0), component: frame.name });
    }

    match finished.len() {
        0 => Err(ParseError::NoComponents),
        1 => {
            let calendar = finished.into_iter().next().unwrap();
            validate_calendar_shape(&calendar)?;
            Ok(calendar)
        }
        _ => Err(ParseError::Malformed {
            line: lines.last().map(|l| l.line_number).unwrap_or(0),
            message: "multiple top-level components; expected a single VCALENDAR".to_string(),
        }),
    }
}

/// Spec §4.2: a `VCALENDAR` must carry `PRODID` and `VERSION` and contain at
/// least one sub-component. Non-`VCALENDAR` top-level input is left to the
/// caller; this crate does not require the outermost component be named
/// `VCALENDAR`.
fn validate_calendar_shape(calendar: &Component) -> Result<(), ParseError> {
    if calendar.name != "VCALENDAR" {
        return Ok(());
    }

    if calendar.property("PRODID").is_none() {
        return Err(ParseError::MissingRequiredCalendarProperty { property: "PRODID" });
    }

    if calendar.property("VERSION").is_none() {
        return Err(ParseError::MissingRequiredCalendarProperty { property: "VERSION" });
    }

    if calendar.components.is_empty() {
        return Err(ParseError::NoComponents);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal_calendar(body: &str) -> String {
        format!("BEGIN:VCALENDAR\r\nPRODID:-//test//EN\r\nVERSION:2.0\r\n{body}END:VCALENDAR\r\n")
    }

    #[test]
    fn parses_nested_event() {
        let mut bus = DiagnosticBus::new(false);
        let input = minimal_calendar(
            "BEGIN:VEVENT\r\nUID:1\r\nDTSTART:20210105T090000\r\nSUMMARY:Standup\r\nEND:VEVENT\r\n",
        );

        let calendar = parse(&input, &mut bus).unwrap();
        assert_eq!(calendar.name, "VCALENDAR");
        assert_eq!(calendar.components.len(), 1);
        assert_eq!(calendar.components[0].name, "VEVENT");
        assert_eq!(calendar.components[0].property("SUMMARY").unwrap().value.as_text(), Some("Standup"));
    }

    #[test]
    fn mismatched_end_is_fatal() {
        let mut bus = DiagnosticBus::new(false);
        let input = "BEGIN:VEVENT\r\nEND:VTODO\r\n";

        assert!(matches!(parse(input, &mut bus), Err(ParseError::MismatchedEnd { .. })));
    }

    #[test]
    fn missing_required_property_is_fatal() {
        let mut bus = DiagnosticBus::new(false);
        let input = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:1\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";

        assert!(matches!(
            parse(input, &mut bus),
            Err(ParseError::MissingRequiredCalendarProperty { property: "PRODID" })
        ));
    }

    #[test]
    fn empty_calendar_is_fatal() {
        let mut bus = DiagnosticBus::new(false);
        let input = "BEGIN:VCALENDAR\r\nPRODID:-//test//EN\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";

        assert!(matches!(parse(input, &mut bus), Err(ParseError::NoComponents)));
    }

    #[test]
    fn nested_vevent_in_vevent_is_rejected() {
        let mut bus = DiagnosticBus::new(false);
        let input = minimal_calendar(
            "BEGIN:VEVENT\r\nUID:1\r\nBEGIN:VEVENT\r\nUID:2\r\nEND:VEVENT\r\nEND:VEVENT\r\n",
        );

        assert!(matches!(parse(&input, &mut bus), Err(ParseError::EventNesting { .. })));
    }

    #[test]
    fn unrecognized_property_is_diagnosed_once() {
        let mut bus = DiagnosticBus::new(false);
        let input = minimal_calendar("BEGIN:VEVENT\r\nUID:1\r\nDTSTART:20210105T090000\r\nFOOBAR:value\r\nEND:VEVENT\r\n");

        parse(&input, &mut bus).unwrap();
        assert_eq!(bus.log().iter().filter(|d| d.rfc_tag == "8.3.2_1").count(), 1);
    }
}
