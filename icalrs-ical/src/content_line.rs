//! Splits one unfolded logical line into `(name, parameters, raw value)`
//! (spec §4.1).

use crate::diagnostics::{Diagnostic, DiagnosticBus};
use crate::error::ParseError;
use crate::grammar::{find_unquoted, param, split_unquoted};
use crate::property_table::is_known_property;
use crate::unfold::UnfoldedLine;

/// One lexed `name *(";" param) ":" value` content line.
///
/// Parameters keep their declaration order and may carry more than one
/// token (`TZID=America/New_York` vs. `CATEGORIES=A,B`), matching the
/// "ordered mapping from parameter name to one or more textual tokens"
/// data model in spec §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    pub name: String,
    pub parameters: Vec<(String, Vec<String>)>,
    pub raw_value: String,
    pub line_number: u32,
}

impl ContentLine {
    pub fn parameter(&self, name: &str) -> Option<&[String]> {
        self.parameters
            .iter()
            .find(|(parameter_name, _)| parameter_name.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }
}

/// Parses one already-unfolded line. Fails only when there is no unquoted
/// `:` to split on (SCM 3.1_2): without it there is no value to decode.
pub fn parse_content_line(
    line: &UnfoldedLine,
    bus: &mut DiagnosticBus,
) -> Result<ContentLine, ParseError> {
    let Some(colon_offset) = find_unquoted(&line.text, ':') else {
        return Err(ParseError::MissingColon { line: line.line_number });
    };

    let (propnparam, raw_value) = line.text.split_at(colon_offset);
    let raw_value = &raw_value[1..];

    let mut segments = split_unquoted(propnparam, ';').into_iter();

    let name = segments.next().unwrap_or_default().to_ascii_uppercase();

    let mut parameters = Vec::new();

    for segment in segments {
        match param(segment) {
            Ok((_, (parameter_name, values))) => {
                parameters.push((
                    parameter_name.to_ascii_uppercase(),
                    values.into_iter().map(str::to_string).collect(),
                ));
            }
            Err(_) => {
                bus.push(Diagnostic::new(
                    "3.1_2",
                    line.line_number,
                    line.text.clone(),
                ).with_annotation(format!("malformed parameter '{segment}'")));
            }
        }
    }

    if !is_known_property(&name) && !name.starts_with("X-") {
        bus.push(Diagnostic::new(
            "8.3.2_1",
            line.line_number,
            line.text.clone(),
        ).with_annotation(format!("unrecognized property '{name}'")));
    }

    Ok(ContentLine {
        name,
        parameters,
        raw_value: raw_value.to_string(),
        line_number: line.line_number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> UnfoldedLine {
        UnfoldedLine { line_number: 1, text: text.to_string() }
    }

    #[test]
    fn splits_name_params_value() {
        let mut bus = DiagnosticBus::new(false);
        let parsed = parse_content_line(&line("DTSTART;TZID=America/New_York:20210105T090000"), &mut bus).unwrap();

        assert_eq!(parsed.name, "DTSTART");
        assert_eq!(parsed.parameter("TZID"), Some(&["America/New_York".to_string()][..]));
        assert_eq!(parsed.raw_value, "20210105T090000");
    }

    #[test]
    fn missing_colon_is_fatal() {
        let mut bus = DiagnosticBus::new(false);
        assert!(matches!(
            parse_content_line(&line("DTSTART;VALUE=DATE"), &mut bus),
            Err(ParseError::MissingColon { .. })
        ));
    }

    #[test]
    fn diagnoses_unrecognized_property() {
        let mut bus = DiagnosticBus::new(false);
        parse_content_line(&line("FOOBAR:value"), &mut bus).unwrap();

        assert!(bus.log().iter().any(|diagnostic| diagnostic.rfc_tag == "8.3.2_1"));
    }

    #[test]
    fn x_properties_are_silent() {
        let mut bus = DiagnosticBus::new(false);
        parse_content_line(&line("X-CUSTOM:value"), &mut bus).unwrap();

        assert!(bus.is_compliant());
    }

    #[test]
    fn multi_valued_category_param() {
        let mut bus = DiagnosticBus::new(false);
        let parsed = parse_content_line(&line(r#"CATEGORIES;X-TAGS=A,B,C:APPOINTMENT"#), &mut bus).unwrap();

        assert_eq!(parsed.parameter("X-TAGS"), Some(&["A".to_string(), "B".to_string(), "C".to_string()][..]));
    }
}
