//! Property and parameter types, plus the dispatcher that routes a
//! [`ContentLine`]'s raw value to the matching decoder in
//! [`crate::values`] (spec §4.3).

use crate::content_line::ContentLine;
use crate::diagnostics::DiagnosticBus;
use crate::property_table::default_value_type;
use crate::value::{Value, ValueType};
use crate::values::date_time::decode_date_or_date_time;
use crate::values::duration::decode_duration;
use crate::values::geo::decode_geo;
use crate::values::integer::decode_integer;
use crate::values::list::decode_list;
use crate::values::period::decode_period;
use crate::values::recur::decode_recur;
use crate::values::text::decode_text;
use crate::values::uri::{decode_cal_address, decode_uri};

/// One `;NAME=value1,value2` content-line parameter, kept as raw tokens
/// (parameters do not carry the TEXT escape grammar, spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub values: Vec<String>,
}

/// A decoded property: name, parameters and a typed [`Value`] (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub value: Value,
    pub line_number: u32,
}

impl Property {
    pub fn parameter(&self, name: &str) -> Option<&[String]> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name.eq_ignore_ascii_case(name))
            .map(|parameter| parameter.values.as_slice())
    }
}

fn explicit_value_override(explicit: &str) -> Option<ValueType> {
    match explicit {
        "TEXT" => Some(ValueType::Text),
        "INTEGER" => Some(ValueType::Integer),
        "DATE" => Some(ValueType::Date),
        "DATE-TIME" => Some(ValueType::DateTime),
        "DURATION" => Some(ValueType::Duration),
        "PERIOD" => Some(ValueType::Period),
        "RECUR" => Some(ValueType::Recur),
        "CAL-ADDRESS" => Some(ValueType::CalAddress),
        "URI" => Some(ValueType::Uri),
        "FLOAT" => Some(ValueType::Geo),
        _ => None,
    }
}

/// Resolves the property's shape: the element type each comma-separated
/// entry decodes as, and whether the raw value is itself a list (RDATE,
/// EXDATE, FREEBUSY). An explicit `VALUE=` parameter overrides the static
/// table's element type but never its listness (spec §4.3, §4.3a).
fn resolve_shape(content_line: &ContentLine) -> (ValueType, bool) {
    let (default_element, is_list) = match default_value_type(&content_line.name) {
        Some(ValueType::DateList) => (ValueType::Date, true),
        Some(ValueType::DateTimeList) => (ValueType::DateTime, true),
        Some(ValueType::PeriodList) => (ValueType::Period, true),
        Some(other) => (other, false),
        None => (ValueType::Text, false),
    };

    let explicit = content_line
        .parameter("VALUE")
        .and_then(|values| values.first())
        .and_then(|value| explicit_value_override(value));

    (explicit.unwrap_or(default_element), is_list)
}

/// Decodes one non-list element for `element_type`. `explicit_date` forces
/// `VALUE=DATE` semantics for DATE/DATE-TIME disambiguation.
fn decode_element(element_type: ValueType, raw: &str, tzid: Option<&str>, line_number: u32, bus: &mut DiagnosticBus) -> Value {
    match element_type {
        ValueType::Text => Value::Text(decode_text(raw)),
        ValueType::Integer => Value::Integer(decode_integer(raw, line_number, bus)),
        ValueType::Date => decode_date_or_date_time(raw, tzid, true, line_number, bus),
        ValueType::DateTime => decode_date_or_date_time(raw, tzid, false, line_number, bus),
        ValueType::Duration => Value::Duration(decode_duration(raw, line_number, bus, bus.conformance())),
        ValueType::Period => Value::Period(decode_period(raw, tzid, line_number, bus)),
        ValueType::Recur => Value::Recur(Box::new(decode_recur(raw, line_number, bus))),
        ValueType::CalAddress => Value::CalAddress(decode_cal_address(raw)),
        ValueType::Uri => Value::Uri(decode_uri(raw)),
        ValueType::Geo => {
            let (lat, long) = decode_geo(raw, line_number, bus);
            Value::Geo(lat, long)
        }
        ValueType::DateList | ValueType::DateTimeList | ValueType::PeriodList => {
            unreachable!("resolve_shape never returns a list variant as the element type")
        }
    }
}

/// Decodes a [`ContentLine`] into a [`Property`], routing its raw value
/// through the decoder matching its resolved [`ValueType`]. Unknown
/// properties (not `X-` prefixed, not in the static table) are decoded as
/// opaque TEXT: spec §4.4's lenient-by-default stance applies here too.
/// `parse_content_line` already diagnosed the unrecognized name itself
/// (`8.3.2_1`); this function doesn't repeat it.
pub fn decode_property(content_line: &ContentLine, bus: &mut DiagnosticBus) -> Property {
    let tzid = content_line.parameter("TZID").and_then(|values| values.first()).map(String::as_str);
    let (element_type, is_list) = resolve_shape(content_line);
    let raw = content_line.raw_value.as_str();
    let line_number = content_line.line_number;

    let value = if is_list {
        decode_list(raw, element_type, tzid, line_number, bus)
    } else {
        decode_element(element_type, raw, tzid, line_number, bus)
    };

    Property {
        name: content_line.name.clone(),
        parameters: content_line
            .parameters
            .iter()
            .map(|(name, values)| Parameter { name: name.clone(), values: values.clone() })
            .collect(),
        value,
        line_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unfold::UnfoldedLine;

    fn property_of(text: &str, bus: &mut DiagnosticBus) -> Property {
        let line = UnfoldedLine { line_number: 1, text: text.to_string() };
        let content_line = crate::content_line::parse_content_line(&line, bus).unwrap();
        decode_property(&content_line, bus)
    }

    #[test]
    fn decodes_dtstart_as_date_time() {
        let mut bus = DiagnosticBus::new(false);
        let property = property_of("DTSTART:20210105T090000", &mut bus);
        assert!(property.value.as_date_time().is_some());
    }

    #[test]
    fn value_date_override_produces_date() {
        let mut bus = DiagnosticBus::new(false);
        let property = property_of("DTSTART;VALUE=DATE:20210105", &mut bus);
        assert!(property.value.as_date().is_some());
    }

    #[test]
    fn rrule_decodes_as_recur() {
        let mut bus = DiagnosticBus::new(false);
        let property = property_of("RRULE:FREQ=DAILY;COUNT=5", &mut bus);
        assert!(property.value.as_recur().is_some());
    }

    #[test]
    fn exdate_decodes_as_list() {
        let mut bus = DiagnosticBus::new(false);
        let property = property_of("EXDATE:20210101,20210102", &mut bus);
        assert_eq!(property.value.as_list().map(<[Value]>::len), Some(2));
    }

    #[test]
    fn unknown_property_falls_back_to_text() {
        let mut bus = DiagnosticBus::new(false);
        let property = property_of("FOOBAR:value", &mut bus);
        assert_eq!(property.value.as_text(), Some("value"));
    }
}
