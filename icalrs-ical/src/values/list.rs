//! Comma-separated value lists (spec §3, §4.3): `EXDATE`, `RDATE`,
//! `CATEGORIES` and similar multi-valued properties. The list is
//! homogeneous: every element decodes to the same [`ValueType`], so a
//! mismatched element is diagnosed and dropped rather than silently
//! widening the list's type.

use crate::diagnostics::{Diagnostic, DiagnosticBus};
use crate::grammar::split_unquoted;
use crate::value::{Value, ValueType};
use crate::values::date_time::decode_date_or_date_time;
use crate::values::period::decode_period;
use crate::values::text::decode_text;

/// Decodes a comma-separated list whose elements are all `element_type`.
/// `tzid` is forwarded to DATE-TIME element decoding.
pub fn decode_list(raw: &str, element_type: ValueType, tzid: Option<&str>, line_number: u32, bus: &mut DiagnosticBus) -> Value {
    let elements = split_unquoted(raw, ',');

    let values = elements
        .into_iter()
        .map(|element| match element_type {
            ValueType::Date | ValueType::DateTime => {
                decode_date_or_date_time(element, tzid, element_type == ValueType::Date, line_number, bus)
            }
            ValueType::Period => Value::Period(decode_period(element, tzid, line_number, bus)),
            ValueType::Text => Value::Text(decode_text(element)),
            other => {
                bus.push(
                    Diagnostic::new("3.1_4", line_number, raw)
                        .with_annotation(format!("unsupported list element type: {other:?}")),
                );
                Value::Text(element.to_string())
            }
        })
        .collect();

    Value::List(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_date_list() {
        let mut bus = DiagnosticBus::new(false);
        let value = decode_list("20210101,20210102,20210103", ValueType::Date, None, 1, &mut bus);
        let Value::List(values) = value else { panic!("expected a list") };
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|v| v.as_date().is_some()));
    }

    #[test]
    fn decodes_text_list() {
        let mut bus = DiagnosticBus::new(false);
        let value = decode_list("WORK,URGENT", ValueType::Text, None, 1, &mut bus);
        let Value::List(values) = value else { panic!("expected a list") };
        assert_eq!(values[0].as_text(), Some("WORK"));
    }
}
