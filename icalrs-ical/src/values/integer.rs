//! INTEGER value decoding (spec §3, §4.3): signed 32-bit, range-checked
//! against `i32::MIN..=i32::MAX`.

use crate::diagnostics::{Diagnostic, DiagnosticBus};

/// Parses a signed decimal integer, clamping out-of-range values to the
/// nearest `i32` bound and pushing SCM 3.3.8_1 when that happens.
pub fn decode_integer(raw: &str, line_number: u32, bus: &mut DiagnosticBus) -> i32 {
    match raw.trim().parse::<i64>() {
        Ok(value) if (i32::MIN as i64..=i32::MAX as i64).contains(&value) => value as i32,
        Ok(value) => {
            bus.push(
                Diagnostic::new("3.3.8_1", line_number, raw)
                    .with_annotation(format!("integer {value} out of i32 range")),
            );
            value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
        }
        Err(_) => {
            bus.push(Diagnostic::new("3.3.8_1", line_number, raw).with_annotation(
                "value is not a valid integer",
            ));
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_in_range() {
        let mut bus = DiagnosticBus::new(false);
        assert_eq!(decode_integer("42", 1, &mut bus), 42);
        assert_eq!(decode_integer("-7", 1, &mut bus), -7);
        assert!(bus.is_compliant());
    }

    #[test]
    fn clamps_out_of_range() {
        let mut bus = DiagnosticBus::new(false);
        let value = decode_integer("9999999999", 1, &mut bus);
        assert_eq!(value, i32::MAX);
        assert!(!bus.is_compliant());
    }
}
