//! DURATION value decoding (spec §3, §4.3): `[+|-]P[nW][nD][T[nH][nM][nS]]`.
//! `Y` and `M`-as-months designators are ISO 8601 leftovers RFC 5545
//! explicitly forbids; this decoder accepts them leniently and diagnoses
//! (fatal only in conformance mode).

use crate::diagnostics::{Diagnostic, DiagnosticBus, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Duration {
    pub negative: bool,
    pub weeks: u32,
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl Duration {
    /// Total length in seconds, sign applied.
    pub fn to_seconds(self) -> i64 {
        let magnitude = i64::from(self.weeks) * 7 * 86_400
            + i64::from(self.days) * 86_400
            + i64::from(self.hours) * 3_600
            + i64::from(self.minutes) * 60
            + i64::from(self.seconds);

        if self.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    pub fn to_chrono_duration(self) -> chrono::Duration {
        chrono::Duration::seconds(self.to_seconds())
    }

    pub fn is_positive(self) -> bool {
        !self.negative && self.to_seconds() > 0
    }
}

/// Decodes a DURATION value. `conformance` escalates the Y/M-designator
/// diagnostic to fatal, matching "in strict mode this is fatal" (spec
/// §4.3).
pub fn decode_duration(raw: &str, line_number: u32, bus: &mut DiagnosticBus, conformance: bool) -> Duration {
    let mut rest = raw;
    let mut duration = Duration::default();

    if let Some(stripped) = rest.strip_prefix('-') {
        duration.negative = true;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }

    let Some(stripped) = rest.strip_prefix('P') else {
        bus.push(Diagnostic::new("3.3.6_1", line_number, raw).with_annotation(
            "DURATION value must begin with 'P'",
        ));
        return duration;
    };
    rest = stripped;

    let mut in_time = false;
    let mut saw_forbidden_designator = false;

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('T') {
            in_time = true;
            rest = stripped;
            continue;
        }

        let digit_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());

        if digit_end == 0 {
            break;
        }

        let number: u32 = rest[..digit_end].parse().unwrap_or(0);
        let mut chars = rest[digit_end..].char_indices();

        let Some((_, designator)) = chars.next() else {
            break;
        };

        let designator_len = designator.len_utf8();

        match (designator, in_time) {
            ('W', false) => duration.weeks = number,
            ('D', _) => duration.days = number,
            ('H', true) => duration.hours = number,
            ('M', true) => duration.minutes = number,
            ('S', true) => duration.seconds = number,
            ('Y', _) | ('M', false) => saw_forbidden_designator = true,
            _ => break,
        }

        rest = &rest[digit_end + designator_len..];
    }

    if saw_forbidden_designator {
        let severity = if conformance { Severity::Fatal } else { Severity::Warning };
        bus.push(
            Diagnostic::new("3.3.6_1", line_number, raw)
                .with_annotation("DURATION MUST NOT use 'Y' or 'M' (month) designators")
                .with_severity(severity),
        );
    }

    duration
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_weeks() {
        let mut bus = DiagnosticBus::new(false);
        let duration = decode_duration("P3W", 1, &mut bus, false);
        assert_eq!(duration.weeks, 3);
        assert!(bus.is_compliant());
    }

    #[test]
    fn decodes_days_and_time() {
        let mut bus = DiagnosticBus::new(false);
        let duration = decode_duration("-P2DT3H4M5S", 1, &mut bus, false);
        assert!(duration.negative);
        assert_eq!((duration.days, duration.hours, duration.minutes, duration.seconds), (2, 3, 4, 5));
        assert_eq!(duration.to_seconds(), -(2 * 86_400 + 3 * 3_600 + 4 * 60 + 5));
    }

    #[test]
    fn flags_year_designator() {
        let mut bus = DiagnosticBus::new(false);
        decode_duration("P1Y", 1, &mut bus, false);
        assert!(bus.log().iter().any(|d| d.rfc_tag == "3.3.6_1" && d.severity == Severity::Warning));
    }

    #[test]
    fn year_designator_is_fatal_in_conformance_mode() {
        let mut bus = DiagnosticBus::new(true);
        decode_duration("P1Y", 1, &mut bus, true);
        assert!(bus.has_fatal());
    }
}
