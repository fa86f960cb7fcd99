//! DATE value decoding (spec §3, §4.3): `YYYYMMDD`, 8 characters, no
//! separators.

use chrono::NaiveDate;

use crate::diagnostics::{Diagnostic, DiagnosticBus};

/// A calendar date, kept as its three numeric components rather than a
/// `NaiveDate` directly so an invalid date (Feb 30) can still be carried
/// through parsing and diagnosed at validation/expansion time instead of
/// being rejected at the lexer (spec §4.6.3 invalid-date policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl Date {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// `None` for a nonexistent calendar date (Feb 30, month 13, ...).
    pub fn to_naive_date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    pub fn from_naive_date(date: NaiveDate) -> Self {
        use chrono::Datelike;
        Self { year: date.year(), month: date.month(), day: date.day() }
    }
}

/// Substitutes the RFC-unsupported pre-Gregorian years the way the original
/// implementation does: a convenience for enumeration, not RFC-mandated
/// (spec §9 "implementation-defined").
fn repair_year(year: i32, raw: &str, line_number: u32, bus: &mut DiagnosticBus) -> i32 {
    if year < 1582 {
        bus.push(
            Diagnostic::new("3.3.5_1", line_number, raw)
                .with_annotation(format!("pre-Gregorian year {year} replaced with 1900 for enumeration")),
        );
        1900
    } else if year < 1970 {
        bus.push(
            Diagnostic::new("3.3.5_4", line_number, raw)
                .with_annotation(format!("year {year} predates the Unix epoch")),
        );
        year
    } else {
        year
    }
}

/// Decodes an 8-character `YYYYMMDD` value. A hyphenated value (SCM
/// 3.3.12_1) is diagnosed and the hyphens are stripped before parsing.
pub fn decode_date(raw: &str, line_number: u32, bus: &mut DiagnosticBus) -> Date {
    let mut digits = raw.to_string();

    if digits.contains('-') {
        bus.push(Diagnostic::new("3.3.12_1", line_number, raw));
        digits.retain(|c| c != '-');
    }

    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        bus.push(
            Diagnostic::new("3.3.4_1", line_number, raw)
                .with_annotation("DATE value must be exactly 8 digits (YYYYMMDD)"),
        );
        return Date::new(1970, 1, 1);
    }

    let year: i32 = digits[0..4].parse().unwrap_or(1970);
    let month: u32 = digits[4..6].parse().unwrap_or(1);
    let day: u32 = digits[6..8].parse().unwrap_or(1);

    let year = repair_year(year, raw, line_number, bus);

    Date::new(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_date() {
        let mut bus = DiagnosticBus::new(false);
        let date = decode_date("20210105", 1, &mut bus);
        assert_eq!(date, Date::new(2021, 1, 5));
        assert!(bus.is_compliant());
    }

    #[test]
    fn flags_hyphenated_date() {
        let mut bus = DiagnosticBus::new(false);
        let date = decode_date("2021-01-05", 1, &mut bus);
        assert_eq!(date, Date::new(2021, 1, 5));
        assert!(bus.log().iter().any(|d| d.rfc_tag == "3.3.12_1"));
    }

    #[test]
    fn substitutes_pre_gregorian_year() {
        let mut bus = DiagnosticBus::new(false);
        let date = decode_date("15000101", 1, &mut bus);
        assert_eq!(date, Date::new(1900, 1, 1));
        assert!(bus.log().iter().any(|d| d.rfc_tag == "3.3.5_1"));
    }

    #[test]
    fn invalid_date_keeps_components_for_later_rejection() {
        let mut bus = DiagnosticBus::new(false);
        let date = decode_date("20210230", 1, &mut bus);
        assert_eq!(date, Date::new(2021, 2, 30));
        assert!(date.to_naive_date().is_none());
    }
}
