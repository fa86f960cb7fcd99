//! Line-ending normalization and logical line unfolding (spec §4.1).
//!
//! A physical line beginning with a single SP or HTAB is a continuation of
//! the previous logical line; RFC 5545 calls this "folding" and requires
//! generators to re-fold at 75 octets. This module only undoes it.

use crate::diagnostics::{Diagnostic, DiagnosticBus};
use crate::error::ParseError;

const WARN_OCTET_LIMIT: usize = 75;
const FATAL_OCTET_LIMIT: usize = 1000;

/// A fully-unfolded content line, tagged with the physical line number of
/// its first (non-continuation) occurrence, for diagnostic attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnfoldedLine {
    pub line_number: u32,
    pub text: String,
}

/// Splits `input` into physical lines, accepting CRLF, LF or CR terminators
/// (CRLF is required by the RFC; anything else is diagnosed once).
fn split_physical_lines<'a>(input: &'a str, bus: &mut DiagnosticBus) -> Vec<&'a str> {
    let mut lines = Vec::new();
    let mut start = 0usize;
    let bytes = input.as_bytes();
    let mut index = 0usize;
    let mut saw_non_crlf = false;

    while index < bytes.len() {
        match bytes[index] {
            b'\r' => {
                lines.push(&input[start..index]);
                if bytes.get(index + 1) == Some(&b'\n') {
                    index += 2;
                } else {
                    saw_non_crlf = true;
                    index += 1;
                }
                start = index;
            }
            b'\n' => {
                lines.push(&input[start..index]);
                saw_non_crlf = true;
                index += 1;
                start = index;
            }
            _ => index += 1,
        }
    }

    if start < bytes.len() {
        lines.push(&input[start..]);
    }

    if saw_non_crlf {
        bus.push(Diagnostic::new("3.1_1", 0, "").with_annotation(
            "content lines must be delimited by CRLF",
        ));
    }

    lines
}

fn is_continuation(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

/// Normalizes and unfolds `input` into logical content lines, recording
/// octet-length and orphan-continuation diagnostics. Fails only when a
/// single physical line exceeds [`FATAL_OCTET_LIMIT`] octets.
pub fn unfold(input: &str, bus: &mut DiagnosticBus) -> Result<Vec<UnfoldedLine>, ParseError> {
    let physical_lines = split_physical_lines(input, bus);
    let mut logical_lines: Vec<UnfoldedLine> = Vec::new();

    for (zero_based_index, physical_line) in physical_lines.iter().enumerate() {
        let line_number = zero_based_index as u32 + 1;

        if physical_line.is_empty() {
            continue;
        }

        let octet_len = physical_line.len();

        if octet_len > FATAL_OCTET_LIMIT {
            return Err(ParseError::LineTooLong { line: line_number });
        }

        if octet_len > WARN_OCTET_LIMIT {
            bus.push(Diagnostic::new("3.1_3", line_number, *physical_line));
        }

        if is_continuation(physical_line) {
            let continuation_text = &physical_line[1..];

            match logical_lines.last_mut() {
                Some(previous) => {
                    previous.text.push_str(continuation_text);
                }
                None => {
                    bus.push(
                        Diagnostic::new("3.1_6", line_number, *physical_line)
                            .with_annotation("continuation line has no preceding content line"),
                    );
                    logical_lines.push(UnfoldedLine {
                        line_number,
                        text: continuation_text.to_string(),
                    });
                }
            }
        } else {
            logical_lines.push(UnfoldedLine {
                line_number,
                text: physical_line.to_string(),
            });
        }
    }

    Ok(logical_lines)
}

/// Idempotence helper exercised by tests: folding+unfolding twice must
/// equal doing it once (spec §8 invariant).
pub fn is_idempotent(input: &str) -> bool {
    let mut bus_once = DiagnosticBus::new(false);
    let mut bus_twice = DiagnosticBus::new(false);

    let Ok(once) = unfold(input, &mut bus_once) else {
        return true;
    };

    let rejoined: String = once
        .iter()
        .map(|line| format!("{}\r\n", line.text))
        .collect();

    let Ok(twice) = unfold(&rejoined, &mut bus_twice) else {
        return false;
    };

    once.iter().map(|line| &line.text).eq(twice.iter().map(|line| &line.text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfolds_continuation_lines() {
        let mut bus = DiagnosticBus::new(false);
        let input = "BEGIN:VEVENT\r\nSUMMARY:Long summary that wra\r\n ps onto a second line\r\nEND:VEVENT\r\n";
        let lines = unfold(input, &mut bus).unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].text, "SUMMARY:Long summary that wraps onto a second line");
        assert!(bus.is_compliant());
    }

    #[test]
    fn flags_non_crlf_terminators() {
        let mut bus = DiagnosticBus::new(false);
        unfold("BEGIN:VEVENT\nEND:VEVENT\n", &mut bus).unwrap();

        assert!(bus.log().iter().any(|diagnostic| diagnostic.rfc_tag == "3.1_1"));
    }

    #[test]
    fn fatal_on_overlong_line() {
        let mut bus = DiagnosticBus::new(false);
        let overlong = format!("SUMMARY:{}\r\n", "x".repeat(2000));

        assert!(matches!(
            unfold(&overlong, &mut bus),
            Err(ParseError::LineTooLong { .. })
        ));
    }

    #[test]
    fn unfold_is_idempotent() {
        let input = "BEGIN:VEVENT\r\nSUMMARY:abc\r\n def\r\nEND:VEVENT\r\n";
        assert!(is_idempotent(input));
    }
}
