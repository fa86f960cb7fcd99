//! The diagnostic bus (spec §4.4).
//!
//! Every non-fatal non-conformance the parser, value codecs or validator
//! discover is recorded here rather than raised as a [`crate::ParseError`].
//! The bus keeps both the flat ordered log and a line-number index so a
//! caller can ask "what's wrong with line 42" without scanning the log.

use std::collections::BTreeMap;

/// How seriously a [`Diagnostic`] should be taken.
///
/// `Warning` and `Fatal` are visible severities; `Silent` is for internal
/// tracing that a caller in non-conformance mode should not see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Silent,
    Warning,
    Fatal,
}

/// A single tagged non-conformance, keyed by the RFC clause it violates.
///
/// `rfc_tag` mirrors the keys of `RFC5545_SCM` in the original
/// implementation (e.g. `"3.3.10_18"`) so a diagnostic can be traced back to
/// the clause that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub rfc_tag: &'static str,
    pub line_number: u32,
    pub verbatim_line: String,
    pub severity: Severity,
    pub annotation: Option<String>,
}

impl Diagnostic {
    pub fn new(rfc_tag: &'static str, line_number: u32, verbatim_line: impl Into<String>) -> Self {
        Self {
            rfc_tag,
            line_number,
            verbatim_line: verbatim_line.into(),
            severity: Severity::Warning,
            annotation: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }
}

/// Accumulates diagnostics for one parse/validate/expand pipeline run.
///
/// Owned exclusively by the [`crate::Component`] tree's caller (the
/// `Calendar` facade in `icalrs-core`) per the "explicit collaborator"
/// design note: the bus is threaded through the parser and validator as a
/// `&mut DiagnosticBus` rather than living as global state.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticBus {
    log: Vec<Diagnostic>,
    by_line: BTreeMap<u32, Vec<usize>>,
    conformance: bool,
}

impl DiagnosticBus {
    pub fn new(conformance: bool) -> Self {
        Self {
            log: Vec::new(),
            by_line: BTreeMap::new(),
            conformance,
        }
    }

    pub fn conformance(&self) -> bool {
        self.conformance
    }

    /// Record a diagnostic. In conformance mode, `tracing::warn!` is also
    /// emitted for `Warning`/`Fatal` severities so the host can surface it
    /// live; the log itself is unaffected by the mode.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.conformance && diagnostic.severity != Severity::Silent {
            tracing::warn!(
                tag = diagnostic.rfc_tag,
                line = diagnostic.line_number,
                "{}",
                diagnostic.annotation.as_deref().unwrap_or(diagnostic.verbatim_line.as_str())
            );
        }

        let index = self.log.len();
        self.by_line.entry(diagnostic.line_number).or_default().push(index);
        self.log.push(diagnostic);
    }

    pub fn log(&self) -> &[Diagnostic] {
        &self.log
    }

    pub fn for_line(&self, line_number: u32) -> impl Iterator<Item = &Diagnostic> {
        self.by_line
            .get(&line_number)
            .into_iter()
            .flat_map(|indices| indices.iter().map(|&index| &self.log[index]))
    }

    /// `validate_strict` per spec §6: true iff nothing (beyond silent
    /// tracing diagnostics) was ever recorded.
    pub fn is_compliant(&self) -> bool {
        self.log.iter().all(|diagnostic| diagnostic.severity == Severity::Silent)
    }

    pub fn has_fatal(&self) -> bool {
        self.log.iter().any(|diagnostic| diagnostic.severity == Severity::Fatal)
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compliant_log_is_empty_only() {
        let mut bus = DiagnosticBus::new(true);
        assert!(bus.is_compliant());

        bus.push(Diagnostic::new("3.1_1", 4, "BEGIN:VEVENT"));
        assert!(!bus.is_compliant());
    }

    #[test]
    fn indexes_diagnostics_by_line() {
        let mut bus = DiagnosticBus::new(false);
        bus.push(Diagnostic::new("3.3.12_1", 10, "DTSTART:2021-01-01"));
        bus.push(Diagnostic::new("8.3.2_1", 12, "X-UNKNOWN:value"));

        assert_eq!(bus.for_line(10).count(), 1);
        assert_eq!(bus.for_line(11).count(), 0);
    }
}
