//! Content-line lexer, component parser and typed value codecs for RFC 5545
//! iCalendar streams.
//!
//! This crate implements the "hard engineering" lower half described by the
//! system it belongs to: turning a byte stream into a tree of [`Component`]s
//! whose properties carry typed [`Value`]s, while recording every
//! non-conformance it can repair onto a [`DiagnosticBus`] instead of failing
//! outright. Only structurally unparseable input produces a [`ParseError`].

pub mod diagnostics;
pub mod error;
pub mod grammar;
pub mod unfold;
pub mod content_line;
pub mod property_table;
pub mod value;
pub mod values;
pub mod property;
pub mod component;

pub use diagnostics::{Diagnostic, DiagnosticBus, Severity};
pub use error::ParseError;
pub use property::{Parameter, Property};
pub use value::{Value, ValueType};
pub use component::Component;
