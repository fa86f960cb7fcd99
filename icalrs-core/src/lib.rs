//! Calendar facade, event validator and RFC 5545 recurrence expander.
//!
//! Built on top of `icalrs-ical`'s lexer/codec layer: this crate turns a
//! parsed [`icalrs_ical::Component`] tree into validated [`event::Event`]s,
//! expands their recurrence rules into concrete occurrences (`recur`), and
//! renders a calendar back to text (`serializer`). [`calendar::Calendar`]
//! is the one facade a caller needs.

pub mod calendar;
pub mod event;
pub mod recur;
pub mod serializer;

pub use calendar::{Calendar, EnumeratedOccurrence};
pub use event::{DateOrDateTime, Event, RdateEntry};
pub use recur::{expand_event, Occurrence};
