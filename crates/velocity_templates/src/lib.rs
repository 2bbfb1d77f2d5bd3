//! Template database and scoring engine.
//!
//! Raw device output becomes structured records through named templates -
//! line-oriented state machines with declared capture values. For a given
//! (vendor, command) pair the index builds an ordered filter list from most
//! to least specific, scores every candidate against the output, and either
//! returns the best match above a minimum score or a rejection carrying the
//! best candidate seen. There is deliberately no ad-hoc regex fallback:
//! a low-confidence parse is recorded for template-library improvement,
//! never silently loaded.

pub mod builtin;
pub mod engine;
pub mod index;

pub use engine::{FieldValue, Record, Template, TemplateError};
pub use index::{filter_list, ParseRejection, TemplateIndex, TemplateMatch};
