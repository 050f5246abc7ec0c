//! Run reports.
//!
//! - [`terminal`] — coloured summary box and a table of generated plugins; respects `--quiet`.
//! - [`json`] — the outcome and the full log as one JSON document.

pub mod json;
pub mod terminal;
