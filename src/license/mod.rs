//! License-acceptance gate.
//!
//! - [`gate`] — decides whether packages requiring license acceptance block generation.

pub mod gate;
