//! Document and payment numbering.
//!
//! Counters live in storage, one per (tenant, [`Series`]). This module only
//! knows how a counter value becomes a display number.

mod format;

pub use format::{MAX_WIDTH, NumberFormat, NumberingScheme, Series};
