//! Sales and purchase documents.
//!
//! This module implements:
//! - Document kinds, statuses and settlement sides
//! - Line pricing with per-line half-up rounding
//! - The shared draft → posted → paid / void lifecycle
//! - Listing filters

pub mod calc;
pub mod lifecycle;
pub mod types;

#[cfg(test)]
mod lifecycle_props;

pub use calc::{Totals, compute_totals, price_line, price_lines};
pub use types::{
    Document, DocumentFilter, DocumentKind, DocumentStatus, DraftInput, LineItem, LineItemInput,
    SettlementSide,
};
