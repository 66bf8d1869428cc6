//! `SeaORM` entity definitions.
//!
//! Enumerations are stored as text and parsed back through the core types'
//! `parse` functions in [`convert`].

pub mod allocations;
pub mod bank_accounts;
pub mod bank_transactions;
pub mod convert;
pub mod document_lines;
pub mod documents;
pub mod payments;
pub mod reconciliations;
pub mod sequence_counters;
pub mod tenants;
