//! Core bookkeeping logic for Bookwell.
//!
//! This crate contains pure business logic with no web or database
//! dependencies. Storage backends load entities, hand them to the services
//! here, and persist whatever comes back.
//!
//! # Modules
//!
//! - `tenant` - Tenant identity and the task-scoped tenant binding
//! - `numbering` - Series keys and number formats
//! - `document` - Invoices, purchase invoices, credit notes, delivery orders
//! - `allocation` - Payments, receipts and allocation planning
//! - `reconciliation` - Bank accounts and statement reconciliation
//! - `clock` - Injectable time source

pub mod allocation;
pub mod clock;
pub mod document;
pub mod error;
pub mod numbering;
pub mod reconciliation;
pub mod tenant;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::BooksError;
pub use tenant::{Tenant, TenantContext, TenantOwned};
