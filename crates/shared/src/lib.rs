//! Shared types, errors, and configuration for Bookwell.
//!
//! This crate provides common types used across all other crates:
//! - Money rounding at two decimal places
//! - Typed IDs for type-safe entity references
//! - Pagination types for list queries
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, LedgerConfig, NumberingConfig};
pub use error::{AppError, AppResult};
