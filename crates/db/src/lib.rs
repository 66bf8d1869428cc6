//! Persistence and services for Bookwell.
//!
//! This crate provides:
//! - `SeaORM` entity definitions and the books migration
//! - Storage ports with an in-memory and a PostgreSQL backend
//! - The service layer front ends call: tenant registry, sequence allocator,
//!   document store, allocation engine, reconciliation matcher

pub mod entities;
pub mod error;
pub mod migration;
pub mod rls;
pub mod services;
pub mod store;

pub use services::{
    AllocationEngine, Books, DocumentStore, ReconciliationMatcher, RecordedPayment,
    SequenceAllocator, TenantRegistry,
};
pub use store::{
    AllocationInstruction, BankRepository, DocumentChange, DocumentRepository, LedgerStore,
    MemoryStore, PaymentRepository, PgStore, SequenceRepository, TenantRepository,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use bookwell_shared::DatabaseConfig;

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(false);
    Database::connect(options).await
}
