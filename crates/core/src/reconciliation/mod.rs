//! Bank accounts and statement reconciliation.

pub mod service;
pub mod types;

pub use service::ReconciliationService;
pub use types::{
    BankAccount, BankTransaction, BankTransactionStatus, ReconciliationReport,
    ReconciliationRequest,
};
