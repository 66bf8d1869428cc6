//! Payments, receipts and their allocation against documents.

pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use service::{AllocationPlan, AllocationService};
pub use types::{
    Allocation, AllocationRequest, Payment, PaymentKind, PaymentMethod, RecordPaymentInput,
};
