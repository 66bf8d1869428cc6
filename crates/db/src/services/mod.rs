//! Service layer.
//!
//! Each service wraps a storage port, stamps time from the injected
//! [`Clock`](bookwell_core::Clock), and logs state transitions. The only
//! failure retried here is `SequenceContention`; everything else goes back to
//! the caller unchanged.

mod allocation;
mod books;
mod documents;
mod reconciliation;
mod sequence;
mod tenants;

pub use allocation::{AllocationEngine, RecordedPayment};
pub use books::Books;
pub use documents::DocumentStore;
pub use reconciliation::ReconciliationMatcher;
pub use sequence::SequenceAllocator;
pub use tenants::TenantRegistry;

use tracing::{debug, error, warn};

use bookwell_core::{BooksError, TenantContext};

/// Logs a failed operation at the level its error deserves.
pub(crate) fn report(operation: &'static str, ctx: &TenantContext, err: &BooksError) {
    match err {
        BooksError::RoundingInvariantViolation(detail) => {
            error!(operation, tenant_id = %ctx.tenant_id(), %detail, "money invariant violated");
        }
        BooksError::AllocationRejected { position, source } => {
            warn!(operation, tenant_id = %ctx.tenant_id(), position, reason = %source, "allocation batch rejected");
        }
        err if err.is_retryable() => {
            warn!(operation, tenant_id = %ctx.tenant_id(), error = %err, "operation contended");
        }
        err => {
            debug!(operation, tenant_id = %ctx.tenant_id(), code = err.error_code(), error = %err, "operation failed");
        }
    }
}
