//! Bookkeeping error types.
//!
//! One taxonomy for every operation the core exposes. Backends map their own
//! failures into `Database`, `ConcurrentModification` or `SequenceContention`
//! so callers only ever match on this enum.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use bookwell_shared::AppError;
use bookwell_shared::types::DocumentId;

use crate::document::DocumentStatus;

/// Errors that can occur during bookkeeping operations.
#[derive(Debug, Error)]
pub enum BooksError {
    // ========== Tenant Errors ==========
    /// No tenant is bound to the current unit of work.
    #[error("No tenant is bound to the current unit of work")]
    NoTenantBound,

    /// Resource is absent or belongs to another tenant.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of resource that was looked up.
        entity: &'static str,
        /// Identifier that was looked up.
        id: Uuid,
    },

    // ========== Lifecycle Errors ==========
    /// The document's status does not allow the requested step.
    #[error("Cannot move document from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: DocumentStatus,
        /// Requested target (a status name, or `deleted`).
        to: &'static str,
    },

    /// A fully paid document cannot be voided.
    #[error("Document {0} is fully paid and cannot be voided")]
    CannotVoidSettled(DocumentId),

    // ========== Allocation Errors ==========
    /// Allocation amount exceeds the document's outstanding amount.
    #[error("Allocation of {requested} exceeds outstanding {outstanding} on document {document_id}")]
    OverAllocation {
        /// Target document.
        document_id: DocumentId,
        /// Amount requested against the document, including earlier batch members.
        requested: Decimal,
        /// Outstanding amount before this batch.
        outstanding: Decimal,
    },

    /// Allocations would exceed the payment's unallocated amount.
    #[error("Allocations of {requested} exceed unallocated payment amount {available}")]
    ExceedsUnallocated {
        /// Running sum of the batch at the failing member.
        requested: Decimal,
        /// Unallocated amount before the batch.
        available: Decimal,
    },

    /// A batch allocation was rejected; nothing was applied.
    #[error("Allocation rejected at position {position}: {source}")]
    AllocationRejected {
        /// Zero-based index of the first failing batch member.
        position: usize,
        /// Why that member failed.
        #[source]
        source: Box<BooksError>,
    },

    // ========== Concurrency Errors ==========
    /// The sequence counter could not be incremented in time.
    #[error("Sequence {series} is contended, please retry")]
    SequenceContention {
        /// Series key of the contended counter.
        series: String,
    },

    /// A lock could not be taken in time or a row changed underneath us.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Integrity Errors ==========
    /// Monetary totals drifted out of sync. Always a bug.
    #[error("Rounding invariant violated: {0}")]
    RoundingInvariantViolation(String),

    /// Input failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    // ========== Storage Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BooksError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// A sum or product left the representable range.
    #[must_use]
    pub fn out_of_range() -> Self {
        Self::Validation("amount out of range".into())
    }

    /// Wraps `self` as the reason a batch member at `position` was rejected.
    #[must_use]
    pub fn rejected_at(self, position: usize) -> Self {
        Self::AllocationRejected {
            position,
            source: Box::new(self),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoTenantBound => "NO_TENANT_BOUND",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::CannotVoidSettled(_) => "CANNOT_VOID_SETTLED",
            Self::OverAllocation { .. } => "OVER_ALLOCATION",
            Self::ExceedsUnallocated { .. } => "EXCEEDS_UNALLOCATED",
            Self::AllocationRejected { .. } => "ALLOCATION_REJECTED",
            Self::SequenceContention { .. } => "SEQUENCE_CONTENTION",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::RoundingInvariantViolation(_) => "ROUNDING_INVARIANT_VIOLATION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::Validation(_) => 400,

            // 404 Not Found
            Self::NotFound { .. } => 404,

            // 409 Conflict - concurrency errors
            Self::SequenceContention { .. } | Self::ConcurrentModification => 409,

            // 422 Unprocessable - business rules
            Self::InvalidTransition { .. }
            | Self::CannotVoidSettled(_)
            | Self::OverAllocation { .. }
            | Self::ExceedsUnallocated { .. } => 422,

            Self::AllocationRejected { source, .. } => source.http_status_code(),

            // 500 Internal Server Error
            Self::NoTenantBound
            | Self::RoundingInvariantViolation(_)
            | Self::Database(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SequenceContention { .. } | Self::ConcurrentModification => true,
            Self::AllocationRejected { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<BooksError> for AppError {
    fn from(err: BooksError) -> Self {
        let message = err.to_string();
        match err.http_status_code() {
            400 => Self::Validation(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            422 => Self::BusinessRule(message),
            _ => match err {
                BooksError::Database(_) => Self::Database(message),
                _ => Self::Internal(message),
            },
        }
    }
}
