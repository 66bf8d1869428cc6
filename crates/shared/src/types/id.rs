//! Typed IDs for type-safe entity references.
//!
//! A `DocumentId` can never be handed to something that expects a `PaymentId`,
//! and every tenant-scoped lookup takes a `TenantId` alongside the entity ID.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(TenantId, "Unique identifier for a tenant organization.");
typed_id!(
    CounterpartyId,
    "Unique identifier for a customer or supplier."
);
typed_id!(
    DocumentId,
    "Unique identifier for a sales or purchase document."
);
typed_id!(
    LineItemId,
    "Unique identifier for a line item on a document."
);
typed_id!(PaymentId, "Unique identifier for a payment or receipt.");
typed_id!(AllocationId, "Unique identifier for a payment allocation.");
typed_id!(BankAccountId, "Unique identifier for a bank account.");
typed_id!(
    BankTransactionId,
    "Unique identifier for a bank account transaction."
);
typed_id!(
    LedgerAccountId,
    "Unique identifier for a general-ledger account."
);
typed_id!(
    ReconciliationId,
    "Unique identifier for a stored reconciliation run."
);

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
