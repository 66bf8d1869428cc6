use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bookwell_shared::types::TenantId;

use crate::error::BooksError;

tokio::task_local! {
    static CURRENT_TENANT: TenantContext;
}

/// A tenant organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Tenant ID.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// Inactive tenants cannot be bound.
    pub is_active: bool,
    /// When the tenant was registered.
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Creates an active tenant.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the name is blank.
    pub fn new(name: &str, now: DateTime<Utc>) -> Result<Self, BooksError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BooksError::Validation("tenant name is required".into()));
        }
        Ok(Self {
            id: TenantId::new(),
            name: name.to_string(),
            is_active: true,
            created_at: now,
        })
    }
}

/// Which tenant the current unit of work acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantContext {
    tenant_id: TenantId,
}

impl TenantContext {
    /// Creates a context for `tenant_id`.
    ///
    /// Callers are expected to have checked the tenant exists and is active;
    /// the registry's `bind` does that.
    #[must_use]
    pub const fn new(tenant_id: TenantId) -> Self {
        Self { tenant_id }
    }

    /// The bound tenant.
    #[must_use]
    pub const fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Runs `fut` with this context as the task's current tenant.
    ///
    /// Nested bindings shadow the outer one and the outer binding is restored
    /// when `fut` completes, panics, or is dropped.
    pub async fn set_current<F: Future>(self, fut: F) -> F::Output {
        CURRENT_TENANT.scope(self, fut).await
    }

    /// Synchronous variant of [`set_current`](Self::set_current).
    pub fn set_current_sync<R>(self, f: impl FnOnce() -> R) -> R {
        CURRENT_TENANT.sync_scope(self, f)
    }

    /// Returns the tenant bound to the current task.
    ///
    /// # Errors
    ///
    /// Returns `NoTenantBound` outside any binding.
    pub fn current() -> Result<Self, BooksError> {
        CURRENT_TENANT
            .try_with(|ctx| *ctx)
            .map_err(|_| BooksError::NoTenantBound)
    }

    /// Returns true if `owner` is this context's tenant.
    #[must_use]
    pub fn owns(&self, owner: TenantId) -> bool {
        self.tenant_id == owner
    }

    /// Asserts `resource` belongs to this tenant.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on a mismatch, so callers cannot test for other
    /// tenants' identifiers.
    pub fn require<T: TenantOwned>(&self, resource: &T) -> Result<(), BooksError> {
        if self.owns(resource.owner()) {
            Ok(())
        } else {
            Err(BooksError::not_found(T::ENTITY, resource.resource_id()))
        }
    }
}

/// A resource that belongs to exactly one tenant.
pub trait TenantOwned {
    /// Name used in `NotFound` errors.
    const ENTITY: &'static str;

    /// The owning tenant.
    fn owner(&self) -> TenantId;

    /// The resource's own identifier.
    fn resource_id(&self) -> Uuid;
}
