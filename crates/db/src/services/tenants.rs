//! Tenant registry.

use std::sync::Arc;

use tracing::info;

use bookwell_core::{BooksError, Clock, Tenant, TenantContext};
use bookwell_shared::types::TenantId;

use crate::store::TenantRepository;

/// Registers tenants and hands out contexts for active ones.
pub struct TenantRegistry<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: TenantRepository> TenantRegistry<S> {
    /// Creates a registry over `store`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Registers an active tenant.
    pub async fn register(&self, name: &str) -> Result<Tenant, BooksError> {
        let tenant = Tenant::new(name, self.clock.now())?;
        self.store.insert_tenant(&tenant).await?;
        info!(tenant_id = %tenant.id, name = %tenant.name, "tenant registered");
        Ok(tenant)
    }

    /// Returns a context for an active tenant.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown and inactive tenants alike.
    pub async fn bind(&self, id: TenantId) -> Result<TenantContext, BooksError> {
        match self.store.find_tenant(id).await? {
            Some(tenant) if tenant.is_active => Ok(TenantContext::new(tenant.id)),
            _ => Err(BooksError::not_found("tenant", id)),
        }
    }

    /// Stops the tenant from being bound. Its data stays.
    pub async fn deactivate(&self, id: TenantId) -> Result<Tenant, BooksError> {
        let tenant = self.store.set_tenant_active(id, false).await?;
        info!(tenant_id = %id, "tenant deactivated");
        Ok(tenant)
    }

    /// Loads a tenant, active or not.
    pub async fn get(&self, id: TenantId) -> Result<Tenant, BooksError> {
        self.store
            .find_tenant(id)
            .await?
            .ok_or_else(|| BooksError::not_found("tenant", id))
    }
}
