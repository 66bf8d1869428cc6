//! The service facade.

use std::sync::Arc;
use std::time::Duration;

use bookwell_core::numbering::NumberingScheme;
use bookwell_core::{BooksError, Clock, SystemClock};
use bookwell_shared::{AppConfig, LedgerConfig};

use super::{
    AllocationEngine, DocumentStore, ReconciliationMatcher, SequenceAllocator, TenantRegistry,
};
use crate::store::{LedgerStore, MemoryStore, PgStore};

/// Every service, sharing one store and one clock.
pub struct Books<S> {
    store: Arc<S>,
    tenants: TenantRegistry<S>,
    sequences: SequenceAllocator<S>,
    documents: DocumentStore<S>,
    allocations: AllocationEngine<S>,
    reconciliation: ReconciliationMatcher<S>,
}

impl<S: LedgerStore> Books<S> {
    /// Wires the services over `store`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the numbering configuration is invalid.
    pub fn new(store: Arc<S>, config: &LedgerConfig, clock: Arc<dyn Clock>) -> Result<Self, BooksError> {
        let scheme = NumberingScheme::from_config(&config.numbering)?;
        let retries = config.sequence_retries;
        Ok(Self {
            tenants: TenantRegistry::new(Arc::clone(&store), Arc::clone(&clock)),
            sequences: SequenceAllocator::new(Arc::clone(&store), scheme.clone(), retries),
            documents: DocumentStore::new(Arc::clone(&store), Arc::clone(&clock), scheme.clone(), retries),
            allocations: AllocationEngine::new(Arc::clone(&store), Arc::clone(&clock), scheme, retries),
            reconciliation: ReconciliationMatcher::new(Arc::clone(&store), clock),
            store,
        })
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Tenant registry.
    pub fn tenants(&self) -> &TenantRegistry<S> {
        &self.tenants
    }

    /// Sequence allocator.
    pub fn sequences(&self) -> &SequenceAllocator<S> {
        &self.sequences
    }

    /// Document store.
    pub fn documents(&self) -> &DocumentStore<S> {
        &self.documents
    }

    /// Allocation engine.
    pub fn allocations(&self) -> &AllocationEngine<S> {
        &self.allocations
    }

    /// Reconciliation matcher.
    pub fn reconciliation(&self) -> &ReconciliationMatcher<S> {
        &self.reconciliation
    }
}

impl Books<MemoryStore> {
    /// In-memory books on the system clock.
    pub fn in_memory(config: &LedgerConfig) -> Result<Self, BooksError> {
        Self::in_memory_with_clock(config, Arc::new(SystemClock))
    }

    /// In-memory books on `clock`.
    pub fn in_memory_with_clock(config: &LedgerConfig, clock: Arc<dyn Clock>) -> Result<Self, BooksError> {
        let store = MemoryStore::new(Duration::from_millis(config.lock_timeout_ms));
        Self::new(Arc::new(store), config, clock)
    }
}

impl Books<PgStore> {
    /// PostgreSQL-backed books. Migrations must already have run.
    pub async fn connect(config: &AppConfig) -> Result<Self, BooksError> {
        let lock_timeout = Duration::from_millis(config.ledger.lock_timeout_ms);
        let store = PgStore::connect(&config.database, lock_timeout).await?;
        Self::new(Arc::new(store), &config.ledger, Arc::new(SystemClock))
    }
}
