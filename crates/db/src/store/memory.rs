//! In-memory backend.
//!
//! Mutable entities sit behind their own `tokio::sync::Mutex` inside a
//! `DashMap` keyed by (tenant, id). Shard guards are never held across an
//! await: slots are cloned out first and locked afterwards, with every wait
//! bounded by `lock_timeout`.
//!
//! Lock order: payment, then documents by ascending id, then counter.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{Mutex, OwnedMutexGuard};

use bookwell_core::allocation::{AllocationPlan, AllocationService, Payment, RecordPaymentInput};
use bookwell_core::document::{Document, DocumentFilter, SettlementSide};
use bookwell_core::numbering::{NumberFormat, Series};
use bookwell_core::reconciliation::{BankAccount, BankTransaction, ReconciliationReport};
use bookwell_core::{BooksError, Tenant, TenantContext};
use bookwell_shared::LedgerConfig;
use bookwell_shared::types::{
    BankAccountId, BankTransactionId, CounterpartyId, DocumentId, PageRequest, PageResponse,
    PaymentId, ReconciliationId, TenantId,
};

use super::{
    AllocationInstruction, BankRepository, DocumentChange, DocumentRepository, PaymentRepository,
    SequenceRepository, TenantRepository, bank_order, listing_order,
};

type Slot<T> = Arc<Mutex<T>>;

/// Process-local store for tests, demos and single-node use.
#[derive(Debug)]
pub struct MemoryStore {
    tenants: DashMap<TenantId, Tenant>,
    counters: DashMap<(TenantId, Series), Slot<u64>>,
    documents: DashMap<(TenantId, DocumentId), Slot<Document>>,
    payments: DashMap<(TenantId, PaymentId), Slot<Payment>>,
    bank_accounts: DashMap<(TenantId, BankAccountId), BankAccount>,
    bank_transactions: DashMap<(TenantId, BankTransactionId), BankTransaction>,
    reconciliations: DashMap<(TenantId, ReconciliationId), ReconciliationReport>,
    lock_timeout: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_millis(LedgerConfig::default().lock_timeout_ms))
    }
}

impl MemoryStore {
    /// Creates an empty store whose lock waits give up after `lock_timeout`.
    #[must_use]
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            tenants: DashMap::new(),
            counters: DashMap::new(),
            documents: DashMap::new(),
            payments: DashMap::new(),
            bank_accounts: DashMap::new(),
            bank_transactions: DashMap::new(),
            reconciliations: DashMap::new(),
            lock_timeout,
        }
    }

    async fn acquire<T: Send + 'static>(
        &self,
        slot: Slot<T>,
        contended: impl FnOnce() -> BooksError,
    ) -> Result<OwnedMutexGuard<T>, BooksError> {
        tokio::time::timeout(self.lock_timeout, slot.lock_owned())
            .await
            .map_err(|_| contended())
    }

    async fn lock_counter(
        &self,
        ctx: &TenantContext,
        series: Series,
    ) -> Result<OwnedMutexGuard<u64>, BooksError> {
        let slot = Arc::clone(&self.counters.entry((ctx.tenant_id(), series)).or_default());
        self.acquire(slot, || BooksError::SequenceContention {
            series: series.as_str().to_string(),
        })
        .await
    }

    /// Writes need a registered tenant that has not been deactivated.
    fn active_tenant(&self, ctx: &TenantContext) -> Result<(), BooksError> {
        match self.tenants.get(&ctx.tenant_id()) {
            Some(tenant) if tenant.is_active => Ok(()),
            _ => Err(BooksError::not_found("tenant", ctx.tenant_id())),
        }
    }

    fn is_live(&self, key: &(TenantId, DocumentId), slot: &Slot<Document>) -> bool {
        self.documents
            .get(key)
            .is_some_and(|entry| Arc::ptr_eq(entry.value(), slot))
    }

    async fn lock_document(
        &self,
        ctx: &TenantContext,
        id: DocumentId,
    ) -> Result<OwnedMutexGuard<Document>, BooksError> {
        let key = (ctx.tenant_id(), id);
        let slot = self
            .documents
            .get(&key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BooksError::not_found("document", id))?;
        let guard = self
            .acquire(Arc::clone(&slot), || BooksError::ConcurrentModification)
            .await?;
        // deleted while we were waiting
        if !self.is_live(&key, &slot) {
            return Err(BooksError::not_found("document", id));
        }
        Ok(guard)
    }

    async fn tenant_documents(&self, ctx: &TenantContext) -> Result<Vec<Document>, BooksError> {
        let slots: Vec<_> = self
            .documents
            .iter()
            .filter(|entry| entry.key().0 == ctx.tenant_id())
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let mut documents = Vec::with_capacity(slots.len());
        for (key, slot) in slots {
            let guard = self
                .acquire(Arc::clone(&slot), || BooksError::ConcurrentModification)
                .await?;
            if self.is_live(&key, &slot) {
                documents.push(Document::clone(&guard));
            }
        }
        Ok(documents)
    }

    fn bank_account(&self, ctx: &TenantContext, id: BankAccountId) -> Result<BankAccount, BooksError> {
        self.bank_accounts
            .get(&(ctx.tenant_id(), id))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BooksError::not_found("bank account", id))
    }
}

#[async_trait]
impl TenantRepository for MemoryStore {
    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), BooksError> {
        match self.tenants.entry(tenant.id) {
            Entry::Occupied(_) => Err(BooksError::Internal(format!(
                "tenant {} is already registered",
                tenant.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(tenant.clone());
                Ok(())
            }
        }
    }

    async fn find_tenant(&self, id: TenantId) -> Result<Option<Tenant>, BooksError> {
        Ok(self.tenants.get(&id).map(|entry| entry.value().clone()))
    }

    async fn set_tenant_active(&self, id: TenantId, active: bool) -> Result<Tenant, BooksError> {
        let mut entry = self
            .tenants
            .get_mut(&id)
            .ok_or_else(|| BooksError::not_found("tenant", id))?;
        entry.is_active = active;
        Ok(entry.clone())
    }
}

#[async_trait]
impl SequenceRepository for MemoryStore {
    async fn next_value(&self, ctx: &TenantContext, series: Series) -> Result<u64, BooksError> {
        self.active_tenant(ctx)?;
        let mut counter = self.lock_counter(ctx, series).await?;
        *counter += 1;
        Ok(*counter)
    }

    async fn current_value(&self, ctx: &TenantContext, series: Series) -> Result<u64, BooksError> {
        let Some(slot) = self
            .counters
            .get(&(ctx.tenant_id(), series))
            .map(|entry| Arc::clone(entry.value()))
        else {
            return Ok(0);
        };
        let counter = self
            .acquire(slot, || BooksError::SequenceContention {
                series: series.as_str().to_string(),
            })
            .await?;
        Ok(*counter)
    }
}

#[async_trait]
impl DocumentRepository for MemoryStore {
    async fn insert_document(&self, ctx: &TenantContext, document: &Document) -> Result<(), BooksError> {
        ctx.require(document)?;
        self.active_tenant(ctx)?;
        document.check_invariants()?;
        match self.documents.entry((ctx.tenant_id(), document.id)) {
            Entry::Occupied(_) => Err(BooksError::Internal(format!(
                "document {} already exists",
                document.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(document.clone())));
                Ok(())
            }
        }
    }

    async fn find_document(&self, ctx: &TenantContext, id: DocumentId) -> Result<Document, BooksError> {
        let guard = self.lock_document(ctx, id).await?;
        Ok(Document::clone(&guard))
    }

    async fn list_documents(
        &self,
        ctx: &TenantContext,
        filter: &DocumentFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Document>, BooksError> {
        let mut matching: Vec<Document> = self
            .tenant_documents(ctx)
            .await?
            .into_iter()
            .filter(|doc| filter.matches(doc))
            .collect();
        matching.sort_by(listing_order);

        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.limit()).unwrap_or(usize::MAX))
            .collect();
        Ok(PageResponse::new(data, page, total))
    }

    async fn open_documents(
        &self,
        ctx: &TenantContext,
        counterparty: CounterpartyId,
        side: SettlementSide,
    ) -> Result<Vec<Document>, BooksError> {
        let mut open: Vec<Document> = self
            .tenant_documents(ctx)
            .await?
            .into_iter()
            .filter(|doc| {
                doc.status.is_open()
                    && doc.counterparty_id == counterparty
                    && doc.kind.settlement_side() == Some(side)
            })
            .collect();
        AllocationService::order_candidates(&mut open);
        Ok(open)
    }

    async fn update_document(
        &self,
        ctx: &TenantContext,
        id: DocumentId,
        change: DocumentChange,
        now: DateTime<Utc>,
    ) -> Result<Document, BooksError> {
        self.active_tenant(ctx)?;
        let mut doc = self.lock_document(ctx, id).await?;
        match change {
            DocumentChange::ReplaceLines(lines) => doc.replace_lines(&lines, now)?,
            DocumentChange::Void { reason } => doc.void(&reason, now)?,
        }
        Ok(Document::clone(&doc))
    }

    async fn delete_document(&self, ctx: &TenantContext, id: DocumentId) -> Result<(), BooksError> {
        self.active_tenant(ctx)?;
        let doc = self.lock_document(ctx, id).await?;
        doc.ensure_deletable()?;
        self.documents.remove(&(ctx.tenant_id(), id));
        Ok(())
    }

    async fn post_document(
        &self,
        ctx: &TenantContext,
        id: DocumentId,
        format: &NumberFormat,
        now: DateTime<Utc>,
    ) -> Result<Document, BooksError> {
        self.active_tenant(ctx)?;
        let mut doc = self.lock_document(ctx, id).await?;
        doc.ensure_can_post()?;
        let mut counter = self.lock_counter(ctx, doc.kind.series()).await?;

        let next = *counter + 1;
        let mut posted = Document::clone(&doc);
        posted.post(format.render(next), now)?;

        *counter = next;
        *doc = posted;
        Ok(Document::clone(&doc))
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn create_payment(
        &self,
        ctx: &TenantContext,
        input: RecordPaymentInput,
        format: &NumberFormat,
        now: DateTime<Utc>,
    ) -> Result<(Payment, Option<BankTransaction>), BooksError> {
        self.active_tenant(ctx)?;
        input.validate()?;
        let account = input
            .bank_account_id
            .map(|id| self.bank_account(ctx, id))
            .transpose()?;

        let mut counter = self.lock_counter(ctx, input.kind.series()).await?;
        let next = *counter + 1;
        let payment = Payment::new(ctx, input, format.render(next), now)?;
        let line = account
            .as_ref()
            .map(|account| BankTransaction::for_payment(&payment, account, now))
            .transpose()?;

        *counter = next;
        let tenant = ctx.tenant_id();
        self.payments
            .insert((tenant, payment.id), Arc::new(Mutex::new(payment.clone())));
        if let Some(line) = &line {
            self.bank_transactions.insert((tenant, line.id), line.clone());
        }
        Ok((payment, line))
    }

    async fn find_payment(&self, ctx: &TenantContext, id: PaymentId) -> Result<Payment, BooksError> {
        let slot = self
            .payments
            .get(&(ctx.tenant_id(), id))
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BooksError::not_found("payment", id))?;
        let guard = self
            .acquire(slot, || BooksError::ConcurrentModification)
            .await?;
        Ok(Payment::clone(&guard))
    }

    async fn allocate(
        &self,
        ctx: &TenantContext,
        payment_id: PaymentId,
        instruction: AllocationInstruction,
        now: DateTime<Utc>,
    ) -> Result<AllocationPlan, BooksError> {
        self.active_tenant(ctx)?;
        let slot = self
            .payments
            .get(&(ctx.tenant_id(), payment_id))
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| BooksError::not_found("payment", payment_id))?;
        let mut payment = self
            .acquire(slot, || BooksError::ConcurrentModification)
            .await?;

        let wanted: Vec<DocumentId> = match &instruction {
            AllocationInstruction::Explicit(requests) => {
                requests.iter().map(|r| r.document_id).collect()
            }
            AllocationInstruction::Auto(ids) => ids.clone(),
            AllocationInstruction::AutoOpen => self
                .open_documents(ctx, payment.counterparty_id, payment.kind.settles())
                .await?
                .into_iter()
                .map(|doc| doc.id)
                .collect(),
        };
        let mut lock_order = wanted.clone();
        lock_order.sort_unstable();
        lock_order.dedup();

        let explicit = matches!(instruction, AllocationInstruction::Explicit(_));
        let reorder = matches!(instruction, AllocationInstruction::AutoOpen);
        let mut guards: BTreeMap<DocumentId, OwnedMutexGuard<Document>> = BTreeMap::new();
        for id in lock_order {
            match self.lock_document(ctx, id).await {
                Ok(guard) => {
                    guards.insert(id, guard);
                }
                // the planner reports it against the request's position
                Err(BooksError::NotFound { .. }) if explicit => {}
                Err(err) => return Err(err),
            }
        }

        let plan = match instruction {
            AllocationInstruction::Explicit(requests) => {
                let loaded: Vec<Document> =
                    guards.values().map(|guard| Document::clone(guard)).collect();
                AllocationService::plan(&payment, &requests, &loaded, now)?
            }
            AllocationInstruction::Auto(_) | AllocationInstruction::AutoOpen => {
                let mut candidates: Vec<Document> = wanted
                    .iter()
                    .filter_map(|id| guards.get(id))
                    .map(|guard| Document::clone(guard))
                    .collect();
                // open documents were listed before locking; a concurrent
                // write may have moved one
                if reorder {
                    AllocationService::order_candidates(&mut candidates);
                }
                AllocationService::plan_auto(&payment, &candidates, now)?
            }
        };

        for doc in &plan.documents {
            if let Some(guard) = guards.get_mut(&doc.id) {
                **guard = doc.clone();
            }
        }
        *payment = plan.payment.clone();
        Ok(plan)
    }
}

#[async_trait]
impl BankRepository for MemoryStore {
    async fn insert_bank_account(&self, ctx: &TenantContext, account: &BankAccount) -> Result<(), BooksError> {
        ctx.require(account)?;
        self.active_tenant(ctx)?;
        self.bank_accounts
            .insert((ctx.tenant_id(), account.id), account.clone());
        Ok(())
    }

    async fn find_bank_account(&self, ctx: &TenantContext, id: BankAccountId) -> Result<BankAccount, BooksError> {
        self.bank_account(ctx, id)
    }

    async fn insert_bank_transaction(
        &self,
        ctx: &TenantContext,
        transaction: &BankTransaction,
    ) -> Result<(), BooksError> {
        ctx.require(transaction)?;
        self.active_tenant(ctx)?;
        self.bank_account(ctx, transaction.bank_account_id)?;
        self.bank_transactions
            .insert((ctx.tenant_id(), transaction.id), transaction.clone());
        Ok(())
    }

    async fn void_bank_transaction(
        &self,
        ctx: &TenantContext,
        id: BankTransactionId,
        now: DateTime<Utc>,
    ) -> Result<BankTransaction, BooksError> {
        self.active_tenant(ctx)?;
        let mut entry = self
            .bank_transactions
            .get_mut(&(ctx.tenant_id(), id))
            .ok_or_else(|| BooksError::not_found("bank transaction", id))?;
        entry.void(now)?;
        Ok(entry.clone())
    }

    async fn bank_transactions(
        &self,
        ctx: &TenantContext,
        account: BankAccountId,
    ) -> Result<Vec<BankTransaction>, BooksError> {
        self.bank_account(ctx, account)?;
        let mut lines: Vec<BankTransaction> = self
            .bank_transactions
            .iter()
            .filter(|entry| entry.key().0 == ctx.tenant_id() && entry.bank_account_id == account)
            .map(|entry| entry.value().clone())
            .collect();
        lines.sort_by(bank_order);
        Ok(lines)
    }

    async fn insert_reconciliation(
        &self,
        ctx: &TenantContext,
        report: &ReconciliationReport,
    ) -> Result<(), BooksError> {
        if !ctx.owns(report.tenant_id) {
            return Err(BooksError::not_found("bank account", report.bank_account_id));
        }
        self.active_tenant(ctx)?;
        self.bank_account(ctx, report.bank_account_id)?;
        self.reconciliations
            .insert((ctx.tenant_id(), report.id), report.clone());
        Ok(())
    }

    async fn reconciliations(
        &self,
        ctx: &TenantContext,
        account: BankAccountId,
    ) -> Result<Vec<ReconciliationReport>, BooksError> {
        self.bank_account(ctx, account)?;
        let mut runs: Vec<ReconciliationReport> = self
            .reconciliations
            .iter()
            .filter(|entry| entry.key().0 == ctx.tenant_id() && entry.bank_account_id == account)
            .map(|entry| entry.value().clone())
            .collect();
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use bookwell_core::document::{DocumentKind, DraftInput, LineItemInput};

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(Duration::from_millis(50)))
    }

    async fn tenant(store: &MemoryStore, name: &str) -> TenantContext {
        let tenant = Tenant::new(name, Utc::now()).unwrap();
        store.insert_tenant(&tenant).await.unwrap();
        TenantContext::new(tenant.id)
    }

    fn draft(ctx: &TenantContext) -> Document {
        let input = DraftInput {
            kind: DocumentKind::Invoice,
            counterparty_id: CounterpartyId::new(),
            issue_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            lines: vec![LineItemInput::new("Item", Decimal::ONE, dec!(10.00), Decimal::ZERO)],
            notes: None,
        };
        Document::new_draft(ctx, input, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_busy_counter_reports_contention() {
        let store = store();
        let ctx = tenant(&store, "Acme").await;
        assert_eq!(store.next_value(&ctx, Series::Invoice).await.unwrap(), 1);

        let held = store.lock_counter(&ctx, Series::Invoice).await.unwrap();
        let err = store.next_value(&ctx, Series::Invoice).await.unwrap_err();
        assert!(matches!(err, BooksError::SequenceContention { ref series } if series == "invoice"));
        drop(held);

        assert_eq!(store.next_value(&ctx, Series::Invoice).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_post_leaves_counter_alone() {
        let store = store();
        let ctx = tenant(&store, "Acme").await;
        let doc = draft(&ctx);
        store.insert_document(&ctx, &doc).await.unwrap();
        let format = NumberFormat::new("INV", 6).unwrap();

        store.post_document(&ctx, doc.id, &format, Utc::now()).await.unwrap();
        let err = store
            .post_document(&ctx, doc.id, &format, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, BooksError::InvalidTransition { .. }));
        assert_eq!(store.current_value(&ctx, Series::Invoice).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_document_deleted_while_waiting_is_not_found() {
        let store = store();
        let ctx = tenant(&store, "Acme").await;
        let doc = draft(&ctx);
        store.insert_document(&ctx, &doc).await.unwrap();

        let id = doc.id;

        let held = store.lock_document(&ctx, id).await.unwrap();
        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.lock_document(&ctx, id).await.map(|_| ()) })
        };
        tokio::task::yield_now().await;
        store.documents.remove(&(ctx.tenant_id(), id));
        drop(held);

        let err = waiter.await.unwrap().unwrap_err();
        assert!(matches!(err, BooksError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_other_tenant_key_misses() {
        let store = store();
        let owner = tenant(&store, "Acme").await;
        let other = tenant(&store, "Globex").await;
        let doc = draft(&owner);
        store.insert_document(&owner, &doc).await.unwrap();

        let err = store.find_document(&other, doc.id).await.unwrap_err();
        assert!(matches!(err, BooksError::NotFound { .. }));
        let err = store.insert_document(&other, &doc).await.unwrap_err();
        assert!(matches!(err, BooksError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_writes_need_an_active_tenant() {
        let store = store();
        let stranger = TenantContext::new(TenantId::new());
        let err = store.insert_document(&stranger, &draft(&stranger)).await.unwrap_err();
        assert!(matches!(err, BooksError::NotFound { entity: "tenant", .. }));
        let err = store.next_value(&stranger, Series::Invoice).await.unwrap_err();
        assert!(matches!(err, BooksError::NotFound { entity: "tenant", .. }));

        let ctx = tenant(&store, "Acme").await;
        let doc = draft(&ctx);
        store.insert_document(&ctx, &doc).await.unwrap();
        store.set_tenant_active(ctx.tenant_id(), false).await.unwrap();

        let format = NumberFormat::new("INV", 6).unwrap();
        let err = store
            .post_document(&ctx, doc.id, &format, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, BooksError::NotFound { entity: "tenant", .. }));
        assert_eq!(store.current_value(&ctx, Series::Invoice).await.unwrap(), 0);
        // reads still work
        assert_eq!(store.find_document(&ctx, doc.id).await.unwrap().status, doc.status);
    }
}
