//! Persistence ports and their two backends.
//!
//! Each port is tenant-scoped: every call takes the [`TenantContext`] it acts
//! for, and anything owned by another tenant is reported as `NotFound`.
//! Writes also require the tenant to be registered and active; a context
//! held across a deactivation can still read but no longer write.
//! Multi-entity operations (`post_document`, `create_payment`, `allocate`)
//! are single units of work in both backends: they either apply completely
//! or leave storage as it was.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bookwell_core::allocation::{AllocationPlan, AllocationRequest, Payment, RecordPaymentInput};
use bookwell_core::document::{Document, DocumentFilter, LineItemInput, SettlementSide};
use bookwell_core::numbering::{NumberFormat, Series};
use bookwell_core::reconciliation::{BankAccount, BankTransaction, ReconciliationReport};
use bookwell_core::{BooksError, Tenant, TenantContext};
use bookwell_shared::types::{
    BankAccountId, BankTransactionId, CounterpartyId, DocumentId, PageRequest, PageResponse,
    PaymentId, TenantId,
};

/// A single-document edit applied under the document's lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentChange {
    /// Replace every line of a draft.
    ReplaceLines(Vec<LineItemInput>),
    /// Void a posted or partially paid document.
    Void {
        /// Why the document is cancelled.
        reason: String,
    },
}

/// Which documents an allocation batch targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationInstruction {
    /// Explicit (document, amount) pairs, applied all or nothing.
    Explicit(Vec<AllocationRequest>),
    /// Greedy over these documents, in the order given.
    Auto(Vec<DocumentId>),
    /// Greedy over the counterparty's open documents, oldest first.
    AutoOpen,
}

/// Tenant registry storage. Not tenant-scoped: it is where contexts come from.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// Stores a new tenant.
    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), BooksError>;

    /// Looks a tenant up.
    async fn find_tenant(&self, id: TenantId) -> Result<Option<Tenant>, BooksError>;

    /// Flips the active flag and returns the updated tenant.
    async fn set_tenant_active(&self, id: TenantId, active: bool) -> Result<Tenant, BooksError>;
}

/// Per-(tenant, series) counters.
#[async_trait]
pub trait SequenceRepository: Send + Sync {
    /// Atomically increments the counter and returns the new value. The first
    /// call for a series returns 1.
    async fn next_value(&self, ctx: &TenantContext, series: Series) -> Result<u64, BooksError>;

    /// The last issued value, 0 if none.
    async fn current_value(&self, ctx: &TenantContext, series: Series) -> Result<u64, BooksError>;
}

/// Document storage.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Stores a new draft.
    async fn insert_document(&self, ctx: &TenantContext, document: &Document) -> Result<(), BooksError>;

    /// Loads one document.
    async fn find_document(&self, ctx: &TenantContext, id: DocumentId) -> Result<Document, BooksError>;

    /// Lists documents ordered by issue date, then creation.
    async fn list_documents(
        &self,
        ctx: &TenantContext,
        filter: &DocumentFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Document>, BooksError>;

    /// Open documents of `counterparty` settled from `side`, oldest first.
    async fn open_documents(
        &self,
        ctx: &TenantContext,
        counterparty: CounterpartyId,
        side: SettlementSide,
    ) -> Result<Vec<Document>, BooksError>;

    /// Applies `change` under the document's lock.
    async fn update_document(
        &self,
        ctx: &TenantContext,
        id: DocumentId,
        change: DocumentChange,
        now: DateTime<Utc>,
    ) -> Result<Document, BooksError>;

    /// Removes a draft.
    async fn delete_document(&self, ctx: &TenantContext, id: DocumentId) -> Result<(), BooksError>;

    /// Takes the next number of the document's series and posts it, in one
    /// unit. A failure leaves both the counter and the document untouched.
    async fn post_document(
        &self,
        ctx: &TenantContext,
        id: DocumentId,
        format: &NumberFormat,
        now: DateTime<Utc>,
    ) -> Result<Document, BooksError>;
}

/// Payment storage and allocation.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Numbers and stores a payment, plus its bank line when a bank account
    /// is given.
    async fn create_payment(
        &self,
        ctx: &TenantContext,
        input: RecordPaymentInput,
        format: &NumberFormat,
        now: DateTime<Utc>,
    ) -> Result<(Payment, Option<BankTransaction>), BooksError>;

    /// Loads one payment with its allocations.
    async fn find_payment(&self, ctx: &TenantContext, id: PaymentId) -> Result<Payment, BooksError>;

    /// Locks the payment and its target documents, plans the batch, and
    /// writes it back all or nothing.
    async fn allocate(
        &self,
        ctx: &TenantContext,
        payment_id: PaymentId,
        instruction: AllocationInstruction,
        now: DateTime<Utc>,
    ) -> Result<AllocationPlan, BooksError>;
}

/// Bank accounts, their transactions and reconciliation history.
#[async_trait]
pub trait BankRepository: Send + Sync {
    /// Stores a new bank account.
    async fn insert_bank_account(&self, ctx: &TenantContext, account: &BankAccount) -> Result<(), BooksError>;

    /// Loads one bank account.
    async fn find_bank_account(&self, ctx: &TenantContext, id: BankAccountId) -> Result<BankAccount, BooksError>;

    /// Stores a bank line. The account must exist.
    async fn insert_bank_transaction(
        &self,
        ctx: &TenantContext,
        transaction: &BankTransaction,
    ) -> Result<(), BooksError>;

    /// Voids a bank line.
    async fn void_bank_transaction(
        &self,
        ctx: &TenantContext,
        id: BankTransactionId,
        now: DateTime<Utc>,
    ) -> Result<BankTransaction, BooksError>;

    /// Every line of an account, oldest value date first.
    async fn bank_transactions(
        &self,
        ctx: &TenantContext,
        account: BankAccountId,
    ) -> Result<Vec<BankTransaction>, BooksError>;

    /// Stores a reconciliation run.
    async fn insert_reconciliation(
        &self,
        ctx: &TenantContext,
        report: &ReconciliationReport,
    ) -> Result<(), BooksError>;

    /// Past runs for an account, newest first.
    async fn reconciliations(
        &self,
        ctx: &TenantContext,
        account: BankAccountId,
    ) -> Result<Vec<ReconciliationReport>, BooksError>;
}

/// Everything the services need from a backend.
pub trait LedgerStore:
    TenantRepository + SequenceRepository + DocumentRepository + PaymentRepository + BankRepository
{
}

impl<T> LedgerStore for T where
    T: TenantRepository + SequenceRepository + DocumentRepository + PaymentRepository + BankRepository
{
}

/// Sort key used by both backends for document listings.
pub(crate) fn listing_order(a: &Document, b: &Document) -> std::cmp::Ordering {
    a.issue_date
        .cmp(&b.issue_date)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

/// Bank lines in value-date order.
pub(crate) fn bank_order(a: &BankTransaction, b: &BankTransaction) -> std::cmp::Ordering {
    a.date
        .cmp(&b.date)
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}
