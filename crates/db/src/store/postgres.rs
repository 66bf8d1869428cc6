//! PostgreSQL backend.
//!
//! Every call is one transaction opened through [`RlsConnection`], so the
//! `tenant_isolation` policies apply on top of the explicit `tenant_id`
//! filters below. Rows that are about to change are read `FOR UPDATE` and
//! written back with a version check; documents are locked in id order.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Statement,
};
use uuid::Uuid;

use bookwell_core::allocation::{AllocationPlan, AllocationService, Payment, RecordPaymentInput};
use bookwell_core::document::{
    Document, DocumentFilter, DocumentKind, DocumentStatus, SettlementSide,
};
use bookwell_core::numbering::{NumberFormat, Series};
use bookwell_core::reconciliation::{BankAccount, BankTransaction, ReconciliationReport};
use bookwell_core::{BooksError, Tenant, TenantContext};
use bookwell_shared::DatabaseConfig;
use bookwell_shared::types::{
    BankAccountId, BankTransactionId, CounterpartyId, DocumentId, PageRequest, PageResponse,
    PaymentId, TenantId,
};

use super::{
    AllocationInstruction, BankRepository, DocumentChange, DocumentRepository, PaymentRepository,
    SequenceRepository, TenantRepository,
};
use crate::entities::{
    allocations, bank_accounts, bank_transactions, convert, document_lines, documents, payments,
    reconciliations, sequence_counters, tenants,
};
use crate::error::{DbResultExt, map_sequence_err};
use crate::rls::RlsConnection;

const NEXT_VALUE_SQL: &str = r"
INSERT INTO sequence_counters (tenant_id, series, last_value, updated_at)
VALUES ($1, $2, 1, NOW())
ON CONFLICT (tenant_id, series)
DO UPDATE SET last_value = sequence_counters.last_value + 1, updated_at = NOW()
RETURNING last_value
";

const OPEN_STATUSES: [DocumentStatus; 2] = [DocumentStatus::Posted, DocumentStatus::PartiallyPaid];

/// SeaORM store over PostgreSQL with row-level security.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: DatabaseConnection,
    lock_timeout: Duration,
}

impl PgStore {
    /// Wraps an open connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection, lock_timeout: Duration) -> Self {
        Self { db, lock_timeout }
    }

    /// Opens a pool from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Database` if the pool cannot be created.
    pub async fn connect(config: &DatabaseConfig, lock_timeout: Duration) -> Result<Self, BooksError> {
        let db = crate::connect(config).await.books()?;
        Ok(Self::new(db, lock_timeout))
    }

    /// The underlying pool.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn begin(&self, tenant_id: TenantId) -> Result<RlsConnection, BooksError> {
        RlsConnection::begin(&self.db, tenant_id, self.lock_timeout)
            .await
            .books()
    }

    /// Begins a tenant transaction for a write. The tenant row is share-locked
    /// so a concurrent deactivation waits for the write to finish.
    async fn begin_write(&self, ctx: &TenantContext) -> Result<RlsConnection, BooksError> {
        let rls = self.begin(ctx.tenant_id()).await?;
        let active = tenants::Entity::find_by_id(ctx.tenant_id().into_inner())
            .lock_shared()
            .one(rls.transaction())
            .await
            .books()?
            .is_some_and(|tenant| tenant.is_active);
        if !active {
            return Err(BooksError::not_found("tenant", ctx.tenant_id()));
        }
        Ok(rls)
    }
}

// ========== Query helpers ==========

fn tenant_documents(ctx: &TenantContext) -> Select<documents::Entity> {
    documents::Entity::find().filter(documents::Column::TenantId.eq(ctx.tenant_id().into_inner()))
}

fn open_documents_query(
    ctx: &TenantContext,
    counterparty: CounterpartyId,
    side: SettlementSide,
) -> Select<documents::Entity> {
    tenant_documents(ctx)
        .filter(documents::Column::CounterpartyId.eq(counterparty.into_inner()))
        .filter(documents::Column::Status.is_in(OPEN_STATUSES.map(|s| s.as_str())))
        .filter(
            documents::Column::Kind.is_in(
                DocumentKind::settled_by(side)
                    .into_iter()
                    .map(|kind| kind.as_str()),
            ),
        )
}

async fn hydrate<C: ConnectionTrait>(
    conn: &C,
    models: Vec<documents::Model>,
) -> Result<Vec<Document>, BooksError> {
    if models.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let rows = document_lines::Entity::find()
        .filter(document_lines::Column::DocumentId.is_in(ids))
        .order_by_asc(document_lines::Column::DocumentId)
        .order_by_asc(document_lines::Column::Position)
        .all(conn)
        .await
        .books()?;

    let mut lines: HashMap<Uuid, Vec<document_lines::Model>> = HashMap::new();
    for row in rows {
        lines.entry(row.document_id).or_default().push(row);
    }
    models
        .into_iter()
        .map(|model| {
            let own = lines.remove(&model.id).unwrap_or_default();
            convert::document_from_models(model, own)
        })
        .collect()
}

async fn load_document<C: ConnectionTrait>(
    conn: &C,
    ctx: &TenantContext,
    id: DocumentId,
    for_update: bool,
) -> Result<Document, BooksError> {
    let mut query = tenant_documents(ctx).filter(documents::Column::Id.eq(id.into_inner()));
    if for_update {
        query = query.lock_exclusive();
    }
    let model = query
        .one(conn)
        .await
        .books()?
        .ok_or_else(|| BooksError::not_found("document", id))?;
    hydrate(conn, vec![model])
        .await?
        .pop()
        .ok_or_else(|| BooksError::Internal(format!("document {id} vanished while loading")))
}

/// Locks the given documents in ascending id order. Unknown ids are skipped.
async fn lock_documents<C: ConnectionTrait>(
    conn: &C,
    ctx: &TenantContext,
    ids: &[DocumentId],
) -> Result<Vec<documents::Model>, BooksError> {
    let mut ids: Vec<Uuid> = ids.iter().map(|id| id.into_inner()).collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    tenant_documents(ctx)
        .filter(documents::Column::Id.is_in(ids))
        .order_by_asc(documents::Column::Id)
        .lock_exclusive()
        .all(conn)
        .await
        .books()
}

async fn insert_lines<C: ConnectionTrait>(conn: &C, doc: &Document) -> Result<(), BooksError> {
    let rows = convert::line_active_models(doc)?;
    if rows.is_empty() {
        return Ok(());
    }
    document_lines::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await
        .books()?;
    Ok(())
}

/// Writes the document header back if nobody changed it since `expected_version`.
async fn save_document<C: ConnectionTrait>(
    conn: &C,
    doc: &Document,
    expected_version: i64,
) -> Result<(), BooksError> {
    let result = documents::Entity::update_many()
        .set(convert::document_active_model(doc))
        .filter(documents::Column::Id.eq(doc.id.into_inner()))
        .filter(documents::Column::TenantId.eq(doc.tenant_id.into_inner()))
        .filter(documents::Column::Version.eq(expected_version))
        .exec(conn)
        .await
        .books()?;
    if result.rows_affected == 0 {
        return Err(BooksError::ConcurrentModification);
    }
    Ok(())
}

async fn bump_counter<C: ConnectionTrait>(
    conn: &C,
    ctx: &TenantContext,
    series: Series,
) -> Result<u64, BooksError> {
    let row = conn
        .query_one(Statement::from_sql_and_values(
            DbBackend::Postgres,
            NEXT_VALUE_SQL,
            [ctx.tenant_id().into_inner().into(), series.as_str().into()],
        ))
        .await
        .map_err(|e| map_sequence_err(e, series))?
        .ok_or_else(|| BooksError::Internal(format!("counter {series} returned no row")))?;
    let value: i64 = row.try_get("", "last_value").books()?;
    u64::try_from(value)
        .map_err(|_| BooksError::Database(format!("counter {series} holds negative value {value}")))
}

async fn load_payment<C: ConnectionTrait>(
    conn: &C,
    ctx: &TenantContext,
    id: PaymentId,
    for_update: bool,
) -> Result<Payment, BooksError> {
    let mut query = payments::Entity::find()
        .filter(payments::Column::Id.eq(id.into_inner()))
        .filter(payments::Column::TenantId.eq(ctx.tenant_id().into_inner()));
    if for_update {
        query = query.lock_exclusive();
    }
    let model = query
        .one(conn)
        .await
        .books()?
        .ok_or_else(|| BooksError::not_found("payment", id))?;
    let rows = allocations::Entity::find()
        .filter(allocations::Column::PaymentId.eq(model.id))
        .order_by_asc(allocations::Column::Position)
        .all(conn)
        .await
        .books()?;
    convert::payment_from_models(model, rows)
}

async fn load_bank_account<C: ConnectionTrait>(
    conn: &C,
    ctx: &TenantContext,
    id: BankAccountId,
) -> Result<BankAccount, BooksError> {
    bank_accounts::Entity::find()
        .filter(bank_accounts::Column::Id.eq(id.into_inner()))
        .filter(bank_accounts::Column::TenantId.eq(ctx.tenant_id().into_inner()))
        .one(conn)
        .await
        .books()?
        .map(convert::bank_account_from_model)
        .ok_or_else(|| BooksError::not_found("bank account", id))
}

// ========== Ports ==========

#[async_trait]
impl TenantRepository for PgStore {
    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), BooksError> {
        let rls = self.begin(tenant.id).await?;
        tenants::Entity::insert(convert::tenant_active_model(tenant))
            .exec_without_returning(rls.transaction())
            .await
            .books()?;
        rls.commit().await.books()
    }

    async fn find_tenant(&self, id: TenantId) -> Result<Option<Tenant>, BooksError> {
        let rls = self.begin(id).await?;
        let tenant = tenants::Entity::find_by_id(id.into_inner())
            .one(rls.transaction())
            .await
            .books()?
            .map(convert::tenant_from_model);
        rls.commit().await.books()?;
        Ok(tenant)
    }

    async fn set_tenant_active(&self, id: TenantId, active: bool) -> Result<Tenant, BooksError> {
        let rls = self.begin(id).await?;
        let txn = rls.transaction();
        let result = tenants::Entity::update_many()
            .col_expr(tenants::Column::IsActive, Expr::value(active))
            .filter(tenants::Column::Id.eq(id.into_inner()))
            .exec(txn)
            .await
            .books()?;
        if result.rows_affected == 0 {
            return Err(BooksError::not_found("tenant", id));
        }
        let tenant = tenants::Entity::find_by_id(id.into_inner())
            .one(txn)
            .await
            .books()?
            .map(convert::tenant_from_model)
            .ok_or_else(|| BooksError::not_found("tenant", id))?;
        rls.commit().await.books()?;
        Ok(tenant)
    }
}

#[async_trait]
impl SequenceRepository for PgStore {
    async fn next_value(&self, ctx: &TenantContext, series: Series) -> Result<u64, BooksError> {
        let rls = self.begin_write(ctx).await?;
        let value = bump_counter(rls.transaction(), ctx, series).await?;
        rls.commit()
            .await
            .map_err(|e| map_sequence_err(e, series))?;
        Ok(value)
    }

    async fn current_value(&self, ctx: &TenantContext, series: Series) -> Result<u64, BooksError> {
        let rls = self.begin(ctx.tenant_id()).await?;
        let row = sequence_counters::Entity::find_by_id((
            ctx.tenant_id().into_inner(),
            series.as_str().to_string(),
        ))
        .one(rls.transaction())
        .await
        .books()?;
        rls.commit().await.books()?;
        row.map_or(Ok(0), |row| {
            u64::try_from(row.last_value).map_err(|_| {
                BooksError::Database(format!("counter {series} holds negative value {}", row.last_value))
            })
        })
    }
}

#[async_trait]
impl DocumentRepository for PgStore {
    async fn insert_document(&self, ctx: &TenantContext, document: &Document) -> Result<(), BooksError> {
        ctx.require(document)?;
        document.check_invariants()?;
        let rls = self.begin_write(ctx).await?;
        let txn = rls.transaction();
        documents::Entity::insert(convert::document_active_model(document))
            .exec_without_returning(txn)
            .await
            .books()?;
        insert_lines(txn, document).await?;
        rls.commit().await.books()
    }

    async fn find_document(&self, ctx: &TenantContext, id: DocumentId) -> Result<Document, BooksError> {
        let rls = self.begin(ctx.tenant_id()).await?;
        let doc = load_document(rls.transaction(), ctx, id, false).await?;
        rls.commit().await.books()?;
        Ok(doc)
    }

    async fn list_documents(
        &self,
        ctx: &TenantContext,
        filter: &DocumentFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Document>, BooksError> {
        let mut query = tenant_documents(ctx);
        if let Some(kind) = filter.kind {
            query = query.filter(documents::Column::Kind.eq(kind.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(documents::Column::Status.eq(status.as_str()));
        }
        if let Some(counterparty) = filter.counterparty_id {
            query = query.filter(documents::Column::CounterpartyId.eq(counterparty.into_inner()));
        }
        if let Some(from) = filter.issued_from {
            query = query.filter(documents::Column::IssueDate.gte(from));
        }
        if let Some(to) = filter.issued_to {
            query = query.filter(documents::Column::IssueDate.lte(to));
        }
        if filter.open_only {
            query = query.filter(documents::Column::Status.is_in(OPEN_STATUSES.map(|s| s.as_str())));
        }

        let rls = self.begin(ctx.tenant_id()).await?;
        let txn = rls.transaction();
        let total = query.clone().count(txn).await.books()?;
        let models = query
            .order_by_asc(documents::Column::IssueDate)
            .order_by_asc(documents::Column::CreatedAt)
            .order_by_asc(documents::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(txn)
            .await
            .books()?;
        let data = hydrate(txn, models).await?;
        rls.commit().await.books()?;
        Ok(PageResponse::new(data, page, total))
    }

    async fn open_documents(
        &self,
        ctx: &TenantContext,
        counterparty: CounterpartyId,
        side: SettlementSide,
    ) -> Result<Vec<Document>, BooksError> {
        let rls = self.begin(ctx.tenant_id()).await?;
        let txn = rls.transaction();
        let models = open_documents_query(ctx, counterparty, side)
            .all(txn)
            .await
            .books()?;
        let mut open = hydrate(txn, models).await?;
        rls.commit().await.books()?;
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
        let rls = self.begin_write(ctx).await?;
        let txn = rls.transaction();
        let mut doc = load_document(txn, ctx, id, true).await?;
        let expected = doc.version;

        match change {
            DocumentChange::ReplaceLines(lines) => {
                doc.replace_lines(&lines, now)?;
                save_document(txn, &doc, expected).await?;
                document_lines::Entity::delete_many()
                    .filter(document_lines::Column::DocumentId.eq(id.into_inner()))
                    .exec(txn)
                    .await
                    .books()?;
                insert_lines(txn, &doc).await?;
            }
            DocumentChange::Void { reason } => {
                doc.void(&reason, now)?;
                save_document(txn, &doc, expected).await?;
            }
        }
        rls.commit().await.books()?;
        Ok(doc)
    }

    async fn delete_document(&self, ctx: &TenantContext, id: DocumentId) -> Result<(), BooksError> {
        let rls = self.begin_write(ctx).await?;
        let txn = rls.transaction();
        let doc = load_document(txn, ctx, id, true).await?;
        doc.ensure_deletable()?;
        documents::Entity::delete_many()
            .filter(documents::Column::Id.eq(id.into_inner()))
            .filter(documents::Column::TenantId.eq(ctx.tenant_id().into_inner()))
            .exec(txn)
            .await
            .books()?;
        rls.commit().await.books()
    }

    async fn post_document(
        &self,
        ctx: &TenantContext,
        id: DocumentId,
        format: &NumberFormat,
        now: DateTime<Utc>,
    ) -> Result<Document, BooksError> {
        let rls = self.begin_write(ctx).await?;
        let txn = rls.transaction();
        let mut doc = load_document(txn, ctx, id, true).await?;
        doc.ensure_can_post()?;

        let series = doc.kind.series();
        let value = bump_counter(txn, ctx, series).await?;
        let expected = doc.version;
        doc.post(format.render(value), now)?;
        save_document(txn, &doc, expected).await?;

        rls.commit()
            .await
            .map_err(|e| map_sequence_err(e, series))?;
        Ok(doc)
    }
}

#[async_trait]
impl PaymentRepository for PgStore {
    async fn create_payment(
        &self,
        ctx: &TenantContext,
        input: RecordPaymentInput,
        format: &NumberFormat,
        now: DateTime<Utc>,
    ) -> Result<(Payment, Option<BankTransaction>), BooksError> {
        input.validate()?;
        let rls = self.begin_write(ctx).await?;
        let txn = rls.transaction();

        let account = match input.bank_account_id {
            Some(id) => Some(load_bank_account(txn, ctx, id).await?),
            None => None,
        };
        let series = input.kind.series();
        let value = bump_counter(txn, ctx, series).await?;
        let payment = Payment::new(ctx, input, format.render(value), now)?;
        payments::Entity::insert(convert::payment_active_model(&payment))
            .exec_without_returning(txn)
            .await
            .books()?;

        let line = account
            .as_ref()
            .map(|account| BankTransaction::for_payment(&payment, account, now))
            .transpose()?;
        if let Some(line) = &line {
            bank_transactions::Entity::insert(convert::bank_transaction_active_model(line))
                .exec_without_returning(txn)
                .await
                .books()?;
        }

        rls.commit()
            .await
            .map_err(|e| map_sequence_err(e, series))?;
        Ok((payment, line))
    }

    async fn find_payment(&self, ctx: &TenantContext, id: PaymentId) -> Result<Payment, BooksError> {
        let rls = self.begin(ctx.tenant_id()).await?;
        let payment = load_payment(rls.transaction(), ctx, id, false).await?;
        rls.commit().await.books()?;
        Ok(payment)
    }

    async fn allocate(
        &self,
        ctx: &TenantContext,
        payment_id: PaymentId,
        instruction: AllocationInstruction,
        now: DateTime<Utc>,
    ) -> Result<AllocationPlan, BooksError> {
        let rls = self.begin_write(ctx).await?;
        let txn = rls.transaction();
        let payment = load_payment(txn, ctx, payment_id, true).await?;

        let models = match &instruction {
            AllocationInstruction::Explicit(requests) => {
                let ids: Vec<DocumentId> = requests.iter().map(|r| r.document_id).collect();
                lock_documents(txn, ctx, &ids).await?
            }
            AllocationInstruction::Auto(ids) => lock_documents(txn, ctx, ids).await?,
            AllocationInstruction::AutoOpen => {
                open_documents_query(ctx, payment.counterparty_id, payment.kind.settles())
                    .order_by_asc(documents::Column::Id)
                    .lock_exclusive()
                    .all(txn)
                    .await
                    .books()?
            }
        };
        let loaded = hydrate(txn, models).await?;
        let versions: HashMap<DocumentId, i64> =
            loaded.iter().map(|doc| (doc.id, doc.version)).collect();

        let plan = match instruction {
            AllocationInstruction::Explicit(requests) => {
                AllocationService::plan(&payment, &requests, &loaded, now)?
            }
            AllocationInstruction::Auto(ids) => {
                let mut candidates = Vec::with_capacity(ids.len());
                for id in ids {
                    let doc = loaded
                        .iter()
                        .find(|doc| doc.id == id)
                        .ok_or_else(|| BooksError::not_found("document", id))?;
                    candidates.push(doc.clone());
                }
                AllocationService::plan_auto(&payment, &candidates, now)?
            }
            AllocationInstruction::AutoOpen => {
                let mut candidates = loaded;
                AllocationService::order_candidates(&mut candidates);
                AllocationService::plan_auto(&payment, &candidates, now)?
            }
        };

        if !plan.is_empty() {
            for doc in &plan.documents {
                let expected = versions
                    .get(&doc.id)
                    .copied()
                    .ok_or_else(|| BooksError::Internal(format!("document {} was not locked", doc.id)))?;
                save_document(txn, doc, expected).await?;
            }

            let result = payments::Entity::update_many()
                .set(convert::payment_active_model(&plan.payment))
                .filter(payments::Column::Id.eq(payment.id.into_inner()))
                .filter(payments::Column::Version.eq(payment.version))
                .exec(txn)
                .await
                .books()?;
            if result.rows_affected == 0 {
                return Err(BooksError::ConcurrentModification);
            }

            let start = payment.allocations.len();
            let rows = plan
                .allocations
                .iter()
                .enumerate()
                .map(|(i, allocation)| {
                    convert::allocation_active_model(ctx.tenant_id(), allocation, start + i)
                })
                .collect::<Result<Vec<_>, _>>()?;
            allocations::Entity::insert_many(rows)
                .exec_without_returning(txn)
                .await
                .books()?;
        }

        rls.commit().await.books()?;
        Ok(plan)
    }
}

#[async_trait]
impl BankRepository for PgStore {
    async fn insert_bank_account(&self, ctx: &TenantContext, account: &BankAccount) -> Result<(), BooksError> {
        ctx.require(account)?;
        let rls = self.begin_write(ctx).await?;
        bank_accounts::Entity::insert(convert::bank_account_active_model(account))
            .exec_without_returning(rls.transaction())
            .await
            .books()?;
        rls.commit().await.books()
    }

    async fn find_bank_account(&self, ctx: &TenantContext, id: BankAccountId) -> Result<BankAccount, BooksError> {
        let rls = self.begin(ctx.tenant_id()).await?;
        let account = load_bank_account(rls.transaction(), ctx, id).await?;
        rls.commit().await.books()?;
        Ok(account)
    }

    async fn insert_bank_transaction(
        &self,
        ctx: &TenantContext,
        transaction: &BankTransaction,
    ) -> Result<(), BooksError> {
        ctx.require(transaction)?;
        let rls = self.begin_write(ctx).await?;
        let txn = rls.transaction();
        load_bank_account(txn, ctx, transaction.bank_account_id).await?;
        bank_transactions::Entity::insert(convert::bank_transaction_active_model(transaction))
            .exec_without_returning(txn)
            .await
            .books()?;
        rls.commit().await.books()
    }

    async fn void_bank_transaction(
        &self,
        ctx: &TenantContext,
        id: BankTransactionId,
        now: DateTime<Utc>,
    ) -> Result<BankTransaction, BooksError> {
        let rls = self.begin_write(ctx).await?;
        let txn = rls.transaction();
        let model = bank_transactions::Entity::find()
            .filter(bank_transactions::Column::Id.eq(id.into_inner()))
            .filter(bank_transactions::Column::TenantId.eq(ctx.tenant_id().into_inner()))
            .lock_exclusive()
            .one(txn)
            .await
            .books()?
            .ok_or_else(|| BooksError::not_found("bank transaction", id))?;
        let mut line = convert::bank_transaction_from_model(model)?;
        line.void(now)?;
        bank_transactions::Entity::update_many()
            .set(convert::bank_transaction_active_model(&line))
            .filter(bank_transactions::Column::Id.eq(id.into_inner()))
            .exec(txn)
            .await
            .books()?;
        rls.commit().await.books()?;
        Ok(line)
    }

    async fn bank_transactions(
        &self,
        ctx: &TenantContext,
        account: BankAccountId,
    ) -> Result<Vec<BankTransaction>, BooksError> {
        let rls = self.begin(ctx.tenant_id()).await?;
        let txn = rls.transaction();
        load_bank_account(txn, ctx, account).await?;
        let rows = bank_transactions::Entity::find()
            .filter(bank_transactions::Column::BankAccountId.eq(account.into_inner()))
            .filter(bank_transactions::Column::TenantId.eq(ctx.tenant_id().into_inner()))
            .order_by_asc(bank_transactions::Column::Date)
            .order_by_asc(bank_transactions::Column::CreatedAt)
            .order_by_asc(bank_transactions::Column::Id)
            .all(txn)
            .await
            .books()?;
        rls.commit().await.books()?;
        rows.into_iter()
            .map(convert::bank_transaction_from_model)
            .collect()
    }

    async fn insert_reconciliation(
        &self,
        ctx: &TenantContext,
        report: &ReconciliationReport,
    ) -> Result<(), BooksError> {
        if !ctx.owns(report.tenant_id) {
            return Err(BooksError::not_found("bank account", report.bank_account_id));
        }
        let rls = self.begin_write(ctx).await?;
        let txn = rls.transaction();
        load_bank_account(txn, ctx, report.bank_account_id).await?;
        reconciliations::Entity::insert(convert::reconciliation_active_model(report)?)
            .exec_without_returning(txn)
            .await
            .books()?;
        rls.commit().await.books()
    }

    async fn reconciliations(
        &self,
        ctx: &TenantContext,
        account: BankAccountId,
    ) -> Result<Vec<ReconciliationReport>, BooksError> {
        let rls = self.begin(ctx.tenant_id()).await?;
        let txn = rls.transaction();
        load_bank_account(txn, ctx, account).await?;
        let rows = reconciliations::Entity::find()
            .filter(reconciliations::Column::BankAccountId.eq(account.into_inner()))
            .filter(reconciliations::Column::TenantId.eq(ctx.tenant_id().into_inner()))
            .order_by_desc(reconciliations::Column::CreatedAt)
            .order_by_desc(reconciliations::Column::Id)
            .all(txn)
            .await
            .books()?;
        rls.commit().await.books()?;
        rows.into_iter()
            .map(convert::reconciliation_from_model)
            .collect()
    }
}
