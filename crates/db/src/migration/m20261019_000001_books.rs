//! Books schema: tenants, counters, documents, payments, bank accounts.
//!
//! Every tenant table is protected by a `tenant_isolation` policy on
//! `app.current_tenant_id`, forced for table owners as well.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: TENANTS & COUNTERS
        // ============================================================
        db.execute_unprepared(TENANTS_SQL).await?;
        db.execute_unprepared(SEQUENCE_COUNTERS_SQL).await?;

        // ============================================================
        // PART 2: DOCUMENTS
        // ============================================================
        db.execute_unprepared(DOCUMENTS_SQL).await?;
        db.execute_unprepared(DOCUMENT_LINES_SQL).await?;

        // ============================================================
        // PART 3: BANKING & PAYMENTS
        // ============================================================
        db.execute_unprepared(BANK_ACCOUNTS_SQL).await?;
        db.execute_unprepared(PAYMENTS_SQL).await?;
        db.execute_unprepared(ALLOCATIONS_SQL).await?;
        db.execute_unprepared(BANK_TRANSACTIONS_SQL).await?;
        db.execute_unprepared(RECONCILIATIONS_SQL).await?;

        // ============================================================
        // PART 4: ROW LEVEL SECURITY
        // ============================================================
        db.execute_unprepared(RLS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const TENANTS_SQL: &str = r"
CREATE TABLE tenants (
    id UUID PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const SEQUENCE_COUNTERS_SQL: &str = r"
CREATE TABLE sequence_counters (
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    series TEXT NOT NULL CHECK (series IN (
        'invoice', 'purchase_invoice', 'credit_note', 'delivery_order', 'receipt', 'payment'
    )),
    last_value BIGINT NOT NULL CHECK (last_value >= 0),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (tenant_id, series)
);
";

const DOCUMENTS_SQL: &str = r"
CREATE TABLE documents (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    kind TEXT NOT NULL CHECK (kind IN ('invoice', 'purchase_invoice', 'credit_note', 'delivery_order')),
    counterparty_id UUID NOT NULL,
    number TEXT,
    issue_date DATE NOT NULL,
    due_date DATE NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('draft', 'posted', 'partially_paid', 'paid', 'void')),
    subtotal NUMERIC(19, 2) NOT NULL,
    tax_amount NUMERIC(19, 2) NOT NULL,
    total NUMERIC(19, 2) NOT NULL,
    paid_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    outstanding_amount NUMERIC(19, 2) NOT NULL,
    notes TEXT,
    version BIGINT NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    posted_at TIMESTAMPTZ,
    voided_at TIMESTAMPTZ,
    void_reason TEXT,

    CONSTRAINT chk_documents_due_after_issue CHECK (due_date >= issue_date),
    CONSTRAINT chk_documents_total CHECK (total = subtotal + tax_amount),
    CONSTRAINT chk_documents_paid CHECK (paid_amount >= 0 AND paid_amount <= total),
    CONSTRAINT chk_documents_outstanding CHECK (
        (status = 'void' AND outstanding_amount = 0)
        OR (status <> 'void' AND outstanding_amount = total - paid_amount)
    ),
    CONSTRAINT chk_documents_numbered CHECK ((status = 'draft') = (number IS NULL))
);

CREATE UNIQUE INDEX idx_documents_number ON documents(tenant_id, kind, number)
    WHERE number IS NOT NULL;
CREATE INDEX idx_documents_tenant_issue ON documents(tenant_id, issue_date, created_at);
CREATE INDEX idx_documents_open ON documents(tenant_id, counterparty_id, due_date)
    WHERE status IN ('posted', 'partially_paid');
";

const DOCUMENT_LINES_SQL: &str = r"
CREATE TABLE document_lines (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    position INTEGER NOT NULL CHECK (position > 0),
    description TEXT NOT NULL,
    quantity NUMERIC NOT NULL CHECK (quantity > 0),
    unit_price NUMERIC NOT NULL CHECK (unit_price >= 0),
    tax_rate NUMERIC NOT NULL CHECK (tax_rate >= 0 AND tax_rate <= 100),
    line_total NUMERIC(19, 2) NOT NULL,
    tax_amount NUMERIC(19, 2) NOT NULL,

    UNIQUE (document_id, position)
);
";

const BANK_ACCOUNTS_SQL: &str = r"
CREATE TABLE bank_accounts (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    name TEXT NOT NULL,
    ledger_account_id UUID NOT NULL,
    opening_balance NUMERIC(19, 2) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_bank_accounts_tenant ON bank_accounts(tenant_id);
";

const PAYMENTS_SQL: &str = r"
CREATE TABLE payments (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    kind TEXT NOT NULL CHECK (kind IN ('receipt', 'payment')),
    number TEXT NOT NULL,
    counterparty_id UUID NOT NULL,
    date DATE NOT NULL,
    amount NUMERIC(19, 2) NOT NULL CHECK (amount > 0),
    allocated_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    method TEXT NOT NULL,
    reference TEXT,
    bank_account_id UUID REFERENCES bank_accounts(id),
    version BIGINT NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_payments_allocated CHECK (allocated_amount >= 0 AND allocated_amount <= amount),
    UNIQUE (tenant_id, kind, number)
);

CREATE INDEX idx_payments_counterparty ON payments(tenant_id, counterparty_id);
";

const ALLOCATIONS_SQL: &str = r"
CREATE TABLE allocations (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    payment_id UUID NOT NULL REFERENCES payments(id),
    document_id UUID NOT NULL REFERENCES documents(id),
    position INTEGER NOT NULL,
    amount NUMERIC(19, 2) NOT NULL CHECK (amount > 0),
    allocated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    UNIQUE (payment_id, position)
);

CREATE INDEX idx_allocations_document ON allocations(document_id);
";

const BANK_TRANSACTIONS_SQL: &str = r"
CREATE TABLE bank_transactions (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    bank_account_id UUID NOT NULL REFERENCES bank_accounts(id),
    date DATE NOT NULL,
    amount NUMERIC(19, 2) NOT NULL CHECK (amount <> 0),
    description TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('posted', 'void')),
    payment_id UUID REFERENCES payments(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    voided_at TIMESTAMPTZ
);

CREATE INDEX idx_bank_transactions_account_date ON bank_transactions(bank_account_id, date);
";

const RECONCILIATIONS_SQL: &str = r"
CREATE TABLE reconciliations (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL REFERENCES tenants(id),
    bank_account_id UUID NOT NULL REFERENCES bank_accounts(id),
    as_of DATE NOT NULL,
    statement_balance NUMERIC(19, 2) NOT NULL,
    book_balance NUMERIC(19, 2) NOT NULL,
    difference NUMERIC(19, 2) NOT NULL,
    is_balanced BOOLEAN NOT NULL,
    cleared_balance NUMERIC(19, 2) NOT NULL,
    marked_ids JSONB NOT NULL DEFAULT '[]',
    uncleared_count INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_reconciliations_account ON reconciliations(bank_account_id, created_at DESC);
";

const RLS_SQL: &str = r"
-- ============================================================
-- ROW LEVEL SECURITY
-- ============================================================

ALTER TABLE tenants ENABLE ROW LEVEL SECURITY;
ALTER TABLE tenants FORCE ROW LEVEL SECURITY;
CREATE POLICY tenant_isolation ON tenants
    USING (id = current_setting('app.current_tenant_id', true)::UUID)
    WITH CHECK (id = current_setting('app.current_tenant_id', true)::UUID);

ALTER TABLE sequence_counters ENABLE ROW LEVEL SECURITY;
ALTER TABLE sequence_counters FORCE ROW LEVEL SECURITY;
CREATE POLICY tenant_isolation ON sequence_counters
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID)
    WITH CHECK (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

ALTER TABLE documents ENABLE ROW LEVEL SECURITY;
ALTER TABLE documents FORCE ROW LEVEL SECURITY;
CREATE POLICY tenant_isolation ON documents
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID)
    WITH CHECK (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

ALTER TABLE document_lines ENABLE ROW LEVEL SECURITY;
ALTER TABLE document_lines FORCE ROW LEVEL SECURITY;
CREATE POLICY tenant_isolation ON document_lines
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID)
    WITH CHECK (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

ALTER TABLE bank_accounts ENABLE ROW LEVEL SECURITY;
ALTER TABLE bank_accounts FORCE ROW LEVEL SECURITY;
CREATE POLICY tenant_isolation ON bank_accounts
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID)
    WITH CHECK (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

ALTER TABLE payments ENABLE ROW LEVEL SECURITY;
ALTER TABLE payments FORCE ROW LEVEL SECURITY;
CREATE POLICY tenant_isolation ON payments
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID)
    WITH CHECK (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

ALTER TABLE allocations ENABLE ROW LEVEL SECURITY;
ALTER TABLE allocations FORCE ROW LEVEL SECURITY;
CREATE POLICY tenant_isolation ON allocations
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID)
    WITH CHECK (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

ALTER TABLE bank_transactions ENABLE ROW LEVEL SECURITY;
ALTER TABLE bank_transactions FORCE ROW LEVEL SECURITY;
CREATE POLICY tenant_isolation ON bank_transactions
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID)
    WITH CHECK (tenant_id = current_setting('app.current_tenant_id', true)::UUID);

ALTER TABLE reconciliations ENABLE ROW LEVEL SECURITY;
ALTER TABLE reconciliations FORCE ROW LEVEL SECURITY;
CREATE POLICY tenant_isolation ON reconciliations
    USING (tenant_id = current_setting('app.current_tenant_id', true)::UUID)
    WITH CHECK (tenant_id = current_setting('app.current_tenant_id', true)::UUID);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS reconciliations CASCADE;
DROP TABLE IF EXISTS bank_transactions CASCADE;
DROP TABLE IF EXISTS allocations CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS bank_accounts CASCADE;
DROP TABLE IF EXISTS document_lines CASCADE;
DROP TABLE IF EXISTS documents CASCADE;
DROP TABLE IF EXISTS sequence_counters CASCADE;
DROP TABLE IF EXISTS tenants CASCADE;
";
