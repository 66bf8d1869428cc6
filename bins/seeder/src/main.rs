//! Demo data seeder for Bookwell development.
//!
//! Registers a demo tenant and walks it through a month of trading: invoices,
//! a supplier bill, receipts allocated against them and a bank
//! reconciliation. Each run creates a fresh tenant, so it can be repeated.
//!
//! Usage: cargo run --bin seeder [-- --memory]
//!
//! Without `--memory` the configured PostgreSQL database is used; run the
//! migrator first.

use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bookwell_core::allocation::{AllocationRequest, PaymentKind, PaymentMethod, RecordPaymentInput};
use bookwell_core::document::{DocumentKind, DraftInput, LineItemInput};
use bookwell_core::reconciliation::ReconciliationRequest;
use bookwell_core::{SystemClock, TenantContext};
use bookwell_db::store::LedgerStore;
use bookwell_db::{Books, MemoryStore};
use bookwell_shared::types::{BankAccountId, CounterpartyId, LedgerAccountId};
use bookwell_shared::{AppConfig, LedgerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bookwell=debug,info")),
        )
        .init();

    if std::env::args().any(|arg| arg == "--memory") {
        let ledger = LedgerConfig::default();
        let books = Books::new(Arc::new(MemoryStore::default()), &ledger, Arc::new(SystemClock))?;
        return seed(&books).await;
    }

    let config = AppConfig::load().context("failed to load configuration")?;
    info!("Connecting to database...");
    let books = Books::connect(&config).await?;
    seed(&books).await
}

fn day(d: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(2026, 10, d).context("invalid seed date")
}

async fn seed<S: LedgerStore>(books: &Books<S>) -> anyhow::Result<()> {
    let tenant = books.tenants().register("Demo Trading Co").await?;
    let ctx = books.tenants().bind(tenant.id).await?;
    info!(tenant_id = %tenant.id, "Seeding demo tenant");

    let bank = books
        .reconciliation()
        .open_bank_account(&ctx, "Operating account", LedgerAccountId::new(), dec!(2500.00))
        .await?;

    let customer = CounterpartyId::new();
    let supplier = CounterpartyId::new();

    let consulting = issue(
        books,
        &ctx,
        DocumentKind::Invoice,
        customer,
        vec![
            LineItemInput::new("Consulting", dec!(10), dec!(120.00), dec!(11)),
            LineItemInput::new("Travel", Decimal::ONE, dec!(85.50), Decimal::ZERO),
        ],
    )
    .await?;
    let support = issue(
        books,
        &ctx,
        DocumentKind::Invoice,
        customer,
        vec![LineItemInput::new("Support plan", Decimal::ONE, dec!(600.00), dec!(11))],
    )
    .await?;
    let bill = issue(
        books,
        &ctx,
        DocumentKind::PurchaseInvoice,
        supplier,
        vec![LineItemInput::new("Office rent", Decimal::ONE, dec!(900.00), Decimal::ZERO)],
    )
    .await?;
    issue(
        books,
        &ctx,
        DocumentKind::DeliveryOrder,
        customer,
        vec![LineItemInput::new("Laptops", dec!(2), dec!(850.00), Decimal::ZERO)],
    )
    .await?;

    let receipt = record(books, &ctx, PaymentKind::Receipt, customer, dec!(1500.00), bank.id).await?;
    let plan = books
        .allocations()
        .allocate(
            &ctx,
            receipt,
            vec![AllocationRequest::new(consulting, dec!(1417.50))],
        )
        .await?;
    info!(remaining = %plan.remaining(), "Receipt allocated to consulting invoice");

    let settled = books.allocations().auto_allocate_open(&ctx, receipt).await?;
    info!(documents = settled.documents.len(), "Receipt remainder auto-allocated");

    let payment = record(books, &ctx, PaymentKind::Payment, supplier, dec!(900.00), bank.id).await?;
    books.allocations().auto_allocate(&ctx, payment, vec![bill]).await?;

    books
        .reconciliation()
        .record_transaction(&ctx, bank.id, day(28)?, dec!(-12.50), "Bank charges")
        .await?;
    let balance = books.reconciliation().book_balance(&ctx, bank.id, day(31)?).await?;
    let report = books
        .reconciliation()
        .reconcile(
            &ctx,
            &ReconciliationRequest {
                bank_account_id: bank.id,
                as_of: day(31)?,
                statement_balance: balance,
                marked_ids: Vec::new(),
            },
        )
        .await?;

    let open = books
        .documents()
        .open_documents(&ctx, customer, PaymentKind::Receipt)
        .await?;
    info!(
        support_invoice = %support,
        open_invoices = open.len(),
        book_balance = %report.book_balance,
        balanced = report.is_balanced,
        "Seeding complete!"
    );
    Ok(())
}

async fn issue<S: LedgerStore>(
    books: &Books<S>,
    ctx: &TenantContext,
    kind: DocumentKind,
    counterparty: CounterpartyId,
    lines: Vec<LineItemInput>,
) -> anyhow::Result<bookwell_shared::types::DocumentId> {
    let draft = books
        .documents()
        .create_draft(
            ctx,
            DraftInput {
                kind,
                counterparty_id: counterparty,
                issue_date: day(1)?,
                due_date: day(30)?,
                lines,
                notes: None,
            },
        )
        .await?;
    let doc = books.documents().post(ctx, draft.id).await?;
    info!(number = doc.number.as_deref().unwrap_or_default(), total = %doc.total, "Posted {kind}");
    Ok(doc.id)
}

async fn record<S: LedgerStore>(
    books: &Books<S>,
    ctx: &TenantContext,
    kind: PaymentKind,
    counterparty: CounterpartyId,
    amount: Decimal,
    bank: BankAccountId,
) -> anyhow::Result<bookwell_shared::types::PaymentId> {
    let recorded = books
        .allocations()
        .record_payment(
            ctx,
            RecordPaymentInput {
                kind,
                counterparty_id: counterparty,
                date: day(15)?,
                amount,
                method: PaymentMethod::BankTransfer,
                reference: None,
                bank_account_id: Some(bank),
            },
        )
        .await?;
    info!(number = %recorded.payment.number, amount = %amount, "Recorded {kind}");
    Ok(recorded.payment.id)
}
