//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use bookwell_core::allocation::{Payment, PaymentKind, PaymentMethod, RecordPaymentInput};
use bookwell_core::document::{Document, DocumentKind, DraftInput, LineItemInput};
use bookwell_core::{Clock, TenantContext};
use bookwell_db::{Books, MemoryStore};
use bookwell_shared::LedgerConfig;
use bookwell_shared::types::{BankAccountId, CounterpartyId};

/// A clock that moves one second forward on every reading.
#[derive(Debug)]
pub struct SteppingClock {
    start: DateTime<Utc>,
    ticks: AtomicI64,
}

impl SteppingClock {
    pub fn new() -> Self {
        Self {
            start: Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap(),
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        self.start + Duration::seconds(self.ticks.fetch_add(1, Ordering::SeqCst))
    }
}

pub fn books() -> Books<MemoryStore> {
    Books::in_memory_with_clock(&LedgerConfig::default(), Arc::new(SteppingClock::new())).unwrap()
}

pub async fn tenant(books: &Books<MemoryStore>, name: &str) -> TenantContext {
    let tenant = books.tenants().register(name).await.unwrap();
    books.tenants().bind(tenant.id).await.unwrap()
}

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, month, day).unwrap()
}

/// One untaxed line for `total`, issued on the 1st and due on `due`.
pub fn draft(kind: DocumentKind, counterparty: CounterpartyId, total: Decimal, due: NaiveDate) -> DraftInput {
    DraftInput {
        kind,
        counterparty_id: counterparty,
        issue_date: date(1, 1),
        due_date: due,
        lines: vec![LineItemInput::new("Services", Decimal::ONE, total, Decimal::ZERO)],
        notes: None,
    }
}

pub async fn posted(
    books: &Books<MemoryStore>,
    ctx: &TenantContext,
    kind: DocumentKind,
    counterparty: CounterpartyId,
    total: Decimal,
    due: NaiveDate,
) -> Document {
    let doc = books
        .documents()
        .create_draft(ctx, draft(kind, counterparty, total, due))
        .await
        .unwrap();
    books.documents().post(ctx, doc.id).await.unwrap()
}

pub fn payment_input(
    kind: PaymentKind,
    counterparty: CounterpartyId,
    amount: Decimal,
    bank_account_id: Option<BankAccountId>,
) -> RecordPaymentInput {
    RecordPaymentInput {
        kind,
        counterparty_id: counterparty,
        date: date(2, 1),
        amount,
        method: PaymentMethod::BankTransfer,
        reference: None,
        bank_account_id,
    }
}

pub async fn receipt(
    books: &Books<MemoryStore>,
    ctx: &TenantContext,
    customer: CounterpartyId,
    amount: Decimal,
) -> Payment {
    books
        .allocations()
        .record_payment(ctx, payment_input(PaymentKind::Receipt, customer, amount, None))
        .await
        .unwrap()
        .payment
}
