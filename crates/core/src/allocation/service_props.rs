//! Property-based tests for `AllocationService`.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use bookwell_shared::types::{CounterpartyId, TenantId};

use crate::allocation::service::AllocationService;
use crate::allocation::types::{AllocationRequest, Payment, PaymentKind, PaymentMethod, RecordPaymentInput};
use crate::document::{Document, DocumentKind, DraftInput, LineItemInput};
use crate::error::BooksError;
use crate::tenant::TenantContext;

fn cents(range: std::ops::RangeInclusive<i64>) -> impl Strategy<Value = Decimal> {
    range.prop_map(|c| Decimal::new(c, 2))
}

fn setup(totals: &[Decimal], payment_amount: Decimal) -> (Payment, Vec<Document>) {
    let ctx = TenantContext::new(TenantId::new());
    let customer = CounterpartyId::new();
    let docs = totals
        .iter()
        .enumerate()
        .map(|(i, total)| {
            let input = DraftInput {
                kind: DocumentKind::Invoice,
                counterparty_id: customer,
                issue_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
                due_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
                lines: vec![LineItemInput::new("Item", Decimal::ONE, *total, Decimal::ZERO)],
                notes: None,
            };
            let mut doc = Document::new_draft(&ctx, input, Utc::now()).unwrap();
            doc.post(format!("INV-{i:06}"), Utc::now()).unwrap();
            doc
        })
        .collect();
    let payment = Payment::new(
        &ctx,
        RecordPaymentInput {
            kind: PaymentKind::Receipt,
            counterparty_id: customer,
            date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            amount: payment_amount,
            method: PaymentMethod::Cash,
            reference: None,
            bank_account_id: None,
        },
        "RCT-000001".into(),
        Utc::now(),
    )
    .unwrap();
    (payment, docs)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// A successful plan never exceeds the payment or any document.
    /// A failed plan is always an `AllocationRejected`.
    #[test]
    fn prop_explicit_plan_respects_limits(
        totals in prop::collection::vec(cents(1..=100_000), 1..6),
        payment_amount in cents(1..=300_000),
        picks in prop::collection::vec((0usize..6, 1i64..=60_000), 1..8),
    ) {
        let (payment, docs) = setup(&totals, payment_amount);
        let requests: Vec<AllocationRequest> = picks
            .iter()
            .map(|(i, c)| AllocationRequest::new(docs[i % docs.len()].id, Decimal::new(*c, 2)))
            .collect();

        match AllocationService::plan(&payment, &requests, &docs, Utc::now()) {
            Ok(plan) => {
                let batch: Decimal = plan.allocations.iter().map(|a| a.amount).sum();
                prop_assert!(batch <= payment.amount);
                prop_assert_eq!(plan.remaining(), payment.amount - batch);
                for doc in &plan.documents {
                    prop_assert_eq!(doc.outstanding_amount, doc.total - doc.paid_amount);
                    prop_assert_eq!(doc.paid_amount, plan.payment.allocated_to(doc.id));
                    prop_assert!(doc.paid_amount <= doc.total);
                }
            }
            Err(BooksError::AllocationRejected { position, .. }) => {
                prop_assert!(position < requests.len());
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    /// Greedy allocation takes exactly min(payment, Σ outstanding) and fills
    /// every document but the last one it touches.
    #[test]
    fn prop_auto_plan_is_greedy(
        totals in prop::collection::vec(cents(1..=100_000), 0..6),
        payment_amount in cents(1..=300_000),
    ) {
        let (payment, docs) = setup(&totals, payment_amount);
        let plan = AllocationService::plan_auto(&payment, &docs, Utc::now()).unwrap();

        let open: Decimal = docs.iter().map(|d| d.outstanding_amount).sum();
        let batch: Decimal = plan.allocations.iter().map(|a| a.amount).sum();
        prop_assert_eq!(batch, payment.amount.min(open));

        if let Some((_, filled)) = plan.allocations.split_last() {
            for (alloc, doc) in filled.iter().zip(&docs) {
                prop_assert_eq!(alloc.document_id, doc.id);
                prop_assert_eq!(alloc.amount, doc.outstanding_amount);
            }
        }
    }
}
