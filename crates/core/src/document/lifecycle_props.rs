//! Property-based tests for the document lifecycle.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use bookwell_shared::types::{CounterpartyId, TenantId};

use crate::document::types::{Document, DocumentKind, DocumentStatus, DraftInput, LineItemInput};
use crate::error::BooksError;
use crate::tenant::TenantContext;

/// Strategy for generating valid lines.
fn arb_line() -> impl Strategy<Value = LineItemInput> {
    (1i64..=10_000, 0i64..=1_000_000, 0i64..=10_000).prop_map(|(qty, price, rate)| {
        LineItemInput::new(
            "Item",
            Decimal::new(qty, 2),
            Decimal::new(price, 3),
            Decimal::new(rate, 2),
        )
    })
}

fn arb_draft_input() -> impl Strategy<Value = DraftInput> {
    prop::collection::vec(arb_line(), 1..8).prop_map(|lines| DraftInput {
        kind: DocumentKind::Invoice,
        counterparty_id: CounterpartyId::new(),
        issue_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        due_date: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
        lines,
        notes: None,
    })
}

/// Strategy for allocation amounts in cents.
fn arb_amounts() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec((1i64..=50_000).prop_map(|cents| Decimal::new(cents, 2)), 0..12)
}

/// Posts `input`; a one-unit base line keeps the total above zero.
fn posted(mut input: DraftInput) -> Document {
    input.lines.push(LineItemInput::new("Base", Decimal::ONE, Decimal::ONE, Decimal::ZERO));
    let ctx = TenantContext::new(TenantId::new());
    let mut doc = Document::new_draft(&ctx, input, Utc::now()).unwrap();
    doc.post("INV-000001".into(), Utc::now()).unwrap();
    doc
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Totals always agree with the rounded lines.
    #[test]
    fn prop_draft_totals_consistent(input in arb_draft_input()) {
        let ctx = TenantContext::new(TenantId::new());
        let doc = Document::new_draft(&ctx, input, Utc::now()).unwrap();

        let line_sum: Decimal = doc.lines.iter().map(|l| l.line_total).sum();
        let tax_sum: Decimal = doc.lines.iter().map(|l| l.tax_amount).sum();
        prop_assert_eq!(doc.subtotal, line_sum);
        prop_assert_eq!(doc.tax_amount, tax_sum);
        prop_assert_eq!(doc.total, doc.subtotal + doc.tax_amount);
        prop_assert_eq!(doc.outstanding_amount, doc.total);
        prop_assert!(doc.lines.iter().all(|l| l.line_total.scale() <= 2));
    }

    /// Applying any sequence of allocations keeps outstanding == total - paid,
    /// never lets paid decrease, and leaves rejected steps without effect.
    #[test]
    fn prop_allocations_preserve_balance(
        input in arb_draft_input(),
        amounts in arb_amounts(),
    ) {
        let mut doc = posted(input);

        for amount in amounts {
            let before = doc.clone();
            match doc.apply_allocation(amount, Utc::now()) {
                Ok(()) => {
                    prop_assert_eq!(doc.paid_amount, before.paid_amount + amount);
                    prop_assert!(doc.paid_amount >= before.paid_amount);
                }
                Err(BooksError::OverAllocation { .. }) => {
                    prop_assert!(amount > before.outstanding_amount);
                    prop_assert_eq!(&doc, &before);
                }
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }

            prop_assert_eq!(doc.outstanding_amount, doc.total - doc.paid_amount);
            prop_assert!(doc.paid_amount <= doc.total);
            prop_assert_eq!(
                doc.status == DocumentStatus::Paid,
                doc.outstanding_amount.is_zero() && doc.status != DocumentStatus::Posted
            );
        }
    }

    /// Voiding keeps paid history and zeroes outstanding, unless fully paid.
    #[test]
    fn prop_void_zeroes_outstanding(
        input in arb_draft_input(),
        amounts in arb_amounts(),
    ) {
        let mut doc = posted(input);
        for amount in amounts {
            let _ = doc.apply_allocation(amount, Utc::now());
        }
        let paid_before = doc.paid_amount;
        let status_before = doc.status;

        match doc.void("cancelled", Utc::now()) {
            Ok(()) => {
                prop_assert_ne!(status_before, DocumentStatus::Paid);
                prop_assert_eq!(doc.status, DocumentStatus::Void);
                prop_assert!(doc.outstanding_amount.is_zero());
                prop_assert_eq!(doc.paid_amount, paid_before);
            }
            Err(BooksError::CannotVoidSettled(_)) => {
                prop_assert_eq!(status_before, DocumentStatus::Paid);
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }
}
