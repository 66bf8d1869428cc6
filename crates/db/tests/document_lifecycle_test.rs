//! Document lifecycle against the in-memory backend: drafting, numbering at
//! posting, voiding and listing.

#![allow(clippy::unwrap_used)]

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bookwell_core::BooksError;
use bookwell_core::allocation::AllocationRequest;
use bookwell_core::document::{DocumentFilter, DocumentKind, DocumentStatus, DraftInput, LineItemInput};
use bookwell_core::numbering::Series;
use bookwell_shared::types::{CounterpartyId, PageRequest};

use common::{books, date, draft, posted, receipt, tenant};

#[tokio::test]
async fn test_draft_totals_and_posting() {
    let books = books();
    let ctx = tenant(&books, "Acme").await;
    let input = DraftInput {
        kind: DocumentKind::Invoice,
        counterparty_id: CounterpartyId::new(),
        issue_date: date(3, 1),
        due_date: date(3, 31),
        lines: vec![
            LineItemInput::new("Consulting", dec!(2), dec!(150.00), dec!(11)),
            LineItemInput::new("Travel", Decimal::ONE, dec!(40.00), Decimal::ZERO),
        ],
        notes: Some("March".into()),
    };

    let doc = books.documents().create_draft(&ctx, input).await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Draft);
    assert_eq!(doc.number, None);
    assert_eq!(doc.subtotal, dec!(340.00));
    assert_eq!(doc.tax_amount, dec!(33.00));
    assert_eq!(doc.total, dec!(373.00));
    assert_eq!(doc.lines.len(), 2);
    assert_eq!(doc.lines[0].line_total, dec!(300.00));

    let posted = books.documents().post(&ctx, doc.id).await.unwrap();
    assert_eq!(posted.status, DocumentStatus::Posted);
    assert_eq!(posted.number.as_deref(), Some("INV-000001"));
    assert_eq!(posted.outstanding_amount, dec!(373.00));
    assert!(posted.posted_at.is_some());

    let err = books.documents().post(&ctx, doc.id).await.unwrap_err();
    assert!(matches!(err, BooksError::InvalidTransition { .. }));
    assert_eq!(books.sequences().current(&ctx, Series::Invoice).await.unwrap(), 1);

    let stored = books.documents().get(&ctx, doc.id).await.unwrap();
    assert_eq!(stored, posted);
}

#[tokio::test]
async fn test_drafts_consume_no_numbers() {
    let books = books();
    let ctx = tenant(&books, "Acme").await;
    let customer = CounterpartyId::new();

    let discarded = books
        .documents()
        .create_draft(&ctx, draft(DocumentKind::Invoice, customer, dec!(10.00), date(1, 31)))
        .await
        .unwrap();
    books.documents().delete_draft(&ctx, discarded.id).await.unwrap();
    let err = books.documents().get(&ctx, discarded.id).await.unwrap_err();
    assert!(matches!(err, BooksError::NotFound { .. }));

    let doc = posted(&books, &ctx, DocumentKind::Invoice, customer, dec!(20.00), date(1, 31)).await;
    assert_eq!(doc.number.as_deref(), Some("INV-000001"));
}

#[tokio::test]
async fn test_each_kind_draws_from_its_own_series() {
    let books = books();
    let ctx = tenant(&books, "Acme").await;
    let party = CounterpartyId::new();

    let invoice = posted(&books, &ctx, DocumentKind::Invoice, party, dec!(1.00), date(1, 31)).await;
    let bill = posted(&books, &ctx, DocumentKind::PurchaseInvoice, party, dec!(1.00), date(1, 31)).await;
    let credit = posted(&books, &ctx, DocumentKind::CreditNote, party, dec!(1.00), date(1, 31)).await;
    let delivery = posted(&books, &ctx, DocumentKind::DeliveryOrder, party, dec!(1.00), date(1, 31)).await;
    let second = posted(&books, &ctx, DocumentKind::Invoice, party, dec!(1.00), date(1, 31)).await;

    assert_eq!(invoice.number.as_deref(), Some("INV-000001"));
    assert_eq!(bill.number.as_deref(), Some("PINV-000001"));
    assert_eq!(credit.number.as_deref(), Some("CN-000001"));
    assert_eq!(delivery.number.as_deref(), Some("DO-000001"));
    assert_eq!(second.number.as_deref(), Some("INV-000002"));
}

#[tokio::test]
async fn test_out_of_range_lines_are_rejected() {
    let books = books();
    let ctx = tenant(&books, "Acme").await;
    let mut input = draft(DocumentKind::Invoice, CounterpartyId::new(), dec!(1.00), date(1, 31));
    let huge = dec!(100000000000000000000);
    input.lines = vec![LineItemInput::new("Big", huge, huge, Decimal::ZERO)];

    let err = books.documents().create_draft(&ctx, input).await.unwrap_err();
    assert!(matches!(err, BooksError::Validation(ref msg) if msg.contains("out of range")));
    let listed = books
        .documents()
        .list(&ctx, &DocumentFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.meta.total, 0);
}

#[tokio::test]
async fn test_zero_total_invoice_is_not_posted() {
    let books = books();
    let ctx = tenant(&books, "Acme").await;
    let customer = CounterpartyId::new();
    let doc = books
        .documents()
        .create_draft(&ctx, draft(DocumentKind::Invoice, customer, dec!(0.00), date(1, 31)))
        .await
        .unwrap();

    let err = books.documents().post(&ctx, doc.id).await.unwrap_err();
    assert!(matches!(err, BooksError::Validation(_)));
    assert_eq!(books.documents().get(&ctx, doc.id).await.unwrap().status, DocumentStatus::Draft);
    assert_eq!(books.sequences().current(&ctx, Series::Invoice).await.unwrap(), 0);

    // a delivery order carries no amount to settle
    let order = posted(&books, &ctx, DocumentKind::DeliveryOrder, customer, dec!(0.00), date(1, 31)).await;
    assert_eq!(order.status, DocumentStatus::Posted);
}

#[tokio::test]
async fn test_posted_documents_are_frozen() {
    let books = books();
    let ctx = tenant(&books, "Acme").await;
    let doc = posted(&books, &ctx, DocumentKind::Invoice, CounterpartyId::new(), dec!(50.00), date(1, 31)).await;

    let err = books
        .documents()
        .update_draft(&ctx, doc.id, vec![LineItemInput::new("More", Decimal::ONE, dec!(5.00), Decimal::ZERO)])
        .await
        .unwrap_err();
    assert!(matches!(err, BooksError::InvalidTransition { .. }));

    let err = books.documents().delete_draft(&ctx, doc.id).await.unwrap_err();
    assert!(matches!(err, BooksError::InvalidTransition { .. }));

    assert_eq!(books.documents().get(&ctx, doc.id).await.unwrap(), doc);
}

#[tokio::test]
async fn test_update_draft_reprices() {
    let books = books();
    let ctx = tenant(&books, "Acme").await;
    let doc = books
        .documents()
        .create_draft(&ctx, draft(DocumentKind::Invoice, CounterpartyId::new(), dec!(10.00), date(1, 31)))
        .await
        .unwrap();

    let updated = books
        .documents()
        .update_draft(&ctx, doc.id, vec![LineItemInput::new("Widget", dec!(3), dec!(19.99), dec!(10))])
        .await
        .unwrap();
    assert_eq!(updated.subtotal, dec!(59.97));
    assert_eq!(updated.tax_amount, dec!(6.00));
    assert_eq!(updated.total, dec!(65.97));
    assert!(updated.version > doc.version);

    let err = books.documents().update_draft(&ctx, doc.id, vec![]).await.unwrap_err();
    assert!(matches!(err, BooksError::Validation(_)));
}

#[tokio::test]
async fn test_void_clears_outstanding_and_blocks_allocation() {
    let books = books();
    let ctx = tenant(&books, "Acme").await;
    let customer = CounterpartyId::new();
    let doc = posted(&books, &ctx, DocumentKind::Invoice, customer, dec!(250.00), date(1, 31)).await;

    let voided = books.documents().void(&ctx, doc.id, "issued in error").await.unwrap();
    assert_eq!(voided.status, DocumentStatus::Void);
    assert_eq!(voided.outstanding_amount, dec!(0));
    assert_eq!(voided.number, doc.number);
    assert_eq!(voided.void_reason.as_deref(), Some("issued in error"));

    let err = books.documents().void(&ctx, doc.id, "again").await.unwrap_err();
    assert!(matches!(err, BooksError::InvalidTransition { .. }));

    let payment = receipt(&books, &ctx, customer, dec!(100.00)).await;
    let err = books
        .allocations()
        .allocate(&ctx, payment.id, vec![AllocationRequest::new(doc.id, dec!(50.00))])
        .await
        .unwrap_err();
    assert!(matches!(err, BooksError::AllocationRejected { position: 0, .. }));

    let next = posted(&books, &ctx, DocumentKind::Invoice, customer, dec!(1.00), date(1, 31)).await;
    assert_eq!(next.number.as_deref(), Some("INV-000002"));
}

#[tokio::test]
async fn test_partially_paid_void_keeps_paid_amount() {
    let books = books();
    let ctx = tenant(&books, "Acme").await;
    let customer = CounterpartyId::new();
    let doc = posted(&books, &ctx, DocumentKind::Invoice, customer, dec!(1000.00), date(1, 31)).await;
    let payment = receipt(&books, &ctx, customer, dec!(300.00)).await;
    books
        .allocations()
        .allocate(&ctx, payment.id, vec![AllocationRequest::new(doc.id, dec!(300.00))])
        .await
        .unwrap();

    let voided = books.documents().void(&ctx, doc.id, "cancelled").await.unwrap();
    assert_eq!(voided.paid_amount, dec!(300.00));
    assert_eq!(voided.outstanding_amount, dec!(0));
}

#[tokio::test]
async fn test_paid_document_cannot_be_voided() {
    let books = books();
    let ctx = tenant(&books, "Acme").await;
    let customer = CounterpartyId::new();
    let doc = posted(&books, &ctx, DocumentKind::Invoice, customer, dec!(80.00), date(1, 31)).await;
    let payment = receipt(&books, &ctx, customer, dec!(80.00)).await;
    books
        .allocations()
        .allocate(&ctx, payment.id, vec![AllocationRequest::new(doc.id, dec!(80.00))])
        .await
        .unwrap();

    let err = books.documents().void(&ctx, doc.id, "too late").await.unwrap_err();
    assert!(matches!(err, BooksError::CannotVoidSettled(id) if id == doc.id));
    assert_eq!(
        books.documents().get(&ctx, doc.id).await.unwrap().status,
        DocumentStatus::Paid
    );
}

#[tokio::test]
async fn test_list_filters_and_pages() {
    let books = books();
    let ctx = tenant(&books, "Acme").await;
    let customer = CounterpartyId::new();
    let supplier = CounterpartyId::new();

    for _ in 0..5 {
        posted(&books, &ctx, DocumentKind::Invoice, customer, dec!(10.00), date(1, 31)).await;
    }
    posted(&books, &ctx, DocumentKind::PurchaseInvoice, supplier, dec!(10.00), date(1, 31)).await;
    books
        .documents()
        .create_draft(&ctx, draft(DocumentKind::PurchaseInvoice, supplier, dec!(10.00), date(1, 31)))
        .await
        .unwrap();

    let invoices = DocumentFilter {
        kind: Some(DocumentKind::Invoice),
        ..DocumentFilter::default()
    };
    let first = books.documents().list(&ctx, &invoices, PageRequest::new(1, 2)).await.unwrap();
    assert_eq!(first.data.len(), 2);
    assert_eq!(first.meta.total, 5);
    assert_eq!(first.meta.total_pages, 3);
    let last = books.documents().list(&ctx, &invoices, PageRequest::new(3, 2)).await.unwrap();
    assert_eq!(last.data.len(), 1);

    let numbers: Vec<_> = first.data.iter().filter_map(|d| d.number.clone()).collect();
    assert_eq!(numbers, vec!["INV-000001", "INV-000002"]);

    let drafts = DocumentFilter {
        status: Some(DocumentStatus::Draft),
        ..DocumentFilter::default()
    };
    let page = books.documents().list(&ctx, &drafts, PageRequest::default()).await.unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].counterparty_id, supplier);

    let open_supplier = DocumentFilter {
        counterparty_id: Some(supplier),
        open_only: true,
        ..DocumentFilter::default()
    };
    let page = books.documents().list(&ctx, &open_supplier, PageRequest::default()).await.unwrap();
    assert_eq!(page.meta.total, 1);
}
