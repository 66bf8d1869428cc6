//! Conversions between rows and core types.
//!
//! Rows written by this crate always parse; a failure here means the table
//! was edited by hand, and surfaces as `Database`.

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::prelude::DateTimeWithTimeZone;

use bookwell_core::BooksError;
use bookwell_core::Tenant;
use bookwell_core::allocation::{Allocation, Payment, PaymentKind, PaymentMethod};
use bookwell_core::document::{Document, DocumentKind, DocumentStatus, LineItem};
use bookwell_core::reconciliation::{
    BankAccount, BankTransaction, BankTransactionStatus, ReconciliationReport,
};
use bookwell_shared::types::{BankTransactionId, TenantId};

use super::{
    allocations, bank_accounts, bank_transactions, document_lines, documents, payments,
    reconciliations, tenants,
};

fn corrupt(what: &str, value: impl std::fmt::Display) -> BooksError {
    BooksError::Database(format!("unrecognised {what} '{value}' in storage"))
}

fn to_db_time(at: DateTime<Utc>) -> DateTimeWithTimeZone {
    at.fixed_offset()
}

fn from_db_time(at: DateTimeWithTimeZone) -> DateTime<Utc> {
    at.with_timezone(&Utc)
}

fn to_position(position: usize) -> Result<i32, BooksError> {
    i32::try_from(position).map_err(|_| corrupt("position", position))
}

// ========== Tenants ==========

/// Row → tenant.
#[must_use]
pub fn tenant_from_model(model: tenants::Model) -> Tenant {
    Tenant {
        id: TenantId::from_uuid(model.id),
        name: model.name,
        is_active: model.is_active,
        created_at: from_db_time(model.created_at),
    }
}

/// Tenant → insertable row.
#[must_use]
pub fn tenant_active_model(tenant: &Tenant) -> tenants::ActiveModel {
    tenants::ActiveModel {
        id: Set(tenant.id.into_inner()),
        name: Set(tenant.name.clone()),
        is_active: Set(tenant.is_active),
        created_at: Set(to_db_time(tenant.created_at)),
    }
}

// ========== Documents ==========

/// Rows → document. `lines` must already be ordered by position.
pub fn document_from_models(
    model: documents::Model,
    lines: Vec<document_lines::Model>,
) -> Result<Document, BooksError> {
    let kind = DocumentKind::parse(&model.kind).ok_or_else(|| corrupt("document kind", &model.kind))?;
    let status =
        DocumentStatus::parse(&model.status).ok_or_else(|| corrupt("document status", &model.status))?;
    let lines = lines
        .into_iter()
        .map(|line| {
            Ok(LineItem {
                id: line.id.into(),
                position: u32::try_from(line.position)
                    .map_err(|_| corrupt("line position", line.position))?,
                description: line.description,
                quantity: line.quantity,
                unit_price: line.unit_price,
                tax_rate: line.tax_rate,
                line_total: line.line_total,
                tax_amount: line.tax_amount,
            })
        })
        .collect::<Result<Vec<_>, BooksError>>()?;

    Ok(Document {
        id: model.id.into(),
        tenant_id: model.tenant_id.into(),
        kind,
        counterparty_id: model.counterparty_id.into(),
        number: model.number,
        issue_date: model.issue_date,
        due_date: model.due_date,
        status,
        subtotal: model.subtotal,
        tax_amount: model.tax_amount,
        total: model.total,
        paid_amount: model.paid_amount,
        outstanding_amount: model.outstanding_amount,
        lines,
        notes: model.notes,
        version: model.version,
        created_at: from_db_time(model.created_at),
        updated_at: from_db_time(model.updated_at),
        posted_at: model.posted_at.map(from_db_time),
        voided_at: model.voided_at.map(from_db_time),
        void_reason: model.void_reason,
    })
}

/// Document header → row with every column set.
#[must_use]
pub fn document_active_model(doc: &Document) -> documents::ActiveModel {
    documents::ActiveModel {
        id: Set(doc.id.into_inner()),
        tenant_id: Set(doc.tenant_id.into_inner()),
        kind: Set(doc.kind.as_str().to_string()),
        counterparty_id: Set(doc.counterparty_id.into_inner()),
        number: Set(doc.number.clone()),
        issue_date: Set(doc.issue_date),
        due_date: Set(doc.due_date),
        status: Set(doc.status.as_str().to_string()),
        subtotal: Set(doc.subtotal),
        tax_amount: Set(doc.tax_amount),
        total: Set(doc.total),
        paid_amount: Set(doc.paid_amount),
        outstanding_amount: Set(doc.outstanding_amount),
        notes: Set(doc.notes.clone()),
        version: Set(doc.version),
        created_at: Set(to_db_time(doc.created_at)),
        updated_at: Set(to_db_time(doc.updated_at)),
        posted_at: Set(doc.posted_at.map(to_db_time)),
        voided_at: Set(doc.voided_at.map(to_db_time)),
        void_reason: Set(doc.void_reason.clone()),
    }
}

/// Document lines → rows.
pub fn line_active_models(doc: &Document) -> Result<Vec<document_lines::ActiveModel>, BooksError> {
    doc.lines
        .iter()
        .map(|line| {
            Ok(document_lines::ActiveModel {
                id: Set(line.id.into_inner()),
                tenant_id: Set(doc.tenant_id.into_inner()),
                document_id: Set(doc.id.into_inner()),
                position: Set(i32::try_from(line.position)
                    .map_err(|_| corrupt("line position", line.position))?),
                description: Set(line.description.clone()),
                quantity: Set(line.quantity),
                unit_price: Set(line.unit_price),
                tax_rate: Set(line.tax_rate),
                line_total: Set(line.line_total),
                tax_amount: Set(line.tax_amount),
            })
        })
        .collect()
}

// ========== Payments ==========

/// Rows → payment. `allocations` must already be ordered by position.
pub fn payment_from_models(
    model: payments::Model,
    allocations: Vec<allocations::Model>,
) -> Result<Payment, BooksError> {
    let kind = PaymentKind::parse(&model.kind).ok_or_else(|| corrupt("payment kind", &model.kind))?;
    let method =
        PaymentMethod::parse(&model.method).ok_or_else(|| corrupt("payment method", &model.method))?;
    let payment = Payment {
        id: model.id.into(),
        tenant_id: model.tenant_id.into(),
        kind,
        number: model.number,
        counterparty_id: model.counterparty_id.into(),
        date: model.date,
        amount: model.amount,
        method,
        reference: model.reference,
        bank_account_id: model.bank_account_id.map(Into::into),
        allocations: allocations
            .into_iter()
            .map(|row| Allocation {
                id: row.id.into(),
                payment_id: row.payment_id.into(),
                document_id: row.document_id.into(),
                amount: row.amount,
                allocated_at: from_db_time(row.allocated_at),
            })
            .collect(),
        version: model.version,
        created_at: from_db_time(model.created_at),
        updated_at: from_db_time(model.updated_at),
    };
    if payment.allocated_amount() != model.allocated_amount {
        return Err(BooksError::RoundingInvariantViolation(format!(
            "payment {} stores allocated {} but its allocations sum to {}",
            payment.id,
            model.allocated_amount,
            payment.allocated_amount()
        )));
    }
    Ok(payment)
}

/// Payment header → row with every column set.
#[must_use]
pub fn payment_active_model(payment: &Payment) -> payments::ActiveModel {
    payments::ActiveModel {
        id: Set(payment.id.into_inner()),
        tenant_id: Set(payment.tenant_id.into_inner()),
        kind: Set(payment.kind.as_str().to_string()),
        number: Set(payment.number.clone()),
        counterparty_id: Set(payment.counterparty_id.into_inner()),
        date: Set(payment.date),
        amount: Set(payment.amount),
        allocated_amount: Set(payment.allocated_amount()),
        method: Set(payment.method.as_str().to_string()),
        reference: Set(payment.reference.clone()),
        bank_account_id: Set(payment.bank_account_id.map(Into::into)),
        version: Set(payment.version),
        created_at: Set(to_db_time(payment.created_at)),
        updated_at: Set(to_db_time(payment.updated_at)),
    }
}

/// Allocation → row at `position` within its payment.
pub fn allocation_active_model(
    tenant_id: TenantId,
    allocation: &Allocation,
    position: usize,
) -> Result<allocations::ActiveModel, BooksError> {
    Ok(allocations::ActiveModel {
        id: Set(allocation.id.into_inner()),
        tenant_id: Set(tenant_id.into_inner()),
        payment_id: Set(allocation.payment_id.into_inner()),
        document_id: Set(allocation.document_id.into_inner()),
        position: Set(to_position(position)?),
        amount: Set(allocation.amount),
        allocated_at: Set(to_db_time(allocation.allocated_at)),
    })
}

// ========== Banking ==========

/// Row → bank account.
#[must_use]
pub fn bank_account_from_model(model: bank_accounts::Model) -> BankAccount {
    BankAccount {
        id: model.id.into(),
        tenant_id: model.tenant_id.into(),
        name: model.name,
        ledger_account_id: model.ledger_account_id.into(),
        opening_balance: model.opening_balance,
        created_at: from_db_time(model.created_at),
    }
}

/// Bank account → insertable row.
#[must_use]
pub fn bank_account_active_model(account: &BankAccount) -> bank_accounts::ActiveModel {
    bank_accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        tenant_id: Set(account.tenant_id.into_inner()),
        name: Set(account.name.clone()),
        ledger_account_id: Set(account.ledger_account_id.into_inner()),
        opening_balance: Set(account.opening_balance),
        created_at: Set(to_db_time(account.created_at)),
    }
}

/// Row → bank transaction.
pub fn bank_transaction_from_model(
    model: bank_transactions::Model,
) -> Result<BankTransaction, BooksError> {
    let status = BankTransactionStatus::parse(&model.status)
        .ok_or_else(|| corrupt("bank transaction status", &model.status))?;
    Ok(BankTransaction {
        id: model.id.into(),
        tenant_id: model.tenant_id.into(),
        bank_account_id: model.bank_account_id.into(),
        date: model.date,
        amount: model.amount,
        description: model.description,
        status,
        payment_id: model.payment_id.map(Into::into),
        created_at: from_db_time(model.created_at),
        voided_at: model.voided_at.map(from_db_time),
    })
}

/// Bank transaction → row with every column set.
#[must_use]
pub fn bank_transaction_active_model(tx: &BankTransaction) -> bank_transactions::ActiveModel {
    bank_transactions::ActiveModel {
        id: Set(tx.id.into_inner()),
        tenant_id: Set(tx.tenant_id.into_inner()),
        bank_account_id: Set(tx.bank_account_id.into_inner()),
        date: Set(tx.date),
        amount: Set(tx.amount),
        description: Set(tx.description.clone()),
        status: Set(tx.status.as_str().to_string()),
        payment_id: Set(tx.payment_id.map(Into::into)),
        created_at: Set(to_db_time(tx.created_at)),
        voided_at: Set(tx.voided_at.map(to_db_time)),
    }
}

/// Row → reconciliation report.
pub fn reconciliation_from_model(
    model: reconciliations::Model,
) -> Result<ReconciliationReport, BooksError> {
    let marked_ids: Vec<BankTransactionId> = serde_json::from_value(model.marked_ids)
        .map_err(|e| BooksError::Database(format!("unreadable marked ids: {e}")))?;
    Ok(ReconciliationReport {
        id: model.id.into(),
        tenant_id: model.tenant_id.into(),
        bank_account_id: model.bank_account_id.into(),
        as_of: model.as_of,
        statement_balance: model.statement_balance,
        book_balance: model.book_balance,
        difference: model.difference,
        is_balanced: model.is_balanced,
        cleared_balance: model.cleared_balance,
        marked_ids,
        uncleared_count: usize::try_from(model.uncleared_count)
            .map_err(|_| corrupt("uncleared count", model.uncleared_count))?,
        created_at: from_db_time(model.created_at),
    })
}

/// Reconciliation report → insertable row.
pub fn reconciliation_active_model(
    report: &ReconciliationReport,
) -> Result<reconciliations::ActiveModel, BooksError> {
    let marked_ids = serde_json::to_value(&report.marked_ids)
        .map_err(|e| BooksError::Internal(format!("cannot encode marked ids: {e}")))?;
    Ok(reconciliations::ActiveModel {
        id: Set(report.id.into_inner()),
        tenant_id: Set(report.tenant_id.into_inner()),
        bank_account_id: Set(report.bank_account_id.into_inner()),
        as_of: Set(report.as_of),
        statement_balance: Set(report.statement_balance),
        book_balance: Set(report.book_balance),
        difference: Set(report.difference),
        is_balanced: Set(report.is_balanced),
        cleared_balance: Set(report.cleared_balance),
        marked_ids: Set(marked_ids),
        uncleared_count: Set(to_position(report.uncleared_count)?),
        created_at: Set(to_db_time(report.created_at)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use bookwell_core::TenantContext;
    use bookwell_core::document::{DraftInput, LineItemInput};
    use bookwell_shared::types::CounterpartyId;
    use sea_orm::ActiveValue;

    fn set<T: Into<sea_orm::Value>>(value: ActiveValue<T>) -> T {
        match value {
            ActiveValue::Set(v) | ActiveValue::Unchanged(v) => v,
            ActiveValue::NotSet => panic!("column not set"),
        }
    }

    fn posted_document() -> Document {
        let ctx = TenantContext::new(TenantId::new());
        let mut doc = Document::new_draft(
            &ctx,
            DraftInput {
                kind: DocumentKind::Invoice,
                counterparty_id: CounterpartyId::new(),
                issue_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
                due_date: NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
                lines: vec![
                    LineItemInput::new("Consulting", dec!(2), dec!(150.00), dec!(11)),
                    LineItemInput::new("Travel", dec!(1), dec!(40.00), dec!(0)),
                ],
                notes: Some("net 30".into()),
            },
            Utc::now(),
        )
        .unwrap();
        doc.post("INV-000001".into(), Utc::now()).unwrap();
        doc
    }

    fn header_model(am: documents::ActiveModel) -> documents::Model {
        documents::Model {
            id: set(am.id),
            tenant_id: set(am.tenant_id),
            kind: set(am.kind),
            counterparty_id: set(am.counterparty_id),
            number: set(am.number),
            issue_date: set(am.issue_date),
            due_date: set(am.due_date),
            status: set(am.status),
            subtotal: set(am.subtotal),
            tax_amount: set(am.tax_amount),
            total: set(am.total),
            paid_amount: set(am.paid_amount),
            outstanding_amount: set(am.outstanding_amount),
            notes: set(am.notes),
            version: set(am.version),
            created_at: set(am.created_at),
            updated_at: set(am.updated_at),
            posted_at: set(am.posted_at),
            voided_at: set(am.voided_at),
            void_reason: set(am.void_reason),
        }
    }

    fn line_model(am: document_lines::ActiveModel) -> document_lines::Model {
        document_lines::Model {
            id: set(am.id),
            tenant_id: set(am.tenant_id),
            document_id: set(am.document_id),
            position: set(am.position),
            description: set(am.description),
            quantity: set(am.quantity),
            unit_price: set(am.unit_price),
            tax_rate: set(am.tax_rate),
            line_total: set(am.line_total),
            tax_amount: set(am.tax_amount),
        }
    }

    #[test]
    fn test_document_survives_storage() {
        let doc = posted_document();
        let lines = line_active_models(&doc)
            .unwrap()
            .into_iter()
            .map(line_model)
            .collect();
        let restored = document_from_models(header_model(document_active_model(&doc)), lines).unwrap();
        assert_eq!(restored, doc);
    }

    #[test]
    fn test_unknown_status_is_a_database_error() {
        let doc = posted_document();
        let mut model = header_model(document_active_model(&doc));
        model.status = "archived".into();
        let err = document_from_models(model, Vec::new()).unwrap_err();
        assert!(matches!(err, BooksError::Database(_)));
    }
}
