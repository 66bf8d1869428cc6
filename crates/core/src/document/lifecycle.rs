//! Document state transitions.
//!
//! Every method either applies its whole change and bumps `version`, or
//! returns an error and leaves the document untouched.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bookwell_shared::types::DocumentId;
use bookwell_shared::types::money::is_money_scaled;

use crate::document::calc::{compute_totals, price_lines};
use crate::document::types::{Document, DocumentStatus, DraftInput, LineItemInput};
use crate::error::BooksError;
use crate::tenant::TenantContext;

impl Document {
    /// Builds a priced, unnumbered draft for the context's tenant.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the due date precedes the issue date, there
    /// are no lines, or a line is invalid.
    pub fn new_draft(
        ctx: &TenantContext,
        input: DraftInput,
        now: DateTime<Utc>,
    ) -> Result<Self, BooksError> {
        if input.due_date < input.issue_date {
            return Err(BooksError::Validation(
                "due date cannot be before issue date".into(),
            ));
        }
        let lines = price_lines(&input.lines)?;
        let totals = compute_totals(&lines)?;

        let document = Self {
            id: DocumentId::new(),
            tenant_id: ctx.tenant_id(),
            kind: input.kind,
            counterparty_id: input.counterparty_id,
            number: None,
            issue_date: input.issue_date,
            due_date: input.due_date,
            status: DocumentStatus::Draft,
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            total: totals.total,
            paid_amount: Decimal::ZERO,
            outstanding_amount: totals.total,
            lines,
            notes: input.notes.filter(|notes| !notes.trim().is_empty()),
            version: 1,
            created_at: now,
            updated_at: now,
            posted_at: None,
            voided_at: None,
            void_reason: None,
        };
        document.check_invariants()?;
        Ok(document)
    }

    /// Replaces every line of a draft and recomputes its totals.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside `draft`, or `Validation` for bad
    /// lines.
    pub fn replace_lines(
        &mut self,
        inputs: &[LineItemInput],
        now: DateTime<Utc>,
    ) -> Result<(), BooksError> {
        self.ensure_status(DocumentStatus::Draft, "draft")?;
        let lines = price_lines(inputs)?;
        let totals = compute_totals(&lines)?;

        self.commit(now, |doc| {
            doc.lines = lines;
            doc.subtotal = totals.subtotal;
            doc.tax_amount = totals.tax_amount;
            doc.total = totals.total;
            doc.outstanding_amount = totals.total;
        })
    }

    /// Checks the document may be deleted. Only drafts may.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside `draft`.
    pub fn ensure_deletable(&self) -> Result<(), BooksError> {
        self.ensure_status(DocumentStatus::Draft, "deleted")
    }

    /// Checks the document may be posted, before a number is reserved.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` outside `draft`
    /// - `Validation` for a settleable document with a zero total, which
    ///   could never be paid
    pub fn ensure_can_post(&self) -> Result<(), BooksError> {
        self.ensure_status(DocumentStatus::Draft, DocumentStatus::Posted.as_str())?;
        if self.kind.settlement_side().is_some() && self.total.is_zero() {
            return Err(BooksError::Validation(format!(
                "{} {} has a zero total and cannot be posted",
                self.kind, self.id
            )));
        }
        Ok(())
    }

    /// Posts a draft under `number`.
    ///
    /// # Errors
    ///
    /// As [`ensure_can_post`](Self::ensure_can_post).
    pub fn post(&mut self, number: String, now: DateTime<Utc>) -> Result<(), BooksError> {
        self.ensure_can_post()?;
        if number.trim().is_empty() {
            return Err(BooksError::Internal("posting requires a number".into()));
        }
        self.commit(now, |doc| {
            doc.number = Some(number);
            doc.status = DocumentStatus::Posted;
            doc.posted_at = Some(now);
        })
    }

    /// Voids a posted or partially paid document.
    ///
    /// Allocations already applied stay as history: `paid_amount` is kept and
    /// `outstanding_amount` drops to zero for good.
    ///
    /// # Errors
    ///
    /// - `Validation` if the reason is blank
    /// - `CannotVoidSettled` if the document is fully paid
    /// - `InvalidTransition` from `draft` or `void`
    pub fn void(&mut self, reason: &str, now: DateTime<Utc>) -> Result<(), BooksError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(BooksError::Validation("void reason is required".into()));
        }
        match self.status {
            DocumentStatus::Posted | DocumentStatus::PartiallyPaid => {}
            DocumentStatus::Paid => return Err(BooksError::CannotVoidSettled(self.id)),
            DocumentStatus::Draft | DocumentStatus::Void => {
                return Err(BooksError::InvalidTransition {
                    from: self.status,
                    to: DocumentStatus::Void.as_str(),
                });
            }
        }

        self.commit(now, |doc| {
            doc.status = DocumentStatus::Void;
            doc.outstanding_amount = Decimal::ZERO;
            doc.voided_at = Some(now);
            doc.void_reason = Some(reason.to_string());
        })
    }

    /// Applies part of a payment to this document.
    ///
    /// # Errors
    ///
    /// - `Validation` if the amount is not positive or has sub-cent digits
    /// - `InvalidTransition` on a draft or void document
    /// - `OverAllocation` if the amount exceeds what is outstanding
    pub fn apply_allocation(
        &mut self,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(), BooksError> {
        if amount <= Decimal::ZERO || !is_money_scaled(amount) {
            return Err(BooksError::Validation(format!(
                "allocation amount must be a positive amount in cents, got {amount}"
            )));
        }
        if matches!(self.status, DocumentStatus::Draft | DocumentStatus::Void) {
            return Err(BooksError::InvalidTransition {
                from: self.status,
                to: DocumentStatus::PartiallyPaid.as_str(),
            });
        }
        if amount > self.outstanding_amount {
            return Err(BooksError::OverAllocation {
                document_id: self.id,
                requested: amount,
                outstanding: self.outstanding_amount,
            });
        }

        self.commit(now, |doc| {
            doc.paid_amount += amount;
            doc.outstanding_amount -= amount;
            doc.status = if doc.outstanding_amount.is_zero() {
                DocumentStatus::Paid
            } else {
                DocumentStatus::PartiallyPaid
            };
        })
    }

    /// Verifies the monetary invariants.
    ///
    /// # Errors
    ///
    /// Returns `RoundingInvariantViolation` describing the first broken rule.
    pub fn check_invariants(&self) -> Result<(), BooksError> {
        let violation = |rule: &str| {
            Err(BooksError::RoundingInvariantViolation(format!(
                "document {}: {rule}",
                self.id
            )))
        };

        let Ok(totals) = compute_totals(&self.lines) else {
            return violation("line totals overflow");
        };
        if totals.subtotal != self.subtotal || totals.tax_amount != self.tax_amount {
            return violation("header totals differ from line totals");
        }
        if self.subtotal.checked_add(self.tax_amount) != Some(self.total) {
            return violation("total != subtotal + tax");
        }
        if self.paid_amount < Decimal::ZERO || self.paid_amount > self.total {
            return violation("paid amount outside 0..=total");
        }
        let expected_outstanding = if self.status == DocumentStatus::Void {
            Decimal::ZERO
        } else {
            self.total - self.paid_amount
        };
        if self.outstanding_amount != expected_outstanding {
            return violation("outstanding != total - paid");
        }
        if self.status == DocumentStatus::Paid && !self.outstanding_amount.is_zero() {
            return violation("paid document has an outstanding balance");
        }
        if (self.status == DocumentStatus::Draft) != self.number.is_none() {
            return violation("only drafts may be unnumbered");
        }
        Ok(())
    }

    fn ensure_status(&self, required: DocumentStatus, to: &'static str) -> Result<(), BooksError> {
        if self.status == required {
            Ok(())
        } else {
            Err(BooksError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }

    /// Applies `change` to a copy, checks it, and only then replaces `self`.
    fn commit(
        &mut self,
        now: DateTime<Utc>,
        change: impl FnOnce(&mut Self),
    ) -> Result<(), BooksError> {
        let mut next = self.clone();
        change(&mut next);
        next.version += 1;
        next.updated_at = now;
        next.check_invariants()?;
        *self = next;
        Ok(())
    }
}
