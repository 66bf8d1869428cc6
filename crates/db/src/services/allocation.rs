//! Allocation engine.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

use bookwell_core::allocation::{AllocationPlan, AllocationRequest, Payment, RecordPaymentInput};
use bookwell_core::numbering::NumberingScheme;
use bookwell_core::reconciliation::BankTransaction;
use bookwell_core::{BooksError, Clock, TenantContext};
use bookwell_shared::types::{DocumentId, PaymentId};

use super::report;
use super::sequence::retry_contended;
use crate::store::{AllocationInstruction, PaymentRepository};

/// A stored payment and the bank line it produced, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPayment {
    /// The numbered payment, fully unallocated.
    pub payment: Payment,
    /// Deposit or withdrawal on the payment's bank account.
    pub bank_transaction: Option<BankTransaction>,
}

/// Records payments and applies them to documents.
pub struct AllocationEngine<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    scheme: NumberingScheme,
    retries: u32,
}

impl<S: PaymentRepository> AllocationEngine<S> {
    /// Creates an engine over `store`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, scheme: NumberingScheme, retries: u32) -> Self {
        Self {
            store,
            clock,
            scheme,
            retries,
        }
    }

    /// Numbers and stores a receipt or payment.
    ///
    /// # Errors
    ///
    /// - `Validation` for a non-positive or sub-cent amount
    /// - `NotFound` for an unknown bank account
    /// - `SequenceContention` if the counter stayed busy through every retry
    pub async fn record_payment(
        &self,
        ctx: &TenantContext,
        input: RecordPaymentInput,
    ) -> Result<RecordedPayment, BooksError> {
        let format = self.scheme.format_for(input.kind.series());
        let (payment, bank_transaction) = retry_contended(self.retries, || {
            self.store
                .create_payment(ctx, input.clone(), format, self.clock.now())
        })
        .await
        .inspect_err(|err| report("allocations.record_payment", ctx, err))?;
        info!(
            tenant_id = %ctx.tenant_id(),
            payment_id = %payment.id,
            number = %payment.number,
            kind = %payment.kind,
            amount = %payment.amount,
            "payment recorded"
        );
        Ok(RecordedPayment {
            payment,
            bank_transaction,
        })
    }

    /// Applies an explicit batch, all or nothing.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty batch
    /// - `AllocationRejected` naming the first failing pair; nothing is applied
    pub async fn allocate(
        &self,
        ctx: &TenantContext,
        payment_id: PaymentId,
        requests: Vec<AllocationRequest>,
    ) -> Result<AllocationPlan, BooksError> {
        self.run(ctx, payment_id, AllocationInstruction::Explicit(requests), "allocations.allocate")
            .await
    }

    /// Applies the payment greedily over `candidates` in the order given.
    /// Whatever is left stays on account.
    pub async fn auto_allocate(
        &self,
        ctx: &TenantContext,
        payment_id: PaymentId,
        candidates: Vec<DocumentId>,
    ) -> Result<AllocationPlan, BooksError> {
        self.run(ctx, payment_id, AllocationInstruction::Auto(candidates), "allocations.auto_allocate")
            .await
    }

    /// Applies the payment greedily over its counterparty's open documents,
    /// oldest first.
    pub async fn auto_allocate_open(
        &self,
        ctx: &TenantContext,
        payment_id: PaymentId,
    ) -> Result<AllocationPlan, BooksError> {
        self.run(ctx, payment_id, AllocationInstruction::AutoOpen, "allocations.auto_allocate_open")
            .await
    }

    /// Loads one payment with its allocations.
    pub async fn get_payment(&self, ctx: &TenantContext, id: PaymentId) -> Result<Payment, BooksError> {
        self.store.find_payment(ctx, id).await
    }

    async fn run(
        &self,
        ctx: &TenantContext,
        payment_id: PaymentId,
        instruction: AllocationInstruction,
        operation: &'static str,
    ) -> Result<AllocationPlan, BooksError> {
        let plan = self
            .store
            .allocate(ctx, payment_id, instruction, self.clock.now())
            .await
            .inspect_err(|err| report(operation, ctx, err))?;
        let applied: Decimal = plan.allocations.iter().map(|a| a.amount).sum();
        info!(
            tenant_id = %ctx.tenant_id(),
            payment_id = %payment_id,
            applied = %applied,
            documents = plan.documents.len(),
            remaining = %plan.remaining(),
            "allocation applied"
        );
        Ok(plan)
    }
}
