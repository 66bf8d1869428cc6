//! Reconciliation matcher.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::info;

use bookwell_core::reconciliation::{
    BankAccount, BankTransaction, ReconciliationReport, ReconciliationRequest,
    ReconciliationService,
};
use bookwell_core::{BooksError, Clock, TenantContext};
use bookwell_shared::types::{BankAccountId, BankTransactionId, LedgerAccountId};

use super::report;
use crate::store::BankRepository;

/// Bank accounts, their lines, and statement reconciliation.
pub struct ReconciliationMatcher<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: BankRepository> ReconciliationMatcher<S> {
    /// Creates a matcher over `store`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Opens a bank account linked to a general-ledger account.
    pub async fn open_bank_account(
        &self,
        ctx: &TenantContext,
        name: &str,
        ledger_account_id: LedgerAccountId,
        opening_balance: Decimal,
    ) -> Result<BankAccount, BooksError> {
        let account = BankAccount::new(ctx, name, ledger_account_id, opening_balance, self.clock.now())?;
        self.store.insert_bank_account(ctx, &account).await?;
        info!(tenant_id = %ctx.tenant_id(), bank_account_id = %account.id, "bank account opened");
        Ok(account)
    }

    /// Loads one bank account.
    pub async fn get_bank_account(&self, ctx: &TenantContext, id: BankAccountId) -> Result<BankAccount, BooksError> {
        self.store.find_bank_account(ctx, id).await
    }

    /// Posts a manual line. Deposits are positive.
    pub async fn record_transaction(
        &self,
        ctx: &TenantContext,
        account: BankAccountId,
        date: NaiveDate,
        amount: Decimal,
        description: &str,
    ) -> Result<BankTransaction, BooksError> {
        let account = self.store.find_bank_account(ctx, account).await?;
        let line = BankTransaction::new(&account, date, amount, description, self.clock.now())?;
        self.store
            .insert_bank_transaction(ctx, &line)
            .await
            .inspect_err(|err| report("bank.record_transaction", ctx, err))?;
        info!(
            tenant_id = %ctx.tenant_id(),
            bank_account_id = %account.id,
            bank_transaction_id = %line.id,
            amount = %line.amount,
            "bank transaction recorded"
        );
        Ok(line)
    }

    /// Removes a line from the book balance.
    pub async fn void_transaction(
        &self,
        ctx: &TenantContext,
        id: BankTransactionId,
    ) -> Result<BankTransaction, BooksError> {
        let line = self
            .store
            .void_bank_transaction(ctx, id, self.clock.now())
            .await
            .inspect_err(|err| report("bank.void_transaction", ctx, err))?;
        info!(tenant_id = %ctx.tenant_id(), bank_transaction_id = %id, "bank transaction voided");
        Ok(line)
    }

    /// Every line of the account, by value date.
    pub async fn transactions(
        &self,
        ctx: &TenantContext,
        account: BankAccountId,
    ) -> Result<Vec<BankTransaction>, BooksError> {
        self.store.bank_transactions(ctx, account).await
    }

    /// Opening balance plus posted lines dated on or before `as_of`.
    pub async fn book_balance(
        &self,
        ctx: &TenantContext,
        account: BankAccountId,
        as_of: NaiveDate,
    ) -> Result<Decimal, BooksError> {
        let account = self.store.find_bank_account(ctx, account).await?;
        let lines = self.store.bank_transactions(ctx, account.id).await?;
        Ok(ReconciliationService::book_balance(&account, &lines, as_of))
    }

    /// Compares a statement with the books and stores the run.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown account or a marked line of another account
    /// - `Validation` for a void or post-dated marked line
    pub async fn reconcile(
        &self,
        ctx: &TenantContext,
        request: &ReconciliationRequest,
    ) -> Result<ReconciliationReport, BooksError> {
        let account = self.store.find_bank_account(ctx, request.bank_account_id).await?;
        let lines = self.store.bank_transactions(ctx, account.id).await?;
        let run = ReconciliationService::reconcile(&account, &lines, request, self.clock.now())
            .inspect_err(|err| report("bank.reconcile", ctx, err))?;
        self.store.insert_reconciliation(ctx, &run).await?;
        info!(
            tenant_id = %ctx.tenant_id(),
            bank_account_id = %account.id,
            as_of = %run.as_of,
            book_balance = %run.book_balance,
            difference = %run.difference,
            balanced = run.is_balanced,
            "reconciliation run"
        );
        Ok(run)
    }

    /// Past runs for the account, newest first.
    pub async fn history(
        &self,
        ctx: &TenantContext,
        account: BankAccountId,
    ) -> Result<Vec<ReconciliationReport>, BooksError> {
        self.store.reconciliations(ctx, account).await
    }
}
