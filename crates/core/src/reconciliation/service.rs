//! Book-versus-statement comparison.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use bookwell_shared::types::money::{is_money_scaled, is_negligible};
use bookwell_shared::types::{BankTransactionId, ReconciliationId};

use crate::error::BooksError;
use crate::reconciliation::types::{
    BankAccount, BankTransaction, BankTransactionStatus, ReconciliationReport,
    ReconciliationRequest,
};

/// Stateless reconciliation calculator.
pub struct ReconciliationService;

impl ReconciliationService {
    /// Opening balance plus every posted line dated on or before `as_of`.
    #[must_use]
    pub fn book_balance(
        account: &BankAccount,
        transactions: &[BankTransaction],
        as_of: NaiveDate,
    ) -> Decimal {
        account.opening_balance
            + transactions
                .iter()
                .filter(|tx| tx.bank_account_id == account.id && tx.counts_on(as_of))
                .map(|tx| tx.amount)
                .sum::<Decimal>()
    }

    /// Compares the statement with the books. Marks never move the book
    /// balance; they only feed `cleared_balance` and the uncleared count.
    ///
    /// # Errors
    ///
    /// - `Validation` if the statement balance has sub-cent digits, or a
    ///   marked line is void or dated after `as_of`
    /// - `NotFound` if a marked line does not belong to the account
    pub fn reconcile(
        account: &BankAccount,
        transactions: &[BankTransaction],
        request: &ReconciliationRequest,
        now: DateTime<Utc>,
    ) -> Result<ReconciliationReport, BooksError> {
        if request.bank_account_id != account.id {
            return Err(BooksError::Internal(
                "reconciliation request and account disagree".into(),
            ));
        }
        if !is_money_scaled(request.statement_balance) {
            return Err(BooksError::Validation(format!(
                "statement balance {} has sub-cent digits",
                request.statement_balance
            )));
        }

        let own: BTreeMap<BankTransactionId, &BankTransaction> = transactions
            .iter()
            .filter(|tx| tx.bank_account_id == account.id && tx.tenant_id == account.tenant_id)
            .map(|tx| (tx.id, tx))
            .collect();

        let mut seen = HashSet::new();
        let mut marked_ids = Vec::new();
        let mut cleared = Decimal::ZERO;
        for id in &request.marked_ids {
            if !seen.insert(*id) {
                continue;
            }
            let tx = own
                .get(id)
                .ok_or_else(|| BooksError::not_found("bank transaction", *id))?;
            if tx.status == BankTransactionStatus::Void {
                return Err(BooksError::Validation(format!(
                    "bank transaction {id} is void and cannot be marked"
                )));
            }
            if tx.date > request.as_of {
                return Err(BooksError::Validation(format!(
                    "bank transaction {id} is dated {} after the statement date {}",
                    tx.date, request.as_of
                )));
            }
            cleared += tx.amount;
            marked_ids.push(*id);
        }

        let book_balance = Self::book_balance(account, transactions, request.as_of);
        let difference = request.statement_balance - book_balance;
        let uncleared_count = own
            .values()
            .filter(|tx| tx.counts_on(request.as_of) && !seen.contains(&tx.id))
            .count();

        Ok(ReconciliationReport {
            id: ReconciliationId::new(),
            tenant_id: account.tenant_id,
            bank_account_id: account.id,
            as_of: request.as_of,
            statement_balance: request.statement_balance,
            book_balance,
            difference,
            is_balanced: is_negligible(difference),
            cleared_balance: account.opening_balance + cleared,
            marked_ids,
            uncleared_count,
            created_at: now,
        })
    }
}
