//! Bank account and reconciliation types.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bookwell_shared::types::money::is_money_scaled;
use bookwell_shared::types::{
    BankAccountId, BankTransactionId, LedgerAccountId, PaymentId, ReconciliationId, TenantId,
};

use crate::allocation::Payment;
use crate::error::BooksError;
use crate::tenant::{TenantContext, TenantOwned};

/// A bank account tracked in the books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Bank account ID.
    pub id: BankAccountId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// The general-ledger account this bank account posts to.
    pub ledger_account_id: LedgerAccountId,
    /// Balance before the first recorded transaction.
    pub opening_balance: Decimal,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl BankAccount {
    /// Opens a bank account for the context's tenant.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank name or a sub-cent opening balance.
    pub fn new(
        ctx: &TenantContext,
        name: &str,
        ledger_account_id: LedgerAccountId,
        opening_balance: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Self, BooksError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(BooksError::Validation("bank account name is required".into()));
        }
        if !is_money_scaled(opening_balance) {
            return Err(BooksError::Validation(format!(
                "opening balance {opening_balance} has sub-cent digits"
            )));
        }
        Ok(Self {
            id: BankAccountId::new(),
            tenant_id: ctx.tenant_id(),
            name: name.to_string(),
            ledger_account_id,
            opening_balance,
            created_at: now,
        })
    }
}

impl TenantOwned for BankAccount {
    const ENTITY: &'static str = "bank account";

    fn owner(&self) -> TenantId {
        self.tenant_id
    }

    fn resource_id(&self) -> Uuid {
        self.id.into_inner()
    }
}

/// Whether a bank line counts towards the book balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankTransactionStatus {
    /// Counts.
    Posted,
    /// Cancelled; ignored by balances.
    Void,
}

impl BankTransactionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Posted => "posted",
            Self::Void => "void",
        }
    }

    /// Parses a status from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "posted" => Some(Self::Posted),
            "void" => Some(Self::Void),
            _ => None,
        }
    }
}

impl fmt::Display for BankTransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One movement on a bank account. Deposits are positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTransaction {
    /// Transaction ID.
    pub id: BankTransactionId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Account the money moved through.
    pub bank_account_id: BankAccountId,
    /// Value date.
    pub date: NaiveDate,
    /// Signed amount.
    pub amount: Decimal,
    /// Description.
    pub description: String,
    /// Status.
    pub status: BankTransactionStatus,
    /// Payment that created this line, if any.
    pub payment_id: Option<PaymentId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// When the line was voided.
    pub voided_at: Option<DateTime<Utc>>,
}

impl BankTransaction {
    /// Records a manual bank line.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a zero or sub-cent amount or a blank description.
    pub fn new(
        account: &BankAccount,
        date: NaiveDate,
        amount: Decimal,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, BooksError> {
        if amount.is_zero() || !is_money_scaled(amount) {
            return Err(BooksError::Validation(format!(
                "bank transaction amount must be a non-zero amount in cents, got {amount}"
            )));
        }
        let description = description.trim();
        if description.is_empty() {
            return Err(BooksError::Validation(
                "bank transaction description is required".into(),
            ));
        }
        Ok(Self {
            id: BankTransactionId::new(),
            tenant_id: account.tenant_id,
            bank_account_id: account.id,
            date,
            amount,
            description: description.to_string(),
            status: BankTransactionStatus::Posted,
            payment_id: None,
            created_at: now,
            voided_at: None,
        })
    }

    /// The bank line produced by recording `payment` against `account`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the payment amount is invalid.
    pub fn for_payment(
        payment: &Payment,
        account: &BankAccount,
        now: DateTime<Utc>,
    ) -> Result<Self, BooksError> {
        let description = match &payment.reference {
            Some(reference) => format!("{} {reference}", payment.number),
            None => payment.number.clone(),
        };
        let mut line = Self::new(
            account,
            payment.date,
            payment.kind.bank_amount(payment.amount),
            &description,
            now,
        )?;
        line.payment_id = Some(payment.id);
        Ok(line)
    }

    /// Removes the line from the book balance.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if it is already void.
    pub fn void(&mut self, now: DateTime<Utc>) -> Result<(), BooksError> {
        if self.status == BankTransactionStatus::Void {
            return Err(BooksError::Validation(format!(
                "bank transaction {} is already void",
                self.id
            )));
        }
        self.status = BankTransactionStatus::Void;
        self.voided_at = Some(now);
        Ok(())
    }

    /// Returns true if the line counts towards balances on `as_of`.
    #[must_use]
    pub fn counts_on(&self, as_of: NaiveDate) -> bool {
        self.status == BankTransactionStatus::Posted && self.date <= as_of
    }
}

impl TenantOwned for BankTransaction {
    const ENTITY: &'static str = "bank transaction";

    fn owner(&self) -> TenantId {
        self.tenant_id
    }

    fn resource_id(&self) -> Uuid {
        self.id.into_inner()
    }
}

/// Input for a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationRequest {
    /// Account being reconciled.
    pub bank_account_id: BankAccountId,
    /// Statement date.
    pub as_of: NaiveDate,
    /// Closing balance on the bank statement.
    pub statement_balance: Decimal,
    /// Lines the user ticked as appearing on the statement.
    #[serde(default)]
    pub marked_ids: Vec<BankTransactionId>,
}

/// Result of a reconciliation run. Stored as history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// Run ID.
    pub id: ReconciliationId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Account reconciled.
    pub bank_account_id: BankAccountId,
    /// Statement date.
    pub as_of: NaiveDate,
    /// Closing balance on the statement.
    pub statement_balance: Decimal,
    /// Opening balance plus posted lines dated on or before `as_of`.
    pub book_balance: Decimal,
    /// `statement_balance − book_balance`.
    pub difference: Decimal,
    /// `|difference| < 0.01`.
    pub is_balanced: bool,
    /// Opening balance plus the marked lines.
    pub cleared_balance: Decimal,
    /// Marked lines, deduplicated, in request order.
    pub marked_ids: Vec<BankTransactionId>,
    /// Posted lines in range that were not marked.
    pub uncleared_count: usize,
    /// When the run happened.
    pub created_at: DateTime<Utc>,
}
