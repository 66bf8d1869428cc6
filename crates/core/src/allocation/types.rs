//! Payment and allocation types.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bookwell_shared::types::money::is_money_scaled;
use bookwell_shared::types::{
    AllocationId, BankAccountId, CounterpartyId, DocumentId, PaymentId, TenantId,
};

use crate::document::SettlementSide;
use crate::error::BooksError;
use crate::numbering::Series;
use crate::tenant::{TenantContext, TenantOwned};

/// Direction of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Money received from a customer.
    Receipt,
    /// Money paid to a supplier.
    Payment,
}

impl PaymentKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Payment => "payment",
        }
    }

    /// Parses a kind from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "receipt" => Some(Self::Receipt),
            "payment" => Some(Self::Payment),
            _ => None,
        }
    }

    /// Numbering series for this kind.
    #[must_use]
    pub const fn series(&self) -> Series {
        match self {
            Self::Receipt => Series::Receipt,
            Self::Payment => Series::Payment,
        }
    }

    /// Which documents this kind may settle.
    #[must_use]
    pub const fn settles(&self) -> SettlementSide {
        match self {
            Self::Receipt => SettlementSide::Receivable,
            Self::Payment => SettlementSide::Payable,
        }
    }

    /// Signed bank movement for `amount`: deposits are positive.
    #[must_use]
    pub fn bank_amount(&self, amount: Decimal) -> Decimal {
        match self {
            Self::Receipt => amount,
            Self::Payment => -amount,
        }
    }
}

impl fmt::Display for PaymentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the money moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash.
    Cash,
    /// Bank transfer.
    BankTransfer,
    /// Card.
    Card,
    /// Cheque.
    Cheque,
    /// Anything else.
    Other,
}

impl PaymentMethod {
    /// Returns the string representation of the method.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::Card => "card",
            Self::Cheque => "cheque",
            Self::Other => "other",
        }
    }

    /// Parses a method from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(Self::Cash),
            "bank_transfer" => Some(Self::BankTransfer),
            "card" => Some(Self::Card),
            "cheque" => Some(Self::Cheque),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Input for recording a payment or receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPaymentInput {
    /// Receipt or payment.
    pub kind: PaymentKind,
    /// Customer or supplier.
    pub counterparty_id: CounterpartyId,
    /// Value date.
    pub date: NaiveDate,
    /// Total amount, positive, in cents.
    pub amount: Decimal,
    /// How the money moved.
    pub method: PaymentMethod,
    /// Free-text reference (bank reference, cheque number).
    pub reference: Option<String>,
    /// Bank account the money moved through, if any.
    pub bank_account_id: Option<BankAccountId>,
}

impl RecordPaymentInput {
    /// Validates the input before any number is reserved.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the amount is not positive or has sub-cent digits.
    pub fn validate(&self) -> Result<(), BooksError> {
        if self.amount <= Decimal::ZERO || !is_money_scaled(self.amount) {
            return Err(BooksError::Validation(format!(
                "payment amount must be a positive amount in cents, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

/// One requested (document, amount) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    /// Target document.
    pub document_id: DocumentId,
    /// Amount to apply.
    pub amount: Decimal,
}

impl AllocationRequest {
    /// Convenience constructor.
    #[must_use]
    pub const fn new(document_id: DocumentId, amount: Decimal) -> Self {
        Self {
            document_id,
            amount,
        }
    }
}

/// Part of a payment applied to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Allocation ID.
    pub id: AllocationId,
    /// Owning payment.
    pub payment_id: PaymentId,
    /// Target document; not owned.
    pub document_id: DocumentId,
    /// Amount applied.
    pub amount: Decimal,
    /// When it was applied.
    pub allocated_at: DateTime<Utc>,
}

/// A recorded payment or receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment ID.
    pub id: PaymentId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Receipt or payment.
    pub kind: PaymentKind,
    /// Number from the receipt or payment series.
    pub number: String,
    /// Customer or supplier.
    pub counterparty_id: CounterpartyId,
    /// Value date.
    pub date: NaiveDate,
    /// Total amount.
    pub amount: Decimal,
    /// How the money moved.
    pub method: PaymentMethod,
    /// Free-text reference.
    pub reference: Option<String>,
    /// Bank account, if any.
    pub bank_account_id: Option<BankAccountId>,
    /// Ordered allocations.
    pub allocations: Vec<Allocation>,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write.
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Builds a payment from validated input and its reserved number.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the input is invalid.
    pub fn new(
        ctx: &TenantContext,
        input: RecordPaymentInput,
        number: String,
        now: DateTime<Utc>,
    ) -> Result<Self, BooksError> {
        input.validate()?;
        Ok(Self {
            id: PaymentId::new(),
            tenant_id: ctx.tenant_id(),
            kind: input.kind,
            number,
            counterparty_id: input.counterparty_id,
            date: input.date,
            amount: input.amount,
            method: input.method,
            reference: input
                .reference
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            bank_account_id: input.bank_account_id,
            allocations: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// Sum of all allocations.
    #[must_use]
    pub fn allocated_amount(&self) -> Decimal {
        self.allocations.iter().map(|a| a.amount).sum()
    }

    /// The on-account remainder.
    #[must_use]
    pub fn unallocated_amount(&self) -> Decimal {
        self.amount - self.allocated_amount()
    }

    /// Sum of allocations against one document.
    #[must_use]
    pub fn allocated_to(&self, document_id: DocumentId) -> Decimal {
        self.allocations
            .iter()
            .filter(|a| a.document_id == document_id)
            .map(|a| a.amount)
            .sum()
    }
}

impl TenantOwned for Payment {
    const ENTITY: &'static str = "payment";

    fn owner(&self) -> TenantId {
        self.tenant_id
    }

    fn resource_id(&self) -> Uuid {
        self.id.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input(amount: Decimal) -> RecordPaymentInput {
        RecordPaymentInput {
            kind: PaymentKind::Receipt,
            counterparty_id: CounterpartyId::new(),
            date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            amount,
            method: PaymentMethod::BankTransfer,
            reference: Some("  TRX-1  ".into()),
            bank_account_id: None,
        }
    }

    #[test]
    fn test_new_payment_is_fully_unallocated() {
        let ctx = TenantContext::new(TenantId::new());
        let payment = Payment::new(&ctx, input(dec!(500.00)), "RCT-000001".into(), Utc::now())
            .unwrap();
        assert_eq!(payment.unallocated_amount(), dec!(500.00));
        assert_eq!(payment.reference.as_deref(), Some("TRX-1"));
        assert_eq!(payment.tenant_id, ctx.tenant_id());
    }

    #[test]
    fn test_invalid_amounts() {
        assert!(input(dec!(0)).validate().is_err());
        assert!(input(dec!(-5)).validate().is_err());
        assert!(input(dec!(1.005)).validate().is_err());
        assert!(input(dec!(1.50)).validate().is_ok());
    }

    #[test]
    fn test_kind_sides_and_bank_sign() {
        assert_eq!(PaymentKind::Receipt.settles(), SettlementSide::Receivable);
        assert_eq!(PaymentKind::Payment.settles(), SettlementSide::Payable);
        assert_eq!(PaymentKind::Receipt.bank_amount(dec!(10)), dec!(10));
        assert_eq!(PaymentKind::Payment.bank_amount(dec!(10)), dec!(-10));
        assert_eq!(PaymentKind::parse("receipt"), Some(PaymentKind::Receipt));
        assert_eq!(PaymentMethod::parse("bank_transfer"), Some(PaymentMethod::BankTransfer));
    }
}
