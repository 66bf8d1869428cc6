//! Document domain types.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bookwell_shared::types::{CounterpartyId, DocumentId, LineItemId, TenantId};

use crate::numbering::Series;
use crate::tenant::TenantOwned;

/// The kind of commercial document. All kinds share one lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Sales invoice issued to a customer.
    Invoice,
    /// Invoice received from a supplier.
    PurchaseInvoice,
    /// Credit note; settled by paying it out.
    CreditNote,
    /// Delivery order; carries totals but is never settled.
    DeliveryOrder,
}

impl DocumentKind {
    /// Every kind.
    pub const ALL: [Self; 4] = [
        Self::Invoice,
        Self::PurchaseInvoice,
        Self::CreditNote,
        Self::DeliveryOrder,
    ];

    /// Kinds settled from `side`.
    #[must_use]
    pub fn settled_by(side: SettlementSide) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|kind| kind.settlement_side() == Some(side))
            .collect()
    }

    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::PurchaseInvoice => "purchase_invoice",
            Self::CreditNote => "credit_note",
            Self::DeliveryOrder => "delivery_order",
        }
    }

    /// Parses a kind from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invoice" => Some(Self::Invoice),
            "purchase_invoice" => Some(Self::PurchaseInvoice),
            "credit_note" => Some(Self::CreditNote),
            "delivery_order" => Some(Self::DeliveryOrder),
            _ => None,
        }
    }

    /// Numbering series for this kind.
    #[must_use]
    pub const fn series(&self) -> Series {
        match self {
            Self::Invoice => Series::Invoice,
            Self::PurchaseInvoice => Series::PurchaseInvoice,
            Self::CreditNote => Series::CreditNote,
            Self::DeliveryOrder => Series::DeliveryOrder,
        }
    }

    /// Which side of the books settles this kind, if any.
    #[must_use]
    pub const fn settlement_side(&self) -> Option<SettlementSide> {
        match self {
            Self::Invoice => Some(SettlementSide::Receivable),
            Self::PurchaseInvoice | Self::CreditNote => Some(SettlementSide::Payable),
            Self::DeliveryOrder => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receivable documents are settled by receipts, payable ones by payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementSide {
    /// Money owed to the tenant.
    Receivable,
    /// Money the tenant owes.
    Payable,
}

/// Document status.
///
/// Valid transitions:
/// - Draft → Posted (post)
/// - Posted → PartiallyPaid | Paid (allocation)
/// - PartiallyPaid → Paid (allocation)
/// - Posted | PartiallyPaid → Void (void)
///
/// Drafts may also be deleted outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Editable, unnumbered.
    Draft,
    /// Numbered, nothing paid.
    Posted,
    /// Numbered, part paid.
    PartiallyPaid,
    /// Fully settled.
    Paid,
    /// Cancelled; terminal.
    Void,
}

impl DocumentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::PartiallyPaid => "partially_paid",
            Self::Paid => "paid",
            Self::Void => "void",
        }
    }

    /// Parses a status from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "posted" => Some(Self::Posted),
            "partially_paid" => Some(Self::PartiallyPaid),
            "paid" => Some(Self::Paid),
            "void" => Some(Self::Void),
            _ => None,
        }
    }

    /// Returns true if money can still be allocated against the document.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Posted | Self::PartiallyPaid)
    }

    /// Returns true if the status can move to `to`.
    #[must_use]
    pub const fn can_transition_to(&self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Posted)
                | (Self::Posted, Self::PartiallyPaid | Self::Paid | Self::Void)
                | (Self::PartiallyPaid, Self::PartiallyPaid | Self::Paid | Self::Void)
        )
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemInput {
    /// What is being sold or bought.
    pub description: String,
    /// Quantity; may be fractional.
    pub quantity: Decimal,
    /// Price per unit before tax.
    pub unit_price: Decimal,
    /// Tax rate in percent (`11` means 11%).
    pub tax_rate: Decimal,
}

impl LineItemInput {
    /// Convenience constructor.
    pub fn new(
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            tax_rate,
        }
    }
}

/// A priced line on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line ID.
    pub id: LineItemId,
    /// One-based position on the document.
    pub position: u32,
    /// Description.
    pub description: String,
    /// Quantity.
    pub quantity: Decimal,
    /// Price per unit before tax.
    pub unit_price: Decimal,
    /// Tax rate in percent.
    pub tax_rate: Decimal,
    /// `round(quantity × unit_price)`.
    pub line_total: Decimal,
    /// `round(line_total × tax_rate / 100)`.
    pub tax_amount: Decimal,
}

/// Input for creating a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftInput {
    /// Document kind.
    pub kind: DocumentKind,
    /// Customer or supplier.
    pub counterparty_id: CounterpartyId,
    /// Issue date.
    pub issue_date: NaiveDate,
    /// Due date; not before the issue date.
    pub due_date: NaiveDate,
    /// At least one line.
    pub lines: Vec<LineItemInput>,
    /// Free-text notes.
    pub notes: Option<String>,
}

/// A sales or purchase document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document ID.
    pub id: DocumentId,
    /// Owning tenant; never changes.
    pub tenant_id: TenantId,
    /// Kind.
    pub kind: DocumentKind,
    /// Customer or supplier.
    pub counterparty_id: CounterpartyId,
    /// Assigned at posting, immutable afterwards.
    pub number: Option<String>,
    /// Issue date.
    pub issue_date: NaiveDate,
    /// Due date.
    pub due_date: NaiveDate,
    /// Status.
    pub status: DocumentStatus,
    /// Σ line totals.
    pub subtotal: Decimal,
    /// Σ line taxes.
    pub tax_amount: Decimal,
    /// `subtotal + tax_amount`.
    pub total: Decimal,
    /// Amount settled so far; never decreases.
    pub paid_amount: Decimal,
    /// `total − paid_amount`, or zero once void.
    pub outstanding_amount: Decimal,
    /// Ordered lines.
    pub lines: Vec<LineItem>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Optimistic concurrency version, bumped on every write.
    pub version: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write.
    pub updated_at: DateTime<Utc>,
    /// When the document was posted.
    pub posted_at: Option<DateTime<Utc>>,
    /// When the document was voided.
    pub voided_at: Option<DateTime<Utc>>,
    /// Why the document was voided.
    pub void_reason: Option<String>,
}

impl TenantOwned for Document {
    const ENTITY: &'static str = "document";

    fn owner(&self) -> TenantId {
        self.tenant_id
    }

    fn resource_id(&self) -> Uuid {
        self.id.into_inner()
    }
}

/// Criteria for listing documents. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFilter {
    /// Only this kind.
    pub kind: Option<DocumentKind>,
    /// Only this status.
    pub status: Option<DocumentStatus>,
    /// Only this counterparty.
    pub counterparty_id: Option<CounterpartyId>,
    /// Issued on or after.
    pub issued_from: Option<NaiveDate>,
    /// Issued on or before.
    pub issued_to: Option<NaiveDate>,
    /// Only posted or partially paid documents.
    #[serde(default)]
    pub open_only: bool,
}

impl DocumentFilter {
    /// Returns true if `document` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        self.kind.is_none_or(|kind| document.kind == kind)
            && self.status.is_none_or(|status| document.status == status)
            && self
                .counterparty_id
                .is_none_or(|id| document.counterparty_id == id)
            && self.issued_from.is_none_or(|from| document.issue_date >= from)
            && self.issued_to.is_none_or(|to| document.issue_date <= to)
            && (!self.open_only || document.status.is_open())
    }
}
