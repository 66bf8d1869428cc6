use std::fmt;

use serde::{Deserialize, Serialize};

use bookwell_shared::NumberingConfig;

use crate::error::BooksError;

/// Widest zero-padded suffix a format may ask for.
pub const MAX_WIDTH: usize = 12;

/// A numbering series. Each tenant has one independent counter per series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Series {
    /// Sales invoices.
    Invoice,
    /// Supplier invoices.
    PurchaseInvoice,
    /// Credit notes.
    CreditNote,
    /// Delivery orders.
    DeliveryOrder,
    /// Customer receipts.
    Receipt,
    /// Supplier payments.
    Payment,
}

impl Series {
    /// Every series, in storage order.
    pub const ALL: [Self; 6] = [
        Self::Invoice,
        Self::PurchaseInvoice,
        Self::CreditNote,
        Self::DeliveryOrder,
        Self::Receipt,
        Self::Payment,
    ];

    /// Returns the storage key of the series.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::PurchaseInvoice => "purchase_invoice",
            Self::CreditNote => "credit_note",
            Self::DeliveryOrder => "delivery_order",
            Self::Receipt => "receipt",
            Self::Payment => "payment",
        }
    }

    /// Parses a storage key.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|series| series.as_str() == s)
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a counter value is rendered: `prefix-000147`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    prefix: String,
    width: usize,
}

impl NumberFormat {
    /// Creates a format.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the width is outside `1..=MAX_WIDTH` or the
    /// prefix contains anything other than ASCII alphanumerics, `-`, `_`, `/`.
    pub fn new(prefix: &str, width: usize) -> Result<Self, BooksError> {
        if !(1..=MAX_WIDTH).contains(&width) {
            return Err(BooksError::Validation(format!(
                "number width must be between 1 and {MAX_WIDTH}, got {width}"
            )));
        }
        if let Some(bad) = prefix
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/')))
        {
            return Err(BooksError::Validation(format!(
                "number prefix {prefix:?} contains invalid character {bad:?}"
            )));
        }
        Ok(Self {
            prefix: prefix.to_string(),
            width,
        })
    }

    /// The prefix, without separator.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Zero-padding width of the numeric suffix.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Renders a counter value. Values wider than `width` are not truncated.
    #[must_use]
    pub fn render(&self, value: u64) -> String {
        let width = self.width;
        if self.prefix.is_empty() {
            format!("{value:0width$}")
        } else {
            format!("{}-{value:0width$}", self.prefix)
        }
    }
}

/// The configured format of every series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingScheme {
    invoice: NumberFormat,
    purchase_invoice: NumberFormat,
    credit_note: NumberFormat,
    delivery_order: NumberFormat,
    receipt: NumberFormat,
    payment: NumberFormat,
}

impl NumberingScheme {
    /// Builds the scheme from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if any prefix or the width is invalid.
    pub fn from_config(config: &NumberingConfig) -> Result<Self, BooksError> {
        let width = config.width;
        Ok(Self {
            invoice: NumberFormat::new(&config.invoice_prefix, width)?,
            purchase_invoice: NumberFormat::new(&config.purchase_invoice_prefix, width)?,
            credit_note: NumberFormat::new(&config.credit_note_prefix, width)?,
            delivery_order: NumberFormat::new(&config.delivery_order_prefix, width)?,
            receipt: NumberFormat::new(&config.receipt_prefix, width)?,
            payment: NumberFormat::new(&config.payment_prefix, width)?,
        })
    }

    /// Returns the format used for `series`.
    #[must_use]
    pub const fn format_for(&self, series: Series) -> &NumberFormat {
        match series {
            Series::Invoice => &self.invoice,
            Series::PurchaseInvoice => &self.purchase_invoice,
            Series::CreditNote => &self.credit_note,
            Series::DeliveryOrder => &self.delivery_order,
            Series::Receipt => &self.receipt,
            Series::Payment => &self.payment,
        }
    }
}

impl Default for NumberingScheme {
    fn default() -> Self {
        let width = 6;
        let format = |prefix: &str| NumberFormat {
            prefix: prefix.to_string(),
            width,
        };
        Self {
            invoice: format("INV"),
            purchase_invoice: format("PINV"),
            credit_note: format("CN"),
            delivery_order: format("DO"),
            receipt: format("RCT"),
            payment: format("PAY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("INV", 6, 147, "INV-000147")]
    #[case("PAY", 4, 1, "PAY-0001")]
    #[case("", 5, 42, "00042")]
    #[case("SO/2026", 3, 7, "SO/2026-007")]
    #[case("DO", 2, 12_345, "DO-12345")]
    fn test_render(
        #[case] prefix: &str,
        #[case] width: usize,
        #[case] value: u64,
        #[case] expected: &str,
    ) {
        let format = NumberFormat::new(prefix, width).unwrap();
        assert_eq!(format.render(value), expected);
    }

    #[rstest]
    #[case("INV", 0)]
    #[case("INV", 13)]
    #[case("IN V", 6)]
    #[case("INV#", 6)]
    fn test_invalid_formats(#[case] prefix: &str, #[case] width: usize) {
        assert!(matches!(
            NumberFormat::new(prefix, width),
            Err(BooksError::Validation(_))
        ));
    }

    #[test]
    fn test_series_round_trip_names() {
        for series in Series::ALL {
            assert_eq!(Series::parse(series.as_str()), Some(series));
        }
        assert_eq!(Series::parse("quote"), None);
    }

    #[test]
    fn test_scheme_from_config_matches_default() {
        let scheme = NumberingScheme::from_config(&NumberingConfig::default()).unwrap();
        assert_eq!(scheme, NumberingScheme::default());
        assert_eq!(scheme.format_for(Series::Receipt).render(3), "RCT-000003");
        assert_eq!(
            scheme.format_for(Series::PurchaseInvoice).render(10),
            "PINV-000010"
        );
    }

    #[test]
    fn test_scheme_rejects_bad_prefix() {
        let config = NumberingConfig {
            credit_note_prefix: "C N".into(),
            ..NumberingConfig::default()
        };
        assert!(NumberingScheme::from_config(&config).is_err());
    }
}
