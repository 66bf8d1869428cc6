//! Line pricing and document totals.
//!
//! Rounding happens once per line, so the subtotal is an exact sum of the
//! rounded line totals and never needs rounding itself.

use rust_decimal::Decimal;

use bookwell_shared::types::LineItemId;
use bookwell_shared::types::money::round_money;

use crate::document::types::{LineItem, LineItemInput};
use crate::error::BooksError;

/// Monetary totals of a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    /// Σ line totals.
    pub subtotal: Decimal,
    /// Σ line taxes.
    pub tax_amount: Decimal,
    /// `subtotal + tax_amount`.
    pub total: Decimal,
}

/// Validates and prices one line.
///
/// # Errors
///
/// Returns `Validation` for a blank description, a non-positive quantity, a
/// negative price, or a tax rate outside `0..=100`.
pub fn price_line(position: u32, input: &LineItemInput) -> Result<LineItem, BooksError> {
    let description = input.description.trim();
    if description.is_empty() {
        return Err(line_error(position, "description is required"));
    }
    if input.quantity <= Decimal::ZERO {
        return Err(line_error(position, "quantity must be positive"));
    }
    if input.unit_price < Decimal::ZERO {
        return Err(line_error(position, "unit price cannot be negative"));
    }
    if input.tax_rate < Decimal::ZERO || input.tax_rate > Decimal::ONE_HUNDRED {
        return Err(line_error(position, "tax rate must be between 0 and 100"));
    }

    let line_total = input
        .quantity
        .checked_mul(input.unit_price)
        .map(round_money)
        .ok_or_else(|| line_error(position, "amount out of range"))?;
    let tax_amount = line_total
        .checked_mul(input.tax_rate)
        .and_then(|taxed| taxed.checked_div(Decimal::ONE_HUNDRED))
        .map(round_money)
        .ok_or_else(|| line_error(position, "amount out of range"))?;

    Ok(LineItem {
        id: LineItemId::new(),
        position,
        description: description.to_string(),
        quantity: input.quantity,
        unit_price: input.unit_price,
        tax_rate: input.tax_rate,
        line_total,
        tax_amount,
    })
}

/// Prices every line, numbering positions from 1.
///
/// # Errors
///
/// Returns `Validation` if there are no lines or any line is invalid.
pub fn price_lines(inputs: &[LineItemInput]) -> Result<Vec<LineItem>, BooksError> {
    if inputs.is_empty() {
        return Err(BooksError::Validation(
            "a document needs at least one line".into(),
        ));
    }
    inputs
        .iter()
        .zip(1u32..)
        .map(|(input, position)| price_line(position, input))
        .collect()
}

/// Sums priced lines.
///
/// # Errors
///
/// Returns `Validation` if a sum leaves the representable range.
pub fn compute_totals(lines: &[LineItem]) -> Result<Totals, BooksError> {
    let mut subtotal = Decimal::ZERO;
    let mut tax_amount = Decimal::ZERO;
    for line in lines {
        subtotal = subtotal
            .checked_add(line.line_total)
            .ok_or_else(BooksError::out_of_range)?;
        tax_amount = tax_amount
            .checked_add(line.tax_amount)
            .ok_or_else(BooksError::out_of_range)?;
    }
    let total = subtotal
        .checked_add(tax_amount)
        .ok_or_else(BooksError::out_of_range)?;
    Ok(Totals {
        subtotal,
        tax_amount,
        total,
    })
}

fn line_error(position: u32, message: &str) -> BooksError {
    BooksError::Validation(format!("line {position}: {message}"))
}
