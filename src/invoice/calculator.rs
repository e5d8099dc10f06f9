//! Line-item and totals arithmetic for the invoice form.
//!
//! Every function here is pure: it takes the current items and scalars
//! and returns new values. Currency outputs carry exactly two decimal
//! places, rounded half away from zero.
//!
//! Numeric input is read with a magnitude cap of [`MAX_INPUT`]; anything
//! larger, including text too long to parse, saturates to the cap. With
//! every operand capped, products and sums stay far inside `Decimal`
//! range, so `total == subtotal + tax - discount` holds exactly.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, TrackerError};

/// Largest magnitude a quantity, price, rate or discount is read as
/// (99,999,999,999.99)
pub const MAX_INPUT: Decimal = Decimal::from_parts(1_316_134_911, 2_328, 0, false, 2);

/// Integer digits in [`MAX_INPUT`]
const MAX_INTEGER_DIGITS: usize = 11;

/// One row of an invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Always `round2(quantity * unit_price)`; never set directly.
    pub amount: Decimal,
}

impl Default for LineItem {
    fn default() -> Self {
        Self {
            description: String::new(),
            quantity: Decimal::ONE,
            unit_price: Decimal::ZERO,
            amount: round2(Decimal::ZERO),
        }
    }
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        let quantity = quantity.clamp(Decimal::ZERO, MAX_INPUT);
        let unit_price = unit_price.clamp(Decimal::ZERO, MAX_INPUT);
        Self {
            description: description.into(),
            quantity,
            unit_price,
            amount: line_amount(quantity, unit_price),
        }
    }

    pub fn has_description(&self) -> bool {
        !self.description.trim().is_empty()
    }
}

/// Editable columns of a line item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Description,
    Quantity,
    UnitPrice,
}

/// Aggregate figures derived from the items, tax rate and discount
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
}

impl Default for InvoiceTotals {
    fn default() -> Self {
        recalculate_totals(&[], "0", "0")
    }
}

/// Round to two places, half away from zero, and pin the scale to 2 so
/// the value always renders as `x.yy`.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// Parse the leading numeric part of `input`, falling back to zero.
///
/// Accepts an optional sign, digits and one decimal point, so `"12abc"`
/// reads as 12 and `"abc"` or `""` read as 0. The result is capped at
/// plus or minus [`MAX_INPUT`].
pub fn coerce_decimal(input: &str) -> Decimal {
    let trimmed = input.trim();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '+' | '-' if idx == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = idx + ch.len_utf8();
    }

    if !seen_digit {
        return Decimal::ZERO;
    }

    let prefix = trimmed[..end].trim_end_matches('.');
    let (negative, unsigned) = match prefix.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, prefix.strip_prefix('+').unwrap_or(prefix)),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let whole = whole.trim_start_matches('0');

    let magnitude = if whole.len() > MAX_INTEGER_DIGITS {
        MAX_INPUT
    } else {
        // Digits past the tenth decimal place can't change a 2dp result
        let fraction = &fraction[..fraction.len().min(10)];
        let text = format!("{}.{}", if whole.is_empty() { "0" } else { whole }, fraction);
        Decimal::from_str(text.trim_end_matches('.'))
            .unwrap_or(Decimal::ZERO)
            .min(MAX_INPUT)
    };

    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// `round2(quantity * unit_price)`, saturating instead of overflowing
pub fn line_amount(quantity: Decimal, unit_price: Decimal) -> Decimal {
    round2(quantity.saturating_mul(unit_price))
}

/// Like [`coerce_decimal`] but negative input reads as zero.
pub fn coerce_non_negative(input: &str) -> Decimal {
    coerce_decimal(input).max(Decimal::ZERO)
}

/// Replace one field of one item, recomputing its amount when a numeric
/// field changed. The input slice is left untouched.
pub fn update_item(
    items: &[LineItem],
    index: usize,
    field: ItemField,
    value: &str,
) -> Result<Vec<LineItem>> {
    if index >= items.len() {
        return Err(TrackerError::ItemIndexOutOfRange {
            index,
            len: items.len(),
        });
    }

    let mut updated = items.to_vec();
    let item = &mut updated[index];
    match field {
        ItemField::Description => item.description = value.to_string(),
        ItemField::Quantity => item.quantity = coerce_non_negative(value),
        ItemField::UnitPrice => item.unit_price = coerce_non_negative(value),
    }

    if field != ItemField::Description {
        item.amount = line_amount(item.quantity, item.unit_price);
    }

    Ok(updated)
}

/// Append a blank item (quantity 1, price 0)
pub fn add_item(items: &[LineItem]) -> Vec<LineItem> {
    let mut updated = items.to_vec();
    updated.push(LineItem::default());
    updated
}

/// Drop the item at `index`. The last remaining item cannot be removed.
pub fn remove_item(items: &[LineItem], index: usize) -> Result<Vec<LineItem>> {
    if items.len() == 1 {
        return Err(TrackerError::LastItemRequired);
    }
    if index >= items.len() {
        return Err(TrackerError::ItemIndexOutOfRange {
            index,
            len: items.len(),
        });
    }

    Ok(items
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, item)| item.clone())
        .collect())
}

/// Compute subtotal, tax and total.
///
/// `tax_rate` is a percentage clamped to 0..=100 and `discount` is
/// clamped to zero or more; both coerce unparseable input to zero. The
/// total is allowed to go negative when the discount exceeds subtotal
/// plus tax.
pub fn recalculate_totals(items: &[LineItem], tax_rate: &str, discount: &str) -> InvoiceTotals {
    let tax_rate = coerce_decimal(tax_rate).clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
    let discount = coerce_non_negative(discount);

    let subtotal = round2(
        items
            .iter()
            .fold(Decimal::ZERO, |acc, item| acc.saturating_add(item.amount)),
    );
    let tax_amount = round2(subtotal.saturating_mul(tax_rate) / Decimal::ONE_HUNDRED);
    let total_amount = round2(subtotal.saturating_add(tax_amount).saturating_sub(discount));

    InvoiceTotals {
        subtotal,
        tax_rate,
        tax_amount,
        discount_amount: discount,
        total_amount,
    }
}
