//! Monetary derivation for invoices.
//!
//! Every derived figure goes through [`round2`] exactly once, at the step
//! that produces it: line totals, then the subtotal over the rounded line
//! totals, then tax and discount, then the grand total.

use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode};

use super::errors::DomainError;
use super::invoice::{LineItem, LineItemInput};

/// Digit limits of a `NUMERIC(p, s)` column: `p - s` integer digits and `s`
/// fractional digits.
#[derive(Debug, Clone, Copy)]
struct Bounds {
    integer_digits: i64,
    scale: i64,
}

/// Quantities, prices and raw tax/discount inputs, stored as `NUMERIC(18, 6)`.
const INPUT: Bounds = Bounds {
    integer_digits: 12,
    scale: 6,
};

/// Derived money, stored as `NUMERIC(14, 2)`.
const MONEY: Bounds = Bounds {
    integer_digits: 12,
    scale: 2,
};

/// Round to 2 decimal places, half away from zero.
pub fn round2(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

fn zero() -> BigDecimal {
    BigDecimal::from(0)
}

/// Whether `value` is representable within `bounds` without rounding.
///
/// Works on the digit string so that exponent forms like `1e10000000` are
/// judged without being expanded.
fn fits(value: &BigDecimal, bounds: Bounds) -> bool {
    let (unscaled, scale) = value.as_bigint_and_exponent();
    let digits = unscaled.magnitude().to_string();
    if digits == "0" {
        return true;
    }
    let trailing_zeros = digits.bytes().rev().take_while(|b| *b == b'0').count() as i64;
    let significant = digits.len() as i64 - trailing_zeros;
    let scale = scale - trailing_zeros;
    scale <= bounds.scale && significant - scale <= bounds.integer_digits
}

/// Parse a caller-supplied decimal and check it fits the input columns.
pub fn parse_amount(raw: &str, what: &str) -> Result<BigDecimal, DomainError> {
    let value = BigDecimal::from_str(raw.trim()).map_err(|_| {
        DomainError::validation(format!("{what} must be a decimal number, got '{raw}'"))
    })?;
    if !fits(&value, INPUT) {
        return Err(DomainError::validation(format!(
            "{what} must have at most {} integer and {} decimal digits",
            INPUT.integer_digits, INPUT.scale
        )));
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: BigDecimal,
    pub tax: BigDecimal,
    pub discount: BigDecimal,
    pub total: BigDecimal,
}

/// Items with their derived line totals plus the invoice aggregates.
#[derive(Debug, Clone)]
pub struct Priced {
    pub items: Vec<LineItem>,
    pub totals: Totals,
}

/// Validate item inputs and derive every monetary field.
///
/// Checks run in order and fail on the first violation: non-empty item
/// list, per-item name/quantity/price, non-negative tax and discount, then
/// derived amounts that would not fit a money column.
/// The discount-versus-subtotal bound is left to [`Totals::check_discount`]
/// so callers can interleave their own checks before it.
pub fn price_items(
    items: &[LineItemInput],
    tax: Option<&str>,
    discount: Option<&str>,
) -> Result<Priced, DomainError> {
    if items.is_empty() {
        return Err(DomainError::validation("At least one item is required"));
    }

    let mut priced = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let position = index + 1;
        let name = item.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation(format!(
                "Item {position} is missing a name"
            )));
        }
        let quantity = parse_amount(&item.quantity, &format!("Item {position} quantity"))?;
        if quantity <= zero() {
            return Err(DomainError::validation(format!(
                "Item {position} has an invalid quantity"
            )));
        }
        let price = parse_amount(&item.price, &format!("Item {position} price"))?;
        if price < zero() {
            return Err(DomainError::validation(format!(
                "Item {position} has an invalid price"
            )));
        }

        let total = round2(&(&quantity * &price));
        if !fits(&total, MONEY) {
            return Err(DomainError::validation(format!(
                "Item {position} total is too large"
            )));
        }

        priced.push(LineItem {
            name: name.to_string(),
            description: item
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            quantity,
            price,
            total,
        });
    }

    let tax = tax.map(|raw| parse_amount(raw, "Tax")).transpose()?.unwrap_or_else(zero);
    if tax < zero() {
        return Err(DomainError::validation("Tax cannot be negative"));
    }
    let discount = discount
        .map(|raw| parse_amount(raw, "Discount"))
        .transpose()?
        .unwrap_or_else(zero);
    if discount < zero() {
        return Err(DomainError::validation("Discount cannot be negative"));
    }

    let totals = Totals::derive(&priced, &tax, &discount);
    totals.check_bounds()?;
    Ok(Priced {
        items: priced,
        totals,
    })
}

impl Totals {
    pub fn derive(items: &[LineItem], tax: &BigDecimal, discount: &BigDecimal) -> Self {
        let subtotal = round2(&items.iter().fold(zero(), |acc, item| acc + &item.total));
        let tax = round2(tax);
        let discount = round2(discount);
        let total = round2(&(&subtotal + &tax - &discount));
        Totals {
            subtotal,
            tax,
            discount,
            total,
        }
    }

    fn check_bounds(&self) -> Result<(), DomainError> {
        let amounts = [&self.subtotal, &self.tax, &self.discount, &self.total];
        if amounts.into_iter().all(|amount| fits(amount, MONEY)) {
            Ok(())
        } else {
            Err(DomainError::validation("Invoice amounts are too large"))
        }
    }

    pub fn check_discount(&self) -> Result<(), DomainError> {
        if self.discount > self.subtotal {
            return Err(DomainError::validation(
                "Discount cannot be greater than subtotal",
            ));
        }
        Ok(())
    }
}
