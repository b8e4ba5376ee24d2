//! Money helpers.
//!
//! Amounts are `rust_decimal::Decimal` so that totals never drift the way
//! binary floats do. Decimal arithmetic panics on overflow, so anything built
//! from user input goes through the checked helpers here.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Monetary amount (currency-agnostic).
pub type Money = Decimal;

/// Largest accepted price, cost or discount: 10^12.
pub const MAX_AMOUNT: Money = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Round to cents using banker's rounding.
pub fn round(amount: Money) -> Money {
    amount.round_dp(2)
}

fn out_of_range() -> DomainError {
    DomainError::validation("amount is out of range")
}

/// `quantity * unit_price`, rounded to cents.
pub fn line_total(quantity: u32, unit_price: Money) -> DomainResult<Money> {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .map(round)
        .ok_or_else(out_of_range)
}

/// Sum that fails instead of overflowing.
pub fn checked_sum<I>(amounts: I) -> DomainResult<Money>
where
    I: IntoIterator<Item = Money>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v).ok_or_else(out_of_range))
}

pub fn ensure_non_negative(field: &str, amount: Money) -> DomainResult<Money> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(amount)
}

/// A non-negative amount no larger than [`MAX_AMOUNT`], rounded to cents.
pub fn ensure_amount(field: &str, amount: Money) -> DomainResult<Money> {
    let amount = ensure_non_negative(field, amount)?;
    if amount > MAX_AMOUNT {
        return Err(DomainError::validation(format!("{field} cannot exceed {MAX_AMOUNT}")));
    }
    Ok(round(amount))
}
