//! Fixed-point currency amounts.
//!
//! Amounts cross the action boundary as [`Decimal`] values with two fractional
//! digits and are stored as signed integer minor units (cents).

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, prelude::ToPrimitive};

/// Number of fractional digits carried by every stored amount.
pub const SCALE: u32 = 2;

/// Converts a decimal amount to minor units.
///
/// Fails with [`Error::InvalidAmount`] when the value has more than two
/// fractional digits or does not fit in an `i64`.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    if amount.normalize().scale() > SCALE {
        return Err(Error::InvalidAmount { amount });
    }

    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.trunc().to_i64())
        .ok_or(Error::InvalidAmount { amount })
}

/// Converts a strictly positive decimal amount to minor units.
pub fn positive_minor_units(amount: Decimal) -> Result<i64> {
    let cents = to_minor_units(amount)?;
    if cents <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(cents)
}

/// Converts integer cents back to a two-digit `Decimal`.
#[must_use]
pub fn from_minor_units(cents: i64) -> Decimal {
    Decimal::new(cents, SCALE)
}

/// Formats minor units for display, e.g. `$60.00` or `-$40.00`.
#[must_use]
pub fn format_minor_units(cents: i64) -> String {
    format_decimal(from_minor_units(cents))
}

/// Formats a `Decimal` amount with a dollar sign and two digits.
#[must_use]
pub fn format_decimal(amount: Decimal) -> String {
    if amount.is_sign_negative() && !amount.is_zero() {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount.abs())
    }
}
