//! Fixed-point conversion between off-chain decimal quantities and on-chain
//! base units.
//!
//! One precision factor, `10^FIXED_POINT_DECIMALS`, scales both the base
//! amount and the quote amount of a trade. Conversion is exact or it fails:
//! nothing is ever rounded, and no floating point is involved.

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::{Result, VeilError, constants::FIXED_POINT_DECIMALS};

/// Convert a non-negative decimal quantity into `U256` base units.
///
/// # Errors
/// `InvalidAmount` if the value is negative or carries more fractional
/// digits than the precision factor can represent.
pub fn to_base_units(value: Decimal) -> Result<U256> {
    if value < Decimal::ZERO {
        return Err(VeilError::InvalidAmount {
            reason: format!("negative amount {value}"),
        });
    }
    let normalized = value.normalize();
    let scale = normalized.scale();
    if scale > FIXED_POINT_DECIMALS {
        return Err(VeilError::InvalidAmount {
            reason: format!("{value} has {scale} fractional digits, max {FIXED_POINT_DECIMALS}"),
        });
    }
    let mantissa = u128::try_from(normalized.mantissa()).map_err(|_| VeilError::InvalidAmount {
        reason: format!("mantissa of {value} out of range"),
    })?;
    let factor = U256::from(10u64).pow(U256::from(FIXED_POINT_DECIMALS - scale));
    U256::from(mantissa)
        .checked_mul(factor)
        .ok_or_else(|| VeilError::InvalidAmount {
            reason: format!("{value} overflows 256-bit base units"),
        })
}

/// Quote-side value of a fill: `trade_amount * trade_price`, exact.
///
/// # Errors
/// `InvalidAmount` if the product overflows the decimal range.
pub fn quote_amount(trade_amount: Decimal, trade_price: Decimal) -> Result<Decimal> {
    trade_amount
        .checked_mul(trade_price)
        .ok_or_else(|| VeilError::InvalidAmount {
            reason: format!("{trade_amount} x {trade_price} overflows"),
        })
}
