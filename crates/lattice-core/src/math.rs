//! Checked decimal math.
//!
//! Every `MathematicalOps` call that can fail returns `None` on overflow; these
//! wrappers turn that into `LatticeError::NumericOverflow` naming the quantity
//! being computed, so extreme inputs never degrade into silent saturation.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::LatticeError;
use crate::LatticeResult;

/// Series cut-off for `exp`. The library default (2e-7) is too loose for
/// discount factors compounded over hundreds of steps.
pub(crate) const EXP_TOLERANCE: Decimal = dec!(0.000000000000000001);

pub(crate) fn exp(x: Decimal, context: &str) -> LatticeResult<Decimal> {
    x.checked_exp_with_tolerance(EXP_TOLERANCE)
        .ok_or_else(|| LatticeError::overflow(context))
}

pub(crate) fn sqrt(x: Decimal, context: &str) -> LatticeResult<Decimal> {
    x.sqrt().ok_or_else(|| LatticeError::overflow(context))
}

#[cfg(feature = "analytics")]
pub(crate) fn ln(x: Decimal, context: &str) -> LatticeResult<Decimal> {
    x.checked_ln().ok_or_else(|| LatticeError::overflow(context))
}

pub(crate) fn powu(base: Decimal, exponent: u32, context: &str) -> LatticeResult<Decimal> {
    base.checked_powu(u64::from(exponent))
        .ok_or_else(|| LatticeError::overflow(context))
}

pub(crate) fn mul(a: Decimal, b: Decimal, context: &str) -> LatticeResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| LatticeError::overflow(context))
}

pub(crate) fn add(a: Decimal, b: Decimal, context: &str) -> LatticeResult<Decimal> {
    a.checked_add(b).ok_or_else(|| LatticeError::overflow(context))
}

#[cfg(feature = "analytics")]
pub(crate) fn sub(a: Decimal, b: Decimal, context: &str) -> LatticeResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| LatticeError::overflow(context))
}

pub(crate) fn div(a: Decimal, b: Decimal, context: &str) -> LatticeResult<Decimal> {
    a.checked_div(b).ok_or_else(|| LatticeError::overflow(context))
}
