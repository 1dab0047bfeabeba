use decimal_wad::rate::Rate;

use crate::{
    utils::{
        bn::U256,
        consts::{DECIMAL_PRECISION, MAX_DECAY_MINUTES, NICR_PRECISION},
    },
    TroveError,
};

/// Computes `floor(a * b / c)` with a 256 bit intermediate.
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128, TroveError> {
    if c == 0 {
        return Err(TroveError::MathOverflow);
    }
    let res = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(TroveError::MathOverflow)?
        .checked_div(U256::from(c))
        .ok_or(TroveError::MathOverflow)?;
    u256_to_u128(res)
}

pub fn u256_to_u128(value: U256) -> Result<u128, TroveError> {
    if value > U256::from(u128::MAX) {
        return Err(TroveError::MathOverflow);
    }
    Ok(value.as_u128())
}

/// Multiplies two 18-decimal values, rounding half up.
pub fn dec_mul(a: u128, b: u128) -> Result<u128, TroveError> {
    let res = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(TroveError::MathOverflow)?
        .checked_add(U256::from(DECIMAL_PRECISION / 2))
        .ok_or(TroveError::MathOverflow)?
        / U256::from(DECIMAL_PRECISION);
    u256_to_u128(res)
}

/// Divides two 18-decimal values, truncating.
pub fn dec_div(a: u128, b: u128) -> Result<u128, TroveError> {
    mul_div(a, DECIMAL_PRECISION, b)
}

/// `base ^ minutes` in 18-decimal fixed point, exponent clamped to 1000 years.
pub fn dec_pow(base: u128, minutes: u64) -> Result<u128, TroveError> {
    let base = u64::try_from(base).map_err(|_| TroveError::MathOverflow)?;
    let minutes = u64::min(minutes, MAX_DECAY_MINUTES);
    let res = Rate::from_scaled_val(base).try_pow(minutes)?;
    Ok(res.to_scaled_val::<u128>()?)
}

/// Individual collateral ratio, `u128::MAX` when there is no debt.
pub fn compute_cr(coll: u128, debt: u128, price: u128) -> Result<u128, TroveError> {
    if debt > 0 {
        mul_div(coll, price, debt)
    } else {
        Ok(u128::MAX)
    }
}

/// Price independent collateral ratio used to order the sorted troves.
pub fn compute_nominal_cr(coll: u128, debt: u128) -> Result<u128, TroveError> {
    if debt > 0 {
        mul_div(coll, NICR_PRECISION, debt)
    } else {
        Ok(u128::MAX)
    }
}

#[cfg(test)]
pub fn decimal_to_u128(number: f64) -> u128 {
    // go through micro units so values like 2110.5 stay exact
    let micros = (number * 1_000_000.0).round() as u128;
    micros * (DECIMAL_PRECISION / 1_000_000)
}

#[cfg(test)]
pub fn u128_to_decimal(number: u128) -> f64 {
    number as f64 / (DECIMAL_PRECISION as f64)
}
