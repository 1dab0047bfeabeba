use crate::TroveError;

pub trait CheckedAssign {
    fn checked_add_assign(&mut self, rhs: Self) -> Result<(), TroveError>;
    fn checked_sub_assign(&mut self, rhs: Self) -> Result<(), TroveError>;
}

impl CheckedAssign for u64 {
    fn checked_add_assign(&mut self, rhs: Self) -> Result<(), TroveError> {
        *self = self.checked_add(rhs).ok_or(TroveError::MathOverflow)?;
        Ok(())
    }
    fn checked_sub_assign(&mut self, rhs: Self) -> Result<(), TroveError> {
        *self = self.checked_sub(rhs).ok_or(TroveError::MathOverflow)?;
        Ok(())
    }
}

impl CheckedAssign for u128 {
    fn checked_add_assign(&mut self, rhs: Self) -> Result<(), TroveError> {
        *self = self.checked_add(rhs).ok_or(TroveError::MathOverflow)?;
        Ok(())
    }
    fn checked_sub_assign(&mut self, rhs: Self) -> Result<(), TroveError> {
        *self = self.checked_sub(rhs).ok_or(TroveError::MathOverflow)?;
        Ok(())
    }
}

pub struct LUSD;
pub struct ETH;
pub struct REWARD;

impl LUSD {
    #[cfg(test)]
    pub fn from(amount: f64) -> u128 {
        super::math::decimal_to_u128(amount)
    }
}

impl ETH {
    #[cfg(test)]
    pub fn from(amount: f64) -> u128 {
        super::math::decimal_to_u128(amount)
    }
}

impl REWARD {
    #[cfg(test)]
    pub fn from(amount: f64) -> u128 {
        super::math::decimal_to_u128(amount)
    }
}

/// Prices are quoted as stablecoin per unit of collateral, 18 decimals.
pub struct Price;

impl Price {
    #[cfg(test)]
    pub fn from(price: f64) -> u128 {
        super::math::decimal_to_u128(price)
    }
}
