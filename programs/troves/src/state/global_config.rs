use anchor_lang::prelude::Pubkey;
use num::FromPrimitive;

use crate::{
    utils::consts::{
        BOOTSTRAP_PERIOD, BORROWING_FEE_FLOOR, MAX_BORROWING_FEE, MAX_TROVES, ONE,
        REDEMPTION_FEE_FLOOR,
    },
    GlobalConfig, GlobalConfigOption, TroveError,
};

impl Default for GlobalConfig {
    fn default() -> GlobalConfig {
        GlobalConfig::new(Pubkey::default())
    }
}

impl GlobalConfig {
    pub fn new(fee_recipient: Pubkey) -> GlobalConfig {
        GlobalConfig {
            version: 0,
            borrowing_fee_floor: BORROWING_FEE_FLOOR,
            max_borrowing_fee: MAX_BORROWING_FEE,
            redemption_fee_floor: REDEMPTION_FEE_FLOOR,
            bootstrap_period: BOOTSTRAP_PERIOD,
            max_troves: MAX_TROVES,
            is_borrowing_allowed: true,
            fee_recipient,
        }
    }

    pub fn update_global_config(&mut self, key: u16, value: u64) -> Result<(), TroveError> {
        match GlobalConfigOption::from_u16(key) {
            Some(GlobalConfigOption::BorrowingFeeFloor) => {
                let value = as_fee(value)?;
                if value > self.max_borrowing_fee {
                    return Err(TroveError::InvalidConfigValue);
                }
                self.borrowing_fee_floor = value;
            }
            Some(GlobalConfigOption::MaxBorrowingFee) => {
                let value = as_fee(value)?;
                if value < self.borrowing_fee_floor {
                    return Err(TroveError::InvalidConfigValue);
                }
                self.max_borrowing_fee = value;
            }
            Some(GlobalConfigOption::RedemptionFeeFloor) => {
                self.redemption_fee_floor = as_fee(value)?;
            }
            Some(GlobalConfigOption::BootstrapPeriod) => {
                self.bootstrap_period = value;
            }
            Some(GlobalConfigOption::MaxTroves) => {
                if value == 0 {
                    return Err(TroveError::InvalidConfigValue);
                }
                self.max_troves = value;
            }
            Some(GlobalConfigOption::IsBorrowingAllowed) => {
                self.is_borrowing_allowed = value > 0;
            }
            None => return Err(TroveError::GlobalConfigKeyError),
        }
        Ok(())
    }
}

fn as_fee(value: u64) -> Result<u128, TroveError> {
    let value = value as u128;
    if value > ONE {
        return Err(TroveError::InvalidConfigValue);
    }
    Ok(value)
}
