use anchor_lang::prelude::{AnchorDeserialize, AnchorSerialize};

use crate::{
    utils::{
        consts::{CCR, GAS_COMPENSATION, PERCENT_DIVISOR},
        math,
    },
    TroveError,
};

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemMode {
    Normal,
    Recovery,
}

/// Aggregate collateral and debt of all active troves (active plus default pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemBalances {
    pub coll: u128,
    pub debt: u128,
}

impl SystemBalances {
    pub fn tcr(&self, price: u128) -> Result<u128, TroveError> {
        math::compute_cr(self.coll, self.debt, price)
    }

    pub fn mode(&self, price: u128) -> Result<(SystemMode, u128), TroveError> {
        let tcr = self.tcr(price)?;
        Ok((calc_system_mode(tcr), tcr))
    }

    /// TCR after a trove change, without mutating anything.
    pub fn new_tcr_from_trove_change(
        &self,
        coll_change: i128,
        debt_change: i128,
        price: u128,
    ) -> Result<u128, TroveError> {
        let coll = apply_delta(self.coll, coll_change)?;
        let debt = apply_delta(self.debt, debt_change)?;
        math::compute_cr(coll, debt, price)
    }
}

pub fn calc_system_mode(tcr: u128) -> SystemMode {
    if tcr < CCR {
        SystemMode::Recovery
    } else {
        SystemMode::Normal
    }
}

pub fn apply_delta(value: u128, delta: i128) -> Result<u128, TroveError> {
    if delta >= 0 {
        value
            .checked_add(delta.unsigned_abs())
            .ok_or(TroveError::MathOverflow)
    } else {
        value
            .checked_sub(delta.unsigned_abs())
            .ok_or(TroveError::MathOverflow)
    }
}

/// Debt without the gas compensation reserve.
pub fn get_net_debt(debt: u128) -> Result<u128, TroveError> {
    debt.checked_sub(GAS_COMPENSATION)
        .ok_or(TroveError::MathOverflow)
}

/// Debt including the gas compensation reserve.
pub fn get_composite_debt(net_debt: u128) -> Result<u128, TroveError> {
    net_debt
        .checked_add(GAS_COMPENSATION)
        .ok_or(TroveError::MathOverflow)
}

pub fn get_coll_gas_compensation(entire_coll: u128) -> u128 {
    entire_coll / PERCENT_DIVISOR
}
