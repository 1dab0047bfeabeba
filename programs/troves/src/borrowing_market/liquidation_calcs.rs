use crate::{
    utils::{
        consts::{DECIMAL_PRECISION, GAS_COMPENSATION, MCR},
        coretypes::CheckedAssign,
        finance::{get_coll_gas_compensation, SystemMode},
        math,
    },
    TroveError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidationDecision {
    // ICR <= 100%, nothing is offset against the stability pool
    RedistributeAll,
    OffsetThenRedistribute,
    // MCR <= ICR < TCR in recovery mode, collateral above MCR is left to the owner
    CappedOffset,
    DoNothing,
}

/// How a single liquidated trove is split between the stability pool,
/// redistribution, the liquidator and the owner's surplus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiquidationValues {
    pub entire_trove_debt: u128,
    pub entire_trove_coll: u128,
    pub coll_gas_compensation: u128,
    pub stablecoin_gas_compensation: u128,
    pub debt_to_offset: u128,
    pub coll_to_send_to_sp: u128,
    pub debt_to_redistribute: u128,
    pub coll_to_redistribute: u128,
    pub coll_surplus: u128,
}

/// Sums of a liquidation sequence, applied to the pools in one go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LiquidationTotals {
    pub total_coll_in_sequence: u128,
    pub total_debt_in_sequence: u128,
    pub total_coll_gas_compensation: u128,
    pub total_stablecoin_gas_compensation: u128,
    pub total_debt_to_offset: u128,
    pub total_coll_to_send_to_sp: u128,
    pub total_debt_to_redistribute: u128,
    pub total_coll_to_redistribute: u128,
    pub total_coll_surplus: u128,
}

impl LiquidationTotals {
    pub fn add_assign(&mut self, values: &LiquidationValues) -> Result<(), TroveError> {
        self.total_coll_in_sequence
            .checked_add_assign(values.entire_trove_coll)?;
        self.total_debt_in_sequence
            .checked_add_assign(values.entire_trove_debt)?;
        self.total_coll_gas_compensation
            .checked_add_assign(values.coll_gas_compensation)?;
        self.total_stablecoin_gas_compensation
            .checked_add_assign(values.stablecoin_gas_compensation)?;
        self.total_debt_to_offset
            .checked_add_assign(values.debt_to_offset)?;
        self.total_coll_to_send_to_sp
            .checked_add_assign(values.coll_to_send_to_sp)?;
        self.total_debt_to_redistribute
            .checked_add_assign(values.debt_to_redistribute)?;
        self.total_coll_to_redistribute
            .checked_add_assign(values.coll_to_redistribute)?;
        self.total_coll_surplus
            .checked_add_assign(values.coll_surplus)?;
        Ok(())
    }

    /// Collateral that stays in the system after the liquidator and the
    /// surplus claims are paid.
    pub fn liquidated_coll(&self) -> Result<u128, TroveError> {
        self.total_coll_in_sequence
            .checked_sub(self.total_coll_gas_compensation)
            .and_then(|c| c.checked_sub(self.total_coll_surplus))
            .ok_or(TroveError::MathOverflow)
    }
}

pub fn evaluate_liquidation_decision(
    mode: SystemMode,
    icr: u128,
    tcr: u128,
    entire_trove_debt: u128,
    stablecoin_in_sp: u128,
) -> LiquidationDecision {
    match mode {
        SystemMode::Normal => {
            if icr < MCR {
                LiquidationDecision::OffsetThenRedistribute
            } else {
                LiquidationDecision::DoNothing
            }
        }
        SystemMode::Recovery => {
            if icr <= DECIMAL_PRECISION {
                LiquidationDecision::RedistributeAll
            } else if icr < MCR {
                LiquidationDecision::OffsetThenRedistribute
            } else if icr < tcr && entire_trove_debt <= stablecoin_in_sp {
                LiquidationDecision::CappedOffset
            } else {
                LiquidationDecision::DoNothing
            }
        }
    }
}

/// Offsets as much debt as the stability pool holds, the rest is redistributed.
pub fn get_offset_and_redistribution_vals(
    debt: u128,
    coll: u128,
    stablecoin_in_sp: u128,
) -> Result<(u128, u128, u128, u128), TroveError> {
    if stablecoin_in_sp == 0 || debt == 0 {
        return Ok((0, 0, debt, coll));
    }

    let debt_to_offset = u128::min(debt, stablecoin_in_sp);
    let coll_to_send_to_sp = math::mul_div(coll, debt_to_offset, debt)?;
    let debt_to_redistribute = debt - debt_to_offset;
    let coll_to_redistribute = coll
        .checked_sub(coll_to_send_to_sp)
        .ok_or(TroveError::MathOverflow)?;

    Ok((
        debt_to_offset,
        coll_to_send_to_sp,
        debt_to_redistribute,
        coll_to_redistribute,
    ))
}

pub fn calculate_liquidation_values(
    decision: LiquidationDecision,
    entire_trove_debt: u128,
    entire_trove_coll: u128,
    stablecoin_in_sp: u128,
    price: u128,
) -> Result<LiquidationValues, TroveError> {
    let mut values = LiquidationValues {
        entire_trove_debt,
        entire_trove_coll,
        ..Default::default()
    };

    match decision {
        LiquidationDecision::DoNothing => return Ok(LiquidationValues::default()),
        LiquidationDecision::RedistributeAll => {
            values.coll_gas_compensation = get_coll_gas_compensation(entire_trove_coll);
            values.stablecoin_gas_compensation = GAS_COMPENSATION;
            values.debt_to_redistribute = entire_trove_debt;
            values.coll_to_redistribute = entire_trove_coll - values.coll_gas_compensation;
        }
        LiquidationDecision::OffsetThenRedistribute => {
            values.coll_gas_compensation = get_coll_gas_compensation(entire_trove_coll);
            values.stablecoin_gas_compensation = GAS_COMPENSATION;
            let coll_to_liquidate = entire_trove_coll - values.coll_gas_compensation;

            let (debt_to_offset, coll_to_send_to_sp, debt_to_redistribute, coll_to_redistribute) =
                get_offset_and_redistribution_vals(
                    entire_trove_debt,
                    coll_to_liquidate,
                    stablecoin_in_sp,
                )?;
            values.debt_to_offset = debt_to_offset;
            values.coll_to_send_to_sp = coll_to_send_to_sp;
            values.debt_to_redistribute = debt_to_redistribute;
            values.coll_to_redistribute = coll_to_redistribute;
        }
        LiquidationDecision::CappedOffset => {
            // Only the collateral worth debt * MCR is liquidated
            let capped_coll = math::mul_div(entire_trove_debt, MCR, price)?;
            let capped_coll = u128::min(capped_coll, entire_trove_coll);

            values.coll_gas_compensation = get_coll_gas_compensation(capped_coll);
            values.stablecoin_gas_compensation = GAS_COMPENSATION;
            values.debt_to_offset = entire_trove_debt;
            values.coll_to_send_to_sp = capped_coll - values.coll_gas_compensation;
            values.coll_surplus = entire_trove_coll - capped_coll;
        }
    }

    Ok(values)
}
