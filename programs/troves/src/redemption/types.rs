use anchor_lang::prelude::Pubkey;

use crate::borrowing_market::types::Hints;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedemptionParams {
    pub amount: u128,
    // Riskiest trove still at or above MCR, the walk starts from the bottom when stale
    pub first_hint: Option<Pubkey>,
    // Neighbours of the partially redeemed trove's new position
    pub hints: Hints,
    // Expected NICR of the partially redeemed trove, a mismatch skips the partial step
    pub partial_nicr_hint: Option<u128>,
    // Zero walks as far as needed
    pub max_iterations: u64,
    pub max_fee_percentage: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedemptionEffects {
    pub actual_amount_redeemed: u128,
    pub collateral_drawn: u128,
    pub collateral_to_redeemer: u128,
    pub collateral_fee: u128,
    pub gas_compensation_to_burn: u128,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleRedemption {
    Redeemed { stablecoin_lot: u128, coll_lot: u128 },
    // The trove would have to close but it is the last one
    Stopped,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedemptionTotals {
    pub total_stablecoin_to_redeem: u128,
    pub total_coll_drawn: u128,
    pub total_gas_compensation: u128,
}
