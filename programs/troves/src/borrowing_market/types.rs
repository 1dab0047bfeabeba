use anchor_lang::prelude::Pubkey;

use crate::events::TroveOperation;

use super::liquidation_calcs::{LiquidationTotals, LiquidationValues};

/// Neighbours the caller expects around the trove's new position in the
/// sorted list. Stale hints only cost extra walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hints {
    pub upper: Option<Pubkey>,
    pub lower: Option<Pubkey>,
}

impl Hints {
    pub fn new(upper: Option<Pubkey>, lower: Option<Pubkey>) -> Self {
        Hints { upper, lower }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenTroveParams {
    pub max_fee_percentage: u128,
    pub coll: u128,
    // Stablecoin the owner receives, the fee and the gas reserve come on top
    pub stablecoin_amount: u128,
    pub hints: Hints,
    pub front_end_tag: Option<Pubkey>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdjustTroveParams {
    pub max_fee_percentage: u128,
    pub coll_change: i128,
    pub debt_change: i128,
    pub hints: Hints,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenTroveEffects {
    pub coll_from_owner: u128,
    pub stablecoin_to_owner: u128,
    pub borrowing_fee: u128,
    pub gas_compensation: u128,
    pub composite_debt: u128,
    pub array_index: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdjustTroveEffects {
    pub coll_from_owner: u128,
    pub coll_to_owner: u128,
    pub stablecoin_to_owner: u128,
    pub stablecoin_to_burn_from_owner: u128,
    pub borrowing_fee: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseTroveEffects {
    pub stablecoin_to_burn_from_owner: u128,
    pub gas_compensation_to_burn: u128,
    pub coll_to_owner: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotActive,
    Healthy,
    LastTrove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidationOutcome {
    Liquidated {
        owner: Pubkey,
        values: LiquidationValues,
        operation: TroveOperation,
    },
    Skipped {
        owner: Pubkey,
        reason: SkipReason,
    },
}

impl LiquidationOutcome {
    pub fn owner(&self) -> Pubkey {
        match self {
            LiquidationOutcome::Liquidated { owner, .. } => *owner,
            LiquidationOutcome::Skipped { owner, .. } => *owner,
        }
    }

    pub fn is_liquidated(&self) -> bool {
        matches!(self, LiquidationOutcome::Liquidated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LiquidationEffects {
    pub outcomes: Vec<LiquidationOutcome>,
    pub totals: LiquidationTotals,
    pub coll_to_liquidator: u128,
    pub stablecoin_to_liquidator: u128,
    pub stablecoin_to_burn_from_sp: u128,
}
