use anchor_lang::prelude::Pubkey;

/// Token movements a deposit, withdrawal or gain claim asks the caller to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StabilityDepositEffects {
    pub stablecoin_from_depositor: u128,
    pub stablecoin_to_depositor: u128,
    pub coll_to_depositor: u128,
    pub stablecoin_loss: u128,
    pub rewards: RewardPayout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollGainToTroveEffects {
    pub coll_to_trove: u128,
    pub stablecoin_loss: u128,
    pub rewards: RewardPayout,
}

/// Reward token owed to a depositor and to the front end it is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewardPayout {
    pub depositor_reward: u128,
    pub front_end: Option<Pubkey>,
    pub front_end_reward: u128,
}

pub struct RewardDistributionCalculation {
    pub coll_gained_per_unit_staked: u128,
    pub stablecoin_loss_per_unit_staked: u128,
}
