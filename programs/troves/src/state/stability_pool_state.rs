use anchor_lang::prelude::Pubkey;

use crate::{
    utils::consts::ONE, Deposit, DepositSnapshot, EpochToScaleToSum, FrontEnd, FrontEndSnapshot,
    StabilityPoolState,
};

impl Default for StabilityPoolState {
    fn default() -> Self {
        StabilityPoolState::new(0)
    }
}

impl StabilityPoolState {
    pub fn new(reward_issuance_start_ts: u64) -> StabilityPoolState {
        StabilityPoolState {
            version: 0,
            total_stablecoin_deposits: 0,
            coll: 0,
            p: ONE,
            current_scale: 0,
            current_epoch: 0,
            epoch_to_scale_to_sum: EpochToScaleToSum::default(),
            deposits: Default::default(),
            deposit_snapshots: Default::default(),
            front_ends: Default::default(),
            front_end_stakes: Default::default(),
            front_end_snapshots: Default::default(),
            last_coll_error_offset: 0,
            last_stablecoin_loss_error_offset: 0,
            last_reward_error: 0,
            reward_issuance_start_ts,
            total_reward_issued: 0,
        }
    }

    pub fn deposit(&self, depositor: &Pubkey) -> Deposit {
        self.deposits.get(depositor).copied().unwrap_or_default()
    }

    pub fn deposit_snapshot(&self, depositor: &Pubkey) -> DepositSnapshot {
        self.deposit_snapshots
            .get(depositor)
            .copied()
            .unwrap_or_default()
    }

    pub fn front_end(&self, front_end: &Pubkey) -> FrontEnd {
        self.front_ends.get(front_end).copied().unwrap_or_default()
    }

    pub fn front_end_stake(&self, front_end: &Pubkey) -> u128 {
        self.front_end_stakes.get(front_end).copied().unwrap_or(0)
    }

    pub fn front_end_snapshot(&self, front_end: &Pubkey) -> FrontEndSnapshot {
        self.front_end_snapshots
            .get(front_end)
            .copied()
            .unwrap_or_default()
    }

    pub fn is_registered_front_end(&self, front_end: &Pubkey) -> bool {
        self.front_end(front_end).registered
    }

    #[cfg(test)]
    pub fn to_state_string(&self) -> String {
        format!(
            "StabilityPoolState {{
    p: {},
    current_epoch: {:?},
    current_scale: {:?},
    total_stablecoin_deposits: {},
    coll: {},
    last_stablecoin_error: {},
    last_coll_error: {:?},
    last_reward_error: {:?},
    total_reward_issued: {}
}}
",
            self.p,
            self.current_epoch,
            self.current_scale,
            self.total_stablecoin_deposits,
            self.coll,
            self.last_stablecoin_loss_error_offset,
            self.last_coll_error_offset,
            self.last_reward_error,
            self.total_reward_issued,
        )
    }
}
