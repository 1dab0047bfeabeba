use anchor_lang::prelude::Pubkey;

use crate::{RewardSnapshot, Trove, TroveError, TroveManagerState, TroveStatus};

impl TroveManagerState {
    pub fn new(deployment_time: u64) -> TroveManagerState {
        TroveManagerState {
            deployment_time,
            last_fee_operation_time: deployment_time,
            ..Default::default()
        }
    }

    pub fn trove(&self, owner: &Pubkey) -> Trove {
        self.troves.get(owner).copied().unwrap_or_default()
    }

    pub fn trove_mut(&mut self, owner: &Pubkey) -> Result<&mut Trove, TroveError> {
        self.troves.get_mut(owner).ok_or(TroveError::TroveNotActive)
    }

    pub fn status(&self, owner: &Pubkey) -> TroveStatus {
        self.trove(owner).status
    }

    pub fn is_active(&self, owner: &Pubkey) -> bool {
        self.status(owner) == TroveStatus::Active
    }

    pub fn reward_snapshot(&self, owner: &Pubkey) -> RewardSnapshot {
        self.reward_snapshots
            .get(owner)
            .copied()
            .unwrap_or_default()
    }

    pub fn trove_owners_count(&self) -> u64 {
        self.trove_owners.len() as u64
    }

    #[cfg(test)]
    pub fn to_state_string(&self) -> String {
        format!(
            "TroveManagerState {{
    troves: {},
    total_stakes: {},
    total_stakes_snapshot: {},
    total_collateral_snapshot: {},
    l_coll: {},
    l_debt: {},
    last_coll_error: {},
    last_debt_error: {},
    base_rate: {}
}}
",
            self.trove_owners.len(),
            self.total_stakes,
            self.total_stakes_snapshot,
            self.total_collateral_snapshot,
            self.l_coll,
            self.l_debt,
            self.last_coll_error_redistribution,
            self.last_debt_error_redistribution,
            self.base_rate,
        )
    }
}

impl Trove {
    #[cfg(test)]
    pub fn to_state_string(&self) -> String {
        format!(
            "Trove {{ status: {:?}, debt: {} coll: {} stake: {} }}",
            self.status, self.debt, self.coll, self.stake
        )
    }
}
