use anchor_lang::prelude::{msg, AnchorDeserialize, AnchorSerialize, Pubkey};

use crate::{state::Checkpoint, utils::bn::U256};

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TroveOperation {
    OpenTrove,
    CloseTrove,
    AdjustTrove,
    ApplyPendingRewards,
    LiquidateInNormalMode,
    LiquidateInRecoveryMode,
    RedeemCollateral,
}

/// Everything an indexer needs to rebuild the history of the system.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    TroveCreated {
        owner: Pubkey,
        array_index: u64,
    },
    TroveUpdated {
        owner: Pubkey,
        debt: u128,
        coll: u128,
        stake: u128,
        operation: TroveOperation,
    },
    TroveLiquidated {
        owner: Pubkey,
        debt: u128,
        coll: u128,
        operation: TroveOperation,
    },
    TroveIndexUpdated {
        owner: Pubkey,
        new_index: u64,
    },
    Liquidation {
        liquidated_debt: u128,
        liquidated_coll: u128,
        coll_gas_compensation: u128,
        stablecoin_gas_compensation: u128,
    },
    Redemption {
        attempted_amount: u128,
        actual_amount: u128,
        coll_sent: u128,
        coll_fee: u128,
    },
    BaseRateUpdated {
        base_rate: u128,
    },
    LastFeeOpTimeUpdated {
        timestamp: u64,
    },
    TotalStakesUpdated {
        total_stakes: u128,
    },
    SystemSnapshotsUpdated {
        total_stakes_snapshot: u128,
        total_collateral_snapshot: u128,
    },
    LTermsUpdated {
        l_coll: u128,
        l_debt: u128,
    },
    TroveSnapshotsUpdated {
        owner: Pubkey,
        l_coll: u128,
        l_debt: u128,
    },
    BorrowingFeePaid {
        owner: Pubkey,
        fee: u128,
    },
    UserDepositChanged {
        depositor: Pubkey,
        new_deposit: u128,
    },
    CollGainWithdrawn {
        depositor: Pubkey,
        coll: u128,
        stablecoin_loss: u128,
    },
    RewardPaidToDepositor {
        depositor: Pubkey,
        reward: u128,
    },
    RewardPaidToFrontEnd {
        front_end: Pubkey,
        reward: u128,
    },
    FrontEndRegistered {
        front_end: Pubkey,
        kickback_rate: u128,
    },
    FrontEndTagSet {
        depositor: Pubkey,
        front_end: Option<Pubkey>,
    },
    FrontEndStakeChanged {
        front_end: Pubkey,
        new_stake: u128,
        depositor: Pubkey,
    },
    DepositSnapshotUpdated {
        depositor: Pubkey,
        p: u128,
        s: U256,
        g: U256,
    },
    FrontEndSnapshotUpdated {
        front_end: Pubkey,
        p: u128,
        g: U256,
    },
    PUpdated {
        p: u128,
    },
    SUpdated {
        s: U256,
        epoch: u64,
        scale: u64,
    },
    GUpdated {
        g: U256,
        epoch: u64,
        scale: u64,
    },
    EpochUpdated {
        epoch: u64,
    },
    ScaleUpdated {
        scale: u64,
    },
    StabilityPoolStablecoinBalanceUpdated {
        balance: u128,
    },
    StabilityPoolCollBalanceUpdated {
        balance: u128,
    },
    CollSurplusBalanceUpdated {
        owner: Pubkey,
        balance: u128,
    },
}

/// Events in emission order. Discarded together with the state of a failed operation.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    pub events: Vec<ProtocolEvent>,
}

impl EventLog {
    pub fn emit(&mut self, event: ProtocolEvent) {
        msg!("{:?}", event);
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProtocolEvent> {
        self.events.iter()
    }

    /// Hands the collected events to an indexer and starts over.
    pub fn drain(&mut self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Checkpoint for EventLog {
    type Saved = usize;

    fn checkpoint(&mut self) -> usize {
        self.events.len()
    }

    fn commit(&mut self) {}

    fn rollback(&mut self, len: usize) {
        self.events.truncate(len);
    }
}
