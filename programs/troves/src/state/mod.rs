use anchor_lang::prelude::{AnchorDeserialize, AnchorSerialize, Pubkey};
use num_derive::FromPrimitive;

use crate::{sorted_troves::SortedTroves, utils::bn::U256};

mod deposit_snapshot;
pub mod epoch_to_scale_to_sum;
mod global_config;
pub mod journal;
pub mod pools;
mod stability_pool_state;
mod trove_manager_state;

pub use epoch_to_scale_to_sum::{EpochToScaleToSum, SumPair};
pub use journal::{Checkpoint, JournaledMap, JournaledVec, MarketCheckpoint, SumsCheckpoint};
pub use pools::{
    ActivePool, CollSurplusPool, CollateralRecipient, DebtChange, DefaultPool, GasPool, Payout,
    Pool,
};

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalConfig {
    pub version: u8,
    pub borrowing_fee_floor: u128,
    pub max_borrowing_fee: u128,
    pub redemption_fee_floor: u128,
    pub bootstrap_period: u64,
    pub max_troves: u64,
    pub is_borrowing_allowed: bool,
    // Receives borrowing fees in stablecoin and redemption fees in collateral
    pub fee_recipient: Pubkey,
}

#[derive(FromPrimitive, PartialEq, Eq, Clone, Copy, Debug)]
pub enum GlobalConfigOption {
    BorrowingFeeFloor = 0,
    MaxBorrowingFee = 1,
    RedemptionFeeFloor = 2,
    BootstrapPeriod = 3,
    MaxTroves = 4,
    IsBorrowingAllowed = 5,
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TroveStatus {
    #[default]
    NonExistent,
    Active,
    ClosedByOwner,
    ClosedByLiquidation,
    ClosedByRedemption,
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trove {
    pub debt: u128,
    pub coll: u128,
    pub stake: u128,
    pub status: TroveStatus,
    pub array_index: u64,
    pub front_end_tag: Option<Pubkey>,
}

/// L_coll and L_debt as seen by a trove at its last touch.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewardSnapshot {
    pub coll: u128,
    pub debt: u128,
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TroveManagerState {
    pub version: u8,

    pub troves: JournaledMap<Pubkey, Trove>,
    pub reward_snapshots: JournaledMap<Pubkey, RewardSnapshot>,
    // Dense list of owners with an active trove, `Trove::array_index` points here
    pub trove_owners: JournaledVec<Pubkey>,

    pub total_stakes: u128,
    // Stake bookkeeping as of the last liquidation
    pub total_stakes_snapshot: u128,
    pub total_collateral_snapshot: u128,

    // Redistribution reward per unit staked
    pub l_coll: u128,
    pub l_debt: u128,
    pub last_coll_error_redistribution: u128,
    pub last_debt_error_redistribution: u128,

    pub base_rate: u128,
    pub last_fee_operation_time: u64,
    pub deployment_time: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositSnapshot {
    pub s: U256,
    pub p: u128,
    pub g: U256,
    pub scale: u64,
    pub epoch: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontEndSnapshot {
    pub p: u128,
    pub g: U256,
    pub scale: u64,
    pub epoch: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deposit {
    pub initial_value: u128,
    pub front_end_tag: Option<Pubkey>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrontEnd {
    // Share of the reward token kept by depositors, 18 decimals
    pub kickback_rate: u128,
    pub registered: bool,
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct StabilityPoolState {
    pub version: u8,

    pub total_stablecoin_deposits: u128,
    pub coll: u128,

    pub p: u128,
    pub current_scale: u64,
    pub current_epoch: u64,
    pub epoch_to_scale_to_sum: EpochToScaleToSum,

    pub deposits: JournaledMap<Pubkey, Deposit>,
    pub deposit_snapshots: JournaledMap<Pubkey, DepositSnapshot>,

    pub front_ends: JournaledMap<Pubkey, FrontEnd>,
    pub front_end_stakes: JournaledMap<Pubkey, u128>,
    pub front_end_snapshots: JournaledMap<Pubkey, FrontEndSnapshot>,

    pub last_coll_error_offset: u128,
    pub last_stablecoin_loss_error_offset: u128,
    pub last_reward_error: u128,

    pub reward_issuance_start_ts: u64,
    pub total_reward_issued: u128,
}

/// The trove ledger and everything it moves collateral and debt between.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct BorrowingMarket {
    pub config: GlobalConfig,
    pub trove_manager: TroveManagerState,
    pub sorted_troves: SortedTroves,
    pub active_pool: ActivePool,
    pub default_pool: DefaultPool,
    pub coll_surplus_pool: CollSurplusPool,
    pub gas_pool: GasPool,
}

impl BorrowingMarket {
    pub fn new(config: GlobalConfig, deployment_time: u64) -> Self {
        let sorted_troves = SortedTroves::new(config.max_troves);
        BorrowingMarket {
            config,
            trove_manager: TroveManagerState::new(deployment_time),
            sorted_troves,
            active_pool: ActivePool::default(),
            default_pool: DefaultPool::default(),
            coll_surplus_pool: CollSurplusPool::default(),
            gas_pool: GasPool::default(),
        }
    }

    pub fn system_balances(&self) -> crate::utils::finance::SystemBalances {
        pools::system_balances(&self.active_pool, &self.default_pool)
    }
}
