use anchor_lang::prelude::*;
use decimal_wad::error::DecimalError;

pub mod borrowing_market;
pub mod events;
pub mod hint_helpers;
pub mod protocol;
pub mod redemption;
pub mod sorted_troves;
pub mod stability_pool;
pub mod state;
pub mod token_operations;
pub mod utils;


pub use borrowing_market::trove_manager::apply_pending_rewards;
pub use events::{EventLog, ProtocolEvent};
pub use protocol::Protocol;
pub use sorted_troves::SortedTroves;
pub use state::*;
pub use utils::oracle::{FixedPriceFeed, PriceFeed};

#[error_code]
#[derive(PartialEq, Eq)]
pub enum TroveError {
    #[msg("Mathematical operation with overflow")]
    MathOverflow,

    #[msg("Price is not valid")]
    PriceNotValid,

    #[msg("Zero argument not allowed")]
    ZeroAmountInvalid,

    #[msg("Trove id cannot be the null address")]
    NullTroveId,

    #[msg("Trove is already in the sorted list")]
    TroveAlreadyInList,

    #[msg("Trove is not in the sorted list")]
    TroveNotInList,

    #[msg("Sorted list is full")]
    SortedTrovesFull,

    #[msg("Nominal ICR must be positive")]
    NonPositiveNicr,

    #[msg("Trove is already active")]
    TroveAlreadyActive,

    #[msg("Trove does not exist or is closed")]
    TroveNotActive,

    #[msg("Net debt must be at least the minimum")]
    TooLowDebt,

    #[msg("An operation that would result in ICR < MCR is not permitted")]
    IcrBelowMcr,

    #[msg("Operation must leave trove with ICR >= CCR in Recovery mode")]
    IcrBelowCcrInRecoveryMode,

    #[msg("An operation that would result in TCR < CCR is not permitted")]
    TcrBelowCcr,

    #[msg("Cannot decrease your trove's ICR in Recovery mode")]
    OperationLowersIcrInRecoveryMode,

    #[msg("Collateral withdrawal not permitted in Recovery mode")]
    CollWithdrawalInRecoveryMode,

    #[msg("Operation not permitted during Recovery mode")]
    NotPermittedInRecoveryMode,

    #[msg("Amount repaid must not be larger than the trove's debt")]
    RepaymentExceedsDebt,

    #[msg("Cannot withdraw more collateral than the trove holds")]
    CollWithdrawalExceedsColl,

    #[msg("Insufficient stablecoin balance")]
    InsufficientStablecoinBalance,

    #[msg("Insufficient token balance")]
    InsufficientTokenBalance,

    #[msg("Max fee percentage must be between the floor and 100%")]
    InvalidMaxFeePercentage,

    #[msg("Fee exceeded provided maximum")]
    FeeExceedsMaximum,

    #[msg("Fee would eat up all returned collateral")]
    FeeEatsUpAllCollateral,

    #[msg("There must be either a collateral change or a debt change")]
    NoAdjustment,

    #[msg("Borrowing is currently disabled")]
    BorrowingDisabled,

    #[msg("Only one trove in the system")]
    LastTrove,

    #[msg("Nothing to liquidate")]
    NothingToLiquidate,

    #[msg("Cannot redeem during bootstrap period")]
    CannotRedeemDuringBootstrapPeriod,

    #[msg("Cannot redeem when TCR < MCR")]
    CannotRedeemWhenUndercollateralized,

    #[msg("Unable to redeem any amount")]
    UnableToRedeemAnyAmount,

    #[msg("User must have a non-zero deposit")]
    NoDeposit,

    #[msg("Caller must have non-zero collateral gain")]
    NoCollGain,

    #[msg("Cannot withdraw while there are troves with ICR < MCR")]
    UnderCollateralizedTroves,

    #[msg("Front end is already registered")]
    FrontEndAlreadyRegistered,

    #[msg("Tag must be a registered front end, or none")]
    FrontEndNotRegistered,

    #[msg("Front end cannot make deposits")]
    FrontEndCannotDeposit,

    #[msg("Kickback rate must be in range [0,1]")]
    InvalidKickbackRate,

    #[msg("Depositors cannot register as front ends")]
    DepositorCannotRegisterFrontEnd,

    #[msg("No collateral available to claim")]
    NoCollateralToClaim,

    #[msg("Pool balance cannot cover the operation")]
    PoolUnderflow,

    #[msg("Stability pool cannot offset more debt than it holds")]
    OffsetExceedsDeposits,

    #[msg("Sum map written out of epoch/scale order")]
    SumMapOutOfOrder,

    #[msg("No stakes left to redistribute to")]
    NoStakesToRedistribute,

    #[msg("Key is not present in global config")]
    GlobalConfigKeyError,

    #[msg("Value is out of range for this config key")]
    InvalidConfigValue,
}

impl From<DecimalError> for TroveError {
    fn from(err: DecimalError) -> TroveError {
        match err {
            DecimalError::MathOverflow => TroveError::MathOverflow,
        }
    }
}
