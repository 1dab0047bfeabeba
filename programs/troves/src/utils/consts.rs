use anchor_lang::prelude::Pubkey;

pub const DECIMAL_PRECISION: u128 = 1_000_000_000_000_000_000;
pub const ONE: u128 = DECIMAL_PRECISION;
pub const SCALE_FACTOR: u128 = 1_000_000_000;

// Nominal ICRs carry two extra decimals so small collateral amounts still sort
pub const NICR_PRECISION: u128 = 100_000_000_000_000_000_000;

pub const MCR: u128 = 1_100_000_000_000_000_000; // 110%
pub const CCR: u128 = 1_500_000_000_000_000_000; // 150%

pub const GAS_COMPENSATION: u128 = 200 * ONE;
pub const MIN_NET_DEBT: u128 = 1_800 * ONE;
pub const PERCENT_DIVISOR: u128 = 200; // 0.5% of the collateral goes to the liquidator

pub const BORROWING_FEE_FLOOR: u128 = ONE / 1000 * 5; // 0.5%
pub const MAX_BORROWING_FEE: u128 = ONE / 100 * 5; // 5%
pub const REDEMPTION_FEE_FLOOR: u128 = ONE / 1000 * 5; // 0.5%
pub const MAX_REDEMPTION_FEE: u128 = ONE; // 100%

/*
 * Half-life of 12h. 12h = 720 min
 * (1/2) = d^720 => d = (1/2)^(1/720)
 */
pub const MINUTE_DECAY_FACTOR: u64 = 999_037_758_833_783_000;
pub const BETA: u128 = 2;

// 1000 years worth of minutes, larger exponents are clamped
pub const MAX_DECAY_MINUTES: u64 = 525_600_000;

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 60 * 60;
pub const BOOTSTRAP_PERIOD: u64 = 14 * 24 * 60 * 60; // 14 days

pub const MAX_TROVES: u64 = 1_000_000;

// F ** 525600 = 0.5, half of the remaining supply is issued every year
pub const REWARD_ISSUANCE_FACTOR: u64 = 999_998_681_227_695_000;
pub const REWARD_SUPPLY_CAP: u128 = 32_000_000 * ONE;

// Custodial accounts inside the token ledgers
pub const STABILITY_POOL_ADDRESS: Pubkey = Pubkey::new_from_array([
    b's', b't', b'a', b'b', b'i', b'l', b'i', b't', b'y', b'_', b'p', b'o', b'o', b'l', 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
]);
pub const GAS_POOL_ADDRESS: Pubkey = Pubkey::new_from_array([
    b'g', b'a', b's', b'_', b'p', b'o', b'o', b'l', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 2,
]);
// Holds the collateral of every pool, pools only account for their share
pub const POOL_CUSTODY_ADDRESS: Pubkey = Pubkey::new_from_array([
    b'p', b'o', b'o', b'l', b'_', b'c', b'u', b's', b't', b'o', b'd', b'y', 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3,
]);
