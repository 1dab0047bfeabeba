use crate::{
    events::ProtocolEvent,
    utils::{
        consts::{
            BETA, DECIMAL_PRECISION, MAX_REDEMPTION_FEE, MINUTE_DECAY_FACTOR, ONE,
            SECONDS_PER_MINUTE,
        },
        finance::SystemMode,
        math,
    },
    EventLog, GlobalConfig, TroveError, TroveManagerState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeEvent {
    Borrowing,
    Redemption {
        coll_drawn: u128,
        price: u128,
        total_supply: u128,
    },
}

/// Decays the base rate up to `now` and, for redemptions, bumps it by half of
/// the redeemed fraction of the supply. Returns the new base rate.
pub fn refresh_base_rate(
    trove_manager: &mut TroveManagerState,
    events: &mut EventLog,
    event: FeeEvent,
    now: u64,
) -> Result<u128, TroveError> {
    let decayed_base_rate = calc_decayed_base_rate(trove_manager, now)?;

    let new_base_rate = match event {
        FeeEvent::Borrowing => decayed_base_rate,
        FeeEvent::Redemption {
            coll_drawn,
            price,
            total_supply,
        } => {
            // b(t) = b(t-1) + redeemed / total_supply / BETA
            let redeemed_fraction = math::mul_div(coll_drawn, price, total_supply)?;
            let new_base_rate = decayed_base_rate
                .checked_add(redeemed_fraction / BETA)
                .ok_or(TroveError::MathOverflow)?;
            let new_base_rate = u128::min(new_base_rate, DECIMAL_PRECISION);
            if new_base_rate == 0 {
                return Err(TroveError::ZeroAmountInvalid);
            }
            new_base_rate
        }
    };

    trove_manager.base_rate = new_base_rate;
    events.emit(ProtocolEvent::BaseRateUpdated {
        base_rate: new_base_rate,
    });
    update_last_fee_op_time(trove_manager, events, now);

    Ok(new_base_rate)
}

/// Moves only once at least a minute has passed since the last update.
pub fn update_last_fee_op_time(
    trove_manager: &mut TroveManagerState,
    events: &mut EventLog,
    now: u64,
) {
    let time_passed = now.saturating_sub(trove_manager.last_fee_operation_time);
    if time_passed >= SECONDS_PER_MINUTE {
        trove_manager.last_fee_operation_time = now;
        events.emit(ProtocolEvent::LastFeeOpTimeUpdated { timestamp: now });
    }
}

pub fn minutes_passed_since_last_fee_op(trove_manager: &TroveManagerState, now: u64) -> u64 {
    now.saturating_sub(trove_manager.last_fee_operation_time) / SECONDS_PER_MINUTE
}

pub fn calc_decayed_base_rate(
    trove_manager: &TroveManagerState,
    now: u64,
) -> Result<u128, TroveError> {
    // Half-life of 12h, b(t) = b(t-1) * d^minutes
    let minutes = minutes_passed_since_last_fee_op(trove_manager, now);
    let decay_factor = math::dec_pow(MINUTE_DECAY_FACTOR as u128, minutes)?;
    math::dec_mul(trove_manager.base_rate, decay_factor)
}

pub fn calc_borrowing_rate(config: &GlobalConfig, base_rate: u128) -> u128 {
    // between the floor (0.5%) and the max (5%)
    u128::min(
        config.borrowing_fee_floor.saturating_add(base_rate),
        config.max_borrowing_fee,
    )
}

pub fn calc_redemption_rate(config: &GlobalConfig, base_rate: u128) -> u128 {
    // between the floor (0.5%) and 100%
    u128::min(
        config.redemption_fee_floor.saturating_add(base_rate),
        MAX_REDEMPTION_FEE,
    )
}

pub fn get_borrowing_rate_with_decay(
    config: &GlobalConfig,
    trove_manager: &TroveManagerState,
    now: u64,
) -> Result<u128, TroveError> {
    Ok(calc_borrowing_rate(
        config,
        calc_decayed_base_rate(trove_manager, now)?,
    ))
}

pub fn get_redemption_rate_with_decay(
    config: &GlobalConfig,
    trove_manager: &TroveManagerState,
    now: u64,
) -> Result<u128, TroveError> {
    Ok(calc_redemption_rate(
        config,
        calc_decayed_base_rate(trove_manager, now)?,
    ))
}

pub fn calc_borrowing_fee(
    config: &GlobalConfig,
    base_rate: u128,
    debt: u128,
) -> Result<u128, TroveError> {
    math::mul_div(calc_borrowing_rate(config, base_rate), debt, ONE)
}

pub fn calc_redemption_fee(
    config: &GlobalConfig,
    base_rate: u128,
    coll_drawn: u128,
) -> Result<u128, TroveError> {
    let fee = math::mul_div(calc_redemption_rate(config, base_rate), coll_drawn, ONE)?;
    if fee >= coll_drawn {
        return Err(TroveError::FeeEatsUpAllCollateral);
    }
    Ok(fee)
}

pub fn require_valid_borrowing_max_fee(
    config: &GlobalConfig,
    max_fee_percentage: u128,
    mode: SystemMode,
) -> Result<(), TroveError> {
    let valid = match mode {
        SystemMode::Recovery => max_fee_percentage <= ONE,
        SystemMode::Normal => {
            max_fee_percentage >= config.borrowing_fee_floor && max_fee_percentage <= ONE
        }
    };
    if !valid {
        return Err(TroveError::InvalidMaxFeePercentage);
    }
    Ok(())
}

pub fn require_valid_redemption_max_fee(
    config: &GlobalConfig,
    max_fee_percentage: u128,
) -> Result<(), TroveError> {
    if max_fee_percentage < config.redemption_fee_floor || max_fee_percentage > ONE {
        return Err(TroveError::InvalidMaxFeePercentage);
    }
    Ok(())
}

pub fn require_user_accepts_fee(
    fee: u128,
    amount: u128,
    max_fee_percentage: u128,
) -> Result<(), TroveError> {
    let fee_percentage = math::mul_div(fee, ONE, amount)?;
    if fee_percentage > max_fee_percentage {
        return Err(TroveError::FeeExceedsMaximum);
    }
    Ok(())
}
