use anchor_lang::prelude::{msg, Pubkey};

use super::types::{
    CollGainToTroveEffects, RewardDistributionCalculation, RewardPayout, StabilityDepositEffects,
};
use crate::{
    borrowing_market::{borrowing_operations, trove_manager, types::Hints},
    events::ProtocolEvent,
    fail,
    state::{CollateralRecipient, DebtChange, Pool},
    utils::{
        bn::U256,
        consts::{DECIMAL_PRECISION, MCR, ONE, SCALE_FACTOR},
        coretypes::CheckedAssign,
        math,
    },
    BorrowingMarket, DepositSnapshot, EventLog, FrontEnd, FrontEndSnapshot,
    StabilityPoolState, SumPair, TroveError,
};

impl CollateralRecipient for StabilityPoolState {
    fn receive_collateral(&mut self, amount: u128) -> Result<(), TroveError> {
        self.coll.checked_add_assign(amount)
    }
}

pub fn register_front_end(
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    front_end: Pubkey,
    kickback_rate: u128,
) -> Result<(), TroveError> {
    if stability_pool.is_registered_front_end(&front_end) {
        fail!(TroveError::FrontEndAlreadyRegistered);
    }
    if stability_pool.deposit(&front_end).initial_value > 0 {
        fail!(TroveError::DepositorCannotRegisterFrontEnd);
    }
    if kickback_rate > ONE {
        fail!(TroveError::InvalidKickbackRate);
    }

    stability_pool.front_ends.insert(
        front_end,
        FrontEnd {
            kickback_rate,
            registered: true,
        },
    );
    events.emit(ProtocolEvent::FrontEndRegistered {
        front_end,
        kickback_rate,
    });
    Ok(())
}

/// Adds `amount` to the depositor's compounded deposit and pays out the
/// collateral and reward gains accrued so far. The front end tag is only
/// taken into account on a first deposit.
pub fn provide_to_sp(
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    depositor: Pubkey,
    amount: u128,
    front_end_tag: Option<Pubkey>,
    now: u64,
) -> Result<StabilityDepositEffects, TroveError> {
    if amount == 0 {
        fail!(TroveError::ZeroAmountInvalid);
    }
    if stability_pool.is_registered_front_end(&depositor) {
        fail!(TroveError::FrontEndCannotDeposit);
    }
    if let Some(tag) = front_end_tag {
        if !stability_pool.is_registered_front_end(&tag) {
            fail!(TroveError::FrontEndNotRegistered);
        }
    }

    let initial_deposit = stability_pool.deposit(&depositor).initial_value;
    if initial_deposit == 0 {
        set_front_end_tag(stability_pool, events, depositor, front_end_tag);
    }

    trigger_reward_issuance(stability_pool, events, now)?;

    let coll_gain = get_depositor_coll_gain(stability_pool, &depositor)?;
    let compounded_deposit = get_compounded_stablecoin_deposit(stability_pool, &depositor)?;
    let stablecoin_loss = initial_deposit.saturating_sub(compounded_deposit);

    let rewards = pay_out_reward_gains(stability_pool, events, &depositor)?;

    if let Some(front_end) = rewards.front_end {
        let new_stake = get_compounded_front_end_stake(stability_pool, &front_end)?
            .checked_add(amount)
            .ok_or(TroveError::MathOverflow)?;
        update_front_end_stake_and_snapshots(stability_pool, events, front_end, new_stake)?;
        events.emit(ProtocolEvent::FrontEndStakeChanged {
            front_end,
            new_stake,
            depositor,
        });
    }

    stability_pool
        .total_stablecoin_deposits
        .checked_add_assign(amount)?;
    events.emit(ProtocolEvent::StabilityPoolStablecoinBalanceUpdated {
        balance: stability_pool.total_stablecoin_deposits,
    });

    let new_deposit = compounded_deposit
        .checked_add(amount)
        .ok_or(TroveError::MathOverflow)?;
    update_deposit_and_snapshots(stability_pool, events, depositor, new_deposit)?;
    events.emit(ProtocolEvent::UserDepositChanged {
        depositor,
        new_deposit,
    });

    send_coll_gain_to_depositor(stability_pool, events, depositor, coll_gain, stablecoin_loss)?;

    Ok(StabilityDepositEffects {
        stablecoin_from_depositor: amount,
        stablecoin_to_depositor: 0,
        coll_to_depositor: coll_gain,
        stablecoin_loss,
        rewards,
    })
}

/// Withdraws up to `amount` of the compounded deposit. Withdrawing more
/// than the deposit withdraws all of it.
pub fn withdraw_from_sp(
    stability_pool: &mut StabilityPoolState,
    market: &BorrowingMarket,
    events: &mut EventLog,
    depositor: Pubkey,
    amount: u128,
    price: u128,
    now: u64,
) -> Result<StabilityDepositEffects, TroveError> {
    if amount != 0 {
        require_no_under_collateralized_troves(market, price)?;
    }
    withdraw(stability_pool, events, depositor, amount, now)
}

/// Pays out collateral and reward gains, leaving the deposit in place.
pub fn claim_gains(
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    depositor: Pubkey,
    now: u64,
) -> Result<StabilityDepositEffects, TroveError> {
    withdraw(stability_pool, events, depositor, 0, now)
}

fn withdraw(
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    depositor: Pubkey,
    amount: u128,
    now: u64,
) -> Result<StabilityDepositEffects, TroveError> {
    let initial_deposit = stability_pool.deposit(&depositor).initial_value;
    if initial_deposit == 0 {
        fail!(TroveError::NoDeposit);
    }

    trigger_reward_issuance(stability_pool, events, now)?;

    let coll_gain = get_depositor_coll_gain(stability_pool, &depositor)?;
    let compounded_deposit = get_compounded_stablecoin_deposit(stability_pool, &depositor)?;
    let stablecoin_to_withdraw = u128::min(amount, compounded_deposit);
    let stablecoin_loss = initial_deposit.saturating_sub(compounded_deposit);

    let rewards = pay_out_reward_gains(stability_pool, events, &depositor)?;

    if let Some(front_end) = rewards.front_end {
        let new_stake = get_compounded_front_end_stake(stability_pool, &front_end)?
            .saturating_sub(stablecoin_to_withdraw);
        update_front_end_stake_and_snapshots(stability_pool, events, front_end, new_stake)?;
        events.emit(ProtocolEvent::FrontEndStakeChanged {
            front_end,
            new_stake,
            depositor,
        });
    }

    if stablecoin_to_withdraw > 0 {
        stability_pool.total_stablecoin_deposits = stability_pool
            .total_stablecoin_deposits
            .checked_sub(stablecoin_to_withdraw)
            .ok_or(TroveError::PoolUnderflow)?;
        events.emit(ProtocolEvent::StabilityPoolStablecoinBalanceUpdated {
            balance: stability_pool.total_stablecoin_deposits,
        });
    }

    let new_deposit = compounded_deposit - stablecoin_to_withdraw;
    update_deposit_and_snapshots(stability_pool, events, depositor, new_deposit)?;
    events.emit(ProtocolEvent::UserDepositChanged {
        depositor,
        new_deposit,
    });

    send_coll_gain_to_depositor(stability_pool, events, depositor, coll_gain, stablecoin_loss)?;

    Ok(StabilityDepositEffects {
        stablecoin_from_depositor: 0,
        stablecoin_to_depositor: stablecoin_to_withdraw,
        coll_to_depositor: coll_gain,
        stablecoin_loss,
        rewards,
    })
}

/// Moves the depositor's whole collateral gain into their active trove.
#[allow(clippy::too_many_arguments)]
pub fn withdraw_coll_gain_to_trove(
    stability_pool: &mut StabilityPoolState,
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    depositor: Pubkey,
    hints: Hints,
    price: u128,
    now: u64,
) -> Result<CollGainToTroveEffects, TroveError> {
    let initial_deposit = stability_pool.deposit(&depositor).initial_value;
    if initial_deposit == 0 {
        fail!(TroveError::NoDeposit);
    }
    if !market.trove_manager.is_active(&depositor) {
        fail!(TroveError::TroveNotActive);
    }
    let coll_gain = get_depositor_coll_gain(stability_pool, &depositor)?;
    if coll_gain == 0 {
        fail!(TroveError::NoCollGain);
    }

    trigger_reward_issuance(stability_pool, events, now)?;

    let compounded_deposit = get_compounded_stablecoin_deposit(stability_pool, &depositor)?;
    let stablecoin_loss = initial_deposit.saturating_sub(compounded_deposit);

    let rewards = pay_out_reward_gains(stability_pool, events, &depositor)?;

    if let Some(front_end) = rewards.front_end {
        let new_stake = get_compounded_front_end_stake(stability_pool, &front_end)?;
        update_front_end_stake_and_snapshots(stability_pool, events, front_end, new_stake)?;
        events.emit(ProtocolEvent::FrontEndStakeChanged {
            front_end,
            new_stake,
            depositor,
        });
    }

    update_deposit_and_snapshots(stability_pool, events, depositor, compounded_deposit)?;
    events.emit(ProtocolEvent::UserDepositChanged {
        depositor,
        new_deposit: compounded_deposit,
    });

    send_coll_gain_to_depositor(stability_pool, events, depositor, coll_gain, stablecoin_loss)?;
    borrowing_operations::move_coll_gain_to_trove(
        market, events, &depositor, coll_gain, hints, price, now,
    )?;

    Ok(CollGainToTroveEffects {
        coll_to_trove: coll_gain,
        stablecoin_loss,
        rewards,
    })
}

/// Cancels `debt_to_offset` of liquidated debt against the deposits and
/// hands `coll_to_add` over from the active pool. Returns the stablecoin
/// to burn out of the pool's holdings.
pub fn offset(
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    active_pool: &mut impl Pool,
    debt_to_offset: u128,
    coll_to_add: u128,
    now: u64,
) -> Result<u128, TroveError> {
    let total_deposits = stability_pool.total_stablecoin_deposits;
    if total_deposits == 0 || debt_to_offset == 0 {
        return Ok(0);
    }
    if debt_to_offset > total_deposits {
        fail!(TroveError::OffsetExceedsDeposits);
    }

    trigger_reward_issuance(stability_pool, events, now)?;

    let RewardDistributionCalculation {
        coll_gained_per_unit_staked,
        stablecoin_loss_per_unit_staked,
    } = liquidations_logic::compute_rewards_per_unit_staked(
        stability_pool,
        coll_to_add,
        debt_to_offset,
        total_deposits,
    )?;

    liquidations_logic::update_reward_sum_and_product(
        stability_pool,
        events,
        coll_gained_per_unit_staked,
        stablecoin_loss_per_unit_staked,
    )?;

    // Cancel the debt with the pool's stablecoin and pull in the collateral
    active_pool.record_debt_change(DebtChange::Decrease(debt_to_offset))?;
    stability_pool.total_stablecoin_deposits = total_deposits - debt_to_offset;
    events.emit(ProtocolEvent::StabilityPoolStablecoinBalanceUpdated {
        balance: stability_pool.total_stablecoin_deposits,
    });

    active_pool.send_collateral(stability_pool, coll_to_add)?;
    events.emit(ProtocolEvent::StabilityPoolCollBalanceUpdated {
        balance: stability_pool.coll,
    });

    Ok(debt_to_offset)
}

pub fn get_depositor_coll_gain(
    stability_pool: &StabilityPoolState,
    depositor: &Pubkey,
) -> Result<u128, TroveError> {
    let initial_deposit = stability_pool.deposit(depositor).initial_value;
    if initial_deposit == 0 {
        return Ok(0);
    }
    let snapshot = stability_pool.deposit_snapshot(depositor);
    liquidations_logic::get_coll_gain_from_snapshots(stability_pool, initial_deposit, &snapshot)
}

/// Reward token accrued by the depositor, net of the front end's share.
pub fn get_depositor_reward_gain(
    stability_pool: &StabilityPoolState,
    depositor: &Pubkey,
) -> Result<u128, TroveError> {
    let deposit = stability_pool.deposit(depositor);
    if deposit.initial_value == 0 {
        return Ok(0);
    }
    let kickback_rate = match deposit.front_end_tag {
        Some(front_end) => stability_pool.front_end(&front_end).kickback_rate,
        None => ONE,
    };
    let snapshot = stability_pool.deposit_snapshot(depositor);
    let reward_gain = liquidations_logic::get_reward_gain_from_snapshots(
        stability_pool,
        deposit.initial_value,
        snapshot.epoch,
        snapshot.scale,
        snapshot.p,
        snapshot.g,
    )?;
    math::mul_div(kickback_rate, reward_gain, DECIMAL_PRECISION)
}

pub fn get_front_end_reward_gain(
    stability_pool: &StabilityPoolState,
    front_end: &Pubkey,
) -> Result<u128, TroveError> {
    let front_end_stake = stability_pool.front_end_stake(front_end);
    if front_end_stake == 0 {
        return Ok(0);
    }
    let front_end_share = ONE.saturating_sub(stability_pool.front_end(front_end).kickback_rate);
    let snapshot = stability_pool.front_end_snapshot(front_end);
    let reward_gain = liquidations_logic::get_reward_gain_from_snapshots(
        stability_pool,
        front_end_stake,
        snapshot.epoch,
        snapshot.scale,
        snapshot.p,
        snapshot.g,
    )?;
    math::mul_div(front_end_share, reward_gain, DECIMAL_PRECISION)
}

pub fn get_compounded_stablecoin_deposit(
    stability_pool: &StabilityPoolState,
    depositor: &Pubkey,
) -> Result<u128, TroveError> {
    let initial_deposit = stability_pool.deposit(depositor).initial_value;
    if initial_deposit == 0 {
        return Ok(0);
    }
    let snapshot = stability_pool.deposit_snapshot(depositor);
    liquidations_logic::get_compounded_stake_from_snapshots(
        stability_pool,
        initial_deposit,
        snapshot.p,
        snapshot.scale,
        snapshot.epoch,
    )
}

pub fn get_compounded_front_end_stake(
    stability_pool: &StabilityPoolState,
    front_end: &Pubkey,
) -> Result<u128, TroveError> {
    let front_end_stake = stability_pool.front_end_stake(front_end);
    if front_end_stake == 0 {
        return Ok(0);
    }
    let snapshot = stability_pool.front_end_snapshot(front_end);
    liquidations_logic::get_compounded_stake_from_snapshots(
        stability_pool,
        front_end_stake,
        snapshot.p,
        snapshot.scale,
        snapshot.epoch,
    )
}

fn require_no_under_collateralized_troves(
    market: &BorrowingMarket,
    price: u128,
) -> Result<(), TroveError> {
    if let Some(lowest) = market.sorted_troves.get_last() {
        let icr = trove_manager::get_current_icr(&market.trove_manager, &lowest, price)?;
        if icr < MCR {
            fail!(TroveError::UnderCollateralizedTroves);
        }
    }
    Ok(())
}

fn set_front_end_tag(
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    depositor: Pubkey,
    front_end_tag: Option<Pubkey>,
) {
    stability_pool
        .deposits
        .get_or_default_mut(depositor)
        .front_end_tag = front_end_tag;
    events.emit(ProtocolEvent::FrontEndTagSet {
        depositor,
        front_end: front_end_tag,
    });
}

fn pay_out_reward_gains(
    stability_pool: &StabilityPoolState,
    events: &mut EventLog,
    depositor: &Pubkey,
) -> Result<RewardPayout, TroveError> {
    let front_end = stability_pool.deposit(depositor).front_end_tag;

    let front_end_reward = match front_end {
        Some(front_end) => {
            let reward = get_front_end_reward_gain(stability_pool, &front_end)?;
            events.emit(ProtocolEvent::RewardPaidToFrontEnd { front_end, reward });
            reward
        }
        None => 0,
    };

    let depositor_reward = get_depositor_reward_gain(stability_pool, depositor)?;
    events.emit(ProtocolEvent::RewardPaidToDepositor {
        depositor: *depositor,
        reward: depositor_reward,
    });

    Ok(RewardPayout {
        depositor_reward,
        front_end,
        front_end_reward,
    })
}

fn send_coll_gain_to_depositor(
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    depositor: Pubkey,
    coll_gain: u128,
    stablecoin_loss: u128,
) -> Result<(), TroveError> {
    events.emit(ProtocolEvent::CollGainWithdrawn {
        depositor,
        coll: coll_gain,
        stablecoin_loss,
    });
    if coll_gain == 0 {
        return Ok(());
    }
    stability_pool.coll = stability_pool
        .coll
        .checked_sub(coll_gain)
        .ok_or(TroveError::PoolUnderflow)?;
    events.emit(ProtocolEvent::StabilityPoolCollBalanceUpdated {
        balance: stability_pool.coll,
    });
    Ok(())
}

fn current_sum(stability_pool: &StabilityPoolState) -> SumPair {
    stability_pool
        .epoch_to_scale_to_sum
        .get_sum(stability_pool.current_epoch, stability_pool.current_scale)
        .unwrap_or_default()
}

pub fn update_deposit_and_snapshots(
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    depositor: Pubkey,
    new_value: u128,
) -> Result<(), TroveError> {
    if new_value == 0 {
        stability_pool.deposits.remove(&depositor);
        stability_pool.deposit_snapshots.remove(&depositor);
        events.emit(ProtocolEvent::DepositSnapshotUpdated {
            depositor,
            p: 0,
            s: U256::zero(),
            g: U256::zero(),
        });
        return Ok(());
    }

    stability_pool
        .deposits
        .get_or_default_mut(depositor)
        .initial_value = new_value;

    let sum = current_sum(stability_pool);
    let snapshot = DepositSnapshot::new(
        sum.s,
        stability_pool.p,
        sum.g,
        stability_pool.current_scale,
        stability_pool.current_epoch,
    );
    stability_pool.deposit_snapshots.insert(depositor, snapshot);
    events.emit(ProtocolEvent::DepositSnapshotUpdated {
        depositor,
        p: snapshot.p,
        s: snapshot.s,
        g: snapshot.g,
    });
    Ok(())
}

pub fn update_front_end_stake_and_snapshots(
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    front_end: Pubkey,
    new_stake: u128,
) -> Result<(), TroveError> {
    if new_stake == 0 {
        stability_pool.front_end_stakes.remove(&front_end);
        stability_pool.front_end_snapshots.remove(&front_end);
        events.emit(ProtocolEvent::FrontEndSnapshotUpdated {
            front_end,
            p: 0,
            g: U256::zero(),
        });
        return Ok(());
    }

    stability_pool.front_end_stakes.insert(front_end, new_stake);
    let sum = current_sum(stability_pool);
    let snapshot = FrontEndSnapshot::new(
        stability_pool.p,
        sum.g,
        stability_pool.current_scale,
        stability_pool.current_epoch,
    );
    stability_pool.front_end_snapshots.insert(front_end, snapshot);
    events.emit(ProtocolEvent::FrontEndSnapshotUpdated {
        front_end,
        p: snapshot.p,
        g: snapshot.g,
    });
    Ok(())
}

/// Issues the reward token accrued since the last call and spreads it over
/// the deposits through G. Issuance while the pool is empty is not
/// distributed.
pub fn trigger_reward_issuance(
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    now: u64,
) -> Result<u128, TroveError> {
    let issuance = issuance_logic::issue_rewards(stability_pool, now)?;
    liquidations_logic::update_g(stability_pool, events, issuance)?;
    Ok(issuance)
}

mod liquidations_logic {
    use super::*;

    pub fn compute_rewards_per_unit_staked(
        stability_pool: &mut StabilityPoolState,
        coll_to_add: u128,
        debt_to_offset: u128,
        total_deposits: u128,
    ) -> Result<RewardDistributionCalculation, TroveError> {
        let total = U256::from(total_deposits);

        // The previous rounding error is fed back into the numerator
        let coll_numerator = U256::from(coll_to_add) * U256::from(DECIMAL_PRECISION)
            + U256::from(stability_pool.last_coll_error_offset);

        let stablecoin_loss_per_unit_staked = if debt_to_offset == total_deposits {
            // the whole pool is used up
            stability_pool.last_stablecoin_loss_error_offset = 0;
            ONE
        } else {
            let loss_numerator = (U256::from(debt_to_offset) * U256::from(DECIMAL_PRECISION))
                .checked_sub(U256::from(stability_pool.last_stablecoin_loss_error_offset))
                .ok_or(TroveError::MathOverflow)?;
            // Rounded up so compounded deposits err in favour of the pool
            let loss_per_unit = loss_numerator / total + U256::one();
            stability_pool.last_stablecoin_loss_error_offset =
                math::u256_to_u128(loss_per_unit * total - loss_numerator)?;
            math::u256_to_u128(loss_per_unit)?
        };

        let coll_per_unit = coll_numerator / total;
        stability_pool.last_coll_error_offset =
            math::u256_to_u128(coll_numerator - coll_per_unit * total)?;

        Ok(RewardDistributionCalculation {
            coll_gained_per_unit_staked: math::u256_to_u128(coll_per_unit)?,
            stablecoin_loss_per_unit_staked,
        })
    }

    pub fn update_reward_sum_and_product(
        stability_pool: &mut StabilityPoolState,
        events: &mut EventLog,
        coll_gained_per_unit_staked: u128,
        stablecoin_loss_per_unit_staked: u128,
    ) -> Result<(), TroveError> {
        let current_p = stability_pool.p;
        let current_epoch = stability_pool.current_epoch;
        let current_scale = stability_pool.current_scale;

        let new_product_factor = ONE
            .checked_sub(stablecoin_loss_per_unit_staked)
            .ok_or(TroveError::MathOverflow)?;

        // S first, it is read with the P before this liquidation
        let sum = current_sum(stability_pool);
        let marginal_coll_gain = U256::from(coll_gained_per_unit_staked)
            .checked_mul(U256::from(current_p))
            .ok_or(TroveError::MathOverflow)?;
        let new_s = sum
            .s
            .checked_add(marginal_coll_gain)
            .ok_or(TroveError::MathOverflow)?;
        stability_pool.epoch_to_scale_to_sum.set_sum(
            current_epoch,
            current_scale,
            SumPair::new(new_s, sum.g),
        )?;
        events.emit(ProtocolEvent::SUpdated {
            s: new_s,
            epoch: current_epoch,
            scale: current_scale,
        });

        let (new_p, new_epoch, new_scale) = if new_product_factor == 0 {
            // Stability pool emptied, new epoch
            (ONE, current_epoch + 1, 0)
        } else if math::mul_div(current_p, new_product_factor, DECIMAL_PRECISION)? < SCALE_FACTOR
        {
            // P would lose precision, move to the next scale
            (
                math::mul_div(
                    current_p,
                    new_product_factor * SCALE_FACTOR,
                    DECIMAL_PRECISION,
                )?,
                current_epoch,
                current_scale + 1,
            )
        } else {
            (
                math::mul_div(current_p, new_product_factor, DECIMAL_PRECISION)?,
                current_epoch,
                current_scale,
            )
        };

        if new_p == 0 {
            msg!(
                "P reached zero at epoch {} scale {}",
                new_epoch,
                new_scale
            );
            return Err(TroveError::MathOverflow);
        }

        update_stability_pool_snapshot(stability_pool, events, new_p, new_epoch, new_scale)
    }

    fn update_stability_pool_snapshot(
        stability_pool: &mut StabilityPoolState,
        events: &mut EventLog,
        new_p: u128,
        new_epoch: u64,
        new_scale: u64,
    ) -> Result<(), TroveError> {
        let current_epoch = stability_pool.current_epoch;
        let current_scale = stability_pool.current_scale;

        stability_pool.p = new_p;
        stability_pool.current_epoch = new_epoch;
        stability_pool.current_scale = new_scale;

        if current_epoch != new_epoch {
            events.emit(ProtocolEvent::EpochUpdated { epoch: new_epoch });
        }
        if current_epoch != new_epoch || current_scale != new_scale {
            events.emit(ProtocolEvent::ScaleUpdated { scale: new_scale });
            stability_pool
                .epoch_to_scale_to_sum
                .set_sum(new_epoch, new_scale, SumPair::default())?;
        }
        events.emit(ProtocolEvent::PUpdated { p: new_p });

        Ok(())
    }

    pub fn update_g(
        stability_pool: &mut StabilityPoolState,
        events: &mut EventLog,
        reward_issuance: u128,
    ) -> Result<(), TroveError> {
        let total_deposits = stability_pool.total_stablecoin_deposits;
        if total_deposits == 0 || reward_issuance == 0 {
            return Ok(());
        }

        let total = U256::from(total_deposits);
        let reward_numerator = U256::from(reward_issuance) * U256::from(DECIMAL_PRECISION)
            + U256::from(stability_pool.last_reward_error);
        let reward_per_unit = reward_numerator / total;
        stability_pool.last_reward_error =
            math::u256_to_u128(reward_numerator - reward_per_unit * total)?;

        // A dust deposit makes the per unit reward huge, G stays 256 bits wide
        let marginal_reward_gain = reward_per_unit
            .checked_mul(U256::from(stability_pool.p))
            .ok_or(TroveError::MathOverflow)?;

        let epoch = stability_pool.current_epoch;
        let scale = stability_pool.current_scale;
        let sum = current_sum(stability_pool);
        let new_g = sum
            .g
            .checked_add(marginal_reward_gain)
            .ok_or(TroveError::MathOverflow)?;
        stability_pool
            .epoch_to_scale_to_sum
            .set_sum(epoch, scale, SumPair::new(sum.s, new_g))?;
        events.emit(ProtocolEvent::GUpdated {
            g: new_g,
            epoch,
            scale,
        });
        Ok(())
    }

    pub fn get_coll_gain_from_snapshots(
        stability_pool: &StabilityPoolState,
        initial_deposit: u128,
        snapshot: &DepositSnapshot,
    ) -> Result<u128, TroveError> {
        let sums = &stability_pool.epoch_to_scale_to_sum;

        // Gains made after a scale change are counted at the next scale
        let first_portion = sums
            .get_sum(snapshot.epoch, snapshot.scale)
            .unwrap_or_default()
            .s
            .checked_sub(snapshot.s)
            .ok_or(TroveError::MathOverflow)?;
        let second_portion = sums
            .get_sum(snapshot.epoch, snapshot.scale + 1)
            .unwrap_or_default()
            .s
            / U256::from(SCALE_FACTOR);

        gain_from_sums(
            initial_deposit,
            first_portion,
            second_portion,
            snapshot.p,
        )
    }

    pub fn get_reward_gain_from_snapshots(
        stability_pool: &StabilityPoolState,
        initial_stake: u128,
        epoch_snapshot: u64,
        scale_snapshot: u64,
        p_snapshot: u128,
        g_snapshot: U256,
    ) -> Result<u128, TroveError> {
        let sums = &stability_pool.epoch_to_scale_to_sum;

        let first_portion = sums
            .get_sum(epoch_snapshot, scale_snapshot)
            .unwrap_or_default()
            .g
            .checked_sub(g_snapshot)
            .ok_or(TroveError::MathOverflow)?;
        let second_portion = sums
            .get_sum(epoch_snapshot, scale_snapshot + 1)
            .unwrap_or_default()
            .g
            / U256::from(SCALE_FACTOR);

        gain_from_sums(initial_stake, first_portion, second_portion, p_snapshot)
    }

    fn gain_from_sums(
        initial_stake: u128,
        first_portion: U256,
        second_portion: U256,
        p_snapshot: u128,
    ) -> Result<u128, TroveError> {
        if p_snapshot == 0 {
            return Err(TroveError::MathOverflow);
        }
        let portions = first_portion
            .checked_add(second_portion)
            .ok_or(TroveError::MathOverflow)?;
        let gain = U256::from(initial_stake)
            .checked_mul(portions)
            .ok_or(TroveError::MathOverflow)?
            / U256::from(p_snapshot)
            / U256::from(DECIMAL_PRECISION);
        math::u256_to_u128(gain)
    }

    pub fn get_compounded_stake_from_snapshots(
        stability_pool: &StabilityPoolState,
        initial_stake: u128,
        p_snapshot: u128,
        scale_snapshot: u64,
        epoch_snapshot: u64,
    ) -> Result<u128, TroveError> {
        // Emptied in a later epoch
        if epoch_snapshot < stability_pool.current_epoch {
            return Ok(0);
        }

        let scale_diff = stability_pool
            .current_scale
            .checked_sub(scale_snapshot)
            .ok_or(TroveError::MathOverflow)?;

        let compounded_stake = match scale_diff {
            0 => math::mul_div(initial_stake, stability_pool.p, p_snapshot)?,
            1 => math::mul_div(initial_stake, stability_pool.p, p_snapshot)? / SCALE_FACTOR,
            _ => 0,
        };

        // Below a billionth of the initial stake the value is rounding noise
        if compounded_stake < initial_stake / 1_000_000_000 {
            return Ok(0);
        }
        Ok(compounded_stake)
    }
}

pub mod issuance_logic {
    use super::*;
    use crate::utils::consts::{REWARD_ISSUANCE_FACTOR, REWARD_SUPPLY_CAP, SECONDS_PER_MINUTE};

    /// Brings `total_reward_issued` up to date and returns the newly issued amount.
    pub fn issue_rewards(
        stability_pool: &mut StabilityPoolState,
        now: u64,
    ) -> Result<u128, TroveError> {
        let issuance = compute_new_reward_issuance(
            stability_pool.total_reward_issued,
            stability_pool.reward_issuance_start_ts,
            now,
        )?;
        stability_pool
            .total_reward_issued
            .checked_add_assign(issuance)?;
        Ok(issuance)
    }

    pub fn compute_new_reward_issuance(
        total_issued_so_far: u128,
        start_issuance_timestamp: u64,
        now_timestamp: u64,
    ) -> Result<u128, TroveError> {
        let expected_issued_so_far =
            expected_issuance_since_start(start_issuance_timestamp, now_timestamp)?;
        let new_issuance = expected_issued_so_far.saturating_sub(total_issued_so_far);

        msg!(
            "Issuing {} reward tokens as of {} with an existing {}",
            new_issuance,
            now_timestamp,
            total_issued_so_far
        );
        Ok(new_issuance)
    }

    pub fn expected_issuance_since_start(start: u64, now: u64) -> Result<u128, TroveError> {
        // supply_cap * (1 - F^minutes), F ** 525600 = 0.5 halves the
        // remaining supply every year
        let minutes = now.saturating_sub(start) / SECONDS_PER_MINUTE;
        let decay = math::dec_pow(REWARD_ISSUANCE_FACTOR as u128, minutes)?;
        let fraction = ONE.saturating_sub(decay);
        math::mul_div(REWARD_SUPPLY_CAP, fraction, DECIMAL_PRECISION)
    }
}
