use anchor_lang::prelude::{msg, Pubkey};

use crate::{
    events::{ProtocolEvent, TroveOperation},
    sorted_troves::{NominalIcrSource, SortedTroves},
    state::{DebtChange, Pool},
    utils::{
        bn::U256,
        consts::DECIMAL_PRECISION,
        coretypes::CheckedAssign,
        math::{self, u256_to_u128},
    },
    EventLog, RewardSnapshot, TroveError, TroveManagerState, TroveStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntireDebtAndColl {
    pub debt: u128,
    pub coll: u128,
    pub pending_debt_reward: u128,
    pub pending_coll_reward: u128,
}

impl NominalIcrSource for TroveManagerState {
    fn nominal_icr(&self, id: &Pubkey) -> Result<u128, TroveError> {
        get_nominal_icr(self, id)
    }
}

pub fn get_pending_coll_reward(
    trove_manager: &TroveManagerState,
    owner: &Pubkey,
) -> Result<u128, TroveError> {
    let snapshot = trove_manager.reward_snapshot(owner).coll;
    let reward_per_unit_staked = trove_manager.l_coll.saturating_sub(snapshot);
    if reward_per_unit_staked == 0 || !trove_manager.is_active(owner) {
        return Ok(0);
    }
    let stake = trove_manager.trove(owner).stake;
    math::mul_div(stake, reward_per_unit_staked, DECIMAL_PRECISION)
}

pub fn get_pending_debt_reward(
    trove_manager: &TroveManagerState,
    owner: &Pubkey,
) -> Result<u128, TroveError> {
    let snapshot = trove_manager.reward_snapshot(owner).debt;
    let reward_per_unit_staked = trove_manager.l_debt.saturating_sub(snapshot);
    if reward_per_unit_staked == 0 || !trove_manager.is_active(owner) {
        return Ok(0);
    }
    let stake = trove_manager.trove(owner).stake;
    math::mul_div(stake, reward_per_unit_staked, DECIMAL_PRECISION)
}

pub fn has_pending_rewards(trove_manager: &TroveManagerState, owner: &Pubkey) -> bool {
    // A trove has pending rewards if its snapshot is behind the current
    // reward per unit staked, a redistribution happened since its last touch
    let snapshot = trove_manager.reward_snapshot(owner);
    trove_manager.is_active(owner)
        && (snapshot.coll < trove_manager.l_coll || snapshot.debt < trove_manager.l_debt)
}

pub fn get_entire_debt_and_coll(
    trove_manager: &TroveManagerState,
    owner: &Pubkey,
) -> Result<EntireDebtAndColl, TroveError> {
    let trove = trove_manager.trove(owner);
    let pending_debt_reward = get_pending_debt_reward(trove_manager, owner)?;
    let pending_coll_reward = get_pending_coll_reward(trove_manager, owner)?;
    Ok(EntireDebtAndColl {
        debt: trove
            .debt
            .checked_add(pending_debt_reward)
            .ok_or(TroveError::MathOverflow)?,
        coll: trove
            .coll
            .checked_add(pending_coll_reward)
            .ok_or(TroveError::MathOverflow)?,
        pending_debt_reward,
        pending_coll_reward,
    })
}

pub fn get_nominal_icr(
    trove_manager: &TroveManagerState,
    owner: &Pubkey,
) -> Result<u128, TroveError> {
    let EntireDebtAndColl { debt, coll, .. } = get_entire_debt_and_coll(trove_manager, owner)?;
    math::compute_nominal_cr(coll, debt)
}

pub fn get_current_icr(
    trove_manager: &TroveManagerState,
    owner: &Pubkey,
    price: u128,
) -> Result<u128, TroveError> {
    let EntireDebtAndColl { debt, coll, .. } = get_entire_debt_and_coll(trove_manager, owner)?;
    math::compute_cr(coll, debt, price)
}

/// Folds the trove's share of past redistributions into its balances.
pub fn apply_pending_rewards(
    trove_manager: &mut TroveManagerState,
    active_pool: &mut impl Pool,
    default_pool: &mut impl Pool,
    events: &mut EventLog,
    owner: &Pubkey,
) -> Result<(), TroveError> {
    if !has_pending_rewards(trove_manager, owner) {
        return Ok(());
    }

    let pending_coll = get_pending_coll_reward(trove_manager, owner)?;
    let pending_debt = get_pending_debt_reward(trove_manager, owner)?;

    let trove = trove_manager.trove_mut(owner)?;
    trove.coll.checked_add_assign(pending_coll)?;
    trove.debt.checked_add_assign(pending_debt)?;
    let (debt, coll, stake) = (trove.debt, trove.coll, trove.stake);

    update_trove_reward_snapshots(trove_manager, events, owner);
    move_pending_trove_rewards_to_active_pool(
        active_pool,
        default_pool,
        pending_debt,
        pending_coll,
    )?;

    events.emit(ProtocolEvent::TroveUpdated {
        owner: *owner,
        debt,
        coll,
        stake,
        operation: TroveOperation::ApplyPendingRewards,
    });
    Ok(())
}

pub fn move_pending_trove_rewards_to_active_pool(
    active_pool: &mut impl Pool,
    default_pool: &mut impl Pool,
    debt: u128,
    coll: u128,
) -> Result<(), TroveError> {
    if debt > 0 {
        default_pool.record_debt_change(DebtChange::Decrease(debt))?;
        active_pool.record_debt_change(DebtChange::Increase(debt))?;
    }
    default_pool.send_collateral(active_pool, coll)
}

pub fn update_trove_reward_snapshots(
    trove_manager: &mut TroveManagerState,
    events: &mut EventLog,
    owner: &Pubkey,
) {
    let snapshot = RewardSnapshot {
        coll: trove_manager.l_coll,
        debt: trove_manager.l_debt,
    };
    trove_manager.reward_snapshots.insert(*owner, snapshot);
    events.emit(ProtocolEvent::TroveSnapshotsUpdated {
        owner: *owner,
        l_coll: snapshot.coll,
        l_debt: snapshot.debt,
    });
}

/// Stake corrected for collateral already lost to redistributions.
pub fn compute_new_stake(trove_manager: &TroveManagerState, coll: u128) -> Result<u128, TroveError> {
    if trove_manager.total_collateral_snapshot == 0 {
        Ok(coll)
    } else {
        // total_stakes_snapshot is never zero while total_collateral_snapshot isn't
        math::mul_div(
            coll,
            trove_manager.total_stakes_snapshot,
            trove_manager.total_collateral_snapshot,
        )
    }
}

pub fn update_stake_and_total_stakes(
    trove_manager: &mut TroveManagerState,
    events: &mut EventLog,
    owner: &Pubkey,
) -> Result<u128, TroveError> {
    let coll = trove_manager.trove(owner).coll;
    let new_stake = compute_new_stake(trove_manager, coll)?;

    let trove = trove_manager.trove_mut(owner)?;
    let old_stake = trove.stake;
    trove.stake = new_stake;

    trove_manager.total_stakes = trove_manager
        .total_stakes
        .checked_sub(old_stake)
        .ok_or(TroveError::MathOverflow)?
        .checked_add(new_stake)
        .ok_or(TroveError::MathOverflow)?;

    events.emit(ProtocolEvent::TotalStakesUpdated {
        total_stakes: trove_manager.total_stakes,
    });
    Ok(new_stake)
}

pub fn remove_stake(
    trove_manager: &mut TroveManagerState,
    events: &mut EventLog,
    owner: &Pubkey,
) -> Result<(), TroveError> {
    let trove = trove_manager.trove_mut(owner)?;
    let stake = trove.stake;
    trove.stake = 0;
    trove_manager.total_stakes.checked_sub_assign(stake)?;
    events.emit(ProtocolEvent::TotalStakesUpdated {
        total_stakes: trove_manager.total_stakes,
    });
    Ok(())
}

/// Spreads debt and collateral over every active trove in proportion to stake
/// and parks them in the default pool until each trove is touched.
pub fn redistribute_debt_and_coll(
    trove_manager: &mut TroveManagerState,
    active_pool: &mut impl Pool,
    default_pool: &mut impl Pool,
    events: &mut EventLog,
    debt: u128,
    coll: u128,
) -> Result<(), TroveError> {
    if debt == 0 {
        return Ok(());
    }
    let total_stakes = trove_manager.total_stakes;
    if total_stakes == 0 {
        return Err(TroveError::NoStakesToRedistribute);
    }

    // The error of the previous redistribution is fed back into the numerator
    // so truncation does not leak value over many liquidations
    let (coll_reward_per_unit_staked, coll_error) = per_unit_staked(
        coll,
        trove_manager.last_coll_error_redistribution,
        total_stakes,
    )?;
    let (debt_reward_per_unit_staked, debt_error) = per_unit_staked(
        debt,
        trove_manager.last_debt_error_redistribution,
        total_stakes,
    )?;
    trove_manager.last_coll_error_redistribution = coll_error;
    trove_manager.last_debt_error_redistribution = debt_error;

    trove_manager
        .l_coll
        .checked_add_assign(coll_reward_per_unit_staked)?;
    trove_manager
        .l_debt
        .checked_add_assign(debt_reward_per_unit_staked)?;

    events.emit(ProtocolEvent::LTermsUpdated {
        l_coll: trove_manager.l_coll,
        l_debt: trove_manager.l_debt,
    });

    active_pool.record_debt_change(DebtChange::Decrease(debt))?;
    default_pool.record_debt_change(DebtChange::Increase(debt))?;
    active_pool.send_collateral(default_pool, coll)
}

fn per_unit_staked(
    amount: u128,
    last_error: u128,
    total_stakes: u128,
) -> Result<(u128, u128), TroveError> {
    let numerator = U256::from(amount)
        .checked_mul(U256::from(DECIMAL_PRECISION))
        .and_then(|n| n.checked_add(U256::from(last_error)))
        .ok_or(TroveError::MathOverflow)?;
    let total_stakes = U256::from(total_stakes);
    let per_unit = numerator / total_stakes;
    let error = numerator - per_unit * total_stakes;
    Ok((u256_to_u128(per_unit)?, u256_to_u128(error)?))
}

/// Records the stake to collateral ratio after a liquidation sequence.
///
/// The collateral gas compensation is still in the active pool at this point
/// but is about to leave the system, so it is excluded.
pub fn update_system_snapshots_exclude_coll_remainder(
    trove_manager: &mut TroveManagerState,
    events: &mut EventLog,
    active_pool: &impl Pool,
    default_pool: &impl Pool,
    coll_remainder: u128,
) -> Result<(), TroveError> {
    trove_manager.total_stakes_snapshot = trove_manager.total_stakes;
    trove_manager.total_collateral_snapshot = active_pool
        .collateral()
        .checked_sub(coll_remainder)
        .ok_or(TroveError::MathOverflow)?
        .checked_add(default_pool.collateral())
        .ok_or(TroveError::MathOverflow)?;

    events.emit(ProtocolEvent::SystemSnapshotsUpdated {
        total_stakes_snapshot: trove_manager.total_stakes_snapshot,
        total_collateral_snapshot: trove_manager.total_collateral_snapshot,
    });
    Ok(())
}

pub fn add_trove_owner_to_array(
    trove_manager: &mut TroveManagerState,
    owner: &Pubkey,
) -> Result<u64, TroveError> {
    let index = trove_manager.trove_owners_count();
    trove_manager.trove_owners.push(*owner);
    trove_manager.trove_mut(owner)?.array_index = index;
    Ok(index)
}

fn remove_trove_owner(
    trove_manager: &mut TroveManagerState,
    events: &mut EventLog,
    owner: &Pubkey,
) -> Result<(), TroveError> {
    let index = trove_manager.trove(owner).array_index as usize;
    match trove_manager.trove_owners.get(index) {
        Some(at_index) if at_index == owner => {}
        _ => return Err(TroveError::TroveNotActive),
    }

    trove_manager.trove_owners.swap_remove(index);
    if let Some(moved) = trove_manager.trove_owners.get(index).copied() {
        trove_manager.trove_mut(&moved)?.array_index = index as u64;
        events.emit(ProtocolEvent::TroveIndexUpdated {
            owner: moved,
            new_index: index as u64,
        });
    }
    Ok(())
}

/// Moves an active trove into a terminal status, unlinking it from the
/// owners array and the sorted list. The last trove cannot be closed.
pub fn close_trove(
    trove_manager: &mut TroveManagerState,
    sorted_troves: &mut SortedTroves,
    events: &mut EventLog,
    owner: &Pubkey,
    closed_status: TroveStatus,
) -> Result<(), TroveError> {
    if !matches!(
        closed_status,
        TroveStatus::ClosedByOwner | TroveStatus::ClosedByLiquidation | TroveStatus::ClosedByRedemption
    ) {
        return Err(TroveError::TroveNotActive);
    }
    if !trove_manager.is_active(owner) {
        return Err(TroveError::TroveNotActive);
    }
    if trove_manager.trove_owners_count() <= 1 || sorted_troves.get_size() <= 1 {
        msg!("Only one trove in the system, cannot close it");
        return Err(TroveError::LastTrove);
    }

    let trove = trove_manager.trove_mut(owner)?;
    trove.status = closed_status;
    trove.coll = 0;
    trove.debt = 0;
    trove_manager.reward_snapshots.remove(owner);

    remove_trove_owner(trove_manager, events, owner)?;
    sorted_troves.remove(owner)
}
