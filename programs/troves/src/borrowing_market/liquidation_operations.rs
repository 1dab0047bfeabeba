use anchor_lang::prelude::{msg, Pubkey};

use crate::{
    events::{ProtocolEvent, TroveOperation},
    some_or_break,
    stability_pool::stability_pool_operations,
    state::{Payout, Pool},
    utils::{
        consts::MCR,
        finance::{calc_system_mode, SystemMode},
        math,
    },
    BorrowingMarket, EventLog, StabilityPoolState, TroveError, TroveStatus,
};

use super::{
    liquidation_calcs::{self, LiquidationTotals, LiquidationValues},
    trove_manager,
    types::{LiquidationEffects, LiquidationOutcome, SkipReason},
};

enum Candidates<'a> {
    // Up to n troves walking up from the riskiest one
    Sequence(u64),
    Batch(&'a [Pubkey]),
}

/// Liquidates one trove. Unlike the batch variants an ineligible trove is an error.
pub fn liquidate(
    market: &mut BorrowingMarket,
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    owner: &Pubkey,
    price: u128,
    now: u64,
) -> Result<LiquidationEffects, TroveError> {
    if !market.trove_manager.is_active(owner) {
        return Err(TroveError::TroveNotActive);
    }

    let owners = [*owner];
    let (outcomes, totals) = run_liquidations(
        market,
        stability_pool,
        events,
        Candidates::Batch(&owners),
        price,
    )?;

    if totals.total_debt_in_sequence == 0 {
        return match outcomes.first() {
            Some(LiquidationOutcome::Skipped {
                reason: SkipReason::LastTrove,
                ..
            }) => Err(TroveError::LastTrove),
            _ => Err(TroveError::NothingToLiquidate),
        };
    }

    finalize_liquidations(market, stability_pool, events, outcomes, totals, now)
}

/// Liquidates up to `n` troves starting from the lowest collateral ratio,
/// stopping at the first one that is not eligible.
pub fn liquidate_troves(
    market: &mut BorrowingMarket,
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    n: u64,
    price: u128,
    now: u64,
) -> Result<LiquidationEffects, TroveError> {
    let (outcomes, totals) = run_liquidations(
        market,
        stability_pool,
        events,
        Candidates::Sequence(n),
        price,
    )?;
    if totals.total_debt_in_sequence == 0 {
        return Err(TroveError::NothingToLiquidate);
    }
    finalize_liquidations(market, stability_pool, events, outcomes, totals, now)
}

/// Liquidates every eligible trove of the list, skipping the others.
pub fn batch_liquidate_troves(
    market: &mut BorrowingMarket,
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    owners: &[Pubkey],
    price: u128,
    now: u64,
) -> Result<LiquidationEffects, TroveError> {
    if owners.is_empty() {
        return Err(TroveError::NothingToLiquidate);
    }
    let (outcomes, totals) = run_liquidations(
        market,
        stability_pool,
        events,
        Candidates::Batch(owners),
        price,
    )?;
    if totals.total_debt_in_sequence == 0 {
        return Err(TroveError::NothingToLiquidate);
    }
    finalize_liquidations(market, stability_pool, events, outcomes, totals, now)
}

fn run_liquidations(
    market: &mut BorrowingMarket,
    stability_pool: &StabilityPoolState,
    events: &mut EventLog,
    candidates: Candidates,
    price: u128,
) -> Result<(Vec<LiquidationOutcome>, LiquidationTotals), TroveError> {
    let system = market.system_balances();
    let (mode_at_start, _) = system.mode(price)?;

    let mut outcomes = vec![];
    let mut totals = LiquidationTotals::default();

    let mut remaining_in_sp = stability_pool.total_stablecoin_deposits;
    let mut system_debt = system.debt;
    let mut system_coll = system.coll;
    let mut back_to_normal = mode_at_start == SystemMode::Normal;

    let is_sequence = matches!(candidates, Candidates::Sequence(_));
    let (max_count, batch) = match candidates {
        Candidates::Sequence(n) => (n, &[][..]),
        Candidates::Batch(owners) => (owners.len() as u64, owners),
    };
    let mut cursor = market.sorted_troves.get_last();

    for i in 0..max_count {
        let owner = if is_sequence {
            let owner = some_or_break!(cursor);
            cursor = market.sorted_troves.get_prev(&owner);
            owner
        } else {
            batch[i as usize]
        };

        if !market.trove_manager.is_active(&owner) {
            outcomes.push(LiquidationOutcome::Skipped {
                owner,
                reason: SkipReason::NotActive,
            });
            continue;
        }
        if market.trove_manager.trove_owners_count() <= 1 {
            msg!("Only one trove in the system, skipping {}", owner);
            outcomes.push(LiquidationOutcome::Skipped {
                owner,
                reason: SkipReason::LastTrove,
            });
            break;
        }

        let icr = trove_manager::get_current_icr(&market.trove_manager, &owner, price)?;

        let liquidated = if !back_to_normal {
            if icr >= MCR && remaining_in_sp == 0 {
                outcomes.push(LiquidationOutcome::Skipped {
                    owner,
                    reason: SkipReason::Healthy,
                });
                if is_sequence {
                    break;
                }
                continue;
            }

            let tcr = math::compute_cr(system_coll, system_debt, price)?;
            let values = liquidate_single(
                market,
                events,
                &owner,
                SystemMode::Recovery,
                icr,
                tcr,
                remaining_in_sp,
                price,
            )?;

            if let Some(values) = values {
                system_debt = system_debt.saturating_sub(values.debt_to_offset);
                system_coll = system_coll
                    .saturating_sub(values.coll_to_send_to_sp)
                    .saturating_sub(values.coll_gas_compensation)
                    .saturating_sub(values.coll_surplus);
                let tcr = math::compute_cr(system_coll, system_debt, price)?;
                back_to_normal = calc_system_mode(tcr) == SystemMode::Normal;
            }
            values.map(|v| (v, TroveOperation::LiquidateInRecoveryMode))
        } else if icr < MCR {
            liquidate_single(
                market,
                events,
                &owner,
                SystemMode::Normal,
                icr,
                0,
                remaining_in_sp,
                price,
            )?
            .map(|v| (v, TroveOperation::LiquidateInNormalMode))
        } else {
            outcomes.push(LiquidationOutcome::Skipped {
                owner,
                reason: SkipReason::Healthy,
            });
            if is_sequence {
                break;
            }
            continue;
        };

        match liquidated {
            Some((values, operation)) => {
                remaining_in_sp = remaining_in_sp.saturating_sub(values.debt_to_offset);
                totals.add_assign(&values)?;
                outcomes.push(LiquidationOutcome::Liquidated {
                    owner,
                    values,
                    operation,
                });
            }
            None => outcomes.push(LiquidationOutcome::Skipped {
                owner,
                reason: SkipReason::Healthy,
            }),
        }
    }

    Ok((outcomes, totals))
}

#[allow(clippy::too_many_arguments)]
fn liquidate_single(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    owner: &Pubkey,
    mode: SystemMode,
    icr: u128,
    tcr: u128,
    stablecoin_in_sp: u128,
    price: u128,
) -> Result<Option<LiquidationValues>, TroveError> {
    let entire = trove_manager::get_entire_debt_and_coll(&market.trove_manager, owner)?;
    let decision = liquidation_calcs::evaluate_liquidation_decision(
        mode,
        icr,
        tcr,
        entire.debt,
        stablecoin_in_sp,
    );
    if decision == liquidation_calcs::LiquidationDecision::DoNothing {
        return Ok(None);
    }

    trove_manager::move_pending_trove_rewards_to_active_pool(
        &mut market.active_pool,
        &mut market.default_pool,
        entire.pending_debt_reward,
        entire.pending_coll_reward,
    )?;
    trove_manager::remove_stake(&mut market.trove_manager, events, owner)?;

    let values = liquidation_calcs::calculate_liquidation_values(
        decision,
        entire.debt,
        entire.coll,
        stablecoin_in_sp,
        price,
    )?;
    msg!("Liquidating {} {:?} {:?}", owner, decision, values);

    trove_manager::close_trove(
        &mut market.trove_manager,
        &mut market.sorted_troves,
        events,
        owner,
        TroveStatus::ClosedByLiquidation,
    )?;

    if values.coll_surplus > 0 {
        let balance = market
            .coll_surplus_pool
            .account_surplus(*owner, values.coll_surplus)?;
        events.emit(ProtocolEvent::CollSurplusBalanceUpdated {
            owner: *owner,
            balance,
        });
    }

    let operation = match mode {
        SystemMode::Normal => TroveOperation::LiquidateInNormalMode,
        SystemMode::Recovery => TroveOperation::LiquidateInRecoveryMode,
    };
    events.emit(ProtocolEvent::TroveLiquidated {
        owner: *owner,
        debt: entire.debt,
        coll: entire.coll,
        operation,
    });
    events.emit(ProtocolEvent::TroveUpdated {
        owner: *owner,
        debt: 0,
        coll: 0,
        stake: 0,
        operation,
    });

    Ok(Some(values))
}

/// Applies the totals of a sequence: one offset, one redistribution and
/// one gas compensation payout.
fn finalize_liquidations(
    market: &mut BorrowingMarket,
    stability_pool: &mut StabilityPoolState,
    events: &mut EventLog,
    outcomes: Vec<LiquidationOutcome>,
    totals: LiquidationTotals,
    now: u64,
) -> Result<LiquidationEffects, TroveError> {
    let stablecoin_to_burn_from_sp = stability_pool_operations::offset(
        stability_pool,
        events,
        &mut market.active_pool,
        totals.total_debt_to_offset,
        totals.total_coll_to_send_to_sp,
        now,
    )?;

    trove_manager::redistribute_debt_and_coll(
        &mut market.trove_manager,
        &mut market.active_pool,
        &mut market.default_pool,
        events,
        totals.total_debt_to_redistribute,
        totals.total_coll_to_redistribute,
    )?;

    if totals.total_coll_surplus > 0 {
        market
            .active_pool
            .send_collateral(&mut market.coll_surplus_pool, totals.total_coll_surplus)?;
    }

    trove_manager::update_system_snapshots_exclude_coll_remainder(
        &mut market.trove_manager,
        events,
        &market.active_pool,
        &market.default_pool,
        totals.total_coll_gas_compensation,
    )?;

    events.emit(ProtocolEvent::Liquidation {
        liquidated_debt: totals.total_debt_in_sequence,
        liquidated_coll: totals.liquidated_coll()?,
        coll_gas_compensation: totals.total_coll_gas_compensation,
        stablecoin_gas_compensation: totals.total_stablecoin_gas_compensation,
    });

    // Gas compensation goes to the liquidator
    market
        .gas_pool
        .withdraw(totals.total_stablecoin_gas_compensation)?;
    let mut payout = Payout::default();
    market
        .active_pool
        .send_collateral(&mut payout, totals.total_coll_gas_compensation)?;

    Ok(LiquidationEffects {
        outcomes,
        totals,
        coll_to_liquidator: payout.amount,
        stablecoin_to_liquidator: totals.total_stablecoin_gas_compensation,
        stablecoin_to_burn_from_sp,
    })
}
