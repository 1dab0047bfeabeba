// Redeeming stablecoin for collateral at face value
// 1. The redeemer burns x stablecoin and receives x / price collateral,
//    minus the redemption fee.
// 2. Troves are redeemed against from the lowest collateral ratio upwards,
//    skipping the ones below MCR which are left to liquidations.
// 3. A trove whose whole net debt is redeemed is closed, the gas reserve
//    is burned and the collateral left over is claimable from the
//    collateral surplus pool.
// 4. At most one trove is redeemed partially and it must keep the minimum
//    net debt, the walk stops there.

use anchor_lang::prelude::{msg, Pubkey};

use super::types::{
    RedemptionEffects, RedemptionParams, RedemptionTotals, SingleRedemption,
};
use crate::{
    borrowing_market::{
        borrowing_rate::{self, FeeEvent},
        trove_manager,
        types::Hints,
    },
    events::{ProtocolEvent, TroveOperation},
    fail,
    state::{DebtChange, Payout, Pool},
    utils::{
        consts::{DECIMAL_PRECISION, GAS_COMPENSATION, MCR, MIN_NET_DEBT},
        coretypes::CheckedAssign,
        finance, math,
    },
    BorrowingMarket, EventLog, TroveError, TroveStatus,
};

pub fn redeem_collateral(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    redeemer_balance: u128,
    params: RedemptionParams,
    price: u128,
    now: u64,
) -> Result<RedemptionEffects, TroveError> {
    borrowing_rate::require_valid_redemption_max_fee(&market.config, params.max_fee_percentage)?;

    let bootstrap_end = market
        .trove_manager
        .deployment_time
        .saturating_add(market.config.bootstrap_period);
    if now < bootstrap_end {
        fail!(TroveError::CannotRedeemDuringBootstrapPeriod);
    }

    let system = market.system_balances();
    if system.tcr(price)? < MCR {
        fail!(TroveError::CannotRedeemWhenUndercollateralized);
    }
    if params.amount == 0 {
        fail!(TroveError::ZeroAmountInvalid);
    }
    if redeemer_balance < params.amount {
        fail!(TroveError::InsufficientStablecoinBalance);
    }

    let total_supply_at_start = system.debt;
    let mut remaining = params.amount;
    let mut totals = RedemptionTotals::default();

    let mut current = match params.first_hint {
        Some(hint) if is_valid_first_redemption_hint(market, &hint, price)? => Some(hint),
        _ => lowest_trove_above_mcr(market, price)?,
    };

    let mut iterations = params.max_iterations;
    while remaining > 0 {
        let owner = match current {
            Some(owner) => owner,
            None => break,
        };
        if params.max_iterations != 0 {
            if iterations == 0 {
                break;
            }
            iterations -= 1;
        }

        // Saved before the trove moves or leaves the list
        let next_to_check = market.sorted_troves.get_prev(&owner);

        trove_manager::apply_pending_rewards(
            &mut market.trove_manager,
            &mut market.active_pool,
            &mut market.default_pool,
            events,
            &owner,
        )?;

        match redeem_collateral_from_trove(
            market,
            events,
            &owner,
            remaining,
            price,
            params.hints,
            params.partial_nicr_hint,
        )? {
            SingleRedemption::Redeemed {
                stablecoin_lot,
                coll_lot,
            } => {
                totals
                    .total_stablecoin_to_redeem
                    .checked_add_assign(stablecoin_lot)?;
                totals.total_coll_drawn.checked_add_assign(coll_lot)?;
                remaining -= stablecoin_lot;

                if market.trove_manager.is_active(&owner) {
                    // partially redeemed, nothing further down the list
                    break;
                }
                totals
                    .total_gas_compensation
                    .checked_add_assign(GAS_COMPENSATION)?;
            }
            SingleRedemption::Stopped | SingleRedemption::Cancelled => break,
        }

        current = next_to_check;
    }

    if totals.total_coll_drawn == 0 {
        fail!(TroveError::UnableToRedeemAnyAmount);
    }

    let base_rate = borrowing_rate::refresh_base_rate(
        &mut market.trove_manager,
        events,
        FeeEvent::Redemption {
            coll_drawn: totals.total_coll_drawn,
            price,
            total_supply: total_supply_at_start,
        },
        now,
    )?;
    let collateral_fee =
        borrowing_rate::calc_redemption_fee(&market.config, base_rate, totals.total_coll_drawn)?;
    borrowing_rate::require_user_accepts_fee(
        collateral_fee,
        totals.total_coll_drawn,
        params.max_fee_percentage,
    )?;

    events.emit(ProtocolEvent::Redemption {
        attempted_amount: params.amount,
        actual_amount: totals.total_stablecoin_to_redeem,
        coll_sent: totals.total_coll_drawn,
        coll_fee: collateral_fee,
    });

    // The redeemed stablecoin is burned and cancels the same amount of debt
    market
        .active_pool
        .record_debt_change(DebtChange::Decrease(totals.total_stablecoin_to_redeem))?;

    let mut fee_payout = Payout::default();
    market
        .active_pool
        .send_collateral(&mut fee_payout, collateral_fee)?;
    let mut redeemer_payout = Payout::default();
    market
        .active_pool
        .send_collateral(&mut redeemer_payout, totals.total_coll_drawn - collateral_fee)?;

    Ok(RedemptionEffects {
        actual_amount_redeemed: totals.total_stablecoin_to_redeem,
        collateral_drawn: totals.total_coll_drawn,
        collateral_to_redeemer: redeemer_payout.amount,
        collateral_fee: fee_payout.amount,
        gas_compensation_to_burn: totals.total_gas_compensation,
        truncated: totals.total_stablecoin_to_redeem < params.amount,
    })
}

fn redeem_collateral_from_trove(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    owner: &Pubkey,
    max_stablecoin_amount: u128,
    price: u128,
    hints: Hints,
    partial_nicr_hint: Option<u128>,
) -> Result<SingleRedemption, TroveError> {
    let trove = market.trove_manager.trove(owner);
    let net_debt = finance::get_net_debt(trove.debt)?;

    if max_stablecoin_amount >= net_debt {
        if market.trove_manager.trove_owners_count() <= 1 || market.sorted_troves.get_size() <= 1
        {
            msg!("Redemption stopped at the last trove {}", owner);
            return Ok(SingleRedemption::Stopped);
        }

        let coll_lot = math::mul_div(net_debt, DECIMAL_PRECISION, price)?;
        let coll_surplus = trove
            .coll
            .checked_sub(coll_lot)
            .ok_or(TroveError::MathOverflow)?;

        trove_manager::remove_stake(&mut market.trove_manager, events, owner)?;
        trove_manager::close_trove(
            &mut market.trove_manager,
            &mut market.sorted_troves,
            events,
            owner,
            TroveStatus::ClosedByRedemption,
        )?;
        redeem_close_trove(market, events, owner, coll_surplus)?;

        events.emit(ProtocolEvent::TroveUpdated {
            owner: *owner,
            debt: 0,
            coll: 0,
            stake: 0,
            operation: TroveOperation::RedeemCollateral,
        });

        return Ok(SingleRedemption::Redeemed {
            stablecoin_lot: net_debt,
            coll_lot,
        });
    }

    // The trove keeps at least the minimum net debt
    let stablecoin_lot = u128::min(
        max_stablecoin_amount,
        net_debt.saturating_sub(MIN_NET_DEBT),
    );
    if stablecoin_lot == 0 {
        return Ok(SingleRedemption::Cancelled);
    }

    let coll_lot = math::mul_div(stablecoin_lot, DECIMAL_PRECISION, price)?;
    let new_debt = trove.debt - stablecoin_lot;
    let new_coll = trove
        .coll
        .checked_sub(coll_lot)
        .ok_or(TroveError::MathOverflow)?;
    let new_nicr = math::compute_nominal_cr(new_coll, new_debt)?;

    if let Some(expected_nicr) = partial_nicr_hint {
        if expected_nicr != new_nicr {
            msg!(
                "Partial redemption hint {} does not match {}, skipping",
                expected_nicr,
                new_nicr
            );
            return Ok(SingleRedemption::Cancelled);
        }
    }

    market.sorted_troves.re_insert(
        *owner,
        new_nicr,
        hints.upper,
        hints.lower,
        &market.trove_manager,
    )?;

    let trove = market.trove_manager.trove_mut(owner)?;
    trove.debt = new_debt;
    trove.coll = new_coll;
    let stake =
        trove_manager::update_stake_and_total_stakes(&mut market.trove_manager, events, owner)?;

    events.emit(ProtocolEvent::TroveUpdated {
        owner: *owner,
        debt: new_debt,
        coll: new_coll,
        stake,
        operation: TroveOperation::RedeemCollateral,
    });

    Ok(SingleRedemption::Redeemed {
        stablecoin_lot,
        coll_lot,
    })
}

/// Burns the gas reserve of a trove closed by redemption and moves its
/// remaining collateral to the surplus pool.
fn redeem_close_trove(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    owner: &Pubkey,
    coll_surplus: u128,
) -> Result<(), TroveError> {
    market.gas_pool.withdraw(GAS_COMPENSATION)?;
    market
        .active_pool
        .record_debt_change(DebtChange::Decrease(GAS_COMPENSATION))?;

    if coll_surplus > 0 {
        let balance = market
            .coll_surplus_pool
            .account_surplus(*owner, coll_surplus)?;
        market
            .active_pool
            .send_collateral(&mut market.coll_surplus_pool, coll_surplus)?;
        events.emit(ProtocolEvent::CollSurplusBalanceUpdated {
            owner: *owner,
            balance,
        });
    }
    Ok(())
}

fn is_valid_first_redemption_hint(
    market: &BorrowingMarket,
    hint: &Pubkey,
    price: u128,
) -> Result<bool, TroveError> {
    if !market.sorted_troves.contains(hint)
        || trove_manager::get_current_icr(&market.trove_manager, hint, price)? < MCR
    {
        return Ok(false);
    }
    match market.sorted_troves.get_next(hint) {
        Some(next) => Ok(trove_manager::get_current_icr(&market.trove_manager, &next, price)? < MCR),
        None => Ok(true),
    }
}

/// Walks up from the tail past every trove below MCR.
pub fn lowest_trove_above_mcr(
    market: &BorrowingMarket,
    price: u128,
) -> Result<Option<Pubkey>, TroveError> {
    let mut current = market.sorted_troves.get_last();
    while let Some(owner) = current {
        if trove_manager::get_current_icr(&market.trove_manager, &owner, price)? >= MCR {
            break;
        }
        current = market.sorted_troves.get_prev(&owner);
    }
    Ok(current)
}
