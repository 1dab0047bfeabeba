use anchor_lang::prelude::{msg, Pubkey};

use crate::{
    events::{ProtocolEvent, TroveOperation},
    state::{CollateralRecipient, DebtChange, Payout, Pool},
    utils::{
        consts::{CCR, GAS_COMPENSATION, MCR, MIN_NET_DEBT},
        finance::{self, SystemMode},
        math,
    },
    BorrowingMarket, EventLog, Trove, TroveError, TroveStatus,
};

use super::{
    borrowing_rate::{self, FeeEvent},
    trove_manager,
    types::{
        AdjustTroveEffects, AdjustTroveParams, CloseTroveEffects, Hints, OpenTroveEffects,
        OpenTroveParams,
    },
};

pub fn open_trove(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    owner: Pubkey,
    params: OpenTroveParams,
    price: u128,
    now: u64,
) -> Result<OpenTroveEffects, TroveError> {
    if !market.config.is_borrowing_allowed {
        return Err(TroveError::BorrowingDisabled);
    }
    let system = market.system_balances();
    let (mode, _) = system.mode(price)?;

    borrowing_rate::require_valid_borrowing_max_fee(
        &market.config,
        params.max_fee_percentage,
        mode,
    )?;
    if market.trove_manager.is_active(&owner) {
        return Err(TroveError::TroveAlreadyActive);
    }
    utils::assert_not_zero(params.coll, TroveError::ZeroAmountInvalid)?;

    let borrowing_fee = match mode {
        SystemMode::Normal => utils::trigger_borrowing_fee(
            market,
            events,
            params.stablecoin_amount,
            params.max_fee_percentage,
            now,
        )?,
        SystemMode::Recovery => 0,
    };
    let net_debt = params
        .stablecoin_amount
        .checked_add(borrowing_fee)
        .ok_or(TroveError::MathOverflow)?;
    utils::require_at_least_min_net_debt(net_debt)?;

    let composite_debt = finance::get_composite_debt(net_debt)?;
    let icr = math::compute_cr(params.coll, composite_debt, price)?;
    let nicr = math::compute_nominal_cr(params.coll, composite_debt)?;

    match mode {
        SystemMode::Recovery => {
            if icr < CCR {
                return Err(TroveError::IcrBelowCcrInRecoveryMode);
            }
        }
        SystemMode::Normal => {
            if icr < MCR {
                return Err(TroveError::IcrBelowMcr);
            }
            let new_tcr = system.new_tcr_from_trove_change(
                utils::to_signed(params.coll)?,
                utils::to_signed(composite_debt)?,
                price,
            )?;
            if new_tcr < CCR {
                return Err(TroveError::TcrBelowCcr);
            }
        }
    }

    market.trove_manager.troves.insert(
        owner,
        Trove {
            debt: composite_debt,
            coll: params.coll,
            stake: 0,
            status: TroveStatus::Active,
            array_index: 0,
            front_end_tag: params.front_end_tag,
        },
    );
    trove_manager::update_trove_reward_snapshots(&mut market.trove_manager, events, &owner);
    let stake =
        trove_manager::update_stake_and_total_stakes(&mut market.trove_manager, events, &owner)?;

    market.sorted_troves.insert(
        owner,
        nicr,
        params.hints.upper,
        params.hints.lower,
        &market.trove_manager,
    )?;
    let array_index = trove_manager::add_trove_owner_to_array(&mut market.trove_manager, &owner)?;
    events.emit(ProtocolEvent::TroveCreated { owner, array_index });

    market.active_pool.receive_collateral(params.coll)?;
    market
        .active_pool
        .record_debt_change(DebtChange::Increase(net_debt))?;

    // The gas reserve is minted to the gas pool and counts as debt
    market
        .active_pool
        .record_debt_change(DebtChange::Increase(GAS_COMPENSATION))?;
    market.gas_pool.deposit(GAS_COMPENSATION)?;

    events.emit(ProtocolEvent::TroveUpdated {
        owner,
        debt: composite_debt,
        coll: params.coll,
        stake,
        operation: TroveOperation::OpenTrove,
    });
    if borrowing_fee > 0 {
        events.emit(ProtocolEvent::BorrowingFeePaid {
            owner,
            fee: borrowing_fee,
        });
    }

    Ok(OpenTroveEffects {
        coll_from_owner: params.coll,
        stablecoin_to_owner: params.stablecoin_amount,
        borrowing_fee,
        gas_compensation: GAS_COMPENSATION,
        composite_debt,
        array_index,
    })
}

/// Adds or withdraws collateral and draws or repays debt in one step.
///
/// `stablecoin_balance` is what the owner holds, a repayment cannot exceed it.
#[allow(clippy::too_many_arguments)]
pub fn adjust_trove(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    owner: &Pubkey,
    params: AdjustTroveParams,
    stablecoin_balance: u128,
    price: u128,
    now: u64,
) -> Result<AdjustTroveEffects, TroveError> {
    let system = market.system_balances();
    let (mode, _) = system.mode(price)?;

    let is_debt_increase = params.debt_change > 0;
    if is_debt_increase {
        if !market.config.is_borrowing_allowed {
            return Err(TroveError::BorrowingDisabled);
        }
        borrowing_rate::require_valid_borrowing_max_fee(
            &market.config,
            params.max_fee_percentage,
            mode,
        )?;
    }
    if params.coll_change == 0 && params.debt_change == 0 {
        return Err(TroveError::NoAdjustment);
    }
    if !market.trove_manager.is_active(owner) {
        return Err(TroveError::TroveNotActive);
    }

    trove_manager::apply_pending_rewards(
        &mut market.trove_manager,
        &mut market.active_pool,
        &mut market.default_pool,
        events,
        owner,
    )?;

    let debt_change = params.debt_change.unsigned_abs();
    let coll_change = params.coll_change.unsigned_abs();

    let borrowing_fee = if is_debt_increase && mode == SystemMode::Normal {
        utils::trigger_borrowing_fee(
            market,
            events,
            debt_change,
            params.max_fee_percentage,
            now,
        )?
    } else {
        0
    };
    let net_debt_change = debt_change
        .checked_add(borrowing_fee)
        .ok_or(TroveError::MathOverflow)?;

    let trove = market.trove_manager.trove(owner);
    if params.coll_change < 0 && coll_change > trove.coll {
        return Err(TroveError::CollWithdrawalExceedsColl);
    }

    if !is_debt_increase && debt_change > 0 {
        let net_debt = finance::get_net_debt(trove.debt)?;
        if net_debt_change > net_debt {
            return Err(TroveError::RepaymentExceedsDebt);
        }
        utils::require_at_least_min_net_debt(net_debt - net_debt_change)?;
        if stablecoin_balance < debt_change {
            return Err(TroveError::InsufficientStablecoinBalance);
        }
    }

    let signed_net_debt_change = if is_debt_increase {
        utils::to_signed(net_debt_change)?
    } else {
        -utils::to_signed(net_debt_change)?
    };
    let new_coll = finance::apply_delta(trove.coll, params.coll_change)?;
    let new_debt = finance::apply_delta(trove.debt, signed_net_debt_change)?;

    let old_icr = math::compute_cr(trove.coll, trove.debt, price)?;
    let new_icr = math::compute_cr(new_coll, new_debt, price)?;

    match mode {
        SystemMode::Recovery => {
            if params.coll_change < 0 {
                return Err(TroveError::CollWithdrawalInRecoveryMode);
            }
            if is_debt_increase {
                if new_icr < CCR {
                    return Err(TroveError::IcrBelowCcrInRecoveryMode);
                }
                if new_icr < old_icr {
                    return Err(TroveError::OperationLowersIcrInRecoveryMode);
                }
            }
        }
        SystemMode::Normal => {
            if new_icr < MCR {
                return Err(TroveError::IcrBelowMcr);
            }
            let new_tcr =
                system.new_tcr_from_trove_change(params.coll_change, signed_net_debt_change, price)?;
            if new_tcr < CCR {
                return Err(TroveError::TcrBelowCcr);
            }
        }
    }

    let trove = market.trove_manager.trove_mut(owner)?;
    trove.coll = new_coll;
    trove.debt = new_debt;
    let stake =
        trove_manager::update_stake_and_total_stakes(&mut market.trove_manager, events, owner)?;

    let nicr = math::compute_nominal_cr(new_coll, new_debt)?;
    market.sorted_troves.re_insert(
        *owner,
        nicr,
        params.hints.upper,
        params.hints.lower,
        &market.trove_manager,
    )?;

    events.emit(ProtocolEvent::TroveUpdated {
        owner: *owner,
        debt: new_debt,
        coll: new_coll,
        stake,
        operation: TroveOperation::AdjustTrove,
    });
    if borrowing_fee > 0 {
        events.emit(ProtocolEvent::BorrowingFeePaid {
            owner: *owner,
            fee: borrowing_fee,
        });
    }

    let mut effects = AdjustTroveEffects {
        borrowing_fee,
        ..Default::default()
    };

    if is_debt_increase {
        market
            .active_pool
            .record_debt_change(DebtChange::Increase(net_debt_change))?;
        effects.stablecoin_to_owner = debt_change;
    } else if debt_change > 0 {
        market
            .active_pool
            .record_debt_change(DebtChange::Decrease(debt_change))?;
        effects.stablecoin_to_burn_from_owner = debt_change;
    }

    if params.coll_change > 0 {
        market.active_pool.receive_collateral(coll_change)?;
        effects.coll_from_owner = coll_change;
    } else if params.coll_change < 0 {
        let mut payout = Payout::default();
        market.active_pool.send_collateral(&mut payout, coll_change)?;
        effects.coll_to_owner = payout.amount;
    }

    Ok(effects)
}

pub fn close_trove(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    owner: &Pubkey,
    stablecoin_balance: u128,
    price: u128,
) -> Result<CloseTroveEffects, TroveError> {
    if !market.trove_manager.is_active(owner) {
        return Err(TroveError::TroveNotActive);
    }
    let system = market.system_balances();
    if system.mode(price)?.0 == SystemMode::Recovery {
        return Err(TroveError::NotPermittedInRecoveryMode);
    }

    trove_manager::apply_pending_rewards(
        &mut market.trove_manager,
        &mut market.active_pool,
        &mut market.default_pool,
        events,
        owner,
    )?;

    let trove = market.trove_manager.trove(owner);
    let net_debt = finance::get_net_debt(trove.debt)?;
    if stablecoin_balance < net_debt {
        return Err(TroveError::InsufficientStablecoinBalance);
    }

    let new_tcr = system.new_tcr_from_trove_change(
        -utils::to_signed(trove.coll)?,
        -utils::to_signed(trove.debt)?,
        price,
    )?;
    if new_tcr < CCR {
        return Err(TroveError::TcrBelowCcr);
    }

    trove_manager::remove_stake(&mut market.trove_manager, events, owner)?;
    trove_manager::close_trove(
        &mut market.trove_manager,
        &mut market.sorted_troves,
        events,
        owner,
        TroveStatus::ClosedByOwner,
    )?;
    events.emit(ProtocolEvent::TroveUpdated {
        owner: *owner,
        debt: 0,
        coll: 0,
        stake: 0,
        operation: TroveOperation::CloseTrove,
    });

    // The owner repays the net debt, the gas reserve is burned from the gas pool
    market
        .active_pool
        .record_debt_change(DebtChange::Decrease(net_debt))?;
    market
        .active_pool
        .record_debt_change(DebtChange::Decrease(GAS_COMPENSATION))?;
    market.gas_pool.withdraw(GAS_COMPENSATION)?;

    let mut payout = Payout::default();
    market.active_pool.send_collateral(&mut payout, trove.coll)?;

    Ok(CloseTroveEffects {
        stablecoin_to_burn_from_owner: net_debt,
        gas_compensation_to_burn: GAS_COMPENSATION,
        coll_to_owner: payout.amount,
    })
}

/// Pays out collateral left over by a capped liquidation or a redemption.
pub fn claim_collateral(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    owner: &Pubkey,
) -> Result<u128, TroveError> {
    let mut payout = Payout::default();
    market.coll_surplus_pool.claim_coll(owner, &mut payout)?;
    events.emit(ProtocolEvent::CollSurplusBalanceUpdated {
        owner: *owner,
        balance: 0,
    });
    Ok(payout.amount)
}

/// Tops up a trove with collateral gained in the stability pool. The
/// collateral arrives from the pool, not from the owner's wallet.
pub fn move_coll_gain_to_trove(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    owner: &Pubkey,
    coll_gain: u128,
    hints: Hints,
    price: u128,
    now: u64,
) -> Result<AdjustTroveEffects, TroveError> {
    let params = AdjustTroveParams {
        max_fee_percentage: 0,
        coll_change: utils::to_signed(coll_gain)?,
        debt_change: 0,
        hints,
    };
    adjust_trove(market, events, owner, params, 0, price, now)
}

pub fn add_coll(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    owner: &Pubkey,
    coll: u128,
    hints: Hints,
    price: u128,
    now: u64,
) -> Result<AdjustTroveEffects, TroveError> {
    let params = AdjustTroveParams {
        coll_change: utils::to_signed(coll)?,
        hints,
        ..Default::default()
    };
    adjust_trove(market, events, owner, params, 0, price, now)
}

pub fn withdraw_coll(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    owner: &Pubkey,
    coll: u128,
    hints: Hints,
    price: u128,
    now: u64,
) -> Result<AdjustTroveEffects, TroveError> {
    let params = AdjustTroveParams {
        coll_change: -utils::to_signed(coll)?,
        hints,
        ..Default::default()
    };
    adjust_trove(market, events, owner, params, 0, price, now)
}

#[allow(clippy::too_many_arguments)]
pub fn withdraw_stablecoin(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    owner: &Pubkey,
    max_fee_percentage: u128,
    amount: u128,
    hints: Hints,
    price: u128,
    now: u64,
) -> Result<AdjustTroveEffects, TroveError> {
    let params = AdjustTroveParams {
        max_fee_percentage,
        debt_change: utils::to_signed(amount)?,
        hints,
        ..Default::default()
    };
    adjust_trove(market, events, owner, params, 0, price, now)
}

#[allow(clippy::too_many_arguments)]
pub fn repay_stablecoin(
    market: &mut BorrowingMarket,
    events: &mut EventLog,
    owner: &Pubkey,
    amount: u128,
    hints: Hints,
    stablecoin_balance: u128,
    price: u128,
    now: u64,
) -> Result<AdjustTroveEffects, TroveError> {
    let params = AdjustTroveParams {
        debt_change: -utils::to_signed(amount)?,
        hints,
        ..Default::default()
    };
    adjust_trove(market, events, owner, params, stablecoin_balance, price, now)
}

pub mod utils {
    use super::*;

    pub fn assert_not_zero(value: u128, err: TroveError) -> Result<(), TroveError> {
        if value == 0 {
            Err(err)
        } else {
            Ok(())
        }
    }

    pub fn to_signed(value: u128) -> Result<i128, TroveError> {
        i128::try_from(value).map_err(|_| TroveError::MathOverflow)
    }

    pub fn require_at_least_min_net_debt(net_debt: u128) -> Result<(), TroveError> {
        if net_debt < MIN_NET_DEBT {
            msg!("Net debt {} below minimum {}", net_debt, MIN_NET_DEBT);
            return Err(TroveError::TooLowDebt);
        }
        Ok(())
    }

    /// Decays the base rate and charges the borrowing fee on `amount`.
    pub fn trigger_borrowing_fee(
        market: &mut BorrowingMarket,
        events: &mut EventLog,
        amount: u128,
        max_fee_percentage: u128,
        now: u64,
    ) -> Result<u128, TroveError> {
        let base_rate = borrowing_rate::refresh_base_rate(
            &mut market.trove_manager,
            events,
            FeeEvent::Borrowing,
            now,
        )?;
        if amount == 0 {
            return Ok(0);
        }
        let fee = borrowing_rate::calc_borrowing_fee(&market.config, base_rate, amount)?;
        borrowing_rate::require_user_accepts_fee(fee, amount, max_fee_percentage)?;
        Ok(fee)
    }
}
