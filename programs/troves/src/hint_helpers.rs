//! Read-only helpers computing the hints callers pass to redemptions and
//! sorted list insertions. Nothing here mutates state.

use anchor_lang::prelude::Pubkey;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    borrowing_market::trove_manager::{self, EntireDebtAndColl},
    redemption::redemption_operations::lowest_trove_above_mcr,
    utils::{
        consts::{DECIMAL_PRECISION, MIN_NET_DEBT},
        finance, math,
    },
    BorrowingMarket, TroveError,
};

/// Simulates a redemption of `amount` without touching the market.
///
/// Returns the first trove the redemption would hit, the NICR the partially
/// redeemed trove would end up with (if any) and the amount that can
/// actually be redeemed. `max_iterations` of zero means no limit.
pub fn get_redemption_hints(
    market: &BorrowingMarket,
    amount: u128,
    price: u128,
    max_iterations: u64,
) -> Result<(Option<Pubkey>, Option<u128>, u128), TroveError> {
    let first_hint = lowest_trove_above_mcr(market, price)?;

    let mut remaining = amount;
    let mut partial_nicr = None;
    let mut current = first_hint;
    let mut closed = 0;
    let mut iterations = 0;

    while let Some(owner) = current {
        if remaining == 0 || (max_iterations != 0 && iterations >= max_iterations) {
            break;
        }
        iterations += 1;

        let EntireDebtAndColl { debt, coll, .. } =
            trove_manager::get_entire_debt_and_coll(&market.trove_manager, &owner)?;
        let net_debt = finance::get_net_debt(debt)?;

        if net_debt > remaining {
            if net_debt > MIN_NET_DEBT {
                let lot = u128::min(remaining, net_debt - MIN_NET_DEBT);
                let new_coll = coll
                    .checked_sub(math::mul_div(lot, DECIMAL_PRECISION, price)?)
                    .ok_or(TroveError::MathOverflow)?;
                partial_nicr = Some(math::compute_nominal_cr(new_coll, debt - lot)?);
                remaining -= lot;
            }
            break;
        }

        // The last trove cannot be closed by a redemption
        if market.sorted_troves.get_size() - closed <= 1 {
            break;
        }
        remaining -= net_debt;
        closed += 1;
        current = market.sorted_troves.get_prev(&owner);
    }

    Ok((first_hint, partial_nicr, amount - remaining))
}

/// Samples `num_trials` random troves and returns the one whose NICR is
/// closest to `nicr`, a good starting point for `find_insert_position`.
///
/// Also returns the distance to `nicr` and a seed to continue sampling from.
pub fn get_approx_hint(
    market: &BorrowingMarket,
    nicr: u128,
    num_trials: u64,
    seed: u64,
) -> Result<(Option<Pubkey>, u128, u64), TroveError> {
    let owners: &[Pubkey] = &market.trove_manager.trove_owners;
    let mut hint = match market.sorted_troves.get_last() {
        Some(last) => last,
        None => return Ok((None, 0, seed)),
    };
    let mut diff = nicr_distance(market, &hint, nicr)?;

    let mut rng = StdRng::seed_from_u64(seed);
    for _ in 0..num_trials {
        let candidate = owners[rng.gen_range(0..owners.len())];
        let candidate_diff = nicr_distance(market, &candidate, nicr)?;
        if candidate_diff < diff {
            diff = candidate_diff;
            hint = candidate;
        }
    }

    Ok((Some(hint), diff, rng.gen()))
}

fn nicr_distance(market: &BorrowingMarket, owner: &Pubkey, nicr: u128) -> Result<u128, TroveError> {
    let current = trove_manager::get_nominal_icr(&market.trove_manager, owner)?;
    Ok(current.abs_diff(nicr))
}
