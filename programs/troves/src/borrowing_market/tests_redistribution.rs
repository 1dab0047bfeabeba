#[cfg(test)]
mod tests {
    use anchor_lang::prelude::Pubkey;
    use quickcheck_macros::quickcheck;

    use crate::{
        borrowing_market::{
            borrowing_operations, liquidation_operations,
            tests_utils::utils::{assert_sorted, new_market, new_trove, PRICE},
            trove_manager,
            types::Hints,
        },
        state::{ActivePool, DefaultPool},
        utils::{
            bn::U256,
            consts::DECIMAL_PRECISION,
            coretypes::{ETH, LUSD, Price},
            math,
        },
        BorrowingMarket, EventLog, StabilityPoolState, TroveError, TroveManagerState,
    };

    /// Three troves with stakes 20, 30 and 50. The first one is
    /// liquidated at price 100 with an empty stability pool, so its
    /// 2210 debt and 19.9 collateral are shared by the other two.
    fn setup() -> (BorrowingMarket, EventLog, [Pubkey; 3]) {
        let (mut market, mut events) = new_market();
        let price = Price::from(PRICE);
        let a = new_trove(&mut market, &mut events, 20.0, 2000.0, price);
        let b = new_trove(&mut market, &mut events, 30.0, 2000.0, price);
        let c = new_trove(&mut market, &mut events, 50.0, 2000.0, price);

        // TCR 150.8%, a at 90.5%
        let mut stability_pool = StabilityPoolState::new(0);
        liquidation_operations::liquidate(
            &mut market,
            &mut stability_pool,
            &mut events,
            &a,
            Price::from(100.0),
            0,
        )
        .unwrap();
        (market, events, [a, b, c])
    }

    #[test]
    fn test_redistribution_reward_per_unit_staked() {
        let (market, _, _) = setup();
        let tm = &market.trove_manager;

        assert_eq!(tm.l_coll, ETH::from(0.24875));
        assert_eq!(tm.l_debt, LUSD::from(27.625));
        assert_eq!(tm.last_coll_error_redistribution, 0);
        assert_eq!(tm.last_debt_error_redistribution, 0);

        assert_eq!(market.default_pool.debt, LUSD::from(2210.0));
        assert_eq!(market.default_pool.coll, ETH::from(19.9));
        assert_eq!(tm.total_stakes, ETH::from(80.0));
        assert_eq!(tm.total_stakes_snapshot, ETH::from(80.0));
        // the 0.1 gas compensation left the system
        assert_eq!(tm.total_collateral_snapshot, ETH::from(99.9));
    }

    #[test]
    fn test_pending_rewards_proportional_to_stake() {
        let (market, _, [a, b, c]) = setup();
        let tm = &market.trove_manager;

        assert!(!trove_manager::has_pending_rewards(tm, &a));
        assert_eq!(trove_manager::get_pending_debt_reward(tm, &a).unwrap(), 0);

        assert_eq!(
            trove_manager::get_pending_coll_reward(tm, &b).unwrap(),
            ETH::from(7.4625)
        );
        assert_eq!(
            trove_manager::get_pending_debt_reward(tm, &b).unwrap(),
            LUSD::from(828.75)
        );

        let entire = trove_manager::get_entire_debt_and_coll(tm, &c).unwrap();
        assert_eq!(entire.pending_coll_reward, ETH::from(12.4375));
        assert_eq!(entire.pending_debt_reward, LUSD::from(1381.25));
        assert_eq!(entire.coll, ETH::from(62.4375));
        assert_eq!(entire.debt, LUSD::from(3591.25));

        // (62.4375 * 100) / 3591.25
        assert_eq!(
            trove_manager::get_current_icr(tm, &c, Price::from(100.0)).unwrap(),
            math::mul_div(ETH::from(62.4375), Price::from(100.0), LUSD::from(3591.25)).unwrap()
        );
        assert_sorted(&market);
    }

    #[test]
    fn test_touching_a_trove_applies_rewards_and_updates_stake() {
        let (mut market, mut events, [_, b, c]) = setup();

        borrowing_operations::add_coll(
            &mut market,
            &mut events,
            &b,
            ETH::from(1.0),
            Hints::default(),
            Price::from(PRICE),
            0,
        )
        .unwrap();

        let tm = &market.trove_manager;
        let trove = tm.trove(&b);
        assert_eq!(trove.coll, ETH::from(38.4625));
        assert_eq!(trove.debt, LUSD::from(3038.75));
        assert!(!trove_manager::has_pending_rewards(tm, &b));
        assert_eq!(tm.reward_snapshot(&b).coll, tm.l_coll);
        assert_eq!(tm.reward_snapshot(&b).debt, tm.l_debt);

        // stakes are scaled by the collateral lost to past redistributions
        let expected_stake =
            math::mul_div(ETH::from(38.4625), ETH::from(80.0), ETH::from(99.9)).unwrap();
        assert_eq!(trove.stake, expected_stake);
        assert!(trove.stake < trove.coll);
        assert_eq!(tm.total_stakes, ETH::from(50.0) + expected_stake);

        // c is untouched and still has its share parked in the default pool
        assert!(trove_manager::has_pending_rewards(tm, &c));
        assert_eq!(market.default_pool.debt, LUSD::from(1381.25));
        assert_eq!(market.default_pool.coll, ETH::from(12.4375));
        assert_eq!(market.active_pool.coll, ETH::from(88.4625));

        // a new trove is staked at the same rate
        let d = new_trove(
            &mut market,
            &mut events,
            99.9,
            2000.0,
            Price::from(PRICE),
        );
        assert_eq!(market.trove_manager.trove(&d).stake, ETH::from(80.0));
    }

    #[test]
    fn test_redistribution_needs_stakes() {
        let mut trove_manager = TroveManagerState::new(0);
        let mut active_pool = ActivePool {
            coll: ETH::from(10.0),
            debt: LUSD::from(1000.0),
        };
        let mut default_pool = DefaultPool::default();
        let mut events = EventLog::default();

        assert_eq!(
            trove_manager::redistribute_debt_and_coll(
                &mut trove_manager,
                &mut active_pool,
                &mut default_pool,
                &mut events,
                LUSD::from(1000.0),
                ETH::from(10.0),
            ),
            Err(TroveError::NoStakesToRedistribute)
        );
        // nothing to do
        trove_manager::redistribute_debt_and_coll(
            &mut trove_manager,
            &mut active_pool,
            &mut default_pool,
            &mut events,
            0,
            0,
        )
        .unwrap();
        assert_eq!(default_pool, DefaultPool::default());
    }

    #[quickcheck]
    fn test_redistribution_error_is_carried(amounts: Vec<u32>, total_stakes: u32) -> bool {
        let amounts: Vec<u128> = amounts
            .iter()
            .take(10)
            .map(|amount| *amount as u128 * 1_000_000_000 + 1)
            .collect();
        let total: u128 = amounts.iter().sum();

        let mut trove_manager = TroveManagerState::new(0);
        trove_manager.total_stakes = (total_stakes as u128 + 1) * 1_000_000_000;
        let mut active_pool = ActivePool {
            coll: total,
            debt: total,
        };
        let mut default_pool = DefaultPool::default();
        let mut events = EventLog::default();

        for amount in amounts.iter() {
            trove_manager::redistribute_debt_and_coll(
                &mut trove_manager,
                &mut active_pool,
                &mut default_pool,
                &mut events,
                *amount,
                *amount,
            )
            .unwrap();
        }

        // Nothing is lost to truncation, it is only deferred
        let distributed = U256::from(trove_manager.l_debt) * U256::from(trove_manager.total_stakes)
            + U256::from(trove_manager.last_debt_error_redistribution);
        distributed == U256::from(total) * U256::from(DECIMAL_PRECISION)
            && trove_manager.last_debt_error_redistribution < trove_manager.total_stakes
            && default_pool.debt == total
            && active_pool.debt == 0
    }
}
