#[cfg(test)]
mod tests {
    use anchor_lang::prelude::Pubkey;

    use crate::{
        assert_fuzzy_eq,
        borrowing_market::{
            borrowing_operations, liquidation_operations,
            tests_utils::utils::{new_market, new_trove, PRICE},
            trove_manager,
            types::{LiquidationOutcome, SkipReason},
        },
        events::TroveOperation,
        stability_pool::stability_pool_operations,
        utils::{
            consts::GAS_COMPENSATION,
            coretypes::{ETH, LUSD, Price},
        },
        BorrowingMarket, EventLog, ProtocolEvent, StabilityPoolState, TroveError, TroveStatus,
    };

    // Normal mode
    // - [x] ICR < MCR, offset against the stability pool
    // - [x] ICR < MCR, empty pool, everything redistributed
    // - [x] ICR >= MCR, nothing to liquidate
    // Recovery mode
    // - [x] ICR <= 100%, redistributed even with a funded pool
    // - [x] MCR <= ICR < TCR, capped at MCR, surplus claimable
    // - [x] MCR <= ICR < TCR, pool too small, nothing to liquidate
    // Sequences
    // - [x] stop at the first healthy trove
    // - [x] batches skip what they can't liquidate
    // - [x] the last trove is never liquidated

    const EPS: u128 = 1_000_000_000;

    fn provide(
        stability_pool: &mut StabilityPoolState,
        events: &mut EventLog,
        amount: f64,
    ) -> Pubkey {
        let depositor = Pubkey::new_unique();
        stability_pool_operations::provide_to_sp(
            stability_pool,
            events,
            depositor,
            LUSD::from(amount),
            None,
            0,
        )
        .unwrap();
        depositor
    }

    /// The pools hold exactly what the active troves owe and own,
    /// give or take the truncation of pending rewards. Stakes add up.
    fn assert_system_totals(market: &BorrowingMarket) {
        let stakes: u128 = market
            .trove_manager
            .trove_owners
            .iter()
            .map(|owner| market.trove_manager.trove(owner).stake)
            .sum();
        assert_eq!(stakes, market.trove_manager.total_stakes);

        let (debt, coll) = market
            .trove_manager
            .trove_owners
            .iter()
            .map(|owner| trove_manager::get_entire_debt_and_coll(&market.trove_manager, owner).unwrap())
            .fold((0, 0), |(debt, coll), entire| {
                (debt + entire.debt, coll + entire.coll)
            });
        assert_fuzzy_eq!(
            debt,
            market.active_pool.debt + market.default_pool.debt,
            EPS
        );
        assert_fuzzy_eq!(
            coll,
            market.active_pool.coll + market.default_pool.coll,
            EPS
        );
    }

    #[test]
    fn test_liquidate_normal_mode_offset() {
        let (mut market, mut events) = new_market();
        let mut stability_pool = StabilityPoolState::new(0);
        let price = Price::from(PRICE);
        new_trove(&mut market, &mut events, 1000.0, 10_000.0, price);
        let alice = new_trove(&mut market, &mut events, 20.0, 2000.0, price);
        let bob = new_trove(&mut market, &mut events, 30.0, 2000.0, price);
        provide(&mut stability_pool, &mut events, 5000.0);

        // alice at 108.6%, bob at 162.9%
        let price = Price::from(120.0);
        assert_eq!(
            liquidation_operations::liquidate(
                &mut market,
                &mut stability_pool,
                &mut events,
                &bob,
                price,
                0
            ),
            Err(TroveError::NothingToLiquidate)
        );

        let effects = liquidation_operations::liquidate(
            &mut market,
            &mut stability_pool,
            &mut events,
            &alice,
            price,
            0,
        )
        .unwrap();

        assert_eq!(effects.stablecoin_to_burn_from_sp, LUSD::from(2210.0));
        assert_eq!(effects.coll_to_liquidator, ETH::from(0.1));
        assert_eq!(effects.stablecoin_to_liquidator, GAS_COMPENSATION);
        assert_eq!(effects.totals.total_debt_to_redistribute, 0);
        assert!(matches!(
            effects.outcomes[..],
            [LiquidationOutcome::Liquidated {
                operation: TroveOperation::LiquidateInNormalMode,
                ..
            }]
        ));

        assert_eq!(
            market.trove_manager.status(&alice),
            TroveStatus::ClosedByLiquidation
        );
        assert!(!market.sorted_troves.contains(&alice));
        assert_eq!(stability_pool.total_stablecoin_deposits, LUSD::from(2790.0));
        assert_eq!(stability_pool.coll, ETH::from(19.9));
        assert_eq!(market.active_pool.coll, ETH::from(1030.0));
        assert_eq!(
            market.active_pool.debt,
            LUSD::from(10_250.0) + LUSD::from(2210.0)
        );
        assert_eq!(market.gas_pool.stablecoin, 2 * GAS_COMPENSATION);
        assert_eq!(market.trove_manager.total_stakes, ETH::from(1030.0));
        assert_eq!(market.trove_manager.total_stakes_snapshot, ETH::from(1030.0));
        assert_eq!(
            market.trove_manager.total_collateral_snapshot,
            ETH::from(1030.0)
        );
        assert!(events.iter().any(|e| matches!(
            e,
            ProtocolEvent::Liquidation { liquidated_debt, liquidated_coll, .. }
                if *liquidated_debt == LUSD::from(2210.0) && *liquidated_coll == ETH::from(19.9)
        )));

        assert_eq!(
            liquidation_operations::liquidate(
                &mut market,
                &mut stability_pool,
                &mut events,
                &alice,
                price,
                0
            ),
            Err(TroveError::TroveNotActive)
        );
        assert_system_totals(&market);
    }

    #[test]
    fn test_liquidate_normal_mode_empty_pool_redistributes() {
        let (mut market, mut events) = new_market();
        let mut stability_pool = StabilityPoolState::new(0);
        let price = Price::from(PRICE);
        new_trove(&mut market, &mut events, 1000.0, 10_000.0, price);
        let alice = new_trove(&mut market, &mut events, 20.0, 2000.0, price);
        new_trove(&mut market, &mut events, 30.0, 2000.0, price);

        let effects = liquidation_operations::liquidate(
            &mut market,
            &mut stability_pool,
            &mut events,
            &alice,
            Price::from(120.0),
            0,
        )
        .unwrap();

        assert_eq!(effects.stablecoin_to_burn_from_sp, 0);
        assert_eq!(effects.totals.total_debt_to_redistribute, LUSD::from(2210.0));
        assert_eq!(market.default_pool.debt, LUSD::from(2210.0));
        assert_eq!(market.default_pool.coll, ETH::from(19.9));
        assert_eq!(market.active_pool.coll, ETH::from(1030.0));
        assert_eq!(stability_pool.total_stablecoin_deposits, 0);
        assert_system_totals(&market);
    }

    #[test]
    fn test_liquidate_recovery_mode_below_100_percent() {
        let (mut market, mut events) = new_market();
        let mut stability_pool = StabilityPoolState::new(0);
        let price = Price::from(PRICE);
        let alice = new_trove(&mut market, &mut events, 20.0, 2000.0, price);
        new_trove(&mut market, &mut events, 40.0, 2000.0, price);
        provide(&mut stability_pool, &mut events, 5000.0);

        // TCR 135.7%, alice at 90.5%
        let effects = liquidation_operations::liquidate(
            &mut market,
            &mut stability_pool,
            &mut events,
            &alice,
            Price::from(100.0),
            0,
        )
        .unwrap();

        assert!(matches!(
            effects.outcomes[..],
            [LiquidationOutcome::Liquidated {
                operation: TroveOperation::LiquidateInRecoveryMode,
                ..
            }]
        ));
        assert_eq!(effects.stablecoin_to_burn_from_sp, 0);
        assert_eq!(stability_pool.total_stablecoin_deposits, LUSD::from(5000.0));
        assert_eq!(market.default_pool.debt, LUSD::from(2210.0));
        assert_eq!(market.default_pool.coll, ETH::from(19.9));
        assert_system_totals(&market);
    }

    #[test]
    fn test_liquidate_recovery_mode_capped_offset() {
        let (mut market, mut events) = new_market();
        let mut stability_pool = StabilityPoolState::new(0);
        let price = Price::from(PRICE);
        let alice = new_trove(&mut market, &mut events, 26.0, 2000.0, price);
        let bob = new_trove(&mut market, &mut events, 40.0, 2000.0, price);
        provide(&mut stability_pool, &mut events, 2000.0);

        // TCR 149.3%, alice at 117.6%, bob at 181%
        let price = Price::from(100.0);
        let liquidate = |market: &mut BorrowingMarket,
                         stability_pool: &mut StabilityPoolState,
                         events: &mut EventLog,
                         owner: &Pubkey| {
            liquidation_operations::liquidate(market, stability_pool, events, owner, price, 0)
        };

        // The pool can't absorb the whole debt
        assert_eq!(
            liquidate(&mut market, &mut stability_pool, &mut events, &alice),
            Err(TroveError::NothingToLiquidate)
        );
        provide(&mut stability_pool, &mut events, 1000.0);
        assert_eq!(
            liquidate(&mut market, &mut stability_pool, &mut events, &bob),
            Err(TroveError::NothingToLiquidate)
        );

        let effects = liquidate(&mut market, &mut stability_pool, &mut events, &alice).unwrap();
        let values = match effects.outcomes[..] {
            [LiquidationOutcome::Liquidated {
                values,
                operation: TroveOperation::LiquidateInRecoveryMode,
                ..
            }] => values,
            _ => panic!("unexpected outcomes {:?}", effects.outcomes),
        };

        // 2210 * 110% / 100 = 24.31 collateral is liquidated
        assert_eq!(values.coll_gas_compensation, ETH::from(0.12155));
        assert_eq!(values.coll_to_send_to_sp, ETH::from(24.18845));
        assert_eq!(values.coll_surplus, ETH::from(1.69));
        assert_eq!(effects.stablecoin_to_burn_from_sp, LUSD::from(2210.0));

        assert_eq!(stability_pool.total_stablecoin_deposits, LUSD::from(790.0));
        assert_eq!(stability_pool.coll, ETH::from(24.18845));
        assert_eq!(market.active_pool.coll, ETH::from(40.0));
        assert_eq!(market.active_pool.debt, LUSD::from(2210.0));
        assert_eq!(market.coll_surplus_pool.coll, ETH::from(1.69));
        assert_eq!(
            market.coll_surplus_pool.collateral_of(&alice),
            ETH::from(1.69)
        );

        assert_eq!(
            borrowing_operations::claim_collateral(&mut market, &mut events, &alice),
            Ok(ETH::from(1.69))
        );
        assert_eq!(
            borrowing_operations::claim_collateral(&mut market, &mut events, &alice),
            Err(TroveError::NoCollateralToClaim)
        );
        assert_eq!(market.coll_surplus_pool.coll, 0);
        assert_system_totals(&market);
    }

    #[test]
    fn test_liquidate_last_trove() {
        let (mut market, mut events) = new_market();
        let mut stability_pool = StabilityPoolState::new(0);
        let alice = new_trove(&mut market, &mut events, 20.0, 2000.0, Price::from(PRICE));
        provide(&mut stability_pool, &mut events, 5000.0);

        let price = Price::from(100.0);
        assert_eq!(
            liquidation_operations::liquidate(
                &mut market,
                &mut stability_pool,
                &mut events,
                &alice,
                price,
                0
            ),
            Err(TroveError::LastTrove)
        );
        assert_eq!(
            liquidation_operations::liquidate_troves(
                &mut market,
                &mut stability_pool,
                &mut events,
                10,
                price,
                0
            ),
            Err(TroveError::NothingToLiquidate)
        );
        assert!(market.trove_manager.is_active(&alice));
    }

    #[test]
    fn test_liquidate_troves_stops_at_first_healthy() {
        let (mut market, mut events) = new_market();
        let mut stability_pool = StabilityPoolState::new(0);
        let price = Price::from(PRICE);
        new_trove(&mut market, &mut events, 1000.0, 10_000.0, price);
        let a1 = new_trove(&mut market, &mut events, 19.5, 2000.0, price);
        let a2 = new_trove(&mut market, &mut events, 20.0, 2000.0, price);
        let b = new_trove(&mut market, &mut events, 21.0, 2000.0, price);
        let c = new_trove(&mut market, &mut events, 30.0, 2000.0, price);

        // a1 at 105.9%, a2 at 108.6%, b at 114%
        let price = Price::from(120.0);
        let effects = liquidation_operations::liquidate_troves(
            &mut market,
            &mut stability_pool,
            &mut events,
            1,
            price,
            0,
        )
        .unwrap();
        assert_eq!(effects.outcomes.len(), 1);
        assert_eq!(effects.outcomes[0].owner(), a1);
        assert_eq!(market.default_pool.debt, LUSD::from(2210.0));

        // a2 carries part of a1's debt now and is still below MCR
        assert!(trove_manager::has_pending_rewards(&market.trove_manager, &a2));
        let effects = liquidation_operations::liquidate_troves(
            &mut market,
            &mut stability_pool,
            &mut events,
            10,
            price,
            0,
        )
        .unwrap();
        assert_eq!(effects.outcomes.len(), 2);
        assert!(effects.outcomes[0].is_liquidated());
        assert_eq!(effects.outcomes[0].owner(), a2);
        assert_eq!(
            effects.outcomes[1],
            LiquidationOutcome::Skipped {
                owner: b,
                reason: SkipReason::Healthy
            }
        );
        assert!(market.trove_manager.is_active(&b));
        assert!(market.trove_manager.is_active(&c));
        assert_eq!(market.trove_manager.trove_owners_count(), 3);
        assert_system_totals(&market);

        assert_eq!(
            liquidation_operations::liquidate_troves(
                &mut market,
                &mut stability_pool,
                &mut events,
                10,
                price,
                0
            ),
            Err(TroveError::NothingToLiquidate)
        );
    }

    #[test]
    fn test_batch_liquidate_troves_skips() {
        let (mut market, mut events) = new_market();
        let mut stability_pool = StabilityPoolState::new(0);
        let price = Price::from(PRICE);
        let whale = new_trove(&mut market, &mut events, 1000.0, 10_000.0, price);
        let a = new_trove(&mut market, &mut events, 20.0, 2000.0, price);
        let a1 = new_trove(&mut market, &mut events, 19.5, 2000.0, price);
        let b = new_trove(&mut market, &mut events, 30.0, 2000.0, price);
        provide(&mut stability_pool, &mut events, 10_000.0);

        let price = Price::from(120.0);
        let unknown = Pubkey::new_unique();
        let effects = liquidation_operations::batch_liquidate_troves(
            &mut market,
            &mut stability_pool,
            &mut events,
            &[whale, a, unknown, a1],
            price,
            0,
        )
        .unwrap();

        assert_eq!(
            effects.outcomes[0],
            LiquidationOutcome::Skipped {
                owner: whale,
                reason: SkipReason::Healthy
            }
        );
        assert!(effects.outcomes[1].is_liquidated());
        assert_eq!(
            effects.outcomes[2],
            LiquidationOutcome::Skipped {
                owner: unknown,
                reason: SkipReason::NotActive
            }
        );
        assert!(effects.outcomes[3].is_liquidated());

        assert_eq!(effects.totals.total_debt_in_sequence, LUSD::from(4420.0));
        assert_eq!(effects.stablecoin_to_burn_from_sp, LUSD::from(4420.0));
        assert_eq!(effects.stablecoin_to_liquidator, 2 * GAS_COMPENSATION);
        assert_eq!(effects.coll_to_liquidator, ETH::from(0.1975));
        assert_eq!(stability_pool.coll, ETH::from(39.3025));
        assert_eq!(market.gas_pool.stablecoin, 2 * GAS_COMPENSATION);
        assert_system_totals(&market);

        assert_eq!(
            liquidation_operations::batch_liquidate_troves(
                &mut market,
                &mut stability_pool,
                &mut events,
                &[b],
                price,
                0
            ),
            Err(TroveError::NothingToLiquidate)
        );
        assert_eq!(
            liquidation_operations::batch_liquidate_troves(
                &mut market,
                &mut stability_pool,
                &mut events,
                &[],
                price,
                0
            ),
            Err(TroveError::NothingToLiquidate)
        );
    }
}
