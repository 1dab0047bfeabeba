#[cfg(test)]
mod tests {
    use anchor_lang::prelude::Pubkey;

    use crate::{
        assert_fuzzy_eq,
        stability_pool::{
            stability_pool_operations::{self, issuance_logic::expected_issuance_since_start},
            tests_utils::utils::SE,
        },
        utils::{consts::ONE, coretypes::LUSD},
        Deposit, EventLog, ProtocolEvent, StabilityPoolState, TroveError,
    };

    const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
    const KICKBACK: u128 = ONE / 10 * 6;

    fn pool_with_front_end() -> (StabilityPoolState, EventLog, Pubkey) {
        let mut stability_pool = StabilityPoolState::new(0);
        let mut events = EventLog::default();
        let front_end = Pubkey::new_unique();
        stability_pool_operations::register_front_end(
            &mut stability_pool,
            &mut events,
            front_end,
            KICKBACK,
        )
        .unwrap();
        (stability_pool, events, front_end)
    }

    #[test]
    fn test_front_end_registration_errors() {
        let (mut stability_pool, mut events, front_end) = pool_with_front_end();
        assert!(events.iter().any(|e| matches!(
            e,
            ProtocolEvent::FrontEndRegistered {
                kickback_rate: KICKBACK,
                ..
            }
        )));

        assert_eq!(
            stability_pool_operations::register_front_end(
                &mut stability_pool,
                &mut events,
                front_end,
                KICKBACK
            ),
            Err(TroveError::FrontEndAlreadyRegistered)
        );
        assert_eq!(
            stability_pool_operations::register_front_end(
                &mut stability_pool,
                &mut events,
                Pubkey::new_unique(),
                ONE + 1
            ),
            Err(TroveError::InvalidKickbackRate)
        );

        let depositor = Pubkey::new_unique();
        stability_pool_operations::provide_to_sp(
            &mut stability_pool,
            &mut events,
            depositor,
            LUSD::from(10.0),
            None,
            0,
        )
        .unwrap();
        assert_eq!(
            stability_pool_operations::register_front_end(
                &mut stability_pool,
                &mut events,
                depositor,
                KICKBACK
            ),
            Err(TroveError::DepositorCannotRegisterFrontEnd)
        );
    }

    #[test]
    fn test_front_end_deposit_errors() {
        let (mut stability_pool, mut events, front_end) = pool_with_front_end();

        assert_eq!(
            stability_pool_operations::provide_to_sp(
                &mut stability_pool,
                &mut events,
                front_end,
                LUSD::from(10.0),
                None,
                0
            ),
            Err(TroveError::FrontEndCannotDeposit)
        );
        assert_eq!(
            stability_pool_operations::provide_to_sp(
                &mut stability_pool,
                &mut events,
                Pubkey::new_unique(),
                LUSD::from(10.0),
                Some(Pubkey::new_unique()),
                0
            ),
            Err(TroveError::FrontEndNotRegistered)
        );
    }

    #[test]
    fn test_front_end_tag_fixed_at_first_deposit() {
        let (mut stability_pool, mut events, front_end) = pool_with_front_end();
        let other_front_end = Pubkey::new_unique();
        stability_pool_operations::register_front_end(
            &mut stability_pool,
            &mut events,
            other_front_end,
            ONE,
        )
        .unwrap();

        let depositor = Pubkey::new_unique();
        for tag in [front_end, other_front_end] {
            stability_pool_operations::provide_to_sp(
                &mut stability_pool,
                &mut events,
                depositor,
                LUSD::from(100.0),
                Some(tag),
                0,
            )
            .unwrap();
        }

        assert_eq!(
            stability_pool.deposit(&depositor).front_end_tag,
            Some(front_end)
        );
        assert_eq!(
            stability_pool.front_end_stake(&front_end),
            LUSD::from(200.0)
        );
        assert_eq!(stability_pool.front_end_stake(&other_front_end), 0);
    }

    #[test]
    fn test_front_end_kickback_split() {
        let (mut stability_pool, mut events, front_end) = pool_with_front_end();
        let depositor = Pubkey::new_unique();
        stability_pool_operations::provide_to_sp(
            &mut stability_pool,
            &mut events,
            depositor,
            LUSD::from(10_000.0),
            Some(front_end),
            0,
        )
        .unwrap();

        let effects = stability_pool_operations::claim_gains(
            &mut stability_pool,
            &mut events,
            depositor,
            SECONDS_PER_DAY,
        )
        .unwrap();

        let issued = expected_issuance_since_start(0, SECONDS_PER_DAY).unwrap();
        assert_eq!(effects.rewards.front_end, Some(front_end));
        assert_fuzzy_eq!(effects.rewards.depositor_reward, issued / 10 * 6, SE);
        assert_fuzzy_eq!(effects.rewards.front_end_reward, issued / 10 * 4, SE);
    }

    #[test]
    fn test_front_end_stake_follows_offsets_and_withdrawals() {
        let (mut stability_pool, mut events, front_end) = pool_with_front_end();
        let depositor = Pubkey::new_unique();
        stability_pool_operations::provide_to_sp(
            &mut stability_pool,
            &mut events,
            depositor,
            LUSD::from(100.0),
            Some(front_end),
            0,
        )
        .unwrap();

        let mut active_pool = crate::state::ActivePool {
            coll: ONE,
            debt: LUSD::from(50.0),
        };
        stability_pool_operations::offset(
            &mut stability_pool,
            &mut events,
            &mut active_pool,
            LUSD::from(50.0),
            ONE,
            0,
        )
        .unwrap();

        let compounded_stake =
            stability_pool_operations::get_compounded_front_end_stake(&stability_pool, &front_end)
                .unwrap();
        assert_fuzzy_eq!(compounded_stake, LUSD::from(50.0), SE);

        let market = crate::BorrowingMarket::new(Default::default(), 0);
        stability_pool_operations::withdraw_from_sp(
            &mut stability_pool,
            &market,
            &mut events,
            depositor,
            LUSD::from(100.0),
            ONE,
            0,
        )
        .unwrap();

        // A depositor leaving entirely also drops its tag and the front end stake
        assert_eq!(stability_pool.deposit(&depositor), Deposit::default());
        assert_eq!(stability_pool.front_end_stake(&front_end), 0);
        assert!(events.iter().any(|e| matches!(
            e,
            ProtocolEvent::FrontEndStakeChanged { new_stake: 0, .. }
        )));
    }
}
