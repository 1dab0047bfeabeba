#[cfg(test)]
pub mod utils {
    use anchor_lang::prelude::Pubkey;

    use crate::{
        assert_fuzzy_eq,
        stability_pool::stability_pool_operations,
        state::ActivePool,
        utils::coretypes::{ETH, LUSD},
        EventLog, StabilityPoolState,
    };

    // Rounding always favours the pool, a few wei per operation
    pub const SE: u128 = 1_000_000;

    pub fn new_depositors(
        stability_pool: &mut StabilityPoolState,
        events: &mut EventLog,
        count: usize,
        stablecoin_to_provide: f64,
        now: u64,
    ) -> Vec<Pubkey> {
        (0..count)
            .map(|_| {
                let depositor = Pubkey::new_unique();
                stability_pool_operations::provide_to_sp(
                    stability_pool,
                    events,
                    depositor,
                    LUSD::from(stablecoin_to_provide),
                    None,
                    now,
                )
                .unwrap();
                depositor
            })
            .collect()
    }

    /// Offsets a liquidation as if the active pool held exactly the
    /// liquidated debt and collateral.
    pub fn offset(
        stability_pool: &mut StabilityPoolState,
        events: &mut EventLog,
        debt: u128,
        coll: u128,
        now: u64,
    ) -> ActivePool {
        let mut active_pool = ActivePool { coll, debt };
        stability_pool_operations::offset(
            stability_pool,
            events,
            &mut active_pool,
            debt,
            coll,
            now,
        )
        .unwrap();
        active_pool
    }

    pub fn assert_deposits(
        stability_pool: &StabilityPoolState,
        depositors: &[Pubkey],
        expected_deposits: &[f64],
        expected_coll_gains: &[f64],
        epsilon: u128,
    ) {
        for (i, depositor) in depositors.iter().enumerate() {
            let deposit = stability_pool_operations::get_compounded_stablecoin_deposit(
                stability_pool,
                depositor,
            )
            .unwrap();
            assert_fuzzy_eq!(deposit, LUSD::from(expected_deposits[i]), epsilon);

            let coll_gain =
                stability_pool_operations::get_depositor_coll_gain(stability_pool, depositor)
                    .unwrap();
            assert_fuzzy_eq!(coll_gain, ETH::from(expected_coll_gains[i]), epsilon);
        }
    }
}
