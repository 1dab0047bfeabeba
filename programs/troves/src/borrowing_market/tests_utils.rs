#[cfg(test)]
pub mod utils {
    use anchor_lang::prelude::Pubkey;

    use crate::{
        borrowing_market::{
            borrowing_operations,
            types::{Hints, OpenTroveParams},
        },
        utils::{
            consts::ONE,
            coretypes::{ETH, LUSD},
        },
        BorrowingMarket, EventLog, GlobalConfig,
    };

    pub const PRICE: f64 = 200.0;

    pub fn new_market() -> (BorrowingMarket, EventLog) {
        let market = BorrowingMarket::new(GlobalConfig::new(Pubkey::new_unique()), 0);
        (market, EventLog::default())
    }

    /// Opens a trove at time zero, `borrow` is what the owner receives.
    pub fn new_trove(
        market: &mut BorrowingMarket,
        events: &mut EventLog,
        coll: f64,
        borrow: f64,
        price: u128,
    ) -> Pubkey {
        new_trove_at(market, events, coll, borrow, price, 0)
    }

    pub fn new_trove_at(
        market: &mut BorrowingMarket,
        events: &mut EventLog,
        coll: f64,
        borrow: f64,
        price: u128,
        now: u64,
    ) -> Pubkey {
        let owner = Pubkey::new_unique();
        let params = OpenTroveParams {
            max_fee_percentage: ONE,
            coll: ETH::from(coll),
            stablecoin_amount: LUSD::from(borrow),
            hints: Hints::default(),
            front_end_tag: None,
        };
        borrowing_operations::open_trove(market, events, owner, params, price, now).unwrap();
        owner
    }

    /// Composite debt of a trove opened at the floor fee.
    pub fn composite_debt(borrow: f64) -> u128 {
        LUSD::from(borrow * 1.005 + 200.0)
    }

    pub fn assert_sorted(market: &BorrowingMarket) {
        let nicrs: Vec<u128> = market
            .sorted_troves
            .iter()
            .map(|owner| {
                crate::borrowing_market::trove_manager::get_nominal_icr(
                    &market.trove_manager,
                    &owner,
                )
                .unwrap()
            })
            .collect();
        assert!(
            nicrs.windows(2).all(|w| w[0] >= w[1]),
            "not sorted {:?}",
            nicrs
        );
    }
}
