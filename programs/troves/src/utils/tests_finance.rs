#[cfg(test)]
mod tests {
    use crate::utils::{
        consts::{CCR, GAS_COMPENSATION, ONE},
        coretypes::{Price, ETH, LUSD},
        finance::{
            apply_delta, calc_system_mode, get_coll_gas_compensation, get_composite_debt,
            get_net_debt, SystemBalances, SystemMode,
        },
    };

    #[test]
    fn test_system_mode_boundary() {
        assert_eq!(calc_system_mode(CCR), SystemMode::Normal);
        assert_eq!(calc_system_mode(CCR - 1), SystemMode::Recovery);
    }

    #[test]
    fn test_tcr_and_mode() {
        let balances = SystemBalances {
            coll: ETH::from(30.0),
            debt: LUSD::from(4000.0),
        };

        // 30 * 200 / 4000 = 1.5
        let (mode, tcr) = balances.mode(Price::from(200.0)).unwrap();
        assert_eq!(tcr, CCR);
        assert_eq!(mode, SystemMode::Normal);

        let (mode, tcr) = balances.mode(Price::from(190.0)).unwrap();
        assert_eq!(mode, SystemMode::Recovery);
        assert!(tcr < CCR);
    }

    #[test]
    fn test_new_tcr_from_trove_change() {
        let balances = SystemBalances {
            coll: ETH::from(10.0),
            debt: LUSD::from(1000.0),
        };
        let price = Price::from(100.0);

        let new_tcr = balances
            .new_tcr_from_trove_change(ETH::from(10.0) as i128, -(LUSD::from(500.0) as i128), price)
            .unwrap();
        // 20 * 100 / 500
        assert_eq!(new_tcr, 4 * ONE);

        assert!(balances
            .new_tcr_from_trove_change(-(ETH::from(11.0) as i128), 0, price)
            .is_err());
    }

    #[test]
    fn test_debt_helpers() {
        assert_eq!(get_net_debt(LUSD::from(2200.0)).unwrap(), LUSD::from(2000.0));
        assert!(get_net_debt(GAS_COMPENSATION - 1).is_err());
        assert_eq!(get_composite_debt(LUSD::from(1800.0)).unwrap(), LUSD::from(2000.0));
        assert_eq!(get_coll_gas_compensation(ETH::from(20.0)), ETH::from(0.1));
        assert_eq!(apply_delta(5, -5).unwrap(), 0);
        assert_eq!(apply_delta(5, 5).unwrap(), 10);
    }
}
