use std::cell::Cell;

use crate::TroveError;

/// Source of the collateral price in stablecoin, 18 decimals.
pub trait PriceFeed {
    fn fetch_price(&self) -> Result<u128, TroveError>;
}

/// Price feed set by an operator, used by tests and simulations.
#[derive(Debug, Default)]
pub struct FixedPriceFeed {
    price: Cell<u128>,
    is_trading: Cell<bool>,
}

impl FixedPriceFeed {
    pub fn new(price: u128) -> Self {
        FixedPriceFeed {
            price: Cell::new(price),
            is_trading: Cell::new(true),
        }
    }

    pub fn set_price(&self, price: u128) {
        self.price.set(price);
    }

    /// Marks the feed as halted, every read fails until it is resumed.
    pub fn set_trading(&self, is_trading: bool) {
        self.is_trading.set(is_trading);
    }
}

impl PriceFeed for FixedPriceFeed {
    fn fetch_price(&self) -> Result<u128, TroveError> {
        let price = self.price.get();
        if !self.is_trading.get() || price == 0 {
            return Err(TroveError::PriceNotValid);
        }
        Ok(price)
    }
}

pub fn get_price(feed: &dyn PriceFeed) -> Result<u128, TroveError> {
    feed.fetch_price()
}
