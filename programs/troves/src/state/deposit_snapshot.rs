use crate::{
    utils::{bn::U256, consts::ONE},
    DepositSnapshot, FrontEndSnapshot,
};

impl Default for DepositSnapshot {
    fn default() -> Self {
        Self {
            s: U256::zero(),
            p: ONE,
            g: U256::zero(),
            scale: 0,
            epoch: 0,
        }
    }
}

impl DepositSnapshot {
    pub fn new(s: U256, p: u128, g: U256, scale: u64, epoch: u64) -> Self {
        Self {
            s,
            p,
            g,
            scale,
            epoch,
        }
    }
}

impl Default for FrontEndSnapshot {
    fn default() -> Self {
        Self {
            p: ONE,
            g: U256::zero(),
            scale: 0,
            epoch: 0,
        }
    }
}

impl FrontEndSnapshot {
    pub fn new(p: u128, g: U256, scale: u64, epoch: u64) -> Self {
        Self { p, g, scale, epoch }
    }
}
