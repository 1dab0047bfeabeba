use anchor_lang::prelude::{AnchorDeserialize, AnchorSerialize};

use crate::{utils::bn::U256, TroveError};

/// Collateral gain sum S and reward token sum G at one (epoch, scale).
/// Both are per-unit gains multiplied by P, so they carry 36 decimals.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SumPair {
    pub s: U256,
    pub g: U256,
}

impl SumPair {
    pub fn new(s: U256, g: U256) -> Self {
        SumPair { s, g }
    }
}

// [[sum]] -> first layer is the epoch, second layer is the scale within it.
// Only the latest epoch and its latest scale are ever written, earlier
// entries are frozen once the pool moves past them.
#[derive(AnchorSerialize, AnchorDeserialize, PartialEq, Eq, Debug, Clone)]
pub struct EpochToScaleToSum {
    pub hmap: Vec<Vec<SumPair>>,
}

impl Default for EpochToScaleToSum {
    fn default() -> Self {
        EpochToScaleToSum {
            hmap: vec![vec![SumPair::default()]],
        }
    }
}

impl EpochToScaleToSum {
    #[allow(dead_code)]
    pub fn from(v: Vec<Vec<SumPair>>) -> Self {
        EpochToScaleToSum { hmap: v }
    }

    pub fn get_sum(&self, epoch: u64, scale: u64) -> Option<SumPair> {
        let e = usize::try_from(epoch).ok()?;
        let s = usize::try_from(scale).ok()?;
        self.hmap.get(e).and_then(|scales| scales.get(s)).copied()
    }

    pub fn set_sum(&mut self, epoch: u64, scale: u64, sum: SumPair) -> Result<(), TroveError> {
        let epoch = usize::try_from(epoch).map_err(|_| TroveError::SumMapOutOfOrder)?;
        let scale = usize::try_from(scale).map_err(|_| TroveError::SumMapOutOfOrder)?;
        let last_epoch = self.hmap.len() - 1;
        match epoch {
            e if e == last_epoch => {
                // same current epoch
                let scales = &mut self.hmap[e];
                match scale {
                    s if s + 1 == scales.len() => {
                        scales[s] = sum;
                    }
                    s if s == scales.len() => {
                        scales.push(sum);
                    }
                    _ => {
                        return Err(TroveError::SumMapOutOfOrder);
                    }
                }
            }
            e if e == last_epoch + 1 => {
                // new epoch
                if scale != 0 {
                    return Err(TroveError::SumMapOutOfOrder);
                }
                self.hmap.push(vec![sum]);
            }
            _ => {
                // plain wrong, should never happen
                return Err(TroveError::SumMapOutOfOrder);
            }
        };

        Ok(())
    }
}
