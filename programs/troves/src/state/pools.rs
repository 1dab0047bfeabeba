use anchor_lang::prelude::{msg, AnchorDeserialize, AnchorSerialize, Pubkey};

use crate::{
    state::JournaledMap,
    utils::{coretypes::CheckedAssign, finance::SystemBalances},
    TroveError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebtChange {
    Increase(u128),
    Decrease(u128),
}

/// Anything collateral can be sent to.
pub trait CollateralRecipient {
    fn receive_collateral(&mut self, amount: u128) -> Result<(), TroveError>;
}

/// Passive custodian of collateral and the debt recorded against it.
pub trait Pool: CollateralRecipient {
    fn collateral(&self) -> u128;
    fn debt(&self) -> u128;
    fn send_collateral(
        &mut self,
        to: &mut dyn CollateralRecipient,
        amount: u128,
    ) -> Result<(), TroveError>;
    fn record_debt_change(&mut self, change: DebtChange) -> Result<(), TroveError>;
}

/// Collateral leaving the system, settled into a wallet by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Payout {
    pub amount: u128,
}

impl CollateralRecipient for Payout {
    fn receive_collateral(&mut self, amount: u128) -> Result<(), TroveError> {
        self.amount.checked_add_assign(amount)
    }
}

/// Collateral and debt of active troves.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivePool {
    pub coll: u128,
    pub debt: u128,
}

/// Redistributed collateral and debt not yet applied to troves.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DefaultPool {
    pub coll: u128,
    pub debt: u128,
}

macro_rules! impl_pool {
    ($pool:ident) => {
        impl CollateralRecipient for $pool {
            fn receive_collateral(&mut self, amount: u128) -> Result<(), TroveError> {
                self.coll.checked_add_assign(amount)?;
                msg!("{} coll balance updated {}", stringify!($pool), self.coll);
                Ok(())
            }
        }

        impl Pool for $pool {
            fn collateral(&self) -> u128 {
                self.coll
            }

            fn debt(&self) -> u128 {
                self.debt
            }

            fn send_collateral(
                &mut self,
                to: &mut dyn CollateralRecipient,
                amount: u128,
            ) -> Result<(), TroveError> {
                if amount == 0 {
                    return Ok(());
                }
                self.coll = self
                    .coll
                    .checked_sub(amount)
                    .ok_or(TroveError::PoolUnderflow)?;
                msg!("{} coll balance updated {}", stringify!($pool), self.coll);
                to.receive_collateral(amount)
            }

            fn record_debt_change(&mut self, change: DebtChange) -> Result<(), TroveError> {
                match change {
                    DebtChange::Increase(amount) => self.debt.checked_add_assign(amount)?,
                    DebtChange::Decrease(amount) => {
                        self.debt = self
                            .debt
                            .checked_sub(amount)
                            .ok_or(TroveError::PoolUnderflow)?
                    }
                }
                msg!("{} debt updated {}", stringify!($pool), self.debt);
                Ok(())
            }
        }
    };
}

impl_pool!(ActivePool);
impl_pool!(DefaultPool);

/// Collateral owed to owners of troves closed with a surplus.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CollSurplusPool {
    pub coll: u128,
    pub balances: JournaledMap<Pubkey, u128>,
}

impl CollateralRecipient for CollSurplusPool {
    fn receive_collateral(&mut self, amount: u128) -> Result<(), TroveError> {
        self.coll.checked_add_assign(amount)
    }
}

impl CollSurplusPool {
    pub fn account_surplus(&mut self, owner: Pubkey, amount: u128) -> Result<u128, TroveError> {
        let balance = self.balances.get_or_default_mut(owner);
        balance.checked_add_assign(amount)?;
        Ok(*balance)
    }

    pub fn collateral_of(&self, owner: &Pubkey) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn claim_coll(
        &mut self,
        owner: &Pubkey,
        to: &mut dyn CollateralRecipient,
    ) -> Result<u128, TroveError> {
        let claimable = self.collateral_of(owner);
        if claimable == 0 {
            return Err(TroveError::NoCollateralToClaim);
        }
        self.balances.remove(owner);
        self.coll = self
            .coll
            .checked_sub(claimable)
            .ok_or(TroveError::PoolUnderflow)?;
        to.receive_collateral(claimable)?;
        Ok(claimable)
    }
}

/// Stablecoin reserved for liquidators, 200 per open trove.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GasPool {
    pub stablecoin: u128,
}

impl GasPool {
    pub fn deposit(&mut self, amount: u128) -> Result<(), TroveError> {
        self.stablecoin.checked_add_assign(amount)
    }

    pub fn withdraw(&mut self, amount: u128) -> Result<(), TroveError> {
        self.stablecoin = self
            .stablecoin
            .checked_sub(amount)
            .ok_or(TroveError::PoolUnderflow)?;
        Ok(())
    }
}

pub fn system_balances(active_pool: &impl Pool, default_pool: &impl Pool) -> SystemBalances {
    SystemBalances {
        coll: active_pool
            .collateral()
            .saturating_add(default_pool.collateral()),
        debt: active_pool.debt().saturating_add(default_pool.debt()),
    }
}
