use anchor_lang::prelude::{msg, AnchorDeserialize, AnchorSerialize, Pubkey};

use crate::{state::Checkpoint, utils::coretypes::CheckedAssign, JournaledMap, TroveError};

/// Balances of one fungible token, keyed by holder.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenLedger {
    pub balances: JournaledMap<Pubkey, u128>,
    pub total_supply: u128,
}

impl TokenLedger {
    pub fn balance_of(&self, owner: &Pubkey) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn mint(&mut self, to: &Pubkey, amount: u128) -> Result<(), TroveError> {
        if amount == 0 {
            return Ok(());
        }
        self.total_supply.checked_add_assign(amount)?;
        self.balances.get_or_default_mut(*to).checked_add_assign(amount)?;
        msg!("Minted {} to {}", amount, to);
        Ok(())
    }

    pub fn burn(&mut self, from: &Pubkey, amount: u128) -> Result<(), TroveError> {
        if amount == 0 {
            return Ok(());
        }
        self.debit(from, amount)?;
        self.total_supply.checked_sub_assign(amount)?;
        msg!("Burned {} from {}", amount, from);
        Ok(())
    }

    pub fn transfer(&mut self, from: &Pubkey, to: &Pubkey, amount: u128) -> Result<(), TroveError> {
        if amount == 0 || from == to {
            return Ok(());
        }
        self.debit(from, amount)?;
        self.balances.get_or_default_mut(*to).checked_add_assign(amount)?;
        Ok(())
    }

    fn debit(&mut self, from: &Pubkey, amount: u128) -> Result<(), TroveError> {
        let balance = self.balance_of(from);
        if balance < amount {
            return Err(TroveError::InsufficientTokenBalance);
        }
        if balance == amount {
            self.balances.remove(from);
        } else {
            self.balances.insert(*from, balance - amount);
        }
        Ok(())
    }
}

impl Checkpoint for TokenLedger {
    type Saved = u128;

    fn checkpoint(&mut self) -> u128 {
        self.balances.checkpoint();
        self.total_supply
    }

    fn commit(&mut self) {
        self.balances.commit();
    }

    fn rollback(&mut self, total_supply: u128) {
        self.balances.rollback(());
        self.total_supply = total_supply;
    }
}
