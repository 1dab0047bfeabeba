//! The whole system behind one handle. Each operation reads the price once,
//! runs against the live state with every journal recording and settles the
//! resulting token movements into the ledgers. A failure undoes exactly what
//! the operation touched.

use anchor_lang::prelude::{msg, Pubkey};

use crate::{
    borrowing_market::{
        borrowing_operations, liquidation_operations,
        types::{
            AdjustTroveEffects, AdjustTroveParams, CloseTroveEffects, Hints, LiquidationEffects,
            OpenTroveEffects, OpenTroveParams,
        },
    },
    redemption::{
        redemption_operations,
        types::{RedemptionEffects, RedemptionParams},
    },
    stability_pool::{
        stability_pool_operations,
        types::{CollGainToTroveEffects, RewardPayout, StabilityDepositEffects},
    },
    state::{Checkpoint, MarketCheckpoint, SumsCheckpoint},
    token_operations::TokenLedger,
    utils::{
        consts::{GAS_POOL_ADDRESS, POOL_CUSTODY_ADDRESS, STABILITY_POOL_ADDRESS},
        finance::SystemMode,
        oracle::{get_price, PriceFeed},
    },
    BorrowingMarket, EventLog, GlobalConfig, StabilityPoolState, TroveError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    pub market: BorrowingMarket,
    pub stability_pool: StabilityPoolState,
    pub stablecoin: TokenLedger,
    pub reward_token: TokenLedger,
    pub collateral: TokenLedger,
    pub events: EventLog,
}

impl Protocol {
    pub fn new(config: GlobalConfig, now: u64) -> Self {
        Protocol {
            market: BorrowingMarket::new(config, now),
            stability_pool: StabilityPoolState::new(now),
            stablecoin: TokenLedger::default(),
            reward_token: TokenLedger::default(),
            collateral: TokenLedger::default(),
            events: EventLog::default(),
        }
    }

    /// Runs `op` and keeps its changes only if it succeeded.
    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut Protocol) -> Result<T, TroveError>,
    ) -> Result<T, TroveError> {
        let saved = self.checkpoint();
        match op(self) {
            Ok(res) => {
                self.commit();
                Ok(res)
            }
            Err(e) => {
                self.rollback(saved);
                msg!("Operation failed, state rolled back {:?}", e);
                Err(e)
            }
        }
    }

    /// Credits external collateral to a wallet.
    pub fn mint_collateral(&mut self, to: &Pubkey, amount: u128) -> Result<(), TroveError> {
        self.collateral.mint(to, amount)
    }

    pub fn update_global_config(&mut self, key: u16, value: u64) -> Result<(), TroveError> {
        self.transact(|p| {
            p.market.config.update_global_config(key, value)?;
            p.market
                .sorted_troves
                .set_max_size(p.market.config.max_troves);
            msg!("Global config updated {:?}", p.market.config);
            Ok(())
        })
    }

    pub fn system_mode(&self, feed: &dyn PriceFeed) -> Result<(SystemMode, u128), TroveError> {
        self.market.system_balances().mode(get_price(feed)?)
    }

    pub fn open_trove(
        &mut self,
        owner: Pubkey,
        params: OpenTroveParams,
        feed: &dyn PriceFeed,
        now: u64,
    ) -> Result<OpenTroveEffects, TroveError> {
        let price = get_price(feed)?;
        self.transact(|p| {
            let effects = borrowing_operations::open_trove(
                &mut p.market,
                &mut p.events,
                owner,
                params,
                price,
                now,
            )?;
            p.collateral
                .transfer(&owner, &POOL_CUSTODY_ADDRESS, effects.coll_from_owner)?;
            p.stablecoin.mint(&owner, effects.stablecoin_to_owner)?;
            p.stablecoin
                .mint(&p.market.config.fee_recipient, effects.borrowing_fee)?;
            p.stablecoin
                .mint(&GAS_POOL_ADDRESS, effects.gas_compensation)?;
            Ok(effects)
        })
    }

    pub fn adjust_trove(
        &mut self,
        owner: Pubkey,
        params: AdjustTroveParams,
        feed: &dyn PriceFeed,
        now: u64,
    ) -> Result<AdjustTroveEffects, TroveError> {
        let price = get_price(feed)?;
        self.transact(|p| {
            let balance = p.stablecoin.balance_of(&owner);
            let effects = borrowing_operations::adjust_trove(
                &mut p.market,
                &mut p.events,
                &owner,
                params,
                balance,
                price,
                now,
            )?;
            p.settle_adjustment(&owner, &effects)?;
            Ok(effects)
        })
    }

    pub fn close_trove(
        &mut self,
        owner: Pubkey,
        feed: &dyn PriceFeed,
    ) -> Result<CloseTroveEffects, TroveError> {
        let price = get_price(feed)?;
        self.transact(|p| {
            let balance = p.stablecoin.balance_of(&owner);
            let effects = borrowing_operations::close_trove(
                &mut p.market,
                &mut p.events,
                &owner,
                balance,
                price,
            )?;
            p.stablecoin
                .burn(&owner, effects.stablecoin_to_burn_from_owner)?;
            p.stablecoin
                .burn(&GAS_POOL_ADDRESS, effects.gas_compensation_to_burn)?;
            p.collateral
                .transfer(&POOL_CUSTODY_ADDRESS, &owner, effects.coll_to_owner)?;
            Ok(effects)
        })
    }

    pub fn claim_collateral(&mut self, owner: Pubkey) -> Result<u128, TroveError> {
        self.transact(|p| {
            let claimed =
                borrowing_operations::claim_collateral(&mut p.market, &mut p.events, &owner)?;
            p.collateral
                .transfer(&POOL_CUSTODY_ADDRESS, &owner, claimed)?;
            Ok(claimed)
        })
    }

    pub fn liquidate(
        &mut self,
        liquidator: Pubkey,
        owner: Pubkey,
        feed: &dyn PriceFeed,
        now: u64,
    ) -> Result<LiquidationEffects, TroveError> {
        let price = get_price(feed)?;
        self.transact(|p| {
            let effects = liquidation_operations::liquidate(
                &mut p.market,
                &mut p.stability_pool,
                &mut p.events,
                &owner,
                price,
                now,
            )?;
            p.settle_liquidation(&liquidator, &effects)?;
            Ok(effects)
        })
    }

    pub fn liquidate_troves(
        &mut self,
        liquidator: Pubkey,
        n: u64,
        feed: &dyn PriceFeed,
        now: u64,
    ) -> Result<LiquidationEffects, TroveError> {
        let price = get_price(feed)?;
        self.transact(|p| {
            let effects = liquidation_operations::liquidate_troves(
                &mut p.market,
                &mut p.stability_pool,
                &mut p.events,
                n,
                price,
                now,
            )?;
            p.settle_liquidation(&liquidator, &effects)?;
            Ok(effects)
        })
    }

    pub fn batch_liquidate_troves(
        &mut self,
        liquidator: Pubkey,
        owners: &[Pubkey],
        feed: &dyn PriceFeed,
        now: u64,
    ) -> Result<LiquidationEffects, TroveError> {
        let price = get_price(feed)?;
        self.transact(|p| {
            let effects = liquidation_operations::batch_liquidate_troves(
                &mut p.market,
                &mut p.stability_pool,
                &mut p.events,
                owners,
                price,
                now,
            )?;
            p.settle_liquidation(&liquidator, &effects)?;
            Ok(effects)
        })
    }

    pub fn redeem_collateral(
        &mut self,
        redeemer: Pubkey,
        params: RedemptionParams,
        feed: &dyn PriceFeed,
        now: u64,
    ) -> Result<RedemptionEffects, TroveError> {
        let price = get_price(feed)?;
        self.transact(|p| {
            let balance = p.stablecoin.balance_of(&redeemer);
            let effects = redemption_operations::redeem_collateral(
                &mut p.market,
                &mut p.events,
                balance,
                params,
                price,
                now,
            )?;
            p.stablecoin
                .burn(&redeemer, effects.actual_amount_redeemed)?;
            p.stablecoin
                .burn(&GAS_POOL_ADDRESS, effects.gas_compensation_to_burn)?;
            p.collateral.transfer(
                &POOL_CUSTODY_ADDRESS,
                &redeemer,
                effects.collateral_to_redeemer,
            )?;
            let fee_recipient = p.market.config.fee_recipient;
            p.collateral.transfer(
                &POOL_CUSTODY_ADDRESS,
                &fee_recipient,
                effects.collateral_fee,
            )?;
            Ok(effects)
        })
    }

    pub fn register_front_end(
        &mut self,
        front_end: Pubkey,
        kickback_rate: u128,
    ) -> Result<(), TroveError> {
        self.transact(|p| {
            stability_pool_operations::register_front_end(
                &mut p.stability_pool,
                &mut p.events,
                front_end,
                kickback_rate,
            )
        })
    }

    pub fn provide_to_sp(
        &mut self,
        depositor: Pubkey,
        amount: u128,
        front_end_tag: Option<Pubkey>,
        now: u64,
    ) -> Result<StabilityDepositEffects, TroveError> {
        self.transact(|p| {
            let effects = stability_pool_operations::provide_to_sp(
                &mut p.stability_pool,
                &mut p.events,
                depositor,
                amount,
                front_end_tag,
                now,
            )?;
            p.settle_stability_deposit(&depositor, &effects)?;
            Ok(effects)
        })
    }

    pub fn withdraw_from_sp(
        &mut self,
        depositor: Pubkey,
        amount: u128,
        feed: &dyn PriceFeed,
        now: u64,
    ) -> Result<StabilityDepositEffects, TroveError> {
        let price = get_price(feed)?;
        self.transact(|p| {
            let effects = stability_pool_operations::withdraw_from_sp(
                &mut p.stability_pool,
                &p.market,
                &mut p.events,
                depositor,
                amount,
                price,
                now,
            )?;
            p.settle_stability_deposit(&depositor, &effects)?;
            Ok(effects)
        })
    }

    /// Pays out the collateral and reward gains, the deposit stays in the pool.
    pub fn claim_gains(
        &mut self,
        depositor: Pubkey,
        now: u64,
    ) -> Result<StabilityDepositEffects, TroveError> {
        self.transact(|p| {
            let effects = stability_pool_operations::claim_gains(
                &mut p.stability_pool,
                &mut p.events,
                depositor,
                now,
            )?;
            p.settle_stability_deposit(&depositor, &effects)?;
            Ok(effects)
        })
    }

    pub fn withdraw_coll_gain_to_trove(
        &mut self,
        depositor: Pubkey,
        hints: Hints,
        feed: &dyn PriceFeed,
        now: u64,
    ) -> Result<CollGainToTroveEffects, TroveError> {
        let price = get_price(feed)?;
        self.transact(|p| {
            let effects = stability_pool_operations::withdraw_coll_gain_to_trove(
                &mut p.stability_pool,
                &mut p.market,
                &mut p.events,
                depositor,
                hints,
                price,
                now,
            )?;
            // The collateral only moves between pools, both in custody
            p.settle_rewards(&depositor, &effects.rewards)?;
            Ok(effects)
        })
    }

    fn settle_adjustment(
        &mut self,
        owner: &Pubkey,
        effects: &AdjustTroveEffects,
    ) -> Result<(), TroveError> {
        self.collateral
            .transfer(owner, &POOL_CUSTODY_ADDRESS, effects.coll_from_owner)?;
        self.collateral
            .transfer(&POOL_CUSTODY_ADDRESS, owner, effects.coll_to_owner)?;
        self.stablecoin.mint(owner, effects.stablecoin_to_owner)?;
        let fee_recipient = self.market.config.fee_recipient;
        self.stablecoin.mint(&fee_recipient, effects.borrowing_fee)?;
        self.stablecoin
            .burn(owner, effects.stablecoin_to_burn_from_owner)
    }

    fn settle_liquidation(
        &mut self,
        liquidator: &Pubkey,
        effects: &LiquidationEffects,
    ) -> Result<(), TroveError> {
        self.stablecoin
            .burn(&STABILITY_POOL_ADDRESS, effects.stablecoin_to_burn_from_sp)?;
        self.stablecoin.transfer(
            &GAS_POOL_ADDRESS,
            liquidator,
            effects.stablecoin_to_liquidator,
        )?;
        self.collateral.transfer(
            &POOL_CUSTODY_ADDRESS,
            liquidator,
            effects.coll_to_liquidator,
        )
    }

    fn settle_stability_deposit(
        &mut self,
        depositor: &Pubkey,
        effects: &StabilityDepositEffects,
    ) -> Result<(), TroveError> {
        self.stablecoin.transfer(
            depositor,
            &STABILITY_POOL_ADDRESS,
            effects.stablecoin_from_depositor,
        )?;
        self.stablecoin.transfer(
            &STABILITY_POOL_ADDRESS,
            depositor,
            effects.stablecoin_to_depositor,
        )?;
        self.collateral.transfer(
            &POOL_CUSTODY_ADDRESS,
            depositor,
            effects.coll_to_depositor,
        )?;
        self.settle_rewards(depositor, &effects.rewards)
    }

    fn settle_rewards(&mut self, depositor: &Pubkey, rewards: &RewardPayout) -> Result<(), TroveError> {
        self.reward_token.mint(depositor, rewards.depositor_reward)?;
        if let Some(front_end) = rewards.front_end {
            self.reward_token.mint(&front_end, rewards.front_end_reward)?;
        }
        Ok(())
    }
}

pub struct ProtocolCheckpoint {
    market: MarketCheckpoint,
    stability_pool: (StabilityPoolState, SumsCheckpoint),
    stablecoin: u128,
    reward_token: u128,
    collateral: u128,
    events: usize,
}

impl Checkpoint for Protocol {
    type Saved = ProtocolCheckpoint;

    fn checkpoint(&mut self) -> ProtocolCheckpoint {
        ProtocolCheckpoint {
            market: self.market.checkpoint(),
            stability_pool: self.stability_pool.checkpoint(),
            stablecoin: self.stablecoin.checkpoint(),
            reward_token: self.reward_token.checkpoint(),
            collateral: self.collateral.checkpoint(),
            events: self.events.checkpoint(),
        }
    }

    fn commit(&mut self) {
        self.market.commit();
        self.stability_pool.commit();
        self.stablecoin.commit();
        self.reward_token.commit();
        self.collateral.commit();
        self.events.commit();
    }

    fn rollback(&mut self, saved: ProtocolCheckpoint) {
        self.market.rollback(saved.market);
        self.stability_pool.rollback(saved.stability_pool);
        self.stablecoin.rollback(saved.stablecoin);
        self.reward_token.rollback(saved.reward_token);
        self.collateral.rollback(saved.collateral);
        self.events.rollback(saved.events);
    }
}
