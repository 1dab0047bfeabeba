//! Undo journals for the keyed state. While a checkpoint is open every
//! write records the value it replaces, so rolling back costs as much as
//! the operation touched and committing only drops the log.

use std::{collections::BTreeMap, mem, ops::Deref};

use anchor_lang::prelude::{AnchorDeserialize, AnchorSerialize};

use crate::{
    sorted_troves::SortedTroves, BorrowingMarket, CollSurplusPool, EpochToScaleToSum,
    StabilityPoolState, SumPair, TroveManagerState,
};

/// State that can be restored to the moment `checkpoint` was taken.
pub trait Checkpoint {
    type Saved;

    /// Starts recording changes and returns what the journals do not cover.
    fn checkpoint(&mut self) -> Self::Saved;
    fn commit(&mut self);
    fn rollback(&mut self, saved: Self::Saved);
}

#[derive(Debug, Clone)]
pub struct JournaledMap<K, V> {
    map: BTreeMap<K, V>,
    journal: Option<Vec<(K, Option<V>)>>,
}

impl<K, V> Default for JournaledMap<K, V> {
    fn default() -> Self {
        JournaledMap {
            map: BTreeMap::new(),
            journal: None,
        }
    }
}

// Reads go straight to the map, writes through the journal
impl<K, V> Deref for JournaledMap<K, V> {
    type Target = BTreeMap<K, V>;

    fn deref(&self) -> &Self::Target {
        &self.map
    }
}

impl<K: Ord + Clone, V: Clone> JournaledMap<K, V> {
    fn record(&mut self, key: &K) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push((key.clone(), self.map.get(key).cloned()));
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.record(&key);
        self.map.insert(key, value);
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.record(key);
        self.map.remove(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        if !self.map.contains_key(key) {
            return None;
        }
        self.record(key);
        self.map.get_mut(key)
    }

    pub fn get_or_default_mut(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.record(&key);
        self.map.entry(key).or_default()
    }
}

impl<K: Ord + Clone, V: Clone> Checkpoint for JournaledMap<K, V> {
    type Saved = ();

    fn checkpoint(&mut self) {
        self.journal = Some(Vec::new());
    }

    fn commit(&mut self) {
        self.journal = None;
    }

    fn rollback(&mut self, _: ()) {
        let journal = self.journal.take().unwrap_or_default();
        for (key, previous) in journal.into_iter().rev() {
            match previous {
                Some(value) => {
                    self.map.insert(key, value);
                }
                None => {
                    self.map.remove(&key);
                }
            }
        }
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for JournaledMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl<K: Eq, V: Eq> Eq for JournaledMap<K, V> {}

impl<K: AnchorSerialize, V: AnchorSerialize> AnchorSerialize for JournaledMap<K, V> {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.map.serialize(writer)
    }
}

impl<K, V> AnchorDeserialize for JournaledMap<K, V>
where
    K: AnchorDeserialize + Ord + core::hash::Hash,
    V: AnchorDeserialize,
{
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(JournaledMap {
            map: BTreeMap::deserialize_reader(reader)?,
            journal: None,
        })
    }
}

#[derive(Debug, Clone)]
enum VecChange<T> {
    Pushed,
    SwapRemoved { index: usize, value: T },
}

#[derive(Debug, Clone)]
pub struct JournaledVec<T> {
    items: Vec<T>,
    journal: Option<Vec<VecChange<T>>>,
}

impl<T> Default for JournaledVec<T> {
    fn default() -> Self {
        JournaledVec {
            items: Vec::new(),
            journal: None,
        }
    }
}

impl<T> Deref for JournaledVec<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<T: Clone> JournaledVec<T> {
    pub fn push(&mut self, value: T) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(VecChange::Pushed);
        }
        self.items.push(value);
    }

    pub fn swap_remove(&mut self, index: usize) -> T {
        let value = self.items.swap_remove(index);
        if let Some(journal) = self.journal.as_mut() {
            journal.push(VecChange::SwapRemoved {
                index,
                value: value.clone(),
            });
        }
        value
    }
}

impl<T: Clone> Checkpoint for JournaledVec<T> {
    type Saved = ();

    fn checkpoint(&mut self) {
        self.journal = Some(Vec::new());
    }

    fn commit(&mut self) {
        self.journal = None;
    }

    fn rollback(&mut self, _: ()) {
        let journal = self.journal.take().unwrap_or_default();
        for change in journal.into_iter().rev() {
            match change {
                VecChange::Pushed => {
                    self.items.pop();
                }
                VecChange::SwapRemoved { index, value } => {
                    // the element moved into `index` goes back to the end
                    if index < self.items.len() {
                        let moved = mem::replace(&mut self.items[index], value);
                        self.items.push(moved);
                    } else {
                        self.items.push(value);
                    }
                }
            }
        }
    }
}

impl<T: PartialEq> PartialEq for JournaledVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for JournaledVec<T> {}

impl<T: AnchorSerialize> AnchorSerialize for JournaledVec<T> {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.items.serialize(writer)
    }
}

impl<T: AnchorDeserialize> AnchorDeserialize for JournaledVec<T> {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(JournaledVec {
            items: Vec::deserialize_reader(reader)?,
            journal: None,
        })
    }
}

/// Only the latest scale of the latest epoch is ever rewritten, so the
/// shape of the map plus that one entry is enough to restore it.
#[derive(Debug, Clone, Copy)]
pub struct SumsCheckpoint {
    epochs: usize,
    scales: usize,
    latest: SumPair,
}

impl Checkpoint for EpochToScaleToSum {
    type Saved = SumsCheckpoint;

    fn checkpoint(&mut self) -> SumsCheckpoint {
        let latest_epoch = self.hmap.last();
        SumsCheckpoint {
            epochs: self.hmap.len(),
            scales: latest_epoch.map(|scales| scales.len()).unwrap_or(0),
            latest: latest_epoch
                .and_then(|scales| scales.last())
                .copied()
                .unwrap_or_default(),
        }
    }

    fn commit(&mut self) {}

    fn rollback(&mut self, saved: SumsCheckpoint) {
        self.hmap.truncate(saved.epochs);
        if let Some(scales) = self.hmap.last_mut() {
            scales.truncate(saved.scales);
            if let Some(latest) = scales.last_mut() {
                *latest = saved.latest;
            }
        }
    }
}

impl Checkpoint for TroveManagerState {
    type Saved = TroveManagerState;

    fn checkpoint(&mut self) -> TroveManagerState {
        self.troves.checkpoint();
        self.reward_snapshots.checkpoint();
        self.trove_owners.checkpoint();
        TroveManagerState {
            troves: JournaledMap::default(),
            reward_snapshots: JournaledMap::default(),
            trove_owners: JournaledVec::default(),
            ..*self
        }
    }

    fn commit(&mut self) {
        self.troves.commit();
        self.reward_snapshots.commit();
        self.trove_owners.commit();
    }

    fn rollback(&mut self, saved: TroveManagerState) {
        self.troves.rollback(());
        self.reward_snapshots.rollback(());
        self.trove_owners.rollback(());
        *self = TroveManagerState {
            troves: mem::take(&mut self.troves),
            reward_snapshots: mem::take(&mut self.reward_snapshots),
            trove_owners: mem::take(&mut self.trove_owners),
            ..saved
        };
    }
}

impl Checkpoint for SortedTroves {
    type Saved = SortedTroves;

    fn checkpoint(&mut self) -> SortedTroves {
        self.nodes.checkpoint();
        SortedTroves {
            nodes: JournaledMap::default(),
            ..*self
        }
    }

    fn commit(&mut self) {
        self.nodes.commit();
    }

    fn rollback(&mut self, saved: SortedTroves) {
        self.nodes.rollback(());
        *self = SortedTroves {
            nodes: mem::take(&mut self.nodes),
            ..saved
        };
    }
}

impl Checkpoint for CollSurplusPool {
    type Saved = u128;

    fn checkpoint(&mut self) -> u128 {
        self.balances.checkpoint();
        self.coll
    }

    fn commit(&mut self) {
        self.balances.commit();
    }

    fn rollback(&mut self, coll: u128) {
        self.balances.rollback(());
        self.coll = coll;
    }
}

impl Checkpoint for StabilityPoolState {
    type Saved = (StabilityPoolState, SumsCheckpoint);

    fn checkpoint(&mut self) -> Self::Saved {
        self.deposits.checkpoint();
        self.deposit_snapshots.checkpoint();
        self.front_ends.checkpoint();
        self.front_end_stakes.checkpoint();
        self.front_end_snapshots.checkpoint();
        let sums = self.epoch_to_scale_to_sum.checkpoint();
        let header = StabilityPoolState {
            epoch_to_scale_to_sum: EpochToScaleToSum { hmap: Vec::new() },
            deposits: JournaledMap::default(),
            deposit_snapshots: JournaledMap::default(),
            front_ends: JournaledMap::default(),
            front_end_stakes: JournaledMap::default(),
            front_end_snapshots: JournaledMap::default(),
            ..*self
        };
        (header, sums)
    }

    fn commit(&mut self) {
        self.deposits.commit();
        self.deposit_snapshots.commit();
        self.front_ends.commit();
        self.front_end_stakes.commit();
        self.front_end_snapshots.commit();
        self.epoch_to_scale_to_sum.commit();
    }

    fn rollback(&mut self, (saved, sums): Self::Saved) {
        self.deposits.rollback(());
        self.deposit_snapshots.rollback(());
        self.front_ends.rollback(());
        self.front_end_stakes.rollback(());
        self.front_end_snapshots.rollback(());
        self.epoch_to_scale_to_sum.rollback(sums);
        *self = StabilityPoolState {
            epoch_to_scale_to_sum: mem::take(&mut self.epoch_to_scale_to_sum),
            deposits: mem::take(&mut self.deposits),
            deposit_snapshots: mem::take(&mut self.deposit_snapshots),
            front_ends: mem::take(&mut self.front_ends),
            front_end_stakes: mem::take(&mut self.front_end_stakes),
            front_end_snapshots: mem::take(&mut self.front_end_snapshots),
            ..saved
        };
    }
}

pub struct MarketCheckpoint {
    config: crate::GlobalConfig,
    trove_manager: TroveManagerState,
    sorted_troves: SortedTroves,
    active_pool: crate::ActivePool,
    default_pool: crate::DefaultPool,
    coll_surplus: u128,
    gas_pool: crate::GasPool,
}

impl Checkpoint for BorrowingMarket {
    type Saved = MarketCheckpoint;

    fn checkpoint(&mut self) -> MarketCheckpoint {
        MarketCheckpoint {
            config: self.config,
            trove_manager: self.trove_manager.checkpoint(),
            sorted_troves: self.sorted_troves.checkpoint(),
            active_pool: self.active_pool,
            default_pool: self.default_pool,
            coll_surplus: self.coll_surplus_pool.checkpoint(),
            gas_pool: self.gas_pool,
        }
    }

    fn commit(&mut self) {
        self.trove_manager.commit();
        self.sorted_troves.commit();
        self.coll_surplus_pool.commit();
    }

    fn rollback(&mut self, saved: MarketCheckpoint) {
        self.config = saved.config;
        self.trove_manager.rollback(saved.trove_manager);
        self.sorted_troves.rollback(saved.sorted_troves);
        self.active_pool = saved.active_pool;
        self.default_pool = saved.default_pool;
        self.coll_surplus_pool.rollback(saved.coll_surplus);
        self.gas_pool = saved.gas_pool;
    }
}
