use anchor_lang::prelude::{msg, AnchorDeserialize, AnchorSerialize, Pubkey};

use crate::{JournaledMap, TroveError};

#[cfg(test)]
mod tests_sorted_troves;

/// Anything that can report the current nominal ICR of a trove.
pub trait NominalIcrSource {
    fn nominal_icr(&self, id: &Pubkey) -> Result<u128, TroveError>;
}

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Node {
    pub prev: Option<Pubkey>,
    pub next: Option<Pubkey>,
}

/// Troves ordered by descending nominal ICR, head is the safest one.
///
/// Insert positions are found from caller supplied hints, walking only as
/// far as the hints are stale. `None` plays the role of the null id.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SortedTroves {
    pub head: Option<Pubkey>,
    pub tail: Option<Pubkey>,
    pub size: u64,
    pub max_size: u64,
    pub nodes: JournaledMap<Pubkey, Node>,
}

impl SortedTroves {
    pub fn new(max_size: u64) -> Self {
        SortedTroves {
            max_size,
            ..Default::default()
        }
    }

    pub fn contains(&self, id: &Pubkey) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn is_full(&self) -> bool {
        self.size >= self.max_size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get_size(&self) -> u64 {
        self.size
    }

    pub fn get_max_size(&self) -> u64 {
        self.max_size
    }

    pub fn set_max_size(&mut self, max_size: u64) {
        self.max_size = max_size;
    }

    pub fn get_first(&self) -> Option<Pubkey> {
        self.head
    }

    pub fn get_last(&self) -> Option<Pubkey> {
        self.tail
    }

    pub fn get_next(&self, id: &Pubkey) -> Option<Pubkey> {
        self.nodes.get(id).and_then(|node| node.next)
    }

    pub fn get_prev(&self, id: &Pubkey) -> Option<Pubkey> {
        self.nodes.get(id).and_then(|node| node.prev)
    }

    /// Ids from head to tail.
    pub fn iter(&self) -> SortedTrovesIter<'_> {
        SortedTrovesIter {
            list: self,
            current: self.head,
        }
    }

    pub fn insert(
        &mut self,
        id: Pubkey,
        nicr: u128,
        prev_hint: Option<Pubkey>,
        next_hint: Option<Pubkey>,
        source: &impl NominalIcrSource,
    ) -> Result<(), TroveError> {
        if self.is_full() {
            return Err(TroveError::SortedTrovesFull);
        }
        if self.contains(&id) {
            return Err(TroveError::TroveAlreadyInList);
        }
        if id == Pubkey::default() {
            return Err(TroveError::NullTroveId);
        }
        if nicr == 0 {
            return Err(TroveError::NonPositiveNicr);
        }

        let (prev, next) = if self.valid_insert_position(nicr, prev_hint, next_hint, source)? {
            (prev_hint, next_hint)
        } else {
            // hints went stale, search from whatever is left of them
            self.find_insert_position(nicr, prev_hint, next_hint, source)?
        };

        let node = Node { prev, next };
        match (prev, next) {
            (None, None) => {
                self.head = Some(id);
                self.tail = Some(id);
            }
            (None, Some(next)) => {
                self.node_mut(&next)?.prev = Some(id);
                self.head = Some(id);
            }
            (Some(prev), None) => {
                self.node_mut(&prev)?.next = Some(id);
                self.tail = Some(id);
            }
            (Some(prev), Some(next)) => {
                self.node_mut(&prev)?.next = Some(id);
                self.node_mut(&next)?.prev = Some(id);
            }
        }
        self.nodes.insert(id, node);
        self.size += 1;

        msg!("NodeAdded {} nicr {}", id, nicr);
        Ok(())
    }

    pub fn remove(&mut self, id: &Pubkey) -> Result<(), TroveError> {
        let node = match self.nodes.get(id) {
            Some(node) => *node,
            None => return Err(TroveError::TroveNotInList),
        };

        match (node.prev, node.next) {
            (None, None) => {
                self.head = None;
                self.tail = None;
            }
            (None, Some(next)) => {
                self.node_mut(&next)?.prev = None;
                self.head = Some(next);
            }
            (Some(prev), None) => {
                self.node_mut(&prev)?.next = None;
                self.tail = Some(prev);
            }
            (Some(prev), Some(next)) => {
                self.node_mut(&prev)?.next = Some(next);
                self.node_mut(&next)?.prev = Some(prev);
            }
        }
        self.nodes.remove(id);
        self.size -= 1;

        msg!("NodeRemoved {}", id);
        Ok(())
    }

    /// Moves a trove whose ratio changed, as one logical step.
    pub fn re_insert(
        &mut self,
        id: Pubkey,
        new_nicr: u128,
        prev_hint: Option<Pubkey>,
        next_hint: Option<Pubkey>,
        source: &impl NominalIcrSource,
    ) -> Result<(), TroveError> {
        let node = match self.nodes.get(&id) {
            Some(node) => *node,
            None => return Err(TroveError::TroveNotInList),
        };
        if new_nicr == 0 {
            return Err(TroveError::NonPositiveNicr);
        }

        // still ordered against its neighbours, so it keeps its place
        let below_prev = match node.prev {
            Some(prev) => source.nominal_icr(&prev)? >= new_nicr,
            None => true,
        };
        let above_next = match node.next {
            Some(next) => new_nicr >= source.nominal_icr(&next)?,
            None => true,
        };
        if below_prev && above_next {
            return Ok(());
        }

        self.remove(&id)?;
        self.insert(id, new_nicr, prev_hint, next_hint, source)
    }

    /// Whether `(prev, next)` are adjacent and `prev.nicr >= nicr > next.nicr`.
    /// A new trove goes after every trove already holding the same NICR.
    pub fn valid_insert_position(
        &self,
        nicr: u128,
        prev: Option<Pubkey>,
        next: Option<Pubkey>,
        source: &impl NominalIcrSource,
    ) -> Result<bool, TroveError> {
        match (prev, next) {
            (None, None) => Ok(self.is_empty()),
            (None, Some(next)) => {
                Ok(self.head == Some(next) && nicr > source.nominal_icr(&next)?)
            }
            (Some(prev), None) => {
                Ok(self.tail == Some(prev) && nicr <= source.nominal_icr(&prev)?)
            }
            (Some(prev), Some(next)) => Ok(self.get_next(&prev) == Some(next)
                && source.nominal_icr(&prev)? >= nicr
                && nicr > source.nominal_icr(&next)?),
        }
    }

    pub fn find_insert_position(
        &self,
        nicr: u128,
        prev_hint: Option<Pubkey>,
        next_hint: Option<Pubkey>,
        source: &impl NominalIcrSource,
    ) -> Result<(Option<Pubkey>, Option<Pubkey>), TroveError> {
        let mut prev = prev_hint.filter(|id| self.contains(id));
        if let Some(id) = prev {
            if nicr > source.nominal_icr(&id)? {
                prev = None;
            }
        }
        let mut next = next_hint.filter(|id| self.contains(id));
        if let Some(id) = next {
            if nicr <= source.nominal_icr(&id)? {
                next = None;
            }
        }

        match (prev, next) {
            (None, None) => match self.head {
                Some(head) => self.descend_list(nicr, head, source),
                None => Ok((None, None)),
            },
            (None, Some(next)) => self.ascend_list(nicr, next, source),
            (Some(prev), _) => self.descend_list(nicr, prev, source),
        }
    }

    fn descend_list(
        &self,
        nicr: u128,
        start: Pubkey,
        source: &impl NominalIcrSource,
    ) -> Result<(Option<Pubkey>, Option<Pubkey>), TroveError> {
        if self.head == Some(start) && nicr > source.nominal_icr(&start)? {
            return Ok((None, Some(start)));
        }

        let mut prev = Some(start);
        let mut next = self.get_next(&start);
        while let Some(current) = prev {
            if self.valid_insert_position(nicr, prev, next, source)? {
                break;
            }
            prev = self.get_next(&current);
            next = prev.and_then(|p| self.get_next(&p));
        }
        Ok((prev, next))
    }

    fn ascend_list(
        &self,
        nicr: u128,
        start: Pubkey,
        source: &impl NominalIcrSource,
    ) -> Result<(Option<Pubkey>, Option<Pubkey>), TroveError> {
        if self.tail == Some(start) && nicr <= source.nominal_icr(&start)? {
            return Ok((Some(start), None));
        }

        let mut next = Some(start);
        let mut prev = self.get_prev(&start);
        while let Some(current) = next {
            if self.valid_insert_position(nicr, prev, next, source)? {
                break;
            }
            next = self.get_prev(&current);
            prev = next.and_then(|n| self.get_prev(&n));
        }
        Ok((prev, next))
    }

    fn node_mut(&mut self, id: &Pubkey) -> Result<&mut Node, TroveError> {
        self.nodes.get_mut(id).ok_or(TroveError::TroveNotInList)
    }
}

pub struct SortedTrovesIter<'a> {
    list: &'a SortedTroves,
    current: Option<Pubkey>,
}

impl<'a> Iterator for SortedTrovesIter<'a> {
    type Item = Pubkey;

    fn next(&mut self) -> Option<Pubkey> {
        let current = self.current?;
        self.current = self.list.get_next(&current);
        Some(current)
    }
}
