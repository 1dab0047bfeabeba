#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use anchor_lang::prelude::Pubkey;
    use quickcheck_macros::quickcheck;

    use crate::{
        sorted_troves::{NominalIcrSource, SortedTroves},
        TroveError,
    };

    impl NominalIcrSource for BTreeMap<Pubkey, u128> {
        fn nominal_icr(&self, id: &Pubkey) -> Result<u128, TroveError> {
            self.get(id).copied().ok_or(TroveError::TroveNotInList)
        }
    }

    fn assert_sorted(list: &SortedTroves, nicrs: &BTreeMap<Pubkey, u128>) {
        let ids: Vec<Pubkey> = list.iter().collect();
        assert_eq!(ids.len() as u64, list.get_size());
        for pair in ids.windows(2) {
            assert!(nicrs[&pair[0]] >= nicrs[&pair[1]]);
            assert_eq!(list.get_prev(&pair[1]), Some(pair[0]));
        }
        assert_eq!(list.get_first(), ids.first().copied());
        assert_eq!(list.get_last(), ids.last().copied());
    }

    fn insert_all(values: &[u128]) -> (SortedTroves, BTreeMap<Pubkey, u128>, Vec<Pubkey>) {
        let mut list = SortedTroves::new(100);
        let mut nicrs = BTreeMap::new();
        let mut ids = vec![];
        for value in values {
            let id = Pubkey::new_unique();
            nicrs.insert(id, *value);
            list.insert(id, *value, None, None, &nicrs).unwrap();
            ids.push(id);
        }
        (list, nicrs, ids)
    }

    #[test]
    fn test_sorted_empty_and_single() {
        let mut list = SortedTroves::new(10);
        let mut nicrs = BTreeMap::new();
        assert!(list.is_empty());
        assert_eq!(list.get_first(), None);
        assert_eq!(list.get_last(), None);

        let id = Pubkey::new_unique();
        nicrs.insert(id, 7);
        list.insert(id, 7, None, None, &nicrs).unwrap();
        assert_eq!(list.get_first(), Some(id));
        assert_eq!(list.get_last(), Some(id));
        assert_eq!(list.get_next(&id), None);
        assert_eq!(list.get_prev(&id), None);

        list.remove(&id).unwrap();
        assert!(list.is_empty());
        assert_eq!(list.get_first(), None);
        assert_eq!(list.get_last(), None);
    }

    #[test]
    fn test_sorted_insert_orders_descending() {
        let (list, nicrs, ids) = insert_all(&[5, 3, 9, 1, 4]);
        assert_sorted(&list, &nicrs);

        let order: Vec<Pubkey> = list.iter().collect();
        assert_eq!(order, vec![ids[2], ids[0], ids[4], ids[1], ids[3]]);
    }

    #[test]
    fn test_sorted_insert_errors() {
        let (mut list, mut nicrs, ids) = insert_all(&[5, 3]);

        assert_eq!(
            list.insert(ids[0], 5, None, None, &nicrs),
            Err(TroveError::TroveAlreadyInList)
        );
        assert_eq!(
            list.insert(Pubkey::default(), 5, None, None, &nicrs),
            Err(TroveError::NullTroveId)
        );
        let id = Pubkey::new_unique();
        nicrs.insert(id, 0);
        assert_eq!(
            list.insert(id, 0, None, None, &nicrs),
            Err(TroveError::NonPositiveNicr)
        );
        assert_eq!(
            list.remove(&Pubkey::new_unique()),
            Err(TroveError::TroveNotInList)
        );
        assert_eq!(
            list.re_insert(Pubkey::new_unique(), 1, None, None, &nicrs),
            Err(TroveError::TroveNotInList)
        );
    }

    #[test]
    fn test_sorted_capacity_exhausted() {
        let mut list = SortedTroves::new(2);
        let mut nicrs = BTreeMap::new();
        for value in [1, 2] {
            let id = Pubkey::new_unique();
            nicrs.insert(id, value);
            list.insert(id, value, None, None, &nicrs).unwrap();
        }
        assert!(list.is_full());

        let id = Pubkey::new_unique();
        nicrs.insert(id, 3);
        assert_eq!(
            list.insert(id, 3, None, None, &nicrs),
            Err(TroveError::SortedTrovesFull)
        );

        list.set_max_size(3);
        list.insert(id, 3, None, None, &nicrs).unwrap();
        assert_eq!(list.get_first(), Some(id));
    }

    #[test]
    fn test_sorted_stale_hints_still_find_position() {
        let (mut list, mut nicrs, ids) = insert_all(&[100, 80, 60, 40, 20]);

        // hints point at the top of the list, the trove belongs near the bottom
        let id = Pubkey::new_unique();
        nicrs.insert(id, 30);
        list.insert(id, 30, Some(ids[0]), Some(ids[1]), &nicrs)
            .unwrap();
        assert_eq!(list.get_prev(&id), Some(ids[3]));
        assert_eq!(list.get_next(&id), Some(ids[4]));

        // hints that are not in the list at all
        let id = Pubkey::new_unique();
        nicrs.insert(id, 90);
        list.insert(
            id,
            90,
            Some(Pubkey::new_unique()),
            Some(Pubkey::new_unique()),
            &nicrs,
        )
        .unwrap();
        assert_eq!(list.get_prev(&id), Some(ids[0]));
        assert_eq!(list.get_next(&id), Some(ids[1]));

        // only a next hint, ascending from the tail
        let id = Pubkey::new_unique();
        nicrs.insert(id, 70);
        list.insert(id, 70, None, Some(ids[4]), &nicrs).unwrap();
        assert_eq!(list.get_prev(&id), Some(ids[1]));
        assert_eq!(list.get_next(&id), Some(ids[2]));

        assert_sorted(&list, &nicrs);
    }

    #[test]
    fn test_sorted_ties_go_after_existing_troves() {
        let (mut list, mut nicrs, ids) = insert_all(&[50, 40, 40, 30]);
        let order: Vec<Pubkey> = list.iter().collect();
        assert_eq!(order, vec![ids[0], ids[1], ids[2], ids[3]]);

        // a hint placing the newcomer ahead of an equal trove is rejected
        let id = Pubkey::new_unique();
        nicrs.insert(id, 40);
        assert!(!list
            .valid_insert_position(40, Some(ids[0]), Some(ids[1]), &nicrs)
            .unwrap());
        assert!(list
            .valid_insert_position(40, Some(ids[2]), Some(ids[3]), &nicrs)
            .unwrap());
        list.insert(id, 40, Some(ids[0]), Some(ids[1]), &nicrs)
            .unwrap();
        assert_eq!(list.get_prev(&id), Some(ids[2]));
        assert_eq!(list.get_next(&id), Some(ids[3]));

        // same for the head
        let top = Pubkey::new_unique();
        nicrs.insert(top, 50);
        list.insert(top, 50, None, Some(ids[0]), &nicrs).unwrap();
        assert_eq!(list.get_first(), Some(ids[0]));
        assert_eq!(list.get_next(&ids[0]), Some(top));

        assert_sorted(&list, &nicrs);
    }

    #[test]
    fn test_sorted_new_head_and_tail() {
        let (mut list, mut nicrs, ids) = insert_all(&[50, 40]);

        let top = Pubkey::new_unique();
        nicrs.insert(top, 60);
        list.insert(top, 60, Some(ids[1]), None, &nicrs).unwrap();
        assert_eq!(list.get_first(), Some(top));

        let bottom = Pubkey::new_unique();
        nicrs.insert(bottom, 10);
        list.insert(bottom, 10, None, Some(top), &nicrs).unwrap();
        assert_eq!(list.get_last(), Some(bottom));

        assert_sorted(&list, &nicrs);
    }

    #[test]
    fn test_sorted_reinsert_unchanged_is_noop() {
        let (mut list, nicrs, ids) = insert_all(&[50, 40, 40, 30]);
        let before: Vec<Pubkey> = list.iter().collect();

        for id in ids.iter() {
            let prev = list.get_prev(id);
            let next = list.get_next(id);
            list.re_insert(*id, nicrs[id], prev, next, &nicrs).unwrap();
        }

        let after: Vec<Pubkey> = list.iter().collect();
        assert_eq!(before, after);
        assert_eq!(list.get_size(), 4);
    }

    #[test]
    fn test_sorted_reinsert_moves_trove() {
        let (mut list, mut nicrs, ids) = insert_all(&[50, 40, 30]);

        nicrs.insert(ids[2], 45);
        list.re_insert(ids[2], 45, None, None, &nicrs).unwrap();

        let order: Vec<Pubkey> = list.iter().collect();
        assert_eq!(order, vec![ids[0], ids[2], ids[1]]);
        assert_sorted(&list, &nicrs);
    }

    #[quickcheck]
    fn test_sorted_order_invariant(values: Vec<u16>, hints: Vec<u8>, removals: Vec<u8>) {
        let mut list = SortedTroves::new(1_000);
        let mut nicrs = BTreeMap::new();
        let mut ids: Vec<Pubkey> = vec![];

        let hint_at = |ids: &[Pubkey], i: usize| -> Option<Pubkey> {
            let pick = *hints.get(i)? as usize;
            if ids.is_empty() || pick % 3 == 0 {
                None
            } else {
                Some(ids[pick % ids.len()])
            }
        };

        for (i, value) in values.iter().enumerate() {
            let nicr = *value as u128 + 1;
            let id = Pubkey::new_unique();
            nicrs.insert(id, nicr);
            let prev = hint_at(&ids, 2 * i);
            let next = hint_at(&ids, 2 * i + 1);
            list.insert(id, nicr, prev, next, &nicrs).unwrap();
            ids.push(id);
        }
        assert_sorted(&list, &nicrs);

        for removal in removals {
            if ids.is_empty() {
                break;
            }
            let id = ids.swap_remove(removal as usize % ids.len());
            list.remove(&id).unwrap();
            nicrs.remove(&id);
        }
        assert_sorted(&list, &nicrs);
        assert_eq!(list.get_size(), ids.len() as u64);
    }
}
