//! Property tests: the tree must agree with `BTreeMap` under any sequence of
//! inserts and deletes, and stay structurally valid throughout.

use std::collections::BTreeMap;

use bplusdb::{BPlusTree, Key, MemoryBlockStore, RecordId, TreeConfig};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert(Key, u64),
    Delete(Key),
}

fn op() -> impl Strategy<Value = Op> {
    // A narrow key space makes duplicate inserts and hits on delete common
    prop_oneof![
        3 => (-64i64..64, any::<u64>()).prop_map(|(k, r)| Op::Insert(k, r)),
        2 => (-64i64..64).prop_map(Op::Delete),
    ]
}

fn model_range(model: &BTreeMap<Key, RecordId>, min: Key, max: Key) -> Vec<(Key, RecordId)> {
    if min > max {
        return Vec::new();
    }
    model.range(min..=max).map(|(&k, &r)| (k, r)).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn tree_matches_model(fanout in 3usize..8, ops in proptest::collection::vec(op(), 0..300)) {
        let mut tree = BPlusTree::create(MemoryBlockStore::new(), TreeConfig::new(fanout)).unwrap();
        let mut model = BTreeMap::new();

        for op in ops {
            match op {
                Op::Insert(key, raw) => {
                    tree.insert(key, RecordId::new(raw)).unwrap();
                    model.entry(key).or_insert(RecordId::new(raw));
                }
                Op::Delete(key) => {
                    tree.delete(key).unwrap();
                    model.remove(&key);
                }
            }
            tree.validate().unwrap();
        }

        prop_assert_eq!(tree.range(Key::MIN, Key::MAX).unwrap(), model_range(&model, Key::MIN, Key::MAX));
        prop_assert_eq!(tree.len().unwrap(), model.len());
    }

    #[test]
    fn insert_then_delete_restores_contents(
        keys in proptest::collection::btree_set(-200i64..200, 0..120),
        extra in -300i64..300,
    ) {
        let mut tree = BPlusTree::create(MemoryBlockStore::new(), TreeConfig::new(4)).unwrap();
        for &key in &keys {
            tree.insert(key, RecordId::new(key as u64)).unwrap();
        }
        let before = tree.range(Key::MIN, Key::MAX).unwrap();

        // A key already present is neither replaced by the insert nor kept
        // by the delete, so only absent keys round-trip
        prop_assume!(!keys.contains(&extra));
        tree.insert(extra, RecordId::new(0)).unwrap();
        tree.delete(extra).unwrap();

        tree.validate().unwrap();
        prop_assert_eq!(tree.range(Key::MIN, Key::MAX).unwrap(), before);
    }

    #[test]
    fn range_matches_model(
        keys in proptest::collection::btree_set(-500i64..500, 0..200),
        min in -600i64..600,
        width in -10i64..300,
    ) {
        let mut tree = BPlusTree::create(MemoryBlockStore::new(), TreeConfig::new(4)).unwrap();
        let mut model = BTreeMap::new();
        for &key in &keys {
            tree.insert(key, RecordId::new(key as u64)).unwrap();
            model.insert(key, RecordId::new(key as u64));
        }

        let max = min + width;
        prop_assert_eq!(tree.range(min, max).unwrap(), model_range(&model, min, max));
    }

    #[test]
    fn get_matches_model(keys in proptest::collection::btree_set(any::<i64>(), 0..100), probe: i64) {
        let mut tree = BPlusTree::create(MemoryBlockStore::new(), TreeConfig::new(5)).unwrap();
        for &key in &keys {
            tree.insert(key, RecordId::new(key as u64)).unwrap();
        }

        for &key in &keys {
            prop_assert_eq!(tree.get(key).unwrap(), Some(RecordId::new(key as u64)));
        }
        let expected = keys.contains(&probe).then(|| RecordId::new(probe as u64));
        prop_assert_eq!(tree.get(probe).unwrap(), expected);
    }
}
