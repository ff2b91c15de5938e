//! Property tests for ordered-index invariants: BST ordering, delete
//! correctness, and snapshot replay fidelity.

use docket_core::{snapshot, OrderedIndex, Record, RecordId};
use proptest::prelude::*;

use generators::*;

fn build(ids: &[u64]) -> OrderedIndex {
    let mut index = OrderedIndex::new();
    for &id in ids {
        index
            .insert(Record::new(RecordId(id)))
            .expect("generator ids are unique");
    }
    index
}

fn in_order_ids(index: &OrderedIndex) -> Vec<u64> {
    index.iter().map(|r| r.id().0).collect()
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    #[test]
    fn in_order_traversal_is_strictly_ascending(ids in arb_unique_ids()) {
        let index = build(&ids);
        let mut expected = ids.clone();
        expected.sort_unstable();
        prop_assert_eq!(in_order_ids(&index), expected);
        prop_assert_eq!(index.len(), ids.len());
    }

    #[test]
    fn removal_deletes_exactly_the_victim(
        ids in arb_unique_ids(),
        pick in any::<prop::sample::Index>(),
    ) {
        prop_assume!(!ids.is_empty());
        let mut index = build(&ids);
        let victim = ids[pick.index(ids.len())];

        let removed = index.remove(RecordId(victim)).unwrap();
        prop_assert_eq!(removed.id(), RecordId(victim));
        prop_assert!(index.find(RecordId(victim)).is_none());

        let mut expected: Vec<u64> = ids.iter().copied().filter(|&id| id != victim).collect();
        expected.sort_unstable();
        prop_assert_eq!(in_order_ids(&index), expected);
    }

    #[test]
    fn removing_everything_drains_the_index(ids in arb_unique_ids()) {
        let mut index = build(&ids);
        for &id in &ids {
            index.remove(RecordId(id)).unwrap();
        }
        prop_assert!(index.is_empty());
        prop_assert_eq!(index.iter().count(), 0);
    }

    #[test]
    fn snapshot_replay_reproduces_the_index(records in arb_records()) {
        let mut index = OrderedIndex::new();
        for record in records {
            index.insert(record).unwrap();
        }

        let mut buf = Vec::new();
        snapshot::save(&index, &mut buf).unwrap();
        let replayed = snapshot::load(buf.as_slice()).unwrap();

        let original: Vec<Record> = index.iter().cloned().collect();
        let loaded: Vec<Record> = replayed.iter().cloned().collect();
        prop_assert_eq!(loaded, original);
    }
}
