#![no_main]

use docket_core::{OrderedIndex, Record, RecordId};
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeSet;

// Drive insert/remove/find from a byte stream and check the in-order
// traversal against a model set after every step.
fuzz_target!(|data: &[u8]| {
    let mut index = OrderedIndex::new();
    let mut model = BTreeSet::new();
    for chunk in data.chunks_exact(2) {
        let id = RecordId(u64::from(chunk[1]));
        match chunk[0] % 3 {
            0 => {
                let inserted = index.insert(Record::new(id)).is_ok();
                assert_eq!(inserted, model.insert(id));
            }
            1 => {
                let removed = index.remove(id).is_ok();
                assert_eq!(removed, model.remove(&id));
            }
            _ => assert_eq!(index.find(id).is_some(), model.contains(&id)),
        }
        assert!(index.iter().map(Record::id).eq(model.iter().copied()));
    }
});
