#![no_main]

use libfuzzer_sys::fuzz_target;

// Arbitrary bytes must never panic the snapshot parser; malformed input
// has to surface as SnapshotError.
fuzz_target!(|data: &[u8]| {
    let _ = docket_core::snapshot::load(data);
});
