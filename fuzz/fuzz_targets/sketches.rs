#![no_main]

use libfuzzer_sys::fuzz_target;
use sketch_engine::{CardinalityEstimator, MembershipFilter};
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let seed = wyhash(data, 0);
    let size = 1 + (seed % 4096) as usize;
    let bucket_bits = 1 + (seed >> 32) as u8 % 12;

    let mut filter = MembershipFilter::with_hash_count(size, 3).unwrap();
    let mut estimator = CardinalityEstimator::new(bucket_bits).unwrap();
    for chunk in data.chunks(4) {
        filter.insert_bytes(chunk);
        estimator.observe_bytes(chunk);
        assert!(filter.contains_bytes(chunk));
        assert!(estimator.estimate() > 0);
        assert!(estimator.size_of() > 0);
    }
    assert!(filter.set_slots() <= filter.size());

    // encoded items must hash exactly like their canonical bytes
    if let Ok(text) = std::str::from_utf8(data) {
        filter.insert(text).unwrap();
        assert!(filter.contains_bytes(data));
    }
});
