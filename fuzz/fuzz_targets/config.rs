#![no_main]

use libfuzzer_sys::fuzz_target;
use sketch_engine::{AnalysisSession, SketchConfig};

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<SketchConfig>(data) {
        if config.filter_size > 1 << 24 {
            return;
        }
        let Ok(mut session) = AnalysisSession::new(config) else {
            return;
        };
        session.load().unwrap();
        let summary = session.count_distinct(["fuzz"]).unwrap();
        assert!(summary.distinct_estimate > 0);
        assert_eq!(session.check_presence(["fuzz"]).unwrap().present_count(), 1);
    }
});
