//! Fuzz target for per-partition aggregation.
//!
//! Checks that every entry holds its partition's maximum and that partition
//! values are never duplicated.

#![no_main]

use arbitrary::Arbitrary;
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use pp_core::aggregate;

#[derive(Debug, Arbitrary)]
struct Input {
    job_id: String,
    millis: i32,
    bucket_span: u64,
    records: Vec<(String, f64)>,
}

fuzz_target!(|input: Input| {
    let Some(timestamp) = Utc.timestamp_millis_opt(i64::from(input.millis)).single() else {
        return;
    };
    let summary = match aggregate(&input.records, input.job_id, timestamp, input.bucket_span) {
        Ok(summary) => summary,
        Err(_) => return,
    };

    let entries = summary.partition_probabilities();
    for (i, entry) in entries.iter().enumerate() {
        assert!(!entry.partition_value().is_empty());
        assert!(entry.max_record_score().is_finite());
        assert!(entries[..i]
            .iter()
            .all(|e| e.partition_value() != entry.partition_value()));

        let expected = input
            .records
            .iter()
            .filter(|(p, s)| p == entry.partition_value() && s.is_finite())
            .map(|(_, s)| *s)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(entry.max_record_score(), expected);
    }
});
