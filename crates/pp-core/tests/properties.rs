//! Property-based tests for per-partition aggregation and the summary codecs.
//!
//! Uses proptest to check that aggregation and serialization hold their
//! invariants across many random record batches.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};
use pp_core::codec::{document, stream};
use pp_core::{
    aggregate, AnomalyRecord, PartitionMaxAggregator, PartitionProbability,
    PerPartitionMaxProbabilities,
};
use proptest::prelude::*;

/// Roughly 1900..2200 in epoch milliseconds.
const MIN_MILLIS: i64 = -2_208_988_800_000;
const MAX_MILLIS: i64 = 7_258_118_400_000;

fn ts(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

fn partition_value() -> impl Strategy<Value = String> {
    // Small alphabet so batches revisit the same partitions.
    prop_oneof![
        "[a-d]{1,2}",
        "\\PC{1,8}",
    ]
}

/// Partition field as it arrives on a record, including unpartitioned ones.
fn partition_field() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        6 => partition_value().prop_map(Some),
        1 => Just(Some(String::new())),
        1 => Just(None),
    ]
}

fn record_score() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => -1.0e6..1.0e6f64,
        1 => Just(f64::NAN),
        1 => prop_oneof![Just(f64::INFINITY), Just(f64::NEG_INFINITY)],
    ]
}

fn record_batch() -> impl Strategy<Value = Vec<AnomalyRecord>> {
    prop::collection::vec((partition_field(), record_score()), 0..64).prop_map(|fields| {
        fields
            .into_iter()
            .map(|(partition, score)| AnomalyRecord {
                job_id: "job".to_string(),
                timestamp: ts(0),
                bucket_span: 300,
                partition_field_value: partition,
                record_score: score,
            })
            .collect()
    })
}

/// Records that can produce an entry: a non-empty partition and a finite score.
fn contributing(records: &[AnomalyRecord]) -> impl Iterator<Item = (&str, f64)> + '_ {
    records
        .iter()
        .filter_map(|r| match r.partition_field_value.as_deref() {
            Some(p) if !p.is_empty() && r.record_score.is_finite() => Some((p, r.record_score)),
            _ => None,
        })
}

fn summary() -> impl Strategy<Value = PerPartitionMaxProbabilities> {
    (
        "[a-z0-9_-]{1,24}",
        MIN_MILLIS..MAX_MILLIS,
        any::<u64>(),
        prop::collection::vec(("\\PC{0,12}", prop::num::f64::NORMAL | prop::num::f64::ZERO), 0..16),
    )
        .prop_map(|(job_id, millis, span, entries)| {
            let probabilities = entries
                .into_iter()
                .map(|(value, score)| PartitionProbability::new(value, score))
                .collect();
            PerPartitionMaxProbabilities::new(job_id, ts(millis), span, probabilities).unwrap()
        })
}

// ============================================================================
// Aggregation properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Aggregating the same batch twice yields equal summaries.
    #[test]
    fn aggregation_is_deterministic(records in record_batch()) {
        let first = aggregate(&records, "job", ts(0), 300).unwrap();
        let second = aggregate(&records, "job", ts(0), 300).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Each entry holds the maximum finite score of its partition.
    #[test]
    fn entry_is_partition_maximum(records in record_batch()) {
        let summary = aggregate(&records, "job", ts(0), 300).unwrap();

        let mut expected: HashMap<&str, f64> = HashMap::new();
        for (value, score) in contributing(&records) {
            let slot = expected.entry(value).or_insert(f64::NEG_INFINITY);
            if score > *slot {
                *slot = score;
            }
        }

        for probability in summary.partition_probabilities() {
            prop_assert!(probability.max_record_score().is_finite());
            prop_assert_eq!(
                Some(probability.max_record_score()),
                expected.get(probability.partition_value()).copied()
            );
        }
    }

    /// One entry per distinct partition with a finite score; unpartitioned
    /// records and all-non-finite partitions add none.
    #[test]
    fn one_entry_per_contributing_partition(records in record_batch()) {
        let summary = aggregate(&records, "job", ts(0), 300).unwrap();
        let distinct: HashSet<&str> = contributing(&records).map(|(v, _)| v).collect();

        prop_assert_eq!(summary.len(), distinct.len());
        let seen: HashSet<&str> = summary
            .partition_probabilities()
            .iter()
            .map(|p| p.partition_value())
            .collect();
        prop_assert_eq!(seen.len(), summary.len());
        prop_assert!(!seen.contains(""));
    }

    /// Every record is either folded into an entry or counted as skipped.
    #[test]
    fn skipped_counts_non_contributing_records(records in record_batch()) {
        let mut aggregator = PartitionMaxAggregator::new();
        aggregator.observe_all(&records);

        prop_assert_eq!(aggregator.observed(), records.len());
        prop_assert_eq!(
            aggregator.skipped(),
            records.len() - contributing(&records).count()
        );
    }

    /// Entries appear in the order partitions were first seen.
    #[test]
    fn entries_follow_first_seen_order(records in record_batch()) {
        let summary = aggregate(&records, "job", ts(0), 300).unwrap();

        let mut first_seen: Vec<&str> = Vec::new();
        for (value, _) in contributing(&records) {
            if !first_seen.contains(&value) {
                first_seen.push(value);
            }
        }
        let order: Vec<&str> = summary
            .partition_probabilities()
            .iter()
            .map(|p| p.partition_value())
            .collect();
        prop_assert_eq!(order, first_seen);
    }

    /// Lookup agrees with the entry list, and misses partitions that never
    /// contributed.
    #[test]
    fn lookup_matches_entries(records in record_batch(), candidate in partition_value()) {
        let summary = aggregate(&records, "job", ts(0), 300).unwrap();
        for probability in summary.partition_probabilities() {
            prop_assert_eq!(
                summary.lookup(probability.partition_value()),
                Some(probability.max_record_score())
            );
        }
        if !contributing(&records).any(|(v, _)| v == candidate) {
            prop_assert_eq!(summary.lookup(&candidate), None);
        }
        prop_assert_eq!(summary.lookup(""), None);
    }

    /// The id depends only on job id, timestamp and bucket span.
    #[test]
    fn id_ignores_records(
        a in record_batch(),
        b in record_batch(),
        millis in MIN_MILLIS..MAX_MILLIS,
        span in any::<u64>(),
    ) {
        let left = aggregate(&a, "job-x", ts(millis), span).unwrap();
        let right = aggregate(&b, "job-x", ts(millis), span).unwrap();
        prop_assert_eq!(left.id(), right.id());
        let left_id = left.id();
        prop_assert_eq!(
            left_id.as_str(),
            format!("job-x_partition_normalized_probs_{}_{}", millis, span)
        );
    }
}

// ============================================================================
// Codec properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Binary stream decoding restores an equal summary.
    #[test]
    fn stream_roundtrip(summary in summary()) {
        let bytes = stream::encode(&summary).unwrap();
        prop_assert_eq!(stream::decode(&bytes).unwrap(), summary);
    }

    /// Document parsing restores an equal summary.
    #[test]
    fn document_roundtrip(summary in summary()) {
        let text = document::to_string(&summary);
        prop_assert_eq!(document::from_str(&text).unwrap(), summary);
    }

    /// Any strict prefix of a stream payload is rejected.
    #[test]
    fn stream_prefix_rejected(summary in summary(), cut in any::<prop::sample::Index>()) {
        let bytes = stream::encode(&summary).unwrap();
        let cut = cut.index(bytes.len());
        prop_assert!(stream::decode(&bytes[..cut]).is_err());
    }

    /// Decoding arbitrary bytes never panics.
    #[test]
    fn stream_decode_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = stream::decode(&bytes);
    }
}
