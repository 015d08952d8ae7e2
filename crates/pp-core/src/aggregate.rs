//! Per-partition maximum score aggregation.
//!
//! Reduces a batch of scored records to one maximum score per partition
//! value. Partitions keep the order in which they were first seen; the
//! index map only locates an existing entry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pp_common::Result;
use tracing::{debug, trace};

use crate::probabilities::{PartitionProbability, PerPartitionMaxProbabilities};
use crate::record::ScoredRecord;

/// Running maximum score per partition value.
#[derive(Debug, Clone, Default)]
pub struct PartitionMaxAggregator {
    /// Partition value -> position in `maxima`.
    index: HashMap<String, usize>,
    /// First-seen order.
    maxima: Vec<(String, f64)>,
    observed: usize,
    skipped: usize,
}

impl PartitionMaxAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduce `records` and wrap the result with the caller's job context.
    ///
    /// Unpartitioned records (absent or empty partition value) and records
    /// with a non-finite score are skipped. An empty batch yields an empty
    /// summary.
    ///
    /// The summary holds one entry per distinct partition value with at
    /// least one finite score. A partition whose every score is NaN or
    /// infinite gets no entry, so the entry count can be lower than the
    /// number of distinct non-empty partition values.
    pub fn aggregate<R: ScoredRecord>(
        records: &[R],
        job_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        bucket_span: u64,
    ) -> Result<PerPartitionMaxProbabilities> {
        let mut aggregator = Self::new();
        aggregator.observe_all(records);
        aggregator.finish(job_id, timestamp, bucket_span)
    }

    /// Fold one record into the running maxima.
    pub fn observe<R: ScoredRecord + ?Sized>(&mut self, record: &R) {
        self.observed += 1;

        let partition = match record.partition_field_value() {
            Some(p) if !p.is_empty() => p,
            _ => {
                self.skipped += 1;
                return;
            }
        };

        let score = record.record_score();
        if !score.is_finite() {
            trace!(partition, score, "skipping record with non-finite score");
            self.skipped += 1;
            return;
        }

        match self.index.get(partition) {
            Some(&slot) => {
                let current = &mut self.maxima[slot].1;
                if score > *current {
                    *current = score;
                }
            }
            None => {
                self.index.insert(partition.to_string(), self.maxima.len());
                self.maxima.push((partition.to_string(), score));
            }
        }
    }

    /// Fold every record of an iterator, in order.
    pub fn observe_all<I>(&mut self, records: I)
    where
        I: IntoIterator,
        I::Item: ScoredRecord,
    {
        for record in records {
            self.observe(&record);
        }
    }

    /// Current maximum for a partition, if it has been seen.
    pub fn current_max(&self, partition_value: &str) -> Option<f64> {
        self.index
            .get(partition_value)
            .map(|&slot| self.maxima[slot].1)
    }

    /// Number of distinct partitions seen so far.
    pub fn len(&self) -> usize {
        self.maxima.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maxima.is_empty()
    }

    /// Records folded in, including skipped ones.
    pub fn observed(&self) -> usize {
        self.observed
    }

    /// Records that contributed nothing (unpartitioned or non-finite score).
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Build the summary for a job bucket.
    pub fn finish(
        self,
        job_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        bucket_span: u64,
    ) -> Result<PerPartitionMaxProbabilities> {
        let job_id = job_id.into();
        debug!(
            job_id = %job_id,
            observed = self.observed,
            skipped = self.skipped,
            partitions = self.maxima.len(),
            "aggregated partition maxima"
        );

        let probabilities = self
            .maxima
            .into_iter()
            .map(|(value, score)| PartitionProbability::new(value, score))
            .collect();

        PerPartitionMaxProbabilities::new(job_id, timestamp, bucket_span, probabilities)
    }
}

/// Reduce `records` into a summary for the given job bucket.
///
/// Partitions with no finite score get no entry. See
/// [`PartitionMaxAggregator::aggregate`].
pub fn aggregate<R: ScoredRecord>(
    records: &[R],
    job_id: impl Into<String>,
    timestamp: DateTime<Utc>,
    bucket_span: u64,
) -> Result<PerPartitionMaxProbabilities> {
    PartitionMaxAggregator::aggregate(records, job_id, timestamp, bucket_span)
}

/// Max record score recorded for `partition_value`, or `None` if absent.
pub fn lookup(summary: &PerPartitionMaxProbabilities, partition_value: &str) -> Option<f64> {
    summary.lookup(partition_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AnomalyRecord;
    use chrono::TimeZone;

    fn ts(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    const SCENARIO_A: [(&str, f64); 5] =
        [("A", 20.0), ("A", 40.0), ("B", 90.0), ("B", 15.0), ("B", 45.0)];

    #[test]
    fn test_scenario_a_maxima() {
        let summary = aggregate(&SCENARIO_A, "job", ts(0), 600).unwrap();
        let probs = summary.partition_probabilities();

        assert_eq!(probs.len(), 2);
        assert_eq!(probs[0].partition_value(), "A");
        assert_eq!(probs[0].max_record_score(), 40.0);
        assert_eq!(probs[1].partition_value(), "B");
        assert_eq!(probs[1].max_record_score(), 90.0);
    }

    #[test]
    fn test_scenario_b_empty_batch() {
        let records: [AnomalyRecord; 0] = [];
        let summary = aggregate(&records, "job-foo", ts(100), 300).unwrap();

        assert!(summary.partition_probabilities().is_empty());
        assert_eq!(
            summary.id().as_str(),
            "job-foo_partition_normalized_probs_100_300"
        );
    }

    #[test]
    fn test_scenario_c_lookup() {
        let summary = aggregate(&SCENARIO_A, "job", ts(0), 600).unwrap();
        assert_eq!(lookup(&summary, "A"), Some(40.0));
        assert_eq!(lookup(&summary, "C"), None);
    }

    #[test]
    fn test_first_seen_order_not_score_order() {
        let records = [("zeta", 1.0), ("alpha", 50.0), ("mid", 10.0), ("zeta", 2.0)];
        let summary = aggregate(&records, "job", ts(0), 60).unwrap();
        let order: Vec<&str> = summary
            .partition_probabilities()
            .iter()
            .map(|p| p.partition_value())
            .collect();
        assert_eq!(order, vec!["zeta", "alpha", "mid"]);
        assert_eq!(summary.lookup("zeta"), Some(2.0));
    }

    #[test]
    fn test_unpartitioned_records_skipped() {
        let records = vec![
            AnomalyRecord::new("job", ts(0), 60).with_score(99.0),
            AnomalyRecord::new("job", ts(0), 60)
                .with_partition("")
                .with_score(98.0),
            AnomalyRecord::new("job", ts(0), 60)
                .with_partition("A")
                .with_score(1.0),
        ];

        let mut aggregator = PartitionMaxAggregator::new();
        aggregator.observe_all(&records);
        assert_eq!(aggregator.observed(), 3);
        assert_eq!(aggregator.skipped(), 2);
        assert_eq!(aggregator.len(), 1);

        let summary = aggregator.finish("job", ts(0), 60).unwrap();
        assert_eq!(summary.partition_probabilities().len(), 1);
        assert_eq!(summary.lookup(""), None);
    }

    #[test]
    fn test_only_unpartitioned_yields_empty() {
        let records = vec![AnomalyRecord::new("job", ts(0), 60).with_score(5.0)];
        let summary = aggregate(&records, "job", ts(0), 60).unwrap();
        assert!(summary.is_empty());
    }

    #[test]
    fn test_non_finite_scores_skipped() {
        let records = [("A", f64::NAN), ("A", 3.0), ("B", f64::INFINITY)];
        let mut aggregator = PartitionMaxAggregator::new();
        aggregator.observe_all(&records);

        assert_eq!(aggregator.skipped(), 2);
        assert_eq!(aggregator.current_max("A"), Some(3.0));
        assert_eq!(aggregator.current_max("B"), None);
    }

    #[test]
    fn test_partition_with_only_non_finite_scores_has_no_entry() {
        let records = [("A", f64::NAN), ("B", 1.0), ("C", f64::NEG_INFINITY)];
        let summary = aggregate(&records, "job", ts(0), 60).unwrap();

        assert_eq!(summary.len(), 1);
        assert_eq!(summary.lookup("A"), None);
        assert_eq!(summary.lookup("B"), Some(1.0));
        assert_eq!(summary.lookup("C"), None);
    }

    #[test]
    fn test_partition_match_is_case_sensitive() {
        let records = [("host", 1.0), ("HOST", 2.0)];
        let summary = aggregate(&records, "job", ts(0), 60).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary.lookup("host"), Some(1.0));
        assert_eq!(summary.lookup("HOST"), Some(2.0));
    }

    #[test]
    fn test_equal_scores_keep_single_entry() {
        let records = [("A", 7.0), ("A", 7.0)];
        let summary = aggregate(&records, "job", ts(0), 60).unwrap();
        assert_eq!(summary.partition_probabilities(), &[PartitionProbability::new("A", 7.0)]);
    }

    #[test]
    fn test_streaming_matches_batch() {
        let mut aggregator = PartitionMaxAggregator::new();
        for record in SCENARIO_A.iter() {
            aggregator.observe(record);
        }
        let streamed = aggregator.finish("job", ts(0), 600).unwrap();
        let batch = aggregate(&SCENARIO_A, "job", ts(0), 600).unwrap();
        assert_eq!(streamed, batch);
    }

    #[test]
    fn test_empty_job_id_rejected() {
        assert!(aggregate(&SCENARIO_A, "", ts(0), 600).is_err());
    }
}
