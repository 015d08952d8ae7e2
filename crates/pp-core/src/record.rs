//! Anomaly record input boundary.
//!
//! The aggregator only needs two attributes from a record: the partition it
//! belongs to and its score. [`ScoredRecord`] is that seam; [`AnomalyRecord`]
//! is the concrete record read from JSON by the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record carrying a partition value and an anomaly score.
pub trait ScoredRecord {
    /// Partition the record belongs to. `None` or an empty string means the
    /// record is unpartitioned.
    fn partition_field_value(&self) -> Option<&str>;

    /// Record score; higher is more anomalous.
    fn record_score(&self) -> f64;
}

impl<T: ScoredRecord + ?Sized> ScoredRecord for &T {
    fn partition_field_value(&self) -> Option<&str> {
        (**self).partition_field_value()
    }

    fn record_score(&self) -> f64 {
        (**self).record_score()
    }
}

impl ScoredRecord for (&str, f64) {
    fn partition_field_value(&self) -> Option<&str> {
        Some(self.0)
    }

    fn record_score(&self) -> f64 {
        self.1
    }
}

impl ScoredRecord for (String, f64) {
    fn partition_field_value(&self) -> Option<&str> {
        Some(self.0.as_str())
    }

    fn record_score(&self) -> f64 {
        self.1
    }
}

/// One detected anomaly, as produced by the result-processing pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Job that produced the record.
    pub job_id: String,

    /// Bucket start time, epoch milliseconds on the wire.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Bucket span in seconds.
    pub bucket_span: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_field_value: Option<String>,

    #[serde(default)]
    pub record_score: f64,
}

impl AnomalyRecord {
    /// Create an unpartitioned record with a zero score.
    pub fn new(job_id: impl Into<String>, timestamp: DateTime<Utc>, bucket_span: u64) -> Self {
        AnomalyRecord {
            job_id: job_id.into(),
            timestamp,
            bucket_span,
            partition_field_value: None,
            record_score: 0.0,
        }
    }

    /// Set the partition field value.
    pub fn with_partition(mut self, value: impl Into<String>) -> Self {
        self.partition_field_value = Some(value.into());
        self
    }

    /// Set the record score.
    pub fn with_score(mut self, score: f64) -> Self {
        self.record_score = score;
        self
    }
}

impl ScoredRecord for AnomalyRecord {
    fn partition_field_value(&self) -> Option<&str> {
        self.partition_field_value.as_deref()
    }

    fn record_score(&self) -> f64 {
        self.record_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_builder() {
        let ts = Utc.timestamp_millis_opt(1_000).unwrap();
        let record = AnomalyRecord::new("foo", ts, 600)
            .with_partition("host-a")
            .with_score(42.5);

        assert_eq!(record.partition_field_value(), Some("host-a"));
        assert_eq!(record.record_score(), 42.5);
        assert_eq!(record.bucket_span, 600);
    }

    #[test]
    fn test_record_json_shape() {
        let json = r#"{
            "job_id": "foo",
            "timestamp": 1500000000000,
            "bucket_span": 600,
            "partition_field_value": "A",
            "record_score": 20.0
        }"#;
        let record: AnomalyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.timestamp.timestamp_millis(), 1_500_000_000_000);
        assert_eq!(record.partition_field_value(), Some("A"));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["timestamp"], serde_json::json!(1_500_000_000_000_i64));
    }

    #[test]
    fn test_record_without_partition() {
        let json = r#"{"job_id":"foo","timestamp":0,"bucket_span":60,"record_score":1.0}"#;
        let record: AnomalyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.partition_field_value(), None);
    }

    #[test]
    fn test_tuple_records() {
        let owned = ("B".to_string(), 3.0);
        assert_eq!(("A", 1.0).partition_field_value(), Some("A"));
        assert_eq!(owned.record_score(), 3.0);
        assert_eq!((&owned).partition_field_value(), Some("B"));
    }
}
