//! Per-partition maximum record score summaries.
//!
//! [`PerPartitionMaxProbabilities`] records, for one job bucket, the highest
//! record score seen for each partition value. It is immutable once built and
//! keyed for persistence by [`PerPartitionMaxProbabilities::id`].

use std::fmt;

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use pp_common::id::{validate_job_id, ResultId, RESULT_TYPE};
use pp_common::{Error, Result};

use crate::aggregate::PartitionMaxAggregator;
use crate::codec::{document, stream};
use crate::record::AnomalyRecord;

/// Maximum record score of a single partition value.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionProbability {
    partition_value: String,
    max_record_score: f64,
}

impl PartitionProbability {
    pub fn new(partition_value: impl Into<String>, max_record_score: f64) -> Self {
        PartitionProbability {
            partition_value: partition_value.into(),
            max_record_score,
        }
    }

    pub fn partition_value(&self) -> &str {
        &self.partition_value
    }

    pub fn max_record_score(&self) -> f64 {
        self.max_record_score
    }
}

/// Worst record score per partition for one job bucket.
///
/// Equality compares job id, timestamp, bucket span and the partition list
/// element by element, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct PerPartitionMaxProbabilities {
    job_id: String,
    timestamp: DateTime<Utc>,
    bucket_span: u64,
    partition_probabilities: Vec<PartitionProbability>,
}

impl PerPartitionMaxProbabilities {
    /// Build a summary from explicit fields.
    ///
    /// The timestamp is truncated to millisecond precision, the resolution
    /// both serialized forms carry. Fails if `job_id` is empty or any score
    /// is NaN or infinite.
    pub fn new(
        job_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        bucket_span: u64,
        partition_probabilities: Vec<PartitionProbability>,
    ) -> Result<Self> {
        let job_id = job_id.into();
        validate_job_id(&job_id)?;

        if let Some(bad) = partition_probabilities
            .iter()
            .find(|p| !p.max_record_score.is_finite())
        {
            return Err(Error::InvalidArgument(format!(
                "max_record_score for partition [{}] must be finite, got {}",
                bad.partition_value, bad.max_record_score
            )));
        }

        Ok(PerPartitionMaxProbabilities {
            job_id,
            timestamp: timestamp.trunc_subsecs(3),
            bucket_span,
            partition_probabilities,
        })
    }

    /// Aggregate anomaly records, taking job id, timestamp and bucket span
    /// from the first record.
    ///
    /// An empty batch carries no context and fails with
    /// [`Error::EmptyBatch`]; use [`PartitionMaxAggregator::aggregate`] when
    /// the context is known up front.
    pub fn from_records(records: &[AnomalyRecord]) -> Result<Self> {
        let first = records.first().ok_or(Error::EmptyBatch)?;
        PartitionMaxAggregator::aggregate(
            records,
            first.job_id.clone(),
            first.timestamp,
            first.bucket_span,
        )
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Bucket span in seconds.
    pub fn bucket_span(&self) -> u64 {
        self.bucket_span
    }

    pub fn partition_probabilities(&self) -> &[PartitionProbability] {
        &self.partition_probabilities
    }

    /// Result type tag shared by every summary.
    pub fn result_type(&self) -> &'static str {
        RESULT_TYPE
    }

    /// Persistence key, derived from job id, timestamp (epoch ms) and bucket
    /// span only.
    pub fn id(&self) -> ResultId {
        ResultId::for_bucket(
            &self.job_id,
            self.timestamp.timestamp_millis(),
            self.bucket_span,
        )
    }

    /// Max record score of the first entry matching `partition_value`
    /// exactly, or `None` when the partition was not seen.
    pub fn lookup(&self, partition_value: &str) -> Option<f64> {
        self.partition_probabilities
            .iter()
            .find(|p| p.partition_value == partition_value)
            .map(|p| p.max_record_score)
    }

    /// Number of partitions in the summary.
    pub fn len(&self) -> usize {
        self.partition_probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partition_probabilities.is_empty()
    }

    /// Encode with the binary stream codec.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        stream::encode(self)
    }

    /// Decode a complete binary stream payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        stream::decode(bytes)
    }

    /// Encode as a structured JSON document.
    pub fn to_document(&self) -> serde_json::Value {
        document::to_value(self)
    }

    /// Parse a structured JSON document.
    pub fn from_document(value: &serde_json::Value) -> Result<Self> {
        document::from_value(value)
    }
}

/// Renders the compact JSON document.
impl fmt::Display for PerPartitionMaxProbabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_document())
    }
}

/// Convert epoch milliseconds to a UTC timestamp, reporting out-of-range
/// values against `field`.
pub fn timestamp_from_millis(field: &str, millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| Error::InvalidValue {
            field: field.to_string(),
            reason: format!("epoch milliseconds {} out of range", millis),
        })
}
