//! Serialized forms of [`PerPartitionMaxProbabilities`].
//!
//! Two independent codecs share one field list:
//! - [`stream`]: compact binary encoding with a fixed field order
//! - [`document`]: structured JSON document with a strict parser
//!
//! Both preserve the order of the partition list, so decoding what was
//! encoded yields an equal summary.
//!
//! [`PerPartitionMaxProbabilities`]: crate::probabilities::PerPartitionMaxProbabilities

pub mod document;
pub mod stream;

/// Field names of the document form. The stream form writes the same fields
/// in this order, without names.
pub mod fields {
    pub const JOB_ID: &str = "job_id";
    pub const RESULT_TYPE: &str = "result_type";
    pub const TIMESTAMP: &str = "timestamp";
    pub const BUCKET_SPAN: &str = "bucket_span";
    pub const PARTITION_PROBABILITIES: &str = "partition_normalized_probs";
    pub const PARTITION_VALUE: &str = "partition_value";
    pub const MAX_RECORD_SCORE: &str = "max_record_score";
}
