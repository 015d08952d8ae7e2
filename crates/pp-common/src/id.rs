//! Result identity types.
//!
//! A per-partition summary is keyed by the (job, bucket) pair it describes.
//! Two summaries for the same job, bucket timestamp and bucket span always
//! share one id, whatever partitions they contain.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Result type tag for per-partition maximum probability summaries.
pub const RESULT_TYPE: &str = "partition_normalized_probs";

/// Delimiter joining the components of a [`ResultId`].
pub const ID_DELIMITER: char = '_';

/// Check that a job id can own results.
pub fn validate_job_id(job_id: &str) -> Result<()> {
    if job_id.is_empty() {
        return Err(Error::InvalidArgument("job id must not be empty".to_string()));
    }
    Ok(())
}

/// Persistence key of a per-partition summary.
///
/// Format: `<job_id>_partition_normalized_probs_<epoch_ms>_<bucket_span>`
/// Example: `job-foo_partition_normalized_probs_100_300`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultId(pub String);

impl ResultId {
    /// Build the id for a job bucket.
    ///
    /// `timestamp_ms` is the bucket start in epoch milliseconds and
    /// `bucket_span` the bucket length in seconds.
    pub fn for_bucket(job_id: &str, timestamp_ms: i64, bucket_span: u64) -> Self {
        ResultId(format!(
            "{job}{d}{kind}{d}{ts}{d}{span}",
            job = job_id,
            kind = RESULT_TYPE,
            ts = timestamp_ms,
            span = bucket_span,
            d = ID_DELIMITER,
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ResultId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_id_format() {
        let id = ResultId::for_bucket("job-foo", 100, 300);
        assert_eq!(id.as_str(), "job-foo_partition_normalized_probs_100_300");
    }

    #[test]
    fn test_result_id_negative_timestamp() {
        let id = ResultId::for_bucket("j", -5000, 60);
        assert_eq!(id.to_string(), "j_partition_normalized_probs_-5000_60");
    }

    #[test]
    fn test_validate_job_id() {
        assert!(validate_job_id("job-foo").is_ok());
        assert!(matches!(
            validate_job_id(""),
            Err(Error::InvalidArgument(_))
        ));
    }
}
