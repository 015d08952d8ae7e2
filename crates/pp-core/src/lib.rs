//! Per-partition maximum record score summaries.
//!
//! This library provides:
//! - [`aggregate`](mod@aggregate): reduce anomaly records to one maximum score per partition
//! - [`probabilities`]: the immutable summary entity and its result id
//! - [`codec`]: binary stream and JSON document encodings
//! - [`logging`]: structured logging setup for the binary
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use pp_core::aggregate::aggregate;
//!
//! let records = [("A", 20.0), ("A", 40.0), ("B", 90.0)];
//! let ts = Utc.timestamp_millis_opt(100).unwrap();
//! let summary = aggregate(&records, "job-foo", ts, 300).unwrap();
//!
//! assert_eq!(summary.lookup("A"), Some(40.0));
//! assert_eq!(summary.id().as_str(), "job-foo_partition_normalized_probs_100_300");
//! ```

pub mod aggregate;
pub mod codec;
pub mod exit_codes;
pub mod logging;
pub mod probabilities;
pub mod record;

pub use aggregate::{aggregate, lookup, PartitionMaxAggregator};
pub use probabilities::{PartitionProbability, PerPartitionMaxProbabilities};
pub use record::{AnomalyRecord, ScoredRecord};
