//! Structured JSON document codec.
//!
//! ```json
//! {
//!   "job_id": "job-foo",
//!   "result_type": "partition_normalized_probs",
//!   "timestamp": 100,
//!   "bucket_span": 300,
//!   "partition_normalized_probs": [
//!     { "partition_value": "A", "max_record_score": 40.0 }
//!   ]
//! }
//! ```
//!
//! Parsing is strict: required fields must be present with the right JSON
//! type and unknown fields are rejected. `timestamp` is epoch milliseconds,
//! or an RFC 3339 string on input.

use chrono::{DateTime, Utc};
use pp_common::{Error, Result, RESULT_TYPE};
use serde_json::{Map, Value};

use super::fields;
use crate::probabilities::{timestamp_from_millis, PartitionProbability, PerPartitionMaxProbabilities};

const TOP_LEVEL_FIELDS: [&str; 5] = [
    fields::JOB_ID,
    fields::RESULT_TYPE,
    fields::TIMESTAMP,
    fields::BUCKET_SPAN,
    fields::PARTITION_PROBABILITIES,
];

const ENTRY_FIELDS: [&str; 2] = [fields::PARTITION_VALUE, fields::MAX_RECORD_SCORE];

/// Build the document for a summary.
pub fn to_value(summary: &PerPartitionMaxProbabilities) -> Value {
    let probabilities: Vec<Value> = summary
        .partition_probabilities()
        .iter()
        .map(|p| {
            let mut entry = Map::new();
            entry.insert(fields::PARTITION_VALUE.to_string(), Value::from(p.partition_value()));
            entry.insert(fields::MAX_RECORD_SCORE.to_string(), Value::from(p.max_record_score()));
            Value::Object(entry)
        })
        .collect();

    let mut object = Map::new();
    object.insert(fields::JOB_ID.to_string(), Value::from(summary.job_id()));
    object.insert(fields::RESULT_TYPE.to_string(), Value::from(RESULT_TYPE));
    object.insert(
        fields::TIMESTAMP.to_string(),
        Value::from(summary.timestamp().timestamp_millis()),
    );
    object.insert(fields::BUCKET_SPAN.to_string(), Value::from(summary.bucket_span()));
    object.insert(
        fields::PARTITION_PROBABILITIES.to_string(),
        Value::Array(probabilities),
    );
    Value::Object(object)
}

/// Compact JSON text of the document.
pub fn to_string(summary: &PerPartitionMaxProbabilities) -> String {
    to_value(summary).to_string()
}

/// Indented JSON text of the document.
pub fn to_string_pretty(summary: &PerPartitionMaxProbabilities) -> Result<String> {
    Ok(serde_json::to_string_pretty(&to_value(summary))?)
}

/// Parse JSON text into a summary.
pub fn from_str(text: &str) -> Result<PerPartitionMaxProbabilities> {
    let value: Value = serde_json::from_str(text)?;
    from_value(&value)
}

/// Parse JSON bytes into a summary. Bytes that are not UTF-8 fail as
/// [`Error::Json`].
pub fn from_slice(bytes: &[u8]) -> Result<PerPartitionMaxProbabilities> {
    let value: Value = serde_json::from_slice(bytes)?;
    from_value(&value)
}

/// Parse a document into a summary.
pub fn from_value(value: &Value) -> Result<PerPartitionMaxProbabilities> {
    let object = value.as_object().ok_or_else(|| Error::TypeMismatch {
        field: "<document>".to_string(),
        expected: "object",
    })?;
    reject_unknown(object, &TOP_LEVEL_FIELDS, "")?;

    let job_id = required(object, fields::JOB_ID, "")?
        .as_str()
        .ok_or_else(|| mismatch(fields::JOB_ID, "", "string"))?;

    if let Some(kind) = object.get(fields::RESULT_TYPE) {
        let kind = kind
            .as_str()
            .ok_or_else(|| mismatch(fields::RESULT_TYPE, "", "string"))?;
        if kind != RESULT_TYPE {
            return Err(Error::InvalidValue {
                field: fields::RESULT_TYPE.to_string(),
                reason: format!("expected [{}], got [{}]", RESULT_TYPE, kind),
            });
        }
    }

    let timestamp = parse_timestamp(required(object, fields::TIMESTAMP, "")?)?;

    let bucket_span = required(object, fields::BUCKET_SPAN, "")?
        .as_u64()
        .ok_or_else(|| mismatch(fields::BUCKET_SPAN, "", "non-negative integer"))?;

    let probabilities = match object.get(fields::PARTITION_PROBABILITIES) {
        None => Vec::new(),
        Some(list) => list
            .as_array()
            .ok_or_else(|| mismatch(fields::PARTITION_PROBABILITIES, "", "array"))?
            .iter()
            .enumerate()
            .map(|(i, entry)| parse_entry(i, entry))
            .collect::<Result<Vec<_>>>()?,
    };

    PerPartitionMaxProbabilities::new(job_id, timestamp, bucket_span, probabilities)
}

fn parse_entry(index: usize, entry: &Value) -> Result<PartitionProbability> {
    let prefix = format!("{}[{}].", fields::PARTITION_PROBABILITIES, index);
    let object = entry.as_object().ok_or_else(|| Error::TypeMismatch {
        field: prefix.trim_end_matches('.').to_string(),
        expected: "object",
    })?;
    reject_unknown(object, &ENTRY_FIELDS, &prefix)?;

    let value = required(object, fields::PARTITION_VALUE, &prefix)?
        .as_str()
        .ok_or_else(|| mismatch(fields::PARTITION_VALUE, &prefix, "string"))?;
    let score = required(object, fields::MAX_RECORD_SCORE, &prefix)?
        .as_f64()
        .ok_or_else(|| mismatch(fields::MAX_RECORD_SCORE, &prefix, "number"))?;

    Ok(PartitionProbability::new(value, score))
}

fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .ok_or_else(|| mismatch(fields::TIMESTAMP, "", "integer epoch milliseconds"))?;
            timestamp_from_millis(fields::TIMESTAMP, millis)
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| Error::InvalidValue {
                field: fields::TIMESTAMP.to_string(),
                reason: format!("cannot parse [{}] as RFC 3339: {}", s, e),
            }),
        _ => Err(mismatch(
            fields::TIMESTAMP,
            "",
            "integer epoch milliseconds or RFC 3339 string",
        )),
    }
}

fn required<'a>(object: &'a Map<String, Value>, field: &str, prefix: &str) -> Result<&'a Value> {
    match object.get(field) {
        Some(Value::Null) | None => Err(Error::MissingField {
            field: format!("{}{}", prefix, field),
        }),
        Some(value) => Ok(value),
    }
}

fn reject_unknown(object: &Map<String, Value>, known: &[&str], prefix: &str) -> Result<()> {
    match object.keys().find(|k| !known.contains(&k.as_str())) {
        Some(unknown) => Err(Error::UnknownField {
            field: format!("{}{}", prefix, unknown),
        }),
        None => Ok(()),
    }
}

fn mismatch(field: &str, prefix: &str, expected: &'static str) -> Error {
    Error::TypeMismatch {
        field: format!("{}{}", prefix, field),
        expected,
    }
}
