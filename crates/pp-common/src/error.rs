//! Error types for partition probability summaries.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Missing Required Field
//!   Reason: missing required field [job_id]
//!   Fix: The document must carry job_id, timestamp and bucket_span.
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 20,
//!   "category": "document",
//!   "message": "missing required field [job_id]",
//!   "recoverable": false,
//!   "context": { "field": "job_id" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for partition probability operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Settings file errors.
    Config,
    /// Structured document parsing errors.
    Document,
    /// Binary stream decoding errors.
    Stream,
    /// Aggregation input and argument errors.
    Aggregation,
    /// File I/O and JSON syntax errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Document => write!(f, "document"),
            ErrorCategory::Stream => write!(f, "stream"),
            ErrorCategory::Aggregation => write!(f, "aggregation"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid settings: {0}")]
    InvalidConfig(String),

    // Document errors (20-29)
    #[error("missing required field [{field}]")]
    MissingField { field: String },

    #[error("type mismatch for [{field}]: expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    #[error("invalid value for [{field}]: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("unknown field [{field}]")]
    UnknownField { field: String },

    // Stream errors (30-39)
    #[error("unexpected end of stream while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("invalid UTF-8 in stream string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("malformed variable-length integer")]
    MalformedVarint,

    #[error("{remaining} trailing bytes after a complete entity")]
    TrailingBytes { remaining: usize },

    // Aggregation errors (40-49)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cannot derive summary context from an empty record batch")]
    EmptyBatch,

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Document errors
    /// - 30-39: Stream errors
    /// - 40-49: Aggregation errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig(_) => 11,
            Error::MissingField { .. } => 20,
            Error::TypeMismatch { .. } => 21,
            Error::InvalidValue { .. } => 22,
            Error::UnknownField { .. } => 23,
            Error::UnexpectedEof { .. } => 30,
            Error::InvalidUtf8(_) => 31,
            Error::MalformedVarint => 32,
            Error::TrailingBytes { .. } => 33,
            Error::InvalidArgument(_) => 40,
            Error::EmptyBatch => 41,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) => ErrorCategory::Config,

            Error::MissingField { .. }
            | Error::TypeMismatch { .. }
            | Error::InvalidValue { .. }
            | Error::UnknownField { .. } => ErrorCategory::Document,

            Error::UnexpectedEof { .. }
            | Error::InvalidUtf8(_)
            | Error::MalformedVarint
            | Error::TrailingBytes { .. } => ErrorCategory::Stream,

            Error::InvalidArgument(_) | Error::EmptyBatch => ErrorCategory::Aggregation,

            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    ///
    /// Malformed payloads never become valid by retrying; configuration and
    /// I/O problems can be fixed by the operator.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) => true,
            Error::Io(_) => true,
            Error::InvalidArgument(_) | Error::EmptyBatch => true,
            _ => false,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Check the settings path given with --config or PARTITION_PROBS_CONFIG."
            }
            Error::InvalidConfig(_) => {
                "Fix the reported field in settings.json, or remove the file to use defaults."
            }
            Error::MissingField { .. } => {
                "The document must carry job_id, timestamp and bucket_span."
            }
            Error::TypeMismatch { .. } => {
                "Check the JSON type of the reported field against the document layout."
            }
            Error::InvalidValue { .. } => "The reported field has an unsupported value.",
            Error::UnknownField { .. } => {
                "Remove the unexpected field; documents are parsed strictly."
            }
            Error::UnexpectedEof { .. } | Error::TrailingBytes { .. } => {
                "The binary payload is truncated or padded. Re-encode it from the source."
            }
            Error::InvalidUtf8(_) | Error::MalformedVarint => {
                "The binary payload is corrupted. Re-encode it from the source."
            }
            Error::InvalidArgument(_) => "Check the command arguments and retry.",
            Error::EmptyBatch => {
                "Pass job id, timestamp and bucket span explicitly when the batch may be empty."
            }
            Error::Io(_) => "Check that the file exists and is readable.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfig(_) => "Invalid Settings",
            Error::MissingField { .. } => "Missing Required Field",
            Error::TypeMismatch { .. } => "Type Mismatch",
            Error::InvalidValue { .. } => "Invalid Field Value",
            Error::UnknownField { .. } => "Unknown Field",
            Error::UnexpectedEof { .. } => "Truncated Stream",
            Error::InvalidUtf8(_) => "Invalid UTF-8",
            Error::MalformedVarint => "Malformed Integer",
            Error::TrailingBytes { .. } => "Trailing Bytes",
            Error::InvalidArgument(_) => "Invalid Argument",
            Error::EmptyBatch => "Empty Record Batch",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., field name).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::MissingField { field }
            | Error::UnknownField { field }
            | Error::InvalidValue { field, .. } => {
                context.insert("field".to_string(), serde_json::json!(field));
            }
            Error::TypeMismatch { field, expected } => {
                context.insert("field".to_string(), serde_json::json!(field));
                context.insert("expected".to_string(), serde_json::json!(expected));
            }
            Error::TrailingBytes { remaining } => {
                context.insert("remaining".to_string(), serde_json::json!(remaining));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
