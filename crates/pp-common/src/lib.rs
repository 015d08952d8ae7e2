//! Partition probability common types, IDs, and errors.
//!
//! This crate provides foundational types shared across pp-core modules:
//! - Result identity and the result type tag
//! - Common error types
//! - Output format specifications
//! - Settings loading and resolution

pub mod config;
pub mod error;
pub mod id;
pub mod output;

pub use config::{ConfigResolution, ConfigResolver, ConfigSource, LoadedSettings, Settings};
pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use id::{ResultId, RESULT_TYPE};
pub use output::OutputFormat;
