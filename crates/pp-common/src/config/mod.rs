//! Settings loading and validation.
//!
//! This module provides:
//! - The typed `settings.json` structure
//! - Deterministic resolution (CLI > env > XDG > defaults)
//! - Provenance of the loaded settings for logging

pub mod resolve;

pub use resolve::ConfigResolver;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::output::OutputFormat;

/// Bucket span used when neither the CLI nor settings provide one.
pub const DEFAULT_BUCKET_SPAN_SECS: u64 = 300;

/// User-tunable settings for the `pp-core` binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Bucket span in seconds applied when `--bucket-span` is omitted.
    pub default_bucket_span: u64,

    /// Output format applied when `--format` is omitted.
    pub output_format: OutputFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            default_bucket_span: DEFAULT_BUCKET_SPAN_SECS,
            output_format: OutputFormat::Json,
        }
    }
}

impl Settings {
    /// Validate settings semantically.
    pub fn validate(&self) -> Result<()> {
        if self.default_bucket_span == 0 {
            return Err(Error::InvalidConfig(
                "default_bucket_span must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings together with where they came from.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub source: ConfigSource,
}

/// Configuration source for a file.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Path to the settings file, or None if using defaults
    pub path: Option<String>,
    /// SHA-256 hash of file contents, or None if defaults
    pub hash: Option<String>,
    /// How this source was resolved
    pub resolution: ConfigResolution,
}

/// How a settings file was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigResolution {
    /// From explicit CLI flag
    CliFlag,
    /// From environment variable
    EnvVar,
    /// From XDG config directory
    XdgConfig,
    /// Using built-in defaults
    Default,
}

impl std::fmt::Display for ConfigResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigResolution::CliFlag => write!(f, "cli"),
            ConfigResolution::EnvVar => write!(f, "env"),
            ConfigResolution::XdgConfig => write!(f, "xdg"),
            ConfigResolution::Default => write!(f, "default"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.default_bucket_span, 300);
        assert_eq!(settings.output_format, OutputFormat::Json);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_partial_file() {
        let settings: Settings = serde_json::from_str(r#"{"output_format":"summary"}"#).unwrap();
        assert_eq!(settings.default_bucket_span, DEFAULT_BUCKET_SPAN_SECS);
        assert_eq!(settings.output_format, OutputFormat::Summary);
    }

    #[test]
    fn test_settings_rejects_unknown_fields() {
        let parsed = serde_json::from_str::<Settings>(r#"{"bucket":60}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_settings_zero_bucket_span_invalid() {
        let settings = Settings {
            default_bucket_span: 0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_resolution_display() {
        assert_eq!(ConfigResolution::CliFlag.to_string(), "cli");
        assert_eq!(ConfigResolution::Default.to_string(), "default");
    }
}
