//! Output format specifications.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Supported output formats for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Structured JSON document (default for machine consumption)
    #[default]
    Json,

    /// Binary stream encoding, written raw to stdout
    Binary,

    /// One-line-per-partition human summary
    Summary,
}

impl OutputFormat {
    /// Whether the payload is human-oriented text.
    pub fn is_human(&self) -> bool {
        matches!(self, OutputFormat::Summary)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Binary => write!(f, "binary"),
            OutputFormat::Summary => write!(f, "summary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Json.to_string(), "json");
        assert_eq!(OutputFormat::Binary.to_string(), "binary");
        assert_eq!(OutputFormat::Summary.to_string(), "summary");
    }

    #[test]
    fn test_output_format_serde() {
        let fmt: OutputFormat = serde_json::from_str(r#""binary""#).unwrap();
        assert_eq!(fmt, OutputFormat::Binary);
        assert_eq!(serde_json::to_string(&OutputFormat::Summary).unwrap(), r#""summary""#);
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Json);
        assert!(!OutputFormat::Json.is_human());
        assert!(OutputFormat::Summary.is_human());
    }
}
