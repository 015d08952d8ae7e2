//! Exit codes for the pp-core CLI.
//!
//! Exit code ranges:
//! - 0-9: Operational outcomes (parse outcome from code, not output)
//! - 10-19: User/input errors (recoverable by user action)
//! - 20-29: Environment errors

use pp_common::{Error, ErrorCategory};

/// Exit codes for pp-core operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    /// Lookup found no entry for the requested partition
    NotFound = 1,

    /// Invalid arguments or record input
    ArgsError = 10,

    /// Settings could not be loaded or are invalid
    ConfigError = 11,

    /// A serialized summary could not be decoded
    DecodeError = 12,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates any error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Map a library error to the exit code reported for it.
    pub fn from_error(err: &Error) -> Self {
        match err.category() {
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Document | ErrorCategory::Stream => ExitCode::DecodeError,
            ErrorCategory::Aggregation => ExitCode::ArgsError,
            ErrorCategory::Io => match err {
                // Malformed JSON input is a decode problem, not an I/O one.
                Error::Json(_) => ExitCode::DecodeError,
                _ => ExitCode::IoError,
            },
        }
    }

    /// Get the code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::NotFound => "OK_NOT_FOUND",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::DecodeError => "ERR_DECODE",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
