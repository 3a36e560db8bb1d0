//! Error types for the copylist conversion pipeline.
//!
//! - [`CsvError`] - Decoding and CSV parsing errors
//! - [`RuleError`] - Rule set loading and validation errors
//! - [`ConfigError`] - Environment configuration errors
//! - [`PipelineError`] - Top-level per-file conversion errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Conversion is automatic via `From` implementations, so `?` works across
//! layers. Row content never produces an error: the transformer absorbs
//! missing columns, blank cells and non-matching values.

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while decoding or parsing an input file.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Bytes are valid in none of the supported encodings.
    #[error("Input is neither {tried} (detector guess: {guess})")]
    DecodeError { tried: String, guess: String },

    /// Invalid CSV structure.
    #[error("Invalid CSV format: {0}")]
    ParseError(String),

    /// A data row has more fields than the header.
    #[error("Line {line}: expected {expected} fields, saw {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(e) => CsvError::IoError(e),
            _ => CsvError::ParseError(message),
        }
    }
}

// =============================================================================
// Rule Errors
// =============================================================================

/// Errors from loading or validating a rule set.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Rule set failed validation.
    #[error("Invalid rule set: {errors:?}")]
    InvalidRuleSet { errors: Vec<String> },

    /// Rule set file could not be read.
    #[error("Rule set IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Rule set JSON is malformed.
    #[error("Rule set JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors from environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds an unusable value.
    #[error("Invalid value for {var}: '{value}' ({reason})")]
    InvalidValue {
        var: String,
        value: String,
        reason: String,
    },

    /// The configured rule set could not be loaded.
    #[error("Rule set error: {0}")]
    Rules(#[from] RuleError),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level conversion errors, reported per file.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input could not be decoded or parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// The output path resolves to the input file.
    #[error("Output would overwrite the input file: {}", .0.display())]
    OverwritesInput(std::path::PathBuf),

    /// Output could not be written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload exceeds the configured body limit.
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    /// Failed to bind or serve.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for rule set operations.
pub type RuleResult<T> = Result<T, RuleError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        let rule_err = RuleError::InvalidRuleSet {
            errors: vec!["rule 1: suffix is empty".into()],
        };
        let config_err: ConfigError = rule_err.into();
        assert!(config_err.to_string().contains("suffix is empty"));
    }

    #[test]
    fn test_decode_error_format() {
        let err = CsvError::DecodeError {
            tried: "Shift_JIS nor UTF-8".into(),
            guess: "EUC-JP".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Shift_JIS nor UTF-8"));
        assert!(msg.contains("EUC-JP"));
    }

    #[test]
    fn test_too_many_fields_format() {
        let err = CsvError::TooManyFields {
            line: 3,
            expected: 2,
            found: 4,
        };
        assert_eq!(err.to_string(), "Line 3: expected 2 fields, saw 4");
    }
}
