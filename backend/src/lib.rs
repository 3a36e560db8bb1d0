//! # Copylist - Rakuten item CSV to copy listing
//!
//! Copylist turns a Rakuten item export into a "copy" listing that can be
//! registered as separate items: identifiers get a `_cp` suffix, review-campaign
//! keywords and images are removed, and SKUs get the copy marker before their
//! variant part.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV bytes  │────▶│   Parser    │────▶│  Rule set   │────▶│  CSV bytes  │
//! │ (SJIS/UTF8) │     │  (decode)   │     │ (executor)  │     │ (Shift_JIS) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use copylist::{convert_bytes, ConvertOptions};
//!
//! let input = std::fs::read("item.csv")?;
//! let result = convert_bytes(&input, "item.csv", &ConvertOptions::default())?;
//! std::fs::write(&result.output_name, &result.bytes)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - The in-memory table
//! - [`parser`] - Shift_JIS/UTF-8 decoding, CSV reading and writing
//! - [`transform`] - Rewrite rules, executor, and pipeline
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Configuration
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, CsvError, PipelineError, RuleError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::Dataset;

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_encoding,
    encode_content,
    parse_bytes,
    parse_csv,
    parse_file,
    serialize,
    write_csv,
    LineEnding,
    ParseResult,
    SourceEncoding,
};

// =============================================================================
// Re-exports - Rules
// =============================================================================

pub use transform::dsl::{
    execute,
    rules_description,
    transform,
    Rule,
    RuleReport,
    RuleSet,
    TransformResult,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    convert_bytes,
    convert_file,
    convert_files,
    output_file_name,
    ConvertOptions,
    ConvertResult,
    CsvInfo,
};

// =============================================================================
// Re-exports - Config & API
// =============================================================================

pub use config::Config;

pub use api::types::{
    error_response,
    CsvMetadata,
    FileReport,
    InspectResponse,
};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
