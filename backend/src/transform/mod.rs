//! Transformation module.
//!
//! - DSL: Rewrite rules, rule sets and the executor
//! - Pipeline: Per-file conversion from input bytes to copy-listing bytes

pub mod dsl;
pub mod pipeline;

pub use dsl::*;
pub use pipeline::*;
