//! Rule DSL for copy-listing rewrites
//!
//! This module provides:
//! - `rules`: Available rewrite rules and their cell-level behavior
//! - `ruleset`: Ordered rule lists, the built-in Rakuten rule set, JSON loading
//! - `executor`: Apply a rule set to a dataset
//!
//! ## Usage Flow
//!
//! ```text
//! bytes → parser::parse_bytes → Dataset → executor::execute(RuleSet) → Dataset → parser::serialize
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use copylist::{parse_bytes, execute, RuleSet};
//!
//! let parsed = parse_bytes(&bytes)?;
//! let result = execute(parsed.dataset, &RuleSet::default());
//! for report in &result.reports {
//!     println!("{}: {} cells", report.rule, report.changed);
//! }
//! ```

pub mod executor;
pub mod rules;
pub mod ruleset;

// Re-exports for convenience
pub use executor::{execute, transform, TransformResult};
pub use rules::{rules_description, Rule, RuleReport};
pub use ruleset::RuleSet;
