//! Rule set executor
//!
//! Applies every rule of a rule set, in order, to a dataset. Rules only rewrite
//! or clear cells, so the row count and the header list never change.

use super::rules::RuleReport;
use super::ruleset::RuleSet;
use crate::models::Dataset;

/// Result of executing a rule set
#[derive(Debug, Clone)]
pub struct TransformResult {
    /// The rewritten dataset
    pub dataset: Dataset,
    /// One report per rule, in rule order
    pub reports: Vec<RuleReport>,
}

impl TransformResult {
    /// Total cells rewritten across all rules
    pub fn changed(&self) -> usize {
        self.reports.iter().map(|r| r.changed).sum()
    }

    /// Get summary statistics
    pub fn summary(&self) -> String {
        format!(
            "Transformed: {} rows, {} cells changed by {} rules",
            self.dataset.row_count(),
            self.changed(),
            self.reports.len()
        )
    }
}

/// Execute a rule set on a dataset
pub fn execute(mut dataset: Dataset, rules: &RuleSet) -> TransformResult {
    let reports = rules
        .rules
        .iter()
        .map(|rule| rule.apply(&mut dataset))
        .collect();

    TransformResult { dataset, reports }
}

/// Apply the default copy-listing rule set.
///
/// Total over any dataset: absent columns, blank cells and non-matching values
/// are left as they are.
pub fn transform(dataset: Dataset) -> Dataset {
    execute(dataset, &RuleSet::default()).dataset
}
