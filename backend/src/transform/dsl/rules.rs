//! Rewrite rules for copy listings
//!
//! Each rule names the columns it touches and rewrites cells in place. A rule
//! whose columns are absent from the dataset does nothing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{as_text, is_blank, Dataset};

/// Placeholder replaced by the slot number in image column templates
pub const SLOT_PLACEHOLDER: &str = "{n}";

/// All available rewrite rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Append a literal suffix to non-blank values
    AppendSuffix {
        columns: Vec<String>,
        suffix: String,
    },

    /// Drop every separator-delimited token starting with a prefix
    RemoveMarkedTokens {
        columns: Vec<String>,
        prefix: String,
        #[serde(default = "default_token_separator")]
        separator: String,
    },

    /// Delete http(s) URLs that contain a marker segment
    StripMarkedUrls {
        columns: Vec<String>,
        marker: String,
    },

    /// Empty a numbered image slot when its path contains a marker segment
    ClearImageSlots {
        /// Path column template, e.g. "商品画像パス{n}"
        path_column: String,
        #[serde(default)]
        type_column: Option<String>,
        #[serde(default)]
        alt_column: Option<String>,
        #[serde(default = "default_first_slot")]
        first: usize,
        #[serde(default = "default_last_slot")]
        last: usize,
        marker: String,
    },

    /// Insert an infix before the first occurrence of a delimiter
    InsertBeforeDelimiter {
        columns: Vec<String>,
        delimiter: String,
        infix: String,
    },
}

fn default_token_separator() -> String {
    " ".to_string()
}

fn default_first_slot() -> usize {
    1
}

fn default_last_slot() -> usize {
    20
}

/// What a rule did to one dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleReport {
    /// Rule type name
    pub rule: String,
    /// Target columns present in the dataset
    pub columns: Vec<String>,
    /// Target columns absent from the dataset (skipped)
    pub missing: Vec<String>,
    /// Cells rewritten (for image slots: rows cleared)
    pub changed: usize,
}

impl RuleReport {
    fn new(rule: &str) -> Self {
        Self {
            rule: rule.to_string(),
            ..Self::default()
        }
    }
}

impl Rule {
    /// Snake-case type name, as used in JSON
    pub fn name(&self) -> &'static str {
        match self {
            Rule::AppendSuffix { .. } => "append_suffix",
            Rule::RemoveMarkedTokens { .. } => "remove_marked_tokens",
            Rule::StripMarkedUrls { .. } => "strip_marked_urls",
            Rule::ClearImageSlots { .. } => "clear_image_slots",
            Rule::InsertBeforeDelimiter { .. } => "insert_before_delimiter",
        }
    }

    /// Every column name this rule may read or write
    pub fn target_columns(&self) -> Vec<String> {
        match self {
            Rule::AppendSuffix { columns, .. }
            | Rule::RemoveMarkedTokens { columns, .. }
            | Rule::StripMarkedUrls { columns, .. }
            | Rule::InsertBeforeDelimiter { columns, .. } => columns.clone(),
            Rule::ClearImageSlots {
                path_column,
                type_column,
                alt_column,
                first,
                last,
                ..
            } => (*first..=*last)
                .flat_map(|n| {
                    [Some(path_column), type_column.as_ref(), alt_column.as_ref()]
                        .into_iter()
                        .flatten()
                        .map(move |template| slot_column(template, n))
                })
                .collect(),
        }
    }

    /// Apply this rule to a dataset in place
    pub fn apply(&self, dataset: &mut Dataset) -> RuleReport {
        match self {
            Rule::AppendSuffix { columns, suffix } => {
                apply_per_column(self.name(), dataset, columns, |v| append_suffix(v, suffix))
            }
            Rule::RemoveMarkedTokens {
                columns,
                prefix,
                separator,
            } => apply_per_column(self.name(), dataset, columns, |v| {
                remove_marked_tokens(v, prefix, separator)
            }),
            Rule::StripMarkedUrls { columns, marker } => match url_pattern(marker) {
                Ok(re) => {
                    apply_per_column(self.name(), dataset, columns, |v| strip_marked_urls(v, &re))
                }
                // Rejected by `validate`; leave cells untouched if it slips through
                Err(_) => RuleReport::new(self.name()),
            },
            Rule::ClearImageSlots {
                path_column,
                type_column,
                alt_column,
                first,
                last,
                marker,
            } => {
                let mut report = RuleReport::new(self.name());
                for n in *first..=*last {
                    let path = slot_column(path_column, n);
                    let Some(path_idx) = dataset.column_index(&path) else {
                        report.missing.push(path);
                        continue;
                    };
                    report.columns.push(path);

                    let companions: Vec<usize> = [type_column, alt_column]
                        .into_iter()
                        .flatten()
                        .filter_map(|template| dataset.column_index(&slot_column(template, n)))
                        .collect();

                    for row in &mut dataset.rows {
                        // Short rows have no cell for this slot
                        if !row.get(path_idx).is_some_and(|v| path_matches(v, marker)) {
                            continue;
                        }
                        for idx in std::iter::once(path_idx).chain(companions.iter().copied()) {
                            if let Some(cell) = row.get_mut(idx) {
                                *cell = Value::String(String::new());
                            }
                        }
                        report.changed += 1;
                    }
                }
                report
            }
            Rule::InsertBeforeDelimiter {
                columns,
                delimiter,
                infix,
            } => apply_per_column(self.name(), dataset, columns, |v| {
                insert_before_delimiter(v, delimiter, infix)
            }),
        }
    }

    /// Check the rule's parameters, returning one message per problem
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut require = |ok: bool, message: &str| {
            if !ok {
                errors.push(format!("{}: {}", self.name(), message));
            }
        };

        match self {
            Rule::AppendSuffix { columns, suffix } => {
                require(!columns.is_empty(), "no columns");
                require(!suffix.is_empty(), "suffix is empty");
            }
            Rule::RemoveMarkedTokens {
                columns,
                prefix,
                separator,
            } => {
                require(!columns.is_empty(), "no columns");
                require(!prefix.is_empty(), "prefix is empty");
                require(!separator.is_empty(), "separator is empty");
            }
            Rule::StripMarkedUrls { columns, marker } => {
                require(!columns.is_empty(), "no columns");
                require(!marker.is_empty(), "marker is empty");
                require(url_pattern(marker).is_ok(), "marker does not form a valid pattern");
            }
            Rule::ClearImageSlots {
                path_column,
                first,
                last,
                marker,
                ..
            } => {
                require(!path_column.is_empty(), "path column is empty");
                require(!marker.is_empty(), "marker is empty");
                require(*first >= 1, "first slot must be at least 1");
                require(first <= last, "first slot is after last slot");
            }
            Rule::InsertBeforeDelimiter {
                columns,
                delimiter,
                infix,
            } => {
                require(!columns.is_empty(), "no columns");
                require(!delimiter.is_empty(), "delimiter is empty");
                require(!infix.is_empty(), "infix is empty");
            }
        }

        errors
    }
}

fn apply_per_column<F>(name: &str, dataset: &mut Dataset, columns: &[String], f: F) -> RuleReport
where
    F: Fn(&Value) -> Value,
{
    let mut report = RuleReport::new(name);
    for column in columns {
        match dataset.column_index(column) {
            Some(idx) => {
                report.changed += dataset.map_column(idx, &f);
                report.columns.push(column.clone());
            }
            None => report.missing.push(column.clone()),
        }
    }
    report
}

/// Expand a slot column template for slot `n`.
///
/// Templates without the placeholder get the number appended.
pub fn slot_column(template: &str, n: usize) -> String {
    if template.contains(SLOT_PLACEHOLDER) {
        template.replace(SLOT_PLACEHOLDER, &n.to_string())
    } else {
        format!("{}{}", template, n)
    }
}

/// Pattern for http(s) URLs containing `marker`, bounded by whitespace or quotes.
pub fn url_pattern(marker: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r#"https?://[^"'\s]*{}[^"'\s]*"#,
        regex::escape(marker)
    ))
}

// =============================================================================
// Cell rewrites
// =============================================================================

/// `value + suffix`; blank values unchanged.
pub fn append_suffix(value: &Value, suffix: &str) -> Value {
    if is_blank(value) {
        return value.clone();
    }
    as_text(value)
        .map(|s| Value::String(format!("{}{}", s, suffix)))
        .unwrap_or_else(|| value.clone())
}

/// Drop tokens starting with `prefix`, rejoining survivors with `separator`.
///
/// Empty tokens from repeated separators survive, so spacing between kept
/// tokens is preserved.
pub fn remove_marked_tokens(value: &Value, prefix: &str, separator: &str) -> Value {
    if is_blank(value) {
        return value.clone();
    }
    as_text(value)
        .map(|s| {
            let kept: Vec<&str> = s
                .split(separator)
                .filter(|token| !token.starts_with(prefix))
                .collect();
            Value::String(kept.join(separator))
        })
        .unwrap_or_else(|| value.clone())
}

/// Delete every match of `pattern`; `Null` and unmatched values unchanged.
pub fn strip_marked_urls(value: &Value, pattern: &Regex) -> Value {
    match as_text(value) {
        Some(s) if pattern.is_match(&s) => Value::String(pattern.replace_all(&s, "").into_owned()),
        _ => value.clone(),
    }
}

/// Whether an image path cell contains `marker`. `Null` never matches.
pub fn path_matches(value: &Value, marker: &str) -> bool {
    as_text(value).is_some_and(|s| s.contains(marker))
}

/// Insert `infix` before the first `delimiter`; blank or delimiter-free values unchanged.
pub fn insert_before_delimiter(value: &Value, delimiter: &str, infix: &str) -> Value {
    if is_blank(value) {
        return value.clone();
    }
    as_text(value)
        .and_then(|s| {
            s.find(delimiter)
                .map(|i| Value::String(format!("{}{}{}", &s[..i], infix, &s[i..])))
        })
        .unwrap_or_else(|| value.clone())
}

/// Get a description of all available rules
pub fn rules_description() -> String {
    r#"Available rewrite rules:

| Rule | Description | Parameters |
|------|-------------|------------|
| append_suffix | Append a suffix to non-blank values | columns, suffix |
| remove_marked_tokens | Drop tokens starting with a prefix | columns, prefix, separator (default " ") |
| strip_marked_urls | Delete http(s) URLs containing a marker | columns, marker |
| clear_image_slots | Empty path/type/alt of slots whose path contains a marker | path_column, type_column, alt_column ("{n}" = slot number), first (default 1), last (default 20), marker |
| insert_before_delimiter | Insert an infix before the first delimiter | columns, delimiter, infix |

Blank cells are left alone by every rule. Columns missing from the file are skipped.

Example rules in JSON:
[
  {"type": "append_suffix", "columns": ["商品番号"], "suffix": "_cp"},
  {"type": "remove_marked_tokens", "columns": ["商品名"], "prefix": "★REV"},
  {"type": "clear_image_slots", "path_column": "商品画像パス{n}", "type_column": "商品画像タイプ{n}", "marker": "rev_"}
]"#
    .to_string()
}
