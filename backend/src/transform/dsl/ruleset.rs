//! Rule set definition
//!
//! A rule set is the ordered list of rewrite rules applied to every file. The
//! built-in default produces Rakuten copy listings; a JSON file can replace it.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::rules::Rule;
use crate::error::{RuleError, RuleResult};

/// Rakuten item management number (doubles as the item URL slug)
pub const COL_ITEM_URL: &str = "商品管理番号（商品URL）";
/// Rakuten item number
pub const COL_ITEM_NUMBER: &str = "商品番号";
/// Item title
pub const COL_ITEM_NAME: &str = "商品名";
/// Smartphone description
pub const COL_SP_DESCRIPTION: &str = "スマートフォン用商品説明文";
/// PC sales description
pub const COL_PC_DESCRIPTION: &str = "PC用販売説明文";
/// Image path column template
pub const COL_IMAGE_PATH: &str = "商品画像パス{n}";
/// Image type column template
pub const COL_IMAGE_TYPE: &str = "商品画像タイプ{n}";
/// Image alt text column template
pub const COL_IMAGE_ALT: &str = "商品画像名（ALT）{n}";
/// SKU management number
pub const COL_SKU: &str = "SKU管理番号";
/// SKU number for system integration
pub const COL_SYSTEM_SKU: &str = "システム連携用SKU番号";

/// Suffix marking copied identifiers
pub const COPY_SUFFIX: &str = "_cp";
/// Title token prefix marking review-campaign keywords
pub const TITLE_MARKER: &str = "★REV";
/// Path segment identifying review-campaign images
pub const IMAGE_MARKER: &str = "rev_";
/// SKU delimiter the copy infix is inserted before
pub const SKU_DELIMITER: &str = "X";
/// Number of image slots in a Rakuten item export
pub const IMAGE_SLOTS: usize = 20;

/// An ordered list of rewrite rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Version of the rule set format
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Rules, applied in order
    pub rules: Vec<Rule>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl RuleSet {
    /// Create an empty rule set
    pub fn new() -> Self {
        Self {
            version: default_version(),
            description: String::new(),
            rules: Vec::new(),
        }
    }

    /// Rule set that turns a Rakuten item export into a copy listing
    pub fn rakuten_copy() -> Self {
        let rules = vec![
            Rule::AppendSuffix {
                columns: vec![COL_ITEM_URL.to_string(), COL_ITEM_NUMBER.to_string()],
                suffix: COPY_SUFFIX.to_string(),
            },
            Rule::RemoveMarkedTokens {
                columns: vec![COL_ITEM_NAME.to_string()],
                prefix: TITLE_MARKER.to_string(),
                separator: " ".to_string(),
            },
            Rule::StripMarkedUrls {
                columns: vec![
                    COL_SP_DESCRIPTION.to_string(),
                    COL_PC_DESCRIPTION.to_string(),
                ],
                marker: IMAGE_MARKER.to_string(),
            },
            Rule::ClearImageSlots {
                path_column: COL_IMAGE_PATH.to_string(),
                type_column: Some(COL_IMAGE_TYPE.to_string()),
                alt_column: Some(COL_IMAGE_ALT.to_string()),
                first: 1,
                last: IMAGE_SLOTS,
                marker: IMAGE_MARKER.to_string(),
            },
            Rule::InsertBeforeDelimiter {
                columns: vec![COL_SKU.to_string(), COL_SYSTEM_SKU.to_string()],
                delimiter: SKU_DELIMITER.to_string(),
                infix: COPY_SUFFIX.to_string(),
            },
        ];

        Self {
            version: default_version(),
            description: "Rakuten item CSV to copy listing".to_string(),
            rules,
        }
    }

    /// Add a rule to the end of the list
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Parse a rule set from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load and validate a rule set from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> RuleResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let rules = Self::from_json(&content)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check every rule, collecting all problems
    pub fn validate(&self) -> RuleResult<()> {
        let errors: Vec<String> = self
            .rules
            .iter()
            .enumerate()
            .flat_map(|(i, rule)| {
                rule.validate()
                    .into_iter()
                    .map(move |e| format!("rule {}: {}", i + 1, e))
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RuleError::InvalidRuleSet { errors })
        }
    }

    /// All column names any rule may touch, deduplicated
    pub fn target_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .rules
            .iter()
            .flat_map(|r| r.target_columns())
            .collect();
        columns.sort();
        columns.dedup();
        columns
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::rakuten_copy()
    }
}
