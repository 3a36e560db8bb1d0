//! Runtime configuration from the environment.
//!
//! A `.env` file in the working directory is loaded first when present.
//!
//! | Variable                 | Default | Meaning                           |
//! |--------------------------|---------|-----------------------------------|
//! | `COPYLIST_PORT`          | `3000`  | HTTP server port                  |
//! | `COPYLIST_RULES`         | unset   | Rule set JSON replacing the default |
//! | `COPYLIST_OUTPUT_SUFFIX` | `_cp`   | Suffix for output file names      |
//! | `COPYLIST_LINE_ENDING`   | `lf`    | `lf` or `crlf`                    |
//! | `COPYLIST_MAX_UPLOAD_MB` | `64`    | Request body limit for uploads    |

use std::env;
use std::path::PathBuf;

use crate::error::{ConfigError, ConfigResult};
use crate::parser::LineEnding;
use crate::transform::dsl::RuleSet;
use crate::transform::pipeline::{ConvertOptions, DEFAULT_OUTPUT_SUFFIX};

pub const ENV_PORT: &str = "COPYLIST_PORT";
pub const ENV_RULES: &str = "COPYLIST_RULES";
pub const ENV_OUTPUT_SUFFIX: &str = "COPYLIST_OUTPUT_SUFFIX";
pub const ENV_LINE_ENDING: &str = "COPYLIST_LINE_ENDING";
pub const ENV_MAX_UPLOAD_MB: &str = "COPYLIST_MAX_UPLOAD_MB";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Default upload limit in mebibytes, well above a large item export
pub const DEFAULT_MAX_UPLOAD_MB: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub rules_path: Option<PathBuf>,
    pub output_suffix: String,
    pub line_ending: LineEnding,
    pub max_upload_mb: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            rules_path: None,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            line_ending: LineEnding::default(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset or empty values keep their default
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = get(ENV_PORT) {
            config.port = port
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid(ENV_PORT, &port, e.to_string()))?;
        }
        if let Some(path) = get(ENV_RULES) {
            config.rules_path = Some(PathBuf::from(path));
        }
        if let Some(suffix) = get(ENV_OUTPUT_SUFFIX) {
            config.output_suffix = suffix;
        }
        if let Some(ending) = get(ENV_LINE_ENDING) {
            config.line_ending = ending
                .parse()
                .map_err(|reason| invalid(ENV_LINE_ENDING, &ending, reason))?;
        }
        if let Some(limit) = get(ENV_MAX_UPLOAD_MB) {
            config.max_upload_mb = match limit.trim().parse::<usize>() {
                Ok(0) => {
                    return Err(invalid(ENV_MAX_UPLOAD_MB, &limit, "must be at least 1".to_string()))
                }
                Ok(mb) => mb,
                Err(e) => return Err(invalid(ENV_MAX_UPLOAD_MB, &limit, e.to_string())),
            };
        }

        Ok(config)
    }

    /// Upload limit in bytes for the HTTP server
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Pipeline options, loading and validating the rule set file if configured
    pub fn convert_options(&self) -> ConfigResult<ConvertOptions> {
        if self.output_suffix.is_empty() {
            return Err(invalid(
                ENV_OUTPUT_SUFFIX,
                &self.output_suffix,
                "must not be empty; output names would equal input names".to_string(),
            ));
        }

        let rules = match &self.rules_path {
            Some(path) => RuleSet::from_json_file(path)?,
            None => RuleSet::default(),
        };

        Ok(ConvertOptions {
            rules,
            output_suffix: self.output_suffix.clone(),
            line_ending: self.line_ending,
        })
    }
}

fn invalid(var: &str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.output_suffix, "_cp");
    }

    #[test]
    fn test_reads_all_variables() {
        let config = Config::from_lookup(lookup(&[
            (ENV_PORT, "8080"),
            (ENV_RULES, "/etc/copylist/rules.json"),
            (ENV_OUTPUT_SUFFIX, "_copy"),
            (ENV_LINE_ENDING, "CRLF"),
            (ENV_MAX_UPLOAD_MB, "16"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.rules_path, Some(PathBuf::from("/etc/copylist/rules.json")));
        assert_eq!(config.output_suffix, "_copy");
        assert_eq!(config.line_ending, LineEnding::Crlf);
        assert_eq!(config.max_upload_bytes(), 16 * 1024 * 1024);
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = Config::from_lookup(lookup(&[(ENV_PORT, " "), (ENV_OUTPUT_SUFFIX, "")])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.output_suffix, DEFAULT_OUTPUT_SUFFIX);
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[(ENV_PORT, "http")])).unwrap_err();
        assert!(err.to_string().contains(ENV_PORT));

        let err = Config::from_lookup(lookup(&[(ENV_LINE_ENDING, "cr")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        for limit in ["0", "-5", "lots"] {
            let err = Config::from_lookup(lookup(&[(ENV_MAX_UPLOAD_MB, limit)])).unwrap_err();
            assert!(err.to_string().contains(ENV_MAX_UPLOAD_MB));
        }
    }

    #[test]
    fn test_default_upload_limit_exceeds_two_megabytes() {
        assert!(Config::default().max_upload_bytes() > 2 * 1024 * 1024);
    }

    #[test]
    fn test_convert_options_loads_rule_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"description": "ids only", "rules": [{"type": "append_suffix", "columns": ["商品番号"], "suffix": "_b"}]}"#,
        )
        .unwrap();

        let config = Config {
            rules_path: Some(path),
            ..Config::default()
        };
        let options = config.convert_options().unwrap();
        assert_eq!(options.rules.description, "ids only");
        assert_eq!(options.rules.rules.len(), 1);
    }

    #[test]
    fn test_convert_options_rejects_empty_suffix() {
        let config = Config {
            output_suffix: String::new(),
            ..Config::default()
        };
        assert!(matches!(
            config.convert_options(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_convert_options_missing_rule_file() {
        let config = Config {
            rules_path: Some(PathBuf::from("/nonexistent/rules.json")),
            ..Config::default()
        };
        assert!(matches!(config.convert_options(), Err(ConfigError::Rules(_))));
    }
}
