//! High-level pipeline API: listing export in, copy listing out.
//!
//! Each file is decoded, rewritten by the rule set, and re-encoded as
//! Shift_JIS. Files in a batch are converted one at a time, in order, and a
//! failure in one file does not stop the others.
//!
//! # Example
//!
//! ```rust,ignore
//! use copylist::{convert_file, ConvertOptions};
//! use std::path::Path;
//!
//! let (written, result) = convert_file(Path::new("item.csv"), None, &ConvertOptions::default())?;
//! println!("{} rows -> {}", result.csv_info.row_count, written.display());
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::dsl::{execute, RuleReport, RuleSet};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::error::{PipelineError, PipelineResult};
use crate::parser::{parse_bytes, serialize, LineEnding};

/// Default suffix appended to the output file stem
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_cp";

/// Extension of every output file
pub const OUTPUT_EXTENSION: &str = "csv";

/// Options for the conversion pipeline
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Rules applied to every file
    pub rules: RuleSet,

    /// Appended to the input base name to form the output name
    pub output_suffix: String,

    /// Line terminator of the output
    pub line_ending: LineEnding,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            rules: RuleSet::default(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            line_ending: LineEnding::default(),
        }
    }
}

/// Result of converting one file
#[derive(Debug, Clone, Serialize)]
pub struct ConvertResult {
    /// Name for the converted file
    pub output_name: String,

    /// Shift_JIS CSV bytes
    #[serde(skip)]
    pub bytes: Vec<u8>,

    /// Input metadata
    pub csv_info: CsvInfo,

    /// Per-rule statistics
    pub reports: Vec<RuleReport>,

    /// Characters replaced because Shift_JIS cannot encode them
    pub replaced_chars: usize,
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Output name for an input file name: base name + suffix + ".csv".
///
/// The base name is everything before the last `.`, or the whole name when
/// there is none.
pub fn output_file_name(input_name: &str, suffix: &str) -> String {
    let stem = input_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(input_name);
    format!("{}{}.{}", stem, suffix, OUTPUT_EXTENSION)
}

/// Convert the bytes of one listing export.
pub fn convert_bytes(
    bytes: &[u8],
    file_name: &str,
    options: &ConvertOptions,
) -> PipelineResult<ConvertResult> {
    log_info(format!("📖 Reading {} ({} bytes)...", file_name, bytes.len()));
    let parsed = parse_bytes(bytes)?;
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!(
        "Read {} rows, {} columns",
        parsed.dataset.row_count(),
        parsed.dataset.column_count()
    ));

    let csv_info = CsvInfo {
        encoding: parsed.encoding.to_string(),
        headers: parsed.dataset.headers.clone(),
        row_count: parsed.dataset.row_count(),
    };

    log_info("⚙️  Applying rules...");
    let result = execute(parsed.dataset, &options.rules);
    print_reports(&result.reports);
    log_success(result.summary());

    let encoded = serialize(&result.dataset, options.line_ending)?;
    if encoded.replaced > 0 {
        log_warning(format!(
            "{} characters not representable in Shift_JIS were replaced with '?'",
            encoded.replaced
        ));
    }

    Ok(ConvertResult {
        output_name: output_file_name(file_name, &options.output_suffix),
        bytes: encoded.bytes,
        csv_info,
        reports: result.reports,
        replaced_chars: encoded.replaced,
    })
}

/// Convert one file, writing the result next to it or into `output_dir`.
pub fn convert_file(
    input: &Path,
    output_dir: Option<&Path>,
    options: &ConvertOptions,
) -> PipelineResult<(PathBuf, ConvertResult)> {
    let bytes = std::fs::read(input)?;
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let result = convert_bytes(&bytes, &file_name, options)?;

    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let output = dir.join(&result.output_name);
    if same_file(input, &output) {
        return Err(PipelineError::OverwritesInput(output));
    }
    std::fs::write(&output, &result.bytes)?;
    log_success(format!("💾 Written: {}", output.display()));

    Ok((output, result))
}

/// Convert several files in order. Each entry carries that file's outcome.
pub fn convert_files(
    inputs: &[PathBuf],
    output_dir: Option<&Path>,
    options: &ConvertOptions,
) -> Vec<(PathBuf, Result<(PathBuf, ConvertResult), PipelineError>)> {
    log_info(format!("Converting {} file(s)", inputs.len()));
    inputs
        .iter()
        .map(|input| {
            let outcome = convert_file(input, output_dir, options);
            (input.clone(), outcome)
        })
        .collect()
}

/// Whether `output` names the existing file `input`, through any relative path.
fn same_file(input: &Path, output: &Path) -> bool {
    let resolve = |path: &Path| -> Option<PathBuf> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let name = path.file_name()?;
        Some(std::fs::canonicalize(parent).ok()?.join(name))
    };

    match (resolve(input), resolve(output)) {
        (Some(a), Some(b)) => a == b,
        _ => input == output,
    }
}

/// Print per-rule statistics
fn print_reports(reports: &[RuleReport]) {
    for report in reports {
        log_info_indent(
            format!(
                "{}: {} changed ({} columns)",
                report.rule,
                report.changed,
                report.columns.len()
            ),
            1,
        );
        if !report.missing.is_empty() && report.columns.is_empty() {
            log_info_indent("no target columns in file, skipped", 2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{encode_content, parse_bytes};
    use serde_json::json;
    use tempfile::tempdir;

    const HEADER: &str = "商品管理番号（商品URL）,商品番号,商品名,PC用販売説明文,商品画像パス1,商品画像タイプ1,商品画像名（ALT）1,SKU管理番号";

    fn sample_csv() -> String {
        format!(
            "{}\nshoe-001,S001,靴 ★REVキャンペーン 赤,\"<img src=\"\"https://x.jp/rev_1.jpg\"\">説明\",https://x.jp/rev_1.jpg,商品,赤い靴,100X1\nshoe-002,,靴,,https://x.jp/a.jpg,商品,靴,\n",
            HEADER
        )
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("item.csv", "_cp"), "item_cp.csv");
        assert_eq!(output_file_name("item.2024.csv", "_cp"), "item.2024_cp.csv");
        assert_eq!(output_file_name("item", "_cp"), "item_cp.csv");
        assert_eq!(output_file_name("商品.CSV", "_copy"), "商品_copy.csv");
    }

    #[test]
    fn test_default_options() {
        let opts = ConvertOptions::default();
        assert_eq!(opts.output_suffix, "_cp");
        assert_eq!(opts.line_ending, LineEnding::Lf);
        assert_eq!(opts.rules, RuleSet::default());
    }

    #[test]
    fn test_convert_shift_jis_bytes() {
        let input = encode_content(&sample_csv()).bytes;
        let result = convert_bytes(&input, "item.csv", &ConvertOptions::default()).unwrap();

        assert_eq!(result.output_name, "item_cp.csv");
        assert_eq!(result.csv_info.encoding, "Shift_JIS");
        assert_eq!(result.csv_info.row_count, 2);
        assert_eq!(result.replaced_chars, 0);

        let out = parse_bytes(&result.bytes).unwrap().dataset;
        assert_eq!(out.headers, result.csv_info.headers);
        assert_eq!(out.get(0, "商品管理番号（商品URL）"), Some(&json!("shoe-001_cp")));
        assert_eq!(out.get(0, "商品名"), Some(&json!("靴 赤")));
        assert_eq!(out.get(0, "PC用販売説明文"), Some(&json!("<img src=\"\">説明")));
        assert_eq!(out.get(0, "商品画像パス1"), Some(&serde_json::Value::Null));
        assert_eq!(out.get(0, "SKU管理番号"), Some(&json!("100_cpX1")));
        assert_eq!(out.get(1, "商品番号"), Some(&serde_json::Value::Null));
        assert_eq!(out.get(1, "商品画像パス1"), Some(&json!("https://x.jp/a.jpg")));
    }

    #[test]
    fn test_convert_utf8_input_outputs_shift_jis() {
        let input = sample_csv().into_bytes();
        let result = convert_bytes(&input, "item.csv", &ConvertOptions::default()).unwrap();
        assert_eq!(result.csv_info.encoding, "UTF-8");

        let reparsed = parse_bytes(&result.bytes).unwrap();
        assert_eq!(reparsed.encoding.to_string(), "Shift_JIS");
    }

    #[test]
    fn test_convert_reports_replacements() {
        let input = "商品番号,商品名\nA1,靴😀\n".as_bytes();
        let result = convert_bytes(input, "x.csv", &ConvertOptions::default()).unwrap();
        assert_eq!(result.replaced_chars, 1);
        let out = parse_bytes(&result.bytes).unwrap().dataset;
        assert_eq!(out.get(0, "商品名"), Some(&json!("靴?")));
    }

    #[test]
    fn test_convert_files_reports_per_file() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.csv");
        let bad = dir.path().join("bad.csv");
        std::fs::write(&good, encode_content(&sample_csv()).bytes).unwrap();
        std::fs::write(&bad, [b'a', b',', 0x81]).unwrap();

        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();

        let results = convert_files(
            &[bad.clone(), good.clone()],
            Some(&out_dir),
            &ConvertOptions::default(),
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, bad);
        assert!(matches!(results[0].1, Err(PipelineError::Csv(_))));

        let (written, _) = results[1].1.as_ref().unwrap();
        assert_eq!(written, &out_dir.join("good_cp.csv"));
        assert!(written.exists());
        assert!(!out_dir.join("bad_cp.csv").exists());
    }

    #[test]
    fn test_convert_file_refuses_to_overwrite_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("item.csv");
        std::fs::write(&input, "商品番号\nA1\n").unwrap();

        let options = ConvertOptions {
            output_suffix: String::new(),
            ..ConvertOptions::default()
        };
        let err = convert_file(&input, None, &options).unwrap_err();
        assert!(matches!(err, PipelineError::OverwritesInput(_)));

        // Same directory spelled differently
        let relative = dir.path().join(".").join("item.csv");
        let err = convert_file(&relative, Some(dir.path()), &options).unwrap_err();
        assert!(matches!(err, PipelineError::OverwritesInput(_)));

        assert_eq!(std::fs::read_to_string(&input).unwrap(), "商品番号\nA1\n");
    }

    #[test]
    fn test_convert_file_defaults_to_input_dir() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("listing.csv");
        std::fs::write(&input, "商品番号\nA1\n").unwrap();

        let (written, result) = convert_file(&input, None, &ConvertOptions::default()).unwrap();
        assert_eq!(written, dir.path().join("listing_cp.csv"));
        assert_eq!(result.reports[0].changed, 1);
    }
}
