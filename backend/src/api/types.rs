//! REST API types.
//!
//! `/api/convert` answers with the converted file itself; these types describe
//! the JSON returned by `/api/inspect`, `/api/convert/batch` and every error path.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::transform::dsl::RuleReport;
use crate::transform::pipeline::ConvertResult;

/// Response to an inspect request: one report per uploaded file, in upload order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectResponse {
    pub job_id: String,
    /// "ready" when every file converted cleanly, "warning" or "error" otherwise
    pub status: String,
    pub files: Vec<FileReport>,
}

impl InspectResponse {
    pub fn new(files: Vec<FileReport>) -> Self {
        let status = if files.iter().any(|f| f.status == "error") {
            "error"
        } else if files.iter().any(|f| f.status == "warning") {
            "warning"
        } else {
            "ready"
        };

        Self {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            files,
        }
    }
}

/// Outcome for one uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file_name: String,
    /// "ready", "warning" (characters replaced) or "error"
    pub status: String,
    pub output_name: Option<String>,
    pub csv_info: Option<CsvMetadata>,
    #[serde(default)]
    pub rules: Vec<RuleReport>,
    #[serde(default)]
    pub replaced_chars: usize,
    pub error: Option<String>,
    pub converted_at: DateTime<Utc>,
    /// Converted Shift_JIS bytes, base64-encoded; batch downloads only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FileReport {
    pub fn from_result(file_name: impl Into<String>, result: ConvertResult) -> Self {
        let status = if result.replaced_chars == 0 { "ready" } else { "warning" };
        Self {
            file_name: file_name.into(),
            status: status.to_string(),
            output_name: Some(result.output_name),
            csv_info: Some(CsvMetadata {
                encoding: result.csv_info.encoding,
                row_count: result.csv_info.row_count,
                columns: result.csv_info.headers,
            }),
            rules: result.reports,
            replaced_chars: result.replaced_chars,
            error: None,
            converted_at: Utc::now(),
            content: None,
        }
    }

    /// Like [`FileReport::from_result`], carrying the converted file as base64
    pub fn with_content(file_name: impl Into<String>, result: ConvertResult) -> Self {
        let content = STANDARD.encode(&result.bytes);
        Self {
            content: Some(content),
            ..Self::from_result(file_name, result)
        }
    }

    pub fn failed(file_name: impl Into<String>, error: impl ToString) -> Self {
        Self {
            file_name: file_name.into(),
            status: "error".to_string(),
            output_name: None,
            csv_info: None,
            rules: Vec::new(),
            replaced_chars: 0,
            error: Some(error.to_string()),
            converted_at: Utc::now(),
            content: None,
        }
    }
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "files": []
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::pipeline::CsvInfo;

    fn result(replaced_chars: usize) -> ConvertResult {
        ConvertResult {
            output_name: "item_cp.csv".to_string(),
            bytes: b"a\n".to_vec(),
            csv_info: CsvInfo {
                encoding: "Shift_JIS".to_string(),
                headers: vec!["商品番号".to_string()],
                row_count: 1,
            },
            reports: vec![RuleReport {
                rule: "append_suffix".to_string(),
                columns: vec!["商品番号".to_string()],
                missing: vec![],
                changed: 1,
            }],
            replaced_chars,
        }
    }

    #[test]
    fn test_file_report_from_result() {
        let report = FileReport::from_result("item.csv", result(0));
        assert_eq!(report.status, "ready");
        assert_eq!(report.output_name.as_deref(), Some("item_cp.csv"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["fileName"], "item.csv");
        assert_eq!(json["csvInfo"]["rowCount"], 1);
        assert_eq!(json["rules"][0]["changed"], 1);
        assert_eq!(json["replacedChars"], 0);
        assert!(json["error"].is_null());
        assert!(json.get("content").is_none());
    }

    #[test]
    fn test_file_report_with_content() {
        let report = FileReport::with_content("item.csv", result(0));
        assert_eq!(report.content.as_deref(), Some("YQo="));
        assert_eq!(report.status, "ready");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["content"], "YQo=");
        assert_eq!(json["outputName"], "item_cp.csv");
    }

    #[test]
    fn test_replacements_downgrade_to_warning() {
        let report = FileReport::from_result("item.csv", result(2));
        assert_eq!(report.status, "warning");
        assert_eq!(InspectResponse::new(vec![report]).status, "warning");
    }

    #[test]
    fn test_any_failure_marks_response_error() {
        let files = vec![
            FileReport::from_result("a.csv", result(0)),
            FileReport::failed("b.csv", "CSV file is empty"),
        ];
        let response = InspectResponse::new(files);
        assert_eq!(response.status, "error");
        assert_eq!(response.files[0].status, "ready");
        assert_eq!(response.files[1].error.as_deref(), Some("CSV file is empty"));
        assert!(Uuid::parse_str(&response.job_id).is_ok());
    }

    #[test]
    fn test_error_response_shape() {
        let value = error_response("No file provided");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "No file provided");
        assert!(value["files"].as_array().unwrap().is_empty());
    }
}
