//! Listing CSV codec: Shift_JIS/UTF-8 decoding, CSV parsing and Shift_JIS output.
//!
//! Rakuten exports are almost always Shift_JIS (Windows code page 932). Input is
//! decoded as Shift_JIS first and as UTF-8 when that fails; a UTF-8 byte-order
//! mark selects UTF-8 directly. Output is always Shift_JIS, with `?` standing in
//! for characters the encoding cannot represent.

use encoding_rs::{EncoderResult, Encoding, SHIFT_JIS, UTF_8};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::Dataset;

/// Replacement byte for characters Shift_JIS cannot encode.
pub const REPLACEMENT: u8 = b'?';

/// Encodings accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceEncoding {
    ShiftJis,
    Utf8,
}

impl SourceEncoding {
    fn encoding(self) -> &'static Encoding {
        match self {
            SourceEncoding::ShiftJis => SHIFT_JIS,
            SourceEncoding::Utf8 => UTF_8,
        }
    }
}

impl fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoding().name())
    }
}

/// Line terminator for serialized output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl std::str::FromStr for LineEnding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lf" => Ok(LineEnding::Lf),
            "crlf" => Ok(LineEnding::Crlf),
            other => Err(format!("Unknown line ending: {} (expected lf or crlf)", other)),
        }
    }
}

/// Result of loading a file
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows
    pub dataset: Dataset,
    /// Encoding the bytes were decoded with
    pub encoding: SourceEncoding,
}

/// Encoded output with substitution statistics
#[derive(Debug, Clone)]
pub struct EncodeResult {
    pub bytes: Vec<u8>,
    /// Characters replaced with [`REPLACEMENT`]
    pub replaced: usize,
}

/// Guess the encoding of raw bytes using chardet.
///
/// Only used to make decoding errors readable.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    if result.0.is_empty() {
        "unknown".to_string()
    } else {
        result.0
    }
}

/// Decode bytes as Shift_JIS, falling back to UTF-8.
pub fn decode_content(bytes: &[u8]) -> CsvResult<(String, SourceEncoding)> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if encoding == UTF_8 {
            return decode_strict(&bytes[bom_len..], SourceEncoding::Utf8)
                .map(|text| (text, SourceEncoding::Utf8))
                .ok_or_else(|| decode_error(bytes));
        }
    }

    for candidate in [SourceEncoding::ShiftJis, SourceEncoding::Utf8] {
        if let Some(text) = decode_strict(bytes, candidate) {
            return Ok((text, candidate));
        }
    }

    Err(decode_error(bytes))
}

fn decode_strict(bytes: &[u8], encoding: SourceEncoding) -> Option<String> {
    encoding
        .encoding()
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

fn decode_error(bytes: &[u8]) -> CsvError {
    CsvError::DecodeError {
        tried: format!("{} nor {}", SourceEncoding::ShiftJis, SourceEncoding::Utf8),
        guess: detect_encoding(bytes),
    }
}

/// Encode text as Shift_JIS, substituting unrepresentable characters.
pub fn encode_content(text: &str) -> EncodeResult {
    let mut encoder = SHIFT_JIS.new_encoder();
    let mut bytes = Vec::with_capacity(text.len() + 16);
    let mut replaced = 0;
    let mut src = text;

    loop {
        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(src, &mut bytes, true);
        src = &src[read..];
        match result {
            EncoderResult::InputEmpty => break,
            EncoderResult::OutputFull => bytes.reserve(src.len() + 16),
            EncoderResult::Unmappable(_) => {
                bytes.push(REPLACEMENT);
                replaced += 1;
            }
        }
    }

    EncodeResult { bytes, replaced }
}

/// Parse decoded CSV text with a header row.
///
/// Empty fields load as `Null`. Short rows are padded with `Null`; rows with
/// more fields than the header are rejected.
pub fn parse_csv(content: &str) -> CsvResult<Dataset> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut dataset = Dataset::new(headers);
    for result in reader.records() {
        let record = result?;
        if record.len() > dataset.column_count() {
            return Err(CsvError::TooManyFields {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                expected: dataset.column_count(),
                found: record.len(),
            });
        }
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Value::Null
                } else {
                    Value::String(field.to_string())
                }
            })
            .collect();
        dataset.push_row(row);
    }

    Ok(dataset)
}

/// Decode and parse raw bytes.
pub fn parse_bytes(bytes: &[u8]) -> CsvResult<ParseResult> {
    let (content, encoding) = decode_content(bytes)?;
    let dataset = parse_csv(&content)?;
    Ok(ParseResult { dataset, encoding })
}

/// Read, decode and parse a file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes)
}

/// Write a dataset as CSV text: header row then rows, minimal quoting.
///
/// `Null` cells are written as empty fields; other scalars as their text form.
pub fn write_csv(dataset: &Dataset, line_ending: LineEnding) -> CsvResult<String> {
    let terminator = match line_ending {
        LineEnding::Lf => csv::Terminator::Any(b'\n'),
        LineEnding::Crlf => csv::Terminator::CRLF,
    };
    let mut writer = csv::WriterBuilder::new()
        .terminator(terminator)
        .from_writer(Vec::new());

    writer.write_record(&dataset.headers)?;
    for row in &dataset.rows {
        writer.write_record(row.iter().map(cell_to_field))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| CsvError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| CsvError::ParseError(e.to_string()))
}

fn cell_to_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Serialize a dataset to Shift_JIS CSV bytes.
pub fn serialize(dataset: &Dataset, line_ending: LineEnding) -> CsvResult<EncodeResult> {
    let text = write_csv(dataset, line_ending)?;
    Ok(encode_content(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sjis(text: &str) -> Vec<u8> {
        encode_content(text).bytes
    }

    #[test]
    fn test_decode_shift_jis() {
        let bytes = sjis("商品名,価格\nりんご,100\n");
        let (text, encoding) = decode_content(&bytes).unwrap();
        assert_eq!(encoding, SourceEncoding::ShiftJis);
        assert!(text.starts_with("商品名"));
    }

    #[test]
    fn test_decode_falls_back_to_utf8() {
        // Valid UTF-8 Japanese is not valid Shift_JIS here (0xE5 0x95 0x86 ...)
        let bytes = "商品名,価格\n".as_bytes();
        let (text, encoding) = decode_content(bytes).unwrap();
        assert_eq!(encoding, SourceEncoding::Utf8);
        assert_eq!(text, "商品名,価格\n");
    }

    #[test]
    fn test_utf8_bom_selects_utf8() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("商品番号\nA1\n".as_bytes());
        let result = parse_bytes(&bytes).unwrap();
        assert_eq!(result.encoding, SourceEncoding::Utf8);
        assert_eq!(result.dataset.headers, vec!["商品番号"]);
    }

    #[test]
    fn test_decode_error_when_both_fail() {
        // 0x81 alone is a truncated Shift_JIS lead byte and invalid UTF-8
        let bytes: &[u8] = &[b'a', b',', 0x81];
        let err = decode_content(bytes).unwrap_err();
        assert!(matches!(err, CsvError::DecodeError { .. }));
    }

    #[test]
    fn test_encode_substitutes_unmappable() {
        let result = encode_content("A😀B");
        assert_eq!(result.bytes, b"A?B");
        assert_eq!(result.replaced, 1);
    }

    #[test]
    fn test_parse_blank_fields_are_null() {
        let ds = parse_csv("a,b,c\n1,,3\n").unwrap();
        assert_eq!(ds.rows[0], vec![json!("1"), Value::Null, json!("3")]);
    }

    #[test]
    fn test_parse_quoted_commas_and_newlines() {
        let ds = parse_csv("id,desc\nA1,\"red, blue\nline2\"\n").unwrap();
        assert_eq!(ds.get(0, "desc"), Some(&json!("red, blue\nline2")));
    }

    #[test]
    fn test_parse_pads_short_rows() {
        let ds = parse_csv("a,b\n1\n").unwrap();
        assert_eq!(ds.rows[0], vec![json!("1"), Value::Null]);
    }

    #[test]
    fn test_parse_rejects_long_rows() {
        let err = parse_csv("a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(err, CsvError::TooManyFields { expected: 2, found: 3, .. }));
    }

    #[test]
    fn test_parse_empty_file() {
        assert!(matches!(parse_csv(""), Err(CsvError::EmptyFile)));
    }

    #[test]
    fn test_header_only_file() {
        let ds = parse_csv("a,b\n").unwrap();
        assert_eq!(ds.column_count(), 2);
        assert_eq!(ds.row_count(), 0);
    }

    #[test]
    fn test_write_csv_quotes_when_needed() {
        let mut ds = Dataset::new(vec!["id".into(), "desc".into()]);
        ds.push_row(vec![json!("A1"), json!("a, \"b\"")]);
        ds.push_row(vec![Value::Null, json!("")]);
        let text = write_csv(&ds, LineEnding::Lf).unwrap();
        assert_eq!(text, "id,desc\nA1,\"a, \"\"b\"\"\"\n,\n");
    }

    #[test]
    fn test_write_csv_crlf() {
        let mut ds = Dataset::new(vec!["id".into()]);
        ds.push_row(vec![json!("A1")]);
        let text = write_csv(&ds, LineEnding::Crlf).unwrap();
        assert_eq!(text, "id\r\nA1\r\n");
    }

    #[test]
    fn test_round_trip() {
        let mut ds = Dataset::new(vec!["商品番号".into(), "商品名".into(), "説明".into()]);
        ds.push_row(vec![json!("A-1"), json!("赤い 靴"), json!("line1\nline2, \"q\"")]);
        ds.push_row(vec![json!("A-2"), Value::Null, json!("ｶﾀｶﾅ")]);

        let encoded = serialize(&ds, LineEnding::Lf).unwrap();
        assert_eq!(encoded.replaced, 0);

        let parsed = parse_bytes(&encoded.bytes).unwrap();
        assert_eq!(parsed.encoding, SourceEncoding::ShiftJis);
        assert_eq!(parsed.dataset, ds);
    }

    #[test]
    fn test_line_ending_from_str() {
        assert_eq!("CRLF".parse::<LineEnding>().unwrap(), LineEnding::Crlf);
        assert_eq!("lf".parse::<LineEnding>().unwrap(), LineEnding::Lf);
        assert!("cr".parse::<LineEnding>().is_err());
    }
}
