//! Domain models for the copylist pipeline.
//!
//! - [`Dataset`] - Header list plus positional rows of cells
//! - [`is_blank`] / [`as_text`] - Cell helpers shared by every rule
//!
//! A cell is a [`serde_json::Value`]. `Null` is the blank/missing sentinel (an
//! empty CSV field loads as `Null`), `String` is text, and any other scalar is
//! coerced to text before a rule looks at it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Dataset
// =============================================================================

/// Tabular data loaded from a listing export.
///
/// Rows are positional: `rows[i][j]` is the cell of row `i` under
/// `headers[j]`. Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Column names in file order.
    pub headers: Vec<String>,
    /// Row cells in file order.
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Create an empty dataset with the given columns.
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding with `Null` or truncating to the header width.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.headers.len(), Value::Null);
        self.rows.push(row);
    }

    /// Build a dataset from JSON objects, taking values by header name.
    ///
    /// Keys missing from an object become `Null`; keys not in `headers` are
    /// ignored.
    pub fn from_records(headers: Vec<String>, records: &[Value]) -> Self {
        let mut dataset = Self::new(headers);
        for record in records {
            let row = dataset
                .headers
                .iter()
                .map(|h| record.get(h).cloned().unwrap_or(Value::Null))
                .collect();
            dataset.rows.push(row);
        }
        dataset
    }

    /// Rows as JSON objects keyed by header, in column order.
    pub fn to_records(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .headers
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }

    /// Index of the first column with this exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Cell at (row, column name).
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let col = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Rewrite every cell of one column with `f`, returning how many changed.
    pub fn map_column<F>(&mut self, col: usize, mut f: F) -> usize
    where
        F: FnMut(&Value) -> Value,
    {
        let mut changed = 0;
        for row in &mut self.rows {
            if let Some(cell) = row.get_mut(col) {
                let next = f(cell);
                if next != *cell {
                    *cell = next;
                    changed += 1;
                }
            }
        }
        changed
    }
}

// =============================================================================
// Cell helpers
// =============================================================================

/// Text form of a cell; `None` for `Null` and non-scalar values.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Whether a cell holds no value: `Null`, or text that is empty after trimming.
pub fn is_blank(value: &Value) -> bool {
    match as_text(value) {
        Some(s) => s.trim().is_empty(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Dataset {
        let mut ds = Dataset::new(vec!["a".into(), "b".into()]);
        ds.push_row(vec![json!("1"), json!("2")]);
        ds.push_row(vec![json!("3")]);
        ds
    }

    #[test]
    fn test_push_row_pads_with_null() {
        let ds = sample();
        assert_eq!(ds.rows[1], vec![json!("3"), Value::Null]);
    }

    #[test]
    fn test_records_keep_column_order() {
        let ds = Dataset::new(vec!["z".into(), "a".into()]);
        let ds = Dataset::from_records(ds.headers, &[json!({"a": "x", "z": "y"})]);
        let records = ds.to_records();
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn test_from_records_missing_key_is_null() {
        let ds = Dataset::from_records(vec!["a".into(), "b".into()], &[json!({"a": 5})]);
        assert_eq!(ds.get(0, "a"), Some(&json!(5)));
        assert_eq!(ds.get(0, "b"), Some(&Value::Null));
    }

    #[test]
    fn test_map_column_counts_changes() {
        let mut ds = sample();
        let col = ds.column_index("a").unwrap();
        let changed = ds.map_column(col, |v| match v.as_str() {
            Some("1") => json!("one"),
            _ => v.clone(),
        });
        assert_eq!(changed, 1);
        assert_eq!(ds.get(0, "a"), Some(&json!("one")));
    }

    #[test]
    fn test_blank_detection() {
        assert!(is_blank(&Value::Null));
        assert!(is_blank(&json!("")));
        assert!(is_blank(&json!("   ")));
        assert!(!is_blank(&json!("x")));
        assert!(!is_blank(&json!(0)));
    }

    #[test]
    fn test_as_text_coerces_scalars() {
        assert_eq!(as_text(&json!(42)), Some("42".to_string()));
        assert_eq!(as_text(&json!(true)), Some("true".to_string()));
        assert_eq!(as_text(&Value::Null), None);
    }
}
