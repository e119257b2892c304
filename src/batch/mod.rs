//! Batch resolution of one spreadsheet column.
//!
//! Real columns repeat the same few values thousands of times, so a batch is
//! processed in three steps:
//!
//! 1. [`prepare`] validates the column and collects the distinct values,
//! 2. [`match_values`] resolves each distinct value once,
//! 3. [`project`] fans the verdicts back out to one [`ResultRecord`] per row.
//!
//! [`resolve_batch`] runs all three on the calling thread; the
//! [`runtime`](crate::runtime) runs step 2 on a worker through [`protocol`].

pub mod protocol;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::error::{TownError, TownResult};
use crate::matcher::Matcher;
use crate::verdict::Verdict;

/// One spreadsheet row; the first row of a sheet is the header.
pub type Row = Vec<Value>;

/// Text of a cell as the matcher sees it.
///
/// Strings are taken verbatim, `null` is empty, and everything else uses its
/// JSON rendering (`12`, `true`).
#[must_use]
pub fn cell_text(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Result for one input row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    /// 0-based position among the data rows.
    pub index: usize,
    /// The row's original cells.
    pub row: Row,
    /// Text of the selected cell.
    pub raw_value: String,
    /// The matcher's verdict for `raw_value`.
    pub base: Verdict,
}

/// A validated batch, ready for matching.
#[derive(Debug, Clone)]
pub struct PreparedBatch {
    column: String,
    column_index: Option<usize>,
    rows: Vec<Row>,
    unique_values: Vec<Value>,
}

impl PreparedBatch {
    /// The selected column name.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Data rows (header excluded).
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Distinct cell values of the column, in first-seen order.
    #[must_use]
    pub fn unique_values(&self) -> &[Value] {
        &self.unique_values
    }

    /// Returns true when there is nothing to match.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn cell<'a>(&self, row: &'a Row) -> Option<&'a Value> {
        self.column_index.and_then(|idx| row.get(idx))
    }
}

/// Validates `column` against the header row and collects distinct values.
///
/// Empty input and header-only input produce an empty batch.
///
/// # Errors
///
/// Returns [`TownError::InvalidColumn`] when the header row has no cell whose
/// text equals `column`.
pub fn prepare(mut rows: Vec<Row>, column: &str) -> TownResult<PreparedBatch> {
    if rows.len() < 2 {
        return Ok(PreparedBatch {
            column: column.to_string(),
            column_index: None,
            rows: Vec::new(),
            unique_values: Vec::new(),
        });
    }

    let header = rows.remove(0);
    let column_index = header
        .iter()
        .position(|cell| cell_text(cell) == column)
        .ok_or_else(|| TownError::InvalidColumn {
            column: column.to_string(),
        })?;

    let mut seen = HashSet::new();
    let mut unique_values = Vec::new();
    for row in &rows {
        let cell = row.get(column_index).cloned().unwrap_or(Value::Null);
        if seen.insert(cell_text(&cell)) {
            unique_values.push(cell);
        }
    }

    tracing::debug!(
        column,
        rows = rows.len(),
        distinct = unique_values.len(),
        "prepared batch"
    );

    Ok(PreparedBatch {
        column: column.to_string(),
        column_index: Some(column_index),
        rows,
        unique_values,
    })
}

/// Resolves each value once, keyed by its cell text.
#[must_use]
pub fn match_values(matcher: &Matcher, values: &[Value]) -> HashMap<String, Verdict> {
    let mut verdicts = HashMap::with_capacity(values.len());
    for value in values {
        let text = cell_text(value);
        if !verdicts.contains_key(&text) {
            let verdict = matcher.resolve(&text);
            verdicts.insert(text, verdict);
        }
    }
    verdicts
}

/// Expands per-value verdicts into one record per data row.
///
/// A value missing from `verdicts` is recorded as `not_found`.
#[must_use]
pub fn project(batch: PreparedBatch, verdicts: &HashMap<String, Verdict>) -> Vec<ResultRecord> {
    let mut missing = 0usize;
    let records: Vec<ResultRecord> = batch
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let raw_value = batch.cell(row).map(cell_text).unwrap_or_default();
            let base = verdicts.get(&raw_value).cloned().unwrap_or_else(|| {
                missing += 1;
                Verdict::not_found()
            });
            ResultRecord {
                index,
                row: row.clone(),
                raw_value,
                base,
            }
        })
        .collect();

    if missing > 0 {
        tracing::warn!(missing, "values missing from batch response; recorded as not_found");
    }
    records
}

/// Resolves every row of `column` on the calling thread.
///
/// # Errors
///
/// Returns [`TownError::InvalidColumn`] when the column is not in the header.
pub fn resolve_batch(rows: Vec<Row>, column: &str, matcher: &Matcher) -> TownResult<Vec<ResultRecord>> {
    let batch = prepare(rows, column)?;
    let verdicts = match_values(matcher, batch.unique_values());
    Ok(project(batch, &verdicts))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::directory::DirectoryIndex;
    use crate::verdict::BaseStatus;

    fn matcher() -> Matcher {
        let directory = DirectoryIndex::from_json_str(
            r#"{
                "towns": { "Montpelier": { "geoid": "5002346225" }, "Peru": { "geoid": "5000354925" } },
                "aliases": { "montpelier": "Montpelier", "peru": "Peru" }
            }"#,
        )
        .unwrap();
        Matcher::with_defaults(Arc::new(directory))
    }

    fn sheet() -> Vec<Row> {
        vec![
            vec![json!("Id"), json!("Town")],
            vec![json!(1), json!("Montpelier")],
            vec![json!(2), json!("PERU VT 05152")],
            vec![json!(3), json!("Montpelier")],
            vec![json!(4), Value::Null],
            vec![json!(5)],
        ]
    }

    #[test]
    fn cell_text_rendering() {
        assert_eq!(cell_text(&json!("Barre")), "Barre");
        assert_eq!(cell_text(&json!(5_002_346_225_u64)), "5002346225");
        assert_eq!(cell_text(&json!(true)), "true");
        assert_eq!(cell_text(&Value::Null), "");
    }

    #[test]
    fn prepare_dedups_in_first_seen_order() {
        let batch = prepare(sheet(), "Town").unwrap();
        assert_eq!(batch.rows().len(), 5);
        assert_eq!(
            batch.unique_values(),
            [json!("Montpelier"), json!("PERU VT 05152"), Value::Null]
        );
    }

    #[test]
    fn missing_column_is_invalid() {
        let err = prepare(sheet(), "Municipality").unwrap_err();
        assert!(err.is_invalid_column());
    }

    #[test]
    fn empty_and_header_only_inputs() {
        assert!(resolve_batch(Vec::new(), "Town", &matcher()).unwrap().is_empty());
        let header_only = vec![vec![json!("Town")]];
        assert!(resolve_batch(header_only, "Town", &matcher()).unwrap().is_empty());
    }

    #[test]
    fn resolves_and_projects_every_row() {
        let records = resolve_batch(sheet(), "Town", &matcher()).unwrap();
        assert_eq!(records.len(), 5);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.index, i);
        }
        assert_eq!(records[0].base.status(), BaseStatus::Exact);
        assert_eq!(records[1].base.official(), "Peru");
        assert_eq!(records[0].base, records[2].base);
        assert_eq!(records[3].raw_value, "");
        assert_eq!(records[3].base.status(), BaseStatus::NotFound);
        // Short row: the selected cell is absent.
        assert_eq!(records[4].raw_value, "");
        assert_eq!(records[4].row, vec![json!(5)]);
    }

    #[test]
    fn project_defaults_missing_values_to_not_found() {
        let batch = prepare(sheet(), "Town").unwrap();
        let records = project(batch, &HashMap::new());
        assert!(records.iter().all(|r| r.base == Verdict::not_found()));
    }
}
