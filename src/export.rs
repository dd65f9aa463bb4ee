//! Encode a query outcome into its transportable text forms.

use crate::db::{CellValue, QueryOutcome, ResultSet};

/// Marker text for a statement that executed but returned no rows.
pub const EMPTY_RESULT_MESSAGE: &str = "Query executed successfully but returned no results.";

/// Encode an outcome as the JSON text sent back to callers.
///
/// Non-empty row sets become an array of column-name/value objects, an empty
/// row set becomes a distinguished message object, and an execution fault
/// becomes an error object carrying the fault's text.
pub fn outcome_to_json(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Rows(result) => rows_to_json(result),
        QueryOutcome::Empty => {
            serde_json::json!({ "message": EMPTY_RESULT_MESSAGE }).to_string()
        }
        QueryOutcome::Fault(err) => {
            serde_json::json!({ "error": format!("SQL execution failed: {}", err.message) })
                .to_string()
        }
    }
}

fn rows_to_json(result: &ResultSet) -> String {
    let mut rows_json: Vec<serde_json::Value> = Vec::new();

    for row in &result.rows {
        let mut obj = serde_json::Map::new();
        for (i, cell) in row.iter().enumerate() {
            let col_name = result
                .columns
                .get(i)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("column_{}", i));
            obj.insert(col_name, cell_to_json(cell));
        }
        rows_json.push(serde_json::Value::Object(obj));
    }

    serde_json::to_string(&rows_json).unwrap_or_else(|_| "[]".to_string())
}

fn cell_to_json(cell: &CellValue) -> serde_json::Value {
    match cell {
        CellValue::Null => serde_json::Value::Null,
        CellValue::Bool(b) => serde_json::Value::Bool(*b),
        CellValue::Int16(i) => serde_json::json!(*i),
        CellValue::Int32(i) => serde_json::json!(*i),
        CellValue::Int64(i) => serde_json::json!(*i),
        CellValue::Float32(f) => serde_json::json!(*f),
        CellValue::Float64(f) => serde_json::json!(*f),
        CellValue::Numeric(d) => d
            .to_string()
            .parse::<serde_json::Number>()
            .map(serde_json::Value::Number)
            .unwrap_or_else(|_| serde_json::Value::String(d.to_string())),
        CellValue::Json(j) => j.clone(),
        CellValue::Array(arr) => {
            let items: Vec<serde_json::Value> = arr.iter().map(cell_to_json).collect();
            serde_json::Value::Array(items)
        }
        other => serde_json::Value::String(other.display()),
    }
}

/// Render an outcome as a plain-text table for terminal output.
pub fn outcome_to_text(outcome: &QueryOutcome) -> String {
    match outcome {
        QueryOutcome::Rows(result) => rows_to_text(result),
        QueryOutcome::Empty => EMPTY_RESULT_MESSAGE.to_string(),
        QueryOutcome::Fault(err) => {
            let mut out = format!("{}: {}", err.category, err.message);
            if let (Some(line), Some(col)) = (err.line, err.col) {
                out.push_str(&format!("\n  at line {}, column {}", line, col));
            }
            if let Some(hint) = &err.hint {
                out.push_str(&format!("\n  Hint: {}", hint));
            }
            out
        }
    }
}

fn rows_to_text(result: &ResultSet) -> String {
    let labels: Vec<String> = result
        .columns
        .iter()
        .map(|c| format!("{} ({})", c.name, c.type_name))
        .collect();
    let mut widths: Vec<usize> = labels.iter().map(|l| l.len()).collect();
    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|c| c.display()).collect())
        .collect();

    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() && cell.len() > widths[i] {
                widths[i] = cell.len();
            }
        }
    }

    let mut out = String::new();
    let header: Vec<String> = labels
        .iter()
        .enumerate()
        .map(|(i, l)| format!("{:<width$}", l, width = widths[i]))
        .collect();
    out.push_str(&header.join(" | "));
    out.push('\n');

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&sep.join("-+-"));
    out.push('\n');

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        out.push_str(&line.join(" | "));
        out.push('\n');
    }

    out.push_str(&format!(
        "({} rows in {}ms)\n",
        result.rows.len(),
        result.execution_time.as_millis()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ColumnInfo, StructuredError};
    use rust_decimal::Decimal;
    use std::time::Duration;

    fn sample_result() -> ResultSet {
        ResultSet {
            columns: vec![
                ColumnInfo {
                    name: "name".into(),
                    type_name: "text".into(),
                },
                ColumnInfo {
                    name: "revenue".into(),
                    type_name: "numeric".into(),
                },
            ],
            rows: vec![
                vec![
                    CellValue::Text("Acme".into()),
                    CellValue::Numeric(Decimal::new(120050, 2)),
                ],
                vec![CellValue::Text("Globex".into()), CellValue::Null],
            ],
            execution_time: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_rows_to_json_objects() {
        let json = outcome_to_json(&QueryOutcome::Rows(sample_result()));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let arr = parsed.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        assert_eq!(arr[0]["name"], "Acme");
        assert!(arr[1]["revenue"].is_null());
    }

    #[test]
    fn test_numeric_cell_encodes_as_json_number() {
        let json = outcome_to_json(&QueryOutcome::Rows(sample_result()));
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let revenue = &parsed.as_array().unwrap()[0]["revenue"];
        assert!(revenue.is_number(), "NUMERIC must not collapse to null");
        assert_eq!(revenue.as_f64().unwrap(), 1200.50);
    }

    #[test]
    fn test_empty_marker_json() {
        let json = outcome_to_json(&QueryOutcome::Empty);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["message"], EMPTY_RESULT_MESSAGE);
        assert!(parsed.get("error").is_none());
    }

    #[test]
    fn test_fault_json_carries_message() {
        let fault = QueryOutcome::Fault(StructuredError::from_string(
            "relation \"nope\" does not exist".into(),
        ));
        let json = outcome_to_json(&fault);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let msg = parsed["error"].as_str().unwrap();
        assert!(msg.starts_with("SQL execution failed: "));
        assert!(msg.contains("does not exist"));
    }

    #[test]
    fn test_rows_to_text_table() {
        let text = outcome_to_text(&QueryOutcome::Rows(sample_result()));
        assert!(text.contains("name (text)"));
        assert!(text.contains("revenue (numeric)"));
        assert!(text.contains("Acme"));
        assert!(text.contains("1200.50"));
        assert!(text.contains("NULL"));
        assert!(text.ends_with("(2 rows in 3ms)\n"));
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(outcome_to_text(&QueryOutcome::Empty), EMPTY_RESULT_MESSAGE);
    }
}
