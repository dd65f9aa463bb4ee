use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use std::error::Error as StdError;
use std::fmt;
use std::time::{Duration, Instant};
use tokio_postgres::{types::Type, Client, Row};

/// Categorized error types for SQL query failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// Syntax errors (SQLSTATE class 42 - syntax_error, etc.)
    Syntax,
    /// Semantic errors (missing table/column, ambiguous reference)
    Semantic,
    /// Execution/runtime errors (division by zero, constraint violation)
    Execution,
    /// Transaction state errors (e.g., transaction aborted)
    Transaction,
    /// Connection/communication errors
    Connection,
    /// Unknown or unclassified errors
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Syntax => write!(f, "Syntax Error"),
            ErrorCategory::Semantic => write!(f, "Semantic Error"),
            ErrorCategory::Execution => write!(f, "Execution Error"),
            ErrorCategory::Transaction => write!(f, "Transaction Error"),
            ErrorCategory::Connection => write!(f, "Connection Error"),
            ErrorCategory::Unknown => write!(f, "Error"),
        }
    }
}

/// Structured error with rich context from PostgreSQL error responses.
///
/// Execution faults are carried as values, never raised past the executor
/// boundary: a bad statement yields a `QueryOutcome::Fault` holding one of
/// these, not an `Err`.
#[derive(Debug, Clone)]
pub struct StructuredError {
    /// Categorized error type
    pub category: ErrorCategory,
    /// SQLSTATE error code (e.g., "42601" for syntax_error)
    pub code: String,
    /// Primary error message
    pub message: String,
    /// Optional detail providing more context
    pub detail: Option<String>,
    /// Optional hint suggesting a fix
    pub hint: Option<String>,
    /// Character position in the statement where the error occurred (1-based)
    pub position: Option<u32>,
    /// Table associated with the error
    pub table: Option<String>,
    /// Column associated with the error
    pub column: Option<String>,
    /// Computed line number (1-based) from position, if available
    pub line: Option<usize>,
    /// Computed column number (1-based) from position, if available
    pub col: Option<usize>,
}

impl StructuredError {
    /// Create a StructuredError from a tokio_postgres error, using the
    /// statement text to compute line/column from the byte position.
    pub fn from_pg_error(err: &tokio_postgres::Error, sql: &str) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let code_str = db_err.code().code().to_string();
            let category = categorize_sqlstate(&code_str);
            let position = db_err.position().and_then(|p| match p {
                tokio_postgres::error::ErrorPosition::Original(pos) => Some(*pos),
                tokio_postgres::error::ErrorPosition::Internal { .. } => None,
            });

            let (line, col) = if let Some(pos) = position {
                byte_offset_to_line_col(sql, pos as usize)
            } else {
                (None, None)
            };

            StructuredError {
                category,
                code: code_str,
                message: db_err.message().to_string(),
                detail: db_err.detail().map(|s| s.to_string()),
                hint: db_err.hint().map(|s| s.to_string()),
                position,
                table: db_err.table().map(|s| s.to_string()),
                column: db_err.column().map(|s| s.to_string()),
                line,
                col,
            }
        } else {
            // Non-database error (connection, protocol, etc.)
            let category = if err.source().is_some() {
                ErrorCategory::Connection
            } else {
                ErrorCategory::Unknown
            };
            StructuredError {
                category,
                code: String::new(),
                message: err.to_string(),
                detail: err.source().map(|e| e.to_string()),
                hint: None,
                position: None,
                table: None,
                column: None,
                line: None,
                col: None,
            }
        }
    }

    /// Create a simple error from a plain string (for non-database faults).
    pub fn from_string(msg: String) -> Self {
        StructuredError {
            category: ErrorCategory::Unknown,
            code: String::new(),
            message: msg,
            detail: None,
            hint: None,
            position: None,
            table: None,
            column: None,
            line: None,
            col: None,
        }
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Convert a 1-based byte offset in a statement to (line, column) both 1-based.
fn byte_offset_to_line_col(sql: &str, byte_pos: usize) -> (Option<usize>, Option<usize>) {
    if byte_pos == 0 || sql.is_empty() {
        return (Some(1), Some(1));
    }
    let target = (byte_pos - 1).min(sql.len()); // PostgreSQL positions are 1-based
    let mut line = 1usize;
    let mut col = 1usize;
    for (i, ch) in sql.char_indices() {
        if i >= target {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (Some(line), Some(col))
}

/// Categorize a SQLSTATE code into an ErrorCategory.
fn categorize_sqlstate(code: &str) -> ErrorCategory {
    if code.len() < 2 {
        return ErrorCategory::Unknown;
    }
    let class = &code[..2];
    match class {
        // Class 42: Syntax Error or Access Rule Violation
        "42" => {
            // 42601 = syntax_error, 42501 = insufficient_privilege
            if code == "42601" || code == "42000" {
                ErrorCategory::Syntax
            } else {
                // 42P01 = undefined_table, 42703 = undefined_column, etc.
                ErrorCategory::Semantic
            }
        }
        // Class 22: Data Exception (division by zero, etc.)
        "22" => ErrorCategory::Execution,
        // Class 23: Integrity Constraint Violation
        "23" => ErrorCategory::Execution,
        // Class 25: Invalid Transaction State
        "25" => ErrorCategory::Transaction,
        // Class 40: Transaction Rollback
        "40" => ErrorCategory::Transaction,
        // Class 08: Connection Exception
        "08" => ErrorCategory::Connection,
        // Class 53: Insufficient Resources
        "53" => ErrorCategory::Execution,
        // Class 54: Program Limit Exceeded
        "54" => ErrorCategory::Execution,
        // Class 55: Object Not In Prerequisite State
        "55" => ErrorCategory::Execution,
        // Class 57: Operator Intervention
        "57" => ErrorCategory::Execution,
        _ => ErrorCategory::Unknown,
    }
}

/// A non-empty result set.
#[derive(Debug, Clone)]
pub struct ResultSet {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<CellValue>>,
    pub execution_time: Duration,
}

#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub type_name: String,
}

/// Three-way outcome of running one statement.
///
/// `Empty` means the statement executed successfully and returned no rows;
/// it is deliberately distinct from both `Rows` and `Fault`.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Rows(ResultSet),
    Empty,
    Fault(StructuredError),
}

impl QueryOutcome {
    pub fn is_fault(&self) -> bool {
        matches!(self, QueryOutcome::Fault(_))
    }
}

#[derive(Debug, Clone)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Numeric(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
    Array(Vec<CellValue>),
}

impl CellValue {
    pub fn display(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int16(i) => i.to_string(),
            CellValue::Int32(i) => i.to_string(),
            CellValue::Int64(i) => i.to_string(),
            CellValue::Float32(f) => f.to_string(),
            CellValue::Float64(f) => f.to_string(),
            CellValue::Numeric(d) => d.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Bytes(b) => format!("[{} bytes]", b.len()),
            CellValue::Date(d) => d.to_string(),
            CellValue::Time(t) => t.to_string(),
            CellValue::DateTime(dt) => dt.to_string(),
            CellValue::TimestampTz(dt) => dt.to_string(),
            CellValue::Json(j) => j.to_string(),
            CellValue::Array(arr) => {
                let items: Vec<String> = arr.iter().map(|v| v.display()).collect();
                format!("{{{}}}", items.join(", "))
            }
        }
    }
}

/// Run one statement on a scoped client and fetch all rows.
///
/// Execution-time faults (bad SQL, permission denial, connectivity loss
/// mid-statement) are captured as `QueryOutcome::Fault`; nothing escapes as
/// an `Err`. The caller owns the client and drops it when done, so the
/// connection is released on every exit path.
pub async fn execute_statement(client: &Client, sql: &str) -> QueryOutcome {
    let start = Instant::now();
    let sql_trimmed = sql.trim();

    match client.query(sql_trimmed, &[]).await {
        Ok(rows) => {
            if rows.is_empty() {
                QueryOutcome::Empty
            } else {
                QueryOutcome::Rows(parse_rows(&rows, start.elapsed()))
            }
        }
        Err(e) => QueryOutcome::Fault(StructuredError::from_pg_error(&e, sql_trimmed)),
    }
}

fn parse_rows(rows: &[Row], execution_time: Duration) -> ResultSet {
    let first_row = &rows[0];
    let columns: Vec<ColumnInfo> = first_row
        .columns()
        .iter()
        .map(|col| ColumnInfo {
            name: col.name().to_string(),
            type_name: col.type_().name().to_string(),
        })
        .collect();

    let mut result_rows: Vec<Vec<CellValue>> = Vec::with_capacity(rows.len());

    for row in rows {
        let mut row_values: Vec<CellValue> = Vec::with_capacity(columns.len());

        for (i, col) in row.columns().iter().enumerate() {
            let value = extract_value(row, i, col.type_());
            row_values.push(value);
        }

        result_rows.push(row_values);
    }

    ResultSet {
        columns,
        rows: result_rows,
        execution_time,
    }
}

fn extract_value(row: &Row, idx: usize, pg_type: &Type) -> CellValue {
    match *pg_type {
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Bool)
            .unwrap_or(CellValue::Null),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Int16)
            .unwrap_or(CellValue::Null),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Int32)
            .unwrap_or(CellValue::Null),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Int64)
            .unwrap_or(CellValue::Null),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Float32)
            .unwrap_or(CellValue::Null),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Float64)
            .unwrap_or(CellValue::Null),
        // NUMERIC does not decode as f64; go through rust_decimal.
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Numeric)
            .unwrap_or(CellValue::Null),
        Type::TEXT | Type::VARCHAR | Type::NAME | Type::CHAR | Type::BPCHAR => row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Text)
            .unwrap_or(CellValue::Null),
        Type::BYTEA => row
            .try_get::<_, Option<Vec<u8>>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Bytes)
            .unwrap_or(CellValue::Null),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Date)
            .unwrap_or(CellValue::Null),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Time)
            .unwrap_or(CellValue::Null),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .ok()
            .flatten()
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Null),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .ok()
            .flatten()
            .map(CellValue::TimestampTz)
            .unwrap_or(CellValue::Null),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .ok()
            .flatten()
            .map(CellValue::Json)
            .unwrap_or(CellValue::Null),
        _ => {
            // Fallback: try to get as string
            row.try_get::<_, Option<String>>(idx)
                .ok()
                .flatten()
                .map(CellValue::Text)
                .unwrap_or(CellValue::Null)
        }
    }
}
