//! End-to-end pipeline tests with a scripted model and an in-memory database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use askpg::config::LlmConfig;
use askpg::db::{CellValue, ColumnInfo, QueryOutcome, ResultSet, StructuredError};
use askpg::export;
use askpg::llm::{ChatMessage, LlmClient};
use askpg::pipeline::{
    Pipeline, PipelineError, PipelineResponse, SchemaSource, StatementRunner,
};

const CUSTOMERS_SCHEMA: &str = "CREATE TABLE public.customers (\n    id integer NOT NULL PRIMARY KEY,\n    name text NOT NULL,\n    revenue numeric\n);\n";

/// Replays a fixed sequence of completions and counts calls.
struct ScriptedLlm {
    replies: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(
        &self,
        _model: &str,
        _messages: &[ChatMessage],
        _max_tokens: Option<u32>,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| anyhow::anyhow!("scripted LLM ran out of replies"))
    }
}

enum RunBehavior {
    Rows(usize),
    Empty,
    Fault(&'static str),
    ConnectionFailed,
}

/// In-memory stand-in for the database seams.
struct FakeDb {
    schema: Option<&'static str>,
    behavior: RunBehavior,
    executed: Mutex<Vec<String>>,
}

impl FakeDb {
    fn new(schema: Option<&'static str>, behavior: RunBehavior) -> Arc<Self> {
        Arc::new(Self {
            schema,
            behavior,
            executed: Mutex::new(Vec::new()),
        })
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl SchemaSource for FakeDb {
    async fn describe(&self) -> Result<String, PipelineError> {
        self.schema
            .map(|s| s.to_string())
            .ok_or(PipelineError::SchemaUnavailable)
    }
}

#[async_trait]
impl StatementRunner for FakeDb {
    async fn run(&self, sql: &str) -> Result<QueryOutcome, PipelineError> {
        self.executed.lock().unwrap().push(sql.to_string());
        match &self.behavior {
            RunBehavior::Rows(n) => {
                let rows = (0..*n)
                    .map(|i| {
                        vec![
                            CellValue::Text(format!("customer-{}", i)),
                            CellValue::Numeric(Decimal::from(1000 - i as i64)),
                        ]
                    })
                    .collect();
                Ok(QueryOutcome::Rows(ResultSet {
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
                    rows,
                    execution_time: Duration::from_millis(1),
                }))
            }
            RunBehavior::Empty => Ok(QueryOutcome::Empty),
            RunBehavior::Fault(msg) => Ok(QueryOutcome::Fault(StructuredError::from_string(
                msg.to_string(),
            ))),
            RunBehavior::ConnectionFailed => Err(PipelineError::ConnectionFailed(
                anyhow::anyhow!("connection refused"),
            )),
        }
    }
}

fn pipeline(llm: Arc<ScriptedLlm>, db: Arc<FakeDb>) -> Pipeline {
    Pipeline::new(llm, LlmConfig::default(), db.clone(), db)
}

#[tokio::test]
async fn top_five_customers_runs_the_synthesized_statement() {
    let llm = ScriptedLlm::new(&[
        "TOOL: DB_QUERY",
        "```sql\nSELECT name, revenue FROM customers ORDER BY revenue DESC LIMIT 5;\n```",
        "CHECK: PASSED",
    ]);
    let db = FakeDb::new(Some(CUSTOMERS_SCHEMA), RunBehavior::Rows(5));

    let response = pipeline(llm.clone(), db.clone())
        .process("What are the top 5 customers by revenue?")
        .await
        .unwrap();

    match response {
        PipelineResponse::Query { sql, outcome } => {
            assert_eq!(
                sql,
                "SELECT name, revenue FROM customers ORDER BY revenue DESC LIMIT 5;"
            );
            match &outcome {
                QueryOutcome::Rows(result) => assert_eq!(result.rows.len(), 5),
                other => panic!("expected rows, got {:?}", other),
            }
            let json = askpg::export::outcome_to_json(&outcome);
            let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
            let rows = parsed.as_array().unwrap();
            assert_eq!(rows.len(), 5);
            // NUMERIC revenue survives the encode as a number
            assert_eq!(rows[0]["revenue"], 1000);
        }
        PipelineResponse::General { text } => panic!("expected query path, got {:?}", text),
    }
    assert_eq!(db.executed().len(), 1);
    // Router + synthesizer + checker
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn general_question_never_touches_the_runner() {
    let llm = ScriptedLlm::new(&[
        "NO TOOL",
        "This schema tracks customers and their revenue.",
    ]);
    let db = FakeDb::new(Some(CUSTOMERS_SCHEMA), RunBehavior::Rows(1));

    let response = pipeline(llm.clone(), db.clone())
        .process("What does this schema represent?")
        .await
        .unwrap();

    match response {
        PipelineResponse::General { text } => {
            assert!(text.contains("customers"));
        }
        PipelineResponse::Query { .. } => panic!("expected general path"),
    }
    assert!(db.executed().is_empty());
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn missing_schema_short_circuits_before_synthesis() {
    let llm = ScriptedLlm::new(&["TOOL: DB_QUERY"]);
    let db = FakeDb::new(None, RunBehavior::Rows(1));

    let err = pipeline(llm.clone(), db.clone())
        .process("How many customers are there?")
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::SchemaUnavailable));
    assert!(db.executed().is_empty());
    // Only the routing call happened.
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn empty_result_is_distinct_from_fault() {
    let llm = ScriptedLlm::new(&[
        "TOOL: DB_QUERY",
        "SELECT name FROM customers WHERE revenue > 1000000;",
        "CHECK: PASSED",
    ]);
    let db = FakeDb::new(Some(CUSTOMERS_SCHEMA), RunBehavior::Empty);

    let response = pipeline(llm, db)
        .process("Which customers made over a million?")
        .await
        .unwrap();

    let text = response.transport_text();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed["message"], export::EMPTY_RESULT_MESSAGE);
    assert!(parsed.get("error").is_none());
}

#[tokio::test]
async fn execution_fault_becomes_an_error_payload() {
    let llm = ScriptedLlm::new(&[
        "TOOL: DB_QUERY",
        "SELECT names FROM customers;",
        "CHECK: PASSED",
    ]);
    let db = FakeDb::new(
        Some(CUSTOMERS_SCHEMA),
        RunBehavior::Fault("column \"names\" does not exist"),
    );

    let response = pipeline(llm, db.clone())
        .process("List customer names")
        .await
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&response.transport_text()).unwrap();
    let msg = parsed["error"].as_str().unwrap();
    assert!(msg.contains("SQL execution failed"));
    assert!(msg.contains("does not exist"));
    assert_eq!(db.executed(), vec!["SELECT names FROM customers;"]);
}

#[tokio::test]
async fn connection_failure_is_a_distinct_error() {
    let llm = ScriptedLlm::new(&[
        "TOOL: DB_QUERY",
        "SELECT name FROM customers;",
        "CHECK: PASSED",
    ]);
    let db = FakeDb::new(Some(CUSTOMERS_SCHEMA), RunBehavior::ConnectionFailed);

    let err = pipeline(llm, db)
        .process("List customer names")
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ConnectionFailed(_)));
    assert_eq!(err.to_string(), "Database connection failed");
}

#[tokio::test]
async fn checker_verdict_gates_execution() {
    let llm = ScriptedLlm::new(&[
        "TOOL: DB_QUERY",
        "DELETE FROM customers;",
        "CHECK: FAILED",
    ]);
    let db = FakeDb::new(Some(CUSTOMERS_SCHEMA), RunBehavior::Rows(1));

    let err = pipeline(llm.clone(), db.clone())
        .process("Remove all customers")
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Rejected { .. }));
    assert!(db.executed().is_empty());
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn unparsable_sql_is_rejected_without_a_checker_call() {
    let llm = ScriptedLlm::new(&[
        "TOOL: DB_QUERY",
        "I cannot answer that from the schema.",
    ]);
    let db = FakeDb::new(Some(CUSTOMERS_SCHEMA), RunBehavior::Rows(1));

    let err = pipeline(llm.clone(), db.clone())
        .process("Something unanswerable")
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Rejected { .. }));
    assert!(db.executed().is_empty());
    // Routing + synthesis only; the precheck failed before the verdict call.
    assert_eq!(llm.call_count(), 2);
}

#[tokio::test]
async fn fenced_completion_is_unwrapped_before_execution() {
    let llm = ScriptedLlm::new(&[
        "TOOL: DB_QUERY",
        "Sure! Here you go:\n```sql\nSELECT count(*) FROM customers;\n```\nLet me know if you need more.",
        "CHECK: PASSED",
    ]);
    let db = FakeDb::new(Some(CUSTOMERS_SCHEMA), RunBehavior::Rows(1));

    pipeline(llm, db.clone())
        .process("How many customers?")
        .await
        .unwrap();

    assert_eq!(db.executed(), vec!["SELECT count(*) FROM customers;"]);
}
