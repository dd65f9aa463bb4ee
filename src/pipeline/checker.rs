//! Statement checking before execution.
//!
//! Two gates: a syntactic precheck with a real SQL parser (no LLM cost for
//! obviously broken output), then an LLM verdict against the schema and the
//! user's intent. A verdict that does not contain the pass literal fails
//! closed.

use anyhow::Result;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser as SqlParser;

use crate::config::LlmConfig;
use crate::llm::{ChatMessage, LlmClient};

use super::prompts;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed { reason: String },
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

/// Parse the candidate with the PostgreSQL dialect and require exactly one
/// statement.
pub fn syntactic_precheck(sql: &str) -> Result<(), String> {
    let dialect = PostgreSqlDialect {};
    let statements =
        SqlParser::parse_sql(&dialect, sql).map_err(|e| format!("SQL parse error: {}", e))?;
    match statements.len() {
        1 => Ok(()),
        n => Err(format!("Expected 1 statement, found {}", n)),
    }
}

/// Derive a verdict from the raw checker completion.
pub fn verdict_from(raw: &str) -> Verdict {
    if raw.contains(prompts::CHECK_PASSED_LITERAL) {
        Verdict::Passed
    } else {
        Verdict::Failed {
            reason: format!("checker verdict: {}", raw.trim()),
        }
    }
}

/// Check a synthesized statement against the schema and the original query.
pub async fn check(
    llm: &dyn LlmClient,
    config: &LlmConfig,
    sql: &str,
    schema: &str,
    query: &str,
) -> Result<Verdict> {
    if let Err(reason) = syntactic_precheck(sql) {
        tracing::debug!(%reason, "precheck rejected statement");
        return Ok(Verdict::Failed { reason });
    }

    let messages = [
        ChatMessage::system(prompts::checker_system_prompt()),
        ChatMessage::user(prompts::checker_prompt(sql, schema, query)),
    ];
    let raw = llm.complete(&config.checker_model, &messages, None).await?;
    let verdict = verdict_from(&raw);
    tracing::debug!(raw = %raw.trim(), ?verdict, "checker verdict");
    Ok(verdict)
}
