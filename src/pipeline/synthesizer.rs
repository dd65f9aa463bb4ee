//! SQL synthesis: natural language + schema snapshot → one SQL statement.

use crate::config::LlmConfig;
use crate::llm::{ChatMessage, LlmClient};

use super::{fence, prompts, PipelineError};

/// Ask the model for a SQL statement answering `query` against `schema`.
///
/// An empty schema short-circuits with `SchemaUnavailable` before any LLM
/// call. The completion may wrap the statement in a Markdown fence; the
/// extracted (or whole, trimmed) text is returned verbatim — validation is
/// the checker's job.
pub async fn synthesize(
    llm: &dyn LlmClient,
    config: &LlmConfig,
    query: &str,
    schema: &str,
) -> Result<String, PipelineError> {
    if schema.trim().is_empty() {
        return Err(PipelineError::SchemaUnavailable);
    }

    let messages = [
        ChatMessage::system(prompts::schema_context(schema)),
        ChatMessage::system(prompts::SQL_CREATOR_INSTRUCTION),
        ChatMessage::user(query.to_string()),
    ];
    let raw = llm
        .complete(&config.sql_model, &messages, None)
        .await
        .map_err(PipelineError::Llm)?;

    let sql = fence::extract_sql(&raw);
    tracing::debug!(raw = %raw.trim(), extracted = %sql, "synthesized SQL");
    Ok(sql)
}
