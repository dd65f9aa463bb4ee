//! The request pipeline: route, synthesize, check, execute, encode.
//!
//! Each request is an independent sequential chain with no shared mutable
//! state; the only suspension points are the LLM and database calls.

pub mod checker;
pub mod fence;
pub mod prompts;
pub mod router;
pub mod synthesizer;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::db::{self, ConnectionConfig, QueryOutcome};
use crate::export;
use crate::llm::{ChatMessage, LlmClient};

pub use checker::Verdict;
pub use router::RoutingDecision;

/// Typed failure threaded through every stage; replaces a catch-all boundary
/// so callers keep the fault kind and message.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to retrieve schema.")]
    SchemaUnavailable,
    #[error("Database connection failed")]
    ConnectionFailed(#[source] anyhow::Error),
    #[error("LLM call failed: {0}")]
    Llm(#[source] anyhow::Error),
    #[error("SQL check failed: {reason}")]
    Rejected { reason: String },
}

/// Provides a fresh schema snapshot per request.
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Describe all tables and columns; `SchemaUnavailable` when there is
    /// nothing to describe.
    async fn describe(&self) -> Result<String, PipelineError>;
}

/// Runs one statement on a scoped connection.
#[async_trait]
pub trait StatementRunner: Send + Sync {
    /// `Err(ConnectionFailed)` when no client is obtainable; execution-time
    /// faults come back as `QueryOutcome::Fault`, never as `Err`.
    async fn run(&self, sql: &str) -> Result<QueryOutcome, PipelineError>;
}

/// The real database behind both seams: opens a client per call and drops it
/// when the call returns.
pub struct PgDatabase {
    config: ConnectionConfig,
}

impl PgDatabase {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SchemaSource for PgDatabase {
    async fn describe(&self) -> Result<String, PipelineError> {
        let client = db::create_client(&self.config)
            .await
            .map_err(PipelineError::ConnectionFailed)?;
        let snapshot = db::schema::describe_schema(&client, &self.config.schema)
            .await
            .map_err(|_| PipelineError::SchemaUnavailable)?;
        if snapshot.trim().is_empty() {
            return Err(PipelineError::SchemaUnavailable);
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl StatementRunner for PgDatabase {
    async fn run(&self, sql: &str) -> Result<QueryOutcome, PipelineError> {
        let client = db::create_client(&self.config)
            .await
            .map_err(PipelineError::ConnectionFailed)?;
        Ok(db::query::execute_statement(&client, sql).await)
    }
}

/// What the pipeline produced for one request.
#[derive(Debug)]
pub enum PipelineResponse {
    /// The general-answer path: free text from the model.
    General { text: String },
    /// The database path: the executed statement and its outcome.
    Query { sql: String, outcome: QueryOutcome },
}

impl PipelineResponse {
    /// The transport form: general answers verbatim, query outcomes as JSON.
    pub fn transport_text(&self) -> String {
        match self {
            PipelineResponse::General { text } => text.clone(),
            PipelineResponse::Query { outcome, .. } => export::outcome_to_json(outcome),
        }
    }
}

pub struct Pipeline {
    llm: Arc<dyn LlmClient>,
    llm_config: LlmConfig,
    schemas: Arc<dyn SchemaSource>,
    runner: Arc<dyn StatementRunner>,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        llm_config: LlmConfig,
        schemas: Arc<dyn SchemaSource>,
        runner: Arc<dyn StatementRunner>,
    ) -> Self {
        Self {
            llm,
            llm_config,
            schemas,
            runner,
        }
    }

    /// Wire a pipeline to a real database; the same `PgDatabase` serves as
    /// schema source and statement runner.
    pub fn for_database(
        llm: Arc<dyn LlmClient>,
        llm_config: LlmConfig,
        db_config: ConnectionConfig,
    ) -> Self {
        let database = Arc::new(PgDatabase::new(db_config));
        Self::new(llm, llm_config, database.clone(), database)
    }

    /// Handle one natural-language query end to end.
    pub async fn process(&self, query: &str) -> Result<PipelineResponse, PipelineError> {
        let decision = router::classify(self.llm.as_ref(), &self.llm_config, query)
            .await
            .map_err(PipelineError::Llm)?;
        tracing::info!(?decision, "routed query");

        match decision {
            RoutingDecision::NeedsQuery => self.run_db_query(query).await,
            RoutingDecision::NoToolNeeded => self.run_general(query).await,
        }
    }

    async fn run_db_query(&self, query: &str) -> Result<PipelineResponse, PipelineError> {
        let schema = self.schemas.describe().await?;
        let sql =
            synthesizer::synthesize(self.llm.as_ref(), &self.llm_config, query, &schema).await?;

        let verdict = checker::check(self.llm.as_ref(), &self.llm_config, &sql, &schema, query)
            .await
            .map_err(PipelineError::Llm)?;
        if let Verdict::Failed { reason } = verdict {
            return Err(PipelineError::Rejected { reason });
        }

        let outcome = self.runner.run(&sql).await?;
        if let QueryOutcome::Fault(err) = &outcome {
            tracing::warn!(%err, "statement execution fault");
        }
        Ok(PipelineResponse::Query { sql, outcome })
    }

    async fn run_general(&self, query: &str) -> Result<PipelineResponse, PipelineError> {
        // Schema context is best effort here; only synthesis hard-fails on a
        // missing schema.
        let schema = match self.schemas.describe().await {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(%e, "no schema context for general answer");
                String::from("(schema unavailable)")
            }
        };

        let messages = [
            ChatMessage::system(prompts::GENERAL_SYSTEM_PROMPT),
            ChatMessage::user(prompts::general_prompt(query, &schema)),
        ];
        let text = self
            .llm
            .complete(&self.llm_config.general_model, &messages, None)
            .await
            .map_err(PipelineError::Llm)?;
        Ok(PipelineResponse::General { text })
    }
}
