//! HTTP boundary: one POST endpoint in front of the pipeline.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::pipeline::Pipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

/// Inbound request: a single free-text field. `query` is accepted as an
/// alias for `message`.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(alias = "query")]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AskReply {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AskReply {
    fn successful(text: String) -> Self {
        Self {
            status: "successful",
            agent_response: Some(text),
            error: None,
        }
    }

    fn unsuccessful(error: String) -> Self {
        Self {
            status: "unsuccessful",
            agent_response: None,
            error: Some(error),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/endpoint", post(ask))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: AppState, listen: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    tracing::info!(%listen, "askpg listening");
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

async fn hello() -> &'static str {
    "Hello from askpg"
}

/// The outer handling boundary: every pipeline failure becomes an
/// unsuccessful reply carrying the error's message, never a crash.
async fn ask(State(state): State<AppState>, Json(req): Json<AskRequest>) -> Json<AskReply> {
    tracing::info!("query received");
    match state.pipeline.process(&req.message).await {
        Ok(response) => Json(AskReply::successful(response.transport_text())),
        Err(e) => {
            tracing::error!(error = %e, "pipeline failed");
            Json(AskReply::unsuccessful(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accepts_query_alias() {
        let req: AskRequest = serde_json::from_str(r#"{"query": "hi"}"#).unwrap();
        assert_eq!(req.message, "hi");
        let req: AskRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert_eq!(req.message, "hi");
    }

    #[test]
    fn test_successful_reply_shape() {
        let json = serde_json::to_value(AskReply::successful("42 rows".into())).unwrap();
        assert_eq!(json["status"], "successful");
        assert_eq!(json["agent_response"], "42 rows");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_unsuccessful_reply_shape() {
        let json = serde_json::to_value(AskReply::unsuccessful("Database connection failed".into()))
            .unwrap();
        assert_eq!(json["status"], "unsuccessful");
        assert_eq!(json["error"], "Database connection failed");
        assert!(json.get("agent_response").is_none());
    }
}
