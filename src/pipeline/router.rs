//! Query routing: does this question need the database?

use anyhow::Result;

use crate::config::LlmConfig;
use crate::llm::{ChatMessage, LlmClient};

use super::prompts;

/// Token cap for the routing completion; the answer is a short literal.
const ROUTING_MAX_TOKENS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingDecision {
    NeedsQuery,
    NoToolNeeded,
}

/// Derive the decision from the raw routing completion.
///
/// Presence of the DB literal anywhere in the output means NeedsQuery;
/// everything else, malformed output included, defaults to NoToolNeeded.
pub fn decision_from(raw: &str) -> RoutingDecision {
    if raw.contains(prompts::ROUTE_DB_LITERAL) {
        RoutingDecision::NeedsQuery
    } else {
        RoutingDecision::NoToolNeeded
    }
}

/// Classify a natural-language query with one LLM completion.
pub async fn classify(
    llm: &dyn LlmClient,
    config: &LlmConfig,
    query: &str,
) -> Result<RoutingDecision> {
    let messages = [
        ChatMessage::system(prompts::ROUTER_SYSTEM_PROMPT),
        ChatMessage::user(prompts::routing_prompt(query)),
    ];
    let raw = llm
        .complete(&config.routing_model, &messages, Some(ROUTING_MAX_TOKENS))
        .await?;
    let decision = decision_from(&raw);
    tracing::debug!(raw = %raw.trim(), ?decision, "routing decision");
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_literal_routes_to_query() {
        assert_eq!(decision_from("TOOL: DB_QUERY"), RoutingDecision::NeedsQuery);
        assert_eq!(
            decision_from("I think TOOL: DB_QUERY fits here"),
            RoutingDecision::NeedsQuery
        );
    }

    #[test]
    fn test_anything_else_routes_to_general() {
        assert_eq!(decision_from("NO TOOL"), RoutingDecision::NoToolNeeded);
        assert_eq!(decision_from(""), RoutingDecision::NoToolNeeded);
        assert_eq!(
            decision_from("tool: db_query"),
            RoutingDecision::NoToolNeeded
        );
        assert_eq!(
            decision_from("some unexpected rambling"),
            RoutingDecision::NoToolNeeded
        );
    }
}
