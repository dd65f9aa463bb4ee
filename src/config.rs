use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::db::ConnectionConfig;

/// Model selection and endpoint for the completion API.
///
/// The API key is never stored in the config file; it is resolved from the
/// environment (`ASKPG_API_KEY`, falling back to `GROQ_API_KEY`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_routing_model")]
    pub routing_model: String,
    #[serde(default = "default_general_model")]
    pub sql_model: String,
    #[serde(default = "default_general_model")]
    pub general_model: String,
    #[serde(default = "default_general_model")]
    pub checker_model: String,
}

fn default_base_url() -> String {
    crate::llm::openai::DEFAULT_BASE_URL.to_string()
}

fn default_routing_model() -> String {
    String::from("llama3-70b-8192")
}

fn default_general_model() -> String {
    String::from("llama3-70b-8192")
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            routing_model: default_routing_model(),
            sql_model: default_general_model(),
            general_model: default_general_model(),
            checker_model: default_general_model(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    /// Named connection profiles; `default_connection` selects one by name.
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default)]
    pub default_connection: Option<String>,
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("askpg")
            .join("config.toml")
    }

    /// Load the config file, or defaults when it does not exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Find a connection profile by name, or the default profile.
    pub fn connection(&self, name: Option<&str>) -> Option<ConnectionConfig> {
        let wanted = name.or(self.default_connection.as_deref());
        match wanted {
            Some(n) => self
                .connections
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(n))
                .cloned(),
            None => self.connections.first().cloned(),
        }
    }

    /// Resolve the API key from the environment.
    pub fn api_key() -> Result<String> {
        std::env::var("ASKPG_API_KEY")
            .or_else(|_| std::env::var("GROQ_API_KEY"))
            .context("ASKPG_API_KEY (or GROQ_API_KEY) environment variable not set")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_models() {
        let llm = LlmConfig::default();
        assert_eq!(llm.routing_model, "llama3-70b-8192");
        assert_eq!(llm.sql_model, llm.general_model);
        assert!(llm.base_url.starts_with("https://"));
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            default_connection = "staging"

            [llm]
            routing_model = "mixtral-8x7b-32768"

            [[connections]]
            name = "staging"
            host = "db.staging.internal"
            port = 5432
            database = "app"
            username = "reader"
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.routing_model, "mixtral-8x7b-32768");
        // Unspecified fields fall back to defaults
        assert_eq!(config.llm.general_model, "llama3-70b-8192");
        assert_eq!(config.connections.len(), 1);
        assert_eq!(config.connections[0].schema, "public");
    }

    #[test]
    fn test_connection_lookup() {
        let config: AppConfig = toml::from_str(
            r#"
            default_connection = "two"

            [[connections]]
            name = "one"
            host = "a"
            port = 5432
            database = "d"
            username = "u"

            [[connections]]
            name = "two"
            host = "b"
            port = 5432
            database = "d"
            username = "u"
            "#,
        )
        .unwrap();
        assert_eq!(config.connection(Some("ONE")).unwrap().host, "a");
        assert_eq!(config.connection(None).unwrap().host, "b");
        assert!(config.connection(Some("missing")).is_none());
    }
}
