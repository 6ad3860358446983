use std::fmt;

use anyhow::{Context as _, anyhow};

pub const DEFAULT_CATALOG_URL: &str = "sqlite:movies.db?mode=rwc";
pub const DEFAULT_MODEL_NAME: &str = "meta-llama/llama-3.1-8b-instruct";
pub const DEFAULT_MAX_NEW_TOKENS: u64 = 300;
pub const DEFAULT_PORT: u16 = 3000;

/// Configuration for the movie Q&A service, read from the environment
#[derive(Clone)]
pub struct ServiceConfig {
    pub catalog_database_url: String,
    pub openrouter_api_key: String,
    pub model_name: String,
    pub max_new_tokens: u64,
    pub port: u16,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("catalog_database_url", &self.catalog_database_url)
            .field("openrouter_api_key", &"<redacted>")
            .field("model_name", &self.model_name)
            .field("max_new_tokens", &self.max_new_tokens)
            .field("port", &self.port)
            .finish()
    }
}

impl ServiceConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let openrouter_api_key = lookup("OPENROUTER_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| anyhow!("OPENROUTER_API_KEY not set"))?;

        let max_new_tokens = match lookup("MAX_NEW_TOKENS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("MAX_NEW_TOKENS must be a positive integer, got {raw:?}"))?,
            None => DEFAULT_MAX_NEW_TOKENS,
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got {raw:?}"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            catalog_database_url: lookup("CATALOG_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string()),
            openrouter_api_key,
            model_name: lookup("MODEL_NAME").unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            max_new_tokens,
            port,
        })
    }
}
