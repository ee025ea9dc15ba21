//! Service configuration.
//!
//! All configuration is read from the process environment at startup.
//! Database credentials are deliberately *not* part of this config: they
//! are entered per session through the connect endpoint and live only in
//! session memory.

use crate::errors::{AppError, AppResult};

/// Server and pool configuration shared by the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name used in logs and response metadata.
    pub service_name: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Timeout in seconds when acquiring a database connection.
    pub connect_timeout_secs: u64,
    /// Maximum connections per session pool.
    pub max_connections: u32,
}

impl AppConfig {
    /// Loads configuration from the environment for the given service.
    ///
    /// Environment variables:
    /// - `SERVER_HOST` (default `0.0.0.0`)
    /// - `SERVER_PORT` (default set by the service binary)
    /// - `CONNECT_TIMEOUT_SECS` (default `10`)
    /// - `MAX_CONNECTIONS` (default `5`)
    pub fn load_with_service(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            host: env_or("SERVER_HOST", "0.0.0.0"),
            port: env_parsed("SERVER_PORT", 8080),
            connect_timeout_secs: env_parsed("CONNECT_TIMEOUT_SECS", 10),
            max_connections: env_parsed("MAX_CONNECTIONS", 5),
        }
    }
}

/// Model provider configuration.
///
/// The provider is selected by name so alternative hosts can be swapped in
/// without code changes (any OpenAI-compatible endpoint works via
/// `LLM_API_BASE`).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Provider name, currently `openai` (any compatible host).
    pub provider: String,
    /// API key, sent as a bearer token.
    pub api_key: String,
    /// Base URL of the chat-completions API.
    pub api_base: String,
    /// Model identifier passed in each request.
    pub model: String,
}

impl LlmConfig {
    /// Loads model provider settings from the environment.
    ///
    /// `LLM_API_KEY` is required; everything else has a default:
    /// - `LLM_PROVIDER` (default `openai`)
    /// - `LLM_API_BASE` (default `https://api.openai.com`)
    /// - `LLM_MODEL` (default `gpt-3.5-turbo-0125`)
    pub fn from_env() -> AppResult<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| AppError::Config("LLM_API_KEY is not set".into()))?;
        Ok(Self {
            provider: env_or("LLM_PROVIDER", "openai"),
            api_key,
            api_base: env_or("LLM_API_BASE", "https://api.openai.com"),
            model: env_or("LLM_MODEL", "gpt-3.5-turbo-0125"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
