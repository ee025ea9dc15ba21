//! Model client.
//!
//! The pipeline only needs one capability from a provider: turn a fully
//! rendered prompt into a text completion. Providers are selected by
//! configuration so alternative hosts can be swapped in without touching
//! the orchestration code.

use std::sync::Arc;

use async_trait::async_trait;
use common::config::LlmConfig;
use common::errors::{AppError, AppResult};
use serde::Deserialize;
use tracing::debug;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Capability interface for a text-completion provider.
///
/// Each call is stateless: the prompt carries the entire needed context
/// inline, and no streaming or multi-turn API state is used.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Sends one prompt and returns the model's raw text response.
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}

/// Builds the configured provider.
///
/// `openai` covers any OpenAI-compatible chat-completions host (override
/// the base URL to target Groq-style or locally hosted endpoints).
pub fn build_model(config: &LlmConfig) -> AppResult<Arc<dyn CompletionModel>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiChatModel::new(config))),
        other => Err(AppError::Config(format!("unknown LLM provider: {}", other))),
    }
}

/// OpenAI-compatible chat-completions request payload.
#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(serde::Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Minimal subset of the chat-completions response we care about.
#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    content: String,
}

/// A [`CompletionModel`] backed by an OpenAI-compatible chat-completions API.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    url: String,
}

impl OpenAiChatModel {
    /// Creates a client from provider configuration.
    pub fn new(config: &LlmConfig) -> Self {
        let url = format!(
            "{}{}",
            config.api_base.trim_end_matches('/'),
            CHAT_COMPLETIONS_PATH
        );
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            url,
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAiChatModel {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        let request = ApiRequest {
            model: &self.model,
            messages: vec![ApiMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ModelService(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ModelService(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| AppError::ModelService(format!("malformed response: {}", e)))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::ModelService("response contained no choices".into()))?;

        debug!(model = %self.model, chars = text.len(), "completion received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.to_string(),
            api_key: "test-key".into(),
            api_base: "https://api.openai.com/".into(),
            model: "gpt-3.5-turbo-0125".into(),
        }
    }

    #[test]
    fn openai_provider_is_selectable() {
        assert!(build_model(&config("openai")).is_ok());
    }

    #[test]
    fn unknown_provider_is_a_config_error() {
        // The Ok side is a trait object without Debug, so match on the error.
        let err = build_model(&config("palantir")).err().expect("must not build");
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let model = OpenAiChatModel::new(&config("openai"));
        assert_eq!(model.url, "https://api.openai.com/v1/chat/completions");
    }
}
