use std::sync::Arc;

use anyhow::Context;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::{config::OpenAIConfig, Client as AsyncOpenAiClient};
use async_trait::async_trait;
use tracing::instrument;

use crate::config::IntentConfig;

pub type SharedLlmClient = Arc<dyn LlmClient>;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String>;
}

/// OpenAI-compatible client that can point at OpenAI, vLLM, or any HTTP-compatible backend.
/// Requests run at temperature 0 with a fixed seed so repeated runs stay comparable.
pub struct OpenAiLlmClient {
    client: AsyncOpenAiClient<OpenAIConfig>,
    model: String,
    seed: i64,
}

impl OpenAiLlmClient {
    pub fn shared(config: &IntentConfig) -> anyhow::Result<SharedLlmClient> {
        Ok(Arc::new(Self::from_config(config)?))
    }

    pub fn from_config(config: &IntentConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: AsyncOpenAiClient::with_config(Self::build_openai_config(config)?),
            model: config.llm_model.clone(),
            seed: config.llm_seed,
        })
    }

    fn build_openai_config(config: &IntentConfig) -> anyhow::Result<OpenAIConfig> {
        let api_key = config
            .openai_api_key
            .clone()
            .context("Set OPENAI_API_KEY (or INTENT_OPENAI_API_KEY) to enable enrichment")?;

        let mut openai = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base_url) = &config.openai_base_url {
            openai = openai.with_api_base(base_url);
        }
        Ok(openai)
    }

    #[instrument(level = "debug", skip_all, fields(model = %self.model))]
    async fn chat(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        let system_message = ChatCompletionRequestSystemMessageArgs::default()
            .content(system)
            .build()?;
        let user_message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(0.0)
            .seed(self.seed)
            .messages(vec![system_message.into(), user_message.into()])
            .build()?;

        let response = self.client.chat().create(request).await?;
        let choice = response
            .choices
            .first()
            .context("LLM response did not contain any choices")?;

        choice
            .message
            .content
            .clone()
            .context("LLM response contained no message content")
    }
}

#[async_trait]
impl LlmClient for OpenAiLlmClient {
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        self.chat(system, prompt).await
    }
}

/// Build the configured client. Returns `None` when enrichment is switched off
/// or no credential is present, so callers can record a skip instead of failing.
pub fn build_llm_client(config: &IntentConfig) -> Option<SharedLlmClient> {
    if !config.enrichment_available() {
        return None;
    }
    match OpenAiLlmClient::shared(config) {
        Ok(client) => Some(client),
        Err(err) => {
            tracing::warn!(?err, "enrichment client unavailable");
            None
        }
    }
}

/// Strip a surrounding Markdown code fence (with or without a language tag).
pub fn unwrap_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    match body.find('\n') {
        Some(newline) if !body[..newline].trim_start().starts_with('{') => body[newline + 1..].trim(),
        _ => body.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fences_are_removed_with_or_without_language() {
        assert_eq!(unwrap_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(unwrap_fences("```\n{}\n```"), "{}");
        assert_eq!(unwrap_fences("  {\"plain\": true} "), "{\"plain\": true}");
        assert_eq!(unwrap_fences("```{\"inline\": 1}```"), "{\"inline\": 1}");
    }

    #[test]
    fn client_is_absent_without_credentials() {
        let config = IntentConfig::default();
        assert!(build_llm_client(&config).is_none());
    }

    #[test]
    fn openai_config_requires_a_key() {
        let config = IntentConfig::default();
        assert!(OpenAiLlmClient::from_config(&config).is_err());

        let config = IntentConfig {
            openai_api_key: Some("sk-test".to_string()),
            ..IntentConfig::default()
        };
        assert!(OpenAiLlmClient::from_config(&config).is_ok());
    }
}
