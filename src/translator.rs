use crate::config::Config;
use crate::error::TranslatorError;
use crate::retry::{with_retry_if, RetryConfig};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// External service translating text between two locale codes.
#[async_trait]
pub trait MachineTranslator: Send + Sync {
    async fn translate(&self, text: &str, from: &str, to: &str)
        -> Result<String, TranslatorError>;
}

/// OpenAI Chat Completion request for translation
#[derive(Debug, Serialize)]
struct TranslationRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Check if a model is a reasoning model that doesn't support temperature
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("gpt-5")
        || model.starts_with("o1")
        || model.starts_with("o3")
        || model.starts_with("o4")
}

/// Build the system prompt for translating between two locale codes
fn build_translation_system_prompt(from: &str, to: &str) -> String {
    format!(
        r#"You are a professional translator for user interface text. Translate the user's message from the locale "{}" to the locale "{}".

Rules:
- Output only the translation, with no quotes, notes or explanations
- Keep placeholders such as :name or {{count}} exactly as written
- Preserve punctuation, capitalization style and surrounding whitespace
- If the text is already in the target language, return it unchanged"#,
        from, to
    )
}

/// Machine translator backed by an OpenAI-compatible chat completions API
#[derive(Debug, Clone)]
pub struct OpenAiTranslator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
    retry: RetryConfig,
}

impl OpenAiTranslator {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        api_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TranslatorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(TranslatorError::Http)?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            api_url: api_url.into(),
            retry: RetryConfig::translator(),
        })
    }

    /// Build a translator from configuration
    ///
    /// Fails with `NotConfigured` if no API key is set.
    pub fn from_config(config: &Config) -> Result<Self, TranslatorError> {
        let api_key = config
            .openai_api_key
            .clone()
            .ok_or(TranslatorError::NotConfigured)?;

        Self::new(
            api_key,
            config.openai_model.clone(),
            config.openai_api_url.clone(),
            config.translator_timeout,
        )
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn request_once(
        &self,
        request: &TranslationRequest,
    ) -> Result<String, TranslatorError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(TranslatorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat_response: ChatResponse = response.json().await?;

        let translated = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| {
                TranslatorError::MalformedResponse("response contained no choices".to_string())
            })?;

        let translated = translated.trim();
        if translated.is_empty() {
            return Err(TranslatorError::EmptyResponse);
        }

        Ok(translated.to_string())
    }
}

#[async_trait]
impl MachineTranslator for OpenAiTranslator {
    async fn translate(
        &self,
        text: &str,
        from: &str,
        to: &str,
    ) -> Result<String, TranslatorError> {
        let is_reasoning = is_reasoning_model(&self.model);

        let request = TranslationRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: build_translation_system_prompt(from, to),
                },
                Message {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            // Reasoning models don't support temperature
            temperature: if is_reasoning { None } else { Some(0.2) },
        };

        debug!(from, to, chars = text.chars().count(), "Requesting machine translation");

        with_retry_if(
            &self.retry,
            &format!("Translation {} -> {}", from, to),
            || self.request_once(&request),
            TranslatorError::is_retryable,
        )
        .await
    }
}
