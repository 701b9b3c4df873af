//! Gemini API HTTP client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::error::{Error, RemoteError, Result};

use super::model::{ChatModel, Conversation};
use super::types::*;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini generateContent client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout_secs: u64,
    max_retries: u32,
    retry_delay: Duration,
    generation: GenerationConfig,
}

impl GeminiClient {
    /// Create a new client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            generation: GenerationConfig::default(),
        })
    }

    /// Create with custom base URL (for testing or custom endpoints)
    pub fn with_base_url(config: &LlmConfig, base_url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(client)
    }

    fn endpoint(&self) -> String {
        let model_name = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        format!("{}/{}:generateContent", self.base_url, model_name)
    }

    fn build_request(&self, conversation: &Conversation, text: &str) -> GenerateContentRequest {
        let mut contents: Vec<Content> = conversation.turns().iter().map(Content::from).collect();
        contents.push(Content::text(Some("user"), text));

        GenerateContentRequest {
            contents,
            system_instruction: conversation
                .instruction()
                .map(|instruction| Content::text(None, instruction)),
            generation_config: self.generation.clone(),
        }
    }

    /// Send one request, retrying transient failures
    async fn generate(
        &self,
        request: &GenerateContentRequest,
    ) -> std::result::Result<String, RemoteError> {
        let mut attempts = 0;
        loop {
            match self.generate_once(request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempts < self.max_retries => {
                    attempts += 1;
                    warn!(
                        "Gemini request failed, retrying (attempt {}/{}): {}",
                        attempts, self.max_retries, e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn generate_once(
        &self,
        request: &GenerateContentRequest,
    ) -> std::result::Result<String, RemoteError> {
        let url = self.endpoint();
        debug!(
            "Sending request to Gemini API: {} ({} turns)",
            url,
            request.contents.len()
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Gemini API quota error: {}", body);
            return Err(RemoteError::Quota(body));
        }
        if !status.is_success() {
            warn!("Gemini API error: {} - {}", status, body);
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|e| {
            RemoteError::InvalidResponse(format!("Failed to parse response: {} - {}", e, body))
        })?;

        if let Some(err) = parsed.error.as_ref() {
            return Err(RemoteError::Status {
                status: err.code.unwrap_or(status.as_u16()),
                body: err.message.clone(),
            });
        }
        if let Some(reason) = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
        {
            return Err(RemoteError::Blocked(reason));
        }

        match parsed.text() {
            Some(text) => {
                info!(
                    "Gemini API response: finish_reason={:?}, chars={}",
                    parsed.finish_reason(),
                    text.len()
                );
                Ok(text)
            }
            None => match parsed.finish_reason() {
                Some(reason) if reason != "STOP" => Err(RemoteError::Blocked(reason.to_string())),
                _ => Err(RemoteError::InvalidResponse(
                    "No candidates in response".to_string(),
                )),
            },
        }
    }

    fn classify(&self, err: reqwest::Error) -> RemoteError {
        if err.is_timeout() {
            RemoteError::Timeout(self.timeout_secs)
        } else {
            RemoteError::Transport(err)
        }
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn send(
        &self,
        conversation: &mut Conversation,
        text: &str,
    ) -> std::result::Result<String, RemoteError> {
        let request = self.build_request(conversation, text);
        let reply = self.generate(&request).await?;
        conversation.record_exchange(text, reply.clone());
        Ok(reply)
    }
}
