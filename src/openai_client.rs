// OpenAI Chat Completions client used for script analysis.

use crate::error::ProviderError;
use backoff::{future::retry, ExponentialBackoff};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4-turbo-preview".to_string(),
        }
    }

    /// Run a single JSON-mode completion and return the raw message content.
    /// Transient failures (connection errors, 429/5xx) are retried with
    /// exponential backoff before giving up.
    pub async fn json_completion(
        &self,
        system: &str,
        prompt: &str,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: 0.7,
            max_tokens: 4000,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let backoff_config = ExponentialBackoff {
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(30),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(120)),
            ..Default::default()
        };

        let operation = || async {
            let response = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .timeout(Duration::from_secs(60))
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    let err = ProviderError::Request(e);
                    if err.is_transient() {
                        tracing::warn!("OpenAI connection error (retrying): {}", err);
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })?;

            let status = response.status();
            let body = response.text().await.map_err(|e| {
                backoff::Error::permanent(ProviderError::Request(e))
            })?;

            if !status.is_success() {
                let err = ProviderError::Api {
                    provider: "openai",
                    status: status.as_u16(),
                    body,
                };
                return if err.is_transient() {
                    tracing::warn!("OpenAI returned {} (retrying)", status);
                    Err(backoff::Error::transient(err))
                } else {
                    Err(backoff::Error::permanent(err))
                };
            }

            let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
                backoff::Error::permanent(ProviderError::InvalidResponse {
                    provider: "openai",
                    message: e.to_string(),
                })
            })?;

            parsed
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| {
                    backoff::Error::permanent(ProviderError::InvalidResponse {
                        provider: "openai",
                        message: "empty choices array".to_string(),
                    })
                })
        };

        retry(backoff_config, operation).await
    }
}
