// Replicate client for scene animation (image-to-video prediction + poll).

use crate::error::ProviderError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const POLL_INTERVAL_SECS: u64 = 5;
const MAX_POLL_ATTEMPTS: u32 = 60;

#[derive(Debug, Clone)]
pub struct ReplicateClient {
    client: Client,
    api_token: String,
    base_url: String,
    model_version: String,
}

#[derive(Debug, Serialize)]
pub struct PredictionRequest {
    pub version: String,
    pub input: PredictionInput,
}

#[derive(Debug, Serialize)]
pub struct PredictionInput {
    pub image: String,
    pub motion_bucket_id: u32,
    pub fps: u32,
    pub num_frames: u32,
    pub cond_aug: f64,
}

#[derive(Debug, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: String, // "starting" | "processing" | "succeeded" | "failed" | "canceled"
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl ReplicateClient {
    pub fn new(api_token: String) -> Self {
        Self {
            client: Client::new(),
            api_token,
            base_url: "https://api.replicate.com/v1".to_string(),
            model_version: std::env::var("REPLICATE_MODEL_VERSION")
                .unwrap_or_else(|_| "stable-video-diffusion".to_string()),
        }
    }

    /// Kick off an image-to-video prediction and poll until it resolves.
    /// Returns the output video URL.
    pub async fn animate_image(
        &self,
        image_url: &str,
        duration_seconds: u32,
    ) -> Result<String, ProviderError> {
        let request = PredictionRequest {
            version: self.model_version.clone(),
            input: PredictionInput {
                image: image_url.to_string(),
                motion_bucket_id: 127,
                fps: 24,
                num_frames: duration_seconds * 24,
                cond_aug: 0.02,
            },
        };

        let response = self
            .client
            .post(format!("{}/predictions", self.base_url))
            .header("Authorization", format!("Token {}", self.api_token))
            .timeout(Duration::from_secs(120))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: "replicate",
                status: status.as_u16(),
                body,
            });
        }

        let prediction: Prediction = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse {
                provider: "replicate",
                message: e.to_string(),
            }
        })?;

        self.poll_prediction(&prediction.id).await
    }

    async fn poll_prediction(&self, prediction_id: &str) -> Result<String, ProviderError> {
        for attempt in 0..MAX_POLL_ATTEMPTS {
            tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;

            let response = self
                .client
                .get(format!("{}/predictions/{}", self.base_url, prediction_id))
                .header("Authorization", format!("Token {}", self.api_token))
                .timeout(Duration::from_secs(30))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(
                    "Replicate poll {} returned {} (attempt {}/{})",
                    prediction_id,
                    status,
                    attempt + 1,
                    MAX_POLL_ATTEMPTS
                );
                continue;
            }

            let prediction: Prediction = response.json().await.map_err(|e| {
                ProviderError::InvalidResponse {
                    provider: "replicate",
                    message: e.to_string(),
                }
            })?;

            match prediction.status.as_str() {
                "succeeded" => {
                    return extract_output_url(prediction.output).ok_or(
                        ProviderError::InvalidResponse {
                            provider: "replicate",
                            message: "succeeded prediction without output url".to_string(),
                        },
                    );
                }
                "failed" | "canceled" => {
                    return Err(ProviderError::GenerationFailed {
                        provider: "replicate",
                        message: prediction
                            .error
                            .unwrap_or_else(|| prediction.status.clone()),
                    });
                }
                _ => {} // starting / processing
            }
        }

        Err(ProviderError::PollTimeout {
            provider: "replicate",
            attempts: MAX_POLL_ATTEMPTS,
        })
    }
}

/// Replicate returns either a bare URL string or an array of URLs.
fn extract_output_url(output: Option<serde_json::Value>) -> Option<String> {
    match output? {
        serde_json::Value::String(url) => Some(url),
        serde_json::Value::Array(items) => items
            .into_iter()
            .find_map(|v| v.as_str().map(|s| s.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn output_url_from_string() {
        let out = extract_output_url(Some(json!("https://cdn.example.com/v.mp4")));
        assert_eq!(out.as_deref(), Some("https://cdn.example.com/v.mp4"));
    }

    #[test]
    fn output_url_from_array() {
        let out = extract_output_url(Some(json!(["https://cdn.example.com/a.mp4", "x"])));
        assert_eq!(out.as_deref(), Some("https://cdn.example.com/a.mp4"));
    }

    #[test]
    fn output_url_missing() {
        assert_eq!(extract_output_url(None), None);
        assert_eq!(extract_output_url(Some(json!(42))), None);
    }
}
