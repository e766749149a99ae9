// Stability AI client for SDXL text-to-image generation.
// Character sheets render at 1024x1024, scene backgrounds at 1024x576.

use crate::error::ProviderError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ENGINE: &str = "stable-diffusion-xl-1024-v1-0";

#[derive(Debug, Clone)]
pub struct StabilityClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
pub struct TextToImageRequest {
    pub text_prompts: Vec<TextPrompt>,
    pub cfg_scale: u32,
    pub height: u32,
    pub width: u32,
    pub samples: u32,
    pub steps: u32,
}

#[derive(Debug, Serialize)]
pub struct TextPrompt {
    pub text: String,
    pub weight: f32,
}

#[derive(Debug, Deserialize)]
pub struct TextToImageResponse {
    pub artifacts: Vec<ImageArtifact>,
}

#[derive(Debug, Deserialize)]
pub struct ImageArtifact {
    pub base64: String,
}

impl StabilityClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: "https://api.stability.ai/v1".to_string(),
        }
    }

    /// Generate a single image and return it as a base64-encoded PNG.
    pub async fn text_to_image(
        &self,
        prompt: &str,
        negative_prompt: &str,
        width: u32,
        height: u32,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/generation/{}/text-to-image", self.base_url, ENGINE);

        let request = TextToImageRequest {
            text_prompts: vec![
                TextPrompt {
                    text: prompt.to_string(),
                    weight: 1.0,
                },
                TextPrompt {
                    text: negative_prompt.to_string(),
                    weight: -1.0,
                },
            ],
            cfg_scale: 7,
            height,
            width,
            samples: 1,
            steps: 30,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(60))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: "stability",
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TextToImageResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse {
                provider: "stability",
                message: e.to_string(),
            }
        })?;

        parsed
            .artifacts
            .into_iter()
            .next()
            .map(|a| a.base64)
            .ok_or(ProviderError::InvalidResponse {
                provider: "stability",
                message: "no artifacts in response".to_string(),
            })
    }
}
