// Eleven Labs text-to-speech client for scene dialogue audio.

use crate::error::ProviderError;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ElevenLabsClient {
    api_key: String,
    client: Client,
    base_url: String,
}

#[derive(Serialize, Debug)]
pub struct TextToSpeechRequest {
    pub text: String,
    pub model_id: String,
    pub voice_settings: VoiceSettings,
}

#[derive(Serialize, Debug)]
pub struct VoiceSettings {
    pub stability: f64,
    pub similarity_boost: f64,
}

impl ElevenLabsClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
            base_url: "https://api.elevenlabs.io/v1".to_string(),
        }
    }

    /// Generate speech for a dialogue passage, returning MP3 bytes.
    pub async fn text_to_speech(
        &self,
        text: &str,
        voice_id: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        let url = format!("{}/text-to-speech/{}", self.base_url, voice_id);

        let request_body = TextToSpeechRequest {
            text: text.to_string(),
            model_id: "eleven_monolingual_v1".to_string(),
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Accept", "audio/mpeg")
            .timeout(Duration::from_secs(60))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: "elevenlabs",
                status: status.as_u16(),
                body,
            });
        }

        let audio_bytes = response.bytes().await?;
        Ok(audio_bytes.to_vec())
    }
}

/// Map an analysed voice type to a configured Eleven Labs voice id.
pub fn voice_id_for(voice_type: &str) -> &'static str {
    match voice_type.to_lowercase().as_str() {
        "deep" => "21m00Tcm4TlvDq8ikWAM",                // Rachel
        "energetic" => "AZnzlk1XvdvUeBnXmlld",           // Domi
        "soft" => "EXAVITQu4vr4xnSDxMaL",                // Bella
        "clear and articulate" => "ErXwobaYiN019PkySvjV", // Antoni
        _ => "21m00Tcm4TlvDq8ikWAM",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_mapping_is_case_insensitive() {
        assert_eq!(voice_id_for("Deep"), voice_id_for("deep"));
        assert_eq!(voice_id_for("ENERGETIC"), "AZnzlk1XvdvUeBnXmlld");
    }

    #[test]
    fn unknown_voice_types_fall_back_to_default() {
        assert_eq!(voice_id_for("gravelly"), "21m00Tcm4TlvDq8ikWAM");
        assert_eq!(voice_id_for(""), "21m00Tcm4TlvDq8ikWAM");
    }
}
