// src/error.rs
//! Error types shared by the AI provider clients and the generation pipeline.

use thiserror::Error;

/// Errors produced by outbound calls to the external AI providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-success HTTP status from the provider.
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to parse {provider} response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} generation timed out after {attempts} polls")]
    PollTimeout {
        provider: &'static str,
        attempts: u32,
    },

    #[error("{provider} generation failed: {message}")]
    GenerationFailed {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    /// Transient errors are worth retrying; everything else fails fast.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Request(e) => e.is_connect() || e.is_timeout(),
            ProviderError::Api { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }
}

/// Errors surfaced by the video generation pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("project {0} not found")]
    ProjectNotFound(uuid::Uuid),

    #[error("scene {0} not found")]
    SceneNotFound(uuid::Uuid),

    #[error("render job {0} not found")]
    JobNotFound(uuid::Uuid),

    #[error("unknown render job type: {0}")]
    UnknownJobType(String),

    #[error("not all scenes have been rendered ({rendered}/{total})")]
    ScenesIncomplete { rendered: usize, total: usize },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_server_errors_are_transient() {
        for status in [429u16, 500, 502, 503, 504] {
            let err = ProviderError::Api {
                provider: "openai",
                status,
                body: String::new(),
            };
            assert!(err.is_transient(), "status {} should be transient", status);
        }
    }

    #[test]
    fn client_errors_are_permanent() {
        for status in [400u16, 401, 403, 404, 422] {
            let err = ProviderError::Api {
                provider: "stability",
                status,
                body: String::new(),
            };
            assert!(!err.is_transient(), "status {} should be permanent", status);
        }
    }

    #[test]
    fn parse_failures_are_permanent() {
        let err = ProviderError::InvalidResponse {
            provider: "replicate",
            message: "missing output field".to_string(),
        };
        assert!(!err.is_transient());
    }
}
