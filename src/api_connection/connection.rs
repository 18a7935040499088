use async_trait::async_trait;
use dotenv::dotenv;
use reqwest::Client;
use std::env;
use tracing::debug;

use super::endpoints::{GenerateContentRequest, GenerateContentResponse, GEMINI_BASE_URL};

#[derive(Debug, thiserror::Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("API error {status}: {error_body}")]
    ApiError {
        status: reqwest::StatusCode,
        error_body: String,
    },
}

impl ApiConnectionError {
    /// HTTP status of an upstream rejection, if that is what this error is.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ApiConnectionError::ApiError { status, .. } => Some(*status),
            ApiConnectionError::NetworkError(err) => err.status(),
            _ => None,
        }
    }
}

/// The generation capability consumed by the text and image requests.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiConnectionError>;
}

#[derive(Clone, Debug)]
pub enum Provider {
    Gemini {
        api_key: String,
        base_url: String,
        http: Client,
    },
}

impl Provider {
    /// `api_key_env_var_name` names the variable holding the key; it is read
    /// on every call, so a missing key only surfaces when a request is made.
    pub fn gemini(api_key_env_var_name: &str) -> Self {
        Self::gemini_with_base_url(api_key_env_var_name, GEMINI_BASE_URL)
    }

    pub fn gemini_with_base_url(api_key_env_var_name: &str, base_url: &str) -> Self {
        dotenv().ok();
        Self::Gemini {
            api_key: api_key_env_var_name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub async fn call_generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiConnectionError> {
        match self {
            Provider::Gemini {
                api_key: api_key_env_var_name,
                base_url,
                http,
            } => {
                let actual_api_key = env::var(api_key_env_var_name)
                    .map_err(|_| ApiConnectionError::MissingApiKey(api_key_env_var_name.clone()))?;

                let url = format!("{}/v1beta/models/{}:generateContent", base_url, model);
                debug!(%url, "sending generateContent request");

                let response = http
                    .post(&url)
                    .header("x-goog-api-key", actual_api_key)
                    .json(request)
                    .send()
                    .await?;

                if response.status().is_success() {
                    let body = response.text().await?;
                    let parsed = serde_json::from_str::<GenerateContentResponse>(&body)?;
                    debug!(
                        model,
                        total_tokens = ?parsed.usage_metadata.as_ref().and_then(|u| u.total_token_count),
                        "generateContent succeeded"
                    );
                    Ok(parsed)
                } else {
                    let status = response.status();
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());
                    Err(ApiConnectionError::ApiError { status, error_body })
                }
            }
        }
    }
}

#[async_trait]
impl GenerativeBackend for Provider {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ApiConnectionError> {
        self.call_generate_content(model, request).await
    }
}
