//! Gemini LLM Gateway implementation

use super::protocol::{ErrorEnvelope, GenerateRequest, GenerateResponse};
use async_trait::async_trait;
use jury_application::{GatewayError, LlmGateway};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// Connection settings for [`GeminiGateway`]
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Endpoint root, without the `/v1beta` suffix
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// LLM Gateway implementation for the Gemini REST API
pub struct GeminiGateway {
    client: Client,
    config: GeminiConfig,
}

impl GeminiGateway {
    pub fn new(config: GeminiConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Other(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl LlmGateway for GeminiGateway {
    async fn generate(&self, system_instruction: &str, prompt: &str) -> Result<String, GatewayError> {
        debug!(
            "Gemini request: model={}, prompt={} bytes",
            self.config.model,
            prompt.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&GenerateRequest::new(system_instruction, prompt))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            return Err(map_status(status, &body));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Other(format!("Malformed response: {}", e)))?;

        match parsed.text() {
            Some(text) => {
                debug!("Gemini response: {} bytes", text.len());
                Ok(text)
            }
            None => Err(GatewayError::Other(match parsed.block_reason() {
                Some(reason) => format!("Prompt blocked: {}", reason),
                None => "No content in response".to_string(),
            })),
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::ConnectionError(e.to_string())
    } else if e.is_body() || e.is_request() {
        GatewayError::Io(e.to_string())
    } else {
        GatewayError::Other(e.to_string())
    }
}

fn map_status(status: StatusCode, body: &str) -> GatewayError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    match status {
        StatusCode::BAD_REQUEST => GatewayError::InvalidArgument(message),
        StatusCode::UNAUTHORIZED => GatewayError::Unauthorized(message),
        StatusCode::FORBIDDEN => GatewayError::Forbidden(message),
        StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited(message),
        s if s.is_server_error() => GatewayError::RequestFailed(message),
        _ => GatewayError::Other(message),
    }
}
