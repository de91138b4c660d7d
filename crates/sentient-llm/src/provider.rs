//! Gemini `generateContent` client implementing [`ReasoningEngine`].

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sentient_core::errors::GatewayError;
use sentient_core::messages::Turn;
use sentient_core::provider::{EngineReply, ReasoningEngine};
use sentient_core::tools::ToolDefinition;
use tracing::{debug, error, info, instrument};

use crate::converter::{build_request, parse_response};
use crate::types::GenerateContentResponse;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Connection settings for the Gemini API.
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: SecretString,
    pub model: String,
    /// API root, e.g. `https://generativelanguage.googleapis.com`.
    pub base_url: String,
    pub temperature: f64,
    pub request_timeout: Duration,
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

pub struct GeminiEngine {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiEngine {
    pub fn new(config: GeminiConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::InvalidRequest(format!("http client: {e}")))?;
        Ok(Self::with_client(config, client))
    }

    /// Create an engine with a shared HTTP client.
    pub fn with_client(config: GeminiConfig, client: reqwest::Client) -> Self {
        info!(
            model = %config.model,
            temperature = config.temperature,
            "Gemini engine initialized"
        );
        Self { config, client }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    fn map_send_error(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.config.request_timeout)
        } else {
            GatewayError::NetworkError(err.to_string())
        }
    }
}

#[async_trait]
impl ReasoningEngine for GeminiEngine {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn respond(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
    ) -> Result<EngineReply, GatewayError> {
        let body = build_request(turns, tools, self.config.temperature);
        debug!(
            turn_count = turns.len(),
            content_count = body.contents.len(),
            tool_count = tools.len(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let body_text = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Gemini API error");
            return Err(match GatewayError::from_status(status.as_u16(), body_text) {
                GatewayError::RateLimited { .. } => GatewayError::RateLimited { retry_after },
                other => other,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        let reply = parse_response(parsed)?;
        debug!(
            tool_calls = match &reply {
                EngineReply::ToolCalls { calls, .. } => calls.len(),
                EngineReply::Final(_) => 0,
            },
            "Gemini reply received"
        );
        Ok(reply)
    }
}
