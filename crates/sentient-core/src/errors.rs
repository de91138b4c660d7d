use std::time::Duration;

/// Failures of the reasoning-engine call itself.
/// Retryability is logged only; nothing retries automatically.
#[derive(Clone, Debug, thiserror::Error)]
pub enum GatewayError {
    // Fatal
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    // Retryable
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("server error {status}: {body}")]
    ServerError { status: u16, body: String },
    #[error("network error: {0}")]
    NetworkError(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::NetworkError(_)
        )
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::MalformedResponse(_) => "malformed_response",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::NetworkError(_) => "network_error",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Classify an HTTP status code into the appropriate error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            400 | 404 => Self::InvalidRequest(body),
            429 => Self::RateLimited { retry_after: None },
            500..=599 => Self::ServerError { status, body },
            _ => Self::InvalidRequest(format!("unexpected status {status}: {body}")),
        }
    }
}

/// Failures of an external mail or calendar collaborator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The capability has no usable credential.
    #[error("{0}")]
    AuthenticationMissing(String),
    #[error("provider rejected the request ({status}): {body}")]
    Provider { status: u16, body: String },
    #[error("malformed provider payload: {0}")]
    Decode(String),
    #[error("network error: {0}")]
    Network(String),
}

impl ServiceError {
    pub fn no_token() -> Self {
        Self::AuthenticationMissing("No login token found. Please login first.".into())
    }

    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => Self::AuthenticationMissing(format!(
                "Login token was rejected ({body}). Please login again."
            )),
            _ => Self::Provider { status, body },
        }
    }

    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationMissing(_) => "authentication_missing",
            Self::Provider { .. } => "provider_error",
            Self::Decode(_) => "decode_error",
            Self::Network(_) => "network_error",
        }
    }
}
