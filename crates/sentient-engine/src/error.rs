use sentient_core::errors::GatewayError;

/// Request-level failures. Capability failures never surface here; they are
/// fed back to the reasoning engine as text.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl EngineError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Gateway(e) => e.error_kind(),
        }
    }

    /// Reply shown to the user in place of an answer when the request failed.
    pub fn apology(&self) -> String {
        format!(
            "Sorry, I couldn't complete that request ({}). Please try again in a moment.",
            self.error_kind()
        )
    }
}
