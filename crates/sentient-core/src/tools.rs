use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Capability definition sent to the reasoning engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("unknown capability: {0}")]
    UnknownCapability(String),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("memory store unavailable: {0}")]
    Store(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ToolError {
    /// Render the error as the textual tool result fed back to the engine.
    pub fn to_result_text(&self, capability: &str) -> String {
        format!("Error in {capability}: {self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_display() {
        let err = ToolError::InvalidArguments("missing key".into());
        assert_eq!(err.to_string(), "invalid arguments: missing key");

        let err = ToolError::Timeout(Duration::from_secs(60));
        assert!(err.to_string().contains("60"));
    }

    #[test]
    fn service_error_is_transparent() {
        let err = ToolError::from(ServiceError::no_token());
        assert_eq!(
            err.to_result_text("read_mail"),
            "Error in read_mail: No login token found. Please login first."
        );
    }

    #[test]
    fn definition_serde() {
        let def = ToolDefinition {
            name: "list_events".into(),
            description: "List upcoming events".into(),
            parameters_schema: serde_json::json!({"type": "object"}),
        };
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["name"], "list_events");
        assert_eq!(json["parameters_schema"]["type"], "object");
    }
}
