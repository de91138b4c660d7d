use async_trait::async_trait;

use crate::errors::GatewayError;
use crate::messages::{ToolCall, Turn, TurnContent};
use crate::tools::ToolDefinition;

/// What the reasoning engine decided for one step of the loop.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineReply {
    /// Terminal answer for the caller.
    Final(TurnContent),
    /// Capabilities to invoke, in order, with any text the engine produced
    /// alongside them.
    ToolCalls { text: String, calls: Vec<ToolCall> },
}

/// Boundary to the language-model inference service.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    async fn respond(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
    ) -> Result<EngineReply, GatewayError>;
}
