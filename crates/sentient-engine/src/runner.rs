use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use chrono_tz::Tz;
use futures::FutureExt;
use tracing::{debug, error, info, instrument, warn};

use sentient_core::messages::{ToolCall, Turn, TurnContent};
use sentient_core::normalize::normalize;
use sentient_core::provider::{EngineReply, ReasoningEngine};
use sentient_core::tools::ToolError;

use crate::error::EngineError;
use crate::prompt::compose_directive;
use crate::registry::{Capability, ToolOutcome, ToolRegistry};
use crate::session::SessionHistory;
use crate::truncate::{truncate_output, MAX_TOOL_OUTPUT};

const DEFAULT_MAX_CYCLES: u32 = 25;
const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Final reply when the engine is still requesting tools after `max_cycles`.
pub const GIVE_UP_REPLY: &str = "I wasn't able to finish this request within the allowed number \
of steps. Please try rephrasing or breaking it into smaller requests.";

/// Configuration for the agent runner.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Reasoning calls allowed per request.
    pub max_cycles: u32,
    pub tool_timeout: Duration,
    /// Zone the directive's clock is rendered in.
    pub timezone: Tz,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_cycles: DEFAULT_MAX_CYCLES,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            timezone: chrono_tz::UTC,
        }
    }
}

/// Outcome of one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResult {
    pub reply: String,
    /// Reasoning calls made.
    pub cycles: u32,
    pub tool_calls: u32,
    pub gave_up: bool,
    /// `clear_memory` ran during this request.
    pub memory_wiped: bool,
}

/// Drives one request through compose → reason → execute tools → … → terminal.
pub struct AgentRunner {
    engine: Arc<dyn ReasoningEngine>,
    registry: Arc<ToolRegistry>,
    config: RunnerConfig,
}

impl AgentRunner {
    pub fn new(
        engine: Arc<dyn ReasoningEngine>,
        registry: Arc<ToolRegistry>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            engine,
            registry,
            config,
        }
    }

    /// Handle one user message against `history`.
    ///
    /// Only a failed reasoning call is an error; capability failures are fed
    /// back to the engine as text.
    #[instrument(skip_all, fields(model = %self.engine.model(), history_len = history.len()))]
    pub async fn run(
        &self,
        history: &mut SessionHistory,
        user_text: &str,
    ) -> Result<RunResult, EngineError> {
        let start = Instant::now();

        // ComposePrompt
        let directive = compose_directive(&Utc::now().with_timezone(&self.config.timezone));
        history.reset_system_turn(directive.clone());
        history.append(Turn::user(user_text));

        let tools = self.registry.definitions();
        let mut tool_calls = 0u32;
        let mut memory_wiped = false;

        for cycle in 1..=self.config.max_cycles {
            // AwaitReasoning
            let reply = match self.engine.respond(history.turns(), &tools).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!(
                        cycle,
                        error = %e,
                        kind = e.error_kind(),
                        retryable = e.is_retryable(),
                        "reasoning call failed"
                    );
                    return Err(EngineError::Gateway(e));
                }
            };

            let (text, calls) = match reply {
                EngineReply::Final(content) => {
                    return Ok(self.finish(history, content, cycle, tool_calls, memory_wiped, start));
                }
                EngineReply::ToolCalls { text, calls } if calls.is_empty() => {
                    warn!(cycle, "engine requested zero tool calls, treating its text as the answer");
                    let content = TurnContent::Text(text);
                    return Ok(self.finish(history, content, cycle, tool_calls, memory_wiped, start));
                }
                EngineReply::ToolCalls { text, calls } => (text, calls),
            };

            // ExecuteTool
            history.append(Turn::assistant_tool_calls(text.clone(), calls.clone()));
            let mut completed: Vec<Turn> = Vec::with_capacity(calls.len());
            for call in &calls {
                tool_calls += 1;
                let outcome = self.execute_tool(call, history).await;
                let result = Turn::tool_result(call.id.clone(), call.name.clone(), outcome.content);

                if outcome.history_wiped {
                    memory_wiped = true;
                    // Re-establish the in-flight request on the emptied history.
                    history.reset_system_turn(directive.clone());
                    history.append(Turn::user(user_text));
                    history.append(Turn::assistant_tool_calls(text.clone(), calls.clone()));
                    for earlier in &completed {
                        history.append(earlier.clone());
                    }
                }
                history.append(result.clone());
                completed.push(result);
            }
            debug!(cycle, executed = calls.len(), "tool batch complete");
        }

        warn!(
            max_cycles = self.config.max_cycles,
            tool_calls, "cycle limit reached, giving up"
        );
        history.append(Turn::assistant_text(GIVE_UP_REPLY));
        Ok(RunResult {
            reply: GIVE_UP_REPLY.to_string(),
            cycles: self.config.max_cycles,
            tool_calls,
            gave_up: true,
            memory_wiped,
        })
    }

    fn finish(
        &self,
        history: &mut SessionHistory,
        content: TurnContent,
        cycles: u32,
        tool_calls: u32,
        memory_wiped: bool,
        start: Instant,
    ) -> RunResult {
        let reply = normalize(&content);
        history.append(Turn::assistant(content));
        info!(
            cycles,
            tool_calls,
            reply_len = reply.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "request complete"
        );
        RunResult {
            reply,
            cycles,
            tool_calls,
            gave_up: false,
            memory_wiped,
        }
    }

    /// Run one tool call under the timeout and a panic guard. Every failure
    /// comes back as result text.
    async fn execute_tool(&self, call: &ToolCall, history: &mut SessionHistory) -> ToolOutcome {
        let capability = match Capability::parse(&call.name, &call.arguments) {
            Ok(capability) => capability,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "rejected tool call");
                return ToolOutcome::text(e.to_result_text(&call.name));
            }
        };

        let start = Instant::now();
        let timeout = self.config.tool_timeout;
        let result = tokio::time::timeout(
            timeout,
            std::panic::AssertUnwindSafe(self.registry.invoke(capability, history)).catch_unwind(),
        )
        .await;

        let outcome = match result {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(e))) => {
                warn!(tool = %call.name, error = %e, "tool failed");
                ToolOutcome::text(e.to_result_text(&call.name))
            }
            Ok(Err(panic)) => {
                let msg = panic_message(&panic);
                error!(tool = %call.name, panic = %msg, "tool panicked during execution");
                ToolOutcome::text(format!("Error in {}: internal error, the tool crashed", call.name))
            }
            Err(_) => {
                warn!(tool = %call.name, timeout_secs = timeout.as_secs(), "tool timed out");
                ToolOutcome::text(ToolError::Timeout(timeout).to_result_text(&call.name))
            }
        };

        debug!(
            tool = %call.name,
            duration_ms = start.elapsed().as_millis() as u64,
            wiped = outcome.history_wiped,
            "tool executed"
        );
        ToolOutcome {
            content: truncate_output(&outcome.content, MAX_TOOL_OUTPUT),
            history_wiped: outcome.history_wiped,
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic")
        .to_string()
}
