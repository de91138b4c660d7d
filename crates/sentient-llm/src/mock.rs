use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use sentient_core::errors::GatewayError;
use sentient_core::messages::{Segment, ToolCall, Turn, TurnContent};
use sentient_core::provider::{EngineReply, ReasoningEngine};
use sentient_core::tools::ToolDefinition;

/// Pre-programmed replies for deterministic testing without API calls.
#[derive(Clone, Debug)]
pub enum MockReply {
    Reply(EngineReply),
    /// Return an error from the respond() call itself.
    Error(GatewayError),
    /// Wait a duration, then yield the inner reply.
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    /// Convenience: a plain-text final reply.
    pub fn text(text: &str) -> Self {
        Self::Reply(EngineReply::Final(TurnContent::Text(text.to_string())))
    }

    /// Convenience: a final reply made of text segments.
    pub fn segments(parts: &[&str]) -> Self {
        Self::Reply(EngineReply::Final(TurnContent::Segments(
            parts
                .iter()
                .map(|t| Segment::Text {
                    text: (*t).to_string(),
                })
                .collect(),
        )))
    }

    /// Convenience: a single tool-call request.
    pub fn tool_call(name: &str, arguments: serde_json::Value) -> Self {
        Self::tool_calls(vec![(name, arguments)])
    }

    /// Convenience: several tool calls in one reply.
    pub fn tool_calls(calls: Vec<(&str, serde_json::Value)>) -> Self {
        Self::Reply(EngineReply::ToolCalls {
            text: String::new(),
            calls: calls
                .into_iter()
                .map(|(name, args)| ToolCall::new(name, args))
                .collect(),
        })
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock engine that returns pre-programmed replies in sequence.
///
/// Every call records the turns it was given. Once the script is exhausted
/// the engine repeats its fallback reply, or fails if none was set.
pub struct MockEngine {
    replies: Mutex<VecDeque<MockReply>>,
    fallback: Option<MockReply>,
    requests: Mutex<Vec<Vec<Turn>>>,
    tool_catalogs: Mutex<Vec<Vec<String>>>,
    call_count: AtomicUsize,
}

impl MockEngine {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
            tool_catalogs: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// An engine that gives the same reply forever.
    pub fn repeating(reply: MockReply) -> Self {
        let mut engine = Self::new(vec![]);
        engine.fallback = Some(reply);
        engine
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Turn sequences seen by each call, in call order.
    pub fn requests(&self) -> Vec<Vec<Turn>> {
        self.requests.lock().clone()
    }

    /// Tool names offered on each call, in call order.
    pub fn tool_catalogs(&self) -> Vec<Vec<String>> {
        self.tool_catalogs.lock().clone()
    }
}

#[async_trait]
impl ReasoningEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn respond(
        &self,
        turns: &[Turn],
        tools: &[ToolDefinition],
    ) -> Result<EngineReply, GatewayError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().push(turns.to_vec());
        self.tool_catalogs
            .lock()
            .push(tools.iter().map(|t| t.name.clone()).collect());

        let next = self.replies.lock().pop_front();
        let Some(reply) = next.or_else(|| self.fallback.clone()) else {
            return Err(GatewayError::InvalidRequest(format!(
                "MockEngine: no reply configured for call {idx}"
            )));
        };
        resolve_reply(reply).await
    }
}

/// Resolve a MockReply, unrolling nested delays iteratively.
async fn resolve_reply(reply: MockReply) -> Result<EngineReply, GatewayError> {
    let mut current = reply;
    loop {
        match current {
            MockReply::Reply(reply) => return Ok(reply),
            MockReply::Error(e) => return Err(e),
            MockReply::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentient_core::normalize::normalize;
    use serde_json::json;

    #[tokio::test]
    async fn text_reply() {
        let engine = MockEngine::new(vec![MockReply::text("Hello")]);
        let reply = engine.respond(&[Turn::user("hi")], &[]).await.unwrap();
        let EngineReply::Final(content) = reply else {
            panic!("expected final reply");
        };
        assert_eq!(normalize(&content), "Hello");
        assert_eq!(engine.call_count(), 1);
    }

    #[tokio::test]
    async fn sequential_replies_and_recording() {
        let engine = MockEngine::new(vec![
            MockReply::tool_call("consult_memory", json!({"query": "all"})),
            MockReply::segments(&["A", "B"]),
        ]);

        let first = engine.respond(&[Turn::user("one")], &[]).await.unwrap();
        assert!(matches!(first, EngineReply::ToolCalls { ref calls, .. } if calls[0].name == "consult_memory"));

        let second = engine
            .respond(&[Turn::user("one"), Turn::assistant_text("x")], &[])
            .await
            .unwrap();
        assert!(matches!(second, EngineReply::Final(ref c) if normalize(c) == "AB"));

        let requests = engine.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].len(), 2);
    }

    #[tokio::test]
    async fn error_reply() {
        let engine = MockEngine::new(vec![MockReply::Error(GatewayError::NetworkError(
            "down".into(),
        ))]);
        let err = engine.respond(&[], &[]).await.unwrap_err();
        assert!(matches!(err, GatewayError::NetworkError(_)));
    }

    #[tokio::test]
    async fn exhausted_script_fails() {
        let engine = MockEngine::new(vec![]);
        let err = engine.respond(&[], &[]).await.unwrap_err();
        assert!(err.to_string().contains("no reply configured for call 0"));
    }

    #[tokio::test]
    async fn repeating_never_exhausts() {
        let engine = MockEngine::repeating(MockReply::tool_call("list_events", json!({})));
        for _ in 0..5 {
            let reply = engine.respond(&[], &[]).await.unwrap();
            assert!(matches!(reply, EngineReply::ToolCalls { .. }));
        }
        assert_eq!(engine.call_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply() {
        let engine = MockEngine::new(vec![MockReply::delayed(
            Duration::from_secs(30),
            MockReply::text("late"),
        )]);
        let start = tokio::time::Instant::now();
        let reply = engine.respond(&[], &[]).await.unwrap();
        assert!(matches!(reply, EngineReply::Final(_)));
        assert!(start.elapsed() >= Duration::from_secs(30));
    }
}
