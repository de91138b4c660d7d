use std::sync::Arc;

use tracing::{info, instrument};

use sentient_core::errors::ServiceError;
use sentient_core::ids::SessionId;
use sentient_core::provider::ReasoningEngine;

use crate::error::EngineError;
use crate::registry::ToolRegistry;
use crate::runner::{AgentRunner, RunnerConfig};
use crate::session::SessionRegistry;
use crate::tools::CalendarEvent;

/// Caller-facing entry point: one message in, one reply out.
pub struct Agent {
    runner: AgentRunner,
    registry: Arc<ToolRegistry>,
    sessions: SessionRegistry,
}

impl Agent {
    pub fn new(
        engine: Arc<dyn ReasoningEngine>,
        registry: Arc<ToolRegistry>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            runner: AgentRunner::new(engine, Arc::clone(&registry), config),
            registry,
            sessions: SessionRegistry::new(),
        }
    }

    /// Submit to the default session.
    pub async fn submit(&self, text: &str) -> Result<String, EngineError> {
        self.submit_in(&SessionId::default_session(), text).await
    }

    /// Submit to `session_id`, creating the session on first use. Requests
    /// for the same session are serialized.
    ///
    /// A `clear_memory` in one session empties every other session's history
    /// too; only one session lock is held at a time.
    #[instrument(skip(self, text), fields(session_id = %session_id))]
    pub async fn submit_in(&self, session_id: &SessionId, text: &str) -> Result<String, EngineError> {
        let shared = self.sessions.get_or_create(session_id);
        let result = {
            let mut history = shared.lock().await;
            if self.sessions.catch_up(&mut history) {
                info!("history cleared by a wipe in another session");
            }
            let result = self.runner.run(&mut history, text).await?;
            if result.memory_wiped {
                self.sessions.record_wipe(&mut history);
            } else if self.sessions.catch_up(&mut history) {
                info!("history cleared by a wipe that ran during this request");
            }
            result
        };

        if result.memory_wiped {
            let cleared = self.sessions.sweep();
            info!(cleared, sessions = self.sessions.len(), "other sessions cleared after memory wipe");
        }
        Ok(result.reply)
    }

    pub async fn upcoming_events(&self, limit: u32) -> Result<Vec<CalendarEvent>, ServiceError> {
        self.registry.upcoming_events(limit).await
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::calendar::testing::FakeCalendar;
    use crate::tools::mail::testing::FakeMailbox;
    use sentient_llm::{MockEngine, MockReply};
    use sentient_store::{Database, MemoryStore};
    use serde_json::json;

    fn agent(replies: Vec<MockReply>) -> Agent {
        let registry = Arc::new(ToolRegistry::new(
            Arc::new(FakeMailbox::default()),
            Arc::new(FakeCalendar::default()),
            MemoryStore::new(Database::in_memory().unwrap()),
            chrono_tz::UTC,
        ));
        Agent::new(Arc::new(MockEngine::new(replies)), registry, RunnerConfig::default())
    }

    #[tokio::test]
    async fn submit_uses_default_session() {
        let agent = agent(vec![MockReply::text("hi there")]);
        assert_eq!(agent.submit("hello").await.unwrap(), "hi there");

        let history = agent.sessions().get(&SessionId::default_session()).unwrap();
        assert_eq!(history.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn sessions_do_not_share_history() {
        let agent = agent(vec![MockReply::text("a"), MockReply::text("b")]);
        let one = SessionId::from_raw("sess_one");
        let two = SessionId::from_raw("sess_two");

        agent.submit_in(&one, "first").await.unwrap();
        agent.submit_in(&two, "second").await.unwrap();

        let one = agent.sessions().get(&one).unwrap();
        let two = agent.sessions().get(&two).unwrap();
        assert_eq!(one.lock().await.turns()[1].text(), "first");
        assert_eq!(two.lock().await.turns()[1].text(), "second");
        assert_eq!(two.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn clear_memory_empties_every_session() {
        let agent = agent(vec![
            MockReply::tool_call("save_to_memory", json!({"key": "meeting_rule", "value": "Hates 10 AMs"})),
            MockReply::text("Noted."),
            MockReply::text("Hello B."),
            MockReply::tool_call("clear_memory", json!({})),
            MockReply::text("All cleared."),
        ]);
        let a = SessionId::from_raw("sess_a");
        let b = SessionId::from_raw("sess_b");

        agent.submit_in(&a, "I hate 10 AM meetings").await.unwrap();
        agent.submit_in(&b, "hi").await.unwrap();
        assert_eq!(agent.submit_in(&b, "forget everything").await.unwrap(), "All cleared.");

        let a_history = agent.sessions().get(&a).unwrap();
        assert!(a_history.lock().await.is_empty());
        let b_history = agent.sessions().get(&b).unwrap();
        let b_history = b_history.lock().await;
        assert!(b_history.turns().iter().all(|t| t.text() != "hi"));
        assert_eq!(b_history.last().map(|t| t.text()).as_deref(), Some("All cleared."));
    }

    #[tokio::test]
    async fn busy_session_is_cleared_when_it_next_runs() {
        let agent = agent(vec![
            MockReply::text("Noted."),
            MockReply::tool_call("clear_memory", json!({})),
            MockReply::text("All cleared."),
            MockReply::text("Fresh start."),
        ]);
        let a = SessionId::from_raw("sess_a");
        let b = SessionId::from_raw("sess_b");
        agent.submit_in(&a, "my rule is no 10 AMs").await.unwrap();

        // Hold A's lock while B wipes, so the sweep has to skip it.
        let a_shared = agent.sessions().get(&a).unwrap();
        let guard = a_shared.lock().await;
        agent.submit_in(&b, "forget everything").await.unwrap();
        assert_eq!(guard.len(), 3);
        drop(guard);

        agent.submit_in(&a, "hello again").await.unwrap();
        let a_history = a_shared.lock().await;
        assert_eq!(a_history.len(), 3);
        assert!(a_history.turns().iter().all(|t| t.text() != "my rule is no 10 AMs"));
    }

    #[tokio::test]
    async fn gateway_errors_propagate() {
        let agent = agent(vec![]);
        assert!(matches!(agent.submit("hi").await, Err(EngineError::Gateway(_))));
    }
}
