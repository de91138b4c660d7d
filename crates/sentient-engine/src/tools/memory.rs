use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use sentient_core::tools::{ToolDefinition, ToolError};
use sentient_store::{MemoryStore, StoreError};

use crate::session::SessionHistory;

const ALL: &str = "all";

#[derive(Debug, Deserialize)]
pub struct SaveArgs {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ConsultArgs {
    #[serde(default = "default_query")]
    pub query: String,
}

fn default_query() -> String {
    ALL.to_string()
}

fn store_error(e: StoreError) -> ToolError {
    ToolError::Store(e.to_string())
}

pub fn save(store: &MemoryStore, args: SaveArgs) -> Result<String, ToolError> {
    let key = args.key.trim();
    if key.is_empty() {
        return Err(ToolError::InvalidArguments("memory key is empty".into()));
    }
    store.upsert(key, &args.value).map_err(store_error)?;
    Ok(format!("Memory updated: {key} -> {}", args.value))
}

/// Render every stored fact. The query is logged but never narrows the result.
pub fn consult(store: &MemoryStore, args: ConsultArgs) -> Result<String, ToolError> {
    let facts = store.read_all().map_err(store_error)?;
    debug!(query = %args.query, facts = facts.len(), "memory consulted");
    if facts.is_empty() {
        return Ok("Long-term memory is empty.".into());
    }

    let rendered = serde_json::to_string_pretty(&facts)
        .map_err(|e| ToolError::Store(format!("render facts: {e}")))?;
    Ok(format!("Current long-term memory:\n{rendered}"))
}

/// Wipe durable memory, then the calling session's history. The history is
/// left alone when the store cannot be cleared. Other sessions are emptied
/// afterwards by [`SessionRegistry::sweep`](crate::session::SessionRegistry::sweep).
pub fn wipe(store: &MemoryStore, history: &mut SessionHistory) -> Result<String, ToolError> {
    let removed = store.clear().map_err(store_error)?;
    let turns = history.len();
    history.clear();
    info!(facts = removed, turns, "memory wiped");
    Ok("Long-term memory and conversation history cleared.".into())
}

pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "save_to_memory".into(),
            description: "Save a fact about the user or a project to long-term memory. Key examples: \
                          'user_preference', 'project_status', 'meeting_rule'. Value examples: \
                          'Hates 9 AM meetings', 'Project X is delayed'. Saving an existing key \
                          overwrites it."
                .into(),
            parameters_schema: json!({
                "type": "object",
                "required": ["key", "value"],
                "properties": {
                    "key": {"type": "string", "description": "Short topic key"},
                    "value": {"type": "string", "description": "The fact to remember"}
                }
            }),
        },
        ToolDefinition {
            name: "consult_memory".into(),
            description: "Retrieve facts from long-term memory. Always use this before drafting \
                          emails or scheduling to check for rules and project status."
                .into(),
            parameters_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What you are looking for; every stored fact is returned regardless"
                    }
                }
            }),
        },
        ToolDefinition {
            name: "clear_memory".into(),
            description: "Erase all long-term memory and the conversation history. Use only when \
                          the user asks to reset or forget everything."
                .into(),
            parameters_schema: json!({"type": "object", "properties": {}}),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentient_core::messages::Turn;
    use sentient_store::Database;

    fn store() -> MemoryStore {
        MemoryStore::new(Database::in_memory().unwrap())
    }

    fn save_fact(store: &MemoryStore, key: &str, value: &str) -> String {
        save(
            store,
            SaveArgs {
                key: key.into(),
                value: value.into(),
            },
        )
        .unwrap()
    }

    fn consult_all(store: &MemoryStore) -> String {
        consult(store, ConsultArgs { query: "all".into() }).unwrap()
    }

    #[test]
    fn save_confirms() {
        let store = store();
        assert_eq!(
            save_fact(&store, "meeting_rule", "Hates 10 AMs"),
            "Memory updated: meeting_rule -> Hates 10 AMs"
        );
    }

    #[test]
    fn last_write_wins() {
        let store = store();
        save_fact(&store, "meeting_rule", "No 9 AMs");
        save_fact(&store, "meeting_rule", "No 10 AMs");
        let out = consult_all(&store);
        assert!(out.contains("No 10 AMs"));
        assert!(!out.contains("No 9 AMs"));
    }

    #[test]
    fn consult_empty() {
        assert_eq!(consult_all(&store()), "Long-term memory is empty.");
    }

    #[test]
    fn consult_renders_pretty_json() {
        let store = store();
        save_fact(&store, "project_status", "Project X is delayed");
        let out = consult_all(&store);
        assert_eq!(
            out,
            "Current long-term memory:\n{\n  \"project_status\": \"Project X is delayed\"\n}"
        );
    }

    #[test]
    fn consult_returns_everything_whatever_the_query() {
        let store = store();
        save_fact(&store, "meeting_rule", "Hates 10 AMs");
        save_fact(&store, "project_status", "Project X is delayed");

        for query in ["all", "user preferences", "MEETING", ""] {
            let out = consult(&store, ConsultArgs { query: query.into() }).unwrap();
            assert!(out.starts_with("Current long-term memory:"), "query {query:?}");
            assert!(out.contains("\"meeting_rule\": \"Hates 10 AMs\""), "query {query:?}");
            assert!(out.contains("\"project_status\""), "query {query:?}");
        }
    }

    #[test]
    fn save_rejects_empty_key() {
        let err = save(
            &store(),
            SaveArgs {
                key: "  ".into(),
                value: "x".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn wipe_clears_store_and_history() {
        let store = store();
        save_fact(&store, "a", "1");
        let mut history = SessionHistory::new();
        history.reset_system_turn("directive");
        history.append(Turn::user("forget everything"));

        wipe(&store, &mut history).unwrap();
        assert!(history.is_empty());
        assert_eq!(consult_all(&store), "Long-term memory is empty.");
    }

    #[test]
    fn wipe_keeps_history_when_store_fails() {
        let db = Database::in_memory().unwrap();
        let store = MemoryStore::new(db.clone());
        db.with_conn(|conn| {
            conn.execute_batch("DROP TABLE memory_facts")?;
            Ok(())
        })
        .unwrap();

        let mut history = SessionHistory::new();
        history.append(Turn::user("reset"));
        let err = wipe(&store, &mut history).unwrap_err();
        assert!(matches!(err, ToolError::Store(_)));
        assert_eq!(history.len(), 1);
    }
}
