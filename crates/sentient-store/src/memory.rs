use std::collections::BTreeMap;

use chrono::Utc;
use tracing::debug;

use crate::database::Database;
use crate::error::StoreError;

/// Durable key → value fact store. Keys are unique; writes are last-wins.
#[derive(Clone)]
pub struct MemoryStore {
    db: Database,
}

impl MemoryStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or overwrite the fact stored under `key`.
    pub fn upsert(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO memory_facts (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                rusqlite::params![key, value, now],
            )?;
            Ok(())
        })?;
        debug!(key, "memory fact saved");
        Ok(())
    }

    /// Every stored fact, ordered by key. Empty map when nothing is stored.
    pub fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key, value FROM memory_facts ORDER BY key")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<Result<BTreeMap<_, _>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete every fact. Returns how many were removed.
    pub fn clear(&self) -> Result<usize, StoreError> {
        let removed = self
            .db
            .with_conn(|conn| Ok(conn.execute("DELETE FROM memory_facts", [])?))?;
        debug!(removed, "memory facts cleared");
        Ok(removed)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM memory_facts", [], |row| row.get(0))?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::new(Database::in_memory().unwrap())
    }

    #[test]
    fn upsert_and_read() {
        let store = store();
        store.upsert("meeting_rule", "Hates 10 AMs").unwrap();

        let facts = store.read_all().unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts["meeting_rule"], "Hates 10 AMs");
    }

    #[test]
    fn last_write_wins() {
        let store = store();
        store.upsert("project_status", "on track").unwrap();
        store.upsert("project_status", "delayed").unwrap();

        let facts = store.read_all().unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts["project_status"], "delayed");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn read_all_empty() {
        assert!(store().read_all().unwrap().is_empty());
    }

    #[test]
    fn read_all_ordered_by_key() {
        let store = store();
        store.upsert("zeta", "1").unwrap();
        store.upsert("alpha", "2").unwrap();
        let keys: Vec<_> = store.read_all().unwrap().into_keys().collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
    }

    #[test]
    fn clear_removes_everything() {
        let store = store();
        store.upsert("a", "1").unwrap();
        store.upsert("b", "2").unwrap();

        assert_eq!(store.clear().unwrap(), 2);
        assert!(store.read_all().unwrap().is_empty());
        assert_eq!(store.clear().unwrap(), 0);
    }

    #[test]
    fn clones_share_storage() {
        let store = store();
        let other = store.clone();
        store.upsert("k", "v").unwrap();
        assert_eq!(other.read_all().unwrap()["k"], "v");
    }
}
