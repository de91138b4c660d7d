//! Conversation history, one per session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use sentient_core::ids::SessionId;
use sentient_core::messages::Turn;
use tokio::sync::Mutex;
use tracing::debug;

/// Ordered log of turns for one conversation.
///
/// Position 0 holds the system directive once a request has started; it is
/// replaced in place, never duplicated. There is no eviction.
#[derive(Clone, Debug, Default)]
pub struct SessionHistory {
    turns: Vec<Turn>,
    /// Last memory wipe this history has been cleared for.
    wipe_generation: u64,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Replace the system turn at index 0, or insert one if absent.
    pub fn reset_system_turn(&mut self, directive: impl Into<String>) {
        let turn = Turn::system(directive);
        match self.turns.first_mut() {
            Some(first) if first.is_system() => *first = turn,
            _ => self.turns.insert(0, turn),
        }
    }

    /// Drop every turn. Only called as part of a memory wipe.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn wipe_generation(&self) -> u64 {
        self.wipe_generation
    }
}

pub type SharedHistory = Arc<Mutex<SessionHistory>>;

/// Session id → history. Each history sits behind an async mutex held for a
/// whole request, so a session has a single writer while distinct sessions
/// proceed concurrently.
///
/// A memory wipe bumps the registry's wipe generation. Every history whose
/// generation is behind is emptied, either right away by [`sweep`] or, when
/// its session is busy, the next time its lock is taken ([`catch_up`]).
///
/// [`sweep`]: SessionRegistry::sweep
/// [`catch_up`]: SessionRegistry::catch_up
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SharedHistory>,
    wipe_generation: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, id: &SessionId) -> SharedHistory {
        let entry = self.sessions.entry(id.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(SessionHistory {
                turns: Vec::new(),
                wipe_generation: self.wipe_generation(),
            }))
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, id: &SessionId) -> Option<SharedHistory> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn wipe_generation(&self) -> u64 {
        self.wipe_generation.load(Ordering::Acquire)
    }

    /// Record a wipe performed on `history` (already emptied by the caller)
    /// and mark every other history as stale.
    pub fn record_wipe(&self, history: &mut SessionHistory) -> u64 {
        let generation = self.wipe_generation.fetch_add(1, Ordering::AcqRel) + 1;
        history.wipe_generation = generation;
        generation
    }

    /// Empty `history` if a wipe happened since it was last cleared. Returns
    /// whether it was emptied.
    pub fn catch_up(&self, history: &mut SessionHistory) -> bool {
        let current = self.wipe_generation();
        if history.wipe_generation >= current {
            return false;
        }
        history.clear();
        history.wipe_generation = current;
        true
    }

    /// Bring every idle session up to date with the latest wipe. Sessions
    /// whose lock is held are skipped; they catch up on their next request.
    /// Returns how many histories were emptied.
    pub fn sweep(&self) -> usize {
        let histories: Vec<SharedHistory> =
            self.sessions.iter().map(|entry| Arc::clone(entry.value())).collect();
        let mut cleared = 0;
        for shared in histories {
            match shared.try_lock() {
                Ok(mut history) => {
                    if self.catch_up(&mut history) {
                        cleared += 1;
                    }
                }
                Err(_) => debug!("session busy during wipe sweep, deferring"),
            }
        }
        cleared
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
