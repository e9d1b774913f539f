//! Per-session relationship storage
//!
//! Each chat session owns one [`RelationshipStore`]. The store object
//! is passed in by handle rather than living in a process-global map,
//! and sessions beyond the configured capacity are evicted least
//! recently used so memory stays bounded over the process lifetime.
//!
//! Mutations read-modify-write one session's map under a single lock
//! acquisition. There is no per-parent serialization: two concurrent
//! expansions of the same parent race and the last write wins, which
//! is acceptable for this low-stakes data (the merge itself stays
//! consistent because it happens under the write lock).

use crate::relations::RelationshipStore;
use citegraph_common::errors::{AppError, Result};
use citegraph_common::models::{ChildRef, Graph, RelationshipEntry, StoreOutcome};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

struct SessionEntry {
    relationships: RelationshipStore,
    /// Monotonic touch counter for LRU ordering
    last_touched: u64,
}

/// Session-scoped relationship stores with LRU eviction
pub struct SessionStore {
    inner: RwLock<SessionMap>,
}

struct SessionMap {
    sessions: HashMap<Uuid, SessionEntry>,
    capacity: usize,
    clock: u64,
}

impl SessionStore {
    /// Create a store retaining at most `capacity` sessions
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(SessionMap {
                sessions: HashMap::new(),
                capacity: capacity.max(1),
                clock: 0,
            }),
        }
    }

    /// Merge expansion children under a parent, creating the session
    /// on first use
    pub async fn store_children(
        &self,
        session_id: Uuid,
        parent_id: &str,
        children: &[ChildRef],
    ) -> StoreOutcome {
        let mut map = self.inner.write().await;
        map.clock += 1;
        let tick = map.clock;

        let entry = map
            .sessions
            .entry(session_id)
            .or_insert_with(|| SessionEntry {
                relationships: RelationshipStore::new(),
                last_touched: tick,
            });
        entry.last_touched = tick;
        let outcome = entry.relationships.store_children(parent_id, children);

        map.evict_over_capacity();
        outcome
    }

    /// Children stored under a parent; empty when the session or the
    /// parent is unknown (callers degrade to "no stored expansions")
    pub async fn get_children(&self, session_id: Uuid, parent_id: &str) -> Vec<ChildRef> {
        let mut map = self.inner.write().await;
        map.clock += 1;
        let tick = map.clock;
        match map.sessions.get_mut(&session_id) {
            Some(entry) => {
                entry.last_touched = tick;
                entry.relationships.get_children(parent_id)
            }
            None => Vec::new(),
        }
    }

    /// Re-apply a session's stored expansions to a built graph; a
    /// session with no stored state leaves the graph untouched
    pub async fn restore_into_graph(&self, session_id: Uuid, graph: &mut Graph) {
        let mut map = self.inner.write().await;
        map.clock += 1;
        let tick = map.clock;
        if let Some(entry) = map.sessions.get_mut(&session_id) {
            entry.last_touched = tick;
            entry.relationships.restore_into_graph(graph);
        }
    }

    /// Snapshot a session's relationship map for durable storage
    pub async fn export(&self, session_id: Uuid) -> Result<HashMap<String, RelationshipEntry>> {
        let map = self.inner.read().await;
        map.sessions
            .get(&session_id)
            .map(|entry| entry.relationships.to_map())
            .ok_or_else(|| AppError::SessionNotFound {
                id: session_id.to_string(),
            })
    }

    /// Rehydrate a session from durable state, replacing anything held
    /// in memory for it
    pub async fn import(&self, session_id: Uuid, relationships: HashMap<String, RelationshipEntry>) {
        let mut map = self.inner.write().await;
        map.clock += 1;
        let tick = map.clock;
        map.sessions.insert(
            session_id,
            SessionEntry {
                relationships: RelationshipStore::from_map(relationships),
                last_touched: tick,
            },
        );
        map.evict_over_capacity();
    }

    /// Drop a session's in-memory state
    pub async fn remove(&self, session_id: Uuid) {
        let mut map = self.inner.write().await;
        map.sessions.remove(&session_id);
    }

    /// Sessions currently held in memory
    pub async fn len(&self) -> usize {
        self.inner.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.sessions.is_empty()
    }
}

impl SessionMap {
    fn evict_over_capacity(&mut self) {
        while self.sessions.len() > self.capacity {
            let oldest = self
                .sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_touched)
                .map(|(id, _)| *id);
            match oldest {
                Some(id) => {
                    debug!(session_id = %id, "evicting least recently used session");
                    self.sessions.remove(&id);
                }
                None => break,
            }
        }
    }
}
