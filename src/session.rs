// src/session.rs

//! Session-scoped result cache. Entries are written once per query and
//! shared read-only afterwards; the cache lives exactly as long as the
//! owning session, with eviction left to the caller.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::{EnrichedCandidate, QueryContext};

/// Injected session store seam — never an ambient global. Holds the
/// enriched candidates surfaced to one session plus the last query context,
/// which pagination and cache-miss enrichment both need.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, session_id: &str, entry: EnrichedCandidate);
    async fn get(&self, session_id: &str, venue_id: &str) -> Option<Arc<EnrichedCandidate>>;
    /// Every venue id surfaced to this session so far.
    async fn known_ids(&self, session_id: &str) -> HashSet<String>;
    async fn last_context(&self, session_id: &str) -> Option<QueryContext>;
    async fn set_last_context(&self, session_id: &str, ctx: QueryContext);
}

#[derive(Default)]
struct SessionState {
    entries: HashMap<String, Arc<EnrichedCandidate>>,
    last_context: Option<QueryContext>,
}

/// In-process session store. Writes take the lock exclusively, so
/// overlapping requests for the same session cannot lose updates;
/// cross-session state shares nothing but the map itself.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session_id: &str, entry: EnrichedCandidate) {
        let mut sessions = self.sessions.write().await;
        let state = sessions.entry(session_id.to_string()).or_default();
        state.entries.insert(entry.id().to_string(), Arc::new(entry));
    }

    async fn get(&self, session_id: &str, venue_id: &str) -> Option<Arc<EnrichedCandidate>> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id)?.entries.get(venue_id).cloned()
    }

    async fn known_ids(&self, session_id: &str) -> HashSet<String> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|s| s.entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn last_context(&self, session_id: &str) -> Option<QueryContext> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id)?.last_context.clone()
    }

    async fn set_last_context(&self, session_id: &str, ctx: QueryContext) {
        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.to_string()).or_default().last_context = Some(ctx);
    }
}
