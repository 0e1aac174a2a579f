//! In-memory storage engine.
//!
//! Interactions are an append-only vector; sessions live in a map guarded by
//! a single write lock, so each chunk merge (including its stat-counter
//! increments) runs in one critical section per session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{
    ActiveRecording, ChunkUpload, Error, Funnel, Interaction, Result, SessionRecording,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::query::{InteractionQuery, SessionPage, SessionQuery};
use crate::store::EventStore;

/// In-process store used by the single-node deployment and the test suite.
#[derive(Default)]
pub struct MemoryStore {
    interactions: RwLock<Vec<Interaction>>,
    sessions: RwLock<HashMap<String, SessionRecording>>,
    funnels: RwLock<HashMap<Uuid, Funnel>>,
    active_recording: RwLock<Option<ActiveRecording>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total interactions held, across projects.
    pub fn interaction_count(&self) -> usize {
        self.interactions.read().len()
    }

    /// Total sessions held, across projects.
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Inserts a session directly, bypassing the chunk merge path.
    pub fn insert_session(&self, session: SessionRecording) {
        self.sessions
            .write()
            .insert(session.session_id.clone(), session);
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_interactions(&self, rows: Vec<Interaction>) -> Result<usize> {
        let count = rows.len();
        self.interactions.write().extend(rows);
        Ok(count)
    }

    async fn query_interactions(&self, query: &InteractionQuery) -> Result<Vec<Interaction>> {
        let mut rows: Vec<Interaction> = self
            .interactions
            .read()
            .iter()
            .filter(|i| query.matches(i))
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.timestamp);
        Ok(rows)
    }

    async fn apply_chunk_upload(
        &self,
        project_id: &str,
        upload: ChunkUpload,
    ) -> Result<SessionRecording> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .entry(upload.session_id.clone())
            .or_insert_with(|| SessionRecording::new(upload.session_id.clone(), project_id));
        if session.project_id != project_id {
            return Err(Error::validation(format!(
                "session {} belongs to another project",
                upload.session_id
            )));
        }
        session.apply_upload(upload);
        Ok(session.clone())
    }

    async fn complete_session(&self, session_id: &str) -> Result<bool> {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.complete();
                Ok(true)
            }
            // Short-lived sessions may complete before any chunk lands.
            None => Ok(false),
        }
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecording>> {
        Ok(self.sessions.read().get(session_id).cloned())
    }

    async fn query_sessions(&self, query: &SessionQuery) -> Result<SessionPage> {
        let mut matched: Vec<SessionRecording> = self
            .sessions
            .read()
            .values()
            .filter(|s| query.matches(s))
            .cloned()
            .collect();
        // Newest first.
        matched.sort_by(|a, b| b.start_time.cmp(&a.start_time));

        let total = matched.len();
        let page = query.page.max(1);
        let page_size = query.page_size.clamp(1, 100);
        let sessions = matched
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        Ok(SessionPage {
            sessions,
            total,
            page,
            page_size,
        })
    }

    async fn create_funnel(&self, funnel: Funnel) -> Result<()> {
        self.funnels.write().insert(funnel.id, funnel);
        Ok(())
    }

    async fn get_funnel(&self, id: Uuid) -> Result<Option<Funnel>> {
        Ok(self.funnels.read().get(&id).cloned())
    }

    async fn list_funnels(&self, project_id: &str) -> Result<Vec<Funnel>> {
        let mut funnels: Vec<Funnel> = self
            .funnels
            .read()
            .values()
            .filter(|f| f.project_id == project_id)
            .cloned()
            .collect();
        funnels.sort_by_key(|f| f.created_at);
        Ok(funnels)
    }

    async fn set_active_recording(&self, recording: ActiveRecording) -> Result<()> {
        *self.active_recording.write() = Some(recording);
        Ok(())
    }

    async fn get_active_recording(&self) -> Result<Option<ActiveRecording>> {
        Ok(self.active_recording.read().clone())
    }

    async fn clear_active_recording(&self) -> Result<()> {
        *self.active_recording.write() = None;
        Ok(())
    }

    async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut interactions = self.interactions.write();
        let before = interactions.len();
        interactions.retain(|i| i.timestamp >= cutoff);
        Ok(before - interactions.len())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}
