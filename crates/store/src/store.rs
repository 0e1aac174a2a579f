//! The storage trait every backend implements.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{ActiveRecording, ChunkUpload, Funnel, Interaction, Result, SessionRecording};
use uuid::Uuid;

use crate::query::{InteractionQuery, SessionPage, SessionQuery};

/// Storage backend for the capture engine.
///
/// Implementations must make `apply_chunk_upload` atomic per session id so
/// stat counters never race under concurrent uploads.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of interaction rows. Returns the number persisted.
    async fn insert_interactions(&self, rows: Vec<Interaction>) -> Result<usize>;

    /// Reads interactions matching the query, sorted by timestamp ascending.
    async fn query_interactions(&self, query: &InteractionQuery) -> Result<Vec<Interaction>>;

    /// Find-or-create the session and merge one chunk upload into it.
    async fn apply_chunk_upload(
        &self,
        project_id: &str,
        upload: ChunkUpload,
    ) -> Result<SessionRecording>;

    /// Marks a session complete. Unknown ids are an idempotent no-op and
    /// return `false`.
    async fn complete_session(&self, session_id: &str) -> Result<bool>;

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecording>>;

    /// Paginated session listing with filters.
    async fn query_sessions(&self, query: &SessionQuery) -> Result<SessionPage>;

    /// Stores an immutable funnel definition.
    async fn create_funnel(&self, funnel: Funnel) -> Result<()>;

    async fn get_funnel(&self, id: Uuid) -> Result<Option<Funnel>>;

    async fn list_funnels(&self, project_id: &str) -> Result<Vec<Funnel>>;

    /// Overwrites the active-recording slot (last-writer-wins).
    async fn set_active_recording(&self, recording: ActiveRecording) -> Result<()>;

    async fn get_active_recording(&self) -> Result<Option<ActiveRecording>>;

    async fn clear_active_recording(&self) -> Result<()>;

    /// Drops interactions older than the cutoff. Returns the number removed.
    async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Result<usize>;

    /// Whether the backend can currently serve reads and writes.
    fn is_healthy(&self) -> bool;
}
