//! Store doubles for failure-path tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{
    ActiveRecording, ChunkUpload, Error, Funnel, Interaction, Result, SessionRecording,
    StoreErrorCode,
};
use event_store::{EventStore, InteractionQuery, SessionPage, SessionQuery};
use uuid::Uuid;

/// A store where every operation fails with a coded storage error.
pub struct FailingStore;

fn fail<T>() -> Result<T> {
    Err(Error::store(
        StoreErrorCode::OperationFailed,
        "injected storage failure",
    ))
}

#[async_trait]
impl EventStore for FailingStore {
    async fn insert_interactions(&self, _rows: Vec<Interaction>) -> Result<usize> {
        fail()
    }

    async fn query_interactions(&self, _query: &InteractionQuery) -> Result<Vec<Interaction>> {
        fail()
    }

    async fn apply_chunk_upload(
        &self,
        _project_id: &str,
        _upload: ChunkUpload,
    ) -> Result<SessionRecording> {
        fail()
    }

    async fn complete_session(&self, _session_id: &str) -> Result<bool> {
        fail()
    }

    async fn get_session(&self, _session_id: &str) -> Result<Option<SessionRecording>> {
        fail()
    }

    async fn query_sessions(&self, _query: &SessionQuery) -> Result<SessionPage> {
        fail()
    }

    async fn create_funnel(&self, _funnel: Funnel) -> Result<()> {
        fail()
    }

    async fn get_funnel(&self, _id: Uuid) -> Result<Option<Funnel>> {
        fail()
    }

    async fn list_funnels(&self, _project_id: &str) -> Result<Vec<Funnel>> {
        fail()
    }

    async fn set_active_recording(&self, _recording: ActiveRecording) -> Result<()> {
        fail()
    }

    async fn get_active_recording(&self) -> Result<Option<ActiveRecording>> {
        fail()
    }

    async fn clear_active_recording(&self) -> Result<()> {
        fail()
    }

    async fn sweep_expired(&self, _cutoff: DateTime<Utc>) -> Result<usize> {
        fail()
    }

    fn is_healthy(&self) -> bool {
        false
    }
}
