//! Session recording model and chunk-merge logic.
//!
//! A `SessionRecording` is created on the first chunk upload for a session id
//! and mutated by every subsequent upload. Completion stamps `end_time` and
//! freezes the recording logically; later uploads are not expected but are
//! not rejected either.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, Result};
use crate::limits::{
    MAX_CHUNK_SIZE_BYTES, MAX_CONSOLE_LOGS_PER_UPLOAD, MAX_NETWORK_REQUESTS_PER_UPLOAD,
};
use crate::sdk::DeviceInfo;

/// Codec of a compressed replay chunk.
///
/// Chunks are opaque to the engine; the codec tag tells the dashboard how to
/// decode `data` without runtime type-branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkCodec {
    /// Plain JSON event array.
    #[default]
    Json,
    /// Gzip-compressed JSON, base64-encoded.
    GzipBase64,
}

/// One batch of compressed session-replay events uploaded in a single request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionChunk {
    pub codec: ChunkCodec,
    /// Opaque chunk payload.
    pub data: String,
    /// Replay event count declared by the SDK for this chunk.
    pub event_count: u32,
    /// Server receive time.
    pub recorded_at: DateTime<Utc>,
}

/// A console log entry captured alongside the recording.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleLog {
    /// log | info | warn | error
    #[validate(length(max = 16))]
    pub level: String,
    #[validate(length(max = 2000))]
    pub message: String,
    /// Client timestamp in Unix ms.
    pub timestamp: Option<i64>,
}

/// A network request entry captured alongside the recording.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRequest {
    #[validate(length(max = 2048))]
    pub url: String,
    #[validate(length(max = 16))]
    pub method: String,
    pub status: Option<u16>,
    pub duration_ms: Option<u64>,
    /// Client timestamp in Unix ms.
    pub timestamp: Option<i64>,
}

/// Rolling counters maintained across chunk uploads.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub chunk_count: u64,
    pub event_count: u64,
    pub click_count: u64,
    pub scroll_count: u64,
    pub error_count: u64,
}

/// A recorded user session assembled from chunk uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecording {
    /// Unique session id (client-generated).
    pub session_id: String,
    pub project_id: String,
    /// None for anonymous traffic.
    pub user_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Whole seconds between start and end, set on completion.
    pub duration_secs: Option<i64>,
    /// Replay chunks in upload order.
    pub chunks: Vec<SessionChunk>,
    pub console_logs: Vec<ConsoleLog>,
    pub network_requests: Vec<NetworkRequest>,
    /// Distinct URLs in first-seen order.
    pub pages_visited: Vec<String>,
    /// Last visited URL.
    pub exit_url: Option<String>,
    pub device: Option<DeviceInfo>,
    pub stats: SessionStats,
    pub is_complete: bool,
}

/// Per-upload metadata accompanying a chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// URL the user was on while this chunk was recorded.
    #[validate(length(max = 2048))]
    pub page_url: Option<String>,
    /// Clicks observed by the SDK during this chunk.
    pub click_count: Option<u64>,
    /// Scroll events observed during this chunk.
    pub scroll_count: Option<u64>,
    /// Errors observed during this chunk.
    pub error_count: Option<u64>,
    pub device_info: Option<DeviceInfo>,
}

/// A validated chunk upload, ready to merge into a session.
#[derive(Debug, Clone)]
pub struct ChunkUpload {
    pub session_id: String,
    pub user_id: Option<String>,
    pub chunk: SessionChunk,
    pub console_logs: Vec<ConsoleLog>,
    pub network_requests: Vec<NetworkRequest>,
    pub metadata: ChunkMetadata,
}

/// Chunk upload as received from the SDK (camelCase).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SdkChunkUpload {
    pub session_id: String,
    pub project_id: Option<String>,
    #[validate(length(max = 128))]
    pub user_id: Option<String>,
    pub chunk: SdkChunk,
    #[validate(nested)]
    pub console_logs: Option<Vec<ConsoleLog>>,
    #[validate(nested)]
    pub network_requests: Option<Vec<NetworkRequest>>,
    #[validate(nested)]
    pub metadata: Option<ChunkMetadata>,
}

/// Chunk body as received from the SDK.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkChunk {
    #[serde(default)]
    pub codec: ChunkCodec,
    pub data: String,
    pub event_count: Option<u32>,
}

impl SdkChunkUpload {
    /// Validates required fields and size caps, then produces the internal
    /// upload. Console log and network request lists are truncated to their
    /// per-upload caps rather than rejected.
    pub fn into_upload(self) -> Result<ChunkUpload> {
        self.validate()
            .map_err(|e| Error::validation(format!("{}", e)))?;

        if self.session_id.is_empty() {
            return Err(Error::missing_field("sessionId"));
        }
        if self.chunk.data.is_empty() {
            return Err(Error::missing_field("chunk.data"));
        }
        if self.chunk.data.len() > MAX_CHUNK_SIZE_BYTES {
            return Err(Error::validation_code(
                crate::error::ValidationErrorCode::PayloadTooLarge,
                format!(
                    "chunk size {}KB exceeds {}KB limit",
                    self.chunk.data.len() / 1024,
                    MAX_CHUNK_SIZE_BYTES / 1024
                ),
            ));
        }

        let mut console_logs = self.console_logs.unwrap_or_default();
        console_logs.truncate(MAX_CONSOLE_LOGS_PER_UPLOAD);
        let mut network_requests = self.network_requests.unwrap_or_default();
        network_requests.truncate(MAX_NETWORK_REQUESTS_PER_UPLOAD);

        Ok(ChunkUpload {
            session_id: self.session_id,
            user_id: self.user_id,
            chunk: SessionChunk {
                codec: self.chunk.codec,
                data: self.chunk.data,
                event_count: self.chunk.event_count.unwrap_or(0),
                recorded_at: Utc::now(),
            },
            console_logs,
            network_requests,
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}

impl SessionRecording {
    /// Creates the session shell for a first chunk upload.
    pub fn new(session_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            project_id: project_id.into(),
            user_id: None,
            start_time: Utc::now(),
            end_time: None,
            duration_secs: None,
            chunks: Vec::new(),
            console_logs: Vec::new(),
            network_requests: Vec::new(),
            pages_visited: Vec::new(),
            exit_url: None,
            device: None,
            stats: SessionStats::default(),
            is_complete: false,
        }
    }

    /// Merges one chunk upload into this session.
    ///
    /// Appends the chunk, merges console logs and network requests, updates
    /// `pages_visited` (dedup, insertion order) and `exit_url`, merges device
    /// metadata, and increments the stat counters. Callers must hold the
    /// store's per-session critical section so the counter updates are atomic.
    pub fn apply_upload(&mut self, upload: ChunkUpload) {
        if self.user_id.is_none() {
            self.user_id = upload.user_id;
        }

        self.stats.chunk_count += 1;
        self.stats.event_count += upload.chunk.event_count as u64;
        self.stats.click_count += upload.metadata.click_count.unwrap_or(0);
        self.stats.scroll_count += upload.metadata.scroll_count.unwrap_or(0);
        self.stats.error_count += upload.metadata.error_count.unwrap_or(0);

        self.chunks.push(upload.chunk);
        self.console_logs.extend(upload.console_logs);
        self.network_requests.extend(upload.network_requests);

        if let Some(url) = upload.metadata.page_url {
            if !self.pages_visited.contains(&url) {
                self.pages_visited.push(url.clone());
            }
            self.exit_url = Some(url);
        }

        if self.device.is_none() {
            self.device = upload.metadata.device_info;
        }
    }

    /// Marks the session complete. Idempotent: a second completion keeps the
    /// original end time and duration.
    pub fn complete(&mut self) {
        if self.is_complete {
            return;
        }
        let end = Utc::now();
        self.is_complete = true;
        self.end_time = Some(end);
        self.duration_secs = Some((end - self.start_time).num_milliseconds() / 1000);
    }

    /// True when any console log entry is an error.
    pub fn has_errors(&self) -> bool {
        self.stats.error_count > 0 || self.console_logs.iter().any(|l| l.level == "error")
    }
}
