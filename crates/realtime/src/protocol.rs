//! Relay wire protocol.
//!
//! Every frame travels inside a versioned envelope `{v, type, data}` so the
//! protocol can evolve without breaking deployed SDKs.

use engine_core::ActiveRecording;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// A raw session-replay event as produced by the recorder.
///
/// `kind` and `data.source`/`data.type` drive classification; the payload
/// itself stays opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayEvent {
    #[serde(rename = "type")]
    pub kind: i64,
    #[serde(default)]
    pub data: Value,
    pub timestamp: Option<i64>,
}

/// Frames a client may send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientFrame {
    /// Instrumented SDK joins its project room.
    #[serde(rename = "sdk:register")]
    SdkRegister {
        #[serde(rename = "projectId")]
        project_id: String,
        #[serde(rename = "userId")]
        user_id: Option<String>,
    },
    /// Lightweight live event from an SDK client, forwarded to the project
    /// room.
    LiveEvent {
        #[serde(rename = "projectId")]
        project_id: String,
        event: Value,
    },
    /// Admin starts mirroring a recording.
    AdminStartRecording {
        #[serde(rename = "recordingId")]
        recording_id: String,
        #[serde(rename = "projectId")]
        project_id: String,
        #[serde(rename = "adminId")]
        admin_id: String,
    },
    /// Admin stops mirroring. Broadcast to everyone so no client is
    /// stranded recording.
    AdminStopRecording {
        #[serde(rename = "recordingId")]
        recording_id: Option<String>,
    },
    /// Replay frame from an instrumented client, forwarded to the admin
    /// room after classification.
    RecordingEvent {
        #[serde(rename = "recordingId")]
        recording_id: String,
        event: ReplayEvent,
    },
    /// Admin toggles the heatmap overlay for a project.
    HeatmapShow {
        #[serde(rename = "projectId")]
        project_id: String,
        #[serde(rename = "pageUrl")]
        page_url: Option<String>,
    },
    HeatmapHide {
        #[serde(rename = "projectId")]
        project_id: String,
    },
}

/// Frames the server sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerFrame {
    /// A client registered in the project room.
    UserJoined {
        #[serde(rename = "projectId")]
        project_id: String,
        #[serde(rename = "userId")]
        user_id: Option<String>,
    },
    /// Current project-room roster size.
    ActiveUsers {
        #[serde(rename = "projectId")]
        project_id: String,
        count: usize,
    },
    /// Live notification or SDK live event for dashboard tickers.
    LiveEvent { event: Value },
    RecordingStarted { recording: ActiveRecording },
    RecordingStopped {
        #[serde(rename = "recordingId")]
        recording_id: Option<String>,
    },
    /// Classified replay frame relayed to the admin viewer.
    RecordingEvent {
        #[serde(rename = "recordingId")]
        recording_id: String,
        classification: String,
        event: ReplayEvent,
    },
    HeatmapShow {
        #[serde(rename = "projectId")]
        project_id: String,
        #[serde(rename = "pageUrl")]
        page_url: Option<String>,
    },
    HeatmapHide {
        #[serde(rename = "projectId")]
        project_id: String,
    },
    Error { code: String, message: String },
}

/// Versioned envelope around a client frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientEnvelope {
    pub v: u8,
    #[serde(flatten)]
    pub frame: ClientFrame,
}

/// Versioned envelope around a server frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEnvelope {
    pub v: u8,
    #[serde(flatten)]
    pub frame: ServerFrame,
}

impl ServerEnvelope {
    pub fn new(frame: ServerFrame) -> Self {
        Self {
            v: PROTOCOL_VERSION,
            frame,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ServerFrame::Error {
            code: code.into(),
            message: message.into(),
        })
    }
}
