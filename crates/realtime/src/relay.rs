//! Per-connection relay protocol.
//!
//! Drives the Idle → Active → Idle recording state machine and routes
//! frames between SDK clients, admin viewers, and the gateway's live
//! notifications.

use std::sync::Arc;

use chrono::Utc;
use engine_core::{ActiveRecording, LiveNotification, Result};
use event_store::EventStore;
use tracing::{debug, warn};

use crate::classify::classify_replay_event;
use crate::hub::{ConnectionId, Hub};
use crate::protocol::{ClientFrame, ServerEnvelope, ServerFrame};

/// Routes relay frames and owns the active-recording slot writes.
#[derive(Clone)]
pub struct Relay {
    hub: Arc<Hub>,
    store: Arc<dyn EventStore>,
}

impl Relay {
    pub fn new(hub: Arc<Hub>, store: Arc<dyn EventStore>) -> Self {
        Self { hub, store }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Publishes a gateway notification into the project room.
    /// Fire-and-forget: delivery failures only drop the frame.
    pub fn publish_notification(&self, project_id: &str, notification: LiveNotification) {
        let event = match serde_json::to_value(&notification) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to encode live notification");
                return;
            }
        };
        self.hub.broadcast_room(
            &Hub::project_room(project_id),
            &ServerEnvelope::new(ServerFrame::LiveEvent { event }),
        );
    }

    /// Handles one parsed client frame.
    pub async fn handle_frame(&self, conn: ConnectionId, frame: ClientFrame) -> Result<()> {
        match frame {
            ClientFrame::SdkRegister {
                project_id,
                user_id,
            } => {
                let room = Hub::project_room(&project_id);
                self.hub.join(&room, conn);
                debug!(project_id = %project_id, conn = conn, "SDK client registered");

                self.hub.broadcast_room(
                    &room,
                    &ServerEnvelope::new(ServerFrame::UserJoined {
                        project_id: project_id.clone(),
                        user_id,
                    }),
                );
                self.hub.broadcast_room(
                    &room,
                    &ServerEnvelope::new(ServerFrame::ActiveUsers {
                        count: self.hub.room_size(&room),
                        project_id,
                    }),
                );
            }

            ClientFrame::LiveEvent { project_id, event } => {
                self.hub.broadcast_room(
                    &Hub::project_room(&project_id),
                    &ServerEnvelope::new(ServerFrame::LiveEvent { event }),
                );
            }

            ClientFrame::AdminStartRecording {
                recording_id,
                project_id,
                admin_id,
            } => {
                let recording = ActiveRecording {
                    recording_id: recording_id.clone(),
                    project_id: project_id.clone(),
                    admin_id,
                    started_at: Utc::now(),
                };
                // Last-writer-wins: a new start simply overwrites the slot.
                self.store.set_active_recording(recording.clone()).await?;
                self.hub.join(&Hub::admin_room(&recording_id), conn);
                debug!(recording_id = %recording_id, "Recording started");

                self.hub.broadcast_room(
                    &Hub::project_room(&project_id),
                    &ServerEnvelope::new(ServerFrame::RecordingStarted { recording }),
                );
            }

            ClientFrame::AdminStopRecording { recording_id } => {
                self.store.clear_active_recording().await?;
                debug!(recording_id = ?recording_id, "Recording stopped");
                // Unconditional broadcast so no client is stranded recording.
                self.hub.broadcast_all(&ServerEnvelope::new(
                    ServerFrame::RecordingStopped { recording_id },
                ));
            }

            ClientFrame::RecordingEvent {
                recording_id,
                event,
            } => {
                let classification = classify_replay_event(&event).to_string();
                self.hub.broadcast_room(
                    &Hub::admin_room(&recording_id),
                    &ServerEnvelope::new(ServerFrame::RecordingEvent {
                        recording_id,
                        classification,
                        event,
                    }),
                );
            }

            ClientFrame::HeatmapShow {
                project_id,
                page_url,
            } => {
                self.hub.broadcast_room(
                    &Hub::project_room(&project_id),
                    &ServerEnvelope::new(ServerFrame::HeatmapShow {
                        project_id: project_id.clone(),
                        page_url,
                    }),
                );
            }

            ClientFrame::HeatmapHide { project_id } => {
                self.hub.broadcast_room(
                    &Hub::project_room(&project_id),
                    &ServerEnvelope::new(ServerFrame::HeatmapHide {
                        project_id: project_id.clone(),
                    }),
                );
            }
        }
        Ok(())
    }
}
