//! WebSocket relay endpoint.
//!
//! One socket per client. Outbound frames arrive on the hub's per-connection
//! channel and are pumped to the socket by a writer task; inbound text frames
//! parse into the versioned envelope and feed the relay. A malformed frame
//! earns an `error` envelope without dropping the connection.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use realtime::{ClientEnvelope, ServerEnvelope};
use telemetry::metrics;
use tracing::{debug, warn};

use crate::state::AppState;

/// GET /live - WebSocket upgrade.
pub async fn live_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let hub = state.hub().clone();
    let (conn, mut outbound) = hub.connect();
    metrics().active_relay_connections.inc();
    debug!(conn = conn, "Relay client connected");

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(envelope) = outbound.recv().await {
            let text = match serde_json::to_string(&envelope) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to encode relay frame");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => {
                metrics().relay_frames_received.inc();
                match serde_json::from_str::<ClientEnvelope>(&text) {
                    Ok(envelope) => {
                        if let Err(e) = state.relay.handle_frame(conn, envelope.frame).await {
                            warn!(error = %e, conn = conn, "Relay frame failed");
                            hub.send_to(conn, ServerEnvelope::error("RELAY_001", e.to_string()));
                        }
                    }
                    Err(e) => {
                        metrics().relay_frames_malformed.inc();
                        hub.send_to(
                            conn,
                            ServerEnvelope::error("RELAY_400", format!("malformed frame: {}", e)),
                        );
                    }
                }
            }
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames are not part of the
            // protocol.
            _ => {}
        }
    }

    hub.disconnect(conn);
    writer.abort();
    metrics().active_relay_connections.dec();
    debug!(conn = conn, "Relay client disconnected");
}
