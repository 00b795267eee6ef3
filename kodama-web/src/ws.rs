use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tracing::debug;

use crate::state::AppState;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SnapshotCounts {
    pub nodes: usize,
    pub instances: usize,
    pub rejected: usize,
}

#[derive(Serialize)]
#[serde(tag = "type", content = "data")]
enum WsMessage {
    #[serde(rename = "snapshot_updated")]
    SnapshotUpdated(SnapshotCounts),
}

async fn snapshot_message(state: &AppState) -> Option<String> {
    let (nodes, instances, rejected) = state.counts().await;
    let msg = WsMessage::SnapshotUpdated(SnapshotCounts {
        nodes,
        instances,
        rejected,
    });
    serde_json::to_string(&msg).ok()
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the initial send so no reload slips between the two
    let mut update_rx = state.subscribe();

    // Send initial state
    if let Some(json) = snapshot_message(&state).await {
        if sender.send(Message::Text(json.into())).await.is_err() {
            return;
        }
    }

    // Spawn a task to forward updates to the WebSocket
    let send_state = state.clone();
    let mut send_task = tokio::spawn(async move {
        while update_rx.recv().await.is_ok() {
            if let Some(json) = snapshot_message(&send_state).await {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    // Receive messages from the client (mainly for keepalive/close detection)
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }
    debug!("websocket client disconnected");
}
