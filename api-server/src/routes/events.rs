//! WebSocket push of task service events
//!
//! Each connection first receives the current task list, then every
//! `ServiceEvent` as JSON.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use todo_core::service::ServiceEvent;
use todo_core::task::Task;

use super::task::TaskResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventMessage {
    StateChanged { tasks: Vec<TaskResponse> },
    Error { message: String },
}

impl EventMessage {
    fn state_changed(tasks: Vec<Task>) -> Self {
        Self::StateChanged {
            tasks: tasks.into_iter().map(TaskResponse::from).collect(),
        }
    }
}

impl From<ServiceEvent> for EventMessage {
    fn from(event: ServiceEvent) -> Self {
        match event {
            ServiceEvent::StateChanged(tasks) => Self::state_changed(tasks),
            ServiceEvent::Error(message) => Self::Error { message },
        }
    }
}

/// GET /api/events - WebSocket upgrade
async fn events_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    // Subscribe before reading the snapshot so nothing falls in between
    let rx = state.service().subscribe();
    let initial = state.service().tasks().await;
    ws.on_upgrade(move |socket| forward_events(socket, initial, rx))
}

async fn forward_events(
    socket: WebSocket,
    initial: Vec<Task>,
    mut rx: broadcast::Receiver<ServiceEvent>,
) {
    info!("Event subscriber connected");
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        let mut next = Some(EventMessage::state_changed(initial));
        loop {
            let message = match next.take() {
                Some(message) => message,
                None => match rx.recv().await {
                    Ok(event) => EventMessage::from(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event subscriber lagged, skipped {} events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Incoming frames are ignored; we only watch for the peer going away
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Event socket error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    info!("Event subscriber disconnected");
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/events", get(events_ws))
}
