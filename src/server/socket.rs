//! Realtime channel for stream pages
//!
//! One WebSocket per browser tab. The server pushes the stream list whenever
//! the registry changes, and viewer counts for the stream pages the tab has
//! joined. Messages are JSON text frames.

use std::collections::HashSet;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;

use crate::registry::{EventKind, RegistryEvent, StreamSummary};
use crate::server::state::AppState;
use crate::stats::ViewerCount;

/// Messages a browser may send
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start watching a stream page
    Join { key: String },
    /// Stop watching a stream page
    Leave { key: String },
    /// Ask for the current stream list
    StreamList,
}

/// Messages pushed to the browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerMessage {
    StreamList {
        list: Vec<StreamSummary>,
    },
    StreamAdded {
        key: String,
        list: Vec<StreamSummary>,
    },
    StreamRemoved {
        key: String,
        list: Vec<StreamSummary>,
    },
    #[serde(rename = "viewercount")]
    ViewerCount {
        key: String,
        count: u32,
    },
}

impl From<RegistryEvent> for ServerMessage {
    fn from(event: RegistryEvent) -> Self {
        match event.kind {
            EventKind::Added => ServerMessage::StreamAdded {
                key: event.key,
                list: event.list,
            },
            EventKind::Removed => ServerMessage::StreamRemoved {
                key: event.key,
                list: event.list,
            },
        }
    }
}

impl From<ViewerCount> for ServerMessage {
    fn from(change: ViewerCount) -> Self {
        ServerMessage::ViewerCount {
            key: change.key,
            count: change.count,
        }
    }
}

type Sink = SplitSink<WebSocket, Message>;

pub async fn websocket_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // Control messages are tiny
    ws.max_message_size(16 * 1024)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send(sink: &mut Sink, message: &ServerMessage) -> Result<(), axum::Error> {
    let json = match serde_json::to_string(message) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode socket message");
            return Ok(());
        }
    };
    sink.send(Message::Text(json.into())).await
}

async fn send_stream_list(sink: &mut Sink, state: &AppState) -> Result<(), axum::Error> {
    let list = state.registry.snapshot().await;
    send(sink, &ServerMessage::StreamList { list }).await
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut incoming) = socket.split();

    // Subscribe before the first snapshot so no change slips in between
    let mut events = state.registry.subscribe();
    let mut counts = state.viewers.subscribe();
    let mut rooms: HashSet<String> = HashSet::new();

    tracing::debug!("Socket connected");

    if send_stream_list(&mut sink, &state).await.is_ok() {
        loop {
            let result = tokio::select! {
                message = incoming.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        handle_text(text.as_str(), &state, &mut rooms, &mut sink).await
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "Socket read error");
                        break;
                    }
                    Some(Ok(_)) => Ok(()),
                },
                event = events.recv() => match event {
                    Ok(event) => send(&mut sink, &ServerMessage::from(event)).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped = skipped, "Socket lagged behind registry events");
                        send_stream_list(&mut sink, &state).await
                    }
                    Err(RecvError::Closed) => break,
                },
                change = counts.recv() => match change {
                    Ok(change) if rooms.contains(&change.key) => {
                        send(&mut sink, &ServerMessage::from(change)).await
                    }
                    Ok(_) | Err(RecvError::Lagged(_)) => Ok(()),
                    Err(RecvError::Closed) => break,
                },
            };

            if let Err(e) = result {
                tracing::debug!(error = %e, "Socket write failed");
                break;
            }
        }
    }

    for key in rooms {
        state.viewers.leave(&key).await;
    }

    tracing::debug!("Socket closed");
}

async fn handle_text(
    text: &str,
    state: &AppState,
    rooms: &mut HashSet<String>,
    sink: &mut Sink,
) -> Result<(), axum::Error> {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed socket message");
            return Ok(());
        }
    };

    match message {
        ClientMessage::Join { key } => {
            // Only keys the registry knows get a counter
            if state.registry.get(&key).await.is_none() {
                tracing::debug!(stream = %key, "Ignoring join for unknown stream");
                return Ok(());
            }
            if rooms.insert(key.clone()) {
                state.viewers.join(&key).await;
            }
            Ok(())
        }
        ClientMessage::Leave { key } => {
            if rooms.remove(&key) {
                state.viewers.leave(&key).await;
            }
            Ok(())
        }
        ClientMessage::StreamList => send_stream_list(sink, state).await,
    }
}
