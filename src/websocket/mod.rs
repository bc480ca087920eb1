//! WebSocket server for per-user real-time notifications
//!
//! Every authenticated user gets a private channel keyed by user id.
//! Delivery is at-most-once and connection-scoped: events published while a
//! user has no open socket are dropped.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use crate::error::ApiError;
use crate::notifications::ChannelEvent;
use crate::state::AppState;

const CHANNEL_CAPACITY: usize = 64;

/// Registry of per-user broadcast channels
#[derive(Clone)]
pub struct ChannelRegistry {
    channels: Arc<RwLock<HashMap<Uuid, broadcast::Sender<ChannelEvent>>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Publish an event to one user's channel.
    ///
    /// A silent no-op when the user has no open connection.
    pub async fn publish(&self, user_id: Uuid, event: ChannelEvent) {
        let channels = self.channels.read().await;
        match channels.get(&user_id) {
            Some(tx) => {
                // send only fails when every receiver is gone; the channel
                // gets pruned on disconnect, so just drop the event
                if tx.send(event).is_err() {
                    tracing::debug!(user_id = %user_id, "Event dropped, channel has no receivers");
                }
            }
            None => {
                tracing::debug!(user_id = %user_id, "Event dropped, user not connected");
            }
        }
    }

    /// Subscribe to a user's channel, creating it on first use
    pub async fn subscribe(&self, user_id: Uuid) -> broadcast::Receiver<ChannelEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Remove a user's channel once its last receiver is gone
    pub async fn prune(&self, user_id: Uuid) {
        let mut channels = self.channels.write().await;
        if let Some(tx) = channels.get(&user_id) {
            if tx.receiver_count() == 0 {
                channels.remove(&user_id);
            }
        }
    }

    /// Number of users with an open channel
    pub async fn connected_users(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Connection query parameters: browsers cannot set headers on WebSocket
/// upgrade requests, so the token rides in the query string
#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: String,
}

/// Client message types
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ClientMessage {
    Ping,
}

/// Server message types
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ServerMessage {
    Event { event: ChannelEvent },
    Pong,
}

/// WebSocket handler - authenticates and upgrades the HTTP connection
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsAuthQuery>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    // Resolve the actor from the token; banned accounts cannot connect
    let user = state.auth_service.authenticate_token(&query.token).await?;

    let registry = state.channel_registry.clone();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, registry, user.id)))
}

/// Handle an authenticated WebSocket connection
async fn handle_socket(socket: WebSocket, registry: ChannelRegistry, user_id: Uuid) {
    tracing::info!(user_id = %user_id, "WebSocket connected");

    let mut rx = registry.subscribe(user_id).await;
    let (mut sender, mut receiver) = socket.split();

    // Internal channel for sending pongs from recv_task to sender
    let (internal_tx, mut internal_rx) = mpsc::channel::<ServerMessage>(32);

    // Forward channel events and internal messages to this client
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Ok(event) => {
                            let msg = ServerMessage::Event { event };
                            if let Ok(text) = serde_json::to_string(&msg) {
                                if sender.send(Message::Text(text)).await.is_err() {
                                    break;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(user_id = %user_id, skipped, "Slow WebSocket client, events dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                Some(msg) = internal_rx.recv() => {
                    if let Ok(text) = serde_json::to_string(&msg) {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                }
                else => break,
            }
        }
    });

    // Handle incoming messages from the client
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Ok(ClientMessage::Ping) = serde_json::from_str::<ClientMessage>(&text) {
                        let _ = internal_tx.send(ServerMessage::Pong).await;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    registry.prune(user_id).await;
    tracing::info!(user_id = %user_id, "WebSocket disconnected");
}
