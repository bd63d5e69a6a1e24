//! HTTP and WebSocket server
//!
//! Routes:
//! - `GET /ws` - WebSocket session for viewers and chat
//! - `GET /api/state` - Current map state snapshot
//! - `GET /health` - Liveness and connection count
//!
//! Each socket is registered with the [`ConnectionManager`] and serviced by a
//! single loop that selects between inbound frames and the connection's
//! outbound queue, so frames reach the client in the order they were queued.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use sdk::errors::{EngineError, ErrorExt};
use sdk::protocol::{ClientMessage, ServerMessage};
use sdk::types::MapState;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::agent::Orchestrator;
use crate::connections::{ConnectionId, ConnectionManager};

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    fn connections(&self) -> &Arc<ConnectionManager> {
        self.orchestrator.connections()
    }

    fn current_state(&self) -> MapState {
        self.orchestrator.executor().store().read()
    }
}

/// Build the router with WebSocket and API endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/state", get(state_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Waypoint server listening on http://{}", addr);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: AppState) {
    let connections = Arc::clone(state.connections());
    let (id, mut outbound) = connections.register_with(|| ServerMessage::StateSync {
        map_state: state.current_state(),
    });

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received from {}: {}", id, text);
                        handle_client_text(&state, id, &text);
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket {} closed by client", id);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket {} error: {}", id, e);
                        break;
                    }
                    None => break,
                }
            }
            queued = outbound.recv() => {
                let Some(message) = queued else {
                    // Manager dropped the connection (failed delivery)
                    break;
                };
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode outbound message: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }

    connections.remove(id);
}

fn handle_client_text(state: &AppState, id: ConnectionId, text: &str) {
    let connections = state.connections();

    match ClientMessage::decode(text) {
        Ok(ClientMessage::ChatMessage { content }) => {
            let orchestrator = Arc::clone(&state.orchestrator);
            // A disconnect must not cancel the turn for everyone else
            tokio::spawn(async move {
                orchestrator.run_turn(&content).await;
            });
        }
        Ok(ClientMessage::Ping) => {
            let _ = connections.send_to(id, ServerMessage::Pong);
        }
        Err(e) => {
            let error = EngineError::Protocol(e.to_string());
            warn!("Rejected message from {}: {}", id, error);
            let _ = connections.send_to(id, ServerMessage::error(error.user_hint()));
        }
    }
}

async fn state_handler(State(state): State<AppState>) -> Json<MapState> {
    Json(state.current_state())
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "connections": state.connections().len(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
