//! HTTP surface: the websocket event channel plus two REST endpoints.

use crate::Server;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::debug;

pub fn router(server: Arc<Server>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/escrow", get(escrow))
        .route("/healthz", get(healthz))
        .with_state(server)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn escrow(State(server): State<Arc<Server>>) -> impl IntoResponse {
    Json(serde_json::json!({ "escrowAddress": server.config.escrow_address }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(server): State<Arc<Server>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, server))
}

async fn handle_socket(socket: WebSocket, server: Arc<Server>) {
    let (session_id, mut outbound) = server.open_session();
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str(&text) {
                Ok(event) => server.handle_event(session_id, event).await,
                Err(err) => {
                    debug!(session = session_id, ?err, "unparseable client event");
                    server.send_to(
                        session_id,
                        stakemate_types::ServerEvent::ErrorMsg {
                            msg: "Invalid message".to_string(),
                        },
                    );
                }
            },
            Message::Close(_) => break,
            // Pings are answered by the transport layer.
            _ => {}
        }
    }

    server.disconnect(session_id).await;
    writer.abort();
    debug!(session = session_id, "socket closed");
}
