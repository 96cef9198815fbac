//! Axum websocket endpoint bridging a real socket to a registered
//! [`WsChannel`] — grounded in the node-gateway socket loop pattern
//! (split sink/stream, spawn a reader task, drain outbound in the
//! foreground).

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tracing::warn;
use uuid::Uuid;

use nodes::protocol::InboundControl;

use crate::registry::ConnectionRegistry;

/// `GET /ws/:execution_id` — attaches the caller's socket to an
/// execution's channel. 404s if no execution with that id is currently
/// registered; 409s if a socket is already attached to it.
pub async fn execution_ws(
    ws: WebSocketUpgrade,
    State(registry): State<Arc<ConnectionRegistry>>,
    Path(execution_id): Path<Uuid>,
) -> impl IntoResponse {
    let Some(channel) = registry.get(execution_id) else {
        return (StatusCode::NOT_FOUND, "no such execution").into_response();
    };

    let Some(outbound_rx) = channel.take_outbound().await else {
        return (StatusCode::CONFLICT, "execution already has an attached client").into_response();
    };

    ws.on_upgrade(move |socket| bridge(socket, channel, outbound_rx)).into_response()
}

async fn bridge(
    socket: WebSocket,
    channel: Arc<crate::channel::WsChannel>,
    mut outbound_rx: tokio::sync::mpsc::UnboundedReceiver<nodes::protocol::OutboundEvent>,
) {
    let (mut sink, mut stream) = socket.split();

    let reader = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            let Message::Text(text) = message else { continue };
            match serde_json::from_str::<InboundControl>(&text) {
                Ok(control) => channel.push_inbound(control),
                Err(e) => warn!(error = %e, "dropping malformed inbound control message"),
            }
        }
    });

    while let Some(event) = outbound_rx.recv().await {
        let text = match serde_json::to_string(&event) {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "failed to serialize outbound event");
                continue;
            }
        };
        if sink.send(Message::Text(text)).await.is_err() {
            break;
        }
    }

    reader.abort();
}
