//! Per-connection runtime for an authenticated WebSocket.
//!
//! The socket splits into reader and writer halves. A writer task owns the
//! sink and drains an unbounded channel; the registry holds the channel's
//! sender, so broadcasts from any thread enqueue frames without touching
//! the socket. The calling task becomes the reader loop and blocks on the
//! socket until it errors or closes, then deregisters the connection.

use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::models::UserId;
use crate::ws::protocol::ServerEvent;
use crate::ws::registry::ConnectionRegistry;

/// Server sends a WebSocket ping every 30 seconds so half-open connections
/// cannot hold a registry slot forever.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// If no pong arrives within 10 seconds of a ping, the connection is closed.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a registered connection until its socket dies.
///
/// `greeting` is enqueued on the writer channel before the connection is
/// registered, which guarantees it is the very first outbound frame: a
/// broadcast can only reach the channel after registration.
pub async fn run<K>(
    socket: WebSocket,
    registry: Arc<ConnectionRegistry<K>>,
    topic: K,
    user_id: UserId,
    greeting: Option<ServerEvent>,
) where
    K: Eq + Hash + Copy + Display + Send + 'static,
{
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    if let Some(event) = greeting {
        match event.to_message() {
            Ok(frame) => {
                let _ = tx.send(frame);
            }
            Err(err) => {
                tracing::error!(user_id, error = %err, "failed to encode greeting frame");
            }
        }
    }

    let conn_id = registry.add(topic, user_id, tx.clone());
    tracing::info!(user_id, topic = %topic, connection_id = %conn_id, "websocket connected");

    // Writer task: owns the sink, forwards everything pushed to the channel.
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Ping task: periodic pings, closes the connection on pong timeout.
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died, the connection is gone
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {}
                _ => {
                    tracing::warn!("pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: the connection's only long-lived suspension point.
    // Clients do not speak an inbound protocol; reading exists to reply to
    // pings and to notice the socket dying.
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(user_id, reason = ?frame, "client initiated close");
                    break;
                }
                Message::Text(_) | Message::Binary(_) => {
                    tracing::debug!(user_id, "ignoring inbound client frame");
                }
            },
            Some(Err(err)) => {
                tracing::warn!(user_id, error = %err, "websocket receive error");
                break;
            }
            None => {
                tracing::info!(user_id, "websocket stream ended");
                break;
            }
        }
    }

    writer_handle.abort();
    ping_handle.abort();

    // NotFound here means a collaborator already closed the connection
    // through the hub while the reader was still draining.
    if registry.remove(topic, conn_id).is_err() {
        tracing::debug!(connection_id = %conn_id, "connection was already removed");
    }
    tracing::info!(user_id, topic = %topic, connection_id = %conn_id, "websocket disconnected");
}

/// Forwards frames from the connection's channel to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        let should_close = matches!(msg, Message::Close(_));
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed, the connection is broken
            break;
        }
        if should_close {
            break;
        }
    }
}
