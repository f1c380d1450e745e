use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use crate::config::Heartbeat;
use crate::error::RelayError;
use crate::state::AppState;
use crate::ws::protocol::Connection;

/// Close code sent when a peer stops answering pings.
const CLOSE_GOING_AWAY: u16 = 1001;

/// How long the writer gets to flush queued frames (such as a close) after
/// the reader stops.
const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Run the actor-per-connection pattern for a relay WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader loop: handles one inbound frame to completion before the next
///
/// The room registry holds a clone of the mpsc sender, which is how peers'
/// broadcasts reach this socket.
pub async fn run_connection(socket: WebSocket, state: AppState, peer: SocketAddr) {
    let connection_id = Uuid::new_v4();
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let mut connection = Connection::new(connection_id, tx.clone(), state.rooms.clone());

    tracing::info!(
        connection_id = %connection_id,
        peer = %peer,
        "WebSocket actor started"
    );

    // Spawn writer task: forwards mpsc messages to WebSocket sink
    let mut writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Track pong reception
    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();

    let mut heartbeat_handle = state
        .heartbeat
        .map(|heartbeat| tokio::spawn(heartbeat_task(heartbeat, tx.clone(), pong_rx)));

    // Reader loop: process incoming WebSocket messages until the peer goes
    // away or the heartbeat gives up on it
    loop {
        let incoming = tokio::select! {
            incoming = ws_receiver.next() => incoming,
            _ = heartbeat_stopped(&mut heartbeat_handle) => {
                tracing::info!(connection_id = %connection_id, "Peer stopped answering pings");
                break;
            }
        };

        match incoming {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    if let Err(e) = connection.handle_text(text.as_str()) {
                        log_dropped_frame(connection_id, &e);
                    }
                }
                Message::Binary(data) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        bytes = data.len(),
                        "Ignoring binary frame (protocol is JSON text)"
                    );
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(
                        connection_id = %connection_id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                // Stream ended: client disconnected
                tracing::info!(connection_id = %connection_id, "WebSocket stream ended");
                break;
            }
        }
    }

    // Leave the room first so no broadcast targets a dead channel
    connection.close();

    if let Some(handle) = heartbeat_handle {
        handle.abort();
    }

    // Once every sender is gone the writer drains its queue and exits
    drop(connection);
    drop(tx);
    if timeout(WRITER_DRAIN, &mut writer_handle).await.is_err() {
        writer_handle.abort();
    }

    tracing::info!(
        connection_id = %connection_id,
        peer = %peer,
        "WebSocket actor stopped"
    );
}

/// Unknown types come from newer clients and are expected; everything else
/// is a misbehaving peer.
fn log_dropped_frame(connection_id: Uuid, error: &RelayError) {
    match error {
        RelayError::Decode(e) if e.is_unknown_type() => {
            tracing::debug!(connection_id = %connection_id, error = %e, "Ignoring envelope");
        }
        _ => {
            tracing::warn!(connection_id = %connection_id, error = %error, "Dropped inbound frame");
        }
    }
}

/// Writer task: receives messages from mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed: connection is broken
            break;
        }
    }
}

/// Resolves when the heartbeat task has finished, which only happens once the
/// peer missed a pong or the writer is gone. Pending forever without one.
async fn heartbeat_stopped(handle: &mut Option<JoinHandle<()>>) {
    match handle {
        Some(handle) => {
            let _ = handle.await;
        }
        None => std::future::pending().await,
    }
}

/// Ping task: sends periodic pings and queues a close frame when a pong is
/// late. Returning ends the connection.
async fn heartbeat_task(
    heartbeat: Heartbeat,
    tx: mpsc::UnboundedSender<Message>,
    mut pong_rx: mpsc::UnboundedReceiver<()>,
) {
    let mut ping_timer = interval(heartbeat.interval);
    // Skip the first immediate tick
    ping_timer.tick().await;

    loop {
        ping_timer.tick().await;

        // Drop pongs for earlier pings
        while pong_rx.try_recv().is_ok() {}

        if tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
            // Writer task has died: connection is gone
            break;
        }

        match timeout(heartbeat.pong_timeout, pong_rx.recv()).await {
            Ok(Some(())) => {}
            _ => {
                tracing::warn!("Pong timeout, closing connection");
                let _ = tx.send(Message::Close(Some(CloseFrame {
                    code: CLOSE_GOING_AWAY,
                    reason: "Pong timeout".into(),
                })));
                break;
            }
        }
    }
}
