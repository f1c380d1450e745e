use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use vidnote_proto::{decode, encode, ClientEnvelope, Envelope, Id, ServerEnvelope};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::handler::RelayHandler;
use crate::reconnect::Reconnector;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Socket lifecycle as seen by the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        })
    }
}

/// Room the driver joins on every open.
#[derive(Debug, Clone, PartialEq)]
struct RoomTarget {
    video_id: Id,
    user_id: Id,
}

/// Handle to a running driver task.
struct Driver {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// One outbound relay connection with automatic rejoin and reconnect.
pub struct RelayClient {
    config: ClientConfig,
    handler: Arc<dyn RelayHandler>,
    state: Arc<watch::Sender<ConnectionState>>,
    room: Arc<watch::Sender<Option<RoomTarget>>>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    driver: Option<Driver>,
}

impl RelayClient {
    pub fn new(config: ClientConfig, handler: impl RelayHandler) -> Self {
        let room = match (&config.video_id, &config.user_id) {
            (Some(video_id), Some(user_id)) => Some(RoomTarget {
                video_id: video_id.clone(),
                user_id: user_id.clone(),
            }),
            _ => None,
        };
        let (state, _) = watch::channel(ConnectionState::Closed);
        let (room, _) = watch::channel(room);

        Self {
            config,
            handler: Arc::new(handler),
            state: Arc::new(state),
            room: Arc::new(room),
            outbound: None,
            driver: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Open the socket, tearing down any existing one first.
    ///
    /// Returns once the driver is spawned; watch [`state`](Self::state) or
    /// the handler for the outcome.
    pub async fn connect(&mut self) {
        self.disconnect().await;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = DriverTask {
            url: self.config.url.clone(),
            connect_timeout: self.config.connect_timeout,
            handler: self.handler.clone(),
            state: self.state.clone(),
            room: self.room.clone(),
            outbound: outbound_rx,
            shutdown: shutdown_rx,
            reconnector: Reconnector::new(self.config.reconnect.clone()),
        };

        self.outbound = Some(outbound_tx);
        self.driver = Some(Driver {
            shutdown: shutdown_tx,
            handle: tokio::spawn(task.run()),
        });
    }

    /// Close the socket and cancel any pending reconnect.
    /// Waits for the driver to finish; the state is `Closed` afterwards.
    pub async fn disconnect(&mut self) {
        self.outbound = None;
        if let Some(driver) = self.driver.take() {
            let _ = driver.shutdown.send(());
            if let Err(e) = driver.handle.await {
                tracing::warn!(error = %e, "Relay driver task failed");
            }
        }
        set_state(&self.state, self.handler.as_ref(), ConnectionState::Closed);
    }

    /// Queue an envelope if the socket is open.
    /// Returns whether the send was attempted.
    pub fn send_message(&self, envelope: &ClientEnvelope) -> bool {
        if self.state() != ConnectionState::Open {
            tracing::debug!(kind = envelope.kind(), state = %self.state(), "Not sending, socket not open");
            return false;
        }
        let Some(outbound) = &self.outbound else {
            return false;
        };
        match encode(envelope) {
            Ok(text) => outbound.send(Message::Text(text.into())).is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, kind = envelope.kind(), "Failed to encode envelope");
                false
            }
        }
    }

    /// Switch rooms. The new room is also rejoined after any reconnect.
    pub fn join(&self, video_id: impl Into<Id>, user_id: impl Into<Id>) -> bool {
        let target = RoomTarget {
            video_id: video_id.into(),
            user_id: user_id.into(),
        };
        let envelope = ClientEnvelope::Join {
            video_id: target.video_id.clone(),
            user_id: target.user_id.clone(),
        };
        self.room.send_replace(Some(target));
        self.send_message(&envelope)
    }

    /// Announce a comment that the app has already saved.
    pub fn send_comment(&self, comment: Value) -> bool {
        let Some(video_id) = self.current_video() else {
            return false;
        };
        self.send_message(&ClientEnvelope::NewComment { video_id, comment })
    }

    pub fn send_typing(&self, is_typing: bool) -> bool {
        let Some(target) = self.room.borrow().clone() else {
            return false;
        };
        self.send_message(&ClientEnvelope::Typing {
            video_id: target.video_id,
            user_id: target.user_id,
            is_typing,
        })
    }

    fn current_video(&self) -> Option<Id> {
        self.room.borrow().as_ref().map(|target| target.video_id.clone())
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        // Signal the driver without waiting; it stops at its next select
        if let Some(driver) = self.driver.take() {
            let _ = driver.shutdown.send(());
        }
    }
}

/// Update the shared state and notify the handler on change.
fn set_state(
    state: &watch::Sender<ConnectionState>,
    handler: &dyn RelayHandler,
    next: ConnectionState,
) {
    let changed = state.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
    if changed {
        handler.on_state_change(next);
    }
}

enum SessionEnd {
    /// `disconnect` was called.
    Shutdown,
    /// The peer or the network closed the socket.
    Dropped(Option<ClientError>),
}

/// Background task owning the socket, the reconnect timer, and the attempt counter.
struct DriverTask {
    url: String,
    connect_timeout: Duration,
    handler: Arc<dyn RelayHandler>,
    state: Arc<watch::Sender<ConnectionState>>,
    room: Arc<watch::Sender<Option<RoomTarget>>>,
    outbound: mpsc::UnboundedReceiver<Message>,
    shutdown: oneshot::Receiver<()>,
    reconnector: Reconnector,
}

impl DriverTask {
    async fn run(mut self) {
        self.reconnector.start();

        loop {
            self.set_state(ConnectionState::Connecting);

            let attempt = tokio::select! {
                _ = &mut self.shutdown => {
                    self.reconnector.stop();
                    break;
                }
                result = tokio::time::timeout(
                    self.connect_timeout,
                    connect_async(self.url.as_str()),
                ) => result,
            };

            match attempt {
                Ok(Ok((stream, _))) => {
                    self.reconnector.reset();
                    // Frames queued for a previous socket are stale
                    while self.outbound.try_recv().is_ok() {}
                    self.set_state(ConnectionState::Open);
                    tracing::info!(url = %self.url, "Connected to relay");

                    match self.session(stream).await {
                        SessionEnd::Shutdown => {
                            self.reconnector.stop();
                            break;
                        }
                        SessionEnd::Dropped(error) => {
                            tracing::info!(url = %self.url, "Relay connection dropped");
                            if let Some(error) = error {
                                self.handler.on_error(&error);
                            }
                        }
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(url = %self.url, error = %e, "Relay connect failed");
                    self.handler.on_error(&ClientError::Connect(e));
                }
                Err(_) => {
                    tracing::warn!(
                        url = %self.url,
                        timeout = ?self.connect_timeout,
                        "Relay connect timed out"
                    );
                    self.handler
                        .on_error(&ClientError::ConnectTimeout(self.connect_timeout));
                }
            }

            self.set_state(ConnectionState::Closed);

            let Some(delay) = self.reconnector.next_delay() else {
                if self.reconnector.is_exhausted() {
                    tracing::warn!(attempts = self.reconnector.attempts(), "Giving up on relay");
                    self.handler
                        .on_error(&ClientError::ReconnectExhausted(self.reconnector.attempts()));
                }
                break;
            };

            tracing::info!(
                attempt = self.reconnector.attempts(),
                delay_ms = delay.as_millis() as u64,
                "Scheduling relay reconnect"
            );

            tokio::select! {
                _ = &mut self.shutdown => {
                    self.reconnector.stop();
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(ConnectionState::Closed);
    }

    async fn session(&mut self, stream: WsStream) -> SessionEnd {
        let (mut write, mut read) = stream.split();

        let target = self.room.borrow().clone();
        if let Some(target) = target {
            let join = ClientEnvelope::Join {
                video_id: target.video_id,
                user_id: target.user_id,
            };
            match encode(&join) {
                Ok(text) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        return SessionEnd::Dropped(Some(ClientError::Transport(e)));
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to encode join"),
            }
        }

        loop {
            tokio::select! {
                _ = &mut self.shutdown => {
                    self.set_state(ConnectionState::Closing);
                    let _ = write.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                }
                Some(msg) = self.outbound.recv() => {
                    if let Err(e) = write.send(msg).await {
                        return SessionEnd::Dropped(Some(ClientError::Transport(e)));
                    }
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.dispatch(text.as_str()),
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(reason = ?frame, "Relay closed the connection");
                        return SessionEnd::Dropped(None);
                    }
                    // Pings are answered by tungstenite itself
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return SessionEnd::Dropped(Some(ClientError::Transport(e))),
                    None => return SessionEnd::Dropped(None),
                },
            }
        }
    }

    fn dispatch(&self, text: &str) {
        match decode::<ServerEnvelope>(text) {
            Ok(ServerEnvelope::Joined { video_id }) => {
                tracing::debug!(video_id = %video_id, "Joined room");
                self.handler.on_joined(&video_id);
            }
            Ok(ServerEnvelope::NewComment { comment }) => self.handler.on_new_comment(&comment),
            Ok(ServerEnvelope::Typing { user_id, is_typing }) => {
                self.handler.on_typing_indicator(&user_id, is_typing)
            }
            Err(e) if e.is_unknown_type() => {
                tracing::debug!(error = %e, "Ignoring envelope");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Dropped inbound frame");
            }
        }
    }

    fn set_state(&self, next: ConnectionState) {
        set_state(&self.state, self.handler.as_ref(), next);
    }
}
