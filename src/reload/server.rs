//! Reload WebSocket server.
//!
//! One server lives for one build session. Browser-side reload clients
//! connect to it and receive [`HmrPayload`] messages.
//!
//! # State Machine
//!
//! ```text
//! Listening ──close()/signal──► Closing ──drained──► Closed
//! ```
//!
//! - `Listening`: accepting connections, broadcasts delivered
//! - `Closing`: accept loop stopped, connections told to close
//! - `Closed`: terminal, broadcasts rejected
//!
//! # Connection Flow
//!
//! 1. Client connects and upgrades to WebSocket
//! 2. Client joins the broadcast set
//! 3. Server sends `{"type":"connected"}`
//! 4. Every later broadcast is queued behind the handshake
//!
//! A client that connects after a broadcast never sees that broadcast.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

use super::protocol::HmrPayload;

// ============================================================================
// Constants
// ============================================================================

/// Delay between build end and the `update` broadcast, letting emitted
/// files finish flushing to disk.
pub const DEFAULT_UPDATE_DELAY: Duration = Duration::from_millis(500);

/// How long `close` waits for connections to drain.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

type WsWrite = SplitSink<WebSocketStream<TcpStream>, Message>;

type WsRead = SplitStream<WebSocketStream<TcpStream>>;

/// Broadcast set: one command channel per open connection.
type ClientMap = FxHashMap<Uuid, mpsc::UnboundedSender<ClientCommand>>;

/// Lifecycle state of the reload server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Accepting connections and delivering broadcasts.
    Listening,
    /// Shutdown requested, connections draining.
    Closing,
    /// Terminal.
    Closed,
}

/// Commands for a connection task.
enum ClientCommand {
    /// Send a text frame.
    Send(String),
    /// Send a close frame and stop.
    Close,
}

// ============================================================================
// ReloadServer
// ============================================================================

/// WebSocket server broadcasting reload messages to every open connection.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use crx_plugin::reload::{HmrPayload, ReloadServer};
///
/// # async fn example() -> crx_plugin::Result<()> {
/// let server = ReloadServer::bind("localhost", 3060).await?;
///
/// // After a build finishes
/// server.schedule_update(Duration::from_millis(500));
///
/// server.close().await;
/// # Ok(())
/// # }
/// ```
pub struct ReloadServer {
    /// Host the server was bound with, used in client URLs.
    host: String,

    /// Actual bound address.
    local_addr: SocketAddr,

    /// Open connections.
    clients: RwLock<ClientMap>,

    /// Lifecycle state, observed by the accept loop.
    state: watch::Sender<ServerState>,

    /// Connection tasks.
    connections: Mutex<JoinSet<()>>,

    /// Accept loop task.
    accept_task: Mutex<Option<JoinHandle<()>>>,

    /// Delayed `update` broadcast not yet sent.
    pending_update: Mutex<Option<JoinHandle<()>>>,

    /// Set once a caller has claimed the drain.
    draining: AtomicBool,
}

// ============================================================================
// ReloadServer - Constructor
// ============================================================================

impl ReloadServer {
    /// Binds the server and starts accepting connections.
    ///
    /// Port 0 binds a random available port.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bind`] naming the host and port if binding fails.
    pub async fn bind(host: &str, port: u16) -> Result<Arc<Self>> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| Error::bind(host, port, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::bind(host, port, e))?;

        let (state, _) = watch::channel(ServerState::Listening);

        let server = Arc::new(Self {
            host: host.to_string(),
            local_addr,
            clients: RwLock::new(ClientMap::default()),
            state,
            connections: Mutex::new(JoinSet::new()),
            accept_task: Mutex::new(None),
            pending_update: Mutex::new(None),
            draining: AtomicBool::new(false),
        });

        let accept = tokio::spawn(Arc::clone(&server).accept_loop(listener));
        *server.accept_task.lock() = Some(accept);

        info!(host, port = local_addr.port(), "Reload server listening");

        Ok(server)
    }
}

// ============================================================================
// ReloadServer - Public API
// ============================================================================

impl ReloadServer {
    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Returns the number of open connections.
    #[inline]
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the bound port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Returns the URL reload clients connect to.
    ///
    /// Format: `ws://{host}:{port}`
    #[must_use]
    pub fn ws_url(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("ws://[{}]:{}", self.host, self.port())
        } else {
            format!("ws://{}:{}", self.host, self.port())
        }
    }

    /// Sends a payload to every open connection.
    ///
    /// Returns the number of connections the payload was queued for.
    /// Connections found closed are pruned.
    ///
    /// # Errors
    ///
    /// - [`Error::ServerClosed`] unless the server is listening
    /// - [`Error::Json`] if the payload cannot be serialized
    pub fn broadcast(&self, payload: HmrPayload) -> Result<usize> {
        if self.state() != ServerState::Listening {
            return Err(Error::ServerClosed);
        }

        let text = payload.to_text()?;
        let mut delivered = 0;

        self.clients.write().retain(|id, tx| {
            let open = tx.send(ClientCommand::Send(text.clone())).is_ok();
            if open {
                delivered += 1;
            } else {
                debug!(client = %id, "Pruned closed reload client");
            }
            open
        });

        debug!(?payload, delivered, "Broadcast queued");
        Ok(delivered)
    }

    /// Broadcasts `update` after `delay`.
    ///
    /// Scheduling while an earlier update is still pending cancels the
    /// earlier one, so overlapping builds produce a single trailing update.
    pub fn schedule_update(self: &Arc<Self>, delay: Duration) {
        if self.state() != ServerState::Listening {
            debug!("Reload server not listening; update not scheduled");
            return;
        }

        let server = Arc::clone(self);
        let task = tokio::spawn(async move {
            sleep(delay).await;
            match server.broadcast(HmrPayload::Update) {
                Ok(delivered) => info!(clients = delivered, "Extension reload broadcast"),
                Err(e) => debug!(error = %e, "Reload broadcast skipped"),
            }
        });

        let previous = self.pending_update.lock().replace(task);
        if let Some(previous) = previous
            && !previous.is_finished()
        {
            previous.abort();
            debug!("Coalesced overlapping reload broadcasts");
        }
    }
}

// ============================================================================
// ReloadServer - Lifecycle
// ============================================================================

impl ReloadServer {
    /// Moves `Listening` to `Closing` without waiting.
    ///
    /// Cancels any pending update, tells every connection to close and,
    /// inside a runtime, spawns the drain that ends in `Closed`.
    /// Returns `false` if the server was already closing or closed.
    pub fn begin_close(self: &Arc<Self>) -> bool {
        if !self.start_closing() {
            return false;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let server = Arc::clone(self);
                handle.spawn(async move { server.finish_close().await });
            }
            Err(_) => debug!("No runtime; drain deferred to the next close()"),
        }

        true
    }

    /// Closes the server and waits until it is `Closed`.
    ///
    /// Connections still open after the drain timeout are abandoned.
    /// Concurrent and repeated calls, including calls after
    /// [`begin_close`](Self::begin_close), wait for the same shutdown.
    pub async fn close(&self) {
        self.start_closing();
        self.finish_close().await;
    }

    /// Waits until the server reaches `Closed`.
    pub async fn wait_closed(&self) {
        let mut state_rx = self.state.subscribe();
        while *state_rx.borrow_and_update() != ServerState::Closed {
            if state_rx.changed().await.is_err() {
                break;
            }
        }
    }

    /// `Listening` to `Closing` transition. Returns `false` if already past it.
    fn start_closing(&self) -> bool {
        let transitioned = self.state.send_if_modified(|state| {
            if *state == ServerState::Listening {
                *state = ServerState::Closing;
                true
            } else {
                false
            }
        });

        if !transitioned {
            return false;
        }

        info!(port = self.port(), "Reload server closing");

        if let Some(pending) = self.pending_update.lock().take() {
            pending.abort();
        }

        for tx in self.clients.read().values() {
            let _ = tx.send(ClientCommand::Close);
        }

        true
    }

    /// Drains connections and moves `Closing` to `Closed`.
    ///
    /// Exactly one caller drains; every other caller waits for it.
    async fn finish_close(&self) {
        if self.draining.swap(true, Ordering::AcqRel) {
            self.wait_closed().await;
            return;
        }

        let accept = self.accept_task.lock().take();
        if let Some(accept) = accept {
            let _ = accept.await;
        }

        let mut connections = std::mem::take(&mut *self.connections.lock());
        let drained = timeout(DRAIN_TIMEOUT, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = connections.len(),
                timeout_ms = DRAIN_TIMEOUT.as_millis() as u64,
                "Abandoned reload connections on close"
            );
            connections.abort_all();
        }

        self.clients.write().clear();
        self.state.send_replace(ServerState::Closed);

        info!(port = self.port(), "Reload server closed");
    }
}

// ============================================================================
// ReloadServer - Accept Loop
// ============================================================================

impl ReloadServer {
    /// Background task that accepts new connections until closing.
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        let mut state_rx = self.state.subscribe();
        debug!("Accept loop started");

        while self.state() == ServerState::Listening {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let server = Arc::clone(&self);
                        let mut connections = self.connections.lock();
                        while connections.try_join_next().is_some() {}
                        connections.spawn(async move {
                            if let Err(e) = server.handle_connection(stream, addr).await {
                                warn!(error = %e, ?addr, "Reload connection failed");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                },

                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!("Accept loop terminated");
    }

    /// Handles a single connection from upgrade to close.
    async fn handle_connection(self: Arc<Self>, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        let ws_stream = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| Error::connection(format!("WebSocket upgrade failed: {e}")))?;
        let (mut ws_write, ws_read) = ws_stream.split();

        let id = Uuid::new_v4();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        self.clients.write().insert(id, command_tx);

        // Joined the set after close started; close never told us to stop
        if self.state() != ServerState::Listening {
            self.clients.write().remove(&id);
            let _ = ws_write.close().await;
            return Ok(());
        }

        info!(client = %id, ?addr, "Reload client connected");

        let result = Self::run_client(id, ws_write, ws_read, command_rx).await;

        self.clients.write().remove(&id);
        debug!(client = %id, remaining = self.client_count(), "Reload client removed");

        result
    }

    /// Connection loop: handshake, then forward commands until either side closes.
    async fn run_client(
        id: Uuid,
        mut ws_write: WsWrite,
        mut ws_read: WsRead,
        mut command_rx: mpsc::UnboundedReceiver<ClientCommand>,
    ) -> Result<()> {
        ws_write.send(HmrPayload::Connected.to_message()?).await?;

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(client = %id, text = %text, "Ignoring client message");
                        }

                        Some(Ok(Message::Close(_))) | None => {
                            debug!(client = %id, "Reload client disconnected");
                            break;
                        }

                        Some(Err(e)) => {
                            warn!(client = %id, error = %e, "Reload connection dropped");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        Some(Ok(_)) => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ClientCommand::Send(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(client = %id, error = %e, "Failed to send reload message");
                                break;
                            }
                            trace!(client = %id, "Reload message sent");
                        }

                        Some(ClientCommand::Close) | None => {
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
