//! Hot-reload coordination.
//!
//! A WebSocket server broadcasts reload messages to a small client running
//! inside the extension.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ReloadServer`] | Listener, broadcast set, delayed updates |
//! | [`HmrPayload`] | Wire messages |
//! | [`reload_snippet`] | Browser-side client source |
//! | [`spawn_shutdown_watcher`] | Closes the server on signal or stdin EOF |

// ============================================================================
// Submodules
// ============================================================================

/// Browser-side reload client.
pub mod client;

/// Wire protocol messages.
pub mod protocol;

/// WebSocket server.
pub mod server;

/// Process shutdown triggers.
pub mod signals;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{CLIENT_SCRIPT_FILE, reload_snippet, stand_in_page};
pub use protocol::HmrPayload;
pub use server::{DEFAULT_UPDATE_DELAY, ReloadServer, ServerState};
pub use signals::{ShutdownTrigger, spawn_shutdown_watcher, wait_for_termination};
