//! Reload wire protocol.
//!
//! The server sends two newline-free JSON text messages:
//!
//! | Message | When | Client action |
//! |---------|------|---------------|
//! | `{"type":"connected"}` | Immediately after a client connects | Log only |
//! | `{"type":"update"}` | After a build finishes writing output | Reload the extension |
//!
//! Clients may send anything; the server does not interpret it.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;

use crate::error::Result;

// ============================================================================
// HmrPayload
// ============================================================================

/// Server to client reload message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HmrPayload {
    /// Connection handshake.
    Connected,
    /// Build output changed.
    Update,
}

impl HmrPayload {
    /// Serializes the payload to its wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_text(self) -> Result<String> {
        Ok(serde_json::to_string(&self)?)
    }

    /// Wraps the payload in a WebSocket text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn to_message(self) -> Result<Message> {
        Ok(Message::Text(self.to_text()?.into()))
    }
}

// ============================================================================
// Tests
// ============================================================================
