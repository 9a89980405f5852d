//! Error types for the extension build plugin.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use crx_plugin::{CrxPlugin, Options, Result};
//!
//! async fn example(options: Options) -> Result<()> {
//!     let mut plugin = CrxPlugin::builder().options(options).build().await?;
//!     plugin.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Reload server | [`Error::Bind`], [`Error::ServerClosed`], [`Error::Connection`] |
//! | Filesystem | [`Error::Staging`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! Entry resolution never fails: unrecognized declaration shapes resolve
//! to empty maps and fragments instead of errors.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when plugin options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Reload Server Errors
    // ========================================================================
    /// Reload server could not bind its listener.
    ///
    /// Fatal to the build session.
    #[error("Failed to bind reload server on {host}:{port}: {source}")]
    Bind {
        /// Host the server tried to bind.
        host: String,
        /// Port the server tried to bind.
        port: u16,
        /// Underlying IO error.
        #[source]
        source: IoError,
    },

    /// Reload server is closing or closed.
    #[error("Reload server closed")]
    ServerClosed,

    /// Reload connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    // ========================================================================
    // Filesystem Errors
    // ========================================================================
    /// Writing the manifest or copying staged assets failed.
    #[error("Failed to stage {path}: {source}")]
    Staging {
        /// File or directory being written.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: IoError,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a bind error for the given address.
    #[inline]
    pub fn bind(host: impl Into<String>, port: u16, source: IoError) -> Self {
        Self::Bind {
            host: host.into(),
            port,
            source,
        }
    }

    /// Creates a staging error for the given path.
    #[inline]
    pub fn staging(path: impl Into<PathBuf>, source: IoError) -> Self {
        Self::Staging {
            path: path.into(),
            source,
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error must abort the build session.
    ///
    /// A dropped reload connection only affects one browser session.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_connection_error()
    }

    /// Returns `true` if this is a per-connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::WebSocket(_))
    }
}

// ============================================================================
// Tests
// ============================================================================
