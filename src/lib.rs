//! Browser extension build plugin with live reload.
//!
//! This library turns a loose description of an extension's background and
//! content scripts into bundler inputs and a `manifest.json`, and reloads
//! the extension in the browser after every rebuild.
//!
//! # Architecture
//!
//! Data flows one way at config time and one way at runtime:
//!
//! - **Config time**: options → named entries → manifest + build inputs
//! - **Runtime**: build end → WebSocket broadcast → in-extension client → `runtime.reload()`
//!
//! Key design principles:
//!
//! - Entry names follow the `index` convention: `src/background/index.ts` is `background`
//! - Resolution is lenient: unrecognized declarations resolve to nothing
//! - One reload server per build session, closed on termination or stdin EOF
//!
//! # Quick Start
//!
//! ```no_run
//! use crx_plugin::plugin::{BuildMode, BuildPlugin, UserConfig};
//! use crx_plugin::{CrxPlugin, Options, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let options = Options::new("demo", "1.0.0")
//!         .with_port(3080)
//!         .with_background(vec![
//!             "src/background/index.ts".to_string(),
//!             "src/background/a.ts".to_string(),
//!         ])
//!         .with_content("src/content/index.ts");
//!
//!     let mut plugin = CrxPlugin::builder().options(options).build().await?;
//!
//!     // Host calls the hooks in order
//!     let overrides = plugin.config(&UserConfig::new(BuildMode::Development))?;
//!     println!("{}", serde_json::to_string_pretty(&overrides)?);
//!
//!     let code = plugin.transform("console.log('bg');", "src/background/index.ts");
//!     assert!(code.len() > "console.log('bg');".len());
//!
//!     plugin.build_end().await?;
//!     plugin.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`entry`] | Entry naming and background/content resolution |
//! | [`manifest`] | Options and manifest generation |
//! | [`reload`] | WebSocket reload server and browser client |
//! | [`plugin`] | Host hook adapter |
//! | [`staging`] | Atomic writes and asset copying |
//! | [`error`] | Error types and [`Result`] alias |

// ============================================================================
// Modules
// ============================================================================

/// Entry naming and declaration resolution.
///
/// Pure functions; nothing here touches the filesystem.
pub mod entry;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Plugin options and manifest synthesis.
pub mod manifest;

/// Host build tool integration.
///
/// Use [`CrxPlugin::builder()`] to create a configured plugin.
pub mod plugin;

/// Hot-reload server, wire protocol and browser client.
pub mod reload;

/// Staging directory file operations.
pub mod staging;

// ============================================================================
// Re-exports
// ============================================================================

// Entry types
pub use entry::{BackgroundDecl, ContentDecl, ContentScript, EntryMap, RunAt};

// Error types
pub use error::{Error, Result};

// Manifest types
pub use manifest::{Manifest, Options, ResolvedOptions};

// Plugin types
pub use plugin::{BuildMode, BuildPlugin, ConfigOverrides, CrxPlugin, PluginBuilder, UserConfig};

// Reload types
pub use reload::{HmrPayload, ReloadServer, ServerState};
