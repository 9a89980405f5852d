//! Host build tool integration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CrxPlugin`] | Lifecycle adapter owning the reload server |
//! | [`PluginBuilder`] | Fluent configuration builder |
//! | [`BuildPlugin`] | Hooks the host invokes |
//! | [`ConfigOverrides`] | Build inputs and output naming returned to the host |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for plugin configuration.
pub mod builder;

/// Lifecycle adapter.
pub mod core;

/// Host hook contract.
pub mod host;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::PluginBuilder;
pub use core::{CrxPlugin, DEFAULT_CLIENT_DIR, DEFAULT_OUT_DIR, PLUGIN_NAME};
pub use host::{BuildMode, BuildPlugin, ConfigOverrides, OutputFormat, OutputOptions, UserConfig};
