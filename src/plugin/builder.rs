//! Builder pattern for plugin configuration.
//!
//! Provides a fluent API for configuring and creating [`CrxPlugin`] instances.
//!
//! # Example
//!
//! ```no_run
//! use crx_plugin::{CrxPlugin, Options};
//!
//! # async fn example() -> crx_plugin::Result<()> {
//! let plugin = CrxPlugin::builder()
//!     .options(Options::new("demo", "1.0.0").with_background("src/background/index.ts"))
//!     .root("./my-extension")
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::manifest::{Options, ResolvedOptions};
use crate::reload::DEFAULT_UPDATE_DELAY;

use super::core::CrxPlugin;

// ============================================================================
// PluginBuilder
// ============================================================================

/// Builder for configuring a [`CrxPlugin`] instance.
///
/// Use [`CrxPlugin::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct PluginBuilder {
    /// Plugin options.
    options: Option<Options>,
    /// Project root, overriding `options.root`.
    root: Option<PathBuf>,
    /// Staging directory for client assets.
    client_dir: Option<PathBuf>,
    /// Delay before the post-build `update` broadcast.
    update_delay: Duration,
    /// Whether to close the server and exit on termination.
    handle_signals: bool,
}

impl Default for PluginBuilder {
    fn default() -> Self {
        Self {
            options: None,
            root: None,
            client_dir: None,
            update_delay: DEFAULT_UPDATE_DELAY,
            handle_signals: true,
        }
    }
}

// ============================================================================
// PluginBuilder Implementation
// ============================================================================

impl PluginBuilder {
    /// Creates a new builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the plugin options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Sets the project root.
    ///
    /// Takes precedence over the `root` option.
    #[inline]
    #[must_use]
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Sets the staging directory for client assets.
    ///
    /// Relative paths are resolved against the project root. Defaults to
    /// `node_modules/.crx-plugin/client` under the root.
    #[inline]
    #[must_use]
    pub fn client_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.client_dir = Some(dir.into());
        self
    }

    /// Sets the delay between build end and the `update` broadcast.
    #[inline]
    #[must_use]
    pub fn update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = delay;
        self
    }

    /// Enables or disables the termination watcher.
    ///
    /// When enabled (the default), a termination signal or end of stdin
    /// closes the reload server and exits the process.
    #[inline]
    #[must_use]
    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    /// Validates the configuration, binds the reload server and creates
    /// the plugin.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if options are missing or invalid
    /// - [`Error::Bind`] if the reload server cannot bind
    pub async fn build(self) -> Result<CrxPlugin> {
        let mut options = self.options.ok_or_else(|| {
            Error::config(
                "Plugin options are required. Use .options() to set them.\n\
                 Example: CrxPlugin::builder().options(Options::new(\"demo\", \"1.0.0\"))",
            )
        })?;

        if let Some(root) = self.root {
            options.root = Some(root);
        }

        let resolved = ResolvedOptions::resolve(options)?;
        let client_dir = self.client_dir.map(|dir| resolved.root().join(dir));

        CrxPlugin::new(resolved, client_dir, self.update_delay, self.handle_signals).await
    }
}

// ============================================================================
// Tests
// ============================================================================
