//! Host build tool contract.
//!
//! The host bundler drives a plugin through three hooks, in order:
//!
//! 1. `config` once, before building
//! 2. `transform` once per processed module
//! 3. `build_end` after output is written
//!
//! Types here describe what crosses that boundary. Overrides serialize
//! camelCase so a JavaScript host can consume them directly.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entry::EntryMap;
use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Output naming pattern for entries and chunks.
pub const FLAT_SCRIPT_PATTERN: &str = "[name].js";

/// Output naming pattern for assets.
pub const FLAT_ASSET_PATTERN: &str = "[name].[ext]";

// ============================================================================
// Types
// ============================================================================

/// Host build mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Optimized output, no reload client.
    #[default]
    Production,
    /// Watch builds with the reload client injected.
    Development,
}

impl BuildMode {
    /// Returns `true` for development builds.
    #[inline]
    #[must_use]
    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

/// Host configuration passed to the `config` hook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    /// Build mode.
    #[serde(default)]
    pub mode: BuildMode,

    /// Output directory, relative to the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,
}

impl UserConfig {
    /// Creates a config for the given mode.
    #[inline]
    #[must_use]
    pub fn new(mode: BuildMode) -> Self {
        Self { mode, out_dir: None }
    }

    /// Sets the output directory.
    #[inline]
    #[must_use]
    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(out_dir.into());
        self
    }
}

/// Output module format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// ES modules.
    #[default]
    Es,
}

/// Bundler output naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    /// Pattern for entry files.
    pub entry_file_names: String,
    /// Pattern for shared chunks.
    pub chunk_file_names: String,
    /// Pattern for non-script assets.
    pub asset_file_names: String,
    /// Module format.
    pub format: OutputFormat,
}

impl Default for OutputOptions {
    /// One flat file per entry, named after the entry.
    fn default() -> Self {
        Self {
            entry_file_names: FLAT_SCRIPT_PATTERN.to_string(),
            chunk_file_names: FLAT_SCRIPT_PATTERN.to_string(),
            asset_file_names: FLAT_ASSET_PATTERN.to_string(),
            format: OutputFormat::Es,
        }
    }
}

/// Configuration the `config` hook returns to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOverrides {
    /// Whether the host clears the output directory before building.
    pub empty_out_dir: bool,
    /// Named build inputs.
    pub input: EntryMap,
    /// Output naming.
    pub output: OutputOptions,
}

// ============================================================================
// BuildPlugin
// ============================================================================

/// Hooks a host build tool invokes on a plugin.
#[async_trait]
pub trait BuildPlugin: Send + Sync {
    /// Plugin name for host diagnostics.
    fn name(&self) -> &'static str;

    /// Config-time hook, called once before building.
    ///
    /// # Errors
    ///
    /// Fails if the plugin cannot prepare the build.
    fn config(&mut self, config: &UserConfig) -> Result<ConfigOverrides>;

    /// Transform hook, called once per module with its source and id.
    fn transform<'a>(&self, code: &'a str, id: &str) -> Cow<'a, str>;

    /// Build-end hook, called after output is written.
    ///
    /// # Errors
    ///
    /// Fails if post-build work cannot complete.
    async fn build_end(&self) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================
