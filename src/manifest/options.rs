//! Plugin options and their resolved form.
//!
//! Options come from the host build tool's configuration, usually as JSON:
//!
//! ```json
//! {
//!   "name": "demo",
//!   "version": "1.0.0",
//!   "port": 3080,
//!   "background": ["src/background/index.ts", "src/background/a.ts"],
//!   "content": [{ "matches": ["<all_urls>"], "js": ["src/content/index.ts"] }]
//! }
//! ```
//!
//! `host`, `port`, `root`, `background` and `content` configure the build
//! session. Every other key is forwarded to the manifest.
//!
//! # Example
//!
//! ```
//! use crx_plugin::Options;
//!
//! let options = Options::new("demo", "1.0.0")
//!     .with_port(3080)
//!     .with_background("src/background/index.ts")
//!     .with_permission("storage");
//!
//! assert!(options.validate().is_ok());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::entry::{BackgroundDecl, ContentDecl};
use crate::error::{Error, Result};

use super::types::ManifestFields;

// ============================================================================
// Constants
// ============================================================================

/// Default reload server host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default reload server port.
pub const DEFAULT_PORT: u16 = 3060;

/// Default manifest schema version.
pub const DEFAULT_MANIFEST_VERSION: u8 = 2;

/// Supported manifest schema versions.
const SUPPORTED_MANIFEST_VERSIONS: [u8; 2] = [2, 3];

/// Option keys that configure the session and never reach the manifest.
pub const SESSION_FIELDS: [&str; 5] = ["host", "port", "root", "background", "content"];

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_manifest_version() -> u8 {
    DEFAULT_MANIFEST_VERSION
}

// ============================================================================
// Options
// ============================================================================

/// Raw plugin options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Options {
    /// Reload server host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Reload server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Manifest schema version.
    #[serde(default = "default_manifest_version")]
    pub manifest_version: u8,

    /// Project root. Defaults to the current directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Background entry declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<BackgroundDecl>,

    /// Content script declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentDecl>,

    /// Manifest pass-through fields.
    #[serde(flatten)]
    pub manifest: ManifestFields,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            manifest_version: DEFAULT_MANIFEST_VERSION,
            root: None,
            background: None,
            content: None,
            manifest: ManifestFields::default(),
        }
    }
}

// ============================================================================
// Options - Constructors
// ============================================================================

impl Options {
    /// Creates options for an extension with the given name and version.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let mut options = Self::default();
        options.manifest.name = name.into();
        options.manifest.version = version.into();
        options
    }

    /// Parses options from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document is not a JSON object.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts options from an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the value is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

// ============================================================================
// Options - Builder Methods
// ============================================================================

impl Options {
    /// Sets the reload server host.
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the reload server port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the manifest schema version.
    #[inline]
    #[must_use]
    pub fn with_manifest_version(mut self, version: u8) -> Self {
        self.manifest_version = version;
        self
    }

    /// Sets the project root.
    #[inline]
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Sets the background declaration.
    #[inline]
    #[must_use]
    pub fn with_background(mut self, background: impl Into<BackgroundDecl>) -> Self {
        self.background = Some(background.into());
        self
    }

    /// Sets the content script declaration.
    #[inline]
    #[must_use]
    pub fn with_content(mut self, content: impl Into<ContentDecl>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the manifest description.
    #[inline]
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.manifest.description = Some(description.into());
        self
    }

    /// Adds a manifest permission.
    #[inline]
    #[must_use]
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.manifest.permissions.push(permission.into());
        self
    }

    /// Adds an arbitrary manifest key.
    #[inline]
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.manifest.extra.insert(key.into(), value);
        self
    }
}

// ============================================================================
// Options - Validation
// ============================================================================

impl Options {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the manifest version is unsupported or
    /// the host and port do not form a valid `ws://` URL.
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_MANIFEST_VERSIONS.contains(&self.manifest_version) {
            return Err(Error::config(format!(
                "manifest_version must be 2 or 3, got {}",
                self.manifest_version
            )));
        }

        self.reload_url()?;
        Ok(())
    }

    /// Returns the URL the reload client connects to.
    ///
    /// Format: `ws://{host}:{port}`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is empty or not a valid URL host.
    pub fn reload_url(&self) -> Result<Url> {
        if self.host.trim().is_empty() {
            return Err(Error::config("Reload server host must not be empty"));
        }

        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };

        Url::parse(&format!("ws://{host}:{}", self.port)).map_err(|e| {
            Error::config(format!(
                "Invalid reload server address {}:{}: {e}",
                self.host, self.port
            ))
        })
    }
}

// ============================================================================
// ResolvedOptions
// ============================================================================

/// Validated options with an absolute project root.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    options: Options,
    root: PathBuf,
}

impl ResolvedOptions {
    /// Validates options and resolves the project root.
    ///
    /// A relative root is resolved against the current directory.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if validation fails
    /// - [`Error::Io`] if the current directory cannot be read
    pub fn resolve(options: Options) -> Result<Self> {
        options.validate()?;

        let root = match &options.root {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => env::current_dir()?.join(root),
            None => env::current_dir()?,
        };

        Ok(Self { options, root })
    }

    /// Returns the options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Returns the absolute project root.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.host, "localhost");
        assert_eq!(options.port, 3060);
        assert_eq!(options.manifest_version, 2);
        assert!(options.background.is_none());
        assert!(options.content.is_none());
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let options = Options::from_json(r#"{ "name": "demo", "version": "1.0.0" }"#).unwrap();
        assert_eq!(options.host, DEFAULT_HOST);
        assert_eq!(options.port, DEFAULT_PORT);
        assert_eq!(options.manifest.name, "demo");
    }

    #[test]
    fn test_from_value_splits_session_and_manifest_fields() {
        let options = Options::from_value(json!({
            "name": "demo",
            "version": "1.0.0",
            "port": 3080,
            "background": ["background/index.ts", "background/a.ts"],
            "content": [{ "matches": ["<all_urls>"], "js": ["content/index.ts"] }],
            "permissions": ["tabs"],
            "options_page": "options.html"
        }))
        .unwrap();

        assert_eq!(options.port, 3080);
        assert!(matches!(options.background, Some(BackgroundDecl::PathList(_))));
        assert!(matches!(options.content, Some(ContentDecl::Scripts(_))));
        assert_eq!(options.manifest.permissions, vec!["tabs".to_string()]);
        assert_eq!(options.manifest.extra.len(), 1);
        assert_eq!(options.manifest.extra["options_page"], "options.html");
    }

    #[test]
    fn test_builder_chain() {
        let options = Options::new("demo", "1.0.0")
            .with_host("127.0.0.1")
            .with_port(4000)
            .with_manifest_version(3)
            .with_background("bg.ts")
            .with_content("content.ts")
            .with_description("A demo")
            .with_permission("storage")
            .with_field("homepage_url", json!("https://example.com"));

        assert_eq!(options.host, "127.0.0.1");
        assert_eq!(options.port, 4000);
        assert_eq!(options.manifest_version, 3);
        assert_eq!(options.manifest.description.as_deref(), Some("A demo"));
        assert_eq!(options.manifest.permissions, vec!["storage".to_string()]);
        assert!(options.manifest.extra.contains_key("homepage_url"));
    }

    #[test]
    fn test_validate_manifest_version() {
        assert!(Options::default().with_manifest_version(3).validate().is_ok());

        let err = Options::default()
            .with_manifest_version(4)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("manifest_version"));
    }

    #[test]
    fn test_reload_url() {
        let url = Options::default().reload_url().unwrap();
        assert_eq!(url.as_str(), "ws://localhost:3060/");

        let url = Options::default().with_host("::1").reload_url().unwrap();
        assert_eq!(url.host_str(), Some("[::1]"));
    }

    #[test]
    fn test_validate_rejects_bad_host() {
        assert!(Options::default().with_host("").validate().is_err());
        assert!(Options::default().with_host("bad host").validate().is_err());
    }

    #[test]
    fn test_resolve_relative_root() {
        let resolved = ResolvedOptions::resolve(Options::default().with_root("project")).unwrap();
        assert!(resolved.root().is_absolute());
        assert!(resolved.root().ends_with("project"));
    }

    #[test]
    fn test_resolve_absolute_root() {
        let temp = tempfile::tempdir().unwrap();
        let resolved =
            ResolvedOptions::resolve(Options::default().with_root(temp.path())).unwrap();
        assert_eq!(resolved.root(), temp.path());
    }
}
