//! Extension build plugin.
//!
//! The [`CrxPlugin`] adapts entry resolution, manifest generation and the
//! reload server to the host build tool's hooks.
//!
//! # Lifecycle
//!
//! | Hook | Work |
//! |------|------|
//! | construction | Bind the reload server |
//! | `config` | Stage client assets, write the manifest, return build inputs |
//! | `transform` | Append the reload client to the injection target |
//! | `build_end` | Copy staged assets to the output, schedule `update` |
//!
//! # Example
//!
//! ```no_run
//! use crx_plugin::plugin::{BuildMode, BuildPlugin, UserConfig};
//! use crx_plugin::{CrxPlugin, Options};
//!
//! # async fn example() -> crx_plugin::Result<()> {
//! let mut plugin = CrxPlugin::builder()
//!     .options(Options::new("demo", "1.0.0").with_background("src/background/index.ts"))
//!     .build()
//!     .await?;
//!
//! let overrides = plugin.config(&UserConfig::new(BuildMode::Development))?;
//! let code = plugin.transform("console.log(1);", "src/background/index.ts");
//! plugin.build_end().await?;
//!
//! plugin.close().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::entry::{
    BACKGROUND_PAGE, BackgroundManifest, compose_inputs, find_injection_target,
    resolve_background_input, resolve_content_input,
};
use crate::entry::path::module_matches;
use crate::error::Result;
use crate::manifest::{ResolvedOptions, generate_manifest};
use crate::reload::{
    CLIENT_SCRIPT_FILE, ReloadServer, reload_snippet, spawn_shutdown_watcher, stand_in_page,
};
use crate::staging;

use super::builder::PluginBuilder;
use super::host::{BuildMode, BuildPlugin, ConfigOverrides, OutputOptions, UserConfig};

// ============================================================================
// Constants
// ============================================================================

/// Plugin name reported to the host.
pub const PLUGIN_NAME: &str = "crx-plugin";

/// Default staging directory, relative to the project root.
pub const DEFAULT_CLIENT_DIR: &str = "node_modules/.crx-plugin/client";

/// Default output directory, relative to the project root.
pub const DEFAULT_OUT_DIR: &str = "dist";

// ============================================================================
// CrxPlugin
// ============================================================================

/// Browser extension build plugin.
///
/// Owns one reload server for the build session. Dropping the plugin
/// starts closing the server; call [`close`](Self::close) to wait for it.
pub struct CrxPlugin {
    /// Validated options.
    options: ResolvedOptions,

    /// Staging directory for client assets.
    client_dir: PathBuf,

    /// Build output directory.
    out_dir: PathBuf,

    /// Mode from the last `config` call.
    mode: BuildMode,

    /// Module receiving the reload client; set by a development `config`.
    injection_target: Option<String>,

    /// Reload client source.
    reload_snippet: String,

    /// Delay before the post-build `update`.
    update_delay: Duration,

    /// Reload server.
    server: Arc<ReloadServer>,

    /// Termination watcher task.
    shutdown_watcher: Option<JoinHandle<()>>,
}

// ============================================================================
// CrxPlugin - Display
// ============================================================================

impl fmt::Debug for CrxPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrxPlugin")
            .field("root", &self.options.root())
            .field("mode", &self.mode)
            .field("injection_target", &self.injection_target)
            .field("ws_url", &self.server.ws_url())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// CrxPlugin - Public API
// ============================================================================

impl CrxPlugin {
    /// Creates a configuration builder for the plugin.
    #[inline]
    #[must_use]
    pub fn builder() -> PluginBuilder {
        PluginBuilder::new()
    }

    /// Returns the resolved options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    /// Returns the staging directory.
    #[inline]
    #[must_use]
    pub fn client_dir(&self) -> &Path {
        &self.client_dir
    }

    /// Returns the build output directory.
    #[inline]
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Returns the build mode from the last `config` call.
    #[inline]
    #[must_use]
    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Returns the module receiving the reload client.
    #[inline]
    #[must_use]
    pub fn injection_target(&self) -> Option<&str> {
        self.injection_target.as_deref()
    }

    /// Returns the reload client source.
    #[inline]
    #[must_use]
    pub fn reload_snippet(&self) -> &str {
        &self.reload_snippet
    }

    /// Returns the reload server.
    #[inline]
    #[must_use]
    pub fn server(&self) -> &Arc<ReloadServer> {
        &self.server
    }

    /// Closes the reload server and waits for connections to drain.
    pub async fn close(&mut self) {
        if let Some(watcher) = self.shutdown_watcher.take() {
            watcher.abort();
        }
        self.server.close().await;
    }
}

// ============================================================================
// CrxPlugin - Internal API
// ============================================================================

impl CrxPlugin {
    /// Binds the reload server and creates the plugin.
    ///
    /// # Arguments
    ///
    /// * `options` - Validated options
    /// * `client_dir` - Staging directory, or the default under the root
    /// * `update_delay` - Delay before the post-build `update`
    /// * `handle_signals` - Whether to close and exit on termination
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bind`](crate::Error::Bind) if the server cannot bind.
    pub(crate) async fn new(
        options: ResolvedOptions,
        client_dir: Option<PathBuf>,
        update_delay: Duration,
        handle_signals: bool,
    ) -> Result<Self> {
        let opts = options.options();
        let server = ReloadServer::bind(&opts.host, opts.port).await?;

        let shutdown_watcher =
            handle_signals.then(|| spawn_shutdown_watcher(Arc::clone(&server), true));

        let client_dir = client_dir.unwrap_or_else(|| options.root().join(DEFAULT_CLIENT_DIR));
        let out_dir = options.root().join(DEFAULT_OUT_DIR);
        let reload_snippet = reload_snippet(&server.ws_url());

        info!(
            root = %options.root().display(),
            ws_url = %server.ws_url(),
            "Extension plugin initialized"
        );

        Ok(Self {
            options,
            client_dir,
            out_dir,
            mode: BuildMode::default(),
            injection_target: None,
            reload_snippet,
            update_delay,
            server,
            shutdown_watcher,
        })
    }

    /// Writes or removes the stand-in background page.
    ///
    /// Returns the manifest fragment for the page when it was written.
    fn stage_stand_in(&self, needed: bool) -> Result<Option<BackgroundManifest>> {
        let page_path = self.client_dir.join(BACKGROUND_PAGE);
        let script_path = self.client_dir.join(CLIENT_SCRIPT_FILE);

        if !needed {
            staging::remove_if_exists(&page_path)?;
            staging::remove_if_exists(&script_path)?;
            return Ok(None);
        }

        staging::write_atomic(&page_path, stand_in_page().as_bytes())?;
        staging::write_atomic(&script_path, self.reload_snippet.as_bytes())?;

        debug!(path = %page_path.display(), "Staged stand-in background page");
        Ok(Some(BackgroundManifest::page(BACKGROUND_PAGE)))
    }
}

// ============================================================================
// CrxPlugin - Host Hooks
// ============================================================================

#[async_trait]
impl BuildPlugin for CrxPlugin {
    fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    fn config(&mut self, config: &UserConfig) -> Result<ConfigOverrides> {
        let development = config.mode.is_development();
        self.mode = config.mode;

        let out_dir = config.out_dir.as_deref().unwrap_or(Path::new(DEFAULT_OUT_DIR));
        self.out_dir = self.options.root().join(out_dir);

        let opts = self.options.options();
        let background = resolve_background_input(opts.background.as_ref());
        let content = resolve_content_input(opts.content.as_ref());

        self.injection_target = if development {
            find_injection_target(opts.background.as_ref())
        } else {
            None
        };

        let fallback = self.stage_stand_in(development && background.is_empty())?;
        generate_manifest(&self.client_dir, &self.options, fallback)?;

        let input = compose_inputs(&background, &content);

        info!(
            mode = ?config.mode,
            inputs = input.len(),
            out_dir = %self.out_dir.display(),
            "Build configured"
        );

        Ok(ConfigOverrides {
            empty_out_dir: !development,
            input,
            output: OutputOptions::default(),
        })
    }

    fn transform<'a>(&self, code: &'a str, id: &str) -> Cow<'a, str> {
        match &self.injection_target {
            Some(target) if module_matches(id, target) => {
                debug!(id, "Injecting reload client");
                Cow::Owned(format!("{code}{}", self.reload_snippet))
            }
            _ => Cow::Borrowed(code),
        }
    }

    async fn build_end(&self) -> Result<()> {
        if self.client_dir.is_dir() {
            let copied = staging::copy_dir(&self.client_dir, &self.out_dir)?;
            debug!(copied, out_dir = %self.out_dir.display(), "Client assets copied");
        } else {
            warn!(
                client_dir = %self.client_dir.display(),
                "Staging directory missing; was config called?"
            );
        }

        self.server.schedule_update(self.update_delay);
        Ok(())
    }
}

// ============================================================================
// CrxPlugin - Drop
// ============================================================================

impl Drop for CrxPlugin {
    fn drop(&mut self) {
        if let Some(watcher) = self.shutdown_watcher.take() {
            watcher.abort();
        }
        self.server.begin_close();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use futures_util::StreamExt;
    use serde_json::Value;
    use tempfile::TempDir;
    use tokio::time::timeout;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message;

    use crate::Error;
    use crate::entry::{ALL_URLS, ContentScript};
    use crate::manifest::{MANIFEST_FILE, Options};
    use crate::reload::{HmrPayload, ServerState};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn options(root: &Path) -> Options {
        Options::new("demo", "1.0.0")
            .with_host("127.0.0.1")
            .with_port(0)
            .with_root(root)
    }

    fn with_entries(options: Options) -> Options {
        options
            .with_background(vec![
                "src/background/index.ts".to_string(),
                "src/background/a.ts".to_string(),
            ])
            .with_content(vec![
                ContentScript::new([ALL_URLS]).with_js(["src/content/index.ts"]),
            ])
    }

    async fn plugin(options: Options) -> CrxPlugin {
        CrxPlugin::builder()
            .options(options)
            .update_delay(Duration::from_millis(20))
            .handle_signals(false)
            .build()
            .await
            .expect("plugin should build")
    }

    fn read_manifest(plugin: &CrxPlugin) -> Value {
        let raw = fs::read_to_string(plugin.client_dir().join(MANIFEST_FILE)).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    fn temp() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[tokio::test]
    async fn test_defaults_under_root() {
        let root = temp();
        let mut plugin = plugin(options(root.path())).await;

        assert_eq!(plugin.name(), PLUGIN_NAME);
        assert_eq!(plugin.client_dir(), root.path().join(DEFAULT_CLIENT_DIR));
        assert_eq!(plugin.out_dir(), root.path().join(DEFAULT_OUT_DIR));
        assert_eq!(plugin.mode(), BuildMode::Production);
        assert!(plugin.reload_snippet().contains(&plugin.server().ws_url()));

        plugin.close().await;
    }

    #[tokio::test]
    async fn test_bind_failure_is_fatal() {
        let root = temp();
        let mut first = plugin(options(root.path())).await;
        let port = first.server().port();

        let err = CrxPlugin::builder()
            .options(options(root.path()).with_port(port))
            .handle_signals(false)
            .build()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Bind { .. }));
        assert!(err.is_fatal());
        assert!(err.to_string().contains(&port.to_string()));

        first.close().await;
    }

    #[tokio::test]
    async fn test_config_development() {
        let root = temp();
        let mut plugin = plugin(with_entries(options(root.path()))).await;

        let overrides = plugin
            .config(&UserConfig::new(BuildMode::Development))
            .unwrap();

        assert!(!overrides.empty_out_dir);
        assert_eq!(overrides.input.len(), 3);
        assert_eq!(overrides.input["background"], "src/background/index.ts");
        assert_eq!(overrides.input["a"], "src/background/a.ts");
        assert_eq!(overrides.input["content"], "src/content/index.ts");
        assert_eq!(overrides.output, OutputOptions::default());
        assert_eq!(plugin.injection_target(), Some("src/background/index.ts"));

        let manifest = read_manifest(&plugin);
        assert_eq!(manifest["background"]["scripts"][0], "background.js");
        assert_eq!(manifest["content_scripts"][0]["js"][0], "content.js");
        assert!(!plugin.client_dir().join(BACKGROUND_PAGE).exists());

        plugin.close().await;
    }

    #[tokio::test]
    async fn test_config_production_disables_injection() {
        let root = temp();
        let mut plugin = plugin(with_entries(options(root.path()))).await;

        let overrides = plugin
            .config(&UserConfig::new(BuildMode::Production).with_out_dir("build"))
            .unwrap();

        assert!(overrides.empty_out_dir);
        assert!(plugin.injection_target().is_none());
        assert_eq!(plugin.out_dir(), root.path().join("build"));

        let code = plugin.transform("export {};", "src/background/index.ts");
        assert!(matches!(code, Cow::Borrowed("export {};")));

        plugin.close().await;
    }

    #[tokio::test]
    async fn test_stand_in_page_without_background() {
        let root = temp();
        let mut plugin = plugin(options(root.path())).await;

        let overrides = plugin
            .config(&UserConfig::new(BuildMode::Development))
            .unwrap();
        assert!(overrides.input.is_empty());
        assert!(plugin.injection_target().is_none());

        let page = fs::read_to_string(plugin.client_dir().join(BACKGROUND_PAGE)).unwrap();
        assert!(page.contains(CLIENT_SCRIPT_FILE));

        let script = fs::read_to_string(plugin.client_dir().join(CLIENT_SCRIPT_FILE)).unwrap();
        assert_eq!(script, plugin.reload_snippet());

        assert_eq!(read_manifest(&plugin)["background"]["page"], BACKGROUND_PAGE);

        plugin.close().await;
    }

    #[tokio::test]
    async fn test_production_removes_stale_stand_in() {
        let root = temp();
        let mut plugin = plugin(options(root.path())).await;

        plugin
            .config(&UserConfig::new(BuildMode::Development))
            .unwrap();
        assert!(plugin.client_dir().join(BACKGROUND_PAGE).exists());

        plugin
            .config(&UserConfig::new(BuildMode::Production))
            .unwrap();
        assert!(!plugin.client_dir().join(BACKGROUND_PAGE).exists());
        assert!(!plugin.client_dir().join(CLIENT_SCRIPT_FILE).exists());
        assert!(read_manifest(&plugin).get("background").is_none());

        plugin.close().await;
    }

    #[tokio::test]
    async fn test_transform_injects_only_target() {
        let root = temp();
        let mut plugin = plugin(with_entries(options(root.path()))).await;
        plugin
            .config(&UserConfig::new(BuildMode::Development))
            .unwrap();

        let code = "console.log('bg');";

        let injected = plugin.transform(code, "/project/src/background/index.ts");
        assert!(injected.starts_with(code));
        assert!(injected.ends_with(plugin.reload_snippet()));

        let with_query = plugin.transform(code, "/project/src/background/index.ts?v=1");
        assert!(matches!(with_query, Cow::Owned(_)));

        for id in [
            "/project/src/background/a.ts",
            "/project/src/content/index.ts",
            "/project/src/not-background/index.ts",
        ] {
            assert!(matches!(plugin.transform(code, id), Cow::Borrowed(_)), "{id}");
        }

        plugin.close().await;
    }

    #[tokio::test]
    async fn test_build_end_copies_assets_and_broadcasts() {
        let root = temp();
        let mut plugin = plugin(options(root.path())).await;
        plugin
            .config(&UserConfig::new(BuildMode::Development))
            .unwrap();

        let (mut client, _) = connect_async(plugin.server().ws_url()).await.unwrap();
        let first = timeout(TIMEOUT, client.next()).await.unwrap();
        assert!(matches!(first, Some(Ok(Message::Text(_)))));

        plugin.build_end().await.unwrap();

        assert!(plugin.out_dir().join(MANIFEST_FILE).is_file());
        assert!(plugin.out_dir().join(BACKGROUND_PAGE).is_file());
        assert!(plugin.out_dir().join(CLIENT_SCRIPT_FILE).is_file());

        let Some(Ok(Message::Text(text))) = timeout(TIMEOUT, client.next()).await.unwrap() else {
            panic!("expected update message");
        };
        let payload: HmrPayload = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(payload, HmrPayload::Update);

        plugin.close().await;
    }

    #[tokio::test]
    async fn test_build_end_without_staging_dir() {
        let root = temp();
        let mut plugin = plugin(options(root.path())).await;

        plugin.build_end().await.unwrap();
        assert!(!plugin.out_dir().exists());

        plugin.close().await;
    }

    #[tokio::test]
    async fn test_close_and_drop() {
        let root = temp();
        let mut closing = plugin(options(root.path())).await;
        let server = Arc::clone(closing.server());

        closing.close().await;
        assert_eq!(server.state(), ServerState::Closed);

        let dropped = plugin(options(root.path())).await;
        let server = Arc::clone(dropped.server());
        drop(dropped);
        timeout(TIMEOUT, server.wait_closed())
            .await
            .expect("dropped plugin's server reaches Closed");
        assert_eq!(server.state(), ServerState::Closed);
    }

    #[tokio::test]
    async fn test_transform_before_config_passes_through() {
        let root = temp();
        let mut plugin = plugin(with_entries(options(root.path()))).await;

        assert!(plugin.injection_target().is_none());
        let code = plugin.transform("export {};", "src/background/index.ts");
        assert!(matches!(code, Cow::Borrowed("export {};")));

        plugin.close().await;
    }
}
