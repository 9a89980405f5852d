//! Entry resolution.
//!
//! Turns loosely-typed background and content declarations into named
//! bundler inputs and manifest fragments.
//!
//! # Components
//!
//! | Module | Description |
//! |--------|-------------|
//! | `path` | Path normalization and the `index` naming convention |
//! | `background` | Background declaration resolver |
//! | `content` | Content script declaration resolver |
//! | `compose` | Background + content input merge |
//!
//! # Example
//!
//! ```
//! use crx_plugin::entry::{BackgroundDecl, compose_inputs, resolve_background_input};
//!
//! let decl = BackgroundDecl::from(vec!["src/background/index.ts".to_string()]);
//! let background = resolve_background_input(Some(&decl));
//! let input = compose_inputs(&background, &Default::default());
//!
//! assert_eq!(input["background"], "src/background/index.ts");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

// ============================================================================
// Submodules
// ============================================================================

/// Background declaration resolver.
pub mod background;

/// Build input composition.
pub mod compose;

/// Content script declaration resolver.
pub mod content;

/// Path normalization and entry naming.
pub mod path;

// ============================================================================
// Re-exports
// ============================================================================

pub use background::{
    BACKGROUND_PAGE, BackgroundDecl, BackgroundManifest, BackgroundObject,
    find_injection_target, resolve_background_input, resolve_background_manifest,
};
pub use compose::compose_inputs;
pub use content::{
    ALL_URLS, ContentDecl, ContentScript, RunAt, resolve_content_input, resolve_content_manifest,
};
pub use path::{entry_name_of, entry_of, normalize_path};

// ============================================================================
// Types
// ============================================================================

/// Entry name to source path.
///
/// Ordered by name so serialized inputs and manifests are stable.
pub type EntryMap = BTreeMap<String, String>;

// ============================================================================
// Helpers
// ============================================================================

/// Borrows the non-empty paths of a list, in order.
fn non_empty(paths: &[String]) -> Vec<&str> {
    paths
        .iter()
        .map(String::as_str)
        .filter(|p| !p.is_empty())
        .collect()
}
