//! Background declaration resolution.
//!
//! A background declaration comes in one of three shapes:
//!
//! ```json
//! "src/background/index.ts"
//! ["src/background/index.ts", "src/background/a.ts"]
//! { "page": "src/background.html" }
//! { "scripts": ["src/background/index.ts"] }
//! ```
//!
//! Each shape resolves to a build-input map, a manifest `background`
//! fragment, and the injection target that receives the reload client.
//! The first path of the declaration is always the injection target.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{EntryMap, non_empty};
use super::path::{entry_of, is_html, normalize_path, output_file_name};

// ============================================================================
// Constants
// ============================================================================

/// Manifest page name used for HTML backgrounds and the stand-in page.
pub const BACKGROUND_PAGE: &str = "background.html";

/// Worker type emitted for Manifest V3 service workers.
const MODULE_WORKER_TYPE: &str = "module";

// ============================================================================
// BackgroundDecl
// ============================================================================

/// User-supplied background declaration.
///
/// Deserializes from a string, a list of strings, or an object with
/// `page` / `scripts`. Anything else lands in [`BackgroundDecl::Unrecognized`]
/// and resolves to nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackgroundDecl {
    /// Single background file.
    Path(String),

    /// Ordered list of background scripts. The first is the injection target.
    PathList(Vec<String>),

    /// Object form. `page` wins over `scripts` when both are present.
    Structured(BackgroundObject),

    /// Any other JSON shape.
    Unrecognized(Value),
}

/// Object form of a background declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundObject {
    /// Persistent background page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,

    /// Background scripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<Vec<String>>,
}

impl From<&str> for BackgroundDecl {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for BackgroundDecl {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<String>> for BackgroundDecl {
    fn from(paths: Vec<String>) -> Self {
        Self::PathList(paths)
    }
}

impl From<BackgroundObject> for BackgroundDecl {
    fn from(object: BackgroundObject) -> Self {
        Self::Structured(object)
    }
}

// ============================================================================
// Shape Dispatch
// ============================================================================

/// A declaration reduced to its effective shape.
enum Shape<'a> {
    Empty,
    Path(&'a str),
    PathList(Vec<&'a str>),
}

/// Reduces a declaration to the shape every operation dispatches on.
///
/// The object form delegates to the single-path or path-list case.
/// Empty strings are not paths.
fn shape(decl: Option<&BackgroundDecl>) -> Shape<'_> {
    let shape = match decl {
        Some(BackgroundDecl::Path(path)) if !path.is_empty() => Shape::Path(path.as_str()),
        Some(BackgroundDecl::PathList(paths)) => Shape::PathList(non_empty(paths)),
        Some(BackgroundDecl::Structured(BackgroundObject {
            page: Some(page), ..
        })) if !page.is_empty() => Shape::Path(page.as_str()),
        Some(BackgroundDecl::Structured(BackgroundObject {
            scripts: Some(scripts),
            ..
        })) => Shape::PathList(non_empty(scripts)),
        _ => Shape::Empty,
    };

    match shape {
        Shape::PathList(paths) if paths.is_empty() => Shape::Empty,
        other => other,
    }
}

// ============================================================================
// Public Functions
// ============================================================================

/// Resolves a background declaration into build inputs.
///
/// Returns an empty map when the declaration is absent, empty, or
/// unrecognized.
#[must_use]
pub fn resolve_background_input(decl: Option<&BackgroundDecl>) -> EntryMap {
    let entries: EntryMap = match shape(decl) {
        Shape::Empty => EntryMap::new(),
        Shape::Path(path) => [entry_of(path)].into_iter().collect(),
        Shape::PathList(paths) => paths.into_iter().map(entry_of).collect(),
    };

    if entries.is_empty() {
        warn!("No background entry declared; reload client has no injection target");
    } else {
        debug!(count = entries.len(), "Resolved background inputs");
    }

    entries
}

/// Resolves a background declaration into its manifest fragment.
///
/// An HTML page becomes `{ "page": "background.html" }` since the page
/// itself is emitted by the build. Scripts become output-relative `.js`
/// file names in declaration order.
#[must_use]
pub fn resolve_background_manifest(decl: Option<&BackgroundDecl>) -> Option<BackgroundManifest> {
    match shape(decl) {
        Shape::Empty => None,
        Shape::Path(path) if is_html(path) => Some(BackgroundManifest::page(BACKGROUND_PAGE)),
        Shape::Path(path) => Some(BackgroundManifest::Scripts {
            scripts: vec![output_file_name(path)],
        }),
        Shape::PathList(paths) => Some(BackgroundManifest::Scripts {
            scripts: paths.into_iter().map(output_file_name).collect(),
        }),
    }
}

/// Returns the module that receives the reload client.
///
/// `None` exactly when the declaration resolves to zero entries.
#[must_use]
pub fn find_injection_target(decl: Option<&BackgroundDecl>) -> Option<String> {
    match shape(decl) {
        Shape::Empty => None,
        Shape::Path(path) => Some(normalize_path(path)),
        Shape::PathList(paths) => paths.first().map(|p| normalize_path(p)),
    }
}

// ============================================================================
// BackgroundManifest
// ============================================================================

/// The `background` key of the emitted manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackgroundManifest {
    /// Background page (Manifest V2).
    Page {
        /// Output-relative page file.
        page: String,
    },

    /// Background scripts (Manifest V2).
    Scripts {
        /// Output-relative script files.
        scripts: Vec<String>,
    },

    /// Service worker (Manifest V3).
    ServiceWorker {
        /// Output-relative worker file.
        service_worker: String,
        /// Worker type, `module` for ES module output.
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        worker_type: Option<String>,
    },
}

impl BackgroundManifest {
    /// Creates a page fragment.
    #[inline]
    #[must_use]
    pub fn page(page: impl Into<String>) -> Self {
        Self::Page { page: page.into() }
    }

    /// Adapts the fragment to the target manifest version.
    ///
    /// Manifest V3 has no background scripts list, so the first script
    /// becomes a module service worker. Pages are left alone.
    #[must_use]
    pub fn for_manifest_version(self, manifest_version: u8) -> Self {
        match self {
            Self::Scripts { scripts } if manifest_version >= 3 => {
                if scripts.len() > 1 {
                    warn!(
                        dropped = scripts.len() - 1,
                        "Manifest V3 allows one service worker; extra background scripts dropped"
                    );
                }

                match scripts.into_iter().next() {
                    Some(service_worker) => Self::ServiceWorker {
                        service_worker,
                        worker_type: Some(MODULE_WORKER_TYPE.to_string()),
                    },
                    None => Self::Scripts {
                        scripts: Vec::new(),
                    },
                }
            }
            other => other,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
