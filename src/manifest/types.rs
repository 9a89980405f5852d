//! Typed extension manifest.
//!
//! Only the fields this crate reads or commonly forwards are typed. Every
//! other key is carried verbatim in [`ManifestFields::extra`].

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entry::{BackgroundManifest, ContentScript};

// ============================================================================
// Icons
// ============================================================================

/// Extension icons, either keyed by size or a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Icons {
    /// Size to file, e.g. `{"16": "icon16.png"}`.
    Sized(BTreeMap<String, String>),
    /// One icon for every size.
    Single(String),
}

// ============================================================================
// Action
// ============================================================================

/// Toolbar button (`browser_action`, `page_action`, or MV3 `action`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Button icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_icon: Option<Icons>,

    /// Hover title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_title: Option<String>,

    /// Popup page opened on click.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_popup: Option<String>,
}

// ============================================================================
// ManifestFields
// ============================================================================

/// Manifest keys forwarded from plugin options as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestFields {
    /// Extension name.
    #[serde(default)]
    pub name: String,

    /// Extension version.
    #[serde(default)]
    pub version: String,

    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Extension icons.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<Icons>,

    /// Always-visible toolbar button (MV2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_action: Option<Action>,

    /// Page-specific toolbar button (MV2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_action: Option<Action>,

    /// Toolbar button (MV3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,

    /// Requested permissions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,

    /// Resources web pages may load. A list of paths (MV2) or of
    /// resource objects (MV3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_accessible_resources: Option<Value>,

    /// Any other manifest key.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Manifest
// ============================================================================

/// The manifest artifact written to `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest schema version (2 or 3).
    pub manifest_version: u8,

    /// Forwarded fields.
    #[serde(flatten)]
    pub fields: ManifestFields,

    /// Resolved background fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<BackgroundManifest>,

    /// Resolved content scripts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_scripts: Vec<ContentScript>,
}

// ============================================================================
// Tests
// ============================================================================
