//! Content script declaration resolution.
//!
//! A content declaration is either bare paths, injected everywhere:
//!
//! ```json
//! "src/content/index.ts"
//! ["src/content/a.ts", "src/content/b.ts"]
//! ```
//!
//! or a list of groups carrying their own injection metadata:
//!
//! ```json
//! [{ "matches": ["https://*.example.com/*"], "js": ["src/content/a.ts"], "run_at": "document_start" }]
//! ```
//!
//! Only `js` files become build inputs. `css` files are echoed into the
//! manifest unchanged and are not compiled.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::path::{entry_of, output_file_name};
use super::{EntryMap, non_empty};

// ============================================================================
// Constants
// ============================================================================

/// Match pattern used for bare-path content declarations.
pub const ALL_URLS: &str = "<all_urls>";

// ============================================================================
// ContentDecl
// ============================================================================

/// User-supplied content script declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentDecl {
    /// Single script injected into every page.
    Path(String),

    /// Scripts injected into every page as one group.
    PathList(Vec<String>),

    /// Groups with explicit injection metadata.
    Scripts(Vec<ContentScript>),

    /// Any other JSON shape.
    Unrecognized(Value),
}

impl From<&str> for ContentDecl {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<Vec<String>> for ContentDecl {
    fn from(paths: Vec<String>) -> Self {
        Self::PathList(paths)
    }
}

impl From<Vec<ContentScript>> for ContentDecl {
    fn from(scripts: Vec<ContentScript>) -> Self {
        Self::Scripts(scripts)
    }
}

// ============================================================================
// ContentScript
// ============================================================================

/// When a content script runs relative to document loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunAt {
    /// After `DOMContentLoaded`, before idle (platform default).
    DocumentIdle,
    /// Before any DOM is constructed.
    DocumentStart,
    /// Right after the DOM is complete.
    DocumentEnd,
}

/// One `content_scripts` group.
///
/// Serializes with the manifest's own field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentScript {
    /// URL patterns the group is injected into.
    pub matches: Vec<String>,

    /// Stylesheets to inject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<Vec<String>>,

    /// Scripts to inject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub js: Option<Vec<String>>,

    /// URL patterns excluded from injection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_matches: Option<Vec<String>>,

    /// Globs a URL must also match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_globs: Option<Vec<String>>,

    /// Globs that exclude a URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_globs: Option<Vec<String>>,

    /// Injection timing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_at: Option<RunAt>,

    /// Inject into `about:blank` frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_about_blank: Option<bool>,

    /// Inject into all frames instead of only the top frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_frames: Option<bool>,
}

impl ContentScript {
    /// Creates a group injected into the given URL patterns.
    #[must_use]
    pub fn new(matches: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            matches: matches.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Sets the scripts of this group.
    #[must_use]
    pub fn with_js(mut self, js: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.js = Some(js.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the stylesheets of this group.
    #[must_use]
    pub fn with_css(mut self, css: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.css = Some(css.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the injection timing.
    #[inline]
    #[must_use]
    pub fn with_run_at(mut self, run_at: RunAt) -> Self {
        self.run_at = Some(run_at);
        self
    }

    /// Injects into all frames.
    #[inline]
    #[must_use]
    pub fn with_all_frames(mut self) -> Self {
        self.all_frames = Some(true);
        self
    }

    /// Groups for bare paths, injected everywhere.
    fn match_all(js: Vec<String>) -> Self {
        Self {
            matches: vec![ALL_URLS.to_string()],
            js: Some(js),
            ..Default::default()
        }
    }
}

// ============================================================================
// Shape Dispatch
// ============================================================================

/// A declaration reduced to its effective shape.
enum Shape<'a> {
    Empty,
    Paths(Vec<&'a str>),
    Groups(&'a [ContentScript]),
}

/// Groups count as structured only when the first one has `matches`.
fn shape(decl: Option<&ContentDecl>) -> Shape<'_> {
    match decl {
        Some(ContentDecl::Path(path)) if !path.is_empty() => Shape::Paths(vec![path.as_str()]),
        Some(ContentDecl::PathList(paths)) => match non_empty(paths) {
            paths if paths.is_empty() => Shape::Empty,
            paths => Shape::Paths(paths),
        },
        Some(ContentDecl::Scripts(groups))
            if groups.first().is_some_and(|g| !g.matches.is_empty()) =>
        {
            Shape::Groups(groups)
        }
        _ => Shape::Empty,
    }
}

// ============================================================================
// Public Functions
// ============================================================================

/// Resolves a content declaration into build inputs.
///
/// Structured groups contribute their `js` lists, flattened in order.
/// Groups without `js` contribute nothing.
#[must_use]
pub fn resolve_content_input(decl: Option<&ContentDecl>) -> EntryMap {
    let entries: EntryMap = match shape(decl) {
        Shape::Empty => EntryMap::new(),
        Shape::Paths(paths) => paths.into_iter().map(entry_of).collect(),
        Shape::Groups(groups) => groups
            .iter()
            .filter_map(|group| group.js.as_deref())
            .flat_map(non_empty)
            .map(entry_of)
            .collect(),
    };

    debug!(count = entries.len(), "Resolved content inputs");
    entries
}

/// Resolves a content declaration into manifest `content_scripts`.
///
/// Bare paths become a single `<all_urls>` group. Structured groups keep
/// every field except `js`, which is rewritten to output `.js` names.
#[must_use]
pub fn resolve_content_manifest(decl: Option<&ContentDecl>) -> Vec<ContentScript> {
    match shape(decl) {
        Shape::Empty => Vec::new(),
        Shape::Paths(paths) => vec![ContentScript::match_all(
            paths.into_iter().map(output_file_name).collect(),
        )],
        Shape::Groups(groups) => groups
            .iter()
            .map(|group| ContentScript {
                js: group
                    .js
                    .as_deref()
                    .map(|js| non_empty(js).into_iter().map(output_file_name).collect()),
                ..group.clone()
            })
            .collect(),
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
    fn test_input_path_list_naming() {
        let decl = ContentDecl::from(vec!["src/bg/index.ts".to_string()]);
        let input = resolve_content_input(Some(&decl));
        assert_eq!(input["bg"], "src/bg/index.ts");

        let decl = ContentDecl::from(vec!["src/bg/a.ts".to_string()]);
        let input = resolve_content_input(Some(&decl));
        assert_eq!(input["a"], "src/bg/a.ts");
    }

    #[test]
    fn test_input_flattens_group_scripts() {
        let decl = ContentDecl::from(vec![
            ContentScript::new([ALL_URLS]).with_js(["./content/index.ts"]),
            ContentScript::new([ALL_URLS]).with_js(["./content/entry.ts", "./content/extra.ts"]),
            ContentScript::new([ALL_URLS]).with_css(["./content/style.css"]),
        ]);
        let input = resolve_content_input(Some(&decl));

        assert_eq!(input.len(), 3);
        assert_eq!(input["content"], "content/index.ts");
        assert_eq!(input["entry"], "content/entry.ts");
        assert_eq!(input["extra"], "content/extra.ts");
    }

    #[test]
    fn test_groups_without_matches_are_unrecognized() {
        let decl = ContentDecl::from(vec![ContentScript::default().with_js(["a.ts"])]);
        assert!(resolve_content_input(Some(&decl)).is_empty());
        assert!(resolve_content_manifest(Some(&decl)).is_empty());
    }

    #[test]
    fn test_empty_and_unrecognized_resolve_to_nothing() {
        let decls = [
            None,
            Some(ContentDecl::from("")),
            Some(ContentDecl::PathList(Vec::new())),
            Some(ContentDecl::Scripts(Vec::new())),
            Some(ContentDecl::Unrecognized(json!({ "js": "a.ts" }))),
        ];

        for decl in &decls {
            assert!(resolve_content_input(decl.as_ref()).is_empty());
            assert!(resolve_content_manifest(decl.as_ref()).is_empty());
        }
    }

    #[test]
    fn test_manifest_bare_path() {
        let decl = ContentDecl::from("src/content/index.ts");
        assert_eq!(
            resolve_content_manifest(Some(&decl)),
            vec![ContentScript::new([ALL_URLS]).with_js(["content.js"])]
        );
    }

    #[test]
    fn test_manifest_path_list_single_group() {
        let decl = ContentDecl::from(vec!["a.ts".to_string(), "b/index.ts".to_string()]);
        assert_eq!(
            resolve_content_manifest(Some(&decl)),
            vec![ContentScript::new([ALL_URLS]).with_js(["a.js", "b.js"])]
        );
    }

    #[test]
    fn test_manifest_group_rewrites_js_only() {
        let decl: ContentDecl = serde_json::from_value(json!([{
            "matches": ["<all_urls>"],
            "js": ["c.ts"]
        }]))
        .unwrap();

        let manifest = resolve_content_manifest(Some(&decl));
        assert_eq!(
            serde_json::to_value(&manifest).unwrap(),
            json!([{ "matches": ["<all_urls>"], "js": ["c.js"] }])
        );
    }

    #[test]
    fn test_manifest_group_metadata_passes_through() {
        let group = ContentScript {
            matches: vec!["https://*.example.com/*".into()],
            css: Some(vec!["style.css".into()]),
            js: Some(vec!["src/inject/index.ts".into()]),
            exclude_matches: Some(vec!["https://admin.example.com/*".into()]),
            include_globs: Some(vec!["*shop*".into()]),
            exclude_globs: Some(vec!["*cart*".into()]),
            run_at: Some(RunAt::DocumentStart),
            match_about_blank: Some(true),
            all_frames: Some(false),
        };
        let decl = ContentDecl::from(vec![group.clone()]);

        let manifest = resolve_content_manifest(Some(&decl));
        assert_eq!(manifest.len(), 1);
        assert_eq!(
            manifest[0],
            ContentScript {
                js: Some(vec!["inject.js".into()]),
                ..group
            }
        );
    }

    #[test]
    fn test_run_at_serialization() {
        let group = ContentScript::new([ALL_URLS]).with_run_at(RunAt::DocumentEnd);
        let value = serde_json::to_value(&group).unwrap();
        assert_eq!(value["run_at"], "document_end");
    }

    #[test]
    fn test_deserialize_shapes() {
        let path: ContentDecl = serde_json::from_value(json!("a.ts")).unwrap();
        assert!(matches!(path, ContentDecl::Path(_)));

        let list: ContentDecl = serde_json::from_value(json!(["a.ts"])).unwrap();
        assert!(matches!(list, ContentDecl::PathList(_)));

        let groups: ContentDecl =
            serde_json::from_value(json!([{ "matches": ["<all_urls>"], "all_frames": true }]))
                .unwrap();
        assert!(matches!(groups, ContentDecl::Scripts(ref g) if g[0].all_frames == Some(true)));

        let other: ContentDecl = serde_json::from_value(json!(7)).unwrap();
        assert!(matches!(other, ContentDecl::Unrecognized(_)));
    }
}
