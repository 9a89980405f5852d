//! Entry path normalization and naming.
//!
//! Every background and content entry goes through the same naming
//! convention:
//!
//! | Source path | Entry name |
//! |-------------|------------|
//! | `src/bg/a.ts` | `a` |
//! | `src/bg/index.ts` | `bg` |
//! | `index.ts` | `index` |
//!
//! Files named `index` take the name of their parent directory so that a
//! directory-per-entry layout does not collapse onto a single `index` entry.
//!
//! All functions here are pure and infallible. Malformed input produces a
//! degenerate (possibly empty) name rather than an error.

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;

// ============================================================================
// Constants
// ============================================================================

/// Basename (without extension) that triggers parent-directory naming.
pub const INDEX_STEM: &str = "index";

/// Entry name used when an `index` file has no usable parent directory.
pub const DEFAULT_ENTRY_NAME: &str = "index";

/// Extension of every emitted entry chunk.
pub const OUTPUT_EXTENSION: &str = "js";

// ============================================================================
// Public Functions
// ============================================================================

/// Returns the `(entry name, normalized path)` pair for a raw path.
#[must_use]
pub fn entry_of(raw: &str) -> (String, String) {
    let path = normalize_path(raw);
    (entry_name_of(&path), path)
}

/// Standardizes separators and resolves `.` / `..` segments lexically.
///
/// Never touches the filesystem and never changes character case.
/// Absolute paths stay absolute; leading `..` segments of a relative
/// path are kept since there is nothing to resolve them against.
#[must_use]
pub fn normalize_path(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let unified = raw.replace('\\', "/");
    let absolute = unified.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&last) if last != ".." => {
                    segments.pop();
                }
                _ if absolute => {}
                _ => segments.push(".."),
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Returns the entry name for a path following the `index` convention.
#[must_use]
pub fn entry_name_of(path: &str) -> String {
    let normalized = normalize_path(path);
    let path = Path::new(&normalized);

    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return String::new();
    };

    if stem != INDEX_STEM {
        return stem.to_string();
    }

    path.parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_ENTRY_NAME)
        .to_string()
}

/// Returns the output-relative file name the bundler emits for a path.
///
/// Format: `{entry name}.js`
#[must_use]
pub fn output_file_name(path: &str) -> String {
    format!("{}.{OUTPUT_EXTENSION}", entry_name_of(path))
}

/// Returns `true` if the path names an HTML document.
#[inline]
#[must_use]
pub fn is_html(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}

/// Returns `true` if a bundler module id refers to the given target path.
///
/// The id is normalized and stripped of any `?query` or `#hash` suffix.
/// It matches when it equals the target or ends with the target on a
/// path-component boundary, so `src/data.ts` never matches `a.ts`.
#[must_use]
pub fn module_matches(id: &str, target: &str) -> bool {
    let target = normalize_path(target);
    if target.is_empty() || target == "." {
        return false;
    }

    let bare_id = id.split(['?', '#']).next().unwrap_or_default();
    let id = normalize_path(bare_id);

    if id == target {
        return true;
    }

    let relative_target = target.trim_start_matches("../");
    id.strip_suffix(relative_target)
        .is_some_and(|prefix| prefix.ends_with('/'))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_normalize_resolves_relative_segments() {
        assert_eq!(normalize_path("./src/bg/../content/a.ts"), "src/content/a.ts");
        assert_eq!(normalize_path("src//bg/./index.ts"), "src/bg/index.ts");
        assert_eq!(normalize_path("/root/./x/../y.ts"), "/root/y.ts");
    }

    #[test]
    fn test_normalize_standardizes_separators() {
        assert_eq!(normalize_path("src\\Bg\\Index.ts"), "src/Bg/Index.ts");
    }

    #[test]
    fn test_normalize_keeps_leading_parent_segments() {
        assert_eq!(normalize_path("../../a.ts"), "../../a.ts");
        assert_eq!(normalize_path("/../a.ts"), "/a.ts");
    }

    #[test]
    fn test_normalize_degenerate_input() {
        assert_eq!(normalize_path(""), "");
        assert_eq!(normalize_path("./"), ".");
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_entry_name_plain_file() {
        assert_eq!(entry_name_of("src/bg/a.ts"), "a");
        assert_eq!(entry_name_of("content.js"), "content");
    }

    #[test]
    fn test_entry_name_index_uses_parent() {
        assert_eq!(entry_name_of("src/bg/index.ts"), "bg");
        assert_eq!(entry_name_of("/abs/popup/index.html"), "popup");
        assert_eq!(entry_name_of("src/bg/sub/../index.ts"), "bg");
    }

    #[test]
    fn test_entry_name_index_without_parent() {
        assert_eq!(entry_name_of("index.ts"), DEFAULT_ENTRY_NAME);
        assert_eq!(entry_name_of("/index.ts"), DEFAULT_ENTRY_NAME);
        assert_eq!(entry_name_of("../index.ts"), DEFAULT_ENTRY_NAME);
    }

    #[test]
    fn test_entry_name_degenerate() {
        assert_eq!(entry_name_of(""), "");
        assert_eq!(entry_name_of(".."), "");
    }

    #[test]
    fn test_entry_of_pairs_name_with_normalized_path() {
        let (name, path) = entry_of("./src\\bg/index.ts");
        assert_eq!(name, "bg");
        assert_eq!(path, "src/bg/index.ts");
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("src/content/c.ts"), "c.js");
        assert_eq!(output_file_name("src/content/index.tsx"), "content.js");
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("src/background.html"));
        assert!(is_html("PAGE.HTML"));
        assert!(!is_html("src/background.ts"));
        assert!(!is_html("html"));
    }

    #[test]
    fn test_module_matches_component_suffix() {
        assert!(module_matches("/proj/src/bg/a.ts", "src/bg/a.ts"));
        assert!(module_matches("/proj/src/bg/a.ts", "/proj/src/bg/a.ts"));
        assert!(module_matches("/proj/src/bg/a.ts?v=123", "src/bg/a.ts"));
        assert!(!module_matches("/proj/src/bg/data.ts", "a.ts"));
        assert!(!module_matches("/proj/src/bg/a.ts", ""));
    }

    #[test]
    fn test_module_matches_relative_target() {
        assert!(module_matches("/proj/bg/a.ts", "./bg/a.ts"));
        assert!(module_matches("/proj/shared/a.ts", "../shared/a.ts"));
    }

    proptest! {
        #[test]
        fn prop_plain_file_named_by_stem(
            dir in "[a-z]{1,8}",
            stem in "[a-z][a-z0-9_]{0,8}",
        ) {
            prop_assume!(stem != INDEX_STEM);
            let path = format!("src/{dir}/{stem}.ts");
            prop_assert_eq!(entry_name_of(&path), stem);
        }

        #[test]
        fn prop_index_file_named_by_parent(dir in "[a-z][a-z0-9_]{0,8}") {
            let path = format!("src/{dir}/index.ts");
            prop_assert_eq!(entry_name_of(&path), dir);
        }

        #[test]
        fn prop_normalize_is_idempotent(raw in "[a-z./\\\\]{0,24}") {
            let once = normalize_path(&raw);
            prop_assert_eq!(normalize_path(&once), once.clone());
        }
    }
}
