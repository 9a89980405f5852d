//! Manifest generation.
//!
//! Merges the forwarded option fields with the resolved background and
//! content fragments and writes `manifest.json` into the staging directory.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::entry::{BackgroundManifest, resolve_background_manifest, resolve_content_manifest};
use crate::error::Result;
use crate::staging;

use super::options::{ResolvedOptions, SESSION_FIELDS};
use super::types::Manifest;

// ============================================================================
// Constants
// ============================================================================

/// File name of the manifest artifact.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Keys owned by the generator. Forwarded extra keys never override them.
const GENERATED_FIELDS: [&str; 3] = ["manifest_version", "background", "content_scripts"];

// ============================================================================
// Public Functions
// ============================================================================

/// Builds the manifest for the resolved options.
///
/// `fallback_background` is used when the options declare no background,
/// e.g. the generated stand-in page in development.
#[must_use]
pub fn build_manifest(
    options: &ResolvedOptions,
    fallback_background: Option<BackgroundManifest>,
) -> Manifest {
    let opts = options.options();

    let mut fields = opts.manifest.clone();
    fields.extra.retain(|key, _| {
        let reserved =
            SESSION_FIELDS.contains(&key.as_str()) || GENERATED_FIELDS.contains(&key.as_str());
        if reserved {
            debug!(key = %key, "Dropped reserved key from manifest pass-through");
        }
        !reserved
    });

    if fields.name.is_empty() || fields.version.is_empty() {
        warn!("Manifest is missing `name` or `version`; the browser will reject it");
    }

    let background = resolve_background_manifest(opts.background.as_ref())
        .or(fallback_background)
        .map(|background| background.for_manifest_version(opts.manifest_version));

    Manifest {
        manifest_version: opts.manifest_version,
        fields,
        background,
        content_scripts: resolve_content_manifest(opts.content.as_ref()),
    }
}

/// Generates `manifest.json` under `client_dir`.
///
/// Creates `client_dir` if needed. The same inputs always produce
/// byte-identical output. Returns the path of the written manifest.
///
/// # Errors
///
/// - [`Error::Json`](crate::Error::Json) if serialization fails
/// - [`Error::Staging`](crate::Error::Staging) if the file cannot be written
pub fn generate_manifest(
    client_dir: &Path,
    options: &ResolvedOptions,
    fallback_background: Option<BackgroundManifest>,
) -> Result<PathBuf> {
    let manifest = build_manifest(options, fallback_background);

    let mut json = serde_json::to_string_pretty(&manifest)?;
    json.push('\n');

    let path = client_dir.join(MANIFEST_FILE);
    staging::write_atomic(&path, json.as_bytes())?;

    info!(
        path = %path.display(),
        content_scripts = manifest.content_scripts.len(),
        has_background = manifest.background.is_some(),
        "Manifest written"
    );

    Ok(path)
}

// ============================================================================
// Tests
// ============================================================================
