//! Extension manifest synthesis.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Options`] | Raw plugin options (session fields + manifest pass-through) |
//! | [`ResolvedOptions`] | Validated options with an absolute root |
//! | [`Manifest`] | Typed `manifest.json` artifact |
//! | [`generate_manifest`] | Writes the manifest into the staging directory |

// ============================================================================
// Submodules
// ============================================================================

/// Manifest generation.
pub mod generate;

/// Plugin options.
pub mod options;

/// Typed manifest fields.
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

pub use generate::{MANIFEST_FILE, build_manifest, generate_manifest};
pub use options::{DEFAULT_HOST, DEFAULT_MANIFEST_VERSION, DEFAULT_PORT, Options, ResolvedOptions};
pub use types::{Action, Icons, Manifest, ManifestFields};
