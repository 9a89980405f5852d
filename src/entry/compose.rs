//! Build input composition.

// ============================================================================
// Imports
// ============================================================================

use super::EntryMap;

// ============================================================================
// Public Functions
// ============================================================================

/// Merges background and content inputs into one bundler input set.
///
/// Right-biased: a content entry replaces a background entry of the same
/// name.
#[must_use]
pub fn compose_inputs(background: &EntryMap, content: &EntryMap) -> EntryMap {
    let mut input = background.clone();
    input.extend(content.iter().map(|(name, path)| (name.clone(), path.clone())));
    input
}

// ============================================================================
// Tests
// ============================================================================
