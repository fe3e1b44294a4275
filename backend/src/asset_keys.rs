//! Identifier validation and blob key derivation
//!
//! Key derivation is pure and side-effect-free so the upload and delete
//! paths can both assert against it without I/O; the two paths can never
//! disagree about where an asset lives.

use once_cell::sync::Lazy;
use regex::Regex;

static ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("Invalid regex")
});

/// The derived blob-store keys for one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetKeys {
    /// Key of the as-uploaded file
    pub original_key: String,
    /// Key of the derived preview
    pub thumb_key: String,
}

/// Whether a caller-supplied identifier is a well-formed 36-character
/// hyphenated hex token (8-4-4-4-12, case-insensitive)
#[must_use]
pub fn is_valid_id(value: &str) -> bool {
    ID_REGEX.is_match(value)
}

/// `None` if the identifier is valid, otherwise `"Invalid {label}"`
///
/// Mandatory guard before any identifier is interpolated into a storage
/// key or SQL lookup.
#[must_use]
pub fn invalid_id_error(value: &str, label: &str) -> Option<String> {
    if is_valid_id(value) {
        None
    } else {
        Some(format!("Invalid {label}"))
    }
}

/// Derives the key pair for an asset
///
/// Pure and deterministic; performs no validation. Callers must validate
/// both identifiers first.
#[must_use]
pub fn build_asset_keys(project_id: &str, asset_id: &str) -> AssetKeys {
    AssetKeys {
        original_key: format!("{project_id}/{asset_id}/original"),
        thumb_key: format!("{project_id}/{asset_id}/thumb"),
    }
}

/// Whether a stored key pair is exactly what the builder derives for these
/// identifiers
///
/// Checked before every delete and before accepting a client-submitted
/// commit payload, so metadata can never point at another asset's objects.
#[must_use]
pub fn keys_match(project_id: &str, asset_id: &str, original_key: &str, thumb_key: &str) -> bool {
    let expected = build_asset_keys(project_id, asset_id);
    expected.original_key == original_key && expected.thumb_key == thumb_key
}

/// Whether a key written under the older, less strict naming convention is
/// still safely attributable to this asset
///
/// True iff the key is non-empty and contains both identifiers as
/// substrings. Recognition only: never used to authorize new key
/// generation.
#[must_use]
pub fn is_legacy_key_safe(project_id: &str, asset_id: &str, key: &str) -> bool {
    !key.is_empty() && key.contains(project_id) && key.contains(asset_id)
}
