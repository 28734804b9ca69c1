//! Error types for the Portico domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Portico operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Template errors ---
    #[error("Malformed template: {0}")]
    Template(#[from] TemplateError),

    // --- Token errors ---
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    // --- Preferences errors ---
    #[error("Preferences error: {0}")]
    Preferences(#[from] PreferencesError),

    // --- Composition errors ---
    #[error("Composition error: {0}")]
    Compose(#[from] ComposeError),

    // --- Address errors ---
    #[error("Address error: {0}")]
    Address(#[from] AddressError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// A template that cannot be split at its injection markers.
///
/// Templates are deployment artifacts, so every variant is fatal for the
/// request that hit it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("template is empty")]
    EmptyTemplate,

    #[error("invalid marker pair: {0}")]
    InvalidMarkers(String),

    #[error("start marker {marker:?} not found")]
    MissingStartMarker { marker: String },

    #[error("end marker {marker:?} not found after start marker")]
    MissingEndMarker { marker: String },

    #[error("marker {marker:?} occurs more than once (again at byte {offset})")]
    DuplicateMarker { marker: String, offset: usize },

    #[error("offsets {prefix_end}..{suffix_start} do not fit a {len}-byte template")]
    OffsetsOutOfRange {
        prefix_end: usize,
        suffix_start: usize,
        len: usize,
    },

    #[error("failed to read template at {path}: {reason}")]
    Read { path: String, reason: String },
}

#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("Token issuance failed for {principal}: {reason}")]
    IssuanceFailed { principal: String, reason: String },

    #[error("Token service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error)]
pub enum PreferencesError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corrupt preferences for {principal}: {reason}")]
    Corrupt { principal: String, reason: String },

    #[error("Preferences service unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("Preferences lookup failed: {0}")]
    Preferences(#[from] PreferencesError),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Fragment production failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("fragment '{name}' failed: {source}")]
    Fragment {
        name: String,
        #[source]
        source: FragmentError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Invalid IP prefix '{0}'")]
    InvalidPrefix(String),

    #[error("Prefix length {len} exceeds {max} bits")]
    PrefixTooLong { len: u8, max: u8 },

    #[error("Mixed IP versions: {field} is not the same family as the interface address")]
    VersionMismatch { field: &'static str },
}
