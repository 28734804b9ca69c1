//! Preferences trait: per-user UI settings.
//!
//! Preferences are an ordered mapping from key to JSON value. The composed
//! page embeds them verbatim as a JavaScript object literal.

use async_trait::async_trait;

use crate::error::PreferencesError;
use crate::principal::Principal;

/// Per-user preferences, keyed and ordered by preference name.
pub type Preferences = serde_json::Map<String, serde_json::Value>;

/// A source of user preferences.
///
/// A principal with no stored preferences yields an empty map, not an error.
#[async_trait]
pub trait PreferencesSource: Send + Sync {
    /// The name of this backend (e.g., "memory", "file").
    fn name(&self) -> &str;

    /// Fetch all preferences for a principal.
    async fn preferences(&self, principal: &Principal) -> Result<Preferences, PreferencesError>;
}
