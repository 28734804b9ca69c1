//! Principal: the identity of the authenticated caller.
//!
//! Resolution of "who is calling" happens outside the composition pipeline;
//! everything downstream only ever sees a resolved `Principal`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identifier of an authenticated caller.
///
/// Always non-empty. The same string doubles as the display name embedded
/// in the bootstrap script.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Build a principal from a resolved name. Returns `None` for blank names.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            None
        } else {
            Some(Self(name))
        }
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Principal {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
