//! Session tokens: opaque per-request credentials for the UI channel.
//!
//! A token is minted fresh for every composed page and handed to the client
//! inside the page body. The client presents it when opening the real-time
//! channel. This crate only defines the seam; issuance, validation and
//! revocation belong to the issuer implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TokenError;
use crate::principal::Principal;

/// An opaque session credential.
///
/// Callers must treat the value as an uninterpreted string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The external string form of the token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Keep credentials out of logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Issues session tokens bound to a principal.
///
/// Implementations must mint a new token on every call; callers rely on
/// two requests never sharing a credential.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self, principal: &Principal) -> Result<SessionToken, TokenError>;
}
