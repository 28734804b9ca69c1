//! Principal resolution: who is asking for the page.
//!
//! The gateway never authenticates by itself; it asks a resolver to turn
//! request headers into a [`Principal`]. Two resolvers are provided:
//!
//! - [`BasicAuthResolver`] checks `Authorization: Basic` against configured
//!   users whose passwords are stored as SHA-256 hex digests.
//! - [`TrustedHeaderResolver`] reads a header set by a fronting proxy that
//!   has already authenticated the user.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::header::{AUTHORIZATION, HeaderMap, HeaderName};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use portico_config::AuthConfig;
use portico_core::{Error, Principal, Result};

/// Resolves the authenticated principal of a request.
pub trait PrincipalResolver: Send + Sync {
    /// `None` when the request carries no acceptable credentials.
    fn resolve(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// Build the resolver selected by `auth.mode`.
pub fn from_config(config: &AuthConfig) -> Result<Arc<dyn PrincipalResolver>> {
    match config.mode.as_str() {
        "basic" => {
            let mut resolver = BasicAuthResolver::new();
            for user in &config.users {
                resolver = resolver.with_user_digest(&user.name, &user.password_sha256);
            }
            if resolver.user_count() == 0 {
                warn!("Basic auth enabled with no users; every request will be rejected");
            }
            Ok(Arc::new(resolver))
        }
        "header" => Ok(Arc::new(TrustedHeaderResolver::new(&config.header_name)?)),
        other => Err(Error::Config {
            message: format!("Unknown auth mode: {other}"),
        }),
    }
}

/// Hex SHA-256 digest of a password, as stored in the config file.
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

#[derive(Default)]
pub struct BasicAuthResolver {
    /// User name to lowercase hex digest.
    users: HashMap<String, String>,
}

impl BasicAuthResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with a plaintext password.
    pub fn with_user(self, name: &str, password: &str) -> Self {
        let digest = password_digest(password);
        self.with_user_digest(name, &digest)
    }

    /// Register a user with a precomputed SHA-256 hex digest.
    pub fn with_user_digest(mut self, name: &str, digest: &str) -> Self {
        self.users
            .insert(name.to_string(), digest.trim().to_ascii_lowercase());
        self
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    fn verify(&self, name: &str, password: &str) -> bool {
        let presented = password_digest(password);
        self.users
            .get(name)
            .is_some_and(|expected| bool::from(presented.as_bytes().ct_eq(expected.as_bytes())))
    }
}

impl PrincipalResolver for BasicAuthResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<Principal> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }

        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (name, password) = decoded.split_once(':')?;

        if self.verify(name, password) {
            Principal::new(name)
        } else {
            debug!(user = %name, "Basic credentials rejected");
            None
        }
    }
}

/// Trusts an identity header injected by a reverse proxy.
pub struct TrustedHeaderResolver {
    header: HeaderName,
}

impl TrustedHeaderResolver {
    pub fn new(header_name: &str) -> Result<Self> {
        let header = HeaderName::from_bytes(header_name.as_bytes()).map_err(|e| Error::Config {
            message: format!("Invalid auth header name '{header_name}': {e}"),
        })?;
        Ok(Self { header })
    }

    pub fn header_name(&self) -> &HeaderName {
        &self.header
    }
}

impl PrincipalResolver for TrustedHeaderResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<Principal> {
        let value = headers.get(&self.header)?.to_str().ok()?;
        Principal::new(value.trim())
    }
}
