//! Session token service.
//!
//! Mints a fresh random token for every page and remembers which principal
//! it belongs to, so the real-time channel can check the token the page
//! hands back. Tokens carry no meaning of their own.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tracing::debug;

use portico_core::{Principal, SessionToken, TokenError, TokenIssuer};

/// Random bytes per token (32 characters once encoded).
pub const TOKEN_BYTES: usize = 24;

/// Default number of live tokens kept before the oldest is evicted.
pub const DEFAULT_MAX_ACTIVE: usize = 1024;

/// What the service remembers about an issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub principal: Principal,
    pub issued_at: DateTime<Utc>,
}

#[derive(Default)]
struct TokenTable {
    by_token: HashMap<String, IssuedToken>,
    /// Issue order, oldest first.
    order: VecDeque<String>,
}

/// Issues, validates and revokes session tokens.
///
/// All state sits behind one `std::sync::Mutex` that is only held for
/// map updates, never across an `.await`.
pub struct TokenService {
    max_active: usize,
    table: Mutex<TokenTable>,
}

impl Default for TokenService {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ACTIVE)
    }
}

impl TokenService {
    pub fn new(max_active: usize) -> Self {
        Self {
            max_active: max_active.max(1),
            table: Mutex::new(TokenTable::default()),
        }
    }

    pub fn from_config(config: &portico_config::TokenConfig) -> Self {
        Self::new(config.max_active)
    }

    /// Mint and record a new token for `principal`.
    pub fn issue(&self, principal: &Principal) -> SessionToken {
        let value = generate_token();
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());

        while table.by_token.len() >= self.max_active {
            let Some(oldest) = table.order.pop_front() else {
                break;
            };
            if let Some(evicted) = table.by_token.remove(&oldest) {
                debug!(principal = %evicted.principal, "Evicted oldest session token");
            }
        }

        table.by_token.insert(
            value.clone(),
            IssuedToken {
                principal: principal.clone(),
                issued_at: Utc::now(),
            },
        );
        table.order.push_back(value.clone());
        drop(table);

        debug!(principal = %principal, "Session token issued");
        SessionToken::new(value)
    }

    /// The principal a live token was issued to.
    pub fn validate(&self, token: &str) -> Option<Principal> {
        self.lookup(token).map(|issued| issued.principal)
    }

    pub fn lookup(&self, token: &str) -> Option<IssuedToken> {
        let table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        table.by_token.get(token).cloned()
    }

    /// Withdraw a token. Returns whether it was live.
    pub fn revoke(&self, token: &str) -> bool {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        if table.by_token.remove(token).is_none() {
            return false;
        }
        table.order.retain(|t| t != token);
        true
    }

    /// Withdraw every token issued to `principal`. Returns how many.
    pub fn revoke_all(&self, principal: &Principal) -> usize {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        let before = table.by_token.len();
        table.by_token.retain(|_, issued| &issued.principal != principal);
        let TokenTable { by_token, order } = &mut *table;
        order.retain(|t| by_token.contains_key(t));
        before - by_token.len()
    }

    pub fn active_count(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .by_token
            .len()
    }

    pub fn max_active(&self) -> usize {
        self.max_active
    }
}

#[async_trait]
impl TokenIssuer for TokenService {
    async fn issue_token(&self, principal: &Principal) -> Result<SessionToken, TokenError> {
        Ok(self.issue(principal))
    }
}

fn generate_token() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill(&mut bytes[..]);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn user(name: &str) -> Principal {
        Principal::new(name).unwrap()
    }

    #[test]
    fn tokens_are_url_safe_and_fixed_length() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[tokio::test]
    async fn every_issue_mints_a_new_token() {
        let service = TokenService::default();
        let alice = user("alice");
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let token = service.issue_token(&alice).await.unwrap();
            assert!(seen.insert(token.as_str().to_string()));
        }
        assert_eq!(service.active_count(), 100);
    }

    #[test]
    fn validate_returns_the_owner() {
        let service = TokenService::default();
        let token = service.issue(&user("alice"));

        assert_eq!(service.validate(token.as_str()), Some(user("alice")));
        assert_eq!(service.validate("not-a-token"), None);
        assert!(service.lookup(token.as_str()).unwrap().issued_at <= Utc::now());
    }

    #[test]
    fn revoke_removes_a_single_token() {
        let service = TokenService::default();
        let first = service.issue(&user("alice"));
        let second = service.issue(&user("alice"));

        assert!(service.revoke(first.as_str()));
        assert!(!service.revoke(first.as_str()));
        assert_eq!(service.validate(first.as_str()), None);
        assert!(service.validate(second.as_str()).is_some());
    }

    #[test]
    fn revoke_all_is_scoped_to_the_principal() {
        let service = TokenService::default();
        service.issue(&user("alice"));
        service.issue(&user("alice"));
        let bob = service.issue(&user("bob"));

        assert_eq!(service.revoke_all(&user("alice")), 2);
        assert_eq!(service.active_count(), 1);
        assert_eq!(service.validate(bob.as_str()), Some(user("bob")));
    }

    #[test]
    fn oldest_token_is_evicted_at_capacity() {
        let service = TokenService::new(2);
        let first = service.issue(&user("a"));
        let second = service.issue(&user("b"));
        let third = service.issue(&user("c"));

        assert_eq!(service.active_count(), 2);
        assert_eq!(service.validate(first.as_str()), None);
        assert!(service.validate(second.as_str()).is_some());
        assert!(service.validate(third.as_str()).is_some());
    }

    #[test]
    fn revoked_tokens_do_not_count_toward_capacity() {
        let service = TokenService::new(2);
        let first = service.issue(&user("a"));
        let second = service.issue(&user("b"));
        service.revoke(first.as_str());
        let third = service.issue(&user("c"));

        assert!(service.validate(second.as_str()).is_some());
        assert!(service.validate(third.as_str()).is_some());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let service = TokenService::new(0);
        assert_eq!(service.max_active(), 1);
        let token = service.issue(&user("a"));
        assert!(service.validate(token.as_str()).is_some());
    }
}
