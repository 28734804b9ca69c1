//! In-memory preferences: useful for testing and ephemeral deployments.

use async_trait::async_trait;
use portico_core::{Preferences, PreferencesError, PreferencesSource, Principal};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Preferences held in a map keyed by principal.
/// Nothing survives a restart.
#[derive(Clone)]
pub struct InMemoryPreferences {
    entries: Arc<RwLock<HashMap<Principal, Preferences>>>,
}

impl InMemoryPreferences {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Replace all preferences for a principal.
    pub async fn set(&self, principal: &Principal, prefs: Preferences) {
        self.entries.write().await.insert(principal.clone(), prefs);
    }

    /// Set a single preference, keeping the others.
    pub async fn set_value(&self, principal: &Principal, key: &str, value: serde_json::Value) {
        self.entries
            .write()
            .await
            .entry(principal.clone())
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Forget a principal's preferences. Returns whether any were stored.
    pub async fn remove(&self, principal: &Principal) -> bool {
        self.entries.write().await.remove(principal).is_some()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

impl Default for InMemoryPreferences {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreferencesSource for InMemoryPreferences {
    fn name(&self) -> &str {
        "memory"
    }

    async fn preferences(&self, principal: &Principal) -> Result<Preferences, PreferencesError> {
        let entries = self.entries.read().await;
        Ok(entries.get(principal).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(name: &str) -> Principal {
        Principal::new(name).unwrap()
    }

    #[tokio::test]
    async fn unknown_principal_has_empty_preferences() {
        let prefs = InMemoryPreferences::new();
        assert!(prefs.preferences(&user("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_and_read_back() {
        let prefs = InMemoryPreferences::new();
        prefs.set_value(&user("alice"), "theme", json!("dark")).await;
        prefs.set_value(&user("alice"), "lang", json!("en")).await;
        prefs.set_value(&user("bob"), "theme", json!("light")).await;

        let alice = prefs.preferences(&user("alice")).await.unwrap();
        assert_eq!(alice.len(), 2);
        assert_eq!(alice["theme"], "dark");

        let bob = prefs.preferences(&user("bob")).await.unwrap();
        assert_eq!(bob["theme"], "light");
    }

    #[tokio::test]
    async fn set_replaces_everything() {
        let prefs = InMemoryPreferences::new();
        prefs.set_value(&user("alice"), "old", json!(1)).await;

        let mut fresh = Preferences::new();
        fresh.insert("new".into(), json!(2));
        prefs.set(&user("alice"), fresh).await;

        let alice = prefs.preferences(&user("alice")).await.unwrap();
        assert!(alice.get("old").is_none());
        assert_eq!(alice["new"], 2);
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let prefs = InMemoryPreferences::new();
        prefs.set_value(&user("alice"), "k", json!(true)).await;
        prefs.set_value(&user("bob"), "k", json!(true)).await;

        assert!(prefs.remove(&user("alice")).await);
        assert!(!prefs.remove(&user("alice")).await);

        prefs.clear().await;
        assert!(prefs.preferences(&user("bob")).await.unwrap().is_empty());
    }
}
