//! Fragment producers: the script statements injected into the page.
//!
//! Each producer sees only the resolved principal and returns one
//! self-contained JavaScript statement. Producers never observe each other,
//! so the composer is free to run them concurrently.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use portico_core::{FragmentError, PreferencesSource, Principal, SessionToken};

/// Produces one injected fragment for a principal.
#[async_trait]
pub trait FragmentProducer: Send + Sync {
    /// Short name used in logs and errors (e.g., "auth", "preferences").
    fn name(&self) -> &str;

    async fn produce(&self, principal: &Principal) -> Result<Bytes, FragmentError>;
}

/// Encode `value` as a JavaScript string literal that is safe inside `<script>`.
pub fn js_string(value: &str) -> String {
    // Serializing a &str cannot fail.
    script_safe(serde_json::to_string(value).unwrap_or_default())
}

/// Escape characters that could end the enclosing script element.
///
/// `<`, `>` and `&` only ever appear inside string literals of JSON text, so
/// replacing them with unicode escapes keeps the value identical for JS.
fn script_safe(json: String) -> String {
    if !json.contains(['<', '>', '&']) {
        return json;
    }
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

/// Binds the principal to the session token issued for this request.
///
/// ```text
/// var uiUser = "alice",
///     uiAuth = "…token…";
/// ```
pub struct AuthFragment {
    token: SessionToken,
}

impl AuthFragment {
    pub fn new(token: SessionToken) -> Self {
        Self { token }
    }
}

#[async_trait]
impl FragmentProducer for AuthFragment {
    fn name(&self) -> &str {
        "auth"
    }

    async fn produce(&self, principal: &Principal) -> Result<Bytes, FragmentError> {
        let code = format!(
            "var uiUser = {},\n    uiAuth = {};\n",
            js_string(principal.name()),
            js_string(self.token.as_str())
        );
        Ok(Bytes::from(code))
    }
}

/// Embeds the principal's preferences as `var userPrefs = {...};`.
pub struct PreferencesFragment {
    source: Arc<dyn PreferencesSource>,
}

impl PreferencesFragment {
    pub fn new(source: Arc<dyn PreferencesSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl FragmentProducer for PreferencesFragment {
    fn name(&self) -> &str {
        "preferences"
    }

    async fn produce(&self, principal: &Principal) -> Result<Bytes, FragmentError> {
        let prefs = self.source.preferences(principal).await?;
        let json = script_safe(serde_json::to_string(&prefs)?);
        Ok(Bytes::from(format!("var userPrefs = {json};\n")))
    }
}

/// Logs the login to the browser console.
pub struct ConsoleLogFragment;

#[async_trait]
impl FragmentProducer for ConsoleLogFragment {
    fn name(&self) -> &str {
        "console"
    }

    async fn produce(&self, principal: &Principal) -> Result<Bytes, FragmentError> {
        let message = format!("Logging in as user >{}<", principal.name());
        Ok(Bytes::from(format!("console.log({});\n", js_string(&message))))
    }
}

/// Fixed bytes, independent of the principal.
pub struct StaticFragment {
    name: String,
    bytes: Bytes,
}

impl StaticFragment {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl FragmentProducer for StaticFragment {
    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(&self, _principal: &Principal) -> Result<Bytes, FragmentError> {
        Ok(self.bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::{Preferences, PreferencesError};
    use serde_json::json;

    struct FixedPrefs(Preferences);

    #[async_trait]
    impl PreferencesSource for FixedPrefs {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn preferences(&self, _: &Principal) -> Result<Preferences, PreferencesError> {
            Ok(self.0.clone())
        }
    }

    struct DownPrefs;

    #[async_trait]
    impl PreferencesSource for DownPrefs {
        fn name(&self) -> &str {
            "down"
        }

        async fn preferences(&self, _: &Principal) -> Result<Preferences, PreferencesError> {
            Err(PreferencesError::Unavailable("store offline".into()))
        }
    }

    fn alice() -> Principal {
        Principal::new("alice").unwrap()
    }

    fn text(bytes: Bytes) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn js_string_escapes_script_breakers() {
        assert_eq!(js_string("plain"), "\"plain\"");
        assert_eq!(js_string("o'neil"), "\"o'neil\"");
        assert_eq!(js_string("a\"b"), "\"a\\\"b\"");
        assert_eq!(
            js_string("</script><b>&"),
            "\"\\u003c/script\\u003e\\u003cb\\u003e\\u0026\""
        );
    }

    #[tokio::test]
    async fn auth_fragment_binds_user_and_token() {
        let fragment = AuthFragment::new(SessionToken::new("tok-123"));
        let out = text(fragment.produce(&alice()).await.unwrap());
        assert_eq!(out, "var uiUser = \"alice\",\n    uiAuth = \"tok-123\";\n");
    }

    #[tokio::test]
    async fn preferences_fragment_embeds_object() {
        let mut prefs = Preferences::new();
        prefs.insert("theme".into(), json!("dark"));
        prefs.insert("topo".into(), json!({"zoom": 2}));
        let fragment = PreferencesFragment::new(Arc::new(FixedPrefs(prefs)));

        let out = text(fragment.produce(&alice()).await.unwrap());
        assert_eq!(
            out,
            "var userPrefs = {\"theme\":\"dark\",\"topo\":{\"zoom\":2}};\n"
        );
    }

    #[tokio::test]
    async fn preferences_keep_insertion_order() {
        let mut prefs = Preferences::new();
        prefs.insert("zeta".into(), json!(1));
        prefs.insert("alpha".into(), json!(2));
        prefs.insert("mid".into(), json!({"y": true, "x": false}));
        let fragment = PreferencesFragment::new(Arc::new(FixedPrefs(prefs)));

        let out = text(fragment.produce(&alice()).await.unwrap());
        assert_eq!(
            out,
            "var userPrefs = {\"zeta\":1,\"alpha\":2,\"mid\":{\"y\":true,\"x\":false}};\n"
        );
    }

    #[tokio::test]
    async fn empty_preferences_are_an_empty_object() {
        let fragment = PreferencesFragment::new(Arc::new(FixedPrefs(Preferences::new())));
        let out = text(fragment.produce(&alice()).await.unwrap());
        assert_eq!(out, "var userPrefs = {};\n");
    }

    #[tokio::test]
    async fn preferences_values_cannot_close_the_script() {
        let mut prefs = Preferences::new();
        prefs.insert("note".into(), json!("</script><script>alert(1)"));
        let fragment = PreferencesFragment::new(Arc::new(FixedPrefs(prefs)));
        let out = text(fragment.produce(&alice()).await.unwrap());
        assert!(!out.contains("</script>"));
    }

    #[tokio::test]
    async fn preferences_failure_propagates() {
        let fragment = PreferencesFragment::new(Arc::new(DownPrefs));
        let err = fragment.produce(&alice()).await.unwrap_err();
        assert!(matches!(err, FragmentError::Preferences(_)));
    }

    #[tokio::test]
    async fn console_fragment_names_the_user() {
        let out = text(ConsoleLogFragment.produce(&alice()).await.unwrap());
        assert_eq!(
            out,
            "console.log(\"Logging in as user \\u003ealice\\u003c\");\n"
        );
    }

    #[tokio::test]
    async fn static_fragment_ignores_principal() {
        let fragment = StaticFragment::new("x", "X");
        assert_eq!(fragment.name(), "x");
        assert_eq!(&fragment.produce(&alice()).await.unwrap()[..], b"X");
    }
}
