//! Index page handlers.
//!
//! Per request: serve the not-ready page unchanged while services are not
//! installed or when no principal resolves, redirect `/` without credentials,
//! otherwise locate the markers, issue one session token, compose and stream.
//!
//! Composition errors become a bare 500. Fragments are materialized before
//! the response is built, so a failing request never sends body bytes.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

use portico_compose::{
    AuthFragment, ComposedPage, ConsoleLogFragment, FragmentProducer, PreferencesFragment,
};
use portico_core::Principal;
use portico_security::{AuditEvent, AuditOutcome};

use crate::{GatewayState, SharedState, UiServices};

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// `GET /`
pub async fn root_handler(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    match state.resolver.resolve(&headers) {
        Some(principal) => serve_index(&state, principal).await,
        None => Redirect::temporary(&state.index_path).into_response(),
    }
}

/// `GET /index.html` (or the configured index path)
pub async fn index_handler(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if !state.is_ready().await {
        debug!("UI services not installed; serving not-ready page");
        return not_ready(&state);
    }
    let Some(principal) = state.resolver.resolve(&headers) else {
        record_auth_failure(&state);
        return not_ready(&state);
    };
    serve_index(&state, principal).await
}

/// Compose the index for `principal`.
///
/// The template is located on every call, and exactly one token is issued
/// before any fragment runs.
pub async fn compose_index(
    services: &UiServices,
    principal: &Principal,
) -> portico_core::Result<ComposedPage> {
    let offsets = services.template.locate()?;
    let token = services.issuer.issue_token(principal).await?;

    let producers: Vec<Arc<dyn FragmentProducer>> = vec![
        Arc::new(AuthFragment::new(token)),
        Arc::new(PreferencesFragment::new(services.preferences.clone())),
        Arc::new(ConsoleLogFragment),
    ];

    let page = services
        .composer
        .compose(services.template.bytes(), offsets, &producers, principal)
        .await?;
    Ok(page)
}

async fn serve_index(state: &GatewayState, principal: Principal) -> Response {
    let Some(services) = state.services().await else {
        debug!(principal = %principal, "UI services not installed; serving not-ready page");
        return not_ready(state);
    };

    match compose_index(&services, &principal).await {
        Ok(page) => {
            state
                .audit
                .log(AuditEvent::TokenIssued, principal.name(), AuditOutcome::Success, None);
            debug!(
                principal = %principal,
                content_length = page.content_length(),
                "Serving index"
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static(HTML_CONTENT_TYPE)),
                    (header::CONTENT_LENGTH, HeaderValue::from(page.content_length())),
                    (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
                ],
                Body::from_stream(page),
            )
                .into_response()
        }
        Err(e) => {
            error!(principal = %principal, error = %e, "Failed to compose index page");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// The static fallback, byte for byte. No token, no fragments.
fn not_ready(state: &GatewayState) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HTML_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        state.not_ready.clone(),
    )
        .into_response()
}

fn record_auth_failure(state: &GatewayState) {
    state.audit.log(
        AuditEvent::AuthFailure {
            path: state.index_path.clone(),
        },
        "anonymous",
        AuditOutcome::Denied,
        None,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_router, frontend};
    use async_trait::async_trait;
    use axum::http::Request;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use http_body_util::BodyExt;
    use portico_compose::{Composer, Template};
    use portico_core::{
        Preferences, PreferencesError, PreferencesSource, SessionToken, TokenError, TokenIssuer,
    };
    use portico_preferences::InMemoryPreferences;
    use portico_security::{BasicAuthResolver, TokenService};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    const TEMPLATE: &str = "<html><head><!-- {INJECTED-USER-START} -->\
        <script>placeholder</script><!-- {INJECTED-USER-END} --></head></html>";

    /// Counts calls and hands out numbered tokens.
    #[derive(Default)]
    struct CountingIssuer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenIssuer for CountingIssuer {
        async fn issue_token(&self, _: &Principal) -> Result<SessionToken, TokenError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SessionToken::new(format!("token-{n}")))
        }
    }

    struct FailingIssuer;

    #[async_trait]
    impl TokenIssuer for FailingIssuer {
        async fn issue_token(&self, principal: &Principal) -> Result<SessionToken, TokenError> {
            Err(TokenError::IssuanceFailed {
                principal: principal.to_string(),
                reason: "issuer offline".into(),
            })
        }
    }

    #[derive(Default)]
    struct CountingPrefs {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PreferencesSource for CountingPrefs {
        fn name(&self) -> &str {
            "counting"
        }

        async fn preferences(&self, _: &Principal) -> Result<Preferences, PreferencesError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Preferences::new())
        }
    }

    struct BrokenPrefs;

    #[async_trait]
    impl PreferencesSource for BrokenPrefs {
        fn name(&self) -> &str {
            "broken"
        }

        async fn preferences(&self, _: &Principal) -> Result<Preferences, PreferencesError> {
            Err(PreferencesError::Unavailable("store offline".into()))
        }
    }

    fn state() -> SharedState {
        let resolver = Arc::new(BasicAuthResolver::new().with_user("alice", "pw"));
        Arc::new(GatewayState::new(resolver, Arc::new(TokenService::default())))
    }

    async fn install(
        state: &SharedState,
        template: &'static str,
        issuer: Arc<dyn TokenIssuer>,
        preferences: Arc<dyn PreferencesSource>,
    ) {
        state
            .install(UiServices {
                template: Template::new(template),
                composer: Composer::new(),
                issuer,
                preferences,
            })
            .await;
    }

    fn get(uri: &str, user: Option<(&str, &str)>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some((name, password)) = user {
            let encoded = STANDARD.encode(format!("{name}:{password}"));
            builder = builder.header(header::AUTHORIZATION, format!("Basic {encoded}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn send(state: &SharedState, req: Request<Body>) -> (StatusCode, HeaderMap, String) {
        let response = build_router(state.clone()).oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    fn injected_token(body: &str) -> String {
        let start = body.find("uiAuth = \"").unwrap() + "uiAuth = \"".len();
        let end = body[start..].find('"').unwrap();
        body[start..start + end].to_string()
    }

    #[tokio::test]
    async fn unauthenticated_root_redirects_without_side_effects() {
        let state = state();
        let issuer = Arc::new(CountingIssuer::default());
        let prefs = Arc::new(CountingPrefs::default());
        install(&state, TEMPLATE, issuer.clone(), prefs.clone()).await;

        let (status, headers, body) = send(&state, get("/", None)).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(headers[header::LOCATION], "/index.html");
        assert!(body.is_empty());
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(prefs.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unauthenticated_index_gets_the_fallback_payload() {
        let state = state();
        let issuer = Arc::new(CountingIssuer::default());
        let prefs = Arc::new(CountingPrefs::default());
        install(&state, TEMPLATE, issuer.clone(), prefs.clone()).await;

        for user in [None, Some(("alice", "wrong"))] {
            let (status, headers, body) = send(&state, get("/index.html", user)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(headers[header::CONTENT_TYPE], HTML_CONTENT_TYPE);
            assert!(headers.get(header::WWW_AUTHENTICATE).is_none());
            assert_eq!(body, frontend::NOT_READY_HTML);
        }
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(prefs.calls.load(Ordering::SeqCst), 0);
        assert_eq!(state.audit().entries_by_outcome(AuditOutcome::Denied).len(), 2);
    }

    #[tokio::test]
    async fn readiness_is_checked_before_the_principal() {
        let state = state();
        let (status, _, body) = send(&state, get("/index.html", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, frontend::NOT_READY_HTML);
        // Not installed: the resolver was never consulted.
        assert_eq!(state.audit().count(), 0);
    }

    #[tokio::test]
    async fn authenticated_index_is_composed() {
        let state = state();
        let issuer = Arc::new(CountingIssuer::default());
        let prefs = InMemoryPreferences::new();
        let alice = Principal::new("alice").unwrap();
        prefs.set_value(&alice, "theme", json!("dark")).await;
        install(&state, TEMPLATE, issuer.clone(), Arc::new(prefs)).await;

        let (status, headers, body) = send(&state, get("/index.html", Some(("alice", "pw")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], HTML_CONTENT_TYPE);
        assert_eq!(headers[header::CACHE_CONTROL], "no-store");
        assert_eq!(
            headers[header::CONTENT_LENGTH].to_str().unwrap(),
            body.len().to_string()
        );
        assert_eq!(
            body,
            "<html><head>\n<script>\n\
             var uiUser = \"alice\",\n    uiAuth = \"token-0\";\n\
             var userPrefs = {\"theme\":\"dark\"};\n\
             console.log(\"Logging in as user \\u003ealice\\u003c\");\n\
             </script>\n\n</head></html>"
        );
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn authenticated_root_serves_the_index() {
        let state = state();
        install(
            &state,
            TEMPLATE,
            Arc::new(CountingIssuer::default()),
            Arc::new(CountingPrefs::default()),
        )
        .await;

        let (status, _, body) = send(&state, get("/", Some(("alice", "pw")))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("var uiUser = \"alice\""));
    }

    #[tokio::test]
    async fn each_request_gets_a_fresh_token() {
        let state = state();
        let issuer: Arc<dyn TokenIssuer> = Arc::new(TokenService::default());
        install(&state, TEMPLATE, issuer, Arc::new(CountingPrefs::default())).await;

        let (_, _, first) = send(&state, get("/index.html", Some(("alice", "pw")))).await;
        let (_, _, second) = send(&state, get("/index.html", Some(("alice", "pw")))).await;
        assert_ne!(injected_token(&first), injected_token(&second));
    }

    #[tokio::test]
    async fn preferences_failure_is_a_bare_500() {
        let state = state();
        install(
            &state,
            TEMPLATE,
            Arc::new(CountingIssuer::default()),
            Arc::new(BrokenPrefs),
        )
        .await;

        let (status, _, body) = send(&state, get("/index.html", Some(("alice", "pw")))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn malformed_template_is_a_bare_500() {
        let state = state();
        let issuer = Arc::new(CountingIssuer::default());
        let prefs = Arc::new(CountingPrefs::default());
        install(
            &state,
            "<html><!-- {INJECTED-USER-START} --> no end marker</html>",
            issuer.clone(),
            prefs.clone(),
        )
        .await;

        let (status, _, body) = send(&state, get("/index.html", Some(("alice", "pw")))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_empty());
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(prefs.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn issuance_failure_is_a_bare_500() {
        let state = state();
        let prefs = Arc::new(CountingPrefs::default());
        install(&state, TEMPLATE, Arc::new(FailingIssuer), prefs.clone()).await;

        let (status, _, body) = send(&state, get("/index.html", Some(("alice", "pw")))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_empty());
        assert_eq!(prefs.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn not_ready_page_served_before_install() {
        let state = state();
        let (status, headers, body) = send(&state, get("/index.html", Some(("alice", "pw")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], HTML_CONTENT_TYPE);
        assert_eq!(body, frontend::NOT_READY_HTML);
        assert_eq!(state.sessions().active_count(), 0);
    }

    #[tokio::test]
    async fn custom_not_ready_page_and_index_path() {
        let resolver = Arc::new(BasicAuthResolver::new().with_user("alice", "pw"));
        let state = Arc::new(
            GatewayState::new(resolver, Arc::new(TokenService::default()))
                .with_index_path("/ui/main.html")
                .with_not_ready_page("<p>later</p>"),
        );

        let (status, headers, _) = send(&state, get("/", None)).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(headers[header::LOCATION], "/ui/main.html");

        let (status, _, body) = send(&state, get("/ui/main.html", Some(("alice", "pw")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<p>later</p>");

        let (status, _, body) = send(&state, get("/ui/main.html", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<p>later</p>");
    }

    #[tokio::test]
    async fn compose_index_issues_exactly_one_token() {
        let issuer = Arc::new(CountingIssuer::default());
        let services = UiServices {
            template: Template::new(TEMPLATE),
            composer: Composer::new().with_delimiters("", ""),
            issuer: issuer.clone(),
            preferences: Arc::new(CountingPrefs::default()),
        };
        let alice = Principal::new("alice").unwrap();

        let page = compose_index(&services, &alice).await.unwrap();
        let bytes = page.into_bytes().await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("token-0"));
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
    }
}
