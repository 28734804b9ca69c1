//! HTTP gateway for Portico.
//!
//! Serves the UI front door:
//! - `GET /` and the index page, composed per request with a fresh session token
//! - `GET /websocket?token=…`, the real-time channel opened by that page
//! - `GET /health`
//! - embedded client assets under `/static/`
//!
//! Built on Axum for high performance async HTTP.

pub mod frontend;
pub mod index;
pub mod websocket;

use axum::{Router, extract::State, response::Json, routing::get};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{error, info};

use portico_compose::{Composer, Template};
use portico_core::{PreferencesError, PreferencesSource, TokenIssuer};
use portico_preferences::{FilePreferences, InMemoryPreferences};
use portico_security::{AuditLogger, PrincipalResolver, TokenService};

/// Everything needed to compose the index page.
///
/// Installed into [`GatewayState`] once the backing services are up; until
/// then the index serves the not-ready page.
pub struct UiServices {
    pub template: Template,
    pub composer: Composer,
    pub issuer: Arc<dyn TokenIssuer>,
    pub preferences: Arc<dyn PreferencesSource>,
}

/// Shared application state for the gateway.
pub struct GatewayState {
    resolver: Arc<dyn PrincipalResolver>,
    sessions: Arc<TokenService>,
    audit: AuditLogger,
    index_path: String,
    not_ready: Bytes,
    revoke_on_close: bool,
    services: RwLock<Option<Arc<UiServices>>>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// State with no UI services installed yet.
    ///
    /// `sessions` validates channel tokens; install it as the page issuer
    /// too, or channels will reject every page's token.
    pub fn new(resolver: Arc<dyn PrincipalResolver>, sessions: Arc<TokenService>) -> Self {
        Self {
            resolver,
            sessions,
            audit: AuditLogger::tracing(),
            index_path: "/index.html".into(),
            not_ready: Bytes::from_static(frontend::NOT_READY_HTML.as_bytes()),
            revoke_on_close: true,
            services: RwLock::new(None),
        }
    }

    pub fn with_index_path(mut self, path: impl Into<String>) -> Self {
        self.index_path = path.into();
        self
    }

    pub fn with_not_ready_page(mut self, page: impl Into<Bytes>) -> Self {
        self.not_ready = page.into();
        self
    }

    pub fn with_revoke_on_close(mut self, revoke: bool) -> Self {
        self.revoke_on_close = revoke;
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    /// Make the composed index available.
    pub async fn install(&self, services: UiServices) {
        *self.services.write().await = Some(Arc::new(services));
        info!("UI services installed");
    }

    /// The installed services, if any. The lock is released on return.
    pub async fn services(&self) -> Option<Arc<UiServices>> {
        self.services.read().await.clone()
    }

    pub async fn is_ready(&self) -> bool {
        self.services.read().await.is_some()
    }

    pub fn index_path(&self) -> &str {
        &self.index_path
    }

    pub fn sessions(&self) -> &TokenService {
        &self.sessions
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let index_path = state.index_path.clone();
    Router::new()
        .route("/", get(index::root_handler))
        .route(&index_path, get(index::index_handler))
        .route("/websocket", get(websocket::websocket_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .merge(frontend::frontend_router())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Serve the gateway on an already bound listener.
pub async fn serve(listener: TcpListener, state: SharedState) -> std::io::Result<()> {
    axum::serve(listener, build_router(state)).await
}

/// Open the preferences backend selected by `preferences.backend`.
pub async fn open_preferences(
    config: &portico_config::PreferencesConfig,
) -> Result<Arc<dyn PreferencesSource>, PreferencesError> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryPreferences::new())),
        "file" => Ok(Arc::new(FilePreferences::open(config.dir_or_default()).await?)),
        other => Err(PreferencesError::Unavailable(format!(
            "unknown preferences backend '{other}'"
        ))),
    }
}

/// Load the page template from config, or the embedded default.
pub fn load_template(
    config: &portico_config::UiConfig,
) -> Result<Template, portico_core::TemplateError> {
    match &config.template_path {
        Some(path) => Template::load(path),
        None => {
            let template = Template::new(frontend::INDEX_TEMPLATE);
            template.validate()?;
            Ok(template)
        }
    }
}

/// Load the not-ready page from config, or the embedded default.
pub fn load_not_ready_page(config: &portico_config::UiConfig) -> std::io::Result<Bytes> {
    match &config.not_ready_path {
        Some(path) => std::fs::read(path).map(Bytes::from),
        None => Ok(Bytes::from_static(frontend::NOT_READY_HTML.as_bytes())),
    }
}

/// Start the gateway HTTP server.
///
/// The listener comes up before the preferences backend; requests arriving
/// in between get the not-ready page.
pub async fn start(config: portico_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let host = config.gateway.host.clone();
    let port = config.gateway.port;
    let addr = format!("{host}:{port}");

    let resolver = portico_security::from_config(&config.auth)?;
    let sessions = Arc::new(TokenService::from_config(&config.tokens));
    let template = load_template(&config.ui)?;
    let not_ready = load_not_ready_page(&config.ui)?;
    let composer = Composer::new().with_chunk_size(config.ui.chunk_size);

    let state = Arc::new(
        GatewayState::new(resolver, sessions.clone())
            .with_index_path(config.ui.index_path.clone())
            .with_not_ready_page(not_ready)
            .with_revoke_on_close(config.tokens.revoke_on_close),
    );

    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, auth = %config.auth.mode, "Gateway starting");

    let install_state = state.clone();
    let preferences_config = config.preferences.clone();
    tokio::spawn(async move {
        match open_preferences(&preferences_config).await {
            Ok(preferences) => {
                info!(backend = preferences.name(), "Preferences backend ready");
                install_state
                    .install(UiServices {
                        template,
                        composer,
                        issuer: sessions,
                        preferences,
                    })
                    .await;
            }
            Err(e) => {
                error!(error = %e, "Preferences backend failed; UI stays in not-ready mode");
            }
        }
    });

    serve(listener, state).await?;
    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    ready: bool,
    active_sessions: usize,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        ready: state.is_ready().await,
        active_sessions: state.sessions.active_count(),
    })
}
