//! `portico preview`: Compose the index page offline.
//!
//! Uses the configured preferences backend and a throwaway token service,
//! so the printed token is never valid against a running gateway.

use portico_compose::{Composer, Template};
use portico_config::AppConfig;
use portico_core::Principal;
use portico_gateway::{UiServices, index::compose_index};
use portico_security::TokenService;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn run(
    user: &str,
    template_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let principal = Principal::new(user).ok_or("User name must not be blank")?;

    let template = match template_path {
        Some(path) => Template::load(&path)?,
        None => portico_gateway::load_template(&config.ui)?,
    };

    let services = UiServices {
        template,
        composer: Composer::new().with_chunk_size(config.ui.chunk_size),
        issuer: Arc::new(TokenService::new(1)),
        preferences: portico_gateway::open_preferences(&config.preferences).await?,
    };

    let page = compose_index(&services, &principal).await?;
    let body = page.into_bytes().await?;
    std::io::stdout().write_all(&body)?;

    Ok(())
}
