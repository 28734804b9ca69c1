//! Embedded static frontend assets.
//!
//! The page template, the not-ready page and the client assets from
//! `assets/` are compiled into the binary using `include_str!`, enabling
//! single-binary deployment. Config may point at files on disk instead.

use axum::{
    Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

/// Default page template. Carries exactly one injection marker pair.
pub const INDEX_TEMPLATE: &str = include_str!("../assets/index.html");

/// Served while the UI services are still starting.
pub const NOT_READY_HTML: &str = include_str!("../assets/not-ready.html");

const STYLE_CSS: &str = include_str!("../assets/style.css");
const APP_JS: &str = include_str!("../assets/app.js");

/// Build a router that serves the embedded client assets.
pub fn frontend_router() -> Router {
    Router::new()
        .route("/static/style.css", get(css_handler))
        .route("/static/app.js", get(js_handler))
}

async fn css_handler() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLE_CSS,
    )
        .into_response()
}

async fn js_handler() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        APP_JS,
    )
        .into_response()
}
