pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod session;
pub mod store;

/// Static admin login page the dashboard and logout redirect to.
pub const LOGIN_PAGE: &str = "/admin.html";

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::{routing::get, Router};
use secrecy::SecretString;
use tower::ServiceBuilder;
use tower_http::{
    set_header::SetResponseHeaderLayer,
    trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Config;
use crate::session::SessionCodec;
use crate::store::VisitorStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VisitorStore>,
    pub sessions: SessionCodec,
    pub admin_password: Option<SecretString>,
}

impl AppState {
    pub fn new(config: &Config, store: Arc<dyn VisitorStore>) -> Self {
        Self {
            store,
            sessions: SessionCodec::from_config(config),
            admin_password: config.admin_password.clone(),
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Build the full Axum application router.
///
/// The store is selected and migrated by the caller (see `store::connect`).
/// Responses that set no cache policy of their own get `no-store`.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::auth::router())
        .merge(routes::visitors::router())
        .merge(routes::stats::router())
        .merge(routes::dashboard::router())
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                )),
        )
        .with_state(state)
}
