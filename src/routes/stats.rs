use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{QueuePosition, Visitor, VisitorStats};
use crate::AppState;

#[derive(Serialize)]
struct StatsBody<T> {
    #[serde(flatten)]
    counts: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/visitor-stats", get(visitor_stats))
}

/// Counts over the full record set. Store failures answer 500 with the
/// counts computed over nothing.
async fn counts<T, F>(state: &AppState, max_age: &'static str, compute: F) -> Response
where
    T: Serialize,
    F: Fn(&[Visitor], DateTime<Utc>) -> T,
{
    let now = Utc::now();
    let message = (!state.store.kind().is_configured()).then_some("Database not configured");

    match state.store.list(None).await {
        Ok(visitors) => (
            [(header::CACHE_CONTROL, max_age)],
            Json(StatsBody {
                counts: compute(&visitors, now),
                message,
                error: None,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to load visitors for stats: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatsBody {
                    counts: compute(&[], now),
                    message: None,
                    error: Some("Backing store connection failed"),
                }),
            )
                .into_response()
        }
    }
}

async fn stats(State(state): State<AppState>) -> Response {
    counts(&state, "max-age=60", VisitorStats::compute).await
}

async fn visitor_stats(State(state): State<AppState>) -> Response {
    counts(&state, "max-age=30", QueuePosition::compute).await
}
