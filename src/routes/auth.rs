use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::session::{password_matches, SessionCodec};
use crate::{AppState, LOGIN_PAGE};

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout).post(logout))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(form), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let Some(expected) = &state.admin_password else {
        return Err(AppError::MissingSecret);
    };

    if !password_matches(expected, &form.password) {
        tracing::warn!("admin login rejected");
        return Err(AppError::Unauthorized("Invalid password"));
    }

    let cookie = state
        .sessions
        .encode(Utc::now())
        .ok_or_else(|| AppError::Internal("failed to sign session cookie".to_string()))?;

    tracing::info!("admin logged in");
    Ok((jar.add(cookie), Json(json!({ "success": true }))))
}

async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        StatusCode::FOUND,
        jar.add(SessionCodec::clear()),
        [(header::LOCATION, LOGIN_PAGE)],
    )
}
