use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::Visitor;
use crate::session::AdminSession;
use crate::store::DeleteOutcome;
use crate::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    search: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/visitors",
        get(list_visitors)
            .post(create_visitor)
            .put(update_visitor)
            .delete(delete_visitor),
    )
}

fn require_name(visitor: &Visitor) -> Result<(), AppError> {
    if visitor.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    Ok(())
}

async fn list_visitors(
    _admin: AdminSession,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let visitors = state.store.list(query.search.as_deref()).await?;

    Ok((
        [(header::CACHE_CONTROL, "private, max-age=30")],
        Json(visitors),
    ))
}

/// Public sign-in form submission.
async fn create_visitor(
    State(state): State<AppState>,
    WithRejection(Json(visitor), _): WithRejection<Json<Visitor>, AppError>,
) -> Result<Response, AppError> {
    require_name(&visitor)?;

    let receipt = state.store.insert(visitor).await?;

    if receipt.persisted {
        Ok((
            StatusCode::CREATED,
            Json(json!({
                "success": true,
                "message": "Visitor data saved successfully",
                "id": receipt.id,
            })),
        )
            .into_response())
    } else {
        Ok(Json(json!({
            "success": true,
            "message": "Form submitted successfully (Database not configured)",
            "note": "To persist data, set SHEETDB_URL or DATABASE_URL",
            "id": receipt.id,
        }))
        .into_response())
    }
}

async fn update_visitor(
    _admin: AdminSession,
    State(state): State<AppState>,
    WithRejection(Json(mut visitor), _): WithRejection<Json<Visitor>, AppError>,
) -> Result<Json<Value>, AppError> {
    visitor.id = visitor.id.trim().to_string();
    if visitor.id.is_empty() {
        return Err(AppError::Validation("Visitor ID is required".to_string()));
    }
    require_name(&visitor)?;

    let method = state.store.update(visitor).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Visitor data updated successfully",
        "method": method,
    })))
}

async fn delete_visitor(
    _admin: AdminSession,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<DeleteQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    let id = query
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Visitor ID is required".to_string()))?;

    let outcome = state.store.delete(&id).await?;
    let message = match outcome {
        DeleteOutcome::HardDelete => "Visitor data deleted successfully",
        DeleteOutcome::SoftDelete => "Visitor data marked as deleted (soft delete)",
        DeleteOutcome::SimulatedDelete => {
            "Delete operation simulated, the record must be removed from the store manually"
        }
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "method": outcome,
        "notice": outcome.notice(),
        "record_id": id,
    })))
}
