use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use serde::Deserialize;

use crate::dashboard::{
    DashboardState, ModalForm, ModalMode, Notice, NoticeLevel, Reconcile, RowView, NOTICE_TTL,
};
use crate::error::{store_status, AppError};
use crate::models::Visitor;
use crate::session::AdminPage;
use crate::store::StoreError;
use crate::AppState;

const DASHBOARD: &str = "/admin/dashboard";

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    search: String,
    rows: Vec<RowView>,
    total: usize,
    notice: Option<Notice>,
    notice_ttl_secs: u64,
    modal: Option<ModalForm>,
    refresh_after_secs: Option<u64>,
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    search: Option<String>,
    edit: Option<String>,
    new: Option<String>,
}

#[derive(Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    id: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(DASHBOARD, get(dashboard))
        .route("/admin/dashboard/add", post(add_visitor))
        .route("/admin/dashboard/edit", post(edit_visitor))
        .route("/admin/dashboard/delete", post(delete_visitor))
}

fn render(view: &DashboardState, reconcile: Option<Reconcile>) -> Result<Html<String>, AppError> {
    let template = DashboardTemplate {
        search: view.search().to_string(),
        rows: view.rows(),
        total: view.visitors().len(),
        notice: view.notice().cloned(),
        notice_ttl_secs: NOTICE_TTL.as_secs(),
        modal: view.modal().cloned(),
        refresh_after_secs: reconcile.map(|r| r.after.as_secs()),
    };
    Ok(Html(template.render()?))
}

async fn load(state: &AppState) -> DashboardState {
    match state.store.list(None).await {
        Ok(visitors) => DashboardState::new(visitors),
        Err(e) => {
            tracing::error!("dashboard failed to load visitors: {e}");
            let mut view = DashboardState::default();
            view.load_failed("Backing store request failed");
            view
        }
    }
}

fn store_message(e: &StoreError) -> String {
    match e {
        StoreError::Invalid(message) => message.to_string(),
        StoreError::NotFound(_) => "找不到此紀錄".to_string(),
        StoreError::Conflict(id) => format!("ID {id} 已存在"),
        _ => "Backing store request failed".to_string(),
    }
}

async fn dashboard(
    _page: AdminPage,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<DashboardQuery>, AppError>,
) -> Result<Html<String>, AppError> {
    let mut view = load(&state).await;

    if let Some(search) = &query.search {
        view.set_search(search);
    }
    if let Some(id) = &query.edit {
        if !view.open_edit(id.trim()) {
            tracing::debug!(id, "edit requested for unknown visitor");
        }
    } else if query.new.is_some() {
        view.open_add(Utc::now());
    }

    render(&view, None)
}

async fn add_visitor(
    _page: AdminPage,
    State(state): State<AppState>,
    WithRejection(Form(visitor), _): WithRejection<Form<Visitor>, AppError>,
) -> Result<Response, AppError> {
    save(&state, ModalForm { mode: ModalMode::Add, visitor }).await
}

async fn edit_visitor(
    _page: AdminPage,
    State(state): State<AppState>,
    WithRejection(Form(visitor), _): WithRejection<Form<Visitor>, AppError>,
) -> Result<Response, AppError> {
    save(&state, ModalForm { mode: ModalMode::Edit, visitor }).await
}

/// Saves the modal form. Success goes back to the list; any failure
/// re-renders the page with the form still open.
async fn save(state: &AppState, form: ModalForm) -> Result<Response, AppError> {
    let (status, notice) = match form.validate() {
        Err(notice) => (StatusCode::BAD_REQUEST, notice),
        Ok(()) => {
            let visitor = form.visitor.clone();
            let saved = match form.mode {
                ModalMode::Add => state.store.insert(visitor).await.map(|_| ()),
                ModalMode::Edit => state.store.update(visitor).await.map(|_| ()),
            };
            match saved {
                Ok(()) => return Ok(Redirect::to(DASHBOARD).into_response()),
                Err(e) => {
                    tracing::error!(id = %form.visitor.id, "dashboard save failed: {e}");
                    (
                        store_status(&e),
                        Notice::new(NoticeLevel::Error, format!("儲存失敗：{}", store_message(&e))),
                    )
                }
            }
        }
    };

    let mut view = load(state).await;
    view.reject_form(form, notice);
    Ok((status, render(&view, None)?).into_response())
}

async fn delete_visitor(
    _page: AdminPage,
    State(state): State<AppState>,
    WithRejection(Form(form), _): WithRejection<Form<DeleteForm>, AppError>,
) -> Result<Response, AppError> {
    let mut view = load(&state).await;
    let id = form.id.trim();

    if !view.begin_delete(id) {
        view.fail_delete(id, "找不到此紀錄");
        return Ok((StatusCode::NOT_FOUND, render(&view, None)?).into_response());
    }

    match state.store.delete(id).await {
        Ok(outcome) => {
            tracing::info!(id, ?outcome, "visitor deleted from dashboard");
            let reconcile = view.finish_delete(id, outcome);
            Ok(render(&view, Some(reconcile))?.into_response())
        }
        Err(e) => {
            tracing::error!(id, "dashboard delete failed: {e}");
            view.fail_delete(id, &store_message(&e));
            Ok((store_status(&e), render(&view, None)?).into_response())
        }
    }
}
