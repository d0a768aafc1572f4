//! Backing store adapters for visitor records.
//!
//! Exactly one adapter is selected at startup: the spreadsheet service when
//! `SHEETDB_URL` is set, otherwise the SQLite table when `DATABASE_URL` is set,
//! otherwise a stub that simulates success so the UI stays usable.

pub mod sheet;
pub mod stub;
pub mod table;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::db;
use crate::models::visitor::{timestamp_token, Visitor};

pub use sheet::SheetStore;
pub use stub::StubStore;
pub use table::TableStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Invalid(&'static str),

    #[error("visitor {0} not found")]
    NotFound(String),

    #[error("visitor {0} already exists")]
    Conflict(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("spreadsheet service returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Sheet,
    Table,
    Stub,
}

impl StoreKind {
    pub fn is_configured(self) -> bool {
        self != StoreKind::Stub
    }
}

/// Result of a successful insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertReceipt {
    pub id: String,
    /// False when the stub store only pretended to save.
    pub persisted: bool,
}

/// Which update encoding the store accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMethod {
    Sql,
    PatchWithId,
    PatchWithPath,
    PutWithId,
    Simulated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// The row is gone from the store.
    HardDelete,
    /// The row was flagged deleted and its name redacted.
    SoftDelete,
    /// Nothing changed remotely; the caller must ask for manual cleanup.
    SimulatedDelete,
}

#[async_trait]
pub trait VisitorStore: Send + Sync {
    fn kind(&self) -> StoreKind;

    /// Lists visitors, optionally filtered by a case-insensitive substring of
    /// name or email.
    async fn list(&self, search: Option<&str>) -> Result<Vec<Visitor>, StoreError>;

    async fn insert(&self, visitor: Visitor) -> Result<InsertReceipt, StoreError>;

    async fn update(&self, visitor: Visitor) -> Result<UpdateMethod, StoreError>;

    async fn delete(&self, id: &str) -> Result<DeleteOutcome, StoreError>;
}

/// Select the adapter for this process.
pub async fn connect(config: &Config) -> Result<Arc<dyn VisitorStore>, StoreError> {
    if let Some(endpoint) = &config.sheetdb_url {
        tracing::info!("using spreadsheet store");
        return Ok(Arc::new(SheetStore::new(endpoint.clone())?));
    }

    if let Some(database_url) = &config.database_url {
        tracing::info!("using table store at {database_url}");
        let pool = db::init_pool(database_url).await?;
        return Ok(Arc::new(TableStore::new(pool)));
    }

    tracing::warn!("no backing store configured, data operations are simulated");
    Ok(Arc::new(StubStore))
}

/// Normalise a record for insertion: trimmed non-empty name, an id, and a
/// fresh `created_at`.
pub(crate) fn stamp_new(mut visitor: Visitor, now: DateTime<Utc>) -> Result<Visitor, StoreError> {
    visitor.name = visitor.name.trim().to_string();
    if visitor.name.is_empty() {
        return Err(StoreError::Invalid("Name is required"));
    }
    visitor.id = visitor.id.trim().to_string();
    if visitor.id.is_empty() {
        visitor.id = timestamp_token(now);
    }
    visitor.created_at = timestamp_token(now);
    visitor.updated_at = None;
    visitor.deleted = false;
    visitor.deleted_at = None;
    Ok(visitor)
}

/// The trimmed id, which is what every store addresses records by.
pub(crate) fn require_id(id: &str) -> Result<&str, StoreError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(StoreError::Invalid("Visitor ID is required"));
    }
    Ok(id)
}

/// Search terms are trimmed and lowercased; blank means no filter.
pub(crate) fn normalize_search(search: Option<&str>) -> Option<String> {
    search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}
