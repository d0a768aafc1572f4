use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::{
    normalize_search, require_id, stamp_new, DeleteOutcome, InsertReceipt, StoreError, StoreKind,
    UpdateMethod, VisitorStore,
};
use crate::models::visitor::{timestamp_token, Visitor};

/// Visitors kept in a single SQLite table.
#[derive(Clone)]
pub struct TableStore {
    pool: SqlitePool,
}

impl TableStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Maps a primary key collision to `Conflict`.
fn conflict_or(id: &str, error: sqlx::Error) -> StoreError {
    match error.as_database_error() {
        Some(db) if db.is_unique_violation() => StoreError::Conflict(id.to_string()),
        _ => StoreError::Database(error),
    }
}

#[async_trait]
impl VisitorStore for TableStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Table
    }

    /// Filtered in Rust: SQLite's `LIKE` folds ASCII case only.
    async fn list(&self, search: Option<&str>) -> Result<Vec<Visitor>, StoreError> {
        let visitors: Vec<Visitor> =
            sqlx::query_as("SELECT * FROM visitors ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;

        let needle = normalize_search(search).unwrap_or_default();
        Ok(visitors.into_iter().filter(|v| v.matches(&needle)).collect())
    }

    async fn insert(&self, visitor: Visitor) -> Result<InsertReceipt, StoreError> {
        let visitor = stamp_new(visitor, Utc::now())?;

        sqlx::query(
            r#"
            INSERT INTO visitors (
                id, name, email, phone, address, how_did_you_hear, how_did_you_hear_other,
                is_first_visit, wants_contact, prayer_request, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&visitor.id)
        .bind(&visitor.name)
        .bind(&visitor.email)
        .bind(&visitor.phone)
        .bind(&visitor.address)
        .bind(visitor.how_did_you_hear)
        .bind(&visitor.how_did_you_hear_other)
        .bind(visitor.is_first_visit)
        .bind(visitor.wants_contact)
        .bind(&visitor.prayer_request)
        .bind(&visitor.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or(&visitor.id, e))?;

        tracing::info!(id = %visitor.id, "visitor inserted into table");
        Ok(InsertReceipt {
            id: visitor.id,
            persisted: true,
        })
    }

    async fn update(&self, mut visitor: Visitor) -> Result<UpdateMethod, StoreError> {
        visitor.id = require_id(&visitor.id)?.to_string();
        let name = visitor.name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("Name is required"));
        }

        let result = sqlx::query(
            r#"
            UPDATE visitors SET
                name = ?, email = ?, phone = ?, address = ?, how_did_you_hear = ?,
                how_did_you_hear_other = ?, is_first_visit = ?, wants_contact = ?,
                prayer_request = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(&visitor.email)
        .bind(&visitor.phone)
        .bind(&visitor.address)
        .bind(visitor.how_did_you_hear)
        .bind(&visitor.how_did_you_hear_other)
        .bind(visitor.is_first_visit)
        .bind(visitor.wants_contact)
        .bind(&visitor.prayer_request)
        .bind(timestamp_token(Utc::now()))
        .bind(&visitor.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(visitor.id));
        }

        tracing::info!(id = %visitor.id, "visitor updated in table");
        Ok(UpdateMethod::Sql)
    }

    async fn delete(&self, id: &str) -> Result<DeleteOutcome, StoreError> {
        let id = require_id(id)?;

        let result = sqlx::query("DELETE FROM visitors WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!(id, rows = result.rows_affected(), "visitor deleted from table");
        Ok(DeleteOutcome::HardDelete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> TableStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::migrate(&pool).await.unwrap();
        TableStore::new(pool)
    }

    fn named(id: &str, name: &str) -> Visitor {
        Visitor {
            id: id.into(),
            name: name.into(),
            ..Visitor::default()
        }
    }

    #[tokio::test]
    async fn search_folds_non_ascii_case() {
        let store = store().await;
        store.insert(named("1", "Élodie")).await.unwrap();
        store.insert(named("2", "Zoë 王")).await.unwrap();

        let found = store.list(Some("élodie")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Élodie");

        assert_eq!(store.list(Some("ZOË")).await.unwrap().len(), 1);
        assert_eq!(store.list(Some("50%_")).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn duplicate_id_is_a_conflict() {
        let store = store().await;
        store.insert(named("dup", "First")).await.unwrap();

        let err = store.insert(named("dup", "Second")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(id) if id == "dup"));
    }

    #[tokio::test]
    async fn padded_ids_address_the_trimmed_record() {
        let store = store().await;
        store.insert(named("42", "Ann")).await.unwrap();

        store.update(named(" 42 ", "Anna")).await.unwrap();
        assert_eq!(store.list(None).await.unwrap()[0].name, "Anna");

        store.delete(" 42 ").await.unwrap();
        assert!(store.list(None).await.unwrap().is_empty());
    }
}
