use async_trait::async_trait;
use chrono::Utc;

use super::{
    require_id, stamp_new, DeleteOutcome, InsertReceipt, StoreError, StoreKind, UpdateMethod,
    VisitorStore,
};
use crate::models::Visitor;

/// Used when no store is configured. Reads are empty and writes report
/// simulated success without keeping anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubStore;

#[async_trait]
impl VisitorStore for StubStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Stub
    }

    async fn list(&self, _search: Option<&str>) -> Result<Vec<Visitor>, StoreError> {
        Ok(Vec::new())
    }

    async fn insert(&self, visitor: Visitor) -> Result<InsertReceipt, StoreError> {
        let visitor = stamp_new(visitor, Utc::now())?;
        tracing::info!(id = %visitor.id, "simulated insert, no store configured");
        Ok(InsertReceipt {
            id: visitor.id,
            persisted: false,
        })
    }

    async fn update(&self, visitor: Visitor) -> Result<UpdateMethod, StoreError> {
        let id = require_id(&visitor.id)?;
        tracing::info!(id, "simulated update, no store configured");
        Ok(UpdateMethod::Simulated)
    }

    async fn delete(&self, id: &str) -> Result<DeleteOutcome, StoreError> {
        let id = require_id(id)?;
        tracing::info!(id, "simulated delete, no store configured");
        Ok(DeleteOutcome::SimulatedDelete)
    }
}
