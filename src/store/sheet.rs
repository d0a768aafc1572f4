//! Spreadsheet-as-database adapter.
//!
//! The service exposes a shared sheet as a row endpoint but documents no
//! single update or delete contract, so both operations walk an ordered list
//! of named request encodings and keep the first one the service accepts.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use url::Url;

use super::{
    normalize_search, require_id, stamp_new, DeleteOutcome, InsertReceipt, StoreError, StoreKind,
    UpdateMethod, VisitorStore,
};
use crate::models::visitor::{timestamp_token, Visitor, REDACTED_NAME};
use crate::models::{HeardVia, YesNo};

pub struct SheetStore {
    client: Client,
    endpoint: Url,
}

/// Editable columns of a row, without the id or creation time.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RowFields<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
    address: &'a str,
    how_did_you_hear: HeardVia,
    how_did_you_hear_other: &'a str,
    is_first_visit: YesNo,
    wants_contact: YesNo,
    prayer_request: &'a str,
    #[serde(rename = "updated_at")]
    updated_at: &'a str,
}

#[derive(Serialize)]
struct SoftDeleteFields<'a> {
    deleted: bool,
    deleted_at: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct WithId<'a, T> {
    id: &'a str,
    #[serde(flatten)]
    fields: &'a T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpdateStrategy {
    PatchWithId,
    PatchWithPath,
    PutWithId,
}

impl UpdateStrategy {
    const ORDER: [UpdateStrategy; 3] = [
        UpdateStrategy::PatchWithId,
        UpdateStrategy::PatchWithPath,
        UpdateStrategy::PutWithId,
    ];

    fn name(self) -> &'static str {
        match self {
            UpdateStrategy::PatchWithId => "patch_with_id",
            UpdateStrategy::PatchWithPath => "patch_with_path",
            UpdateStrategy::PutWithId => "put_with_id",
        }
    }

    fn method(self) -> UpdateMethod {
        match self {
            UpdateStrategy::PatchWithId => UpdateMethod::PatchWithId,
            UpdateStrategy::PatchWithPath => UpdateMethod::PatchWithPath,
            UpdateStrategy::PutWithId => UpdateMethod::PutWithId,
        }
    }

    fn request(self, store: &SheetStore, id: &str, fields: &RowFields<'_>) -> RequestBuilder {
        let with_id = WithId { id, fields };
        match self {
            UpdateStrategy::PatchWithId => store.client.patch(store.endpoint.clone()).json(&with_id),
            UpdateStrategy::PatchWithPath => store.client.patch(store.id_path(id)).json(fields),
            UpdateStrategy::PutWithId => store.client.put(store.endpoint.clone()).json(&with_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeleteStrategy {
    BodyId,
    QueryId,
    PathId,
    SoftPatch,
    SoftPut,
}

impl DeleteStrategy {
    const ORDER: [DeleteStrategy; 5] = [
        DeleteStrategy::BodyId,
        DeleteStrategy::QueryId,
        DeleteStrategy::PathId,
        DeleteStrategy::SoftPatch,
        DeleteStrategy::SoftPut,
    ];

    fn name(self) -> &'static str {
        match self {
            DeleteStrategy::BodyId => "body_id",
            DeleteStrategy::QueryId => "query_id",
            DeleteStrategy::PathId => "path_id",
            DeleteStrategy::SoftPatch => "soft_patch",
            DeleteStrategy::SoftPut => "soft_put",
        }
    }

    fn outcome(self) -> DeleteOutcome {
        match self {
            DeleteStrategy::BodyId | DeleteStrategy::QueryId | DeleteStrategy::PathId => {
                DeleteOutcome::HardDelete
            }
            DeleteStrategy::SoftPatch | DeleteStrategy::SoftPut => DeleteOutcome::SoftDelete,
        }
    }

    fn request(self, store: &SheetStore, id: &str, deleted_at: &str) -> RequestBuilder {
        let soft = SoftDeleteFields {
            deleted: true,
            deleted_at,
            name: REDACTED_NAME,
        };
        let soft = WithId { id, fields: &soft };
        match self {
            DeleteStrategy::BodyId => store
                .client
                .delete(store.endpoint.clone())
                .json(&serde_json::json!({ "id": id })),
            DeleteStrategy::QueryId => store.client.delete(store.id_query(id)),
            DeleteStrategy::PathId => store.client.delete(store.id_path(id)),
            DeleteStrategy::SoftPatch => store.client.patch(store.endpoint.clone()).json(&soft),
            DeleteStrategy::SoftPut => store.client.put(store.endpoint.clone()).json(&soft),
        }
    }
}

impl SheetStore {
    pub fn new(endpoint: Url) -> Result<Self, StoreError> {
        // One request per call, no idle connections kept between requests.
        let client = Client::builder().pool_max_idle_per_host(0).build()?;
        Ok(Self { client, endpoint })
    }

    /// `<endpoint>/id/<id>`
    fn id_path(&self, id: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("id").push(id);
        }
        url
    }

    /// `<endpoint>?id=<id>`
    fn id_query(&self, id: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("id", id);
        url
    }

    async fn send(&self, strategy: &'static str, request: RequestBuilder) -> Result<Response, StoreError> {
        let request = request.build()?;
        let method = request.method().clone();
        let target = request.url().path().to_string();

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%method, %target, strategy, "spreadsheet request failed: {e}");
                return Err(e.into());
            }
        };

        let status = response.status();
        tracing::info!(%method, %target, strategy, status = status.as_u16(), "spreadsheet request");

        if status.is_success() {
            Ok(response)
        } else {
            Err(StoreError::Status(status))
        }
    }
}

#[async_trait]
impl VisitorStore for SheetStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Sheet
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<Visitor>, StoreError> {
        let response = self
            .send("list", self.client.get(self.endpoint.clone()))
            .await?;
        let rows: Vec<Visitor> = response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))?;

        let needle = normalize_search(search).unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter(|v| !v.deleted && v.matches(&needle))
            .collect())
    }

    async fn insert(&self, visitor: Visitor) -> Result<InsertReceipt, StoreError> {
        let visitor = stamp_new(visitor, Utc::now())?;

        self.send("insert", self.client.post(self.endpoint.clone()).json(&visitor))
            .await?;

        tracing::info!(id = %visitor.id, "visitor appended to spreadsheet");
        Ok(InsertReceipt {
            id: visitor.id,
            persisted: true,
        })
    }

    async fn update(&self, mut visitor: Visitor) -> Result<UpdateMethod, StoreError> {
        visitor.id = require_id(&visitor.id)?.to_string();
        let updated_at = timestamp_token(Utc::now());
        let fields = RowFields {
            name: visitor.name.trim(),
            email: &visitor.email,
            phone: &visitor.phone,
            address: &visitor.address,
            how_did_you_hear: visitor.how_did_you_hear,
            how_did_you_hear_other: &visitor.how_did_you_hear_other,
            is_first_visit: visitor.is_first_visit,
            wants_contact: visitor.wants_contact,
            prayer_request: &visitor.prayer_request,
            updated_at: &updated_at,
        };
        if fields.name.is_empty() {
            return Err(StoreError::Invalid("Name is required"));
        }

        let mut last_error = None;
        for strategy in UpdateStrategy::ORDER {
            let request = strategy.request(self, &visitor.id, &fields);
            match self.send(strategy.name(), request).await {
                Ok(_) => {
                    tracing::info!(id = %visitor.id, strategy = strategy.name(), "spreadsheet update accepted");
                    return Ok(strategy.method());
                }
                Err(e) => last_error = Some(e),
            }
        }

        tracing::error!(id = %visitor.id, "every spreadsheet update strategy failed");
        Err(last_error.unwrap_or(StoreError::Invalid("no update strategy available")))
    }

    async fn delete(&self, id: &str) -> Result<DeleteOutcome, StoreError> {
        let id = require_id(id)?;
        let deleted_at = timestamp_token(Utc::now());

        for strategy in DeleteStrategy::ORDER {
            let request = strategy.request(self, id, &deleted_at);
            if self.send(strategy.name(), request).await.is_ok() {
                tracing::info!(id, strategy = strategy.name(), "spreadsheet delete accepted");
                return Ok(strategy.outcome());
            }
        }

        tracing::warn!(id, "every delete strategy failed, reporting a simulated delete");
        Ok(DeleteOutcome::SimulatedDelete)
    }
}
