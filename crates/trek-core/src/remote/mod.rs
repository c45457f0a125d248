//! Remote document store: per-user collections of JSON documents.
//!
//! Documents live under `users/{owner}/{collection}`. Field values are plain
//! JSON; the store assigns 20-character ids and creation timestamps.

mod libsql_store;
mod memory;

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

pub use libsql_store::LibSqlRemoteStore;
pub use memory::{CallCounts, MemoryRemoteStore};

use crate::error::{Error, Result};
use crate::models::{Entity, EntityKind, REMOTE_ID_LEN};

/// JSON object payload of a document.
pub type Fields = Map<String, Value>;

/// A stored document as returned by queries.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
    /// Server-side creation timestamp (Unix ms)
    pub created_at: i64,
    /// Server-side timestamp of the last update (Unix ms)
    pub updated_at: Option<i64>,
}

/// Equality filter on a single top-level field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldFilter<'a> {
    pub field: &'a str,
    pub value: &'a str,
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Add { collection: String, data: Fields },
    Update { collection: String, id: String, patch: Fields },
    Delete { collection: String, id: String },
}

/// Document store the sync engine writes to when online.
///
/// Every call may fail with a transient error. `commit` is all-or-nothing.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Insert a document and return it with its assigned id.
    async fn add(&self, collection: &str, data: Fields) -> Result<Document>;

    /// Documents of a collection, newest first, optionally filtered.
    async fn query(&self, collection: &str, filter: Option<FieldFilter<'_>>)
        -> Result<Vec<Document>>;

    /// Merge `patch` into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<()>;

    /// Delete a document; deleting a missing document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Apply a batch atomically. Returns the ids assigned to `Add` ops, in order.
    async fn commit(&self, batch: Vec<BatchOp>) -> Result<Vec<String>>;
}

/// Collection path of one entity kind for one user.
pub fn collection_path(owner_id: &str, kind: EntityKind) -> String {
    format!("users/{owner_id}/{}", kind.collection())
}

/// Fresh document id with the store's fixed length.
pub fn generate_document_id() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(REMOTE_ID_LEN)
        .collect()
}

/// Document payload of an entity.
///
/// Identity and sync bookkeeping never travel to the store. The client
/// creation time is kept only when `keep_created_at` is set, which lets a
/// later sync recognize records it already pushed.
pub fn encode_entity<T: Entity>(entity: &T, keep_created_at: bool) -> Result<Fields> {
    let mut fields = into_fields(entity)?;
    fields.remove("id");
    fields.remove("sync_state");
    fields.remove("updated_at");
    if !keep_created_at {
        fields.remove("created_at");
    }
    Ok(fields)
}

/// Patch payload, stamped with the update time.
pub fn encode_patch<P: Serialize>(patch: &P, updated_at: i64) -> Result<Fields> {
    let mut fields = into_fields(patch)?;
    fields.insert("updated_at".to_string(), Value::from(updated_at));
    Ok(fields)
}

/// Rebuild an entity from a document. Results are always `RemoteSynced`.
pub fn decode_entity<T: Entity>(document: Document) -> Result<T> {
    let Document {
        id,
        mut data,
        created_at,
        updated_at,
    } = document;

    data.insert("id".to_string(), Value::String(id));
    data.insert(
        "sync_state".to_string(),
        Value::String("remote_synced".to_string()),
    );
    if !data.get("created_at").is_some_and(Value::is_i64) {
        data.insert("created_at".to_string(), Value::from(created_at));
    }
    match updated_at {
        Some(updated_at) => {
            data.insert("updated_at".to_string(), Value::from(updated_at));
        }
        None => {
            data.remove("updated_at");
        }
    }

    Ok(serde_json::from_value(Value::Object(data))?)
}

fn into_fields<V: Serialize>(value: &V) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::Remote(format!(
            "document payload must be an object, got {other}"
        ))),
    }
}

/// Creation time carried in a document payload, if any.
fn payload_created_at(data: &Fields) -> Option<i64> {
    data.get("created_at").and_then(Value::as_i64)
}

/// Whether a document field equals the filter value.
fn matches_filter(data: &Fields, filter: Option<FieldFilter<'_>>) -> bool {
    filter.is_none_or(|filter| {
        data.get(filter.field)
            .and_then(Value::as_str)
            .is_some_and(|value| value == filter.value)
    })
}
