//! In-process remote store with latency and failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::{
    generate_document_id, matches_filter, payload_created_at, BatchOp, Document, FieldFilter,
    Fields, RemoteStore,
};
use crate::error::{Error, Result};
use crate::util::unix_millis_now;

type Collections = HashMap<String, HashMap<String, Document>>;

/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub add: usize,
    pub query: usize,
    pub update: usize,
    pub delete: usize,
    pub commit: usize,
}

#[derive(Debug, Default)]
struct Counters {
    add: AtomicUsize,
    query: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
    commit: AtomicUsize,
}

/// Remote store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    collections: Mutex<Collections>,
    latency: Option<Duration>,
    unreachable: AtomicBool,
    fail_next_commit: AtomicBool,
    counters: Counters,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before touching the data.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every call fail as if the network were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Reject the next batch commit without applying any of it.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    pub fn call_counts(&self) -> CallCounts {
        CallCounts {
            add: self.counters.add.load(Ordering::SeqCst),
            query: self.counters.query.load(Ordering::SeqCst),
            update: self.counters.update.load(Ordering::SeqCst),
            delete: self.counters.delete.load(Ordering::SeqCst),
            commit: self.counters.commit.load(Ordering::SeqCst),
        }
    }

    /// Every document of a collection, newest first.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        let collections = self.lock();
        sorted(collections.get(collection), None)
    }

    /// Store a document directly, bypassing latency and counters.
    pub fn seed(&self, collection: &str, id: impl Into<String>, data: Fields) -> Document {
        let id = id.into();
        let document = Document {
            created_at: payload_created_at(&data).unwrap_or_else(unix_millis_now),
            id: id.clone(),
            data,
            updated_at: None,
        };
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id, document.clone());
        document
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, counter: &AtomicUsize) -> Result<()> {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(Error::Remote("remote store unreachable".to_string()));
        }
        Ok(())
    }
}

fn sorted(
    documents: Option<&HashMap<String, Document>>,
    filter: Option<FieldFilter<'_>>,
) -> Vec<Document> {
    let mut documents: Vec<Document> = documents
        .into_iter()
        .flat_map(HashMap::values)
        .filter(|document| matches_filter(&document.data, filter))
        .cloned()
        .collect();
    documents.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    documents
}

fn insert(collections: &mut Collections, collection: &str, data: Fields) -> Document {
    let id = generate_document_id();
    let document = Document {
        created_at: payload_created_at(&data).unwrap_or_else(unix_millis_now),
        id: id.clone(),
        data,
        updated_at: None,
    };
    collections
        .entry(collection.to_string())
        .or_default()
        .insert(id, document.clone());
    document
}

fn merge(collections: &mut Collections, collection: &str, id: &str, patch: Fields) -> Result<()> {
    let document = collections
        .get_mut(collection)
        .and_then(|documents| documents.get_mut(id))
        .ok_or_else(|| Error::NotFound(format!("document {collection}/{id}")))?;
    for (key, value) in patch {
        if key == "updated_at" {
            document.updated_at = value.as_i64();
        } else {
            document.data.insert(key, value);
        }
    }
    if document.updated_at.is_none() {
        document.updated_at = Some(unix_millis_now());
    }
    Ok(())
}

fn remove(collections: &mut Collections, collection: &str, id: &str) {
    if let Some(documents) = collections.get_mut(collection) {
        documents.remove(id);
    }
}

impl RemoteStore for MemoryRemoteStore {
    async fn add(&self, collection: &str, data: Fields) -> Result<Document> {
        self.enter(&self.counters.add).await?;
        Ok(insert(&mut self.lock(), collection, data))
    }

    async fn query(
        &self,
        collection: &str,
        filter: Option<FieldFilter<'_>>,
    ) -> Result<Vec<Document>> {
        self.enter(&self.counters.query).await?;
        Ok(sorted(self.lock().get(collection), filter))
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<()> {
        self.enter(&self.counters.update).await?;
        merge(&mut self.lock(), collection, id, patch)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.enter(&self.counters.delete).await?;
        remove(&mut self.lock(), collection, id);
        Ok(())
    }

    async fn commit(&self, batch: Vec<BatchOp>) -> Result<Vec<String>> {
        self.enter(&self.counters.commit).await?;
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(Error::Remote("batch commit rejected".to_string()));
        }

        let mut collections = self.lock();
        let mut staged = collections.clone();
        let mut added = Vec::new();
        for op in batch {
            match op {
                BatchOp::Add { collection, data } => {
                    added.push(insert(&mut staged, &collection, data).id);
                }
                BatchOp::Update {
                    collection,
                    id,
                    patch,
                } => merge(&mut staged, &collection, &id, patch)?,
                BatchOp::Delete { collection, id } => remove(&mut staged, &collection, &id),
            }
        }
        *collections = staged;
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(fields) => fields,
            _ => unreachable!("test payloads are objects"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_query_filters_and_orders_newest_first() {
        let store = MemoryRemoteStore::new();
        store.seed("c", "a", fields(json!({"travel_id": "t1", "created_at": 1})));
        store.seed("c", "b", fields(json!({"travel_id": "t1", "created_at": 2})));
        store.seed("c", "x", fields(json!({"travel_id": "t2", "created_at": 3})));

        let docs = store
            .query(
                "c",
                Some(FieldFilter {
                    field: "travel_id",
                    value: "t1",
                }),
            )
            .await
            .unwrap();
        let ids: Vec<_> = docs.iter().map(|doc| doc.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_commit_applies_nothing() {
        let store = MemoryRemoteStore::new();
        let batch = vec![
            BatchOp::Add {
                collection: "c".to_string(),
                data: fields(json!({"name": "one"})),
            },
            BatchOp::Update {
                collection: "c".to_string(),
                id: "missing".to_string(),
                patch: fields(json!({"name": "two"})),
            },
        ];

        assert!(matches!(
            store.commit(batch).await,
            Err(Error::NotFound(_))
        ));
        assert!(store.documents("c").is_empty());

        store.fail_next_commit();
        let add = vec![BatchOp::Add {
            collection: "c".to_string(),
            data: fields(json!({"name": "one"})),
        }];
        assert!(store.commit(add.clone()).await.is_err());
        assert!(store.documents("c").is_empty());

        let ids = store.commit(add).await.unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.documents("c")[0].id, ids[0]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unreachable_store_counts_attempts() {
        let store = MemoryRemoteStore::new();
        store.set_unreachable(true);

        assert!(store.delete("c", "a").await.unwrap_err().is_transient());
        assert!(store.query("c", None).await.is_err());
        assert_eq!(store.call_counts().delete, 1);
        assert_eq!(store.call_counts().query, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_merges_and_stamps() {
        let store = MemoryRemoteStore::new();
        let doc = store
            .add("c", fields(json!({"name": "old", "color": "red"})))
            .await
            .unwrap();

        store
            .update("c", &doc.id, fields(json!({"name": "new", "updated_at": 99})))
            .await
            .unwrap();

        let stored = &store.documents("c")[0];
        assert_eq!(stored.data["name"], "new");
        assert_eq!(stored.data["color"], "red");
        assert_eq!(stored.updated_at, Some(99));
    }
}
