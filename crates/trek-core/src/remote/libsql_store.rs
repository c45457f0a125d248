//! Remote store on a libSQL database, usually a Turso server.

use std::sync::Arc;

use libsql::{params, Connection};
use tokio::sync::Mutex;

use super::{
    generate_document_id, payload_created_at, BatchOp, Document, FieldFilter, Fields,
    RemoteStore,
};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::util::unix_millis_now;

/// Document collections stored in the `documents` table.
#[derive(Clone)]
pub struct LibSqlRemoteStore {
    db: Arc<Mutex<Database>>,
}

impl LibSqlRemoteStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }
}

/// Connection failures against a remote server surface as transient errors.
fn remote_error(db: &Database, error: libsql::Error) -> Error {
    if db.is_remote() {
        Error::Remote(error.to_string())
    } else {
        Error::LibSql(error)
    }
}

async fn insert_document(conn: &Connection, collection: &str, data: Fields) -> Result<Document> {
    let document = Document {
        id: generate_document_id(),
        created_at: payload_created_at(&data).unwrap_or_else(unix_millis_now),
        data,
        updated_at: None,
    };
    let payload = serde_json::to_string(&document.data)?;
    conn.execute(
        "INSERT INTO documents (collection, id, data, created_at, updated_at)
         VALUES (?, ?, ?, ?, NULL)",
        params![
            collection,
            document.id.as_str(),
            payload,
            document.created_at
        ],
    )
    .await?;
    Ok(document)
}

async fn patch_document(
    conn: &Connection,
    collection: &str,
    id: &str,
    mut patch: Fields,
) -> Result<()> {
    let updated_at = patch
        .remove("updated_at")
        .and_then(|value| value.as_i64())
        .unwrap_or_else(unix_millis_now);
    let payload = serde_json::to_string(&patch)?;
    let affected = conn
        .execute(
            "UPDATE documents SET data = json_patch(data, ?), updated_at = ?
             WHERE collection = ? AND id = ?",
            params![payload, updated_at, collection, id],
        )
        .await?;
    if affected == 0 {
        return Err(Error::NotFound(format!("document {collection}/{id}")));
    }
    Ok(())
}

async fn delete_document(conn: &Connection, collection: &str, id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM documents WHERE collection = ? AND id = ?",
        params![collection, id],
    )
    .await?;
    Ok(())
}

async fn apply(conn: &Connection, op: BatchOp, added: &mut Vec<String>) -> Result<()> {
    match op {
        BatchOp::Add { collection, data } => {
            added.push(insert_document(conn, &collection, data).await?.id);
        }
        BatchOp::Update {
            collection,
            id,
            patch,
        } => patch_document(conn, &collection, &id, patch).await?,
        BatchOp::Delete { collection, id } => delete_document(conn, &collection, &id).await?,
    }
    Ok(())
}

fn parse_row(row: &libsql::Row) -> Result<Document> {
    let raw: String = row.get(1)?;
    let data = match serde_json::from_str(&raw)? {
        serde_json::Value::Object(fields) => fields,
        _ => Fields::new(),
    };
    Ok(Document {
        id: row.get(0)?,
        data,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
    })
}

impl RemoteStore for LibSqlRemoteStore {
    async fn add(&self, collection: &str, data: Fields) -> Result<Document> {
        let db = self.db.lock().await;
        insert_document(db.connection(), collection, data)
            .await
            .map_err(|e| match e {
                Error::LibSql(e) => remote_error(&db, e),
                other => other,
            })
    }

    async fn query(
        &self,
        collection: &str,
        filter: Option<FieldFilter<'_>>,
    ) -> Result<Vec<Document>> {
        let db = self.db.lock().await;
        let conn = db.connection();
        let rows = match filter {
            Some(filter) => {
                conn.query(
                    "SELECT id, data, created_at, updated_at FROM documents
                     WHERE collection = ? AND json_extract(data, '$.' || ?) = ?
                     ORDER BY created_at DESC, id ASC",
                    params![collection, filter.field, filter.value],
                )
                .await
            }
            None => {
                conn.query(
                    "SELECT id, data, created_at, updated_at FROM documents
                     WHERE collection = ?
                     ORDER BY created_at DESC, id ASC",
                    params![collection],
                )
                .await
            }
        };
        let mut rows = rows.map_err(|e| remote_error(&db, e))?;

        let mut documents = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| remote_error(&db, e))? {
            documents.push(parse_row(&row)?);
        }
        Ok(documents)
    }

    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<()> {
        let db = self.db.lock().await;
        patch_document(db.connection(), collection, id, patch)
            .await
            .map_err(|e| match e {
                Error::LibSql(e) => remote_error(&db, e),
                other => other,
            })
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let db = self.db.lock().await;
        delete_document(db.connection(), collection, id)
            .await
            .map_err(|e| match e {
                Error::LibSql(e) => remote_error(&db, e),
                other => other,
            })
    }

    async fn commit(&self, batch: Vec<BatchOp>) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let conn = db.connection();
        conn.execute("BEGIN TRANSACTION", ())
            .await
            .map_err(|e| remote_error(&db, e))?;

        let mut added = Vec::new();
        for op in batch {
            if let Err(e) = apply(conn, op, &mut added).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(match e {
                    Error::LibSql(e) => remote_error(&db, e),
                    other => other,
                });
            }
        }

        if let Err(e) = conn.execute("COMMIT", ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(remote_error(&db, e));
        }

        tracing::debug!("Committed batch with {} new documents", added.len());
        Ok(added)
    }
}
