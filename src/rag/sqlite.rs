//! SQLite-backed vector store.
//!
//! Records live in one table scoped by collection name; similarity search is
//! brute-force cosine over the stored embeddings.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{
    cosine_distance, rank_hits, Metadata, MetadataFilter, QueryHit, StoredDocument,
    VectorRecord, VectorStore,
};
use crate::core::config::VectorStoreConfig;
use crate::core::errors::RagError;

const DB_FILE_NAME: &str = "sentris.db";

pub struct SqliteVectorStore {
    pool: SqlitePool,
    collection: String,
    db_path: PathBuf,
}

fn store_error(err: sqlx::Error) -> RagError {
    RagError::retrieval("vector_store", err)
}

impl SqliteVectorStore {
    pub async fn open(config: &VectorStoreConfig) -> Result<Self, RagError> {
        tokio::fs::create_dir_all(&config.persist_directory).await?;
        let db_path = config.persist_directory.join(DB_FILE_NAME);
        Self::with_path(db_path, &config.collection_name).await
    }

    pub async fn with_path(db_path: PathBuf, collection: &str) -> Result<Self, RagError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(store_error)?;

        let store = Self {
            pool,
            collection: collection.to_string(),
            db_path,
        };
        store.init_schema().await?;
        tracing::info!(
            "Opened vector store {} (collection {})",
            store.db_path.display(),
            store.collection
        );
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn init_schema(&self) -> Result<(), RagError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS vector_records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                record_id TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now')),
                UNIQUE (collection, record_id)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_vector_records_collection
             ON vector_records(collection)",
        )
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_metadata(row: &sqlx::sqlite::SqliteRow) -> Metadata {
        let metadata_str: String = row.get("metadata");
        match serde_json::from_str::<Value>(&metadata_str) {
            Ok(Value::Object(map)) => map,
            _ => Metadata::new(),
        }
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> StoredDocument {
        StoredDocument {
            id: row.get("record_id"),
            text: row.get("content"),
            metadata: Self::row_metadata(row),
        }
    }

    async fn fetch_collection(
        &self,
        with_embedding: bool,
    ) -> Result<Vec<sqlx::sqlite::SqliteRow>, RagError> {
        let sql = if with_embedding {
            "SELECT record_id, content, metadata, embedding
             FROM vector_records WHERE collection = ?1 ORDER BY seq"
        } else {
            "SELECT record_id, content, metadata
             FROM vector_records WHERE collection = ?1 ORDER BY seq"
        };
        sqlx::query(sql)
            .bind(&self.collection)
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), RagError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(store_error)?;

        for record in &records {
            let blob = Self::serialize_embedding(&record.vector);
            let metadata_str =
                serde_json::to_string(&record.metadata).map_err(RagError::internal)?;

            sqlx::query(
                "INSERT INTO vector_records (collection, record_id, content, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(collection, record_id) DO UPDATE SET
                    content = excluded.content,
                    metadata = excluded.metadata,
                    embedding = excluded.embedding",
            )
            .bind(&self.collection)
            .bind(&record.id)
            .bind(&record.text)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        }

        tx.commit().await.map_err(store_error)?;
        tracing::debug!("Upserted {} records into {}", records.len(), self.collection);
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>, RagError> {
        let rows = self.fetch_collection(true).await?;

        let hits: Vec<QueryHit> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row
                    .get::<Option<Vec<u8>>, _>("embedding")
                    .unwrap_or_default();
                if embedding_bytes.is_empty() {
                    return None;
                }
                let metadata = Self::row_metadata(row);
                if !filter.map(|f| f.matches(&metadata)).unwrap_or(true) {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);

                Some(QueryHit {
                    id: row.get("record_id"),
                    text: row.get("content"),
                    metadata,
                    distance: cosine_distance(vector, &stored),
                })
            })
            .collect();

        Ok(rank_hits(hits, k))
    }

    async fn delete(&self, filter: &MetadataFilter) -> Result<usize, RagError> {
        let ids: Vec<String> = self
            .find(Some(filter), None)
            .await?
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        self.delete_ids(&ids).await
    }

    async fn delete_ids(&self, ids: &[String]) -> Result<usize, RagError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(store_error)?;
        let mut removed = 0usize;
        for id in ids {
            let result =
                sqlx::query("DELETE FROM vector_records WHERE collection = ?1 AND record_id = ?2")
                    .bind(&self.collection)
                    .bind(id)
                    .execute(&mut *tx)
                    .await
                    .map_err(store_error)?;
            removed += result.rows_affected() as usize;
        }
        tx.commit().await.map_err(store_error)?;

        Ok(removed)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredDocument>, RagError> {
        let row = sqlx::query(
            "SELECT record_id, content, metadata
             FROM vector_records
             WHERE collection = ?1 AND record_id = ?2",
        )
        .bind(&self.collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(row.as_ref().map(Self::row_to_document))
    }

    async fn find(
        &self,
        filter: Option<&MetadataFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredDocument>, RagError> {
        let rows = self.fetch_collection(false).await?;
        Ok(rows
            .iter()
            .map(Self::row_to_document)
            .filter(|doc| filter.map(|f| f.matches(&doc.metadata)).unwrap_or(true))
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn count(&self) -> Result<usize, RagError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM vector_records WHERE collection = ?1")
                .bind(&self.collection)
                .fetch_one(&self.pool)
                .await
                .map_err(store_error)?;

        Ok(count as usize)
    }
}
