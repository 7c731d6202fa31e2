//! Embedding-backed knowledge base over a [`VectorStore`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::store::{Metadata, MetadataFilter, QueryHit, StoredDocument, VectorRecord, VectorStore};
use crate::core::config::EmbeddingsConfig;
use crate::core::errors::RagError;
use crate::llm::Embedder;

/// Semantic lookup used by the educational components.
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<QueryHit>, RagError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeBaseStats {
    pub total_documents: usize,
    pub distance_metric: String,
    pub embedding_dim: Option<usize>,
    pub store: String,
}

pub struct KnowledgeBase {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    batch_size: usize,
    // 0 until the first embedding has been seen
    embedding_dim: AtomicUsize,
}

impl KnowledgeBase {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: &EmbeddingsConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            batch_size: config.batch_size.max(1),
            embedding_dim: AtomicUsize::new(0),
        }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    async fn embed_batched(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = self.embedder.embed(batch).await?;
            if embedded.len() != batch.len() {
                return Err(RagError::provider(
                    self.embedder.name(),
                    None,
                    format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        embedded.len()
                    ),
                ));
            }
            vectors.extend(embedded);
        }
        if let Some(first) = vectors.first() {
            self.embedding_dim.store(first.len(), Ordering::Relaxed);
        }
        Ok(vectors)
    }

    /// Embeds and stores `texts`; ids default to `doc_{i}`.
    pub async fn add_documents(
        &self,
        texts: Vec<String>,
        metadata: Vec<Metadata>,
        ids: Option<Vec<String>>,
    ) -> Result<Vec<String>, RagError> {
        if texts.is_empty() {
            return Err(RagError::EmptyInput("no documents to add".to_string()));
        }
        if metadata.len() != texts.len() {
            return Err(RagError::EmptyInput(format!(
                "metadata count {} does not match document count {}",
                metadata.len(),
                texts.len()
            )));
        }
        let ids = match ids {
            Some(ids) if ids.len() != texts.len() => {
                return Err(RagError::EmptyInput(format!(
                    "id count {} does not match document count {}",
                    ids.len(),
                    texts.len()
                )));
            }
            Some(ids) => ids,
            None => (0..texts.len()).map(|i| format!("doc_{}", i)).collect(),
        };

        let vectors = self.embed_batched(&texts).await?;
        let records: Vec<VectorRecord> = ids
            .iter()
            .zip(texts)
            .zip(metadata)
            .zip(vectors)
            .map(|(((id, text), metadata), vector)| VectorRecord {
                id: id.clone(),
                vector,
                text,
                metadata,
            })
            .collect();

        let count = records.len();
        self.store.upsert(records).await?;
        tracing::info!("Added {} documents to the knowledge base", count);
        Ok(ids)
    }

    pub async fn search(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<QueryHit>, RagError> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyInput("search query is empty".to_string()));
        }
        let vectors = self.embed_batched(&[query.to_string()]).await?;
        let Some(vector) = vectors.into_iter().next() else {
            return Ok(Vec::new());
        };
        let hits = self.store.query(&vector, limit, filter).await?;
        tracing::debug!("Query {:?} matched {} documents", query, hits.len());
        Ok(hits)
    }

    pub async fn update_document(
        &self,
        id: &str,
        text: String,
        metadata: Metadata,
    ) -> Result<(), RagError> {
        let vectors = self.embed_batched(std::slice::from_ref(&text)).await?;
        let Some(vector) = vectors.into_iter().next() else {
            return Err(RagError::internal("embedder returned no vector"));
        };
        self.store
            .upsert(vec![VectorRecord {
                id: id.to_string(),
                vector,
                text,
                metadata,
            }])
            .await
    }

    pub async fn delete_documents(&self, ids: &[String]) -> Result<usize, RagError> {
        self.store.delete_ids(ids).await
    }

    pub async fn delete_where(&self, filter: &MetadataFilter) -> Result<usize, RagError> {
        if filter.is_empty() {
            return Err(RagError::EmptyInput(
                "refusing to delete with an empty filter".to_string(),
            ));
        }
        self.store.delete(filter).await
    }

    pub async fn get_document(&self, id: &str) -> Result<Option<StoredDocument>, RagError> {
        self.store.get(id).await
    }

    pub async fn document_chunks(
        &self,
        filter: Option<&MetadataFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredDocument>, RagError> {
        self.store.find(filter, limit).await
    }

    pub async fn stats(&self) -> Result<KnowledgeBaseStats, RagError> {
        let dim = self.embedding_dim.load(Ordering::Relaxed);
        Ok(KnowledgeBaseStats {
            total_documents: self.store.count().await?,
            distance_metric: "cosine".to_string(),
            embedding_dim: (dim > 0).then_some(dim),
            store: self.store.name().to_string(),
        })
    }
}

#[async_trait]
impl SemanticSearch for KnowledgeBase {
    async fn search(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
        limit: usize,
    ) -> Result<Vec<QueryHit>, RagError> {
        KnowledgeBase::search(self, query, filter, limit).await
    }
}
