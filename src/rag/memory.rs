//! In-process vector store. Nothing is persisted.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{
    cosine_distance, rank_hits, MetadataFilter, QueryHit, StoredDocument, VectorRecord,
    VectorStore,
};
use crate::core::errors::RagError;

#[derive(Default)]
pub struct InMemoryVectorStore {
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_document(record: &VectorRecord) -> StoredDocument {
    StoredDocument {
        id: record.id.clone(),
        text: record.text.clone(),
        metadata: record.metadata.clone(),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), RagError> {
        let mut stored = self.records.write().await;
        for record in records {
            match stored.iter_mut().find(|existing| existing.id == record.id) {
                Some(existing) => *existing = record,
                None => stored.push(record),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>, RagError> {
        let stored = self.records.read().await;
        let hits = stored
            .iter()
            .filter(|record| filter.map(|f| f.matches(&record.metadata)).unwrap_or(true))
            .map(|record| QueryHit {
                id: record.id.clone(),
                text: record.text.clone(),
                metadata: record.metadata.clone(),
                distance: cosine_distance(vector, &record.vector),
            })
            .collect();
        Ok(rank_hits(hits, k))
    }

    async fn delete(&self, filter: &MetadataFilter) -> Result<usize, RagError> {
        let mut stored = self.records.write().await;
        let before = stored.len();
        stored.retain(|record| !filter.matches(&record.metadata));
        Ok(before - stored.len())
    }

    async fn delete_ids(&self, ids: &[String]) -> Result<usize, RagError> {
        let mut stored = self.records.write().await;
        let before = stored.len();
        stored.retain(|record| !ids.contains(&record.id));
        Ok(before - stored.len())
    }

    async fn get(&self, id: &str) -> Result<Option<StoredDocument>, RagError> {
        let stored = self.records.read().await;
        Ok(stored.iter().find(|r| r.id == id).map(to_document))
    }

    async fn find(
        &self,
        filter: Option<&MetadataFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredDocument>, RagError> {
        let stored = self.records.read().await;
        Ok(stored
            .iter()
            .filter(|record| filter.map(|f| f.matches(&record.metadata)).unwrap_or(true))
            .take(limit.unwrap_or(usize::MAX))
            .map(to_document)
            .collect())
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.records.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, vector: Vec<f32>, subject: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            vector,
            text: format!("text of {id}"),
            metadata: json!({ "subject": subject })
                .as_object()
                .cloned()
                .unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn query_ranks_by_distance_and_filters() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(vec![
                record("a", vec![1.0, 0.0], "math"),
                record("b", vec![0.7, 0.7], "math"),
                record("c", vec![1.0, 0.1], "art"),
            ])
            .await
            .unwrap();

        let hits = store.query(&[1.0, 0.0], 10, None).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);

        let math = MetadataFilter::new().eq("subject", "math");
        let hits = store.query(&[1.0, 0.0], 1, Some(&math)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn upsert_replaces_and_delete_removes() {
        let store = InMemoryVectorStore::new();
        store.upsert(vec![record("a", vec![1.0], "math")]).await.unwrap();
        store.upsert(vec![record("a", vec![1.0], "art")]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get("a").await.unwrap().unwrap().metadata["subject"], "art");

        store.upsert(vec![record("b", vec![1.0], "art")]).await.unwrap();
        let removed = store
            .delete(&MetadataFilter::new().eq("subject", "art"))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_keeps_insertion_order() {
        let store = InMemoryVectorStore::new();
        store
            .upsert(vec![
                record("x", vec![1.0], "math"),
                record("y", vec![1.0], "art"),
                record("z", vec![1.0], "math"),
            ])
            .await
            .unwrap();

        let docs = store
            .find(Some(&MetadataFilter::new().eq("subject", "math")), None)
            .await
            .unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "z"]);

        assert_eq!(store.delete_ids(&["y".to_string()]).await.unwrap(), 1);
        assert_eq!(store.find(None, Some(1)).await.unwrap().len(), 1);
    }
}
