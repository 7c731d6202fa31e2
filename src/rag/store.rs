//! Vector store trait and the record types shared by its backends.
//!
//! Implementations: `InMemoryVectorStore` (tests, ephemeral sessions) and
//! `SqliteVectorStore` (persistent, brute-force cosine search).

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::RagError;

pub type Metadata = Map<String, Value>;

/// A record to upsert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: Metadata,
}

/// A stored record without its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

/// Result of a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryHit {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    /// Cosine distance (lower = closer).
    pub distance: f32,
}

/// Conjunction of metadata equality constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter(BTreeMap<String, Value>);

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.0.iter().all(|(key, expected)| {
            metadata
                .get(key)
                .map(|actual| values_equal(actual, expected))
                .unwrap_or(false)
        })
    }
}

// 1 and 1.0 compare equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    fn name(&self) -> &str;

    /// Insert or replace records by id.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), RagError>;

    /// The `k` nearest records, ascending by distance.
    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<QueryHit>, RagError>;

    /// Delete every record matching `filter`; returns the number removed.
    async fn delete(&self, filter: &MetadataFilter) -> Result<usize, RagError>;

    async fn delete_ids(&self, ids: &[String]) -> Result<usize, RagError>;

    async fn get(&self, id: &str) -> Result<Option<StoredDocument>, RagError>;

    /// Records matching `filter` in insertion order.
    async fn find(
        &self,
        filter: Option<&MetadataFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<StoredDocument>, RagError>;

    async fn count(&self) -> Result<usize, RagError>;
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - cosine_similarity(a, b)
}

/// Sorts hits ascending by distance and keeps the first `k`.
pub(crate) fn rank_hits(mut hits: Vec<QueryHit>, k: usize) -> Vec<QueryHit> {
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: Value) -> Metadata {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn filter_requires_every_pair() {
        let filter = MetadataFilter::new()
            .eq("content_type", "educational")
            .eq("subject", "biology");

        assert!(filter.matches(&metadata(json!({
            "content_type": "educational",
            "subject": "biology",
            "difficulty": "beginner"
        }))));
        assert!(!filter.matches(&metadata(json!({ "content_type": "educational" }))));
        assert!(MetadataFilter::new().matches(&Metadata::new()));
    }

    #[test]
    fn numeric_filter_values_compare_by_value() {
        let filter = MetadataFilter::new().eq("chunk_index", 1);
        assert!(filter.matches(&metadata(json!({ "chunk_index": 1.0 }))));
    }

    #[test]
    fn cosine_distance_bounds() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert!((cosine_distance(&[], &[]) - 1.0).abs() < 1e-6);
    }
}
