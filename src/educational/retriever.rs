//! Semantic retrieval of educational content per learning goal or topic.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::difficulty::DifficultyLevel;
use crate::core::errors::RagError;
use crate::rag::{Metadata, MetadataFilter, QueryHit, SemanticSearch};

const EDUCATIONAL: &str = "educational";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub difficulty: DifficultyLevel,
    pub topic: String,
    pub learning_goal: String,
    pub prerequisites: Vec<String>,
    pub resources: Vec<String>,
    pub concept: Option<String>,
    pub objective: Option<String>,
    pub source_file: Option<String>,
}

impl Default for ContentMetadata {
    fn default() -> Self {
        Self {
            difficulty: DifficultyLevel::Intermediate,
            topic: String::new(),
            learning_goal: String::new(),
            prerequisites: Vec::new(),
            resources: Vec::new(),
            concept: None,
            objective: None,
            source_file: None,
        }
    }
}

fn string_field(metadata: &Metadata, key: &str) -> Option<String> {
    metadata
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

// Lists may be stored as JSON arrays or as comma-separated strings.
fn list_field(metadata: &Metadata, key: &str) -> Vec<String> {
    match metadata.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.to_string())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect(),
        _ => Vec::new(),
    }
}

impl ContentMetadata {
    pub fn from_store(metadata: &Metadata, learning_goal: &str) -> Self {
        Self {
            difficulty: DifficultyLevel::from_label(
                metadata.get("difficulty").and_then(|v| v.as_str()),
            ),
            topic: string_field(metadata, "topic").unwrap_or_default(),
            learning_goal: learning_goal.to_string(),
            prerequisites: list_field(metadata, "prerequisites"),
            resources: list_field(metadata, "resources"),
            concept: string_field(metadata, "concept"),
            objective: string_field(metadata, "objective"),
            source_file: string_field(metadata, "source_file"),
        }
    }
}

/// A retrieved piece of content tagged with the goal it was retrieved for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub text: String,
    pub metadata: ContentMetadata,
    /// `1 - distance`, clamped to `[0, 1]`
    pub relevance: f64,
}

impl ContentItem {
    fn from_hit(hit: QueryHit, learning_goal: &str) -> Self {
        Self {
            metadata: ContentMetadata::from_store(&hit.metadata, learning_goal),
            relevance: (1.0 - hit.distance as f64).clamp(0.0, 1.0),
            text: hit.text,
        }
    }
}

pub struct ContentRetriever {
    search: Arc<dyn SemanticSearch>,
    results_per_query: usize,
}

impl ContentRetriever {
    pub fn new(search: Arc<dyn SemanticSearch>, results_per_query: usize) -> Self {
        Self {
            search,
            results_per_query: results_per_query.max(1),
        }
    }

    async fn query(
        &self,
        query: &str,
        filter: &MetadataFilter,
        learning_goal: &str,
    ) -> Result<Vec<ContentItem>, RagError> {
        let hits = self
            .search
            .search(query, Some(filter), self.results_per_query)
            .await
            .map_err(|e| e.into_retrieval("knowledge_base"))?;
        Ok(hits
            .into_iter()
            .map(|hit| ContentItem::from_hit(hit, learning_goal))
            .collect())
    }

    /// One query per goal, in goal order. Items matching several goals appear
    /// once per goal.
    pub async fn gather(
        &self,
        goals: &[String],
        subject: &str,
    ) -> Result<Vec<ContentItem>, RagError> {
        let filter = MetadataFilter::new()
            .eq("content_type", EDUCATIONAL)
            .eq("subject", subject);

        let mut content = Vec::new();
        for goal in goals {
            let query = format!("content for {} in {}", goal, subject);
            let items = self.query(&query, &filter, goal).await?;
            tracing::debug!("Goal {:?} retrieved {} items", goal, items.len());
            content.extend(items);
        }
        Ok(content)
    }

    /// Content about `topic` at one difficulty category; items are tagged
    /// with the topic as their goal.
    pub async fn gather_topic(
        &self,
        topic: &str,
        difficulty: DifficultyLevel,
    ) -> Result<Vec<ContentItem>, RagError> {
        let filter = MetadataFilter::new()
            .eq("content_type", EDUCATIONAL)
            .eq("difficulty", difficulty.as_str());
        let query = format!("educational content about {}", topic);
        self.query(&query, &filter, topic).await
    }
}
