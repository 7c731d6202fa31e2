//! Multi-engine web search with caching, filtering and request pacing.

use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Serialize;

use super::cache::{CacheKey, SearchCache};
use super::filter::SearchFilter;
use super::transport::{HttpSearchTransport, SearchEngine, SearchHit, SearchTransport};
use crate::core::config::WebSearchConfig;
use crate::core::errors::RagError;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub engine: SearchEngine,
    pub results: Vec<SearchHit>,
    pub total_results: usize,
}

pub struct WebSearch {
    transport: Arc<dyn SearchTransport>,
    cache: SearchCache,
    limiter: Option<DefaultDirectRateLimiter>,
    default_engine: SearchEngine,
    max_results: usize,
}

impl WebSearch {
    pub fn from_config(config: &WebSearchConfig) -> Result<Self, RagError> {
        let transport = Arc::new(HttpSearchTransport::from_config(config)?);
        Self::with_transport(transport, config)
    }

    pub fn with_transport(
        transport: Arc<dyn SearchTransport>,
        config: &WebSearchConfig,
    ) -> Result<Self, RagError> {
        let default_engine: SearchEngine = config.default_engine.parse()?;
        let secs = config.rate_limit_secs;
        if !secs.is_finite() || secs < 0.0 {
            return Err(RagError::config(
                "web_search.rate_limit_secs",
                format!("must be a finite, non-negative number of seconds (got {})", secs),
            ));
        }
        let period = Duration::try_from_secs_f64(secs.abs())
            .map_err(|e| RagError::config("web_search.rate_limit_secs", e.to_string()))?;
        // A zero period disables pacing.
        let limiter = Quota::with_period(period).map(RateLimiter::direct);

        Ok(Self {
            transport,
            cache: SearchCache::new(Duration::from_secs(config.cache_duration)),
            limiter,
            default_engine,
            max_results: config.max_results.max(1),
        })
    }

    async fn pace(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    /// Searches `engine` (default engine when `None`) for at most
    /// `min(num_results, max_results)` hits. Raw hits are cached; `filter`
    /// is applied to cached and fresh hits alike.
    pub async fn search(
        &self,
        query: &str,
        engine: Option<&str>,
        num_results: Option<usize>,
        filter: Option<&SearchFilter>,
    ) -> Result<SearchResponse, RagError> {
        if query.trim().is_empty() {
            return Err(RagError::EmptyInput("search query is empty".to_string()));
        }
        let engine = match engine {
            Some(name) => name.parse()?,
            None => self.default_engine,
        };
        let num_results = num_results
            .unwrap_or(self.max_results)
            .min(self.max_results);

        let key = CacheKey {
            engine,
            query: query.to_string(),
            num_results,
        };

        let hits = match self.cache.get(&key) {
            Some(hits) => {
                tracing::debug!("Search cache hit for {:?} on {}", query, engine);
                hits
            }
            None => {
                self.pace().await;
                let hits = self.transport.search(query, engine, num_results).await?;
                tracing::info!("{} returned {} results for {:?}", engine, hits.len(), query);
                self.cache.insert(key, hits.clone());
                hits
            }
        };

        let results = match filter {
            Some(filter) => filter.apply(hits)?,
            None => hits,
        };

        Ok(SearchResponse {
            query: query.to_string(),
            engine,
            total_results: results.len(),
            results,
        })
    }

    /// Search, then fetch page text for every hit. A failed fetch leaves
    /// that hit's `content` empty instead of failing the whole call.
    pub async fn search_and_enrich(
        &self,
        query: &str,
        engine: Option<&str>,
        num_results: Option<usize>,
        filter: Option<&SearchFilter>,
    ) -> Result<SearchResponse, RagError> {
        let mut response = self.search(query, engine, num_results, filter).await?;

        for hit in response.results.iter_mut() {
            self.pace().await;
            match self.transport.fetch_page(&hit.url).await {
                Ok(text) if !text.trim().is_empty() => hit.content = Some(text),
                Ok(_) => {
                    tracing::debug!("No readable content at {}", hit.url);
                }
                Err(e) => {
                    tracing::warn!("Failed to enrich result {}: {}", hit.url, e);
                }
            }
        }

        Ok(response)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }
}
