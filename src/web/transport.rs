use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::config::WebSearchConfig;
use crate::core::errors::RagError;
use crate::rag::extract::html_to_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEngine {
    Google,
    DuckDuckGo,
    Brave,
    Bing,
    Custom,
}

impl SearchEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchEngine::Google => "google",
            SearchEngine::DuckDuckGo => "duckduckgo",
            SearchEngine::Brave => "brave",
            SearchEngine::Bing => "bing",
            SearchEngine::Custom => "custom",
        }
    }
}

impl fmt::Display for SearchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchEngine {
    type Err = RagError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "google" => Ok(SearchEngine::Google),
            "duckduckgo" => Ok(SearchEngine::DuckDuckGo),
            "brave" => Ok(SearchEngine::Brave),
            "bing" => Ok(SearchEngine::Bing),
            "custom" => Ok(SearchEngine::Custom),
            other => Err(RagError::unsupported("search engine", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// Engine that produced the hit
    pub source: String,
    /// Publication date, when the engine reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Page text, filled in by enrichment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
        source: SearchEngine,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            source: source.to_string(),
            date: None,
            content: None,
        }
    }
}

/// Outbound half of web search: engine queries and page fetches.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    async fn search(
        &self,
        query: &str,
        engine: SearchEngine,
        num_results: usize,
    ) -> Result<Vec<SearchHit>, RagError>;

    /// Visible text of the page at `url`.
    async fn fetch_page(&self, url: &str) -> Result<String, RagError>;
}

#[derive(Clone, Default)]
struct EngineCredentials {
    google_api_key: Option<String>,
    google_cx: Option<String>,
    brave_api_key: Option<String>,
    bing_api_key: Option<String>,
    custom_search_url: Option<String>,
    custom_search_api_key: Option<String>,
}

fn required<'a>(value: &'a Option<String>, setting: &str) -> Result<&'a str, RagError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| RagError::config(setting, "required by the selected search engine"))
}

/// reqwest-based transport for the supported public search APIs.
#[derive(Clone)]
pub struct HttpSearchTransport {
    client: Client,
    credentials: EngineCredentials,
}

const USER_AGENT: &str = "Mozilla/5.0 (compatible; sentris-rag)";

impl HttpSearchTransport {
    pub fn from_config(config: &WebSearchConfig) -> Result<Self, RagError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(RagError::internal)?;

        Ok(Self {
            client,
            credentials: EngineCredentials {
                google_api_key: config.google_api_key.clone(),
                google_cx: config.google_cx.clone(),
                brave_api_key: config.brave_api_key.clone(),
                bing_api_key: config.bing_api_key.clone(),
                custom_search_url: config.custom_search_url.clone(),
                custom_search_api_key: config.custom_search_api_key.clone(),
            },
        })
    }

    async fn get_json(
        &self,
        engine: SearchEngine,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, RagError> {
        let collaborator = format!("{} search", engine);
        let response = request
            .send()
            .await
            .map_err(|e| RagError::retrieval(&collaborator, e))?;

        if !response.status().is_success() {
            return Err(RagError::retrieval(
                &collaborator,
                format!("request failed: {}", response.status()),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| RagError::retrieval(&collaborator, e))
    }

    async fn google_search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchHit>, RagError> {
        let api_key = required(&self.credentials.google_api_key, "web_search.google_api_key")?;
        let cx = required(&self.credentials.google_cx, "web_search.google_cx")?;
        let url = format!(
            "https://www.googleapis.com/customsearch/v1?key={}&cx={}&q={}&num={}",
            urlencoding::encode(api_key),
            urlencoding::encode(cx),
            urlencoding::encode(query),
            num_results.min(10)
        );

        let payload = self
            .get_json(SearchEngine::Google, self.client.get(url))
            .await?;
        Ok(parse_google(&payload))
    }

    async fn duckduckgo_search(&self, query: &str) -> Result<Vec<SearchHit>, RagError> {
        let url = format!(
            "https://api.duckduckgo.com/?q={}&format=json&no_redirect=1&no_html=1",
            urlencoding::encode(query)
        );

        let payload = self
            .get_json(SearchEngine::DuckDuckGo, self.client.get(url))
            .await?;
        Ok(parse_duckduckgo(&payload))
    }

    async fn brave_search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchHit>, RagError> {
        let api_key = required(&self.credentials.brave_api_key, "web_search.brave_api_key")?;
        let url = format!(
            "https://api.search.brave.com/res/v1/web/search?q={}&count={}",
            urlencoding::encode(query),
            num_results
        );

        let request = self
            .client
            .get(url)
            .header("X-Subscription-Token", api_key)
            .header("Accept", "application/json");
        let payload = self.get_json(SearchEngine::Brave, request).await?;
        Ok(parse_brave(&payload))
    }

    async fn bing_search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchHit>, RagError> {
        let api_key = required(&self.credentials.bing_api_key, "web_search.bing_api_key")?;
        let url = format!(
            "https://api.bing.microsoft.com/v7.0/search?q={}&count={}",
            urlencoding::encode(query),
            num_results
        );

        let request = self
            .client
            .get(url)
            .header("Ocp-Apim-Subscription-Key", api_key);
        let payload = self.get_json(SearchEngine::Bing, request).await?;
        Ok(parse_bing(&payload))
    }

    async fn custom_search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchHit>, RagError> {
        let base = required(
            &self.credentials.custom_search_url,
            "web_search.custom_search_url",
        )?;
        let api_key = self
            .credentials
            .custom_search_api_key
            .as_deref()
            .unwrap_or("");
        let separator = if base.contains('?') { '&' } else { '?' };
        let url = format!(
            "{}{}q={}&num={}&api_key={}",
            base,
            separator,
            urlencoding::encode(query),
            num_results,
            urlencoding::encode(api_key)
        );

        let payload = self
            .get_json(SearchEngine::Custom, self.client.get(url))
            .await?;
        Ok(parse_custom(&payload))
    }
}

#[async_trait]
impl SearchTransport for HttpSearchTransport {
    async fn search(
        &self,
        query: &str,
        engine: SearchEngine,
        num_results: usize,
    ) -> Result<Vec<SearchHit>, RagError> {
        let mut hits = match engine {
            SearchEngine::Google => self.google_search(query, num_results).await?,
            SearchEngine::DuckDuckGo => self.duckduckgo_search(query).await?,
            SearchEngine::Brave => self.brave_search(query, num_results).await?,
            SearchEngine::Bing => self.bing_search(query, num_results).await?,
            SearchEngine::Custom => self.custom_search(query, num_results).await?,
        };
        hits.truncate(num_results);
        Ok(hits)
    }

    async fn fetch_page(&self, url: &str) -> Result<String, RagError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RagError::retrieval("page fetch", e))?;

        if !response.status().is_success() {
            return Err(RagError::retrieval(
                "page fetch",
                format!("{} returned {}", url, response.status()),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| RagError::retrieval("page fetch", e))?;
        Ok(html_to_text(&html))
    }
}

fn str_field<'a>(item: &'a Value, key: &str) -> &'a str {
    item.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

fn parse_date(item: &Value, key: &str) -> Option<DateTime<Utc>> {
    item.get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

fn parse_google(payload: &Value) -> Vec<SearchHit> {
    let mut results = Vec::new();
    if let Some(items) = payload.get("items").and_then(|v| v.as_array()) {
        for item in items {
            let title = str_field(item, "title");
            let url = str_field(item, "link");
            if !title.is_empty() && !url.is_empty() {
                results.push(SearchHit::new(
                    title,
                    url,
                    str_field(item, "snippet"),
                    SearchEngine::Google,
                ));
            }
        }
    }
    results
}

fn parse_duckduckgo(payload: &Value) -> Vec<SearchHit> {
    let mut results = Vec::new();

    let abstract_text = str_field(payload, "AbstractText");
    let abstract_url = str_field(payload, "AbstractURL");
    if !abstract_text.is_empty() && !abstract_url.is_empty() {
        results.push(SearchHit::new(
            abstract_text.split(" - ").next().unwrap_or(abstract_text),
            abstract_url,
            abstract_text,
            SearchEngine::DuckDuckGo,
        ));
    }

    if let Some(items) = payload.get("Results").and_then(|v| v.as_array()) {
        collect_ddg_topics(items, &mut results);
    }
    if let Some(items) = payload.get("RelatedTopics").and_then(|v| v.as_array()) {
        collect_ddg_topics(items, &mut results);
    }

    results
}

fn collect_ddg_topics(items: &[Value], results: &mut Vec<SearchHit>) {
    for item in items {
        if let Some(topics) = item.get("Topics").and_then(|v| v.as_array()) {
            collect_ddg_topics(topics, results);
            continue;
        }
        let text = str_field(item, "Text");
        let url = str_field(item, "FirstURL");
        if text.is_empty() || url.is_empty() {
            continue;
        }
        results.push(SearchHit::new(
            text.split(" - ").next().unwrap_or(text),
            url,
            text,
            SearchEngine::DuckDuckGo,
        ));
    }
}

fn parse_brave(payload: &Value) -> Vec<SearchHit> {
    let mut results = Vec::new();
    if let Some(items) = payload
        .get("web")
        .and_then(|w| w.get("results"))
        .and_then(|v| v.as_array())
    {
        for item in items {
            let title = str_field(item, "title");
            let url = str_field(item, "url");
            if !title.is_empty() && !url.is_empty() {
                let mut hit =
                    SearchHit::new(title, url, str_field(item, "description"), SearchEngine::Brave);
                hit.date = parse_date(item, "page_age");
                results.push(hit);
            }
        }
    }
    results
}

fn parse_bing(payload: &Value) -> Vec<SearchHit> {
    let mut results = Vec::new();
    if let Some(items) = payload
        .get("webPages")
        .and_then(|w| w.get("value"))
        .and_then(|v| v.as_array())
    {
        for item in items {
            let title = str_field(item, "name");
            let url = str_field(item, "url");
            if !title.is_empty() && !url.is_empty() {
                let mut hit =
                    SearchHit::new(title, url, str_field(item, "snippet"), SearchEngine::Bing);
                hit.date = parse_date(item, "dateLastCrawled");
                results.push(hit);
            }
        }
    }
    results
}

fn parse_custom(payload: &Value) -> Vec<SearchHit> {
    let mut results = Vec::new();
    if let Some(items) = payload.get("results").and_then(|v| v.as_array()) {
        for item in items {
            let url = str_field(item, "url");
            if url.is_empty() {
                continue;
            }
            let mut hit = SearchHit::new(
                str_field(item, "title"),
                url,
                str_field(item, "snippet"),
                SearchEngine::Custom,
            );
            hit.date = parse_date(item, "date");
            results.push(hit);
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn engine_names_round_trip_through_parsing() {
        assert_eq!("Google".parse::<SearchEngine>().unwrap(), SearchEngine::Google);
        assert_eq!("duckduckgo".parse::<SearchEngine>().unwrap().to_string(), "duckduckgo");
        let err = "yahoo".parse::<SearchEngine>().unwrap_err();
        assert!(matches!(err, RagError::UnsupportedFormat { .. }));
    }

    #[test]
    fn duckduckgo_flattens_nested_topics() {
        let payload = json!({
            "AbstractText": "Rust - a language",
            "AbstractURL": "https://www.rust-lang.org",
            "RelatedTopics": [
                { "Text": "Cargo - package manager", "FirstURL": "https://doc.rust-lang.org/cargo" },
                { "Topics": [
                    { "Text": "Crates", "FirstURL": "https://crates.io" },
                    { "Text": "", "FirstURL": "https://ignored.example" }
                ]}
            ]
        });

        let hits = parse_duckduckgo(&payload);
        let titles: Vec<&str> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Rust", "Cargo", "Crates"]);
        assert!(hits.iter().all(|h| h.source == "duckduckgo"));
    }

    #[test]
    fn bing_and_custom_payloads_carry_dates() {
        let bing = json!({
            "webPages": { "value": [
                { "name": "Cells", "url": "https://bio.example/cells", "snippet": "About cells",
                  "dateLastCrawled": "2024-03-01T10:00:00Z" }
            ]}
        });
        let hits = parse_bing(&bing);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].date.unwrap().to_rfc3339(), "2024-03-01T10:00:00+00:00");

        let custom = json!({ "results": [
            { "title": "A", "url": "https://a.example", "snippet": "s" },
            { "title": "no url" }
        ]});
        let hits = parse_custom(&custom);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].date.is_none());
    }

    #[tokio::test]
    async fn missing_credentials_are_configuration_errors() {
        let transport = HttpSearchTransport::from_config(&WebSearchConfig::default()).unwrap();

        let err = transport
            .search("cells", SearchEngine::Google, 5)
            .await
            .unwrap_err();
        match err {
            RagError::Configuration { setting, .. } => {
                assert_eq!(setting, "web_search.google_api_key")
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = transport
            .search("cells", SearchEngine::Custom, 5)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Configuration { .. }));
    }
}
