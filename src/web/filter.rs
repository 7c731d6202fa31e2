use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::transport::SearchHit;
use crate::core::errors::RagError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Post-search constraints. Every set criterion must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Regex searched for in the result URL
    pub domain: Option<String>,
    /// Case-insensitive terms that must all appear in title or snippet
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Only checked for results that carry a date
    pub date_range: Option<DateRange>,
}

impl SearchFilter {
    pub fn domain(mut self, pattern: impl Into<String>) -> Self {
        self.domain = Some(pattern.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn date_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.date_range = Some(DateRange { start, end });
        self
    }

    pub fn apply(&self, hits: Vec<SearchHit>) -> Result<Vec<SearchHit>, RagError> {
        let domain = match &self.domain {
            Some(pattern) => Some(
                Regex::new(pattern).map_err(|e| RagError::config("filter.domain", e.to_string()))?,
            ),
            None => None,
        };
        let keywords: Vec<String> = self.keywords.iter().map(|k| k.to_lowercase()).collect();

        Ok(hits
            .into_iter()
            .filter(|hit| {
                if let (Some(range), Some(date)) = (&self.date_range, &hit.date) {
                    if *date < range.start || *date > range.end {
                        return false;
                    }
                }
                if let Some(domain) = &domain {
                    if !domain.is_match(&hit.url) {
                        return false;
                    }
                }
                if !keywords.is_empty() {
                    let text = format!("{} {}", hit.title, hit.snippet).to_lowercase();
                    if !keywords.iter().all(|k| text.contains(k.as_str())) {
                        return false;
                    }
                }
                true
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::transport::SearchEngine;
    use chrono::TimeZone;

    fn hit(title: &str, url: &str, snippet: &str) -> SearchHit {
        SearchHit::new(title, url, snippet, SearchEngine::Bing)
    }

    fn titles(hits: &[SearchHit]) -> Vec<&str> {
        hits.iter().map(|h| h.title.as_str()).collect()
    }

    #[test]
    fn domain_and_keywords_must_all_match() {
        let hits = vec![
            hit("Cell Biology", "https://edu.example.org/cells", "Mitosis and meiosis"),
            hit("Cell phones", "https://shop.example.com/phones", "Mitosis? no"),
            hit("Biology intro", "https://edu.example.org/intro", "Overview"),
        ];

        let filter = SearchFilter::default()
            .domain(r"\.org/")
            .keywords(["cell", "MITOSIS"]);
        let kept = filter.apply(hits).unwrap();
        assert_eq!(titles(&kept), vec!["Cell Biology"]);
    }

    #[test]
    fn date_range_skips_undated_results() {
        let mut old = hit("old", "https://a.example", "");
        old.date = Some(Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap());
        let mut recent = hit("recent", "https://b.example", "");
        recent.date = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let undated = hit("undated", "https://c.example", "");

        let filter = SearchFilter::default().date_range(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap(),
        );
        let kept = filter.apply(vec![old, recent, undated]).unwrap();
        assert_eq!(titles(&kept), vec!["recent", "undated"]);
    }

    #[test]
    fn invalid_domain_pattern_is_reported() {
        let err = SearchFilter::default()
            .domain("(")
            .apply(vec![])
            .unwrap_err();
        assert!(matches!(err, RagError::Configuration { .. }));
    }
}
