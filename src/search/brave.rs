//! Native engine: Brave-compatible web search (`GET ?q=...&count=N`).

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{SearchError, SearchHit, clean_text};

#[derive(Debug, Clone)]
pub struct BraveSearch {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl BraveSearch {
    pub fn new(endpoint: String, api_key: String, timeout_seconds: u64) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| SearchError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, endpoint, api_key })
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Subscription-Token", &self.api_key)
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", &max_results.to_string())])
            .send()
            .await
            .map_err(|e| SearchError::Request(format!("native search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SearchError::Request(format!("native search returned status {}", response.status())));
        }

        let body: BraveResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Request(format!("failed to parse native search response: {e}")))?;

        let hits = hits_from(body, max_results);
        debug!(count = hits.len(), engine = "native", "search completed");
        Ok(hits)
    }
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}

fn hits_from(body: BraveResponse, max_results: usize) -> Vec<SearchHit> {
    body.web
        .map(|w| w.results)
        .unwrap_or_default()
        .into_iter()
        .filter(|r| !r.url.is_empty())
        .take(max_results)
        .map(|r| SearchHit {
            title: clean_text(&r.title),
            snippet: clean_text(&r.description),
            url: r.url,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_web_results() {
        let body: BraveResponse = serde_json::from_str(
            r#"{"web":{"results":[
                {"title":"<strong>Rust</strong> 1.90","url":"https://blog.rust-lang.org","description":"Released &amp; shipped"},
                {"title":"no url","url":"","description":"dropped"},
                {"title":"Second","url":"https://example.org","description":"two"}
            ]}}"#,
        )
        .unwrap();
        let hits = hits_from(body, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "Rust 1.90");
        assert_eq!(hits[0].snippet, "Released & shipped");
        assert_eq!(hits[1].url, "https://example.org");
    }

    #[test]
    fn respects_max_results_and_missing_web() {
        let body: BraveResponse = serde_json::from_str(
            r#"{"web":{"results":[{"url":"https://a"},{"url":"https://b"},{"url":"https://c"}]}}"#,
        )
        .unwrap();
        assert_eq!(hits_from(body, 2).len(), 2);

        let empty: BraveResponse = serde_json::from_str("{}").unwrap();
        assert!(hits_from(empty, 5).is_empty());
    }
}
