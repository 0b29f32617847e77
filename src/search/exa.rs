//! Exa search (`POST {query, numResults, contents}` with `x-api-key`).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SearchError, SearchHit, clean_text};

/// Upper bound on page text Exa returns per result; the trigger trims further.
const MAX_TEXT_CHARS: usize = 1000;

#[derive(Debug, Clone)]
pub struct ExaSearch {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ExaSearch {
    pub fn new(endpoint: String, api_key: String, timeout_seconds: u64) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| SearchError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, endpoint, api_key })
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        let payload = ExaRequest {
            query,
            num_results: max_results,
            contents: ExaContents { text: ExaText { max_characters: MAX_TEXT_CHARS } },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SearchError::Request(format!("exa request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SearchError::Request(format!("exa returned status {}", response.status())));
        }

        let body: ExaResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Request(format!("failed to parse exa response: {e}")))?;

        let hits = hits_from(body, max_results);
        debug!(count = hits.len(), engine = "exa", "search completed");
        Ok(hits)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaRequest<'a> {
    query: &'a str,
    num_results: usize,
    contents: ExaContents,
}

#[derive(Debug, Serialize)]
struct ExaContents {
    text: ExaText,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaText {
    max_characters: usize,
}

#[derive(Debug, Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    text: Option<String>,
}

fn hits_from(body: ExaResponse, max_results: usize) -> Vec<SearchHit> {
    body.results
        .into_iter()
        .take(max_results)
        .map(|r| SearchHit {
            title: r.title.as_deref().map(clean_text).unwrap_or_else(|| r.url.clone()),
            snippet: r.text.as_deref().map(clean_text).unwrap_or_default(),
            url: r.url,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_camel_case() {
        let payload = ExaRequest {
            query: "rust release",
            num_results: 3,
            contents: ExaContents { text: ExaText { max_characters: 1000 } },
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["numResults"], 3);
        assert_eq!(json["contents"]["text"]["maxCharacters"], 1000);
    }

    #[test]
    fn untitled_results_fall_back_to_url() {
        let body: ExaResponse = serde_json::from_str(
            r#"{"results":[
                {"title":null,"url":"https://a.example","text":"alpha\n\ntext"},
                {"title":"B","url":"https://b.example"}
            ]}"#,
        )
        .unwrap();
        let hits = hits_from(body, 10);
        assert_eq!(hits[0].title, "https://a.example");
        assert_eq!(hits[0].snippet, "alpha text");
        assert_eq!(hits[1].title, "B");
        assert_eq!(hits[1].snippet, "");
    }
}
