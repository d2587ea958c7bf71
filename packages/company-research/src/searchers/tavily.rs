//! Tavily-backed web searcher.
//!
//! Sends one request per query to Tavily's search endpoint and maps the
//! results to [`SearchHit`]s. Results with unparsable URLs or from excluded
//! domains are dropped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{ResearchError, Result};
use crate::security::{ProviderCredentials, SecretString};
use crate::traits::searcher::{SearchHit, WebSearcher};

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Tavily search response.
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

/// A single Tavily search result.
#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    score: Option<f64>,
}

/// Tavily search request.
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
    #[serde(skip_serializing_if = "no_domains")]
    exclude_domains: &'a [String],
}

fn no_domains(domains: &&[String]) -> bool {
    domains.is_empty()
}

/// Web searcher using the Tavily API.
pub struct TavilyWebSearcher {
    client: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
    search_depth: String,
    exclude_domains: Vec<String>,
}

impl TavilyWebSearcher {
    /// Create a new Tavily searcher.
    ///
    /// Video and social sites are excluded by default; they rarely carry
    /// company facts in their snippets.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key: SecretString::new(api_key),
            endpoint: TAVILY_SEARCH_URL.to_string(),
            search_depth: "basic".to_string(),
            exclude_domains: vec![
                "youtube.com".to_string(),
                "twitter.com".to_string(),
                "facebook.com".to_string(),
            ],
        }
    }

    /// Create from checked provider credentials, honoring a base URL override.
    pub fn from_credentials(credentials: ProviderCredentials) -> Self {
        let searcher = Self::new(credentials.api_key.expose());
        match credentials.base_url {
            Some(url) => searcher.with_endpoint(url),
            None => searcher,
        }
    }

    /// Create from the `TAVILY_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        ProviderCredentials::from_env("Tavily", "TAVILY_API_KEY").map(Self::from_credentials)
    }

    /// Set search depth ("basic" or "advanced").
    pub fn with_search_depth(mut self, depth: impl Into<String>) -> Self {
        self.search_depth = depth.into();
        self
    }

    /// Replace the excluded domains.
    pub fn with_exclude_domains<I, T>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.exclude_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Send requests to a different endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn is_excluded(&self, host: &str) -> bool {
        self.exclude_domains
            .iter()
            .any(|d| host == d || host.ends_with(&format!(".{d}")))
    }

    fn to_hit(&self, result: TavilyResult) -> Option<SearchHit> {
        let parsed = url::Url::parse(&result.url).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        if self.is_excluded(parsed.host_str()?) {
            return None;
        }

        let hit = SearchHit::new(result.title, result.url, result.content);
        Some(match result.score {
            Some(score) => hit.with_score(score as f32),
            None => hit,
        })
    }
}

#[async_trait]
impl WebSearcher for TavilyWebSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let request = TavilyRequest {
            query,
            search_depth: &self.search_depth,
            max_results,
            exclude_domains: &self.exclude_domains,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .json(&request)
            .send()
            .await
            .map_err(|e| ResearchError::Search(Box::new(e)))?;

        if !response.status().is_success() {
            return Err(ResearchError::search(format!(
                "Tavily API error: {}",
                response.status()
            )));
        }

        let tavily: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Search(Box::new(e)))?;

        let hits: Vec<SearchHit> = tavily
            .results
            .into_iter()
            .filter_map(|r| self.to_hit(r))
            .take(max_results)
            .collect();

        debug!(query, hits = hits.len(), "Tavily search complete");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(url: &str) -> TavilyResult {
        TavilyResult {
            url: url.to_string(),
            title: "Title".into(),
            content: "Content".into(),
            score: Some(0.9),
        }
    }

    #[test]
    fn test_excluded_domains_dropped() {
        let searcher = TavilyWebSearcher::new("key");

        assert!(searcher.to_hit(result("https://www.youtube.com/watch?v=1")).is_none());
        assert!(searcher.to_hit(result("https://twitter.com/acme")).is_none());
        assert!(searcher.to_hit(result("https://acme.com/about")).is_some());
    }

    #[test]
    fn test_unparsable_urls_dropped() {
        let searcher = TavilyWebSearcher::new("key");

        assert!(searcher.to_hit(result("not a url")).is_none());
        assert!(searcher.to_hit(result("ftp://acme.com/file")).is_none());
    }

    #[test]
    fn test_score_carried() {
        let hit = TavilyWebSearcher::new("key")
            .to_hit(result("https://acme.com"))
            .unwrap();
        assert_eq!(hit.score, Some(0.9));
    }

    #[test]
    fn test_request_omits_empty_excludes() {
        let request = TavilyRequest {
            query: "Acme founders",
            search_depth: "basic",
            max_results: 3,
            exclude_domains: &[],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("exclude_domains").is_none());
        assert_eq!(json["max_results"], 3);
    }

    #[test]
    fn test_credentials_endpoint_is_used() {
        let credentials = ProviderCredentials::new("Tavily", "tvly-test")
            .unwrap()
            .with_base_url("http://localhost:9000/search");
        let searcher = TavilyWebSearcher::from_credentials(credentials);

        assert_eq!(searcher.endpoint, "http://localhost:9000/search");
        assert_eq!(searcher.api_key.expose(), "tvly-test");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        let searcher = TavilyWebSearcher::new("tvly-secret");
        assert!(!format!("{:?}", searcher.api_key).contains("tvly-secret"));
    }

    #[tokio::test]
    #[ignore = "Requires TAVILY_API_KEY and network access"]
    async fn test_live_search() {
        let searcher = TavilyWebSearcher::from_env().unwrap();
        let hits = searcher.search("Anthropic founders", 3).await.unwrap();
        assert!(hits.len() <= 3);
    }
}
