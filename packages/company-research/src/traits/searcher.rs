//! Web searcher trait for the search provider.
//!
//! Abstracts over search providers (Tavily, SerpAPI, etc.). A searcher
//! returns a finite list of hits for one query; failures are per query and
//! the executor turns them into empty result lists.

use async_trait::async_trait;

use crate::error::Result;

/// A raw hit returned by a search provider.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Page title (may be empty)
    pub title: String,

    /// Page URL
    pub url: String,

    /// Text snippet/content from the provider
    pub content: String,

    /// Relevance score (0.0-1.0, if provided by the search API)
    pub score: Option<f32>,
}

impl SearchHit {
    /// Create a new hit.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: content.into(),
            score: None,
        }
    }

    /// Add a relevance score.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }
}

/// Web search trait.
///
/// # Implementations
///
/// - `TavilyWebSearcher` - Tavily API
/// - `RateLimitedSearcher` - wraps any searcher with a request quota
/// - `MockWebSearcher` - For testing
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Search the web, returning at most `max_results` hits.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>>;
}

#[async_trait]
impl<T: WebSearcher + ?Sized> WebSearcher for std::sync::Arc<T> {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        (**self).search(query, max_results).await
    }
}
