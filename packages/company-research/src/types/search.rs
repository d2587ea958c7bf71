//! Queries issued per round and the results they produce.

use serde::{Deserialize, Serialize};

use super::record::RecordField;

/// A planned web search and the gap it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Query text sent to the search provider
    pub query: String,

    /// What information this query is trying to find
    pub purpose: String,

    /// The record field this query targets, when known
    pub target: Option<RecordField>,
}

impl SearchQuery {
    /// Create a new query with a free-text purpose.
    pub fn new(query: impl Into<String>, purpose: impl Into<String>) -> Self {
        let purpose = purpose.into();
        Self {
            query: query.into(),
            target: RecordField::parse(&purpose),
            purpose,
        }
    }

    /// Create a query aimed at a specific field.
    pub fn for_field(query: impl Into<String>, field: RecordField) -> Self {
        Self {
            query: query.into(),
            purpose: format!("Find {}", field.description()),
            target: Some(field),
        }
    }
}

/// One search hit, tagged with the query that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Query text that produced this result
    pub query: String,

    /// Page title
    pub title: String,

    /// Page URL
    pub url: String,

    /// Text snippet from the provider
    pub content: String,

    /// Relevance score (0.0-1.0, if provided)
    pub score: Option<f32>,
}

impl SearchResult {
    /// Create a result for a query.
    pub fn new(
        query: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
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
