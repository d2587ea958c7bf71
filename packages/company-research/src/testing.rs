//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the research library
//! without making real completion or network calls.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{ResearchError, Result};
use crate::pipeline::planner::PlannedQueries;
use crate::schema::StructuredOutput;
use crate::traits::completion::{CompletionService, Prompt};
use crate::traits::searcher::{SearchHit, WebSearcher};
use crate::types::record::RecordUpdate;

/// Scripted replies for one call shape. The last reply repeats once the
/// script runs out.
#[derive(Default)]
struct Script {
    replies: Vec<String>,
    next: usize,
    failing: bool,
}

impl Script {
    fn next_reply(&mut self) -> Option<String> {
        let reply = self
            .replies
            .get(self.next)
            .or_else(|| self.replies.last())
            .cloned();
        self.next += 1;
        reply
    }
}

/// A mock completion service for testing.
///
/// Tells planning and extraction prompts apart by the requested schema and
/// answers each from its own script. Without a script, planning replies with
/// an empty query list and extraction with an empty update.
#[derive(Default)]
pub struct MockAI {
    plans: Arc<RwLock<Script>>,
    extractions: Arc<RwLock<Script>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockAICall>>>,
}

/// Record of a call made to the mock AI.
#[derive(Debug, Clone)]
pub enum MockAICall {
    Plan { user: String },
    Extract { user: String },
    Other { user: String },
}

impl MockAI {
    /// Create a new mock AI with default behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to planning prompts with raw text.
    pub fn with_plan_reply(self, reply: impl Into<String>) -> Self {
        self.plans.write().unwrap().replies.push(reply.into());
        self
    }

    /// Reply to successive planning prompts with successive texts.
    pub fn with_plan_replies<I, T>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.plans
            .write()
            .unwrap()
            .replies
            .extend(replies.into_iter().map(Into::into));
        self
    }

    /// Reply to planning prompts with the given queries.
    pub fn with_planned_queries<'a>(self, queries: impl IntoIterator<Item = &'a str>) -> Self {
        let queries: Vec<_> = queries
            .into_iter()
            .map(|q| serde_json::json!({ "query": q, "purpose": "research" }))
            .collect();
        self.with_plan_reply(serde_json::json!({ "queries": queries }).to_string())
    }

    /// Fail every planning call.
    pub fn failing_plans(self) -> Self {
        self.plans.write().unwrap().failing = true;
        self
    }

    /// Reply to extraction prompts with this update.
    pub fn with_extraction(self, update: RecordUpdate) -> Self {
        let reply = serde_json::to_string(&update).unwrap();
        self.with_extract_reply(reply)
    }

    /// Reply to extraction prompts with raw text.
    pub fn with_extract_reply(self, reply: impl Into<String>) -> Self {
        self.extractions.write().unwrap().replies.push(reply.into());
        self
    }

    /// Fail every extraction call.
    pub fn failing_extractions(self) -> Self {
        self.extractions.write().unwrap().failing = true;
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockAICall> {
        self.calls.read().unwrap().clone()
    }

    /// Number of planning calls.
    pub fn plan_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockAICall::Plan { .. }))
            .count()
    }

    /// Number of extraction calls.
    pub fn extract_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockAICall::Extract { .. }))
            .count()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl CompletionService for MockAI {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let schema = prompt.schema.as_ref().map(|s| s.name.as_str());
        let user = prompt.user.clone();

        let (script, default) = if schema == Some(PlannedQueries::type_name().as_str()) {
            self.calls.write().unwrap().push(MockAICall::Plan { user });
            (&self.plans, r#"{"queries": []}"#)
        } else if schema == Some(RecordUpdate::type_name().as_str()) {
            self.calls.write().unwrap().push(MockAICall::Extract { user });
            (&self.extractions, "{}")
        } else {
            self.calls.write().unwrap().push(MockAICall::Other { user });
            return Ok(String::new());
        };

        let mut script = script.write().unwrap();
        if script.failing {
            return Err(ResearchError::completion("mock completion failure"));
        }
        Ok(script.next_reply().unwrap_or_else(|| default.to_string()))
    }
}

/// A mock web searcher for testing.
///
/// Unknown queries get one generated hit. Tracks concurrent calls so tests
/// can assert on the fan-out bound.
#[derive(Default)]
pub struct MockWebSearcher {
    hits: Arc<RwLock<HashMap<String, Vec<SearchHit>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    failing_once: Arc<RwLock<HashSet<String>>>,
    fail_all: bool,
    ignore_limit: bool,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockWebSearcher {
    /// Create a new mock searcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add hits for a query.
    pub fn with_hits(self, query: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.hits.write().unwrap().insert(query.into(), hits);
        self
    }

    /// Fail a specific query.
    pub fn fail_query(self, query: impl Into<String>) -> Self {
        self.failing.write().unwrap().insert(query.into());
        self
    }

    /// Fail only the first search for a query; later ones succeed.
    pub fn fail_first_call(self, query: impl Into<String>) -> Self {
        self.failing_once.write().unwrap().insert(query.into());
        self
    }

    /// Fail every query.
    pub fn fail_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Return every configured hit regardless of the requested limit.
    pub fn ignoring_limit(mut self) -> Self {
        self.ignore_limit = true;
        self
    }

    /// Sleep before answering each query.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Most searches observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Queries searched, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    fn default_hit(query: &str) -> SearchHit {
        let slug: String = query
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        SearchHit::new(
            format!("Result for {query}"),
            format!("https://search.test/{slug}"),
            format!("Background information about {query}."),
        )
        .with_score(0.5)
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.calls.write().unwrap().push(query.to_string());

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_all
            || self.failing.read().unwrap().contains(query)
            || self.failing_once.write().unwrap().remove(query)
        {
            return Err(ResearchError::search(format!("mock search failure: {query}")));
        }

        let mut hits = self
            .hits
            .read()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_else(|| vec![Self::default_hit(query)]);

        if !self.ignore_limit {
            hits.truncate(max_results);
        }
        Ok(hits)
    }
}
