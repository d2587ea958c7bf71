//! Search execution: one round's queries fanned out concurrently.
//!
//! All queries of a round are dispatched at once, bounded by a concurrency
//! cap, and the round waits for every one of them (fan-out/fan-in barrier).
//! A failing or slow query yields an empty slot; it never cancels siblings.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::error::ResearchError;
use crate::traits::searcher::WebSearcher;
use crate::types::search::{SearchQuery, SearchResult};
use crate::types::session::SessionCounters;

/// A query whose search failed or timed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFailure {
    pub query: String,
    pub error: String,
}

/// How one query of a round went, kept per slot so identical query texts
/// stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub query: String,
    pub result_count: usize,
    /// Set when the search failed or timed out
    pub error: Option<String>,
}

/// Everything one round of searching produced.
#[derive(Debug, Clone, Default)]
pub struct RoundResults {
    /// One outcome per query, in query order
    pub per_query: Vec<QueryOutcome>,

    /// Flattened results, each tagged with its source query
    pub results: Vec<SearchResult>,

    /// Queries that failed
    pub failures: Vec<SearchFailure>,
}

/// Runs a round's queries against the search provider.
#[derive(Debug, Clone)]
pub struct SearchExecutor {
    concurrency: usize,
    max_results_per_query: usize,
    timeout: Duration,
}

impl Default for SearchExecutor {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_results_per_query: 3,
            timeout: Duration::from_secs(30),
        }
    }
}

impl SearchExecutor {
    /// Create an executor.
    pub fn new(concurrency: usize, max_results_per_query: usize, timeout: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            max_results_per_query,
            timeout,
        }
    }

    /// Run every query, counting them against the budget exactly once.
    pub async fn execute<S>(
        &self,
        searcher: &S,
        queries: &[SearchQuery],
        counters: &mut SessionCounters,
    ) -> RoundResults
    where
        S: WebSearcher + ?Sized,
    {
        counters.record_queries(queries.len());
        if queries.is_empty() {
            return RoundResults::default();
        }

        // One slot per query, filled as searches finish in any order.
        let mut slots: Vec<Option<Result<Vec<SearchResult>, ResearchError>>> =
            (0..queries.len()).map(|_| None).collect();

        let mut finished = stream::iter(queries.iter().enumerate())
            .map(|(index, query)| async move { (index, self.run_one(searcher, query).await) })
            .buffer_unordered(self.concurrency);

        while let Some((index, outcome)) = finished.next().await {
            slots[index] = Some(outcome);
        }

        let mut round = RoundResults::default();
        for (query, slot) in queries.iter().zip(slots) {
            match slot {
                Some(Ok(results)) => {
                    round.per_query.push(QueryOutcome {
                        query: query.query.clone(),
                        result_count: results.len(),
                        error: None,
                    });
                    round.results.extend(results);
                }
                Some(Err(e)) => {
                    warn!(query = %query.query, error = %e, "Search failed, continuing with empty results");
                    round.per_query.push(QueryOutcome {
                        query: query.query.clone(),
                        result_count: 0,
                        error: Some(e.to_string()),
                    });
                    round.failures.push(SearchFailure {
                        query: query.query.clone(),
                        error: e.to_string(),
                    });
                }
                None => {}
            }
        }

        debug!(
            queries = queries.len(),
            results = round.results.len(),
            failures = round.failures.len(),
            "Search round complete"
        );

        round
    }

    async fn run_one<S>(
        &self,
        searcher: &S,
        query: &SearchQuery,
    ) -> Result<Vec<SearchResult>, ResearchError>
    where
        S: WebSearcher + ?Sized,
    {
        let hits = tokio::time::timeout(
            self.timeout,
            searcher.search(&query.query, self.max_results_per_query),
        )
        .await
        .map_err(|_| ResearchError::Timeout {
            operation: format!("search '{}'", query.query),
            seconds: self.timeout.as_secs(),
        })??;

        Ok(hits
            .into_iter()
            .take(self.max_results_per_query)
            .map(|hit| {
                let result = SearchResult::new(&query.query, hit.title, hit.url, hit.content);
                match hit.score {
                    Some(score) => result.with_score(score),
                    None => result,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockWebSearcher;
    use crate::traits::searcher::SearchHit;

    fn queries(texts: &[&str]) -> Vec<SearchQuery> {
        texts.iter().map(|t| SearchQuery::new(*t, "test")).collect()
    }

    #[tokio::test]
    async fn test_results_keep_source_query() {
        let searcher = MockWebSearcher::new()
            .with_hits("Acme founders", vec![SearchHit::new("About", "https://acme.test/about", "Founded by Alice")])
            .with_hits("Acme funding", vec![SearchHit::new("News", "https://news.test/acme", "Series A")]);
        let mut counters = SessionCounters::new();

        let round = SearchExecutor::default()
            .execute(&searcher, &queries(&["Acme founders", "Acme funding"]), &mut counters)
            .await;

        assert_eq!(round.results.len(), 2);
        assert_eq!(round.results[0].query, "Acme founders");
        assert_eq!(round.results[1].query, "Acme funding");
        assert_eq!(counters.queries_executed(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let searcher = MockWebSearcher::new()
            .with_hits("ok", vec![SearchHit::new("t", "https://a.test", "c")])
            .fail_query("broken");
        let mut counters = SessionCounters::new();

        let round = SearchExecutor::default()
            .execute(&searcher, &queries(&["broken", "ok"]), &mut counters)
            .await;

        assert_eq!(round.results.len(), 1);
        assert_eq!(round.failures.len(), 1);
        assert_eq!(round.failures[0].query, "broken");
        let counts: Vec<_> = round
            .per_query
            .iter()
            .map(|o| (o.query.as_str(), o.result_count, o.error.is_some()))
            .collect();
        assert_eq!(counts, vec![("broken", 0, true), ("ok", 1, false)]);
    }

    #[tokio::test]
    async fn test_identical_queries_keep_separate_outcomes() {
        let searcher = MockWebSearcher::new().fail_first_call("Acme founders");
        let mut counters = SessionCounters::new();

        let round = SearchExecutor::new(1, 3, Duration::from_secs(5))
            .execute(&searcher, &queries(&["Acme founders", "Acme founders"]), &mut counters)
            .await;

        assert_eq!(round.per_query.len(), 2);
        assert!(round.per_query.iter().all(|o| o.query == "Acme founders"));
        assert!(round.per_query[0].error.is_some());
        assert_eq!(round.per_query[1].error, None);
        assert_eq!(round.per_query[1].result_count, 1);
        assert_eq!(round.results.len(), 1);
    }

    #[tokio::test]
    async fn test_all_failures_still_count_queries() {
        let searcher = MockWebSearcher::new().fail_all();
        let mut counters = SessionCounters::new();

        let round = SearchExecutor::default()
            .execute(&searcher, &queries(&["a", "b", "c"]), &mut counters)
            .await;

        assert!(round.results.is_empty());
        assert_eq!(round.failures.len(), 3);
        assert_eq!(counters.queries_executed(), 3);
    }

    #[tokio::test]
    async fn test_results_truncated_to_limit() {
        let hits = (0..5)
            .map(|i| SearchHit::new("t", format!("https://a.test/{i}"), "c"))
            .collect();
        let searcher = MockWebSearcher::new().ignoring_limit().with_hits("q", hits);
        let mut counters = SessionCounters::new();

        let round = SearchExecutor::new(2, 2, Duration::from_secs(5))
            .execute(&searcher, &queries(&["q"]), &mut counters)
            .await;

        assert_eq!(round.results.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let searcher = MockWebSearcher::new().with_delay(Duration::from_millis(30));
        let mut counters = SessionCounters::new();

        SearchExecutor::new(2, 3, Duration::from_secs(5))
            .execute(&searcher, &queries(&["a", "b", "c", "d", "e"]), &mut counters)
            .await;

        assert!(searcher.max_in_flight() <= 2);
        assert!(searcher.max_in_flight() >= 1);
        assert_eq!(searcher.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_slow_search_times_out() {
        let searcher = MockWebSearcher::new().with_delay(Duration::from_millis(200));
        let mut counters = SessionCounters::new();

        let round = SearchExecutor::new(2, 3, Duration::from_millis(20))
            .execute(&searcher, &queries(&["slow"]), &mut counters)
            .await;

        assert_eq!(round.failures.len(), 1);
        assert!(round.failures[0].error.contains("timed out"));
    }

    #[tokio::test]
    async fn test_empty_round() {
        let searcher = MockWebSearcher::new();
        let mut counters = SessionCounters::new();

        let round = SearchExecutor::default().execute(&searcher, &[], &mut counters).await;

        assert!(round.results.is_empty());
        assert_eq!(counters.queries_executed(), 0);
        assert!(searcher.calls().is_empty());
    }
}
