//! Rate-limited searcher wrapper.
//!
//! Wraps any WebSearcher implementation with rate limiting using the governor
//! crate. The executor fans out several queries at once; the limiter keeps
//! the provider's request quota.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::{ResearchError, Result};
use crate::traits::searcher::{SearchHit, WebSearcher};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A searcher wrapper that enforces rate limits.
pub struct RateLimitedSearcher<S: WebSearcher> {
    inner: S,
    limiter: Arc<DefaultRateLimiter>,
}

impl<S: WebSearcher> RateLimitedSearcher<S> {
    /// Create a new rate-limited searcher.
    ///
    /// # Arguments
    /// * `searcher` - The underlying searcher to wrap
    /// * `requests_per_second` - Maximum requests per second, must be > 0
    pub fn new(searcher: S, requests_per_second: u32) -> Result<Self> {
        Ok(Self::with_quota(searcher, Quota::per_second(non_zero(requests_per_second, "requests_per_second")?)))
    }

    /// Create with a custom quota.
    pub fn with_quota(searcher: S, quota: Quota) -> Self {
        Self {
            inner: searcher,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Create with burst support.
    ///
    /// # Arguments
    /// * `searcher` - The underlying searcher to wrap
    /// * `requests_per_second` - Sustained rate
    /// * `burst` - Maximum burst size
    pub fn with_burst(searcher: S, requests_per_second: u32, burst: u32) -> Result<Self> {
        let quota = Quota::per_second(non_zero(requests_per_second, "requests_per_second")?)
            .allow_burst(non_zero(burst, "burst")?);
        Ok(Self::with_quota(searcher, quota))
    }

    /// The wrapped searcher.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

fn non_zero(value: u32, name: &str) -> Result<NonZeroU32> {
    NonZeroU32::new(value).ok_or_else(|| ResearchError::Config(format!("{name} must be > 0")))
}

#[async_trait]
impl<S: WebSearcher> WebSearcher for RateLimitedSearcher<S> {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        self.limiter.until_ready().await;
        self.inner.search(query, max_results).await
    }
}

/// Builder for RateLimitedSearcher with ergonomic configuration.
pub struct RateLimitedSearcherBuilder<S: WebSearcher> {
    searcher: S,
    requests_per_second: u32,
    burst: Option<u32>,
}

impl<S: WebSearcher> RateLimitedSearcherBuilder<S> {
    /// Create a new builder.
    pub fn new(searcher: S) -> Self {
        Self {
            searcher,
            requests_per_second: 1,
            burst: None,
        }
    }

    /// Set requests per second.
    pub fn requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = rps;
        self
    }

    /// Set burst size.
    pub fn burst(mut self, burst: u32) -> Self {
        self.burst = Some(burst);
        self
    }

    /// Build the rate-limited searcher.
    pub fn build(self) -> Result<RateLimitedSearcher<S>> {
        match self.burst {
            Some(burst) => {
                RateLimitedSearcher::with_burst(self.searcher, self.requests_per_second, burst)
            }
            None => RateLimitedSearcher::new(self.searcher, self.requests_per_second),
        }
    }
}

/// Extension trait for easy rate limiting.
pub trait WebSearcherExt: WebSearcher + Sized {
    /// Wrap this searcher with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> Result<RateLimitedSearcher<Self>> {
        RateLimitedSearcher::new(self, requests_per_second)
    }
}

impl<S: WebSearcher + Sized> WebSearcherExt for S {}
