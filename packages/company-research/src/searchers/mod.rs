//! Web searcher implementations.
//!
//! - `TavilyWebSearcher` - Tavily search API
//! - `RateLimitedSearcher` - Wrapper that enforces a request quota

pub mod rate_limited;
pub mod tavily;

pub use rate_limited::{RateLimitedSearcher, RateLimitedSearcherBuilder, WebSearcherExt};
pub use tavily::TavilyWebSearcher;
