//! Iterative Company Research Library
//!
//! Fills a fixed company profile (founding year, founders, products,
//! funding, notable customers) by looping over web search and a language
//! model until the profile is complete enough or a budget runs out.
//!
//! # Design Philosophy
//!
//! **Bounded, best-effort research**
//!
//! - Every session terminates: query and reflection budgets are hard limits
//! - Provider failures degrade the record, they never abort the session
//! - Known facts are never overwritten; lists only grow
//! - Model replies decode strictly against a schema or count as failures
//!
//! # Usage
//!
//! ```rust,ignore
//! use company_research::{Researcher, ResearchConfig, TavilyWebSearcher};
//! use company_research::ai::OpenAI;
//!
//! let researcher = Researcher::new(
//!     OpenAI::from_env()?,
//!     TavilyWebSearcher::from_env()?,
//!     ResearchConfig::balanced(),
//! )?;
//!
//! let outcome = researcher.research("Anthropic", Some("AI safety company")).await?;
//! println!("{}", serde_json::to_string_pretty(&outcome.record)?);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (CompletionService, WebSearcher)
//! - [`types`] - Record, query, budget and audit types
//! - [`pipeline`] - Planner, executor, extractor, reflector and the state machine
//! - [`searchers`] - Search provider implementations (Tavily, rate limiting)
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod schema;
pub mod searchers;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{ResearchError, Result};
pub use schema::StructuredOutput;
pub use traits::{
    completion::{complete_structured, decode_strict, CompletionService, Prompt, ResponseSchema},
    searcher::{SearchHit, WebSearcher},
};
pub use types::{
    assessment::{CompletenessAssessment, StopReason},
    audit::{AuditEntry, AuditEvent, AuditTrail},
    config::ResearchConfig,
    record::{CompanyRecord, RecordField, RecordUpdate},
    search::{SearchQuery, SearchResult},
    session::{ResearchBudget, SessionCounters},
};

// Re-export pipeline components
pub use pipeline::{
    // State machine
    next_state, ResearchOutcome, ResearchState, Researcher,
    // Stages
    completeness_ratio, missing_fields, Extractor, MergeOutcome, QueryPlan, QueryPlanner,
    QueryOutcome, Reflector, RoundResults, SearchExecutor,
};

// Re-export searchers
pub use searchers::{RateLimitedSearcher, TavilyWebSearcher, WebSearcherExt};

// Re-export security
pub use security::{ProviderCredentials, SecretString};

// Re-export testing utilities
pub use testing::{MockAI, MockWebSearcher};

// Re-export for callers that cancel sessions
pub use tokio_util::sync::CancellationToken;
