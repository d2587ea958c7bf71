//! Configuration for research sessions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::session::ResearchBudget;
use crate::error::{ResearchError, Result};

/// Configuration for a research session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Query, result and reflection budgets.
    pub budget: ResearchBudget,

    /// Maximum queries planned in a single round.
    ///
    /// Bounds prompt and search cost per round. Default: 3.
    pub queries_per_round: usize,

    /// Maximum searches in flight at once, independent of query count.
    ///
    /// Default: 4.
    pub search_concurrency: usize,

    /// Time limit for a single search call. Default: 30s.
    #[serde(with = "duration_secs")]
    pub search_timeout: Duration,

    /// Completeness ratio at which the record counts as sufficient.
    ///
    /// Must be in (0, 1]. Default: 0.6.
    pub completeness_threshold: f32,

    /// Most recent results shown to the extractor. Default: 20.
    pub max_results_in_context: usize,

    /// Characters kept from each result's content. Default: 500.
    pub max_chars_per_result: usize,

    /// Total characters of result text per extraction prompt. Default: 12 000.
    pub max_context_chars: usize,

    /// Wall-clock limit for the whole session, checked between states.
    #[serde(default, with = "option_duration_secs")]
    pub session_timeout: Option<Duration>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            budget: ResearchBudget::default(),
            queries_per_round: 3,
            search_concurrency: 4,
            search_timeout: Duration::from_secs(30),
            completeness_threshold: 0.6,
            max_results_in_context: 20,
            max_chars_per_result: 500,
            max_context_chars: 12_000,
            session_timeout: None,
        }
    }
}

impl ResearchConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Few queries, one reflection.
    pub fn quick() -> Self {
        Self::default().with_budget(ResearchBudget::new(3, 2, 1))
    }

    /// The everyday preset.
    pub fn balanced() -> Self {
        Self::default().with_budget(ResearchBudget::new(6, 3, 2))
    }

    /// More queries and reflections for hard-to-find companies.
    pub fn thorough() -> Self {
        Self::default().with_budget(ResearchBudget::new(10, 5, 3))
    }

    /// Look up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "quick" => Some(Self::quick()),
            "balanced" => Some(Self::balanced()),
            "thorough" => Some(Self::thorough()),
            "default" => Some(Self::default()),
            _ => None,
        }
    }

    /// Set the budget.
    pub fn with_budget(mut self, budget: ResearchBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Set the total query budget.
    pub fn with_max_queries(mut self, max: usize) -> Self {
        self.budget.max_queries = max;
        self
    }

    /// Set results requested per query.
    pub fn with_max_results_per_query(mut self, max: usize) -> Self {
        self.budget.max_results_per_query = max;
        self
    }

    /// Set the reflection budget.
    pub fn with_max_reflections(mut self, max: usize) -> Self {
        self.budget.max_reflections = max;
        self
    }

    /// Set the per-round query cap.
    pub fn with_queries_per_round(mut self, cap: usize) -> Self {
        self.queries_per_round = cap;
        self
    }

    /// Set search concurrency.
    pub fn with_search_concurrency(mut self, concurrency: usize) -> Self {
        self.search_concurrency = concurrency;
        self
    }

    /// Set the per-search timeout.
    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// Set the completeness threshold.
    pub fn with_completeness_threshold(mut self, threshold: f32) -> Self {
        self.completeness_threshold = threshold;
        self
    }

    /// Set the session deadline.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    /// Reject configurations a session cannot make progress with.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.budget.max_results_per_query == 0 {
            errors.push("max_results_per_query must be at least 1");
        }
        if self.queries_per_round == 0 {
            errors.push("queries_per_round must be at least 1");
        }
        if self.search_concurrency == 0 {
            errors.push("search_concurrency must be at least 1");
        }
        if !(self.completeness_threshold > 0.0 && self.completeness_threshold <= 1.0) {
            errors.push("completeness_threshold must be in (0, 1]");
        }
        if self.max_results_in_context == 0
            || self.max_chars_per_result == 0
            || self.max_context_chars == 0
        {
            errors.push("extraction context limits must be at least 1");
        }
        if self.search_timeout.is_zero() {
            errors.push("search_timeout must be positive");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ResearchError::Config(errors.join(", ")))
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

mod option_duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|v| v.map(Duration::from_secs))
    }
}
