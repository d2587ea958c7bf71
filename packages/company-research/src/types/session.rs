//! Session budgets and the counters checked against them.

use serde::{Deserialize, Serialize};

use super::assessment::StopReason;

/// Fixed upper bounds for one research session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchBudget {
    /// Total search queries the session may issue
    pub max_queries: usize,

    /// Results requested from the provider per query
    pub max_results_per_query: usize,

    /// Reflection rounds before the session must stop
    pub max_reflections: usize,
}

impl Default for ResearchBudget {
    fn default() -> Self {
        Self {
            max_queries: 5,
            max_results_per_query: 3,
            max_reflections: 2,
        }
    }
}

impl ResearchBudget {
    /// Create a budget.
    pub fn new(max_queries: usize, max_results_per_query: usize, max_reflections: usize) -> Self {
        Self {
            max_queries,
            max_results_per_query,
            max_reflections,
        }
    }

    /// Queries still available given the counters.
    pub fn queries_remaining(&self, counters: &SessionCounters) -> usize {
        self.max_queries.saturating_sub(counters.queries_executed())
    }

    /// Which budget has been reached, if any. The query budget is reported
    /// first when both are.
    pub fn exhausted(&self, counters: &SessionCounters) -> Option<StopReason> {
        if counters.queries_executed() >= self.max_queries {
            Some(StopReason::QueryBudget)
        } else if counters.reflection_count() >= self.max_reflections {
            Some(StopReason::ReflectionBudget)
        } else {
            None
        }
    }

    /// Whether either budget has been reached.
    pub fn is_exhausted(&self, counters: &SessionCounters) -> bool {
        self.exhausted(counters).is_some()
    }
}

/// Monotonic counters for one session.
///
/// The fields are private so the only way to change them is to add.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounters {
    queries_executed: usize,
    reflection_count: usize,
}

impl SessionCounters {
    /// Fresh counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries dispatched so far, including failed ones.
    pub fn queries_executed(&self) -> usize {
        self.queries_executed
    }

    /// Reflection rounds completed so far.
    pub fn reflection_count(&self) -> usize {
        self.reflection_count
    }

    /// Count a round's queries.
    pub(crate) fn record_queries(&mut self, count: usize) {
        self.queries_executed = self.queries_executed.saturating_add(count);
    }

    /// Count one reflection round.
    pub(crate) fn record_reflection(&mut self) {
        self.reflection_count = self.reflection_count.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries_remaining_saturates() {
        let budget = ResearchBudget::new(3, 3, 2);
        let mut counters = SessionCounters::new();
        assert_eq!(budget.queries_remaining(&counters), 3);

        counters.record_queries(2);
        assert_eq!(budget.queries_remaining(&counters), 1);

        counters.record_queries(4);
        assert_eq!(budget.queries_remaining(&counters), 0);
    }

    #[test]
    fn test_exhaustion() {
        let budget = ResearchBudget::new(2, 3, 1);
        let mut counters = SessionCounters::new();
        assert!(!budget.is_exhausted(&counters));

        counters.record_reflection();
        assert!(budget.is_exhausted(&counters));
        assert_eq!(budget.exhausted(&counters), Some(StopReason::ReflectionBudget));

        counters.record_queries(2);
        assert_eq!(budget.exhausted(&counters), Some(StopReason::QueryBudget));

        let zero = ResearchBudget::new(0, 3, 5);
        assert!(zero.is_exhausted(&SessionCounters::new()));
    }
}
