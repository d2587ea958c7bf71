//! Query planning: turn the record's gaps into a bounded list of searches.
//!
//! The planner never fails. If the completion service errors, replies with
//! something that does not decode, or yields no usable queries, the round
//! falls back to mechanical queries built from the company name.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

use super::prompts::{format_plan_prompt, PLAN_SYSTEM_PROMPT};
use crate::traits::completion::{complete_structured, CompletionService};
use crate::types::record::{CompanyRecord, RecordField};
use crate::types::search::SearchQuery;

/// Reply shape requested from the completion service.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlannedQueries {
    /// Search queries to run, most useful first
    pub queries: Vec<PlannedQuery>,
}

/// One query proposed by the completion service.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PlannedQuery {
    /// Query text
    pub query: String,

    /// Field the query targets
    pub purpose: String,
}

/// Queries for one round.
#[derive(Debug, Clone, Default)]
pub struct QueryPlan {
    /// Queries to run this round
    pub queries: Vec<SearchQuery>,

    /// Why the planner fell back to mechanical queries, if it did
    pub fallback_reason: Option<String>,
}

impl QueryPlan {
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }
}

/// Plans each round's searches.
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    per_round_cap: usize,
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self { per_round_cap: 3 }
    }
}

impl QueryPlanner {
    /// Create a planner that plans at most `per_round_cap` queries per round.
    pub fn new(per_round_cap: usize) -> Self {
        Self {
            per_round_cap: per_round_cap.max(1),
        }
    }

    /// Plan at most `min(queries_remaining, per_round_cap)` queries.
    ///
    /// Does not call the completion service when the budget is spent or the
    /// record has no gaps.
    pub async fn plan<A>(
        &self,
        ai: &A,
        record: &CompanyRecord,
        notes: Option<&str>,
        missing: &[RecordField],
        queries_remaining: usize,
    ) -> QueryPlan
    where
        A: CompletionService + ?Sized,
    {
        let limit = queries_remaining.min(self.per_round_cap);
        if limit == 0 {
            debug!(company = record.company_name(), "Query budget spent, nothing to plan");
            return QueryPlan::default();
        }
        if missing.is_empty() {
            debug!(company = record.company_name(), "No gaps left, nothing to plan");
            return QueryPlan::default();
        }

        let prompt = format_plan_prompt(record, notes, missing, limit);
        let reason = match complete_structured::<PlannedQueries, _>(ai, PLAN_SYSTEM_PROMPT, &prompt).await {
            Ok(planned) => {
                let queries = usable_queries(planned, limit);
                if !queries.is_empty() {
                    debug!(
                        company = record.company_name(),
                        count = queries.len(),
                        "Planned search queries"
                    );
                    return QueryPlan {
                        queries,
                        fallback_reason: None,
                    };
                }
                "completion returned no usable queries".to_string()
            }
            Err(e) => e.to_string(),
        };

        warn!(
            company = record.company_name(),
            reason = %reason,
            "Query planning failed, using fallback queries"
        );

        QueryPlan {
            queries: fallback_queries(record.company_name(), missing, limit),
            fallback_reason: Some(reason),
        }
    }
}

fn usable_queries(planned: PlannedQueries, limit: usize) -> Vec<SearchQuery> {
    planned
        .queries
        .into_iter()
        .filter(|q| !q.query.trim().is_empty())
        .map(|q| SearchQuery::new(q.query.trim(), q.purpose.trim()))
        .take(limit)
        .collect()
}

/// Mechanical queries built from the company name, one per missing field.
pub fn fallback_queries(company_name: &str, missing: &[RecordField], limit: usize) -> Vec<SearchQuery> {
    let fields: Vec<RecordField> = if missing.is_empty() {
        RecordField::ALL.to_vec()
    } else {
        missing.to_vec()
    };

    fields
        .into_iter()
        .take(limit)
        .map(|field| {
            let query = format!("{} {}", company_name, field.description());
            SearchQuery::for_field(query, field)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockAI, MockAICall};

    fn acme() -> CompanyRecord {
        CompanyRecord::new("Acme").unwrap()
    }

    const PLANNED: &str = r#"{"queries": [
        {"query": "Acme founders", "purpose": "founder_names"},
        {"query": "  ", "purpose": "founding_year"},
        {"query": "Acme Series A", "purpose": "funding_summary"},
        {"query": "Acme customers", "purpose": "notable_customers"},
        {"query": "Acme anvils", "purpose": "product_description"}
    ]}"#;

    #[tokio::test]
    async fn test_zero_budget_skips_completion() {
        let ai = MockAI::new().with_plan_reply(PLANNED);
        let plan = QueryPlanner::default()
            .plan(&ai, &acme(), None, &RecordField::ALL, 0)
            .await;

        assert!(plan.is_empty());
        assert!(ai.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_gaps_skips_completion() {
        let ai = MockAI::new().with_plan_reply(PLANNED);
        let plan = QueryPlanner::default().plan(&ai, &acme(), None, &[], 5).await;

        assert!(plan.is_empty());
        assert!(ai.calls().is_empty());
    }

    #[tokio::test]
    async fn test_plan_respects_cap_and_drops_blank_queries() {
        let ai = MockAI::new().with_plan_reply(PLANNED);
        let plan = QueryPlanner::new(3)
            .plan(&ai, &acme(), None, &RecordField::ALL, 10)
            .await;

        let texts: Vec<&str> = plan.queries.iter().map(|q| q.query.as_str()).collect();
        assert_eq!(texts, vec!["Acme founders", "Acme Series A", "Acme customers"]);
        assert_eq!(plan.queries[0].target, Some(RecordField::FounderNames));
        assert!(plan.fallback_reason.is_none());
        assert!(matches!(ai.calls()[0], MockAICall::Plan { .. }));
    }

    #[tokio::test]
    async fn test_plan_respects_remaining_budget() {
        let ai = MockAI::new().with_plan_reply(PLANNED);
        let plan = QueryPlanner::new(4)
            .plan(&ai, &acme(), None, &RecordField::ALL, 1)
            .await;

        assert_eq!(plan.len(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_reply_falls_back() {
        let ai = MockAI::new().with_plan_reply("Here are some queries: 1. Acme founders");
        let missing = [RecordField::FounderNames, RecordField::FundingSummary];
        let plan = QueryPlanner::new(3).plan(&ai, &acme(), None, &missing, 5).await;

        assert!(plan.fallback_reason.is_some());
        let texts: Vec<&str> = plan.queries.iter().map(|q| q.query.as_str()).collect();
        assert_eq!(texts, vec!["Acme founders", "Acme funding rounds and investors"]);
    }

    #[tokio::test]
    async fn test_completion_error_falls_back() {
        let ai = MockAI::new().failing_plans();
        let plan = QueryPlanner::new(2)
            .plan(&ai, &acme(), None, &RecordField::ALL, 5)
            .await;

        assert_eq!(plan.len(), 2);
        assert!(plan.fallback_reason.unwrap().contains("completion"));
    }

    #[tokio::test]
    async fn test_empty_query_list_falls_back() {
        let ai = MockAI::new().with_plan_reply(r#"{"queries": []}"#);
        let plan = QueryPlanner::new(2)
            .plan(&ai, &acme(), None, &[RecordField::FoundingYear], 5)
            .await;

        assert_eq!(plan.len(), 1);
        assert_eq!(plan.queries[0].query, "Acme founding year");
    }
}
