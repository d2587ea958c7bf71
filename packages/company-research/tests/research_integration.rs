//! Integration tests for the research loop.
//!
//! These tests drive full sessions against the mock services and check:
//! 1. Termination within the budgets
//! 2. Graceful degradation when providers fail
//! 3. Merge rules across rounds
//! 4. Audit trail ordering
//! 5. Cancellation and session deadlines

use std::sync::Arc;
use std::time::Duration;

use company_research::{
    testing::{MockAI, MockAICall, MockWebSearcher},
    AuditEvent, CancellationToken, CompanyRecord, RecordField, RecordUpdate, ResearchBudget,
    ResearchConfig, ResearchError, Researcher, StopReason,
};

/// Helper to build a researcher over the mocks.
fn researcher(
    ai: MockAI,
    searcher: MockWebSearcher,
    config: ResearchConfig,
) -> Researcher<MockAI, MockWebSearcher> {
    Researcher::new(ai, searcher, config).unwrap()
}

fn count_events(events: &[&AuditEvent], event_type: &str) -> usize {
    events.iter().filter(|e| e.event_type() == event_type).count()
}

#[tokio::test]
async fn test_sufficient_after_first_round() {
    let ai = MockAI::new()
        .with_planned_queries(["Acme founders", "Acme products"])
        .with_extraction(RecordUpdate {
            founding_year: Some(1949),
            founder_names: Some(vec!["Alice".into(), "Bob".into()]),
            product_description: Some("Anvils and rocket skates".into()),
            confidence: Some(0.9),
            ..Default::default()
        });
    let r = researcher(ai, MockWebSearcher::new(), ResearchConfig::balanced());

    let outcome = r.research("Acme", Some("cartoon supplier")).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Sufficient);
    assert_eq!(outcome.rounds, 1);
    assert_eq!(outcome.counters.queries_executed(), 2);
    assert_eq!(outcome.counters.reflection_count(), 1);
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.record.company_name(), "Acme");
    assert_eq!(outcome.record.founding_year, Some(1949));
    assert_eq!(outcome.record.founder_names, vec!["Alice", "Bob"]);

    let assessments = outcome.audit.assessments();
    assert_eq!(assessments.len(), 1);
    assert_eq!(assessments[0].confidence, Some(0.9));
}

#[tokio::test]
async fn test_notes_reach_both_prompts() {
    let ai = Arc::new(MockAI::new().with_planned_queries(["Acme founders"]));
    let r = Researcher::new(
        ai.clone(),
        MockWebSearcher::new(),
        ResearchConfig::default().with_max_reflections(1),
    )
    .unwrap();

    let outcome = r.research("Acme", Some("makes anvils")).await.unwrap();
    assert_eq!(outcome.rounds, 1);

    let calls = ai.calls();
    assert_eq!(calls.len(), 2);
    for call in calls {
        match call {
            MockAICall::Plan { user } | MockAICall::Extract { user } => {
                assert!(user.contains("makes anvils"))
            }
            MockAICall::Other { .. } => panic!("unexpected free-text completion"),
        }
    }
}

#[tokio::test]
async fn test_zero_query_budget_reflects_once() {
    let ai = Arc::new(MockAI::new());
    let searcher = Arc::new(MockWebSearcher::new());
    let r = Researcher::new(
        ai.clone(),
        searcher.clone(),
        ResearchConfig::default().with_max_queries(0),
    )
    .unwrap();

    let outcome = r.research("Acme", None).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::QueryBudget);
    assert_eq!(outcome.counters.queries_executed(), 0);
    assert_eq!(outcome.counters.reflection_count(), 1);
    assert_eq!(outcome.record, CompanyRecord::new("Acme").unwrap());
    assert!(ai.calls().is_empty());
    assert!(searcher.calls().is_empty());
}

#[tokio::test]
async fn test_all_searches_failing_degrades_gracefully() {
    let searcher = Arc::new(MockWebSearcher::new().fail_all());
    let ai = Arc::new(MockAI::new());
    let r = Researcher::new(ai.clone(), searcher.clone(), ResearchConfig::default()).unwrap();

    let outcome = r.research("Acme", None).await.unwrap();

    // Round 1 plans 3 fallback queries, round 2 the 2 the budget has left.
    assert_eq!(outcome.rounds, 2);
    assert_eq!(outcome.stop_reason, StopReason::ReflectionBudget);
    assert_eq!(outcome.counters.queries_executed(), 5);
    assert_eq!(outcome.counters.reflection_count(), 2);
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.record, CompanyRecord::new("Acme").unwrap());

    // Only planning calls: extraction is skipped when a round finds nothing.
    assert_eq!(ai.plan_calls(), 2);
    assert_eq!(ai.extract_calls(), 0);

    let events: Vec<_> = outcome.audit.events().collect();
    assert_eq!(count_events(&events, "search_failed"), 5);
    assert_eq!(count_events(&events, "repeated_query"), 2);
    assert_eq!(count_events(&events, "extraction_skipped"), 2);
}

#[tokio::test]
async fn test_failing_completion_still_searches() {
    let ai = Arc::new(MockAI::new().failing_plans().failing_extractions());
    let r = Researcher::new(
        ai.clone(),
        MockWebSearcher::new(),
        ResearchConfig::default().with_max_reflections(1),
    )
    .unwrap();

    let outcome = r.research("Acme", None).await.unwrap();

    assert_eq!(outcome.counters.queries_executed(), 3);
    assert_eq!(outcome.results.len(), 3);
    assert_eq!(outcome.record, CompanyRecord::new("Acme").unwrap());

    let events: Vec<_> = outcome.audit.events().collect();
    assert_eq!(count_events(&events, "extraction_failed"), 1);
    assert!(outcome.audit.failure_count() >= 2);
}

#[tokio::test]
async fn test_merge_rules_hold_across_rounds() {
    let ai = Arc::new(
        MockAI::new()
            .with_extraction(RecordUpdate {
                founding_year: Some(1949),
                founder_names: Some(vec!["Alice".into()]),
                ..Default::default()
            })
            .with_extraction(RecordUpdate {
                company_name: Some("ACME Corporation".into()),
                founding_year: Some(2001),
                founder_names: Some(vec!["alice".into(), "Bob".into()]),
                ..Default::default()
            }),
    );
    let config = ResearchConfig::default().with_completeness_threshold(1.0);
    let r = Researcher::new(ai.clone(), MockWebSearcher::new(), config).unwrap();

    let outcome = r.research("Acme", None).await.unwrap();

    assert_eq!(outcome.rounds, 2);
    assert_eq!(ai.extract_calls(), 2);
    assert_eq!(outcome.record.company_name(), "Acme");
    assert_eq!(outcome.record.founding_year, Some(1949));
    assert_eq!(outcome.record.founder_names, vec!["Alice", "Bob"]);

    let merged: Vec<_> = outcome
        .audit
        .events()
        .filter_map(|e| match e {
            AuditEvent::RecordMerged { filled_fields, .. } => Some(filled_fields.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        merged,
        vec![
            vec![RecordField::FoundingYear, RecordField::FounderNames],
            vec![],
        ]
    );
}

#[tokio::test]
async fn test_sessions_terminate_within_budgets() {
    for max_reflections in 0..4 {
        for max_queries in 0..7 {
            let budget = ResearchBudget::new(max_queries, 2, max_reflections);
            let r = researcher(
                MockAI::new(),
                MockWebSearcher::new(),
                ResearchConfig::default().with_budget(budget),
            );

            let outcome = r.research("Acme", None).await.unwrap();

            assert!(outcome.counters.reflection_count() <= max_reflections + 1);
            assert!(outcome.counters.reflection_count() >= 1);
            assert!(outcome.counters.queries_executed() <= max_queries);
            assert!(outcome.rounds <= max_reflections.max(1));
        }
    }
}

#[tokio::test]
async fn test_counters_only_grow_across_assessments() {
    let r = researcher(
        MockAI::new(),
        MockWebSearcher::new(),
        ResearchConfig::thorough(),
    );

    let outcome = r.research("Acme", None).await.unwrap();
    let reflections: Vec<usize> = outcome
        .audit
        .assessments()
        .iter()
        .map(|a| a.reflection)
        .collect();

    assert_eq!(reflections, (1..=reflections.len()).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_complete_seed_record_needs_one_round() {
    let seed = CompanyRecord::new("Acme")
        .unwrap()
        .with_founding_year(1949)
        .with_founders(["Alice"])
        .with_product_description("Anvils")
        .with_funding_summary("Bootstrapped")
        .with_notable_customers("Wile E. Coyote");
    let ai = Arc::new(MockAI::new());
    let r = Researcher::new(ai.clone(), MockWebSearcher::new(), ResearchConfig::default()).unwrap();

    let outcome = r.research_record(seed.clone(), None).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Sufficient);
    assert_eq!(outcome.rounds, 1);
    assert_eq!(outcome.counters.queries_executed(), 0);
    assert_eq!(outcome.record, seed);
    assert!(ai.calls().is_empty());
}

#[tokio::test]
async fn test_audit_trail_is_chronological() {
    let r = researcher(
        MockAI::new(),
        MockWebSearcher::new().fail_query("Acme founders"),
        ResearchConfig::default(),
    );

    let outcome = r.research("Acme", None).await.unwrap();
    let entries = outcome.audit.entries();

    assert!(matches!(entries[0].event, AuditEvent::RoundStarted { .. }));
    assert!(matches!(
        entries.last().unwrap().event,
        AuditEvent::Finished { reason } if reason == outcome.stop_reason
    ));
    for pair in entries.windows(2) {
        assert!(pair[0].at <= pair[1].at);
        assert!(pair[0].round <= pair[1].round);
    }
}

#[tokio::test]
async fn test_duplicate_query_in_one_round_audits_each_search() {
    let ai = MockAI::new().with_planned_queries(["Acme founders", "Acme founders"]);
    let searcher = MockWebSearcher::new().fail_first_call("Acme founders");
    let r = researcher(ai, searcher, ResearchConfig::default().with_max_reflections(1));

    let outcome = r.research("Acme", None).await.unwrap();

    assert_eq!(outcome.counters.queries_executed(), 2);
    let events: Vec<_> = outcome.audit.events().collect();
    assert_eq!(count_events(&events, "search_failed"), 1);
    assert_eq!(count_events(&events, "search_completed"), 1);
    assert!(events.iter().any(|e| matches!(
        e,
        AuditEvent::SearchCompleted { query, result_count: 1 } if query == "Acme founders"
    )));
}

#[tokio::test]
async fn test_stored_record_with_blank_name_cannot_seed_a_session() {
    let stored = r#"{"company_name":"  ","founding_year":1949,"founder_names":[],
        "product_description":null,"funding_summary":null,"notable_customers":null}"#;

    let err = serde_json::from_str::<CompanyRecord>(stored).unwrap_err();
    assert!(err.to_string().contains("company name must not be empty"));

    let loaded: CompanyRecord = serde_json::from_str(&stored.replace("\"  \"", "\"Acme\"")).unwrap();
    assert_eq!(loaded.company_name(), "Acme");
    assert_eq!(loaded.founding_year, Some(1949));
}

#[tokio::test]
async fn test_outcome_serializes() {
    let r = researcher(MockAI::new(), MockWebSearcher::new(), ResearchConfig::quick());

    let outcome = r.research("Acme", None).await.unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["record"]["company_name"], "Acme");
    assert!(json["audit"]["entries"].is_array());
    assert_eq!(json["stop_reason"], outcome.stop_reason.as_str());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let ai = Arc::new(MockAI::new());
    let r = Researcher::new(ai.clone(), MockWebSearcher::new(), ResearchConfig::default()).unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let seed = CompanyRecord::new("Acme").unwrap().with_founding_year(1949);
    let outcome = r.research_with_cancel(seed.clone(), None, token).await;

    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert_eq!(outcome.record, seed);
    assert_eq!(outcome.counters.reflection_count(), 0);
    assert!(ai.calls().is_empty());
}

#[tokio::test]
async fn test_session_deadline_stops_slow_searches() {
    let searcher = MockWebSearcher::new().with_delay(Duration::from_millis(500));
    let config = ResearchConfig::default().with_session_timeout(Duration::from_millis(50));
    let r = researcher(MockAI::new(), searcher, config);

    let outcome = r.research("Acme", None).await.unwrap();

    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.record.company_name(), "Acme");
}

#[tokio::test]
async fn test_invalid_inputs_are_rejected_up_front() {
    let err = Researcher::new(
        MockAI::new(),
        MockWebSearcher::new(),
        ResearchConfig::default().with_search_concurrency(0),
    )
    .err()
    .unwrap();
    assert!(matches!(err, ResearchError::Config(_)));

    let r = researcher(MockAI::new(), MockWebSearcher::new(), ResearchConfig::default());
    let err = r.research("   ", None).await.unwrap_err();
    assert!(matches!(err, ResearchError::InvalidEntity { .. }));
}
