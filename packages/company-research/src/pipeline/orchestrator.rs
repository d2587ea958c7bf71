//! The research state machine.
//!
//! ```text
//! Planning -> Searching -> Extracting -> Reflecting -> Planning | Done
//! ```
//!
//! Rounds run strictly one after another: each plan depends on the record
//! merged in the previous round. The only concurrency is inside the search
//! executor. Termination is guaranteed by the two budgets; the reflector marks
//! the last reflection the budget allows as sufficient, so a session runs at
//! most `max(max_reflections, 1)` rounds.

use std::collections::HashSet;
use std::future::Future;

use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::executor::SearchExecutor;
use super::extract::{Extractor, MergeOutcome};
use super::gaps::missing_fields;
use super::planner::QueryPlanner;
use super::reflect::Reflector;
use crate::error::Result;
use crate::traits::completion::CompletionService;
use crate::traits::searcher::WebSearcher;
use crate::types::assessment::{CompletenessAssessment, StopReason};
use crate::types::audit::{AuditEvent, AuditTrail};
use crate::types::config::ResearchConfig;
use crate::types::record::CompanyRecord;
use crate::types::search::{SearchQuery, SearchResult};
use crate::types::session::{ResearchBudget, SessionCounters};

/// States of a research session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchState {
    Planning,
    Searching,
    Extracting,
    Reflecting,
    Done(StopReason),
}

/// Inputs to the transition function, gathered after each state runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionSignals {
    /// Caller cancelled or the session deadline passed
    pub cancelled: bool,

    /// Queries planned in the current round
    pub planned_queries: usize,

    /// Verdict of the reflection that just ran
    pub verdict: Option<Verdict>,
}

/// The part of an assessment the transition function looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub sufficient: bool,
    pub stop_reason: Option<StopReason>,
    /// Either budget reached after this reflection
    pub budget_exhausted: Option<StopReason>,
}

impl Verdict {
    fn from_assessment(
        assessment: &CompletenessAssessment,
        budget: &ResearchBudget,
        counters: &SessionCounters,
    ) -> Self {
        Self {
            sufficient: assessment.sufficient,
            stop_reason: assessment.stop_reason,
            budget_exhausted: budget.exhausted(counters),
        }
    }
}

/// Deterministic transition function. No hidden state.
pub fn next_state(current: ResearchState, signals: &TransitionSignals) -> ResearchState {
    if let ResearchState::Done(reason) = current {
        return ResearchState::Done(reason);
    }
    if signals.cancelled {
        return ResearchState::Done(StopReason::Cancelled);
    }

    match current {
        ResearchState::Planning => ResearchState::Searching,
        ResearchState::Searching => ResearchState::Extracting,
        ResearchState::Extracting => ResearchState::Reflecting,
        ResearchState::Reflecting => match signals.verdict {
            Some(v) if v.sufficient => {
                ResearchState::Done(v.stop_reason.unwrap_or(StopReason::Sufficient))
            }
            Some(Verdict {
                budget_exhausted: Some(reason),
                ..
            }) => ResearchState::Done(reason),
            _ if signals.planned_queries == 0 => ResearchState::Done(StopReason::NoProgress),
            _ => ResearchState::Planning,
        },
        ResearchState::Done(reason) => ResearchState::Done(reason),
    }
}

/// The result of a research session.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchOutcome {
    /// Identifier for log correlation
    pub session_id: Uuid,

    /// The best-effort record
    pub record: CompanyRecord,

    /// Every event in chronological order
    pub audit: AuditTrail,

    /// Final counter values
    pub counters: SessionCounters,

    /// Every search result gathered, in arrival order
    pub results: Vec<SearchResult>,

    /// Why the session stopped
    pub stop_reason: StopReason,

    /// Rounds started
    pub rounds: usize,
}

/// Mutable state of one session. Owned by the orchestrator.
struct Session {
    record: CompanyRecord,
    counters: SessionCounters,
    results: Vec<SearchResult>,
    audit: AuditTrail,
    round: usize,
    issued: HashSet<String>,
    planned: Vec<SearchQuery>,
    new_results: usize,
    confidence: Option<f32>,
}

/// Runs research sessions against injected completion and search services.
///
/// # Example
///
/// ```rust,ignore
/// let researcher = Researcher::new(OpenAI::from_env()?, TavilyWebSearcher::new(key), ResearchConfig::default())?;
/// let outcome = researcher.research("Anthropic", Some("AI safety company")).await?;
/// println!("{:?}", outcome.record);
/// ```
pub struct Researcher<A, S> {
    ai: A,
    searcher: S,
    config: ResearchConfig,
    planner: QueryPlanner,
    executor: SearchExecutor,
    extractor: Extractor,
    reflector: Reflector,
}

impl<A: CompletionService, S: WebSearcher> Researcher<A, S> {
    /// Create a researcher. Invalid configuration is rejected here.
    pub fn new(ai: A, searcher: S, config: ResearchConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            planner: QueryPlanner::new(config.queries_per_round),
            executor: SearchExecutor::new(
                config.search_concurrency,
                config.budget.max_results_per_query,
                config.search_timeout,
            ),
            extractor: Extractor::new(
                config.max_results_in_context,
                config.max_chars_per_result,
                config.max_context_chars,
            ),
            reflector: Reflector::new(config.completeness_threshold),
            ai,
            searcher,
            config,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Research a company starting from its name only.
    pub async fn research(&self, company_name: &str, notes: Option<&str>) -> Result<ResearchOutcome> {
        let seed = CompanyRecord::new(company_name)?;
        Ok(self.research_with_cancel(seed, notes, CancellationToken::new()).await)
    }

    /// Research starting from a partially known record.
    pub async fn research_record(
        &self,
        seed: CompanyRecord,
        notes: Option<&str>,
    ) -> Result<ResearchOutcome> {
        Ok(self.research_with_cancel(seed, notes, CancellationToken::new()).await)
    }

    /// Research with a caller-supplied cancellation token.
    ///
    /// Always returns the best-effort record; cancellation ends the session
    /// with [`StopReason::Cancelled`].
    pub async fn research_with_cancel(
        &self,
        seed: CompanyRecord,
        notes: Option<&str>,
        cancel: CancellationToken,
    ) -> ResearchOutcome {
        let session_id = Uuid::new_v4();
        let deadline = self.config.session_timeout.map(|t| Instant::now() + t);
        let budget = self.config.budget;
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());

        info!(
            %session_id,
            company = seed.company_name(),
            max_queries = budget.max_queries,
            max_reflections = budget.max_reflections,
            "Starting research"
        );

        let mut session = Session {
            record: seed,
            counters: SessionCounters::new(),
            results: Vec::new(),
            audit: AuditTrail::new(),
            round: 0,
            issued: HashSet::new(),
            planned: Vec::new(),
            new_results: 0,
            confidence: None,
        };

        let mut state = ResearchState::Planning;
        loop {
            let mut signals = TransitionSignals::default();

            let completed = match state {
                ResearchState::Planning => {
                    self.plan_round(&mut session, notes, &cancel, deadline).await
                }
                ResearchState::Searching => {
                    self.search_round(&mut session, &cancel, deadline).await
                }
                ResearchState::Extracting => {
                    self.extract_round(&mut session, notes, &cancel, deadline).await
                }
                ResearchState::Reflecting => {
                    let assessment = self.reflector.reflect(
                        &session.record,
                        &mut session.counters,
                        &budget,
                        session.confidence,
                    );
                    signals.verdict =
                        Some(Verdict::from_assessment(&assessment, &budget, &session.counters));
                    session.audit.record(session.round, AuditEvent::Assessed(assessment));
                    true
                }
                ResearchState::Done(_) => break,
            };

            signals.cancelled = !completed || is_expired(&cancel, deadline);
            signals.planned_queries = session.planned.len();
            state = next_state(state, &signals);

            if let ResearchState::Done(reason) = state {
                session.audit.record(session.round, AuditEvent::Finished { reason });
            }
        }

        let stop_reason = match state {
            ResearchState::Done(reason) => reason,
            _ => StopReason::Cancelled,
        };

        info!(
            %session_id,
            company = session.record.company_name(),
            reason = stop_reason.as_str(),
            rounds = session.round,
            queries = session.counters.queries_executed(),
            results = session.results.len(),
            failures = session.audit.failure_count(),
            "Research finished"
        );

        ResearchOutcome {
            session_id,
            record: session.record,
            audit: session.audit,
            counters: session.counters,
            results: session.results,
            stop_reason,
            rounds: session.round,
        }
    }

    async fn plan_round(
        &self,
        session: &mut Session,
        notes: Option<&str>,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> bool {
        session.round += 1;
        let missing = missing_fields(&session.record);
        info!(
            company = session.record.company_name(),
            round = session.round,
            missing = missing.len(),
            "Starting research round"
        );
        session.audit.record(
            session.round,
            AuditEvent::RoundStarted {
                missing_fields: missing.clone(),
            },
        );

        let remaining = self.config.budget.queries_remaining(&session.counters);
        let planning = self
            .planner
            .plan(&self.ai, &session.record, notes, &missing, remaining);
        let Some(plan) = until_cancelled(cancel, deadline, planning).await else {
            session.planned.clear();
            return false;
        };

        // Repeats across rounds are flagged, not removed.
        for query in &plan.queries {
            let key = query.query.trim().to_lowercase();
            if !session.issued.insert(key) {
                warn!(query = %query.query, round = session.round, "Query repeats an earlier round");
                session.audit.record(
                    session.round,
                    AuditEvent::RepeatedQuery {
                        query: query.query.clone(),
                    },
                );
            }
        }

        session.audit.record(
            session.round,
            AuditEvent::QueriesPlanned {
                queries: plan.queries.clone(),
                fallback_reason: plan.fallback_reason.clone(),
            },
        );
        session.planned = plan.queries;
        true
    }

    async fn search_round(
        &self,
        session: &mut Session,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> bool {
        let searching = self
            .executor
            .execute(&self.searcher, &session.planned, &mut session.counters);
        let Some(round) = until_cancelled(cancel, deadline, searching).await else {
            session.new_results = 0;
            return false;
        };

        for outcome in round.per_query {
            let event = match outcome.error {
                Some(error) => AuditEvent::SearchFailed {
                    query: outcome.query,
                    error,
                },
                None => AuditEvent::SearchCompleted {
                    query: outcome.query,
                    result_count: outcome.result_count,
                },
            };
            session.audit.record(session.round, event);
        }

        session.new_results = round.results.len();
        session.results.extend(round.results);
        true
    }

    async fn extract_round(
        &self,
        session: &mut Session,
        notes: Option<&str>,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> bool {
        // Nothing new this round: re-extracting old results cannot add facts.
        if session.new_results == 0 {
            debug!(round = session.round, "No new results, skipping extraction");
            session.audit.record(session.round, AuditEvent::ExtractionSkipped);
            return true;
        }

        let extracting = self.extractor.extract_and_merge(
            &self.ai,
            &mut session.record,
            &session.results,
            notes,
        );
        let Some(outcome) = until_cancelled(cancel, deadline, extracting).await else {
            return false;
        };

        let event = match outcome {
            MergeOutcome::Skipped => AuditEvent::ExtractionSkipped,
            MergeOutcome::Merged {
                filled_fields,
                confidence,
            } => {
                if confidence.is_some() {
                    session.confidence = confidence;
                }
                AuditEvent::RecordMerged {
                    filled_fields,
                    confidence,
                }
            }
            MergeOutcome::Failed { error } => AuditEvent::ExtractionFailed { error },
        };
        session.audit.record(session.round, event);
        true
    }
}

fn is_expired(cancel: &CancellationToken, deadline: Option<Instant>) -> bool {
    cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d)
}

/// Run `fut` unless the token fires or the deadline passes first.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    deadline: Option<Instant>,
    fut: F,
) -> Option<F::Output> {
    if is_expired(cancel, deadline) {
        return None;
    }

    let expired = async {
        match deadline {
            Some(d) => tokio::time::sleep_until(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        _ = expired => None,
        out = fut => Some(out),
    }
}
