//! Chronological record of everything a session did.
//!
//! Recovered failures (failed searches, planner fallbacks, undecodable
//! extractions) are never raised; they land here instead so callers can judge
//! how much to trust the final record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assessment::{CompletenessAssessment, StopReason};
use super::record::RecordField;
use super::search::SearchQuery;

/// A timestamped audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the event happened
    pub at: DateTime<Utc>,

    /// Round number (1-based)
    pub round: usize,

    /// What happened
    pub event: AuditEvent,
}

/// Events recorded during a research session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A new plan/search/extract/reflect round began
    RoundStarted { missing_fields: Vec<RecordField> },

    /// The planner produced this round's queries
    QueriesPlanned {
        queries: Vec<SearchQuery>,
        /// Set when the planner fell back to mechanical queries
        fallback_reason: Option<String>,
    },

    /// A query text was already issued in an earlier round
    RepeatedQuery { query: String },

    /// A search returned results
    SearchCompleted { query: String, result_count: usize },

    /// A search failed or timed out; its results were treated as empty
    SearchFailed { query: String, error: String },

    /// Extraction ran and merged into the record
    RecordMerged {
        filled_fields: Vec<RecordField>,
        confidence: Option<f32>,
    },

    /// Extraction was skipped because the round produced no results
    ExtractionSkipped,

    /// Extraction failed; the record was left unchanged
    ExtractionFailed { error: String },

    /// The reflector scored the record
    Assessed(CompletenessAssessment),

    /// The session reached `Done`
    Finished { reason: StopReason },
}

impl AuditEvent {
    /// Get the event type as a string (for logging).
    pub fn event_type(&self) -> &'static str {
        match self {
            AuditEvent::RoundStarted { .. } => "round_started",
            AuditEvent::QueriesPlanned { .. } => "queries_planned",
            AuditEvent::RepeatedQuery { .. } => "repeated_query",
            AuditEvent::SearchCompleted { .. } => "search_completed",
            AuditEvent::SearchFailed { .. } => "search_failed",
            AuditEvent::RecordMerged { .. } => "record_merged",
            AuditEvent::ExtractionSkipped => "extraction_skipped",
            AuditEvent::ExtractionFailed { .. } => "extraction_failed",
            AuditEvent::Assessed(_) => "assessed",
            AuditEvent::Finished { .. } => "finished",
        }
    }

    /// Whether this event records a recovered failure.
    pub fn is_failure(&self) -> bool {
        match self {
            AuditEvent::SearchFailed { .. } | AuditEvent::ExtractionFailed { .. } => true,
            AuditEvent::QueriesPlanned {
                fallback_reason, ..
            } => fallback_reason.is_some(),
            _ => false,
        }
    }
}

/// Append-only list of audit entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    /// Create an empty trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event stamped with the current time.
    pub fn record(&mut self, round: usize, event: AuditEvent) {
        self.entries.push(AuditEntry {
            at: Utc::now(),
            round,
            event,
        });
    }

    /// All entries in chronological order.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Iterate over the events only.
    pub fn events(&self) -> impl Iterator<Item = &AuditEvent> {
        self.entries.iter().map(|e| &e.event)
    }

    /// Every assessment made during the session.
    pub fn assessments(&self) -> Vec<&CompletenessAssessment> {
        self.events()
            .filter_map(|e| match e {
                AuditEvent::Assessed(assessment) => Some(assessment),
                _ => None,
            })
            .collect()
    }

    /// Number of recovered failures.
    pub fn failure_count(&self) -> usize {
        self.events().filter(|e| e.is_failure()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
