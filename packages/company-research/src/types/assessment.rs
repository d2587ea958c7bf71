//! Completeness verdicts and the reasons a session stops.

use serde::{Deserialize, Serialize};

use super::record::RecordField;

/// Why a research session reached `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The record met the completeness threshold
    Sufficient,

    /// The reflection budget was used up
    ReflectionBudget,

    /// The query budget was used up
    QueryBudget,

    /// The round planned no queries, so no further progress is possible
    NoProgress,

    /// The caller cancelled or the session deadline passed
    Cancelled,
}

impl StopReason {
    /// Get the reason as a string (for logging).
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Sufficient => "sufficient",
            StopReason::ReflectionBudget => "reflection_budget",
            StopReason::QueryBudget => "query_budget",
            StopReason::NoProgress => "no_progress",
            StopReason::Cancelled => "cancelled",
        }
    }
}

/// Result of one reflection round. Not stored on the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessAssessment {
    /// Whether the session should stop
    pub sufficient: bool,

    /// Filled optional fields / total optional fields
    pub ratio: f32,

    /// Fields still empty, in declaration order
    pub missing_fields: Vec<RecordField>,

    /// Model-reported confidence from the latest extraction
    pub confidence: Option<f32>,

    /// What made the verdict sufficient (threshold or a budget)
    pub stop_reason: Option<StopReason>,

    /// 1-based number of this reflection round
    pub reflection: usize,
}

impl CompletenessAssessment {
    /// Whether another round should run.
    pub fn should_continue(&self) -> bool {
        !self.sufficient
    }
}
