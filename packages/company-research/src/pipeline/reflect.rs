//! Completeness reflection: score the record and decide whether to stop.

use tracing::debug;

use super::gaps::{completeness_ratio, missing_fields};
use crate::types::assessment::{CompletenessAssessment, StopReason};
use crate::types::record::CompanyRecord;
use crate::types::session::{ResearchBudget, SessionCounters};

/// Scores the record against a completeness threshold.
#[derive(Debug, Clone)]
pub struct Reflector {
    threshold: f32,
}

impl Default for Reflector {
    fn default() -> Self {
        Self { threshold: 0.6 }
    }
}

impl Reflector {
    /// Create a reflector with a threshold in (0, 1].
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Score the record and count one reflection.
    ///
    /// Sufficient when the ratio meets the threshold, when this is the last
    /// reflection the budget allows, or when the query budget is spent. Reads
    /// the record only.
    pub fn reflect(
        &self,
        record: &CompanyRecord,
        counters: &mut SessionCounters,
        budget: &ResearchBudget,
        confidence: Option<f32>,
    ) -> CompletenessAssessment {
        let ratio = completeness_ratio(record);

        let stop_reason = if ratio >= self.threshold {
            Some(StopReason::Sufficient)
        } else if counters.reflection_count() + 1 >= budget.max_reflections {
            Some(StopReason::ReflectionBudget)
        } else if counters.queries_executed() >= budget.max_queries {
            Some(StopReason::QueryBudget)
        } else {
            None
        };

        counters.record_reflection();

        let assessment = CompletenessAssessment {
            sufficient: stop_reason.is_some(),
            ratio,
            missing_fields: missing_fields(record),
            confidence,
            stop_reason,
            reflection: counters.reflection_count(),
        };

        debug!(
            company = record.company_name(),
            ratio = assessment.ratio,
            sufficient = assessment.sufficient,
            reflection = assessment.reflection,
            "Reflected on completeness"
        );

        assessment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::RecordField;

    fn partial() -> CompanyRecord {
        CompanyRecord::new("Acme").unwrap().with_founding_year(1949)
    }

    fn full() -> CompanyRecord {
        partial()
            .with_founders(["Alice"])
            .with_product_description("Anvils")
            .with_funding_summary("Bootstrapped")
            .with_notable_customers("Coyotes")
    }

    #[test]
    fn test_full_record_is_sufficient() {
        let mut counters = SessionCounters::new();
        let assessment =
            Reflector::default().reflect(&full(), &mut counters, &ResearchBudget::new(5, 3, 3), None);

        assert!(assessment.sufficient);
        assert_eq!(assessment.stop_reason, Some(StopReason::Sufficient));
        assert_eq!(assessment.ratio, 1.0);
        assert_eq!(counters.reflection_count(), 1);
    }

    #[test]
    fn test_partial_record_continues() {
        let mut counters = SessionCounters::new();
        let assessment = Reflector::default().reflect(
            &partial(),
            &mut counters,
            &ResearchBudget::new(5, 3, 3),
            Some(0.4),
        );

        assert!(assessment.should_continue());
        assert_eq!(assessment.missing_fields.len(), 4);
        assert_eq!(assessment.missing_fields[0], RecordField::FounderNames);
        assert_eq!(assessment.confidence, Some(0.4));
        assert_eq!(assessment.reflection, 1);
    }

    #[test]
    fn test_last_reflection_is_sufficient() {
        let budget = ResearchBudget::new(5, 3, 2);
        let mut counters = SessionCounters::new();
        let reflector = Reflector::default();

        assert!(!reflector.reflect(&partial(), &mut counters, &budget, None).sufficient);
        let second = reflector.reflect(&partial(), &mut counters, &budget, None);
        assert!(second.sufficient);
        assert_eq!(second.stop_reason, Some(StopReason::ReflectionBudget));
    }

    #[test]
    fn test_spent_query_budget_is_sufficient() {
        let budget = ResearchBudget::new(2, 3, 5);
        let mut counters = SessionCounters::new();
        counters.record_queries(2);

        let assessment = Reflector::default().reflect(&partial(), &mut counters, &budget, None);
        assert_eq!(assessment.stop_reason, Some(StopReason::QueryBudget));
    }

    #[test]
    fn test_zero_reflection_budget_stops_immediately() {
        let mut counters = SessionCounters::new();
        let assessment = Reflector::default().reflect(
            &partial(),
            &mut counters,
            &ResearchBudget::new(5, 3, 0),
            None,
        );
        assert!(assessment.sufficient);
    }

    #[test]
    fn test_reflection_does_not_mutate_record() {
        let record = partial();
        let before = record.clone();
        let mut counters = SessionCounters::new();
        Reflector::default().reflect(&record, &mut counters, &ResearchBudget::default(), None);
        assert_eq!(record, before);
    }

    #[test]
    fn test_threshold_boundary_is_inclusive() {
        let record = partial().with_founders(["Alice"]).with_product_description("Anvils");
        let mut counters = SessionCounters::new();
        let assessment = Reflector::new(0.6).reflect(
            &record,
            &mut counters,
            &ResearchBudget::new(5, 3, 5),
            None,
        );
        assert_eq!(assessment.stop_reason, Some(StopReason::Sufficient));
    }
}
