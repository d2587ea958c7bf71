//! Research pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Gap analysis (which record fields are still empty)
//! - Query planning (completion service, with mechanical fallback)
//! - Search execution (bounded concurrent fan-out per round)
//! - Extraction and merge (fill-if-empty, list union)
//! - Completeness reflection (threshold and budget checks)

pub mod executor;
pub mod extract;
pub mod gaps;
pub mod orchestrator;
pub mod planner;
pub mod prompts;
pub mod reflect;

pub use executor::{QueryOutcome, RoundResults, SearchExecutor, SearchFailure};
pub use extract::{truncate_to_char_boundary, Extractor, MergeOutcome};
pub use gaps::{completeness_ratio, missing_fields};
pub use orchestrator::{
    next_state, ResearchOutcome, ResearchState, Researcher, TransitionSignals, Verdict,
};
pub use planner::{fallback_queries, PlannedQueries, PlannedQuery, QueryPlan, QueryPlanner};
pub use prompts::{
    format_extract_prompt, format_plan_prompt, EXTRACT_RECORD_PROMPT, EXTRACT_SYSTEM_PROMPT,
    PLAN_QUERIES_PROMPT, PLAN_SYSTEM_PROMPT,
};
pub use reflect::Reflector;
