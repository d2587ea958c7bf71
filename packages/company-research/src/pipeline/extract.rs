//! Extraction and merge: search results in, record fields out.
//!
//! The context shown to the model is bounded on three axes (number of
//! results, characters per result, total characters) so prompt size does not
//! grow with the session. The stored result collection is never trimmed.

use tracing::{debug, warn};

use super::prompts::{format_extract_prompt, EXTRACT_SYSTEM_PROMPT};
use crate::traits::completion::{complete_structured, CompletionService};
use crate::types::record::{CompanyRecord, RecordField, RecordUpdate};
use crate::types::search::SearchResult;

/// What one extraction step did to the record.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// No results to extract from; no completion call was made
    Skipped,

    /// The update was merged
    Merged {
        /// Fields that went from empty to filled
        filled_fields: Vec<RecordField>,
        /// Confidence reported by the model
        confidence: Option<f32>,
    },

    /// Completion or decoding failed; the record is unchanged
    Failed { error: String },
}

/// Extracts record updates from search results and merges them.
#[derive(Debug, Clone)]
pub struct Extractor {
    max_results: usize,
    max_chars_per_result: usize,
    max_context_chars: usize,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            max_results: 20,
            max_chars_per_result: 500,
            max_context_chars: 12_000,
        }
    }
}

impl Extractor {
    /// Create an extractor with explicit context limits.
    pub fn new(max_results: usize, max_chars_per_result: usize, max_context_chars: usize) -> Self {
        Self {
            max_results,
            max_chars_per_result,
            max_context_chars,
        }
    }

    /// Extract from `results` and merge into `record`.
    ///
    /// Never returns an error: failures leave the record untouched and come
    /// back as [`MergeOutcome::Failed`].
    pub async fn extract_and_merge<A>(
        &self,
        ai: &A,
        record: &mut CompanyRecord,
        results: &[SearchResult],
        notes: Option<&str>,
    ) -> MergeOutcome
    where
        A: CompletionService + ?Sized,
    {
        if results.is_empty() {
            debug!(company = record.company_name(), "No results to extract from");
            return MergeOutcome::Skipped;
        }

        let context = self.build_context(results);
        let prompt = format_extract_prompt(record, notes, &context);

        match complete_structured::<RecordUpdate, _>(ai, EXTRACT_SYSTEM_PROMPT, &prompt).await {
            Ok(update) => {
                let confidence = update.clone().sanitized().confidence;
                let filled_fields = record.apply_update(update);
                debug!(
                    company = record.company_name(),
                    filled = ?filled_fields,
                    confidence = ?confidence,
                    "Merged extraction"
                );
                MergeOutcome::Merged {
                    filled_fields,
                    confidence,
                }
            }
            Err(e) => {
                warn!(
                    company = record.company_name(),
                    error = %e,
                    "Extraction failed, record unchanged"
                );
                MergeOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Format the most recent results into a bounded text block.
    pub fn build_context(&self, results: &[SearchResult]) -> String {
        let start = results.len().saturating_sub(self.max_results);
        let mut context = String::new();

        for result in &results[start..] {
            let block = format!(
                "Query: {}\nTitle: {}\nURL: {}\nContent: {}\n---\n",
                result.query,
                result.title,
                result.url,
                truncate_to_char_boundary(&result.content, self.max_chars_per_result),
            );

            let room = self.max_context_chars.saturating_sub(context.len());
            if room == 0 {
                break;
            }
            context.push_str(truncate_to_char_boundary(&block, room));
        }

        context
    }
}

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
