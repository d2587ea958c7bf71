//! LLM prompts for the research loop.
//!
//! Placeholders use `{name}` and are filled with plain `str::replace`.

use crate::types::record::{CompanyRecord, RecordField};

/// System prompt for query planning.
pub const PLAN_SYSTEM_PROMPT: &str = r#"You are a research assistant planning web searches about a company.
Each query must be specific, include the company name, and target one missing piece of information."#;

/// User prompt for query planning.
pub const PLAN_QUERIES_PROMPT: &str = r#"Company: {company_name}
User notes: {notes}

Information already known:
{known}

Missing information:
{missing}

Generate at most {count} search queries that would find the missing information.
For each query, set "purpose" to the field it targets, using one of:
{field_names}

Output JSON:
{
    "queries": [
        {"query": "Acme Corp founders founding year", "purpose": "founder_names"}
    ]
}"#;

/// System prompt for extraction.
pub const EXTRACT_SYSTEM_PROMPT: &str = r#"You are an expert information extractor.
Only use information explicitly stated in the search results. Use null for anything not stated."#;

/// User prompt for extraction.
pub const EXTRACT_RECORD_PROMPT: &str = r#"Company: {company_name}
User notes: {notes}

Search results:
{results}

Currently known information:
{current}

Extract the company's details from the search results.

Rules:
1. founding_year is a number like 2015, or null
2. founder_names is a list of full names, or null
3. Descriptions are concise but complete
4. Set confidence between 0.0 and 1.0 for how well the results support your answer"#;

/// Build the planning prompt.
pub fn format_plan_prompt(
    record: &CompanyRecord,
    notes: Option<&str>,
    missing: &[RecordField],
    count: usize,
) -> String {
    let missing_lines = missing
        .iter()
        .map(|f| format!("- {} ({})", f.as_str(), f.description()))
        .collect::<Vec<_>>()
        .join("\n");
    let field_names = RecordField::ALL
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    PLAN_QUERIES_PROMPT
        .replace("{company_name}", record.company_name())
        .replace("{notes}", notes.unwrap_or("None"))
        .replace("{known}", &format_known(record))
        .replace("{missing}", &missing_lines)
        .replace("{count}", &count.to_string())
        .replace("{field_names}", &field_names)
}

/// Build the extraction prompt from an already-bounded results block.
pub fn format_extract_prompt(record: &CompanyRecord, notes: Option<&str>, results: &str) -> String {
    EXTRACT_RECORD_PROMPT
        .replace("{company_name}", record.company_name())
        .replace("{notes}", notes.unwrap_or("None"))
        .replace("{results}", results)
        .replace("{current}", &format_known(record))
}

fn format_known(record: &CompanyRecord) -> String {
    serde_json::to_string_pretty(record).unwrap_or_else(|_| record.company_name().to_string())
}
