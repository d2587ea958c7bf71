//! Rendering research outcomes for the terminal and for files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use company_research::{RecordField, ResearchOutcome};

/// One-screen summary of an outcome.
pub fn summary(outcome: &ResearchOutcome) -> String {
    let record = &outcome.record;
    let mut lines = vec![
        format!("Company: {}", record.company_name()),
        format!(
            "Founded: {}",
            record
                .founding_year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "unknown".into())
        ),
        format!(
            "Founders: {}",
            if record.founder_names.is_empty() {
                "unknown".to_string()
            } else {
                record.founder_names.join(", ")
            }
        ),
    ];
    for (label, value) in [
        ("Products", &record.product_description),
        ("Funding", &record.funding_summary),
        ("Customers", &record.notable_customers),
    ] {
        lines.push(format!("{label}: {}", value.as_deref().unwrap_or("unknown")));
    }

    let filled = RecordField::ALL.iter().filter(|f| record.is_filled(**f)).count();
    lines.push(format!(
        "Stopped: {} after {} round(s), {} queries, {}/{} fields",
        outcome.stop_reason.as_str(),
        outcome.rounds,
        outcome.counters.queries_executed(),
        filled,
        RecordField::ALL.len(),
    ));

    lines.join("\n")
}

/// Write outcomes as one pretty JSON document, or one JSON object per line.
pub fn write_outcomes(path: &Path, outcomes: &[ResearchOutcome], jsonl: bool) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    if jsonl {
        for outcome in outcomes {
            serde_json::to_writer(&mut writer, outcome)?;
            writer.write_all(b"\n")?;
        }
    } else if let [single] = outcomes {
        serde_json::to_writer_pretty(&mut writer, single)?;
    } else {
        serde_json::to_writer_pretty(&mut writer, outcomes)?;
    }

    writer.flush()?;
    Ok(())
}

/// Company names from a batch file: one per line, blanks and `#` comments skipped.
pub fn read_batch(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use company_research::{MockAI, MockWebSearcher, ResearchConfig, Researcher};

    async fn outcome(name: &str) -> ResearchOutcome {
        Researcher::new(MockAI::new(), MockWebSearcher::new(), ResearchConfig::quick())
            .unwrap()
            .research(name, None)
            .await
            .unwrap()
    }

    #[test]
    fn test_read_batch_skips_blanks_and_comments() {
        let names = read_batch("Acme\n\n# later\n  Globex  \n");
        assert_eq!(names, vec!["Acme", "Globex"]);
    }

    #[tokio::test]
    async fn test_summary_mentions_unknowns() {
        let text = summary(&outcome("Acme").await);
        assert!(text.contains("Company: Acme"));
        assert!(text.contains("Founded: unknown"));
        assert!(text.contains("0/5 fields"));
    }

    #[tokio::test]
    async fn test_jsonl_writes_one_line_per_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let outcomes = vec![outcome("Acme").await, outcome("Globex").await];

        write_outcomes(&path, &outcomes, true).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["record"]["company_name"], "Acme");
    }
}
