//! Import command for ingesting device submissions into the local `SQLite` store.

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use sm_core::{IngestOutcome, IngestPolicy, LogSink, LogSubmission, ingest};

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

/// Parses JSONL submissions, validating each before anything is stored.
fn parse_submissions<R: BufRead>(reader: R, policy: &IngestPolicy) -> Result<Vec<LogSubmission>> {
    let mut submissions = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parsed: LogSubmission = serde_json::from_str(trimmed)
            .with_context(|| format!("invalid JSON on line {}", idx + 1))?;
        parsed
            .validate(policy)
            .with_context(|| format!("invalid submission on line {}", idx + 1))?;
        submissions.push(parsed);
    }
    Ok(submissions)
}

/// Ingests every submission in `reader`, in order.
pub fn import<R, S>(reader: R, sink: &S, policy: &IngestPolicy) -> Result<ImportSummary>
where
    R: BufRead,
    S: LogSink + ?Sized,
{
    let submissions = parse_submissions(reader, policy)?;
    let mut summary = ImportSummary::default();
    for submission in &submissions {
        match ingest(sink, submission, policy)? {
            IngestOutcome::Inserted => summary.inserted += 1,
            IngestOutcome::Duplicate => summary.duplicates += 1,
        }
    }
    tracing::debug!(?summary, "import finished");
    Ok(summary)
}

/// Runs the import command over stdin.
pub fn run<S: LogSink + ?Sized>(sink: &S, policy: &IngestPolicy) -> Result<ImportSummary> {
    let stdin = io::stdin();
    let summary = import(stdin.lock(), sink, policy)?;
    println!(
        "Imported {} logs ({} duplicates skipped)",
        summary.inserted, summary.duplicates
    );
    Ok(summary)
}
