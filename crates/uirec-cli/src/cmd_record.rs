use std::path::Path;

use uirec_core::{Caller, CommitEvent};
use uirec_ledger::{Ledger, SqliteStore};
use uirec_status::{RecordOutcome, StatusResolver};

/// `uirec record <file>`
pub fn execute(repo_root: &Path, file: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)?;
    let event: CommitEvent = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("invalid commit event in {}: {e}", file.display()))?;

    let store = Ledger::open(repo_root)?.store()?;
    let commit = event.commit_id().to_string();
    match ingest_event(&store, event)? {
        RecordOutcome::Recorded => println!("Recorded {commit}"),
        RecordOutcome::Ignored(reason) => println!("Not recorded {commit}: {reason:?}"),
    }
    Ok(())
}

/// Add the event's commit to the project history, then offer the event
/// for recording. Local commands act as a trusted caller.
pub fn ingest_event(store: &SqliteStore, event: CommitEvent) -> anyhow::Result<RecordOutcome> {
    if store.project_exists(&event.project_id)? {
        store.insert_commit(&event.project_id, &event.commit_object)?;
    }
    let resolver = StatusResolver::new(store, Caller::Trusted);
    Ok(resolver.record_if_eligible(event)?)
}
