use std::path::Path;

use serde::Serialize;

use uirec_core::ids::commit_from_segment;
use uirec_core::Caller;
use uirec_ledger::{Ledger, RecorderConfig};
use uirec_status::StatusResolver;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `uirec status <project> <commit>`
pub fn status(repo_root: &Path, project: &str, commit: &str) -> anyhow::Result<()> {
    let store = Ledger::open(repo_root)?.store()?;
    let resolver = StatusResolver::new(&store, Caller::Trusted);
    print_json(&resolver.commit_status(project, &commit_from_segment(commit))?)
}

/// `uirec branch-status <project> <branch> [-n N]`
pub fn branch_status(
    repo_root: &Path,
    project: &str,
    branch: &str,
    max_entries: Option<usize>,
) -> anyhow::Result<()> {
    let ledger = Ledger::open(repo_root)?;
    let max = match max_entries {
        Some(n) => n,
        None => RecorderConfig::load(&ledger.paths)?.max_entries,
    };
    let store = ledger.store()?;
    let resolver = StatusResolver::new(&store, Caller::Trusted);
    print_json(&resolver.branch_status(project, branch, max)?)
}

/// `uirec recordings <project> <start> <end> [-n N]`
pub fn recordings(
    repo_root: &Path,
    project: &str,
    start: &str,
    end: &str,
    max_entries: Option<usize>,
) -> anyhow::Result<()> {
    let ledger = Ledger::open(repo_root)?;
    let max = match max_entries {
        Some(n) => n,
        None => RecorderConfig::load(&ledger.paths)?.max_entries,
    };
    let store = ledger.store()?;
    let resolver = StatusResolver::new(&store, Caller::Trusted);
    let list = resolver.ranged_recordings(
        project,
        &commit_from_segment(start),
        &commit_from_segment(end),
        max,
    )?;
    if list.is_empty() {
        tracing::warn!(project, start, end, max, "start commit not reached; widen -n");
    }
    print_json(&list)
}
