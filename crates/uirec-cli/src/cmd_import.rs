use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use uirec_core::{CommitEvent, CommitId, CommitObject, CoreObjects, ObjectKind};
use uirec_ledger::{CommitGraph, Ledger, SqliteStore};
use uirec_status::RecordOutcome;

use crate::cmd_record::ingest_event;

/// A project history as exported from the version-control engine.
#[derive(Debug, Deserialize)]
pub struct HistoryFile {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub commits: Vec<CommitObject>,
    /// Branch name → tip commit.
    #[serde(default)]
    pub branches: BTreeMap<String, CommitId>,
    #[serde(default)]
    pub objects: CoreObjects,
    /// Commit events, offered for recording in order.
    #[serde(default)]
    pub events: Vec<CommitEvent>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub commits: usize,
    pub branches: usize,
    pub objects: usize,
    pub recorded: usize,
    pub ignored: usize,
}

/// `uirec import <file>`
pub fn execute(repo_root: &Path, file: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(file)?;
    let history: HistoryFile = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("invalid history file {}: {e}", file.display()))?;

    let store = Ledger::open(repo_root)?.store()?;
    let summary = import(&store, history)?;
    println!(
        "Imported {} commits, {} branches, {} objects; {} recordings written, {} events ignored",
        summary.commits, summary.branches, summary.objects, summary.recorded, summary.ignored
    );
    Ok(())
}

pub fn import(store: &SqliteStore, history: HistoryFile) -> anyhow::Result<ImportSummary> {
    let project_id = store.create_project(&history.owner, &history.name)?;
    for user in &history.members {
        store.add_member(&project_id, user)?;
    }

    let mut summary = ImportSummary::default();
    for commit in &history.commits {
        store.insert_commit(&project_id, commit)?;
        summary.commits += 1;
    }
    for (hash, object) in &history.objects {
        match ObjectKind::of(object) {
            ObjectKind::Full => store.insert_full_object(&project_id, hash, object)?,
            ObjectKind::Patch => store.insert_patch_object(&project_id, hash, object)?,
        }
        summary.objects += 1;
    }
    for (branch, tip) in &history.branches {
        store.set_branch(&project_id, branch, tip)?;
        summary.branches += 1;
    }

    for event in history.events {
        if event.project_id != project_id {
            anyhow::bail!(
                "event for {} belongs to '{}', not '{project_id}'",
                event.commit_id(),
                event.project_id
            );
        }
        match ingest_event(store, event)? {
            RecordOutcome::Recorded => summary.recorded += 1,
            RecordOutcome::Ignored(_) => summary.ignored += 1,
        }
    }
    tracing::info!(project_id = %project_id, ?summary, "history imported");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uirec_core::{BranchStatus, Caller};
    use uirec_status::StatusResolver;

    /// `init ← m1 ← m2NoCommitInit ← m3OtherUser ← m4OtherUser`, with
    /// local edits at m1, m3 and m4 and a remote commit at m2.
    fn history() -> HistoryFile {
        let commit = |id: &str, parent: Option<&str>| {
            json!({"_id": id, "root": format!("{id}-root"), "parents": parent.into_iter().collect::<Vec<_>>()})
        };
        let event = |id: &str, parent: &str, local: bool| {
            json!({
                "projectId": "guest+withRec",
                "commitObject": commit(id, Some(parent)),
                "coreObjects": {},
                "changedNodes": {"update": {}},
                "local": local,
                "uiState": {"myState": id}
            })
        };
        serde_json::from_value(json!({
            "owner": "guest",
            "name": "withRec",
            "members": ["alice"],
            "commits": [commit("#init", None)],
            "branches": {"master": "#m4OtherUser"},
            "objects": {"#patch1": {"type": "patch"}, "#init-root": {"_id": "#init-root"}},
            "events": [
                event("#m1", "#init", true),
                event("#m2NoCommitInit", "#m1", false),
                event("#m3OtherUser", "#m2NoCommitInit", true),
                event("#m4OtherUser", "#m3OtherUser", true)
            ]
        }))
        .unwrap()
    }

    #[test]
    fn import_builds_the_replay_fixture() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteStore::open_or_create(&tmp.path().join("recordings.db")).unwrap();

        let summary = import(&store, history()).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                commits: 1,
                branches: 1,
                objects: 2,
                recorded: 3,
                ignored: 1
            }
        );
        assert_eq!(
            store.get_object("guest+withRec", "#patch1").unwrap().map(|(k, _)| k),
            Some(ObjectKind::Patch)
        );
        assert_eq!(
            store.get_object("guest+withRec", "#init-root").unwrap().map(|(k, _)| k),
            Some(ObjectKind::Full)
        );

        let resolver = StatusResolver::new(&store, Caller::Trusted);
        assert_eq!(
            resolver.branch_status("guest+withRec", "master", 100).unwrap(),
            BranchStatus::found(1, 0, "#m4OtherUser".into())
        );
        let range = resolver
            .ranged_recordings("guest+withRec", "#m1", "#m4OtherUser", 100)
            .unwrap();
        let states: Vec<_> = range.iter().map(|r| r.ui_state.get("myState").cloned()).collect();
        assert_eq!(
            states,
            vec![
                Some(json!("#m1")),
                None,
                Some(json!("#m3OtherUser")),
                Some(json!("#m4OtherUser"))
            ]
        );
    }

    #[test]
    fn foreign_event_aborts_import() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteStore::open_or_create(&tmp.path().join("recordings.db")).unwrap();
        let mut history = history();
        history.events[0].project_id = "guest+other".into();
        assert!(import(&store, history).is_err());
    }
}
