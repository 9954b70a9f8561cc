//! Answers the three replay questions over a recording store, and writes
//! recordings for eligible commit events.

use uirec_core::{
    is_recordable, BranchStatus, BranchTip, Caller, CommitEvent, CommitStatus, IgnoreReason, Recording,
    RecorderError,
};
use uirec_ledger::{ancestors, CommitGraph, ProjectAccess, RecordingRepo};

/// Everything the resolver needs from storage.
pub trait RecorderBackend: CommitGraph + RecordingRepo + ProjectAccess {}

impl<T: CommitGraph + RecordingRepo + ProjectAccess + ?Sized> RecorderBackend for T {}

/// Result of offering a commit event to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    Ignored(IgnoreReason),
}

/// Status queries on behalf of one caller.
pub struct StatusResolver<'a, S: ?Sized> {
    store: &'a S,
    caller: Caller,
}

impl<'a, S: RecorderBackend + ?Sized> StatusResolver<'a, S> {
    pub fn new(store: &'a S, caller: Caller) -> Self {
        Self { store, caller }
    }

    fn authorize(&self, project_id: &str) -> Result<(), RecorderError> {
        if self.store.can_access(project_id, &self.caller)? {
            Ok(())
        } else {
            tracing::debug!(project_id, caller = ?self.caller, "access denied");
            Err(RecorderError::not_authorized(project_id))
        }
    }

    /// Store the event as a recording if it is a local edit with a node diff.
    ///
    /// Ineligible events are dropped before any access check or storage work.
    pub fn record_if_eligible(&self, event: CommitEvent) -> Result<RecordOutcome, RecorderError> {
        if let Err(reason) = is_recordable(&event) {
            tracing::debug!(commit = event.commit_id(), ?reason, "commit not recorded");
            return Ok(RecordOutcome::Ignored(reason));
        }
        self.authorize(&event.project_id)?;

        let recording = match event.into_recording() {
            Ok(r) => r,
            Err(reason) => return Ok(RecordOutcome::Ignored(reason)),
        };
        self.store.upsert_recording(&recording)?;
        tracing::info!(
            project_id = %recording.project_id,
            commit = %recording.commit_id,
            "recording stored"
        );
        Ok(RecordOutcome::Recorded)
    }

    /// Whether `commit_id` has a recording. Unknown commits simply have none.
    pub fn commit_status(
        &self,
        project_id: &str,
        commit_id: &str,
    ) -> Result<CommitStatus, RecorderError> {
        self.authorize(project_id)?;
        let exists = self.store.has_recording(project_id, commit_id)?;
        Ok(CommitStatus { exists })
    }

    /// Walk back from the branch tip to the nearest recorded commit, looking
    /// at no more than `max_entries` commits.
    pub fn branch_status(
        &self,
        project_id: &str,
        branch: &str,
        max_entries: usize,
    ) -> Result<BranchStatus, RecorderError> {
        self.authorize(project_id)?;

        let Some(tip) = self.store.branch_tip(project_id, branch)? else {
            return Ok(BranchStatus::missing());
        };

        let mut total = 0;
        for commit in ancestors(self.store, project_id, &tip) {
            if total == max_entries {
                return Ok(BranchStatus::not_found(max_entries));
            }
            let commit = commit?;
            total += 1;
            if self.store.has_recording(project_id, &commit.id)? {
                return Ok(BranchStatus::found(total, total - 1, commit.id));
            }
        }

        Ok(BranchStatus::not_found(total))
    }

    pub fn branch_tip(&self, project_id: &str, branch: &str) -> Result<BranchTip, RecorderError> {
        self.authorize(project_id)?;
        let commit_hash = self.store.branch_tip(project_id, branch)?;
        Ok(BranchTip { commit_hash })
    }

    /// Every commit from `start_commit` to `end_commit` inclusive, oldest
    /// first, each with its recording or an empty placeholder.
    ///
    /// Returns an empty list when `start_commit` is not among the first
    /// `max_entries` ancestors of `end_commit`.
    pub fn ranged_recordings(
        &self,
        project_id: &str,
        start_commit: &str,
        end_commit: &str,
        max_entries: usize,
    ) -> Result<Vec<Recording>, RecorderError> {
        self.authorize(project_id)?;

        if self.store.commit(project_id, end_commit)?.is_none() {
            return Err(RecorderError::not_found(end_commit));
        }

        let mut range = Vec::new();
        let mut reached = false;
        for commit in ancestors(self.store, project_id, end_commit).take(max_entries) {
            let commit = commit?;
            let is_start = commit.id == start_commit;
            range.push(commit);
            if is_start {
                reached = true;
                break;
            }
        }

        if !reached {
            tracing::debug!(
                project_id,
                start_commit,
                end_commit,
                max_entries,
                "start commit not reached within cap"
            );
            return Ok(Vec::new());
        }

        range.reverse();
        range
            .into_iter()
            .map(|commit| -> Result<Recording, RecorderError> {
                let recording = self.store.get_recording(project_id, &commit.id)?;
                Ok(recording.unwrap_or_else(|| Recording::placeholder(project_id, commit)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uirec_core::{CommitObject, CoreObjects, UiState};
    use uirec_ledger::SqliteStore;

    struct Fixture {
        store: SqliteStore,
        project: String,
        init: CommitObject,
        commits: Vec<CommitObject>,
        _dir: tempfile::TempDir,
    }

    fn ui_state(value: &str) -> UiState {
        let mut s = UiState::new();
        s.insert("myState".into(), json!(value));
        s
    }

    fn event(
        project: &str,
        commit: &CommitObject,
        local: bool,
        nodes: Option<serde_json::Value>,
        state: &str,
    ) -> CommitEvent {
        CommitEvent {
            project_id: project.to_string(),
            commit_object: commit.clone(),
            core_objects: CoreObjects::new(),
            changed_nodes: nodes,
            local,
            ui_state: ui_state(state),
        }
    }

    /// `init ← m1 ← m2NoCommitInit ← m3OtherUser ← m4OtherUser`, branch
    /// `bN` pointing at `commits[N-1]`, `master` at `init`.
    fn fixture(recorded: &[usize]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open_or_create(&dir.path().join("recordings.db")).unwrap();
        let project = store.create_project("guest", "withRec").unwrap();

        let init = CommitObject::new("#init", vec![], "#root", "guest", "initial");
        store.insert_commit(&project, &init).unwrap();
        store.set_branch(&project, "master", &init.id).unwrap();

        let mut commits: Vec<CommitObject> = Vec::new();
        for (i, msg) in ["m1", "m2NoCommitInit", "m3OtherUser", "m4OtherUser"]
            .iter()
            .enumerate()
        {
            let parent = commits.last().map_or(init.id.clone(), |c| c.id.clone());
            let updater = if i > 1 { *msg } else { "guest" };
            let c = CommitObject::new(format!("#{msg}"), vec![parent], "#root", updater, *msg);
            store.insert_commit(&project, &c).unwrap();
            store.set_branch(&project, &format!("b{}", i + 1), &c.id).unwrap();
            commits.push(c);
        }

        for &i in recorded {
            let rec = event(&project, &commits[i], true, Some(json!({})), "Hello")
                .into_recording()
                .unwrap();
            store.upsert_recording(&rec).unwrap();
        }

        Fixture {
            store,
            project,
            init,
            commits,
            _dir: dir,
        }
    }

    fn resolver(f: &Fixture) -> StatusResolver<'_, SqliteStore> {
        StatusResolver::new(&f.store, Caller::Trusted)
    }

    // ── commit status ──

    #[test]
    fn commit_status_exists_for_recorded_commit() {
        let f = fixture(&[0]);
        let s = resolver(&f).commit_status(&f.project, &f.commits[0].id).unwrap();
        assert!(s.exists);
    }

    #[test]
    fn commit_status_false_for_unrecorded_commit() {
        let f = fixture(&[0]);
        let s = resolver(&f).commit_status(&f.project, &f.init.id).unwrap();
        assert!(!s.exists);
    }

    #[test]
    fn commit_status_false_for_unknown_commit() {
        let f = fixture(&[0]);
        let s = resolver(&f).commit_status(&f.project, "#doesNotExist").unwrap();
        assert!(!s.exists);
    }

    // ── ranged recordings ──

    #[test]
    fn recordings_include_unrecorded_commits() {
        let f = fixture(&[0]);
        let recs = resolver(&f)
            .ranged_recordings(&f.project, &f.commits[0].id, &f.commits[3].id, 100)
            .unwrap();
        assert_eq!(recs.len(), 4);
        assert_eq!(recs[0].ui_state, ui_state("Hello"));
        for r in &recs[1..] {
            assert!(r.ui_state.is_empty());
            assert!(r.changed_nodes.is_none());
        }
        let ids: Vec<&str> = recs.iter().map(|r| r.commit_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["#m1", "#m2NoCommitInit", "#m3OtherUser", "#m4OtherUser"]
        );
    }

    #[test]
    fn recordings_empty_when_start_beyond_cap() {
        let f = fixture(&[0]);
        let recs = resolver(&f)
            .ranged_recordings(&f.project, &f.commits[0].id, &f.commits[3].id, 2)
            .unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn recordings_cap_exactly_reaching_start() {
        let f = fixture(&[0]);
        let recs = resolver(&f)
            .ranged_recordings(&f.project, &f.commits[0].id, &f.commits[3].id, 4)
            .unwrap();
        assert_eq!(recs.len(), 4);
    }

    #[test]
    fn recordings_single_commit_when_start_equals_end() {
        let f = fixture(&[0]);
        let recs = resolver(&f)
            .ranged_recordings(&f.project, &f.commits[0].id, &f.commits[0].id, 100)
            .unwrap();
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn recordings_not_found_for_unknown_end() {
        let f = fixture(&[0]);
        let err = resolver(&f)
            .ranged_recordings(&f.project, &f.commits[0].id, "#doesNotExist", 100)
            .unwrap_err();
        assert!(matches!(err, RecorderError::NotFound { .. }));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn recordings_empty_when_start_not_an_ancestor() {
        let f = fixture(&[0]);
        let recs = resolver(&f)
            .ranged_recordings(&f.project, &f.commits[3].id, &f.commits[0].id, 100)
            .unwrap();
        assert!(recs.is_empty());
    }

    // ── branch tip ──

    #[test]
    fn branch_tip_follows_the_branch() {
        let f = fixture(&[0]);
        let tip = resolver(&f).branch_tip(&f.project, "b4").unwrap();
        assert_eq!(tip.commit_hash.as_deref(), Some("#m4OtherUser"));
        let tip = resolver(&f).branch_tip(&f.project, "doesNotExist").unwrap();
        assert_eq!(tip.commit_hash, None);
    }

    #[test]
    fn branch_tip_requires_access() {
        let f = fixture(&[0]);
        let err = StatusResolver::new(&f.store, Caller::Anonymous)
            .branch_tip(&f.project, "master")
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    // ── branch status ──

    #[test]
    fn branch_status_missing_branch() {
        let f = fixture(&[0]);
        let s = resolver(&f).branch_status(&f.project, "doesNotExist", 100).unwrap();
        assert_eq!(s, BranchStatus::missing());
        assert_eq!(s.commit_index, None);
        assert_eq!(s.commit_hash, None);
    }

    #[test]
    fn branch_status_tip_recorded() {
        let f = fixture(&[0]);
        let s = resolver(&f).branch_status(&f.project, "b1", 100).unwrap();
        assert_eq!(s, BranchStatus::found(1, 0, "#m1".into()));
    }

    #[test]
    fn branch_status_counts_commits_after_recorded_one() {
        let f = fixture(&[0]);
        let r = resolver(&f);
        assert_eq!(
            r.branch_status(&f.project, "b3", 100).unwrap(),
            BranchStatus::found(3, 2, "#m1".into())
        );
        assert_eq!(
            r.branch_status(&f.project, "b4", 100).unwrap(),
            BranchStatus::found(4, 3, "#m1".into())
        );
    }

    #[test]
    fn branch_status_capped_before_recorded_commit() {
        let f = fixture(&[0]);
        let s = resolver(&f).branch_status(&f.project, "b4", 2).unwrap();
        assert_eq!(s, BranchStatus::not_found(2));
    }

    #[test]
    fn branch_status_history_exhausted() {
        let f = fixture(&[0]);
        let s = resolver(&f).branch_status(&f.project, "master", 100).unwrap();
        assert_eq!(s, BranchStatus::not_found(1));
    }

    #[test]
    fn branch_status_zero_cap() {
        let f = fixture(&[0]);
        let s = resolver(&f).branch_status(&f.project, "b1", 0).unwrap();
        assert_eq!(s, BranchStatus::not_found(0));
    }

    // ── recording writes ──

    #[test]
    fn non_local_event_not_recorded() {
        let f = fixture(&[0]);
        let r = resolver(&f);
        let out = r
            .record_if_eligible(event(&f.project, &f.commits[1], false, Some(json!({})), "Hello"))
            .unwrap();
        assert_eq!(out, RecordOutcome::Ignored(IgnoreReason::NotLocal));
        assert!(!r.commit_status(&f.project, &f.commits[1].id).unwrap().exists);
    }

    #[test]
    fn event_without_changed_nodes_not_recorded() {
        let f = fixture(&[0]);
        let r = resolver(&f);
        let out = r
            .record_if_eligible(event(&f.project, &f.commits[1], true, None, "Hello"))
            .unwrap();
        assert_eq!(out, RecordOutcome::Ignored(IgnoreReason::NoChangedNodes));
        assert!(!r.commit_status(&f.project, &f.commits[1].id).unwrap().exists);
    }

    #[test]
    fn local_event_recorded() {
        let f = fixture(&[0]);
        let r = resolver(&f);
        let out = r
            .record_if_eligible(event(&f.project, &f.commits[1], true, Some(json!({})), "Hello2"))
            .unwrap();
        assert_eq!(out, RecordOutcome::Recorded);
        let recs = r
            .ranged_recordings(&f.project, &f.commits[1].id, &f.commits[1].id, 100)
            .unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].ui_state, ui_state("Hello2"));
    }

    #[test]
    fn repeated_write_is_an_upsert() {
        let f = fixture(&[]);
        let r = resolver(&f);
        for state in ["a", "b"] {
            r.record_if_eligible(event(&f.project, &f.commits[0], true, Some(json!({})), state))
                .unwrap();
        }
        assert_eq!(f.store.count_recordings(&f.project).unwrap(), 1);
        let rec = f.store.get_recording(&f.project, "#m1").unwrap().unwrap();
        assert_eq!(rec.ui_state, ui_state("b"));
    }

    // ── access ──

    #[test]
    fn every_query_rejects_missing_project() {
        let f = fixture(&[0]);
        let r = resolver(&f);
        let m1 = &f.commits[0].id;

        let e = r.commit_status("doesNotExist", m1).unwrap_err();
        assert_eq!(e.status_code(), 403);
        let e = r.ranged_recordings("doesNotExist", m1, "#doesNotExist", 100).unwrap_err();
        assert_eq!(e.status_code(), 403);
        let e = r.branch_status("doesNotExist", "master", 100).unwrap_err();
        assert_eq!(e.status_code(), 403);
        let e = r
            .record_if_eligible(event("doesNotExist", &f.commits[1], true, Some(json!({})), "x"))
            .unwrap_err();
        assert_eq!(e.status_code(), 403);
    }

    #[test]
    fn ineligible_event_for_missing_project_is_still_ignored() {
        let f = fixture(&[0]);
        let out = resolver(&f)
            .record_if_eligible(event("doesNotExist", &f.commits[1], false, Some(json!({})), "x"))
            .unwrap();
        assert_eq!(out, RecordOutcome::Ignored(IgnoreReason::NotLocal));
    }

    #[test]
    fn non_member_is_rejected_when_authenticated() {
        let f = fixture(&[0]);
        f.store.add_member(&f.project, "alice").unwrap();

        let alice = StatusResolver::new(&f.store, Caller::User("alice".into()));
        assert!(alice.commit_status(&f.project, "#m1").unwrap().exists);

        let bob = StatusResolver::new(&f.store, Caller::User("bob".into()));
        let err = bob.commit_status(&f.project, "#m1").unwrap_err();
        assert!(matches!(err, RecorderError::NotAuthorized { .. }));
    }

    // ── scenario: m1, m3, m4 recorded, m2 not ──

    #[test]
    fn scenario_with_gap_in_recordings() {
        let f = fixture(&[0, 2, 3]);
        let r = resolver(&f);

        assert_eq!(
            r.branch_status(&f.project, "b4", 100).unwrap(),
            BranchStatus::found(1, 0, "#m4OtherUser".into())
        );
        assert_eq!(
            r.branch_status(&f.project, "b2", 100).unwrap(),
            BranchStatus::found(2, 1, "#m1".into())
        );
        assert_eq!(
            r.branch_status(&f.project, "b2", 1).unwrap(),
            BranchStatus::not_found(1)
        );

        let recs = r
            .ranged_recordings(&f.project, &f.commits[0].id, &f.commits[3].id, 100)
            .unwrap();
        assert_eq!(recs.len(), 4);
        let recorded: Vec<bool> = recs.iter().map(|x| !x.ui_state.is_empty()).collect();
        assert_eq!(recorded, vec![true, false, true, true]);
        assert_eq!(recs[1].ui_state, UiState::new());

        assert!(r.commit_status(&f.project, "#m3OtherUser").unwrap().exists);
        assert!(!r.commit_status(&f.project, "#m2NoCommitInit").unwrap().exists);
    }
}
