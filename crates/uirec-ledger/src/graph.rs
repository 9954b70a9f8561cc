//! Storage boundaries the status resolver is written against.

use uirec_core::{Caller, CommitId, CommitObject, ObjectKind, Recording};

/// Version-control storage: commits, branches and content objects.
pub trait CommitGraph {
    fn commit(&self, project_id: &str, commit_id: &str) -> anyhow::Result<Option<CommitObject>>;

    fn branch_tip(&self, project_id: &str, branch: &str) -> anyhow::Result<Option<CommitId>>;

    fn insert_object(
        &self,
        project_id: &str,
        hash: &str,
        kind: ObjectKind,
        obj: &serde_json::Value,
    ) -> anyhow::Result<()>;

    fn insert_full_object(
        &self,
        project_id: &str,
        hash: &str,
        obj: &serde_json::Value,
    ) -> anyhow::Result<()> {
        self.insert_object(project_id, hash, ObjectKind::Full, obj)
    }

    fn insert_patch_object(
        &self,
        project_id: &str,
        hash: &str,
        obj: &serde_json::Value,
    ) -> anyhow::Result<()> {
        self.insert_object(project_id, hash, ObjectKind::Patch, obj)
    }
}

/// The recordings collection.
pub trait RecordingRepo {
    /// Insert or replace the recording for `(project_id, commit_id)`.
    fn upsert_recording(&self, recording: &Recording) -> anyhow::Result<()>;

    fn has_recording(&self, project_id: &str, commit_id: &str) -> anyhow::Result<bool>;

    fn get_recording(&self, project_id: &str, commit_id: &str)
        -> anyhow::Result<Option<Recording>>;
}

/// Read access to projects. A missing project is never accessible.
pub trait ProjectAccess {
    fn can_access(&self, project_id: &str, caller: &Caller) -> anyhow::Result<bool>;
}

/// Lazy first-parent walk from a commit towards the root.
///
/// Commits are loaded one at a time, so callers bound the work with
/// `take(n)` or an early `break`. A walk can be restarted from any commit
/// it yielded with [`ancestors`].
pub struct AncestorWalk<'g, G: ?Sized> {
    graph: &'g G,
    project_id: String,
    next: Option<CommitId>,
}

/// Start a walk at `start` (inclusive).
pub fn ancestors<'g, G: CommitGraph + ?Sized>(
    graph: &'g G,
    project_id: &str,
    start: &str,
) -> AncestorWalk<'g, G> {
    AncestorWalk {
        graph,
        project_id: project_id.to_string(),
        next: Some(start.to_string()),
    }
}

impl<G: CommitGraph + ?Sized> Iterator for AncestorWalk<'_, G> {
    type Item = anyhow::Result<CommitObject>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next.take()?;
        match self.graph.commit(&self.project_id, &id) {
            Ok(Some(commit)) => {
                self.next = commit.first_parent().map(str::to_string);
                Some(Ok(commit))
            }
            // A dangling parent ends the history.
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
