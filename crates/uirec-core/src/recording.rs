use serde::{Deserialize, Serialize};

use crate::types::{CommitId, CommitObject, CoreObjects, ProjectId, UiState};

/// One persisted recording, keyed by `(project_id, commit_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    #[serde(rename = "_id")]
    pub commit_id: CommitId,
    pub project_id: ProjectId,
    #[serde(default)]
    pub ui_state: UiState,
    pub commit_object: CommitObject,
    #[serde(default)]
    pub core_objects: CoreObjects,
    #[serde(default)]
    pub changed_nodes: Option<serde_json::Value>,
}

impl Recording {
    /// Stand-in for a commit in a requested range that has no recording.
    pub fn placeholder(project_id: &str, commit_object: CommitObject) -> Self {
        Self {
            commit_id: commit_object.id.clone(),
            project_id: project_id.to_string(),
            ui_state: UiState::new(),
            commit_object,
            core_objects: CoreObjects::new(),
            changed_nodes: None,
        }
    }
}

/// A commit produced by a client, together with the UI state captured at
/// that moment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitEvent {
    pub project_id: ProjectId,
    pub commit_object: CommitObject,
    #[serde(default)]
    pub core_objects: CoreObjects,
    #[serde(default)]
    pub changed_nodes: Option<serde_json::Value>,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub ui_state: UiState,
}

/// Why a commit event was not recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The commit came from another client.
    NotLocal,
    /// Branch-hash reset, undo or redo: no trackable node diff.
    NoChangedNodes,
}

/// Decide whether a commit event should become a recording.
pub fn is_recordable(event: &CommitEvent) -> Result<(), IgnoreReason> {
    if !event.local {
        return Err(IgnoreReason::NotLocal);
    }
    match &event.changed_nodes {
        None | Some(serde_json::Value::Null) => Err(IgnoreReason::NoChangedNodes),
        Some(_) => Ok(()),
    }
}

impl CommitEvent {
    pub fn commit_id(&self) -> &str {
        &self.commit_object.id
    }

    /// Convert into a recording, or say why it must be skipped.
    pub fn into_recording(self) -> Result<Recording, IgnoreReason> {
        is_recordable(&self)?;
        Ok(Recording {
            commit_id: self.commit_object.id.clone(),
            project_id: self.project_id,
            ui_state: self.ui_state,
            commit_object: self.commit_object,
            core_objects: self.core_objects,
            changed_nodes: self.changed_nodes,
        })
    }
}
