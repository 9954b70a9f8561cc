use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of commits examined by status and range queries when the caller
/// does not say otherwise.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Commit ID format: `#<hash>`
pub type CommitId = String;

/// Project ID format: `<owner>+<name>`
pub type ProjectId = String;

/// UI state: field name → arbitrary JSON value.
pub type UiState = serde_json::Map<String, serde_json::Value>;

/// Core objects needed to rebuild a commit: content hash → object.
pub type CoreObjects = BTreeMap<String, serde_json::Value>;

/// Tag value that marks an object in `coreObjects` as a patch.
pub const PATCH_OBJECT_TYPE: &str = "patch";

/// Commit metadata as produced by the version-control engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitObject {
    #[serde(rename = "_id")]
    pub id: CommitId,
    pub root: String,
    #[serde(default)]
    pub parents: Vec<CommitId>,
    #[serde(default)]
    pub updater: Vec<String>,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default = "commit_type")]
    pub kind: String,
}

fn commit_type() -> String {
    "commit".to_string()
}

impl CommitObject {
    pub fn new(
        id: impl Into<CommitId>,
        parents: Vec<CommitId>,
        root: impl Into<String>,
        updater: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            parents,
            updater: vec![updater.into()],
            time: 0,
            message: message.into(),
            kind: commit_type(),
        }
    }

    /// First parent, the only one followed when walking linear history.
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }

    /// True when `prev` is this commit's one and only parent.
    pub fn follows_directly(&self, prev: &str) -> bool {
        self.parents.len() == 1 && self.parents[0] == prev
    }
}

/// How a core object must be inserted into local storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Full,
    Patch,
}

impl ObjectKind {
    /// Classify an object by its `type` tag; anything but `"patch"` is full.
    pub fn of(obj: &serde_json::Value) -> Self {
        match obj.get("type").and_then(|t| t.as_str()) {
            Some(PATCH_OBJECT_TYPE) => ObjectKind::Patch,
            _ => ObjectKind::Full,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Full => "full",
            ObjectKind::Patch => "patch",
        }
    }
}

/// Answer to "does this commit have a recording?".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitStatus {
    pub exists: bool,
}

/// Where a branch currently points; `None` when the branch does not exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BranchTip {
    pub commit_hash: Option<CommitId>,
}

/// Distance from a branch tip to the most recent recorded commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BranchStatus {
    pub total_entries: usize,
    /// `None` travels as `-1` on the wire.
    #[serde(with = "index_or_minus_one")]
    pub commit_index: Option<usize>,
    pub commit_hash: Option<CommitId>,
}

impl BranchStatus {
    /// Status of a branch that does not exist.
    pub fn missing() -> Self {
        Self::not_found(0)
    }

    /// No recorded commit among the `total_entries` walked.
    pub fn not_found(total_entries: usize) -> Self {
        Self {
            total_entries,
            commit_index: None,
            commit_hash: None,
        }
    }

    pub fn found(total_entries: usize, commit_index: usize, commit_hash: CommitId) -> Self {
        Self {
            total_entries,
            commit_index: Some(commit_index),
            commit_hash: Some(commit_hash),
        }
    }
}

mod index_or_minus_one {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<usize>, ser: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(i) => ser.serialize_i64(*i as i64),
            None => ser.serialize_i64(-1),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Option<usize>, D::Error> {
        let raw = i64::deserialize(de)?;
        Ok(usize::try_from(raw).ok())
    }
}
