//! Conversions between full ids and the URL segments that carry them.

use crate::error::RecorderError;

/// Strip the leading `#` a commit id carries in full form.
pub fn commit_to_segment(commit_id: &str) -> &str {
    commit_id.strip_prefix('#').unwrap_or(commit_id)
}

/// Restore the leading `#` removed by [`commit_to_segment`].
pub fn commit_from_segment(segment: &str) -> String {
    if segment.starts_with('#') {
        segment.to_string()
    } else {
        format!("#{segment}")
    }
}

/// Split a `start...end` range segment into full commit ids.
pub fn parse_range(segment: &str) -> Result<(String, String), RecorderError> {
    let (start, end) = segment.split_once("...").ok_or_else(|| {
        RecorderError::InvalidRequest(format!("range must be <start>...<end>, got '{segment}'"))
    })?;
    if start.is_empty() || end.is_empty() {
        return Err(RecorderError::InvalidRequest(format!(
            "range has an empty endpoint: '{segment}'"
        )));
    }
    Ok((commit_from_segment(start), commit_from_segment(end)))
}

/// Project id split into its owner and name parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    pub owner: String,
    pub name: String,
}

impl ProjectRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner+name`.
    pub fn parse(project_id: &str) -> Result<Self, RecorderError> {
        match project_id.split_once('+') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(owner, name))
            }
            _ => Err(RecorderError::InvalidRequest(format!(
                "project id must be <owner>+<name>, got '{project_id}'"
            ))),
        }
    }

    pub fn id(&self) -> String {
        format!("{}+{}", self.owner, self.name)
    }
}
