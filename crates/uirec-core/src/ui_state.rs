//! Well-known UI-state field names.

pub const ACTIVE_PROJECT_NAME: &str = "activeProjectName";
pub const ACTIVE_COMMIT: &str = "activeCommit";
pub const ACTIVE_BRANCH_NAME: &str = "activeBranchName";
pub const LAYOUT: &str = "layout";

pub const ACTIVE_VISUALIZER: &str = "activeVisualizer";
pub const ACTIVE_SELECTION: &str = "activeSelection";

/// Fields driven by commit selection, never by a state step.
pub const COMMIT_DRIVEN: &[&str] = &[ACTIVE_PROJECT_NAME, ACTIVE_COMMIT, ACTIVE_BRANCH_NAME, LAYOUT];

pub fn is_commit_driven(field: &str) -> bool {
    COMMIT_DRIVEN.contains(&field)
}
