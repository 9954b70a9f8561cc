//! What to replay when a user comes back to a branch others have moved on.

use std::fmt;

use uirec_core::{BranchStatus, CommitId, DEFAULT_MAX_ENTRIES};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatchUp {
    /// The branch does not exist or has no commits.
    NoHistory,
    /// The tip is itself the latest recorded commit.
    UpToDate,
    /// `changes` commits landed on top of the recorded commit `start`.
    Behind { start: CommitId, changes: usize },
    /// None of the `checked` commits below the tip is recorded.
    OutOfReach { checked: usize },
}

impl fmt::Display for CatchUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatchUp::NoHistory => write!(f, "The branch has no history."),
            CatchUp::UpToDate => write!(f, "There are no changes since your last one."),
            CatchUp::Behind { changes, .. } => {
                write!(f, "There are {changes} changes since your last one.")
            }
            CatchUp::OutOfReach { checked } => {
                write!(f, "There are more than {checked} changes since your last one.")
            }
        }
    }
}

pub fn catch_up(status: &BranchStatus) -> CatchUp {
    if status.total_entries == 0 {
        return CatchUp::NoHistory;
    }
    match (&status.commit_hash, status.commit_index) {
        (Some(_), Some(0)) => CatchUp::UpToDate,
        (Some(start), Some(changes)) => CatchUp::Behind {
            start: start.clone(),
            changes,
        },
        _ => CatchUp::OutOfReach {
            checked: status.total_entries,
        },
    }
}

/// Commits to examine when fetching a range whose start lies `index`
/// commits below its end. Deep ranges get some margin on top.
pub fn replay_cap(index: usize) -> usize {
    if index > 90 {
        index + 20
    } else {
        DEFAULT_MAX_ENTRIES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_tip_is_up_to_date() {
        // m4OtherUser is the tip and carries a recording.
        let status = BranchStatus::found(1, 0, "#m4OtherUser".into());
        assert_eq!(catch_up(&status), CatchUp::UpToDate);
    }

    #[test]
    fn unrecorded_commits_on_top_are_changes() {
        // Two remote commits landed on top of m4OtherUser.
        let status = BranchStatus::found(3, 2, "#m4OtherUser".into());
        let plan = catch_up(&status);
        assert_eq!(
            plan,
            CatchUp::Behind {
                start: "#m4OtherUser".into(),
                changes: 2
            }
        );
        assert_eq!(plan.to_string(), "There are 2 changes since your last one.");
    }

    #[test]
    fn nothing_recorded_within_cap() {
        let plan = catch_up(&BranchStatus::not_found(100));
        assert_eq!(plan, CatchUp::OutOfReach { checked: 100 });
        assert_eq!(
            plan.to_string(),
            "There are more than 100 changes since your last one."
        );
    }

    #[test]
    fn missing_branch_has_no_history() {
        assert_eq!(catch_up(&BranchStatus::missing()), CatchUp::NoHistory);
    }

    #[test]
    fn cap_grows_only_for_deep_ranges() {
        assert_eq!(replay_cap(0), 100);
        assert_eq!(replay_cap(90), 100);
        assert_eq!(replay_cap(91), 111);
        assert_eq!(replay_cap(250), 270);
    }
}
