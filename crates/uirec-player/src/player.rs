//! Steps a live session through a recorded history, one UI-state change or
//! one commit at a time.

use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;

use uirec_client::RecordingSource;
use uirec_core::ui_state::ACTIVE_SELECTION;
use uirec_core::{CommitId, CommitObject, ObjectKind, Recording, UiState};

use crate::cursor::{Cursors, Direction, Move};
use crate::diff::{diff_ui_state, plan_apply, ApplyPlan};
use crate::error::ReplayError;
use crate::session::ReplaySession;

// ── Options & outcomes ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOptions {
    /// Time given to the session to react before a step resolves.
    pub settle_delay: Duration,
}

impl Default for StepOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A state step; `changed` holds the fields that were applied.
    State { changed: UiState },
    /// A commit step. `incremental` is true when only the recorded node
    /// diff was replayed.
    Commit {
        commit: CommitObject,
        incremental: bool,
    },
}

/// What a [`Player::step`] call ended on.
#[derive(Debug, Clone, PartialEq)]
pub enum StepReport {
    Stepped(StepOutcome),
    /// Stepping back reached the first entry with nothing left to undo.
    BeginningReached,
}

// ── Player ──

pub struct Player<S, R> {
    session: S,
    source: R,
    recording: Vec<Recording>,
    cursors: Cursors,
}

impl<S: ReplaySession, R: RecordingSource> Player<S, R> {
    pub fn new(session: S, source: R) -> Self {
        Self {
            session,
            source,
            recording: Vec::new(),
            cursors: Cursors::default(),
        }
    }

    /// Fetch the recordings between two commits and move the session to
    /// the commit just before the first one.
    ///
    /// Returns that starting commit, or `None` when the first entry is a
    /// root commit.
    pub async fn load_recordings(
        &mut self,
        project_id: &str,
        start_commit: &str,
        end_commit: &str,
        max_entries: usize,
    ) -> Result<Option<CommitId>, ReplayError> {
        let recording = self
            .source
            .recordings(project_id, start_commit, end_commit, max_entries)
            .await?;
        let Some(first) = recording.first() else {
            return Err(ReplayError::EmptyRecording);
        };
        let start = first.commit_object.first_parent().map(str::to_string);

        self.cursors = Cursors::new(recording.len());
        self.recording = recording;
        tracing::info!(
            project_id,
            entries = self.recording.len(),
            start = start.as_deref().unwrap_or("-"),
            "recording loaded"
        );

        if let Some(commit) = &start {
            self.session
                .select_commit(commit, None)
                .await
                .map_err(ReplayError::Session)?;
        }
        Ok(start)
    }

    pub async fn step_forward_state(
        &mut self,
        options: &StepOptions,
    ) -> Result<StepOutcome, ReplayError> {
        self.cursors = self.cursors.forward_state()?;
        self.apply_state_at(self.cursors.state_index(), options).await
    }

    pub async fn step_back_state(
        &mut self,
        options: &StepOptions,
    ) -> Result<StepOutcome, ReplayError> {
        self.cursors = self.cursors.back_state()?;
        self.apply_state_at(self.cursors.state_index(), options).await
    }

    /// Reconstruct and select the next commit. Only its node diff is
    /// replayed when its sole parent is the previous entry's commit.
    pub async fn step_forward_commit(
        &mut self,
        _options: &StepOptions,
    ) -> Result<StepOutcome, ReplayError> {
        let next = self.cursors.forward_commit()?;
        let prev = self
            .entry(self.cursors.commit_index())
            .map(|r| r.commit_id.clone());
        self.cursors = next;

        let entry = &self.recording[next.commit_index() as usize];
        let changed_nodes = match prev {
            Some(prev) if entry.commit_object.follows_directly(&prev) => {
                entry.changed_nodes.as_ref()
            }
            _ => None,
        };
        let incremental = changed_nodes.is_some();
        load_commit(&mut self.session, entry, changed_nodes).await?;
        tracing::debug!(commit = %entry.commit_id, incremental, "stepped forward commit");

        Ok(StepOutcome::Commit {
            commit: entry.commit_object.clone(),
            incremental,
        })
    }

    /// Move the commit cursor back and fully re-select the entry it now
    /// points at. The commit reported is the one that was undone.
    pub async fn step_back_commit(
        &mut self,
        _options: &StepOptions,
    ) -> Result<StepOutcome, ReplayError> {
        self.cursors = self.cursors.back_commit()?;

        let index = self.cursors.commit_index() as usize;
        let target = &self.recording[index];
        load_commit(&mut self.session, target, None).await?;
        let undone = &self.recording[index + 1];
        tracing::debug!(
            commit = %target.commit_id,
            undone = %undone.commit_id,
            "stepped back commit"
        );

        Ok(StepOutcome::Commit {
            commit: undone.commit_object.clone(),
            incremental: false,
        })
    }

    /// One user-visible step in `direction`.
    ///
    /// State steps that change nothing are skipped over, except when a
    /// backward step lands on the first entry.
    pub async fn step(
        &mut self,
        direction: Direction,
        options: &StepOptions,
    ) -> Result<StepReport, ReplayError> {
        loop {
            let outcome = match self.cursors.next_move(direction) {
                Move::ForwardState => self.step_forward_state(options).await?,
                Move::ForwardCommit => self.step_forward_commit(options).await?,
                Move::BackState => self.step_back_state(options).await?,
                Move::BackCommit => self.step_back_commit(options).await?,
            };
            match outcome {
                StepOutcome::State { ref changed } if changed.is_empty() => {
                    if direction == Direction::Back && self.cursors.state_index() == 0 {
                        return Ok(StepReport::BeginningReached);
                    }
                }
                outcome => return Ok(StepReport::Stepped(outcome)),
            }
        }
    }

    /// Drop the loaded recording.
    pub fn clear(&mut self) {
        self.recording.clear();
        self.cursors = Cursors::default();
    }

    pub fn recording(&self) -> &[Recording] {
        &self.recording
    }

    pub fn cursors(&self) -> Cursors {
        self.cursors
    }

    pub fn can_step_forward(&self) -> bool {
        self.cursors.can_step_forward()
    }

    pub fn can_step_back(&self) -> bool {
        self.cursors.can_step_back()
    }

    pub fn progress(&self) -> (usize, usize) {
        self.cursors.progress()
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    fn entry(&self, index: isize) -> Option<&Recording> {
        usize::try_from(index).ok().and_then(|i| self.recording.get(i))
    }

    async fn apply_state_at(
        &mut self,
        index: isize,
        options: &StepOptions,
    ) -> Result<StepOutcome, ReplayError> {
        let entry = &self.recording[index as usize];
        let changed = load_state(&mut self.session, &entry.ui_state, options.settle_delay).await?;
        tracing::debug!(index, fields = changed.len(), "applied ui state");
        Ok(StepOutcome::State { changed })
    }
}

// ── Applying entries ──

/// Push the fields of `target` that differ from the session, in the order
/// dependent widgets need them, and return what was applied.
async fn load_state<S: ReplaySession + ?Sized>(
    session: &mut S,
    target: &UiState,
    delay: Duration,
) -> Result<UiState, ReplayError> {
    let live = session.ui_state().await.map_err(ReplayError::Session)?;
    let delta = diff_ui_state(target, &live);

    match plan_apply(&delta) {
        ApplyPlan::Nothing => {}
        ApplyPlan::Single { fields, settle } => {
            session
                .set_ui_state(&fields)
                .await
                .map_err(ReplayError::Session)?;
            if settle {
                sleep(delay).await;
            }
        }
        ApplyPlan::Batch {
            visualizer,
            fields,
            selection,
        } => {
            if let Some(visualizer) = &visualizer {
                session
                    .register_active_visualizer(visualizer)
                    .await
                    .map_err(ReplayError::Session)?;
            }
            if !fields.is_empty() {
                session
                    .set_ui_state(&fields)
                    .await
                    .map_err(ReplayError::Session)?;
            }
            sleep(delay).await;

            if let Some(selection) = selection {
                let mut deferred = UiState::new();
                deferred.insert(ACTIVE_SELECTION.to_string(), selection);
                session
                    .set_ui_state(&deferred)
                    .await
                    .map_err(ReplayError::Session)?;
                sleep(delay * 2).await;
            }
        }
    }
    Ok(delta)
}

/// Insert the commit and its objects into session storage, then select it.
async fn load_commit<S: ReplaySession + ?Sized>(
    session: &mut S,
    entry: &Recording,
    changed_nodes: Option<&Value>,
) -> Result<(), ReplayError> {
    let commit =
        serde_json::to_value(&entry.commit_object).map_err(|e| ReplayError::Session(e.into()))?;
    session
        .insert_full_object(&entry.commit_id, &commit)
        .await
        .map_err(ReplayError::Session)?;

    for (hash, object) in &entry.core_objects {
        match ObjectKind::of(object) {
            ObjectKind::Patch => session.insert_patch_object(hash, object).await,
            ObjectKind::Full => session.insert_full_object(hash, object).await,
        }
        .map_err(ReplayError::Session)?;
    }

    session
        .select_commit(&entry.commit_id, changed_nodes)
        .await
        .map_err(ReplayError::Session)
}
