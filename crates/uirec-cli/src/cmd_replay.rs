use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use uirec_client::{RecorderClient, RecordingSource};
use uirec_core::ids::commit_from_segment;
use uirec_core::ui_state::ACTIVE_VISUALIZER;
use uirec_core::{CommitId, RecorderError, UiState};
use uirec_ledger::{RecorderConfig, UirecPaths};
use uirec_player::{
    catch_up, replay_cap, CatchUp, Direction, Player, ReplayError, ReplaySession, StepOptions,
    StepOutcome, StepReport,
};

/// What to replay: an explicit commit range, or everything a branch gained
/// since its latest recorded commit.
pub enum ReplayTarget<'a> {
    Range { start: &'a str, end: &'a str },
    Branch(&'a str),
}

pub struct ReplayParams<'a> {
    pub repo_root: &'a Path,
    pub project: &'a str,
    pub target: ReplayTarget<'a>,
    /// Commits to examine; for a branch this bounds the status walk.
    pub max_entries: Option<usize>,
    pub server: Option<&'a str>,
    pub user: Option<&'a str>,
    pub delay_ms: Option<u64>,
}

// ── Headless session ──

/// A session with no UI: keeps the UI state in memory and logs every
/// change it is asked to make.
#[derive(Debug, Default)]
pub struct LogSession {
    live: UiState,
    objects: usize,
    selected: Option<String>,
}

#[async_trait]
impl ReplaySession for LogSession {
    async fn ui_state(&self) -> anyhow::Result<UiState> {
        Ok(self.live.clone())
    }

    async fn set_ui_state(&mut self, fields: &UiState) -> anyhow::Result<()> {
        for (field, value) in fields {
            tracing::debug!(field = %field, %value, "set ui state");
            self.live.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn register_active_visualizer(&mut self, visualizer: &Value) -> anyhow::Result<()> {
        tracing::debug!(%visualizer, "switch visualizer");
        self.live.insert(ACTIVE_VISUALIZER.to_string(), visualizer.clone());
        Ok(())
    }

    async fn insert_full_object(&mut self, hash: &str, _object: &Value) -> anyhow::Result<()> {
        tracing::trace!(hash, "insert object");
        self.objects += 1;
        Ok(())
    }

    async fn insert_patch_object(&mut self, hash: &str, _object: &Value) -> anyhow::Result<()> {
        tracing::trace!(hash, "insert patch object");
        self.objects += 1;
        Ok(())
    }

    async fn select_commit(
        &mut self,
        commit_id: &str,
        changed_nodes: Option<&Value>,
    ) -> anyhow::Result<()> {
        tracing::info!(commit = commit_id, incremental = changed_nodes.is_some(), "select commit");
        self.selected = Some(commit_id.to_string());
        Ok(())
    }
}

// ── Command ──

/// `uirec replay <project> <start> <end>` or `uirec replay <project> --branch <b>`
pub fn execute(params: ReplayParams<'_>) -> anyhow::Result<()> {
    let config = RecorderConfig::load(&UirecPaths::discover(params.repo_root))?;

    let mut client = RecorderClient::new(params.server.unwrap_or(&config.server_url))?;
    if let Some(user) = params.user {
        client = client.with_user(user);
    }
    let options = StepOptions {
        settle_delay: params
            .delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| config.settle_delay()),
    };
    let max = params.max_entries.unwrap_or(config.max_entries);

    tokio::runtime::Runtime::new()?.block_on(async {
        let range = match params.target {
            ReplayTarget::Range { start, end } => ReplayRange {
                start: commit_from_segment(start),
                end: commit_from_segment(end),
                max_entries: max,
            },
            ReplayTarget::Branch(branch) => {
                let (plan, range) = catch_up_range(&client, params.project, branch, max).await?;
                println!("{plan}");
                match range {
                    Some(range) => range,
                    None => return Ok(()),
                }
            }
        };

        let mut player = Player::new(LogSession::default(), client);
        let loaded = player
            .load_recordings(params.project, &range.start, &range.end, range.max_entries)
            .await?;
        match loaded {
            Some(parent) => println!(
                "Loaded {} entries, starting at {parent}",
                player.recording().len()
            ),
            None => println!("Loaded {} entries", player.recording().len()),
        }
        replay_to_end(&mut player, &options).await?;
        let session = player.into_session();
        println!(
            "Replay finished at {} ({} objects inserted)",
            session.selected.as_deref().unwrap_or("-"),
            session.objects
        );
        Ok::<(), anyhow::Error>(())
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRange {
    pub start: CommitId,
    pub end: CommitId,
    pub max_entries: usize,
}

/// Find the commits `branch` gained since its latest recorded commit.
///
/// The range runs from that commit to the current tip. It is `None` when
/// the branch is up to date or nothing recorded was found within
/// `max_entries` commits.
pub async fn catch_up_range(
    client: &RecorderClient,
    project_id: &str,
    branch: &str,
    max_entries: usize,
) -> Result<(CatchUp, Option<ReplayRange>), RecorderError> {
    let status = client
        .branch_status(project_id, branch, Some(max_entries))
        .await?;
    let plan = catch_up(&status);
    let CatchUp::Behind { start, changes } = plan.clone() else {
        return Ok((plan, None));
    };

    let Some(end) = client.branch_tip(project_id, branch).await?.commit_hash else {
        return Err(RecorderError::InvalidRequest(format!(
            "branch '{branch}' no longer exists"
        )));
    };
    tracing::info!(project_id, branch, %start, %end, changes, "catching up on branch");
    let range = ReplayRange {
        start,
        end,
        max_entries: replay_cap(changes),
    };
    Ok((plan, Some(range)))
}

/// Step forward until the recording runs out, printing each step.
pub async fn replay_to_end<S: ReplaySession, R: RecordingSource>(
    player: &mut Player<S, R>,
    options: &StepOptions,
) -> Result<Vec<String>, ReplayError> {
    let mut lines = Vec::new();
    loop {
        match player.step(Direction::Forward, options).await {
            Ok(report) => {
                let (done, total) = player.progress();
                let line = format!("[{done}/{total}] {}", describe(&report));
                println!("{line}");
                lines.push(line);
            }
            Err(e) if e.is_boundary() => return Ok(lines),
            Err(e) => return Err(e),
        }
    }
}

fn describe(report: &StepReport) -> String {
    match report {
        StepReport::Stepped(StepOutcome::Commit {
            commit,
            incremental,
        }) => {
            let who = commit.updater.first().map(String::as_str).unwrap_or("?");
            let how = if *incremental { "incremental" } else { "full" };
            format!("\"{who}\" made commit {} ({how}): {}", commit.id, commit.message)
        }
        StepReport::Stepped(StepOutcome::State { changed }) => {
            format!("ui state: {}", Value::Object(changed.clone()))
        }
        StepReport::BeginningReached => "beginning reached".to_string(),
    }
}
