use async_trait::async_trait;
use serde_json::Value;

use uirec_core::UiState;

/// The live session a replay drives: its UI-state sink and its local
/// object storage.
#[async_trait]
pub trait ReplaySession: Send {
    /// Current UI state, used to compute deltas.
    async fn ui_state(&self) -> anyhow::Result<UiState>;

    /// Set several fields at once without letting node selection pick a
    /// visualizer on its own.
    async fn set_ui_state(&mut self, fields: &UiState) -> anyhow::Result<()>;

    async fn register_active_visualizer(&mut self, visualizer: &Value) -> anyhow::Result<()>;

    async fn insert_full_object(&mut self, hash: &str, object: &Value) -> anyhow::Result<()>;

    async fn insert_patch_object(&mut self, hash: &str, object: &Value) -> anyhow::Result<()>;

    /// Switch to `commit_id`. With `changed_nodes` only those nodes are
    /// reloaded; without, the whole tree is.
    async fn select_commit(
        &mut self,
        commit_id: &str,
        changed_nodes: Option<&Value>,
    ) -> anyhow::Result<()>;
}
