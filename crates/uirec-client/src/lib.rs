//! Thin async wrappers over the recorder HTTP routes.
//!
//! Every call maps a non-success response back onto [`RecorderError`] so
//! callers see the same taxonomy whether they talk to the store in-process
//! or over the network.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use uirec_core::access::USER_HEADER;
use uirec_core::ids::{commit_to_segment, ProjectRef};
use uirec_core::{
    is_recordable, BranchStatus, BranchTip, CommitEvent, CommitStatus, Recording, RecorderError,
    DEFAULT_MAX_ENTRIES,
};

/// Where a player gets its ordered recording list from.
#[async_trait]
pub trait RecordingSource: Send + Sync {
    async fn recordings(
        &self,
        project_id: &str,
        start_commit: &str,
        end_commit: &str,
        max_entries: usize,
    ) -> Result<Vec<Recording>, RecorderError>;
}

pub struct RecorderClient {
    base_url: Url,
    http: reqwest::Client,
    user: Option<String>,
}

#[derive(Deserialize)]
struct RecordResponse {
    recorded: bool,
}

impl RecorderClient {
    pub fn new(base_url: &str) -> Result<Self, RecorderError> {
        let parsed = Url::parse(base_url).map_err(|e| {
            RecorderError::InvalidRequest(format!("invalid server url '{base_url}': {e}"))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(RecorderError::InvalidRequest(format!(
                "server url cannot carry a path: '{base_url}'"
            )));
        }
        Ok(Self {
            base_url: parsed,
            http: reqwest::Client::new(),
            user: None,
        })
    }

    /// Send `x-uirec-user` with every request.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Offer a commit event for recording.
    ///
    /// Ineligible events are filtered here and never reach the server.
    /// Returns whether a recording was written.
    pub async fn add_recording(&self, event: &CommitEvent) -> Result<bool, RecorderError> {
        if let Err(reason) = is_recordable(event) {
            tracing::debug!(commit = event.commit_id(), ?reason, "skipping commit event");
            return Ok(false);
        }
        let project = ProjectRef::parse(&event.project_id)?;
        let url = self.endpoint(&project, &["recording"])?;
        let resp: RecordResponse = self
            .send(self.http.put(url).json(event), &event.project_id, event.commit_id())
            .await?;
        Ok(resp.recorded)
    }

    pub async fn commit_status(
        &self,
        project_id: &str,
        commit_id: &str,
    ) -> Result<CommitStatus, RecorderError> {
        let project = ProjectRef::parse(project_id)?;
        let url = self.endpoint(&project, &["status", commit_to_segment(commit_id)])?;
        self.send(self.http.get(url), project_id, commit_id).await
    }

    /// `max_entries` defaults to [`DEFAULT_MAX_ENTRIES`].
    pub async fn branch_status(
        &self,
        project_id: &str,
        branch: &str,
        max_entries: Option<usize>,
    ) -> Result<BranchStatus, RecorderError> {
        let project = ProjectRef::parse(project_id)?;
        let mut tail = vec!["branchStatus"];
        tail.extend(branch.split('/'));
        let url = self.endpoint(&project, &tail)?;
        let n = max_entries.unwrap_or(DEFAULT_MAX_ENTRIES);
        self.send(self.http.get(url).query(&[("n", n)]), project_id, branch)
            .await
    }

    pub async fn branch_tip(
        &self,
        project_id: &str,
        branch: &str,
    ) -> Result<BranchTip, RecorderError> {
        let project = ProjectRef::parse(project_id)?;
        let mut tail = vec!["branchTip"];
        tail.extend(branch.split('/'));
        let url = self.endpoint(&project, &tail)?;
        self.send(self.http.get(url), project_id, branch).await
    }

    /// Inclusive range `start_commit..=end_commit`, oldest first.
    pub async fn recordings(
        &self,
        project_id: &str,
        start_commit: &str,
        end_commit: &str,
        max_entries: Option<usize>,
    ) -> Result<Vec<Recording>, RecorderError> {
        let project = ProjectRef::parse(project_id)?;
        let range = format!(
            "{}...{}",
            commit_to_segment(start_commit),
            commit_to_segment(end_commit)
        );
        let url = self.endpoint(&project, &["recordings", &range])?;
        let n = max_entries.unwrap_or(DEFAULT_MAX_ENTRIES);
        self.send(self.http.get(url).query(&[("n", n)]), project_id, end_commit)
            .await
    }

    fn endpoint(&self, project: &ProjectRef, tail: &[&str]) -> Result<Url, RecorderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RecorderError::InvalidRequest(format!("bad server url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "recorder", project.owner.as_str(), project.name.as_str()])
            .extend(tail);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        project_id: &str,
        commit_id: &str,
    ) -> Result<T, RecorderError> {
        let req = match &self.user {
            Some(user) => req.header(USER_HEADER, user),
            None => req,
        };
        let resp = req.send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or(body);
            tracing::debug!(%status, project_id, commit_id, %message, "recorder request failed");
            return Err(RecorderError::from_status(
                status.as_u16(),
                project_id,
                commit_id,
                message,
            ));
        }
        resp.json().await.map_err(transport)
    }
}

#[async_trait]
impl RecordingSource for RecorderClient {
    async fn recordings(
        &self,
        project_id: &str,
        start_commit: &str,
        end_commit: &str,
        max_entries: usize,
    ) -> Result<Vec<Recording>, RecorderError> {
        RecorderClient::recordings(self, project_id, start_commit, end_commit, Some(max_entries))
            .await
    }
}

fn transport(err: reqwest::Error) -> RecorderError {
    RecorderError::Io(anyhow::Error::new(err).context("recorder request failed"))
}

/// Pull `error` out of a `{"error": "..."}` body.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uirec_core::{CommitObject, CoreObjects, UiState};
    use uirec_ledger::{CommitGraph, RecordingRepo, SqliteStore, UirecPaths};
    use uirec_serve::ServeConfig;

    const PROJECT: &str = "guest+withRec";

    /// `#init ← #m1 ← #m2 ← #m3` on `master`; `#m1` recorded; `alice` is a member.
    fn setup_workspace(dir: &std::path::Path) {
        let paths = UirecPaths::discover(dir);
        uirec_ledger::init_workspace(&paths).unwrap();
        let store = SqliteStore::open(&paths.db_path).unwrap();
        let p = store.create_project("guest", "withRec").unwrap();
        store.add_member(&p, "alice").unwrap();

        let mut parent: Option<String> = None;
        for id in ["#init", "#m1", "#m2", "#m3"] {
            let c = CommitObject::new(id, parent.iter().cloned().collect(), "#root", "guest", id);
            store.insert_commit(&p, &c).unwrap();
            parent = Some(id.to_string());
        }
        store.set_branch(&p, "master", "#m3").unwrap();
        store.set_branch(&p, "users/alice/wip", "#m2").unwrap();

        let m1 = store.commit(&p, "#m1").unwrap().unwrap();
        let mut ui_state = UiState::new();
        ui_state.insert("myState".into(), json!("Hello"));
        store
            .upsert_recording(&Recording {
                commit_id: m1.id.clone(),
                project_id: p,
                ui_state,
                commit_object: m1,
                core_objects: CoreObjects::new(),
                changed_nodes: Some(json!({})),
            })
            .unwrap();
    }

    /// Bind a real listener on an ephemeral port.
    async fn spawn_server(auth_enabled: bool) -> (String, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        setup_workspace(tmp.path());
        let config = ServeConfig {
            bind: "127.0.0.1".into(),
            port: 0,
            auth_enabled,
            max_entries: 100,
        };
        let app = uirec_serve::router(tmp.path(), &config);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), tmp)
    }

    fn event(commit: &str, parent: &str, local: bool) -> CommitEvent {
        let mut ui_state = UiState::new();
        ui_state.insert("myState".into(), json!("Hello again"));
        CommitEvent {
            project_id: PROJECT.into(),
            commit_object: CommitObject::new(commit, vec![parent.into()], "#root", "guest", "edit"),
            core_objects: CoreObjects::new(),
            changed_nodes: Some(json!({"update": {}})),
            local,
            ui_state,
        }
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(matches!(
            RecorderClient::new("not a url"),
            Err(RecorderError::InvalidRequest(_))
        ));
    }

    #[test]
    fn endpoint_encodes_segments() {
        let client = RecorderClient::new("http://localhost:9001/").unwrap();
        let project = ProjectRef::parse(PROJECT).unwrap();
        let url = client
            .endpoint(&project, &["branchStatus", "feat", "a b"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9001/api/recorder/guest/withRec/branchStatus/feat/a%20b"
        );
    }

    #[test]
    fn error_message_reads_error_field() {
        assert_eq!(error_message(r#"{"error":"nope"}"#).as_deref(), Some("nope"));
        assert_eq!(error_message("plain text"), None);
    }

    #[tokio::test]
    async fn ineligible_event_never_hits_the_network() {
        // Nothing listens on port 9; a request would fail.
        let client = RecorderClient::new("http://127.0.0.1:9").unwrap();
        let recorded = client.add_recording(&event("#m4", "#m3", false)).await.unwrap();
        assert!(!recorded);

        let mut ev = event("#m4", "#m3", true);
        ev.changed_nodes = None;
        assert!(!client.add_recording(&ev).await.unwrap());
    }

    #[tokio::test]
    async fn commit_status_over_http() {
        let (url, _tmp) = spawn_server(false).await;
        let client = RecorderClient::new(&url).unwrap();
        assert!(client.commit_status(PROJECT, "#m1").await.unwrap().exists);
        assert!(!client.commit_status(PROJECT, "#m2").await.unwrap().exists);
    }

    #[tokio::test]
    async fn branch_status_over_http() {
        let (url, _tmp) = spawn_server(false).await;
        let client = RecorderClient::new(&url).unwrap();

        let status = client.branch_status(PROJECT, "master", None).await.unwrap();
        assert_eq!(status, BranchStatus::found(3, 2, "#m1".into()));

        let status = client
            .branch_status(PROJECT, "users/alice/wip", Some(1))
            .await
            .unwrap();
        assert_eq!(status, BranchStatus::not_found(1));

        let status = client.branch_status(PROJECT, "gone", None).await.unwrap();
        assert_eq!(status, BranchStatus::missing());
    }

    #[tokio::test]
    async fn branch_tip_over_http() {
        let (url, _tmp) = spawn_server(false).await;
        let client = RecorderClient::new(&url).unwrap();

        let tip = client.branch_tip(PROJECT, "users/alice/wip").await.unwrap();
        assert_eq!(tip.commit_hash.as_deref(), Some("#m2"));
        let tip = client.branch_tip(PROJECT, "gone").await.unwrap();
        assert_eq!(tip.commit_hash, None);
    }

    #[tokio::test]
    async fn recordings_over_http() {
        let (url, _tmp) = spawn_server(false).await;
        let client = RecorderClient::new(&url).unwrap();

        let list = client.recordings(PROJECT, "#m1", "#m3", None).await.unwrap();
        let ids: Vec<&str> = list.iter().map(|r| r.commit_id.as_str()).collect();
        assert_eq!(ids, vec!["#m1", "#m2", "#m3"]);
        assert_eq!(list[0].ui_state["myState"], "Hello");
        assert!(list[2].ui_state.is_empty());
        assert!(list[2].changed_nodes.is_none());

        let source: &dyn RecordingSource = &client;
        assert!(source.recordings(PROJECT, "#m1", "#m3", 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn http_errors_map_to_recorder_errors() {
        let (url, _tmp) = spawn_server(false).await;
        let client = RecorderClient::new(&url).unwrap();

        let err = client
            .recordings(PROJECT, "#m1", "#doesNotExist", None)
            .await
            .unwrap_err();
        assert!(
            matches!(&err, RecorderError::NotFound { commit_id } if commit_id == "#doesNotExist"),
            "got {err:?}"
        );

        let err = client
            .commit_status("guest+doesNotExist", "#m1")
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 403);

        let err = client.commit_status("noplus", "#m1").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn add_recording_then_status() {
        let (url, tmp) = spawn_server(false).await;
        let client = RecorderClient::new(&url).unwrap();

        // The commit must exist in the graph for later range queries.
        let store = SqliteStore::open(&UirecPaths::discover(tmp.path()).db_path).unwrap();
        let ev = event("#m4", "#m3", true);
        store.insert_commit(PROJECT, &ev.commit_object).unwrap();
        drop(store);

        assert!(client.add_recording(&ev).await.unwrap());
        assert!(client.commit_status(PROJECT, "#m4").await.unwrap().exists);

        let list = client.recordings(PROJECT, "#m3", "#m4", None).await.unwrap();
        assert_eq!(list[1].ui_state["myState"], "Hello again");
    }

    #[tokio::test]
    async fn user_header_is_sent_when_auth_enabled() {
        let (url, _tmp) = spawn_server(true).await;

        let anonymous = RecorderClient::new(&url).unwrap();
        let err = anonymous.commit_status(PROJECT, "#m1").await.unwrap_err();
        assert!(matches!(err, RecorderError::NotAuthorized { .. }));

        let alice = RecorderClient::new(&url).unwrap().with_user("alice");
        assert!(alice.commit_status(PROJECT, "#m1").await.unwrap().exists);
    }
}
