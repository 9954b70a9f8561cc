//! SQLite-backed storage for projects, commit history and recordings.
//!
//! One `recordings.db` file in WAL mode. Each connection is independent, so
//! readers in different requests never share state; the only write that can
//! race is the recording upsert, which converges on the last writer.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use uirec_core::{Caller, CommitId, CommitObject, ObjectKind, Recording};

use crate::graph::{CommitGraph, ProjectAccess, RecordingRepo};

const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS projects (
    project_id TEXT PRIMARY KEY,
    owner TEXT NOT NULL,
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS project_members (
    project_id TEXT NOT NULL REFERENCES projects(project_id),
    user_id TEXT NOT NULL,
    PRIMARY KEY (project_id, user_id)
);

CREATE TABLE IF NOT EXISTS commits (
    project_id TEXT NOT NULL REFERENCES projects(project_id),
    commit_id TEXT NOT NULL,
    first_parent TEXT,
    body TEXT NOT NULL,
    PRIMARY KEY (project_id, commit_id)
);

CREATE TABLE IF NOT EXISTS branches (
    project_id TEXT NOT NULL REFERENCES projects(project_id),
    name TEXT NOT NULL,
    commit_id TEXT NOT NULL,
    PRIMARY KEY (project_id, name)
);

CREATE TABLE IF NOT EXISTS objects (
    project_id TEXT NOT NULL REFERENCES projects(project_id),
    hash TEXT NOT NULL,
    kind TEXT NOT NULL,
    body TEXT NOT NULL,
    PRIMARY KEY (project_id, hash)
);

CREATE TABLE IF NOT EXISTS recordings (
    project_id TEXT NOT NULL REFERENCES projects(project_id),
    commit_id TEXT NOT NULL,
    ui_state TEXT NOT NULL DEFAULT '{}',
    commit_object TEXT NOT NULL,
    core_objects TEXT NOT NULL DEFAULT '{}',
    changed_nodes TEXT,
    recorded_at TEXT NOT NULL,
    PRIMARY KEY (project_id, commit_id)
);

CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// SQLite-backed storage engine.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an existing recordings.db.
    pub fn open(db_path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.apply_pragmas()?;
        Ok(store)
    }

    /// Open or create recordings.db with full schema.
    pub fn open_or_create(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.apply_pragmas()?;
        store.apply_schema()?;
        Ok(store)
    }

    fn apply_pragmas(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(())
    }

    fn apply_schema(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(SCHEMA_SQL)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('version', ?1)",
            params![SCHEMA_VERSION.to_string()],
        )?;
        Ok(())
    }

    pub fn schema_version(&self) -> anyhow::Result<u32> {
        let version: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM schema_meta WHERE key = 'version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version.and_then(|v| v.parse().ok()).unwrap_or(0))
    }

    // ── Projects ────────────────────────────────────────────────────

    /// Register a project. Idempotent.
    pub fn create_project(&self, owner: &str, name: &str) -> anyhow::Result<String> {
        let project_id = format!("{owner}+{name}");
        self.conn.execute(
            "INSERT OR IGNORE INTO projects (project_id, owner, name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![project_id, owner, name, now_rfc3339()?],
        )?;
        Ok(project_id)
    }

    pub fn project_exists(&self, project_id: &str) -> anyhow::Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM projects WHERE project_id = ?1",
                params![project_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn list_projects(&self) -> anyhow::Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT project_id FROM projects ORDER BY project_id")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    /// Give a user read access to a project.
    pub fn add_member(&self, project_id: &str, user_id: &str) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO project_members (project_id, user_id) VALUES (?1, ?2)",
            params![project_id, user_id],
        )?;
        Ok(())
    }

    fn is_member(&self, project_id: &str, user_id: &str) -> anyhow::Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM project_members WHERE project_id = ?1 AND user_id = ?2",
                params![project_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ── Commit graph ────────────────────────────────────────────────

    /// Store a commit object. Commits are immutable, so re-inserting is a no-op.
    pub fn insert_commit(&self, project_id: &str, commit: &CommitObject) -> anyhow::Result<()> {
        let body = serde_json::to_string(commit)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO commits (project_id, commit_id, first_parent, body)
             VALUES (?1, ?2, ?3, ?4)",
            params![project_id, commit.id, commit.first_parent(), body],
        )?;
        Ok(())
    }

    /// Point a branch at a commit, creating the branch if needed.
    pub fn set_branch(&self, project_id: &str, branch: &str, commit_id: &str) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO branches (project_id, name, commit_id) VALUES (?1, ?2, ?3)
             ON CONFLICT (project_id, name) DO UPDATE SET commit_id = excluded.commit_id",
            params![project_id, branch, commit_id],
        )?;
        Ok(())
    }

    /// Read back a stored content object and its kind.
    pub fn get_object(
        &self,
        project_id: &str,
        hash: &str,
    ) -> anyhow::Result<Option<(ObjectKind, serde_json::Value)>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT kind, body FROM objects WHERE project_id = ?1 AND hash = ?2",
                params![project_id, hash],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some((kind, body)) => {
                let kind = if kind == ObjectKind::Patch.as_str() {
                    ObjectKind::Patch
                } else {
                    ObjectKind::Full
                };
                Ok(Some((kind, serde_json::from_str(&body)?)))
            }
        }
    }

    // ── Recordings ──────────────────────────────────────────────────

    pub fn count_recordings(&self, project_id: &str) -> anyhow::Result<usize> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM recordings WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

impl CommitGraph for SqliteStore {
    fn commit(&self, project_id: &str, commit_id: &str) -> anyhow::Result<Option<CommitObject>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM commits WHERE project_id = ?1 AND commit_id = ?2",
                params![project_id, commit_id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| serde_json::from_str(&b).map_err(Into::into))
            .transpose()
    }

    fn branch_tip(&self, project_id: &str, branch: &str) -> anyhow::Result<Option<CommitId>> {
        let tip = self
            .conn
            .query_row(
                "SELECT commit_id FROM branches WHERE project_id = ?1 AND name = ?2",
                params![project_id, branch],
                |row| row.get(0),
            )
            .optional()?;
        Ok(tip)
    }

    fn insert_object(
        &self,
        project_id: &str,
        hash: &str,
        kind: ObjectKind,
        obj: &serde_json::Value,
    ) -> anyhow::Result<()> {
        let body = serde_json::to_string(obj)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO objects (project_id, hash, kind, body) VALUES (?1, ?2, ?3, ?4)",
            params![project_id, hash, kind.as_str(), body],
        )?;
        Ok(())
    }
}

impl RecordingRepo for SqliteStore {
    fn upsert_recording(&self, recording: &Recording) -> anyhow::Result<()> {
        let ui_state = serde_json::to_string(&recording.ui_state)?;
        let commit_object = serde_json::to_string(&recording.commit_object)?;
        let core_objects = serde_json::to_string(&recording.core_objects)?;
        let changed_nodes = recording
            .changed_nodes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO recordings (
                project_id, commit_id, ui_state, commit_object,
                core_objects, changed_nodes, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (project_id, commit_id) DO UPDATE SET
                ui_state = excluded.ui_state,
                commit_object = excluded.commit_object,
                core_objects = excluded.core_objects,
                changed_nodes = excluded.changed_nodes,
                recorded_at = excluded.recorded_at",
            params![
                recording.project_id,
                recording.commit_id,
                ui_state,
                commit_object,
                core_objects,
                changed_nodes,
                now_rfc3339()?,
            ],
        )?;
        Ok(())
    }

    fn has_recording(&self, project_id: &str, commit_id: &str) -> anyhow::Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM recordings WHERE project_id = ?1 AND commit_id = ?2",
                params![project_id, commit_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn get_recording(
        &self,
        project_id: &str,
        commit_id: &str,
    ) -> anyhow::Result<Option<Recording>> {
        let row: Option<RecordingRow> = self
            .conn
            .query_row(
                "SELECT project_id, commit_id, ui_state, commit_object, core_objects, changed_nodes
                 FROM recordings WHERE project_id = ?1 AND commit_id = ?2",
                params![project_id, commit_id],
                |row| {
                    Ok(RecordingRow {
                        project_id: row.get(0)?,
                        commit_id: row.get(1)?,
                        ui_state: row.get(2)?,
                        commit_object: row.get(3)?,
                        core_objects: row.get(4)?,
                        changed_nodes: row.get(5)?,
                    })
                },
            )
            .optional()?;
        row.map(row_to_recording).transpose()
    }
}

impl ProjectAccess for SqliteStore {
    fn can_access(&self, project_id: &str, caller: &Caller) -> anyhow::Result<bool> {
        if !self.project_exists(project_id)? {
            return Ok(false);
        }
        match caller {
            Caller::Trusted => Ok(true),
            Caller::User(user_id) => self.is_member(project_id, user_id),
            Caller::Anonymous => Ok(false),
        }
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        let _ = self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);");
    }
}

// ── Row mapping ─────────────────────────────────────────────────────

struct RecordingRow {
    project_id: String,
    commit_id: String,
    ui_state: String,
    commit_object: String,
    core_objects: String,
    changed_nodes: Option<String>,
}

fn row_to_recording(row: RecordingRow) -> anyhow::Result<Recording> {
    let changed_nodes = match row.changed_nodes {
        Some(s) => match serde_json::from_str::<serde_json::Value>(&s)? {
            serde_json::Value::Null => None,
            v => Some(v),
        },
        None => None,
    };
    Ok(Recording {
        commit_id: row.commit_id,
        project_id: row.project_id,
        ui_state: serde_json::from_str(&row.ui_state)?,
        commit_object: serde_json::from_str(&row.commit_object)?,
        core_objects: serde_json::from_str(&row.core_objects)?,
        changed_nodes,
    })
}

fn now_rfc3339() -> anyhow::Result<String> {
    Ok(time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339)?)
}
