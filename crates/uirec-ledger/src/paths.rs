use std::path::{Path, PathBuf};

/// All well-known paths under `.uirec/`.
#[derive(Debug, Clone)]
pub struct UirecPaths {
    pub root: PathBuf,
    pub uirec_dir: PathBuf,
    pub db_path: PathBuf,
    pub config_json: PathBuf,
}

impl UirecPaths {
    /// Derive all paths from a workspace root. Pure computation, no I/O.
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let uirec_dir = root.join(".uirec");
        Self {
            db_path: uirec_dir.join("recordings.db"),
            config_json: uirec_dir.join("config.json"),
            uirec_dir,
            root,
        }
    }

    /// Create all required directories. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.uirec_dir)?;
        Ok(())
    }

    /// Check whether `.uirec/` exists.
    pub fn is_initialized(&self) -> bool {
        self.uirec_dir.is_dir()
    }

    /// Walk up from `start` looking for a directory containing `.uirec/`.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(".uirec").is_dir() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }
}
