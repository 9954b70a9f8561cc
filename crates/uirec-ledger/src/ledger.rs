use crate::paths::UirecPaths;
use crate::sqlite_store::SqliteStore;

/// A `.uirec/` workspace on disk.
pub struct Ledger {
    pub paths: UirecPaths,
}

impl Ledger {
    /// Open an existing workspace. Fails if `.uirec/` does not exist.
    pub fn open(root: impl Into<std::path::PathBuf>) -> anyhow::Result<Self> {
        let paths = UirecPaths::discover(root);
        if !paths.is_initialized() {
            anyhow::bail!(
                "not a uirec workspace ({}/.uirec not found). Run `uirec init` first.",
                paths.root.display()
            );
        }
        Ok(Self { paths })
    }

    /// Open a fresh connection to the workspace database.
    pub fn store(&self) -> anyhow::Result<SqliteStore> {
        SqliteStore::open_or_create(&self.paths.db_path)
    }
}

/// Create `.uirec/` and its database. Idempotent.
pub fn init_workspace(paths: &UirecPaths) -> anyhow::Result<()> {
    paths.ensure_layout()?;
    SqliteStore::open_or_create(&paths.db_path)?;
    tracing::info!(db = %paths.db_path.display(), "workspace initialized");
    Ok(())
}
