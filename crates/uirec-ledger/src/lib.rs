pub mod config;
pub mod graph;
pub mod ledger;
pub mod paths;
pub mod sqlite_store;

pub use config::RecorderConfig;
pub use graph::{ancestors, AncestorWalk, CommitGraph, ProjectAccess, RecordingRepo};
pub use ledger::{init_workspace, Ledger};
pub use paths::UirecPaths;
pub use sqlite_store::SqliteStore;
