pub mod access;
pub mod error;
pub mod ids;
pub mod recording;
pub mod types;
pub mod ui_state;

pub use access::Caller;
pub use error::RecorderError;
pub use recording::{is_recordable, CommitEvent, IgnoreReason, Recording};
pub use types::*;
