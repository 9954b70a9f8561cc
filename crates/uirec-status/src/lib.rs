pub mod resolver;

pub use resolver::{RecordOutcome, RecorderBackend, StatusResolver};
