use thiserror::Error;

use uirec_core::RecorderError;

use crate::cursor::Boundary;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("no recordings found")]
    EmptyRecording,

    #[error("end of recording reached")]
    EndOfRecording,

    #[error("beginning of recording reached")]
    BeginningOfRecording,

    #[error("fetching recordings failed: {0}")]
    Fetch(#[from] RecorderError),

    #[error(transparent)]
    Session(anyhow::Error),
}

impl ReplayError {
    /// Expected end-of-travel conditions; the caller disables that direction.
    pub fn is_boundary(&self) -> bool {
        matches!(
            self,
            ReplayError::EndOfRecording | ReplayError::BeginningOfRecording
        )
    }
}

impl From<Boundary> for ReplayError {
    fn from(boundary: Boundary) -> Self {
        match boundary {
            Boundary::End => ReplayError::EndOfRecording,
            Boundary::Beginning => ReplayError::BeginningOfRecording,
        }
    }
}
