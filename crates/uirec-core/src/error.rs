use thiserror::Error;

/// Failures of the recording store and its transport.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("not authorized to access project '{project_id}'")]
    NotAuthorized { project_id: String },

    #[error("commit '{commit_id}' not found")]
    NotFound { commit_id: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

impl RecorderError {
    pub fn not_authorized(project_id: impl Into<String>) -> Self {
        Self::NotAuthorized {
            project_id: project_id.into(),
        }
    }

    pub fn not_found(commit_id: impl Into<String>) -> Self {
        Self::NotFound {
            commit_id: commit_id.into(),
        }
    }

    /// HTTP status code the error travels as.
    pub fn status_code(&self) -> u16 {
        match self {
            RecorderError::NotAuthorized { .. } => 403,
            RecorderError::NotFound { .. } => 404,
            RecorderError::InvalidRequest(_) => 400,
            RecorderError::Io(_) => 500,
        }
    }

    /// Rebuild a typed error from a status code and message received over HTTP.
    pub fn from_status(status: u16, project_id: &str, commit_id: &str, message: String) -> Self {
        match status {
            403 => Self::not_authorized(project_id),
            404 => Self::not_found(commit_id),
            400 => Self::InvalidRequest(message),
            _ => Self::Io(anyhow::anyhow!("server returned {status}: {message}")),
        }
    }
}
