/// Request header naming the authenticated user when authentication is enabled.
pub const USER_HEADER: &str = "x-uirec-user";

/// Who is asking. Authentication itself happens outside this workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// Authentication is disabled: every existing project is readable.
    Trusted,
    /// An authenticated user; needs a membership row for the project.
    User(String),
    /// No identity while authentication is enabled.
    Anonymous,
}

impl Caller {
    /// Derive the caller from the auth setting and an optional user header.
    pub fn resolve(auth_enabled: bool, user: Option<&str>) -> Self {
        match (auth_enabled, user) {
            (false, _) => Caller::Trusted,
            (true, Some(u)) if !u.trim().is_empty() => Caller::User(u.trim().to_string()),
            (true, _) => Caller::Anonymous,
        }
    }
}
