//! Error taxonomy shared by the filter, catalog and session layers.

/// Errors surfaced to the action that triggered them
#[derive(Debug, thiserror::Error)]
pub enum GigError {
    /// One or more form fields are missing or malformed. Always the full list.
    #[error("validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("an account with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("invalid email or password")]
    InvalidCredentials,

    /// The delegated identity service failed. Only a readable message is kept.
    #[error("identity provider error: {0}")]
    AuthProvider(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Persistence(String),

    /// The current role may not perform the action
    #[error("not allowed: {0}")]
    Forbidden(String),
}

pub type GigResult<T> = Result<T, GigError>;

impl GigError {
    /// Messages suitable for a bullet list in the shell
    pub fn messages(&self) -> Vec<String> {
        match self {
            GigError::Validation(errors) => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

impl From<serde_json::Error> for GigError {
    fn from(e: serde_json::Error) -> Self {
        GigError::Persistence(format!("serialization failed: {}", e))
    }
}

impl From<std::io::Error> for GigError {
    fn from(e: std::io::Error) -> Self {
        GigError::Persistence(e.to_string())
    }
}
