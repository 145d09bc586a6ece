use thiserror::Error;

pub type Result<T> = std::result::Result<T, GranolaError>;

#[derive(Debug, Error)]
pub enum GranolaError {
    /// No usable credential could be loaded from the local credential file
    #[error("could not authenticate: failed to load Granola credentials")]
    AuthUnavailable,

    #[error("Granola API error: {status} {reason}")]
    Api { status: u16, reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GranolaError {
    /// HTTP status carried by an API error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            GranolaError::Api { status, .. } => Some(*status),
            GranolaError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
