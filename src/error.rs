use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Browser launch failed: {0}")]
    LaunchError(String),

    #[error("Navigation failed: {0}")]
    NavigationError(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("JavaScript error: {0}")]
    JsError(String),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("Browser session is not running")]
    SessionClosed,

    #[error("Transport error after {attempts} attempts: {message}")]
    Transport { attempts: u32, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("Profile store: {0}")]
    Profile(String),

    #[error("CDP error: {0}")]
    CdpError(#[from] chromiumoxide::error::CdpError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Whether a scrape attempt that failed with this error may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::Transport { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
