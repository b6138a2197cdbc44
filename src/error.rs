use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Rate limit still exceeded after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Filter error: {message}")]
    Filter { message: String },

    #[error("Cache error: {message}")]
    Cache { message: String },
}

impl SearchError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        SearchError::Config { message: message.into() }
    }

    pub(crate) fn filter(message: impl Into<String>) -> Self {
        SearchError::Filter { message: message.into() }
    }

    /// HTTP status for API errors, `None` for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            SearchError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
