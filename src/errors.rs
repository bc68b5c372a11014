use thiserror::Error;

pub type Result<T> = std::result::Result<T, SignageError>;

#[derive(Error, Debug)]
pub enum SignageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Backend responded with {0}: {1}")]
    Backend(u16, String),
    #[error("Parsing error")]
    Parse,
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Invalid roster entry {0}: {1}")]
    InvalidEntry(String, String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for SignageError {
    fn from(e: serde_json::Error) -> Self {
        log::debug!("JSON parsing failed: {}", e);
        Self::Parse
    }
}
