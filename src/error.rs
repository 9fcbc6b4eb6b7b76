use thiserror::Error;

pub type Result<T> = std::result::Result<T, CountError>;

#[derive(Error, Debug)]
pub enum CountError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error: HTTP {status} from {url}")]
    Api { status: u16, url: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Identity resolution failed: {0}")]
    AuthResolution(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Run cancelled: deadline exceeded")]
    Cancelled,
}
