use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("No scan at position {0}")]
    UnknownScan(usize),

    #[error("No report to download")]
    NoActiveReport,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ScanError {
    pub fn decode(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
