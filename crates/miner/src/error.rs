use thiserror::Error;

pub type Result<T> = std::result::Result<T, MinerError>;

#[derive(Error, Debug)]
pub enum MinerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status} for {url}")]
    Upstream { status: u16, url: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Repository deadline exceeded")]
    DeadlineExceeded,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl MinerError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
