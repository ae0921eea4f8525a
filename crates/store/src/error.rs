use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The backend could not be reached when connecting or subscribing
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Channel closed")]
    Closed,
}
