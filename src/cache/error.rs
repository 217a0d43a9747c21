use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),

    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<bb8::RunError<redis::RedisError>> for CacheError {
    fn from(err: bb8::RunError<redis::RedisError>) -> Self {
        match err {
            bb8::RunError::User(e) => CacheError::Backend(e),
            bb8::RunError::TimedOut => {
                CacheError::Connection("timed out waiting for a pooled connection".to_string())
            }
        }
    }
}
