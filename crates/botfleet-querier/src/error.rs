use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuerierError {
    #[error("query timed out")]
    Timeout,

    #[error("malformed reply")]
    MalformedReply,

    #[error("dns resolution failed for {host}")]
    ResolveFailed { host: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, QuerierError>;
