use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArrearsError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Directory lookup failed: {0}")]
    DirectoryError(String),
}

pub type Result<T> = std::result::Result<T, ArrearsError>;

/// Failure of a single `send` on a messaging channel.
///
/// Never aborts a batch: the dispatch pipeline records it against the target
/// and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
    #[error("rejected by provider: {0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<std::io::Error> for ChannelError {
    fn from(err: std::io::Error) -> Self {
        ChannelError::Transport(err.to_string())
    }
}
