use thiserror::Error;

/// Custom error type for sources, allows us to differentiate between a
/// connection budget exhausted at startup and plain I/O trouble.
///
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("can not connect to {0} after {1} attempts")]
    ConnectionFailed(String, usize),
    #[error("read timed out")]
    Timeout,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
