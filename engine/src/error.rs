use thiserror::Error;

/// Engine-level fatal conditions.
///
#[derive(Debug, Error)]
pub enum EngineStatus {
    #[error("Bad airports file version v{0}, need v{1}")]
    BadAirportsVersion(usize, usize),
    #[error("Message queue overflowed (capacity {0}), session aborted.")]
    QueueOverflow(usize),
    #[error("Pipeline already ran, source consumed.")]
    SourceConsumed,
}
