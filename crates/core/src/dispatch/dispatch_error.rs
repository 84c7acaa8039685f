use thiserror::Error;

use crate::shared::timestamp::OrderViolation;

/// Failures surfaced to the caller of the dispatcher.
///
/// Detector (capability) failures never appear here; the worker logs them
/// and carries on.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("start() called without calling stop() first")]
    AlreadyRunning,
    #[error("stop() called without calling start() first")]
    NotRunning,
    #[error("failed to spawn detector worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("detector worker is no longer accepting commands")]
    WorkerUnavailable,
    #[error("detector worker panicked")]
    WorkerPanicked,
    #[error("results out of order: {0}")]
    OutOfOrder(#[from] OrderViolation),
}
