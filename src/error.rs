use std::io;

use thiserror::Error;

/// Errors surfaced by constructors and the thin OS wrappers.
///
/// The dispatch core itself never returns `Result`: readiness failures are
/// delivered to the affected fiber as an [`Event`](crate::Event) and a
/// fatal multiplexer error is reported as `false` from
/// [`Reactor::work`](crate::Reactor::work).
#[derive(Debug, Error)]
pub enum Error {
    /// The readiness backend could not be set up.
    #[error("readiness backend setup failed: {0}")]
    Backend(#[source] io::Error),

    /// The fiber stack could not be allocated. The fiber is unusable.
    #[error("fiber stack allocation failed: {0}")]
    Stack(#[source] io::Error),

    /// A socket helper failed.
    #[error("socket operation failed: {0}")]
    Socket(#[source] io::Error),

    /// A timer descriptor operation failed.
    #[error("timer descriptor operation failed: {0}")]
    Timer(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
