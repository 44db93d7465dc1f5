//! Pool-level errors, surfaced to callers as `BACKEND_UNAVAILABLE` at the
//! gateway boundary.

#[derive(Debug, thiserror::Error)]
pub enum PoolError<E> {
    #[error("timed out waiting for a connection")]
    Timeout,

    #[error("pool is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Connect(E),
}
