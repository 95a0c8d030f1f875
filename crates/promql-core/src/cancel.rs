//! Cooperative cancellation for network-bound operations.

use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// The caller's token fired before the operation completed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Races `fut` against `token`, returning the operation's own result or
/// `Cancelled` converted into the caller's error type.
///
/// A token that is already cancelled wins without polling `fut`.
pub async fn with_cancellation<F, T, E>(token: &CancellationToken, fut: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<Cancelled>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(E::from(Cancelled)),
        result = fut => result,
    }
}
