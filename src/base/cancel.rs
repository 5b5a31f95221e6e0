//! Cooperative cancellation.
//!
//! Every traversal takes a [`CancellationToken`] and polls it once per node or
//! token. A superseded request stops with [`Cancelled`]; partially built state
//! is dropped, never published.

use tokio_util::sync::CancellationToken;

/// The request was abandoned because its token was signalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("request cancelled")]
pub struct Cancelled;

/// Return `Err(Cancelled)` if the token has been signalled.
#[inline]
pub fn check(cancel: &CancellationToken) -> Result<(), Cancelled> {
    if cancel.is_cancelled() {
        Err(Cancelled)
    } else {
        Ok(())
    }
}
