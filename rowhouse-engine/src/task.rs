//! Bridging from async engine calls into the blocking store.

use crate::error::{EngineError, EngineResult};
use rowhouse_store::StoreResult;

/// Runs one blocking store call on the blocking pool.
///
/// The store facades are cheap clones over a shared connection, so callers
/// clone what they need and move it into the closure. Independent reads are
/// issued as several of these joined together.
pub(crate) async fn run_blocking<T, F>(f: F) -> EngineResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> StoreResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => Ok(result?),
        Err(err) => Err(EngineError::Internal(format!(
            "blocking store task failed: {err}"
        ))),
    }
}
