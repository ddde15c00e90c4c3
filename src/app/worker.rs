use std::future::Future;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Runs `work` off the event loop and posts its result back on `results`.
/// A dropped receiver discards the result.
pub(super) fn spawn_worker_action<T, W>(
    runtime: &Handle,
    work: W,
    results: mpsc::UnboundedSender<T>,
) where
    T: Send + 'static,
    W: Future<Output = T> + Send + 'static,
{
    runtime.spawn(async move {
        let result = work.await;
        if results.send(result).is_err() {
            tracing::debug!("worker result receiver dropped");
        }
    });
}
