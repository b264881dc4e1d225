// Keyguard — Worker dispatch
//
// Interactive challenges and biometry-bound key operations block until the
// user responds. They run on tokio's blocking pool; the caller awaits the
// join handle (a single-consumer completion) and only then touches
// user-visible state.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Worker task for '{label}' panicked")]
    Panicked { label: &'static str },

    #[error("Worker task for '{label}' was cancelled")]
    Cancelled { label: &'static str },
}

/// Run `job` on a worker thread and deliver its result back to the caller.
pub async fn run_blocking<F, T>(label: &'static str, job: F) -> Result<T, DispatchError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tracing::debug!(label, "Dispatching blocking call to worker");
    tokio::task::spawn_blocking(job).await.map_err(|e| {
        if e.is_panic() {
            tracing::warn!(label, "Worker task panicked");
            DispatchError::Panicked { label }
        } else {
            DispatchError::Cancelled { label }
        }
    })
}
