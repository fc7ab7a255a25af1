//! Bounded pool for heavy handler work (downloads, catalog scraping, uploads).
//!
//! Heavy handlers must not be spawned ad hoc: a burst of `movie` searches
//! would otherwise open an unbounded number of outbound connections. Tasks
//! submitted here wait for a semaphore permit, so at most `max_in_flight` run
//! at once while `spawn` itself returns immediately.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, Instrument};

#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    max_in_flight: usize,
}

impl WorkerPool {
    pub fn new(max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    /// Queue `task` for execution. Panics inside the task are caught and logged.
    /// The task inherits the caller's tracing span.
    pub fn spawn<F>(&self, label: &'static str, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    debug!(task = label, "worker pool closed, dropping task");
                    return;
                }
            };
            contain(label, task).await;
        }
        .in_current_span())
    }

    /// Number of tasks currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.permits.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.max_in_flight
    }

    /// Stop accepting work; queued tasks are dropped once they wake.
    pub fn close(&self) {
        self.permits.close();
    }
}

/// Await `fut`, converting a panic into a logged error.
///
/// Returns `None` when the future panicked.
pub async fn contain<F>(label: &str, fut: F) -> Option<F::Output>
where
    F: Future,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(out) => Some(out),
        Err(payload) => {
            error!(task = label, panic = %panic_message(&payload), "task panicked; contained");
            None
        }
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
