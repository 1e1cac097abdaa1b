//! Detached background work.
//!
//! Cache writes that must not delay a response run here. Callers never
//! await them; failures are logged and dropped.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use shellcache_core::Error;
use tokio::task::JoinHandle;

/// Registry of spawned background tasks.
///
/// Cloning shares the registry. [`settle`](Self::settle) lets a host drain
/// outstanding work before shutdown.
#[derive(Clone, Default, Debug)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` without waiting for it.
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::warn!(task = label, error = %e, "background task failed");
            }
        });

        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Number of tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        let handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Wait until every task, including ones spawned meanwhile, has finished.
    pub async fn settle(&self) {
        loop {
            let batch = std::mem::take(&mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner));
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "background task panicked");
                }
            }
        }
    }
}
