//! Bounded worker pool shared by the fetch and extraction phases.
//!
//! Each call to [`WorkerPool::run`] is a barrier: it returns only after every
//! unit of work handed to it has finished. A unit that panics or is aborted is
//! reported as [`WorkOutcome::Failed`] for its own input and never affects
//! its siblings.

use crate::error::{Error, Result};
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Result of one unit of work
#[derive(Debug)]
pub enum WorkOutcome<I, O> {
    /// The unit ran to completion
    Completed(O),
    /// The unit panicked or was aborted before producing output
    Failed {
        /// Input the unit was started with
        item: I,
        /// Panic message or abort reason
        reason: String,
    },
}

/// Fixed-size pool of parallel workers
#[derive(Clone, Debug)]
pub struct WorkerPool {
    size: usize,
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    /// Build a pool running at most `size` units at once
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::WorkerPool(
                "pool size must be at least 1".to_string(),
            ));
        }
        if size > Semaphore::MAX_PERMITS {
            return Err(Error::WorkerPool(format!(
                "pool size {size} exceeds the supported maximum"
            )));
        }
        Ok(Self {
            size,
            permits: Arc::new(Semaphore::new(size)),
        })
    }

    /// Maximum number of concurrently running units
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `work` once per item and wait for all of them.
    ///
    /// Outcomes are returned in input order.
    pub async fn run<I, O, F, Fut>(
        &self,
        phase: &'static str,
        items: Vec<I>,
        work: F,
    ) -> Vec<WorkOutcome<I, O>>
    where
        I: Clone + Send + 'static,
        O: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = O> + Send + 'static,
    {
        debug!(phase, units = items.len(), workers = self.size, "dispatching");

        let work = Arc::new(work);
        let mut tasks = JoinSet::new();
        for (index, item) in items.iter().cloned().enumerate() {
            let permits = Arc::clone(&self.permits);
            let work = Arc::clone(&work);
            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return (index, Err("worker pool closed".to_string())),
                };
                let outcome = AssertUnwindSafe(work(item))
                    .catch_unwind()
                    .await
                    .map_err(panic_message);
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<std::result::Result<O, String>>> =
            std::iter::repeat_with(|| None).take(items.len()).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => warn!(phase, error = %e, "worker task terminated abnormally"),
            }
        }

        items
            .into_iter()
            .zip(slots)
            .map(|(item, slot)| match slot {
                Some(Ok(output)) => WorkOutcome::Completed(output),
                Some(Err(reason)) => {
                    warn!(phase, reason = %reason, "worker failed");
                    WorkOutcome::Failed { item, reason }
                }
                None => WorkOutcome::Failed {
                    item,
                    reason: "worker terminated before reporting".to_string(),
                },
            })
            .collect()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("worker panicked: {msg}")
    } else {
        "worker panicked".to_string()
    }
}
