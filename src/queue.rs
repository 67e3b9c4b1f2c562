//! Bounded conversion queue.
//!
//! A counting semaphore gates how many conversion jobs run at once. The
//! converters are external processes (soffice, pandoc) that each saturate a
//! core, so the capacity is fixed at construction and never exceeds the host's
//! available parallelism.
//!
//! Admission is FIFO: tokio's semaphore is fair, so jobs acquire permits in the
//! order they started waiting. Callers take the permit before spawning a job,
//! which makes admission follow scheduling order rather than task polling
//! order. Completion order is unconstrained.

use crate::error::{MigrateError, Result};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Lifecycle of a single conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Scheduled, waiting for a queue permit.
    Pending,
    /// Admitted; content read and conversion in flight.
    Running,
    /// Output written.
    Completed,
    /// Read, conversion or write failed. Terminal; never retried.
    Failed,
}

/// Number of CPUs the process may use, at least 1.
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
        .max(1)
}

/// Fixed-capacity admission gate for conversion jobs.
///
/// Cloning is cheap and shares the same permits.
#[derive(Debug, Clone)]
pub struct ConversionQueue {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConversionQueue {
    /// Build a queue sized for this host.
    ///
    /// `None` uses the CPU count; `Some(n)` is clamped to `1..=cpus`.
    /// `Some(0)` is rejected.
    pub fn new(requested: Option<usize>) -> Result<Self> {
        Self::with_ceiling(requested, host_parallelism())
    }

    /// Like [`Self::new`] with an explicit ceiling instead of the CPU count.
    pub fn with_ceiling(requested: Option<usize>, ceiling: usize) -> Result<Self> {
        if requested == Some(0) {
            return Err(MigrateError::InvalidConfig(
                "Conversion concurrency must be ≥ 1".into(),
            ));
        }
        let ceiling = ceiling.max(1);
        let capacity = requested.unwrap_or(ceiling).clamp(1, ceiling);
        debug!("Conversion queue capacity: {} (ceiling {})", capacity, ceiling);
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Maximum number of concurrently running jobs.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held by a running job.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for admission. The job runs while the returned permit is alive.
    pub async fn admit(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|e| MigrateError::Internal(format!("conversion queue closed: {e}")))
    }

    /// Wait until no admitted job is still running.
    pub async fn drained(&self) -> Result<()> {
        let all = u32::try_from(self.capacity).unwrap_or(u32::MAX);
        let _all = self
            .semaphore
            .acquire_many(all)
            .await
            .map_err(|e| MigrateError::Internal(format!("conversion queue closed: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn zero_is_rejected() {
        assert!(ConversionQueue::new(Some(0)).is_err());
    }

    #[test]
    fn capacity_clamped_to_ceiling() {
        assert_eq!(ConversionQueue::with_ceiling(Some(64), 4).unwrap().capacity(), 4);
        assert_eq!(ConversionQueue::with_ceiling(Some(2), 4).unwrap().capacity(), 2);
        assert_eq!(ConversionQueue::with_ceiling(None, 4).unwrap().capacity(), 4);
        assert_eq!(ConversionQueue::with_ceiling(None, 0).unwrap().capacity(), 1);
    }

    #[test]
    fn default_never_exceeds_host() {
        let q = ConversionQueue::new(Some(usize::MAX)).unwrap();
        assert_eq!(q.capacity(), host_parallelism());
    }

    #[tokio::test]
    async fn never_more_than_capacity_running() {
        let queue = ConversionQueue::with_ceiling(Some(2), 8).unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs = (0..10).map(|_| {
            let queue = queue.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            async move {
                let _permit = queue.admit().await?;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, MigrateError>(())
            }
        });
        futures::future::try_join_all(jobs).await.unwrap();

        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(queue.available(), 2);
    }

    #[tokio::test]
    async fn admission_follows_request_order() {
        let queue = ConversionQueue::with_ceiling(Some(1), 1).unwrap();
        let first = queue.admit().await.unwrap();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let waiters: Vec<_> = (0..5)
            .map(|i| {
                let queue = queue.clone();
                let order = Arc::clone(&order);
                async move {
                    let _permit = queue.admit().await.unwrap();
                    order.lock().unwrap().push(i);
                }
                .boxed()
            })
            .collect();
        let all = futures::future::join_all(waiters);
        tokio::pin!(all);
        // Register every waiter before the first permit is released.
        assert!(futures::poll!(all.as_mut()).is_pending());
        drop(first);
        all.await;

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn drained_waits_for_spawned_jobs() {
        let queue = ConversionQueue::with_ceiling(Some(2), 2).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let permit = queue.admit().await.unwrap();
            let done = Arc::clone(&done);
            tokio::spawn(async move {
                let _permit = permit;
                tokio::time::sleep(Duration::from_millis(30)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        queue.drained().await.unwrap();

        assert_eq!(done.load(Ordering::SeqCst), 2);
        assert_eq!(queue.available(), 2);
    }
}
