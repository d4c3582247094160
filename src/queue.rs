//! Shared job queue with drain detection.
//!
//! Several producers (the initial wordlist pass and every recursive
//! re-expansion) feed one bounded channel that all workers consume. The queue
//! counts running producers plus jobs that were enqueued but not yet
//! completed; when that count reaches zero nothing can ever be enqueued again
//! and the queue reports itself drained.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use url::Url;

use crate::types::ScanJob;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug)]
pub struct JobQueue {
    tx: mpsc::Sender<ScanJob>,
    rx: Mutex<mpsc::Receiver<ScanJob>>,
    outstanding: AtomicUsize,
    drained: CancellationToken,
}

/// Keeps the queue open while a producer is running. Released on drop.
#[derive(Debug)]
pub struct ProducerGuard {
    queue: Arc<JobQueue>,
}

impl Drop for ProducerGuard {
    fn drop(&mut self) {
        self.queue.release();
    }
}

impl JobQueue {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Arc::new(Self {
            tx,
            rx: Mutex::new(rx),
            outstanding: AtomicUsize::new(0),
            drained: CancellationToken::new(),
        })
    }

    /// Register a producer. Must be called before the producer task starts so
    /// the queue cannot be observed as drained in between.
    pub fn register_producer(self: &Arc<Self>) -> ProducerGuard {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        ProducerGuard {
            queue: Arc::clone(self),
        }
    }

    /// Enqueue a job, waiting for capacity. Returns `false` if cancelled first.
    pub async fn push(&self, job: ScanJob, cancel: &CancellationToken) -> bool {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            res = self.tx.send(job) => res.is_ok(),
        };
        if !sent {
            self.release();
        }
        sent
    }

    /// Take the next job. `None` once the queue is drained or the scan is cancelled.
    pub async fn pop(&self, cancel: &CancellationToken) -> Option<ScanJob> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            _ = self.drained.cancelled() => None,
            job = async { self.rx.lock().await.recv().await } => job,
        }
    }

    /// Mark a popped job as fully processed.
    pub fn complete(&self) {
        self.release();
    }

    pub fn is_drained(&self) -> bool {
        self.drained.is_cancelled()
    }

    /// Spawn a task feeding `candidates` under `base` at `depth`.
    pub fn spawn_producer<I>(
        self: &Arc<Self>,
        candidates: I,
        base: Url,
        depth: usize,
        cancel: CancellationToken,
    ) -> JoinHandle<()>
    where
        I: IntoIterator<Item = String> + Send + 'static,
        I::IntoIter: Send,
    {
        trace!(base = %base, depth, "producer started");
        let jobs = candidates
            .into_iter()
            .map(move |candidate| ScanJob::new(base.clone(), candidate, depth));
        self.spawn_jobs(jobs, cancel)
    }

    /// Spawn a task feeding ready-made jobs.
    pub fn spawn_jobs<I>(self: &Arc<Self>, jobs: I, cancel: CancellationToken) -> JoinHandle<()>
    where
        I: IntoIterator<Item = ScanJob> + Send + 'static,
        I::IntoIter: Send,
    {
        let guard = self.register_producer();
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            let mut produced = 0usize;
            for job in jobs {
                if !queue.push(job, &cancel).await {
                    break;
                }
                produced += 1;
            }
            trace!(produced, "producer finished");
        })
    }

    fn release(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.drained.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://t.test/").unwrap()
    }

    #[tokio::test]
    async fn drains_after_producer_and_jobs_finish() {
        let queue = JobQueue::new(2);
        let cancel = CancellationToken::new();
        queue.spawn_producer(vec!["a".to_string(), "b".into(), "c".into()], base(), 0, cancel.clone());

        let mut seen = Vec::new();
        while let Some(job) = queue.pop(&cancel).await {
            seen.push(job.candidate);
            queue.complete();
        }
        assert_eq!(seen, vec!["a", "b", "c"]);
        assert!(queue.is_drained());
    }

    #[tokio::test]
    async fn nested_producer_keeps_queue_open() {
        let queue = JobQueue::new(4);
        let cancel = CancellationToken::new();
        queue.spawn_producer(vec!["dir".to_string()], base(), 0, cancel.clone());

        let mut depths = Vec::new();
        while let Some(job) = queue.pop(&cancel).await {
            if job.depth == 0 {
                queue.spawn_producer(vec!["x".to_string(), "y".into()], base(), 1, cancel.clone());
            }
            depths.push(job.depth);
            queue.complete();
        }
        assert_eq!(depths, vec![0, 1, 1]);
    }

    #[tokio::test]
    async fn cancel_stops_pop() {
        let queue = JobQueue::new(1);
        let cancel = CancellationToken::new();
        let _guard = queue.register_producer();
        cancel.cancel();
        assert!(queue.pop(&cancel).await.is_none());
        assert!(!queue.is_drained());
    }
}
