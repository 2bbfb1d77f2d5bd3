//! Bounded worker pool.
//!
//! N OS threads drain a shared queue of work items; at no point do more
//! than N items execute concurrently, and `max_workers = 1` is strictly
//! sequential. Cancellation stops dequeuing; items never started are
//! reported back so callers can emit their terminal events.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::debug;

use crate::cancel::CancellationToken;
use velocity_protocol::config::MAX_WORKERS_CAP as MAX_WORKERS;

pub struct WorkerPool {
    max_workers: usize,
}

/// What happened to the items when the pool drained.
pub struct PoolRun<T, R> {
    /// Results of items that ran, in completion order.
    pub completed: Vec<R>,
    /// Items still queued when cancellation landed.
    pub skipped: Vec<T>,
}

impl WorkerPool {
    /// Clamped to 1..=MAX_WORKERS.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.clamp(1, MAX_WORKERS),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run `work` over every item with bounded concurrency.
    ///
    /// The worker function itself is responsible for checking `cancel` at
    /// its own I/O boundaries; the pool only stops handing out new items.
    pub fn run<T, R, F>(&self, items: Vec<T>, cancel: &CancellationToken, work: F) -> PoolRun<T, R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let queue: Arc<Mutex<VecDeque<T>>> = Arc::new(Mutex::new(items.into()));
        let results: Arc<Mutex<Vec<R>>> = Arc::new(Mutex::new(Vec::new()));
        let work = Arc::new(work);

        let worker_count = {
            let len = queue.lock().map(|q| q.len()).unwrap_or(0);
            self.max_workers.min(len.max(1))
        };
        debug!(workers = worker_count, "starting worker pool");

        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let queue = Arc::clone(&queue);
            let results = Arc::clone(&results);
            let work = Arc::clone(&work);
            let cancel = cancel.clone();

            handles.push(thread::spawn(move || loop {
                if cancel.is_cancelled() {
                    break;
                }
                let item = match queue.lock() {
                    Ok(mut q) => q.pop_front(),
                    Err(_) => break,
                };
                let Some(item) = item else { break };
                let result = work(item);
                if let Ok(mut r) = results.lock() {
                    r.push(result);
                }
            }));
        }

        for handle in handles {
            let _ = handle.join();
        }

        let skipped = queue
            .lock()
            .map(|mut q| q.drain(..).collect())
            .unwrap_or_default();
        let completed = results
            .lock()
            .map(|mut r| r.drain(..).collect())
            .unwrap_or_default();

        PoolRun { completed, skipped }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[test]
    fn concurrency_never_exceeds_max_workers() {
        let pool = WorkerPool::new(3);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));

        let inf = Arc::clone(&in_flight);
        let hw = Arc::clone(&high_water);
        let run = pool.run(
            (0..20).collect::<Vec<_>>(),
            &CancellationToken::new(),
            move |i: i32| {
                let now = inf.fetch_add(1, Ordering::SeqCst) + 1;
                hw.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                inf.fetch_sub(1, Ordering::SeqCst);
                i * 2
            },
        );

        assert_eq!(run.completed.len(), 20);
        assert!(run.skipped.is_empty());
        assert!(high_water.load(Ordering::SeqCst) <= 3);
        assert!(high_water.load(Ordering::SeqCst) >= 2, "pool should actually parallelize");
    }

    #[test]
    fn single_worker_is_sequential() {
        let pool = WorkerPool::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));
        let o = Arc::clone(&order);
        pool.run((0..5).collect::<Vec<_>>(), &CancellationToken::new(), move |i: i32| {
            o.lock().unwrap().push(i);
        });
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn cancellation_skips_queued_items() {
        let pool = WorkerPool::new(1);
        let cancel = CancellationToken::new();
        let c = cancel.clone();
        let run = pool.run((0..10).collect::<Vec<_>>(), &cancel, move |i: i32| {
            if i == 2 {
                c.cancel();
            }
            i
        });
        assert_eq!(run.completed.len(), 3);
        assert_eq!(run.skipped.len(), 7);
    }

    #[test]
    fn wall_clock_reflects_batching() {
        let pool = WorkerPool::new(4);
        let start = Instant::now();
        pool.run((0..8).collect::<Vec<_>>(), &CancellationToken::new(), |_: i32| {
            thread::sleep(Duration::from_millis(50));
        });
        let elapsed = start.elapsed();
        // ceil(8/4) batches of 50ms; allow generous scheduling slack.
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(400));
    }

    #[test]
    fn clamps_out_of_range_worker_counts() {
        assert_eq!(WorkerPool::new(0).max_workers(), 1);
        assert_eq!(WorkerPool::new(500).max_workers(), MAX_WORKERS);
    }
}
