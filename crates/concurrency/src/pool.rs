//! Worker pool for segment scoring tasks
//!
//! A fixed set of named worker threads pulls tasks from a FIFO queue. Each
//! submitted task yields a `TaskHandle` through which its result (or the
//! panic it raised, converted to `LtrError::ScoringTask`) is collected.

use crate::abort::AbortSignal;
use crate::ABORT_POLL_INTERVAL;
use ltrank_core::{LtrError, LtrResult};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send>;

/// Pool metrics snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks waiting in the queue
    pub queue_depth: usize,
    /// Tasks currently running
    pub active_tasks: usize,
    /// Tasks finished since creation, panicked ones included
    pub tasks_completed: u64,
    /// Tasks that panicked
    pub tasks_panicked: u64,
    /// Number of worker threads
    pub worker_count: usize,
}

struct PoolInner {
    queue: Mutex<VecDeque<Job>>,
    work_ready: Condvar,
    shutdown: AtomicBool,
    active_tasks: AtomicUsize,
    tasks_completed: AtomicU64,
    tasks_panicked: AtomicU64,
}

/// Fixed-size pool of worker threads
pub struct WorkerPool {
    inner: Arc<PoolInner>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    num_threads: usize,
}

impl WorkerPool {
    /// Start `num_threads` workers named `{prefix}-0`, `{prefix}-1`, ...
    ///
    /// # Errors
    ///
    /// `Io` if a worker thread cannot be spawned. Workers already started
    /// are shut down.
    pub fn new(num_threads: usize, prefix: &str) -> LtrResult<Self> {
        let pool = WorkerPool {
            inner: Arc::new(PoolInner {
                queue: Mutex::new(VecDeque::new()),
                work_ready: Condvar::new(),
                shutdown: AtomicBool::new(false),
                active_tasks: AtomicUsize::new(0),
                tasks_completed: AtomicU64::new(0),
                tasks_panicked: AtomicU64::new(0),
            }),
            workers: Mutex::new(Vec::with_capacity(num_threads)),
            num_threads,
        };

        for i in 0..num_threads {
            let inner = Arc::clone(&pool.inner);
            let handle = std::thread::Builder::new()
                .name(format!("{}-{}", prefix, i))
                .spawn(move || worker_loop(&inner))?;
            pool.workers.lock().push(handle);
        }

        debug!(target: "ltrank::pool", threads = num_threads, prefix, "Worker pool started");
        Ok(pool)
    }

    /// Queue a task
    ///
    /// A panic inside `work` is caught and reported through the handle as
    /// `ScoringTask`.
    ///
    /// # Errors
    ///
    /// `ScoringTask` if the pool has been shut down.
    pub fn submit<T, F>(&self, work: F) -> LtrResult<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> LtrResult<T> + Send + 'static,
    {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(LtrError::ScoringTask("worker pool is shut down".to_string()));
        }

        let (tx, rx) = mpsc::channel();
        let inner = Arc::clone(&self.inner);
        let job: Job = Box::new(move || {
            let result = catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|panic| {
                inner.tasks_panicked.fetch_add(1, Ordering::Relaxed);
                let message = panic_message(panic.as_ref());
                error!(target: "ltrank::pool", panic = message, "Scoring task panicked");
                Err(LtrError::ScoringTask(format!("task panicked: {}", message)))
            });
            // The handle may have been dropped by an aborted caller
            let _ = tx.send(result);
        });

        self.inner.queue.lock().push_back(job);
        self.inner.work_ready.notify_one();
        Ok(TaskHandle { rx })
    }

    /// Signal workers to exit once the queue is empty and join them
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, Ordering::Release);
        {
            // Holding the queue lock closes the gap between a worker's
            // shutdown check and its wait
            let _queue = self.inner.queue.lock();
            self.inner.work_ready.notify_all();
        }
        let mut workers = self.workers.lock();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }

    /// Number of worker threads
    pub fn worker_count(&self) -> usize {
        self.num_threads
    }

    /// Metrics snapshot
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queue_depth: self.inner.queue.lock().len(),
            active_tasks: self.inner.active_tasks.load(Ordering::Relaxed),
            tasks_completed: self.inner.tasks_completed.load(Ordering::Relaxed),
            tasks_panicked: self.inner.tasks_panicked.load(Ordering::Relaxed),
            worker_count: self.num_threads,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("stats", &self.stats())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("(non-string panic)")
}

/// Decrements `active_tasks` even if bookkeeping is unwound
struct ActiveTaskGuard<'a> {
    inner: &'a PoolInner,
}

impl Drop for ActiveTaskGuard<'_> {
    fn drop(&mut self) {
        self.inner.active_tasks.fetch_sub(1, Ordering::Release);
        self.inner.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }
}

fn worker_loop(inner: &PoolInner) {
    loop {
        let job = {
            let mut queue = inner.queue.lock();
            loop {
                if let Some(job) = queue.pop_front() {
                    inner.active_tasks.fetch_add(1, Ordering::Release);
                    break job;
                }
                if inner.shutdown.load(Ordering::Acquire) {
                    return;
                }
                inner.work_ready.wait(&mut queue);
            }
        };

        let _guard = ActiveTaskGuard { inner };
        job();
    }
}

// ============================================================================
// TaskHandle
// ============================================================================

/// Pending result of a submitted task
#[derive(Debug)]
pub struct TaskHandle<T> {
    rx: Receiver<LtrResult<T>>,
}

impl<T> TaskHandle<T> {
    /// Wait for the task's result
    ///
    /// # Errors
    ///
    /// - the task's own error, or `ScoringTask` if it panicked
    /// - `Interrupted` if `abort` fires first
    pub fn join(self, abort: &AbortSignal) -> LtrResult<T> {
        loop {
            abort.check()?;
            match self.rx.recv_timeout(ABORT_POLL_INTERVAL) {
                Ok(result) => return result,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(LtrError::ScoringTask(
                        "task dropped without producing a result".to_string(),
                    ))
                }
            }
        }
    }
}
