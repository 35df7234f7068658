//! Concurrency layer for ltrank
//!
//! This crate provides the bounded execution model used for parallel
//! segment scoring:
//! - WorkerPool: fixed pool of named worker threads with a FIFO queue
//! - TaskHandle: result of a submitted task, joined with an abort signal
//! - Semaphore / SemaphorePermit: counting semaphore with RAII permits
//! - AbortSignal: cooperative cancellation of blocking waits
//! - ThreadModule: pool + global semaphore + per-query semaphores
//!
//! Permit acquisition and task joins are the only blocking points. Both
//! return `LtrError::Interrupted` once the caller's `AbortSignal` fires.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abort;
pub mod pool;
pub mod semaphore;
pub mod thread_module;

pub use abort::AbortSignal;
pub use pool::{PoolStats, TaskHandle, WorkerPool};
pub use semaphore::{Semaphore, SemaphorePermit};
pub use thread_module::{ThreadModule, ThreadModuleConfig, DEFAULT_THREAD_NAME_PREFIX};

use std::time::Duration;

/// How often blocked waits re-check their abort signal
pub(crate) const ABORT_POLL_INTERVAL: Duration = Duration::from_millis(10);
