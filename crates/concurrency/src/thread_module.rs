//! Thread module: bounded parallelism for rescoring
//!
//! Two limits apply to parallel segment scoring:
//! - `max_threads`: total scoring tasks in flight across all queries (the
//!   global semaphore, and the size of the worker pool)
//! - `max_query_threads`: scoring tasks in flight for one query (a fresh
//!   semaphore per rescore)
//!
//! With `max_threads == 1` rescoring runs sequentially on the caller's thread.
//!
//! # Example
//!
//! ```toml
//! [thread_module]
//! max_threads = 8
//! max_query_threads = 4
//! thread_name_prefix = "ltrExecutor"
//! ```

use crate::abort::AbortSignal;
use crate::pool::{TaskHandle, WorkerPool};
use crate::semaphore::{Semaphore, SemaphorePermit};
use ltrank_core::{LtrError, LtrResult};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default worker thread name prefix
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "ltrExecutor";

/// Thread module settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadModuleConfig {
    /// Scoring tasks in flight across all queries
    #[serde(default = "default_threads", alias = "maxThreads")]
    pub max_threads: usize,
    /// Scoring tasks in flight for one query
    #[serde(default = "default_threads", alias = "maxQueryThreads")]
    pub max_query_threads: usize,
    /// Worker thread name prefix
    #[serde(default = "default_prefix", alias = "threadNamePrefix")]
    pub thread_name_prefix: String,
}

fn default_threads() -> usize {
    1
}

fn default_prefix() -> String {
    DEFAULT_THREAD_NAME_PREFIX.to_string()
}

impl Default for ThreadModuleConfig {
    fn default() -> Self {
        ThreadModuleConfig {
            max_threads: default_threads(),
            max_query_threads: default_threads(),
            thread_name_prefix: default_prefix(),
        }
    }
}

impl ThreadModuleConfig {
    /// Builder: set both limits
    pub fn with_threads(mut self, max_threads: usize, max_query_threads: usize) -> Self {
        self.max_threads = max_threads;
        self.max_query_threads = max_query_threads;
        self
    }

    /// Check the limits
    ///
    /// # Errors
    ///
    /// `ThreadModuleConfig` if a limit is zero or the per-query limit
    /// exceeds the global one.
    pub fn validate(&self) -> LtrResult<()> {
        if self.max_threads < 1 {
            return Err(LtrError::ThreadModuleConfig(
                "maxThreads cannot be less than 1".to_string(),
            ));
        }
        if self.max_query_threads < 1 {
            return Err(LtrError::ThreadModuleConfig(
                "maxQueryThreads cannot be less than 1".to_string(),
            ));
        }
        if self.max_threads < self.max_query_threads {
            return Err(LtrError::ThreadModuleConfig(
                "maxQueryThreads cannot be greater than maxThreads".to_string(),
            ));
        }
        Ok(())
    }
}

/// Worker pool plus the global and per-query concurrency limits
#[derive(Debug)]
pub struct ThreadModule {
    config: ThreadModuleConfig,
    pool: WorkerPool,
    global: Semaphore,
}

impl ThreadModule {
    /// Validate `config` and start the worker pool
    pub fn new(config: ThreadModuleConfig) -> LtrResult<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.max_threads, &config.thread_name_prefix)?;
        let global = Semaphore::new(config.max_threads);
        info!(
            target: "ltrank::pool",
            max_threads = config.max_threads,
            max_query_threads = config.max_query_threads,
            "Thread module initialized"
        );
        Ok(ThreadModule {
            config,
            pool,
            global,
        })
    }

    /// Settings in use
    pub fn config(&self) -> &ThreadModuleConfig {
        &self.config
    }

    /// Whether rescoring should score segments in parallel
    pub fn is_parallel(&self) -> bool {
        self.config.max_threads > 1
    }

    /// Semaphore bounding the tasks of one rescore
    pub fn create_query_semaphore(&self) -> Semaphore {
        Semaphore::new(self.config.max_query_threads)
    }

    /// Take a global permit
    pub fn acquire_global(&self, abort: &AbortSignal) -> LtrResult<SemaphorePermit> {
        self.global.acquire(abort)
    }

    /// The global semaphore
    pub fn global_semaphore(&self) -> &Semaphore {
        &self.global
    }

    /// Queue a task on the worker pool
    pub fn submit<T, F>(&self, work: F) -> LtrResult<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce() -> LtrResult<T> + Send + 'static,
    {
        self.pool.submit(work)
    }

    /// The worker pool
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }
}
