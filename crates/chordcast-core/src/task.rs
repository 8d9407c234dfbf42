//! Worker pool with explicit task dependencies
//!
//! Every refresh cycle is expressed as a small DAG of tasks. A task is
//! scheduled together with the handles it depends on and is only submitted
//! to the rayon pool once all of them have completed, so no worker ever
//! blocks waiting on a predecessor.
//!
//! ```text
//!   schedule(deps, job) ──► PendingTask (remaining = deps + 1)
//!                                │ each dep completes: remaining -= 1
//!                                ▼ remaining == 0
//!                           rayon::ThreadPool::spawn(job)
//!                                │ job returns
//!                                ▼
//!                           TaskState::done = true ──► release dependents
//! ```
//!
//! Range-parallel jobs split their index space with rayon inside the task
//! (`parallel_for`), in batches of [`PARALLEL_BATCH`] indices.
//!
//! Blocking is only done by the control thread through [`TaskHandle::wait`]
//! and [`TaskPool::wait_idle`]. The real-time thread never touches this module.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rayon::prelude::*;

use crate::error::{EngineError, EngineResult};

/// Minimum number of indices handed to one worker in range-parallel jobs
pub const PARALLEL_BATCH: usize = 64;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A panicking job poisons nothing we can repair; keep going with the data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Completion state shared between a task and everything waiting on it
struct TaskState {
    done: AtomicBool,
    dependents: Mutex<Vec<Arc<PendingTask>>>,
    finished: Condvar,
}

impl TaskState {
    fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
            dependents: Mutex::new(Vec::new()),
            finished: Condvar::new(),
        }
    }

    /// Mark complete and release every dependent that was waiting on us
    fn complete(&self) {
        let released = {
            let mut dependents = lock(&self.dependents);
            self.done.store(true, Ordering::Release);
            self.finished.notify_all();
            std::mem::take(&mut *dependents)
        };
        for task in released {
            task.release_one();
        }
    }
}

/// A scheduled job still waiting for some of its dependencies
struct PendingTask {
    remaining: AtomicUsize,
    job: Mutex<Option<Job>>,
    state: Arc<TaskState>,
    pool: Arc<PoolInner>,
}

impl PendingTask {
    fn release_one(self: Arc<Self>) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.submit();
        }
    }

    fn submit(self: Arc<Self>) {
        let Some(job) = lock(&self.job).take() else {
            return;
        };
        let state = Arc::clone(&self.state);
        let pool = Arc::clone(&self.pool);
        let delay = pool.injected_delay;
        self.pool.workers.spawn(move || {
            if let Some(delay) = delay {
                std::thread::sleep(delay);
            }
            job();
            state.complete();
            pool.finish_one();
        });
    }
}

struct PoolInner {
    workers: rayon::ThreadPool,
    injected_delay: Option<Duration>,
    outstanding: Mutex<usize>,
    idle: Condvar,
}

impl PoolInner {
    fn finish_one(&self) {
        let mut outstanding = lock(&self.outstanding);
        *outstanding -= 1;
        if *outstanding == 0 {
            self.idle.notify_all();
        }
    }
}

/// Handle to a scheduled task (or a combination of tasks)
///
/// The default handle is already complete, so it can be used as the
/// "no predecessor" value when building chains.
#[derive(Clone, Default)]
pub struct TaskHandle {
    state: Option<Arc<TaskState>>,
}

impl TaskHandle {
    /// A handle with nothing to wait for
    pub fn completed() -> Self {
        Self::default()
    }

    /// Poll completion (never blocks)
    pub fn is_complete(&self) -> bool {
        self.state
            .as_ref()
            .map_or(true, |s| s.done.load(Ordering::Acquire))
    }

    /// Block the calling thread until the task has run
    ///
    /// Control thread only; calling this from a pool worker can starve the pool.
    pub fn wait(&self) {
        let Some(state) = &self.state else {
            return;
        };
        let mut guard = lock(&state.dependents);
        while !state.done.load(Ordering::Acquire) {
            guard = state
                .finished
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("complete", &self.is_complete())
            .finish()
    }
}

/// The engine's worker pool
#[derive(Clone)]
pub struct TaskPool {
    inner: Arc<PoolInner>,
}

impl TaskPool {
    /// Create a pool with `threads` workers
    pub fn new(threads: usize) -> EngineResult<Self> {
        Self::build(threads, None)
    }

    /// Create a pool that sleeps for `delay` before running every task
    ///
    /// Used by scheduling tests to widen race windows between the worker
    /// pool, the control loop and the render thread.
    pub fn with_injected_delay(threads: usize, delay: Duration) -> EngineResult<Self> {
        Self::build(threads, Some(delay))
    }

    fn build(threads: usize, injected_delay: Option<Duration>) -> EngineResult<Self> {
        if threads == 0 {
            return Err(EngineError::InvalidConfig(
                "worker pool needs at least one thread".to_string(),
            ));
        }
        let workers = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("chordcast-worker-{}", i))
            .build()
            .map_err(|e| EngineError::WorkerPool(e.to_string()))?;

        log::info!("Task pool initialized with {} threads", threads);

        Ok(Self {
            inner: Arc::new(PoolInner {
                workers,
                injected_delay,
                outstanding: Mutex::new(0),
                idle: Condvar::new(),
            }),
        })
    }

    /// Schedule `job` to run once every handle in `deps` has completed
    pub fn schedule<F>(&self, deps: &[TaskHandle], job: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        *lock(&self.inner.outstanding) += 1;

        let state = Arc::new(TaskState::new());
        // One extra count guards against submitting while still registering.
        let task = Arc::new(PendingTask {
            remaining: AtomicUsize::new(deps.len() + 1),
            job: Mutex::new(Some(Box::new(job))),
            state: Arc::clone(&state),
            pool: Arc::clone(&self.inner),
        });

        for dep in deps {
            match &dep.state {
                Some(dep_state) => {
                    let mut dependents = lock(&dep_state.dependents);
                    if dep_state.done.load(Ordering::Acquire) {
                        drop(dependents);
                        Arc::clone(&task).release_one();
                    } else {
                        dependents.push(Arc::clone(&task));
                    }
                }
                None => Arc::clone(&task).release_one(),
            }
        }
        task.release_one();

        TaskHandle { state: Some(state) }
    }

    /// Schedule `body(i)` for every `i` in `0..len`, split across the pool
    pub fn parallel_for<F>(&self, deps: &[TaskHandle], len: usize, body: F) -> TaskHandle
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.schedule(deps, move || {
            (0..len)
                .into_par_iter()
                .with_min_len(PARALLEL_BATCH)
                .for_each(|i| body(i));
        })
    }

    /// A handle that completes once all of `handles` have completed
    pub fn combine(&self, handles: &[TaskHandle]) -> TaskHandle {
        let pending: Vec<TaskHandle> = handles
            .iter()
            .filter(|h| !h.is_complete())
            .cloned()
            .collect();
        match pending.len() {
            0 => TaskHandle::completed(),
            1 => pending.into_iter().next().unwrap_or_default(),
            _ => self.schedule(&pending, || {}),
        }
    }

    /// Number of scheduled tasks that have not finished yet
    pub fn outstanding(&self) -> usize {
        *lock(&self.inner.outstanding)
    }

    /// Block until every task scheduled on this pool has finished
    pub fn wait_idle(&self) {
        let mut outstanding = lock(&self.inner.outstanding);
        while *outstanding > 0 {
            outstanding = self
                .inner
                .idle
                .wait(outstanding)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
