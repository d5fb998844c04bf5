//! Fixed-size worker pool with fire-and-forget and future-returning submission.
//!
//! Jobs are queued FIFO and picked up by whichever worker is free, so with
//! more than one worker the completion order is unconstrained.
//!
//! There is no cooperative cancellation. When [`TaskPool::shutdown_and_wait`]
//! gives up, the workers are detached and whatever they are running keeps
//! running (and keeps holding its resources) until it returns on its own. A
//! job stuck in a deadlock leaks its worker thread for the life of the process.

use core::time::Duration;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::Instant;

use super::future::{self, TaskFuture};
use crate::errors::{panic_message, HazardError, HazardResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Snapshot of the pool's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub queued: usize,
    pub in_flight: usize,
    pub completed: usize,
    pub panicked: usize,
    pub shut_down: bool,
}

/// A fixed-size pool of worker threads.
///
/// # Examples
///
/// ```
/// use foundation_hazards::primitives::TaskPool;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let pool = TaskPool::new(4).unwrap();
/// let counter = Arc::new(AtomicUsize::new(0));
///
/// for _ in 0..10 {
///     let counter_clone = Arc::clone(&counter);
///     pool.execute(move || {
///         counter_clone.fetch_add(1, Ordering::Relaxed);
///     }).unwrap();
/// }
///
/// let answer = pool.submit(|| 40 + 2).unwrap();
/// assert_eq!(answer.wait().unwrap(), 42);
///
/// assert!(pool.shutdown_and_wait(Duration::from_secs(5)));
/// assert_eq!(counter.load(Ordering::Relaxed), 10);
/// ```
pub struct TaskPool {
    size: usize,
    workers: Mutex<Vec<Worker>>,
    queue: Arc<JobQueue>,
    submitted: AtomicUsize,
}

impl TaskPool {
    /// Creates a pool with `size` workers.
    ///
    /// # Errors
    ///
    /// Returns [`HazardError::Io`] if the OS refuses to spawn a worker thread.
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn new(size: usize) -> HazardResult<Self> {
        Self::start_with(size, Worker::new)
    }

    fn start_with<S>(size: usize, mut spawn: S) -> HazardResult<Self>
    where
        S: FnMut(usize, Arc<JobQueue>) -> HazardResult<Worker>,
    {
        assert!(size > 0, "TaskPool size must be > 0");

        let queue = Arc::new(JobQueue::new());
        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            match spawn(id, Arc::clone(&queue)) {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    // let the workers already running drain out and exit
                    queue.shutdown();
                    tracing::error!("TaskPool failed to start worker {}: {}", id, err);
                    return Err(err);
                }
            }
        }

        tracing::debug!("TaskPool started with {} workers", size);
        Ok(Self {
            size,
            workers: Mutex::new(workers),
            queue,
            submitted: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Queues `work` without tracking its result.
    ///
    /// A panic inside `work` is caught by the worker and logged; the worker
    /// keeps serving the queue.
    ///
    /// # Errors
    ///
    /// [`HazardError::PoolShutDown`] once shutdown has begun.
    pub fn execute<F>(&self, work: F) -> HazardResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let index = self.submitted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("execute: queueing work item {}", index);
        self.queue.push(Box::new(work))
    }

    /// Queues `work` and returns a future for its result.
    ///
    /// # Errors
    ///
    /// [`HazardError::PoolShutDown`] once shutdown has begun.
    pub fn submit<R, F>(&self, work: F) -> HazardResult<TaskFuture<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let index = self.submitted.fetch_add(1, Ordering::Relaxed);
        let (promise, future) = future::channel(index);
        tracing::trace!("submit: queueing work item {}", index);

        self.queue.push(Box::new(move || {
            match panic::catch_unwind(AssertUnwindSafe(work)) {
                Ok(value) => promise.fulfil(value),
                Err(payload) => {
                    promise.fail(HazardError::TaskPanicked(panic_message(payload.as_ref())));
                    // let the worker account for it like any other panic
                    panic::resume_unwind(payload);
                }
            }
        }))?;

        Ok(future)
    }

    /// Stops accepting work and waits up to `timeout` for queued and
    /// in-flight work to finish.
    ///
    /// Returns `true` when everything finished in time; workers are joined.
    /// Returns `false` otherwise; workers are detached and keep running.
    pub fn shutdown_and_wait(&self, timeout: Duration) -> bool {
        let span = tracing::trace_span!("TaskPool::shutdown_and_wait");
        let _enter = span.enter();

        self.queue.shutdown();
        let finished = self.queue.await_idle(timeout);

        let mut workers = match self.workers.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };

        if finished {
            for worker in workers.iter_mut() {
                if let Some(handle) = worker.thread.take() {
                    if handle.join().is_err() {
                        tracing::error!("worker {} exited by panic", worker.id);
                    }
                }
            }
        } else {
            let stats = self.stats();
            tracing::warn!(
                "TaskPool did not drain within {:?}: {} queued, {} in flight left running",
                timeout,
                stats.queued,
                stats.in_flight
            );
            for worker in workers.iter_mut() {
                drop(worker.thread.take());
            }
        }

        finished
    }

    /// [`TaskPool::shutdown_and_wait`] mapped onto the error taxonomy.
    ///
    /// # Errors
    ///
    /// [`HazardError::WaitTimeout`] when the pool did not drain in time.
    pub fn await_termination(&self, timeout: Duration) -> HazardResult<()> {
        if self.shutdown_and_wait(timeout) {
            Ok(())
        } else {
            Err(HazardError::WaitTimeout)
        }
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let state = self.queue.lock();
        PoolStats {
            workers: self.size,
            queued: state.jobs.len(),
            in_flight: state.in_flight,
            completed: state.completed,
            panicked: state.panicked,
            shut_down: state.shutdown,
        }
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        // Workers finish the queue and exit; nobody waits for them here.
        self.queue.shutdown();
    }
}

struct Worker {
    id: usize,
    thread: Option<thread::JoinHandle<()>>,
}

impl Worker {
    fn new(id: usize, queue: Arc<JobQueue>) -> HazardResult<Self> {
        let thread = thread::Builder::new()
            .name(format!("hazard-worker-{id}"))
            .spawn(move || {
                let span = tracing::trace_span!("TaskPool::worker", id);
                let _enter = span.enter();

                while let Some(job) = queue.pop() {
                    let panicked = match panic::catch_unwind(AssertUnwindSafe(job)) {
                        Ok(()) => false,
                        Err(payload) => {
                            tracing::error!(
                                "work item panicked on worker {}: {}",
                                id,
                                panic_message(payload.as_ref())
                            );
                            true
                        }
                    };
                    queue.finish(panicked);
                }
                tracing::trace!("worker {} exiting", id);
            })?;

        Ok(Self {
            id,
            thread: Some(thread),
        })
    }
}

struct QueueState {
    jobs: VecDeque<Job>,
    shutdown: bool,
    in_flight: usize,
    completed: usize,
    panicked: usize,
}

struct JobQueue {
    state: Mutex<QueueState>,
    available: Condvar,
    idle: Condvar,
}

impl JobQueue {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                shutdown: false,
                in_flight: 0,
                completed: 0,
                panicked: 0,
            }),
            available: Condvar::new(),
            idle: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }

    fn push(&self, job: Job) -> HazardResult<()> {
        let mut guard = self.lock();
        if guard.shutdown {
            return Err(HazardError::PoolShutDown);
        }
        guard.jobs.push_back(job);
        drop(guard);
        self.available.notify_one();
        Ok(())
    }

    /// Next job in FIFO order, or `None` once shut down with nothing left.
    fn pop(&self) -> Option<Job> {
        let mut guard = self.lock();

        loop {
            if let Some(job) = guard.jobs.pop_front() {
                guard.in_flight += 1;
                return Some(job);
            }

            if guard.shutdown {
                return None;
            }

            guard = match self.available.wait(guard) {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
        }
    }

    fn finish(&self, panicked: bool) {
        let mut guard = self.lock();
        guard.in_flight -= 1;
        if panicked {
            guard.panicked += 1;
        } else {
            guard.completed += 1;
        }
        let idle = guard.jobs.is_empty() && guard.in_flight == 0;
        drop(guard);
        if idle {
            self.idle.notify_all();
        }
    }

    fn shutdown(&self) {
        self.lock().shutdown = true;
        self.available.notify_all();
    }

    fn await_idle(&self, timeout: Duration) -> bool {
        // a timeout past the end of the clock means no deadline at all
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.lock();

        while !(guard.jobs.is_empty() && guard.in_flight == 0) {
            guard = match deadline {
                None => match self.idle.wait(guard) {
                    Ok(g) => g,
                    Err(e) => e.into_inner(),
                },
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return false;
                    }
                    match self.idle.wait_timeout(guard, remaining) {
                        Ok((g, _)) => g,
                        Err(e) => e.into_inner().0,
                    }
                }
            };
        }
        true
    }
}
