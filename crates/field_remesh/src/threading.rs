//! Worker pool for asynchronous pipeline work.
//!
//! Wraps a dedicated `rayon::ThreadPool` built from the pipeline's
//! `Parallelism`, so the pipeline never touches rayon's global pool. Work is
//! submitted fire-and-forget with `spawn`, and results come back over a
//! one-slot crossbeam channel held by the returned `TaskHandle`.
//!
//! # Usage
//!
//! ```ignore
//! let pool = WorkerPool::new(Parallelism::Fixed(2))?;
//!
//! // Queue work (non-blocking)
//! let handle = pool.spawn(move || expensive_computation());
//!
//! // Block until the result is back
//! let result = handle.wait();
//! ```

use std::sync::Arc;

use crossbeam_channel::{self as channel, Receiver, RecvError, TryRecvError};

use crate::config::Parallelism;
use crate::error::{RemeshError, RemeshResult};

/// Shared handle to the pipeline's thread pool.
#[derive(Clone)]
pub struct WorkerPool {
  pool: Arc<rayon::ThreadPool>,
}

impl WorkerPool {
  /// Build a pool with the requested parallelism.
  pub fn new(parallelism: Parallelism) -> RemeshResult<Self> {
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(parallelism.thread_count())
      .thread_name(|i| format!("remesh-worker-{i}"))
      // Without a handler rayon aborts the process on a panicking spawn.
      // The task's sender is dropped during unwinding, which the waiting
      // side observes as a lost worker.
      .panic_handler(|_| tracing::error!("worker task panicked"))
      .build()
      .map_err(|e| RemeshError::config(format!("failed to build worker pool: {e}")))?;
    Ok(Self {
      pool: Arc::new(pool),
    })
  }

  /// Spawn a task on the pool (non-blocking).
  pub fn spawn<F, T>(&self, work: F) -> TaskHandle<T>
  where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
  {
    let (sender, receiver) = channel::bounded(1);
    self.pool.spawn(move || {
      let result = work();
      // Ignore send error (handle dropped = nobody is waiting)
      let _ = sender.send(result);
    });
    TaskHandle { receiver }
  }

  /// Run a closure inside the pool so nested rayon iterators use it.
  pub fn install<F, T>(&self, work: F) -> T
  where
    F: FnOnce() -> T + Send,
    T: Send,
  {
    self.pool.install(work)
  }

  /// Number of worker threads in the pool.
  pub fn num_threads(&self) -> usize {
    self.pool.current_num_threads()
  }
}

impl std::fmt::Debug for WorkerPool {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("WorkerPool")
      .field("num_threads", &self.num_threads())
      .finish()
  }
}

/// Pending result of a spawned task.
pub struct TaskHandle<T> {
  receiver: Receiver<T>,
}

impl<T> TaskHandle<T> {
  /// Poll for the result (non-blocking).
  ///
  /// `Ok(None)` while still running, `Err` if the worker died before
  /// producing a result.
  pub fn try_poll(&self) -> Result<Option<T>, RecvError> {
    match self.receiver.try_recv() {
      Ok(result) => Ok(Some(result)),
      Err(TryRecvError::Empty) => Ok(None),
      Err(TryRecvError::Disconnected) => Err(RecvError),
    }
  }

  /// Block until the task finishes.
  ///
  /// Fails only if the worker panicked and dropped its sender.
  pub fn wait(self) -> Result<T, RecvError> {
    self.receiver.recv()
  }
}

// =============================================================================
// Tests
// =============================================================================
