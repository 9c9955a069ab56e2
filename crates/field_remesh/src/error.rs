//! Error types for the remeshing pipeline.
//!
//! Every failure is fatal to the run: nothing is retried and no partial
//! output is produced.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for pipeline operations.
pub type RemeshResult<T> = Result<T, RemeshError>;

/// Errors that can abort a remeshing run.
#[derive(Debug, Error)]
pub enum RemeshError {
  /// Invalid or missing input source, or an unusable configuration value.
  #[error("configuration error: {0}")]
  Config(String),

  /// The mesh could not be loaded or its hierarchy could not be built.
  #[error("resource error: {0}")]
  Resource(String),

  /// The optimizer controller was driven out of order.
  #[error("optimizer usage error: {0}")]
  Optimizer(#[from] OptimizerUsageError),

  /// A field optimisation pass failed on the worker.
  #[error("optimization failed: {0}")]
  Optimization(String),

  /// Extraction or post-processing failed.
  #[error("extraction error: {0}")]
  Extraction(String),

  /// Malformed mesh file.
  #[error("parse error in {path} at line {line}: {message}")]
  Parse {
    /// File being parsed.
    path: PathBuf,
    /// 1-based line number.
    line: usize,
    /// What was wrong.
    message: String,
  },

  /// I/O error from the standard library.
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

impl RemeshError {
  pub fn config(message: impl Into<String>) -> Self {
    Self::Config(message.into())
  }

  pub fn resource(message: impl Into<String>) -> Self {
    Self::Resource(message.into())
  }

  pub fn extraction(message: impl Into<String>) -> Self {
    Self::Extraction(message.into())
  }
}

/// Out-of-order use of the field optimizer controller.
///
/// These are contract violations by the caller, never transient conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OptimizerUsageError {
  #[error("start() called without a prior configure()")]
  NotConfigured,

  #[error("wait() called without a prior start()")]
  NotStarted,

  #[error("a configuration is already pending; start() it first")]
  AlreadyConfigured,

  #[error("operation not allowed while the optimizer is running")]
  Running,

  #[error("position pass requested before the orientation pass completed")]
  PassOutOfOrder,

  #[error("optimizer has been shut down")]
  ShutDown,

  #[error("optimizer worker was lost; the controller is unusable")]
  WorkerLost,
}
