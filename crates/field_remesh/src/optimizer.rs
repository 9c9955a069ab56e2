//! Field optimizer controller.
//!
//! Wraps the asynchronous field solver behind an explicit state machine:
//!
//! ```text
//!            configure()          start()             wait()
//!   ┌──────┐ ──────────► ┌────────────┐ ──────► ┌─────────┐ ──────► Idle
//!   │ Idle │             │ Configured │         │ Running │
//!   └──┬───┘             └────────────┘         └─────────┘
//!      │ shutdown()
//!      ▼
//!   ShutDown (terminal)
//! ```
//!
//! The mesh resource is lent to the worker for the duration of a pass: it is
//! moved into the task on `start()` and handed back over the task's channel
//! on `wait()`. While a pass is running the controller holds no mesh at all,
//! so the caller cannot observe or mutate field state mid-pass.

use tracing::debug;

use crate::error::{OptimizerUsageError, RemeshError, RemeshResult};
use crate::resource::MeshResource;
use crate::threading::{TaskHandle, WorkerPool};

/// Which field a pass optimises. Exactly one per pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldPass {
  /// Orientation field ("rosy").
  Orientations,
  /// Lattice position field ("posy").
  Positions,
}

/// Toggle set for one optimisation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptimizerOptions {
  /// Compare neighbouring frames in 3D instead of the local tangent plane.
  pub extrinsic: bool,
  /// Pin boundary directions to the boundary tangent.
  pub alignment: bool,
  /// Randomize initial directions (from a fixed seed).
  pub randomization: bool,
  /// Solve coarse-to-fine over the hierarchy.
  pub hierarchy: bool,
  pub pass: FieldPass,
}

impl OptimizerOptions {
  /// Toggles for the orientation pass of a standard run.
  pub fn orientation_pass() -> Self {
    Self {
      extrinsic: false,
      alignment: true,
      randomization: true,
      hierarchy: true,
      pass: FieldPass::Orientations,
    }
  }

  /// Same toggles, switched to optimise positions.
  pub fn for_positions(self) -> Self {
    Self {
      pass: FieldPass::Positions,
      ..self
    }
  }

  pub fn optimize_orientations(&self) -> bool {
    self.pass == FieldPass::Orientations
  }

  pub fn optimize_positions(&self) -> bool {
    self.pass == FieldPass::Positions
  }
}

impl Default for OptimizerOptions {
  fn default() -> Self {
    Self::orientation_pass()
  }
}

/// Observable lifecycle phase of the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptimizerPhase {
  Idle,
  Configured,
  Running,
  ShutDown,
  /// The worker died mid-pass; the mesh went with it.
  Failed,
}

type PassOutcome<M> = (M, RemeshResult<()>);

enum State<M> {
  Idle(M),
  Configured(M, OptimizerOptions),
  Running(TaskHandle<PassOutcome<M>>, FieldPass),
  ShutDown,
  Failed,
}

/// Asynchronous field optimizer bound to one mesh resource.
pub struct FieldOptimizer<M: MeshResource> {
  state: State<M>,
  pool: WorkerPool,
  orientations_done: bool,
  completed_passes: usize,
}

impl<M: MeshResource> FieldOptimizer<M> {
  /// Bind a controller to `mesh`, running passes on `pool`.
  pub fn new(mesh: M, pool: WorkerPool) -> Self {
    Self {
      state: State::Idle(mesh),
      pool,
      orientations_done: false,
      completed_passes: 0,
    }
  }

  pub fn phase(&self) -> OptimizerPhase {
    match self.state {
      State::Idle(_) => OptimizerPhase::Idle,
      State::Configured(..) => OptimizerPhase::Configured,
      State::Running(..) => OptimizerPhase::Running,
      State::ShutDown => OptimizerPhase::ShutDown,
      State::Failed => OptimizerPhase::Failed,
    }
  }

  /// Number of passes that ran to completion (successfully or not).
  pub fn completed_passes(&self) -> usize {
    self.completed_passes
  }

  /// Set the toggles for the next pass. Valid only while idle.
  pub fn configure(&mut self, options: OptimizerOptions) -> Result<(), OptimizerUsageError> {
    self.ensure_usable()?;
    if options.pass == FieldPass::Positions && !self.orientations_done {
      return Err(OptimizerUsageError::PassOutOfOrder);
    }
    match std::mem::replace(&mut self.state, State::Failed) {
      State::Idle(mesh) => {
        self.state = State::Configured(mesh, options);
        Ok(())
      }
      other => {
        let err = usage_error(&other);
        self.state = other;
        Err(err)
      }
    }
  }

  /// Launch the configured pass on the worker pool (non-blocking).
  pub fn start(&mut self) -> Result<(), OptimizerUsageError> {
    self.ensure_usable()?;
    match std::mem::replace(&mut self.state, State::Failed) {
      State::Configured(mut mesh, options) => {
        debug!(pass = ?options.pass, "starting field optimization pass");
        let handle = self.pool.spawn(move || {
          let result = mesh.optimize(&options);
          (mesh, result)
        });
        self.state = State::Running(handle, options.pass);
        Ok(())
      }
      State::Idle(mesh) => {
        self.state = State::Idle(mesh);
        Err(OptimizerUsageError::NotConfigured)
      }
      other => {
        let err = usage_error(&other);
        self.state = other;
        Err(err)
      }
    }
  }

  /// Block until the running pass finishes and take the mesh back.
  ///
  /// This is the only synchronization point with the worker. Solver errors
  /// are returned after the controller is back in `Idle`.
  pub fn wait(&mut self) -> RemeshResult<()> {
    self.ensure_usable()?;
    match std::mem::replace(&mut self.state, State::Failed) {
      State::Running(handle, pass) => match handle.wait() {
        Ok((mesh, result)) => {
          self.state = State::Idle(mesh);
          self.completed_passes += 1;
          if result.is_ok() && pass == FieldPass::Orientations {
            self.orientations_done = true;
          }
          debug!(?pass, ok = result.is_ok(), "field optimization pass finished");
          result
        }
        Err(_) => Err(RemeshError::Optimization(format!(
          "worker for the {pass:?} pass exited without returning the mesh"
        ))),
      },
      State::Idle(mesh) => {
        self.state = State::Idle(mesh);
        Err(OptimizerUsageError::NotStarted.into())
      }
      State::Configured(mesh, options) => {
        self.state = State::Configured(mesh, options);
        Err(OptimizerUsageError::NotStarted.into())
      }
      other => {
        let err = usage_error(&other);
        self.state = other;
        Err(err.into())
      }
    }
  }

  /// Release the controller and hand the mesh back. Terminal.
  pub fn shutdown(&mut self) -> Result<M, OptimizerUsageError> {
    self.ensure_usable()?;
    match std::mem::replace(&mut self.state, State::ShutDown) {
      State::Idle(mesh) => {
        debug!(passes = self.completed_passes, "optimizer shut down");
        Ok(mesh)
      }
      other => {
        let err = usage_error(&other);
        self.state = other;
        Err(err)
      }
    }
  }

  /// Borrow the mesh between passes.
  pub fn mesh(&self) -> Result<&M, OptimizerUsageError> {
    match &self.state {
      State::Idle(mesh) | State::Configured(mesh, _) => Ok(mesh),
      other => Err(usage_error(other)),
    }
  }

  /// Mutably borrow the mesh between passes.
  pub fn mesh_mut(&mut self) -> Result<&mut M, OptimizerUsageError> {
    match &mut self.state {
      State::Idle(mesh) | State::Configured(mesh, _) => Ok(mesh),
      other => Err(usage_error(other)),
    }
  }

  fn ensure_usable(&self) -> Result<(), OptimizerUsageError> {
    match self.state {
      State::ShutDown => Err(OptimizerUsageError::ShutDown),
      State::Failed => Err(OptimizerUsageError::WorkerLost),
      _ => Ok(()),
    }
  }
}

fn usage_error<M>(state: &State<M>) -> OptimizerUsageError {
  match state {
    State::Idle(_) => OptimizerUsageError::NotConfigured,
    State::Configured(..) => OptimizerUsageError::AlreadyConfigured,
    State::Running(..) => OptimizerUsageError::Running,
    State::ShutDown => OptimizerUsageError::ShutDown,
    State::Failed => OptimizerUsageError::WorkerLost,
  }
}

#[cfg(test)]
#[path = "optimizer_test.rs"]
mod optimizer_test;
