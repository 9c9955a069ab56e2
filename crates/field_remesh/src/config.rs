//! Pipeline configuration.
//!
//! Everything the pipeline needs from its surroundings is passed in through
//! `RemeshConfig`; nothing is read from global state.

use serde::Deserialize;

use crate::constants::{
  DEFAULT_COARSEST_SIZE, DEFAULT_MAX_LEVELS, DEFAULT_ORIENTATION_ITERATIONS,
  DEFAULT_POSITION_ITERATIONS, DEFAULT_SEED, DEFAULT_TARGET_FACES,
};
use crate::error::{RemeshError, RemeshResult};

/// Desired worker-pool parallelism.
///
/// Deserializes from an integer: `-1` or `0` means all available cores.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "i64")]
pub enum Parallelism {
  #[default]
  Auto,
  Fixed(usize),
}

impl Parallelism {
  /// Thread count to hand to rayon (0 lets rayon pick).
  pub fn thread_count(self) -> usize {
    match self {
      Parallelism::Auto => 0,
      Parallelism::Fixed(n) => n,
    }
  }
}

impl From<i64> for Parallelism {
  fn from(value: i64) -> Self {
    if value <= 0 {
      Parallelism::Auto
    } else {
      Parallelism::Fixed(value as usize)
    }
  }
}

/// Rotational symmetry of the orientation field.
///
/// Deserializes from the integer fold, `2` or `4`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "u8")]
pub enum RosySymmetry {
  /// Directions are lines: `q` and `-q` are the same direction.
  #[default]
  Two,
  /// Directions are crosses: quarter turns about the normal are equivalent.
  Four,
}

impl RosySymmetry {
  /// Number of equivalent representatives of one direction.
  pub fn fold(self) -> i32 {
    match self {
      RosySymmetry::Two => 2,
      RosySymmetry::Four => 4,
    }
  }
}

impl TryFrom<u8> for RosySymmetry {
  type Error = String;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      2 => Ok(RosySymmetry::Two),
      4 => Ok(RosySymmetry::Four),
      other => Err(format!("unsupported orientation symmetry {other}, expected 2 or 4")),
    }
  }
}

/// Tuning for the bundled field solver and hierarchy.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
  /// Smoothing iterations per hierarchy level for the orientation pass.
  pub orientation_iterations: usize,
  /// Smoothing iterations per hierarchy level for the position pass.
  pub position_iterations: usize,
  /// Maximum number of hierarchy levels (including the finest).
  pub max_levels: usize,
  /// Stop coarsening once a level has at most this many nodes.
  pub coarsest_size: usize,
  /// Seed for randomized field initialisation.
  pub seed: u64,
  /// Face budget used by the intrinsic scale estimate.
  pub target_faces: usize,
  /// Orientation field symmetry. Stitch labelling needs a 2-RoSy field to
  /// tell course edges from wale edges.
  pub symmetry: RosySymmetry,
}

impl Default for SolverSettings {
  fn default() -> Self {
    Self {
      orientation_iterations: DEFAULT_ORIENTATION_ITERATIONS,
      position_iterations: DEFAULT_POSITION_ITERATIONS,
      max_levels: DEFAULT_MAX_LEVELS,
      coarsest_size: DEFAULT_COARSEST_SIZE,
      seed: DEFAULT_SEED,
      target_faces: DEFAULT_TARGET_FACES,
      symmetry: RosySymmetry::default(),
    }
  }
}

impl SolverSettings {
  pub fn validate(&self) -> RemeshResult<()> {
    if self.max_levels == 0 {
      return Err(RemeshError::config("solver.max_levels must be at least 1"));
    }
    if self.coarsest_size == 0 {
      return Err(RemeshError::config("solver.coarsest_size must be at least 1"));
    }
    if self.target_faces == 0 {
      return Err(RemeshError::config("solver.target_faces must be at least 1"));
    }
    Ok(())
  }
}

/// Root configuration for a `Remesher`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RemeshConfig {
  pub parallelism: Parallelism,
  pub solver: SolverSettings,
}

impl RemeshConfig {
  /// Single-threaded configuration, handy for deterministic tests.
  pub fn single_threaded() -> Self {
    Self {
      parallelism: Parallelism::Fixed(1),
      ..Self::default()
    }
  }

  pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
    self.parallelism = parallelism;
    self
  }

  pub fn with_solver(mut self, solver: SolverSettings) -> Self {
    self.solver = solver;
    self
  }

  pub fn validate(&self) -> RemeshResult<()> {
    self.solver.validate()
  }
}
