//! Run statistics and stage timing.
//!
//! # Usage
//!
//! ```ignore
//! let mut timer = StageTimer::new();
//! timer.begin_stage(STAGE_ROSY);
//! // ... work ...
//! let record = timer.end_stage();
//! mesh.stats_mut().record(record);
//! ```

use std::time::Duration;

use web_time::Instant;

/// One completed pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageRecord {
  pub name: &'static str,
  pub elapsed: Duration,
}

impl StageRecord {
  pub fn elapsed_us(&self) -> u64 {
    self.elapsed.as_micros() as u64
  }
}

/// Wall-clock timer for one stage at a time.
#[derive(Debug, Default)]
pub struct StageTimer {
  current: Option<(&'static str, Instant)>,
}

impl StageTimer {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start timing a stage, discarding any stage that was never ended.
  pub fn begin_stage(&mut self, name: &'static str) {
    self.current = Some((name, Instant::now()));
  }

  /// Name of the stage currently being timed.
  pub fn current_stage(&self) -> Option<&'static str> {
    self.current.map(|(name, _)| name)
  }

  /// Stop the current stage and return its record.
  ///
  /// Ending without a begun stage yields an `"unnamed"` zero-length record.
  pub fn end_stage(&mut self) -> StageRecord {
    match self.current.take() {
      Some((name, start)) => StageRecord {
        name,
        elapsed: start.elapsed(),
      },
      None => StageRecord {
        name: "unnamed",
        elapsed: Duration::ZERO,
      },
    }
  }
}

/// Statistics for one remeshing run, owned by the mesh resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
  /// Append-only, one record per completed stage.
  pub timings: Vec<StageRecord>,

  pub input_vertices: usize,
  pub input_faces: usize,
  /// Vertices after subdivision to the target scale.
  pub working_vertices: usize,
  pub hierarchy_levels: usize,
  pub orientation_singularities: usize,
  pub position_singularities: usize,
  pub output_vertices: usize,
  pub output_faces: usize,
}

impl RunStats {
  pub fn new() -> Self {
    Self::default()
  }

  /// Append a stage record.
  pub fn record(&mut self, record: StageRecord) {
    self.timings.push(record);
  }

  /// Stage names in recorded order.
  pub fn stage_names(&self) -> Vec<&'static str> {
    self.timings.iter().map(|r| r.name).collect()
  }

  /// Total time across all recorded stages.
  pub fn total(&self) -> Duration {
    self.timings.iter().map(|r| r.elapsed).sum()
  }

  pub fn stage(&self, name: &str) -> Option<&StageRecord> {
    self.timings.iter().find(|r| r.name == name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_timer_records_named_stage() {
    let mut timer = StageTimer::new();
    timer.begin_stage("rosy optimization");
    assert_eq!(timer.current_stage(), Some("rosy optimization"));

    let record = timer.end_stage();
    assert_eq!(record.name, "rosy optimization");
    assert!(timer.current_stage().is_none());
  }

  #[test]
  fn test_end_without_begin() {
    let mut timer = StageTimer::new();
    let record = timer.end_stage();
    assert_eq!(record.name, "unnamed");
    assert_eq!(record.elapsed, Duration::ZERO);
  }

  #[test]
  fn test_stats_are_append_only_and_ordered() {
    let mut stats = RunStats::new();
    for name in ["a", "b", "c"] {
      stats.record(StageRecord {
        name,
        elapsed: Duration::from_micros(10),
      });
    }

    assert_eq!(stats.stage_names(), vec!["a", "b", "c"]);
    assert_eq!(stats.total(), Duration::from_micros(30));
    assert_eq!(stats.stage("b").map(|r| r.elapsed_us()), Some(10));
    assert!(stats.stage("missing").is_none());
  }
}
