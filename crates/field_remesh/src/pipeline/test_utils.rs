//! Test utilities for pipeline tests.
//!
//! Provides a recording mesh resource double and mesh fixtures for testing
//! the orchestrator and its collaborators in isolation.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::io::MeshSource;
use crate::error::{RemeshError, RemeshResult};
use crate::extraction::ExtractionFlags;
use crate::metrics::RunStats;
use crate::optimizer::OptimizerOptions;
use crate::resource::MeshResource;
use crate::scale::ScaleEstimate;
use crate::types::{MeshBuffers, Topology};

// =============================================================================
// Recording mesh resource
// =============================================================================

/// One observed `MeshResource` call.
///
/// Queries (`topology`, `scale_estimate`, `stats`) are not recorded.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
  Load(MeshSource),
  SetScale(f64),
  Build,
  Optimize(OptimizerOptions),
  DetectOrientation,
  DetectPosition,
  SetExtractionFlags(ExtractionFlags),
  Extract2D,
  Extract3D,
  ConvertToPoly,
  Label(bool),
  Align,
  Stitch,
  ExportFile(PathBuf),
  ExportBuffers,
}

/// Operation at which a `RecordingMesh` fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailAt {
  Load,
  Build,
  Optimize,
  Extract,
  Stitch,
  Export,
}

/// Shared call log. Survives the mesh being moved onto a worker or dropped.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
  pub fn calls(&self) -> Vec<Call> {
    self.0.lock().unwrap().clone()
  }

  fn push(&self, call: Call) {
    self.0.lock().unwrap().push(call);
  }
}

/// `MeshResource` double that records every call in order.
#[derive(Debug)]
pub struct RecordingMesh {
  log: CallLog,
  topology: Topology,
  estimate: f64,
  fail_at: Option<FailAt>,
  optimize_delay: Duration,
  panic_on_optimize: bool,
  output: MeshBuffers,
  stats: RunStats,
}

impl Default for RecordingMesh {
  fn default() -> Self {
    Self {
      log: CallLog::default(),
      topology: Topology::Surface,
      estimate: 0.1,
      fail_at: None,
      optimize_delay: Duration::ZERO,
      panic_on_optimize: false,
      output: unit_cube(),
      stats: RunStats::new(),
    }
  }
}

impl RecordingMesh {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_topology(mut self, topology: Topology) -> Self {
    self.topology = topology;
    self
  }

  pub fn with_estimate(mut self, estimate: f64) -> Self {
    self.estimate = estimate;
    self
  }

  pub fn failing_at(mut self, fail_at: FailAt) -> Self {
    self.fail_at = Some(fail_at);
    self
  }

  /// Make every `optimize` call sleep before returning.
  pub fn with_optimize_delay(mut self, delay: Duration) -> Self {
    self.optimize_delay = delay;
    self
  }

  pub fn panicking_on_optimize(mut self) -> Self {
    self.panic_on_optimize = true;
    self
  }

  /// Handle to the call log, valid after the mesh is gone.
  pub fn log(&self) -> CallLog {
    self.log.clone()
  }

  pub fn calls(&self) -> Vec<Call> {
    self.log.calls()
  }

  fn step(&self, call: Call, at: FailAt, fail: fn(String) -> RemeshError) -> RemeshResult<()> {
    self.log.push(call.clone());
    if self.fail_at == Some(at) {
      return Err(fail(format!("injected failure at {call:?}")));
    }
    Ok(())
  }
}

impl ScaleEstimate for RecordingMesh {
  fn scale_estimate(&self) -> f64 {
    self.estimate
  }
}

impl MeshResource for RecordingMesh {
  fn load(&mut self, source: &MeshSource) -> RemeshResult<()> {
    self.step(Call::Load(source.clone()), FailAt::Load, RemeshError::Resource)
  }

  fn set_scale(&mut self, scale: f64) {
    self.log.push(Call::SetScale(scale));
  }

  fn build(&mut self) -> RemeshResult<()> {
    self.step(Call::Build, FailAt::Build, RemeshError::Resource)
  }

  fn optimize(&mut self, options: &OptimizerOptions) -> RemeshResult<()> {
    if self.panic_on_optimize {
      panic!("solver blew up");
    }
    std::thread::sleep(self.optimize_delay);
    self.step(Call::Optimize(*options), FailAt::Optimize, RemeshError::Optimization)
  }

  fn detect_orientation_singularities(&mut self) -> RemeshResult<usize> {
    self.log.push(Call::DetectOrientation);
    Ok(0)
  }

  fn detect_position_singularities(&mut self) -> RemeshResult<usize> {
    self.log.push(Call::DetectPosition);
    Ok(0)
  }

  fn topology(&self) -> Topology {
    self.topology
  }

  fn set_extraction_flags(&mut self, flags: ExtractionFlags) {
    self.log.push(Call::SetExtractionFlags(flags));
  }

  fn extract_2d(&mut self) -> RemeshResult<()> {
    self.step(Call::Extract2D, FailAt::Extract, RemeshError::Extraction)
  }

  fn extract_3d(&mut self) -> RemeshResult<()> {
    self.step(Call::Extract3D, FailAt::Extract, RemeshError::Extraction)
  }

  fn convert_to_poly(&mut self) -> RemeshResult<()> {
    self.log.push(Call::ConvertToPoly);
    Ok(())
  }

  fn label_mesh(&mut self, flip: bool) -> RemeshResult<()> {
    self.log.push(Call::Label(flip));
    Ok(())
  }

  fn align_mesh(&mut self) -> RemeshResult<()> {
    self.log.push(Call::Align);
    Ok(())
  }

  fn stitch_mesh(&mut self) -> RemeshResult<()> {
    self.step(Call::Stitch, FailAt::Stitch, RemeshError::Extraction)
  }

  fn export_file(&self, path: &Path) -> RemeshResult<()> {
    self.step(Call::ExportFile(path.to_path_buf()), FailAt::Export, |m| {
      RemeshError::Io(std::io::Error::other(m))
    })
  }

  fn export_buffers(&self) -> RemeshResult<MeshBuffers> {
    self.step(Call::ExportBuffers, FailAt::Export, RemeshError::Extraction)?;
    Ok(self.output.clone())
  }

  fn stats(&self) -> &RunStats {
    &self.stats
  }

  fn stats_mut(&mut self) -> &mut RunStats {
    &mut self.stats
  }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Unit cube surface: 8 vertices, 12 outward-wound triangles.
pub fn unit_cube() -> MeshBuffers {
  let verts = vec![
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
  ];
  let faces = vec![
    vec![0, 2, 1],
    vec![0, 3, 2],
    vec![4, 5, 6],
    vec![4, 6, 7],
    vec![0, 1, 5],
    vec![0, 5, 4],
    vec![3, 7, 6],
    vec![3, 6, 2],
    vec![0, 4, 7],
    vec![0, 7, 3],
    vec![1, 2, 6],
    vec![1, 6, 5],
  ];
  MeshBuffers::new(faces, verts)
}

/// Single unit tetrahedron in MEDIT format.
pub const TETRAHEDRON_MEDIT: &str = "\
MeshVersionFormatted 2
Dimension 3

Vertices
4
0 0 0 0
1 0 0 0
0 1 0 0
0 0 1 0

Tetrahedra
1
1 2 3 4 0

End
";

/// Fresh path `<tmp>/field_remesh-<pid>/<tag>/<name>`, parent created.
pub fn temp_path(tag: &str, name: &str) -> PathBuf {
  let dir = std::env::temp_dir()
    .join(format!("field_remesh-{}", std::process::id()))
    .join(tag);
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join(name);
  let _ = std::fs::remove_file(&path);
  path
}

/// Write `contents` to a fresh temp path and return it.
pub fn write_temp_file(tag: &str, name: &str, contents: &str) -> PathBuf {
  let path = temp_path(tag, name);
  std::fs::write(&path, contents).unwrap();
  path
}
