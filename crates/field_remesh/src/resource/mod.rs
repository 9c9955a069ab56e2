//! Mesh resources: the geometry and hierarchy state a remeshing run drives.
//!
//! The orchestrator only sees the `MeshResource` trait. `MultiResolutionMesh`
//! is the bundled implementation; tests substitute recording doubles.

use std::path::Path;

use crate::error::RemeshResult;
use crate::extraction::ExtractionFlags;
use crate::metrics::RunStats;
use crate::optimizer::OptimizerOptions;
use crate::pipeline::MeshSource;
use crate::scale::ScaleEstimate;
use crate::types::{MeshBuffers, Topology};

mod extract;
mod fields;
mod geometry;
mod hierarchy;
mod mesh;
pub mod meshio;
mod postprocess;

pub use geometry::SurfaceMesh;
pub use hierarchy::{Hierarchy, Level};
pub use mesh::MultiResolutionMesh;
pub use meshio::RawMesh;

/// Geometry and hierarchy state driven through one remeshing run.
///
/// `Send + 'static` because the resource is moved onto a worker thread for
/// the duration of each optimisation pass.
pub trait MeshResource: ScaleEstimate + Send + 'static {
  /// Load the input mesh from exactly one source.
  fn load(&mut self, source: &MeshSource) -> RemeshResult<()>;

  /// Target edge length used by `build` and everything after it.
  fn set_scale(&mut self, scale: f64);

  /// Build adjacency and the multi-resolution hierarchy.
  fn build(&mut self) -> RemeshResult<()>;

  /// Run one field optimisation pass. Called on a worker thread.
  fn optimize(&mut self, options: &OptimizerOptions) -> RemeshResult<()>;

  /// Count (and remember) orientation field singularities.
  fn detect_orientation_singularities(&mut self) -> RemeshResult<usize>;

  /// Count (and remember) position field singularities.
  fn detect_position_singularities(&mut self) -> RemeshResult<usize>;

  fn topology(&self) -> Topology;

  fn set_extraction_flags(&mut self, flags: ExtractionFlags);

  /// Surface extraction.
  fn extract_2d(&mut self) -> RemeshResult<()>;

  /// Volumetric extraction.
  fn extract_3d(&mut self) -> RemeshResult<()>;

  /// Convert the extraction result into the polygon mesh used downstream.
  fn convert_to_poly(&mut self) -> RemeshResult<()>;

  /// Orient faces and label edges; `flip` reverses the winding convention.
  fn label_mesh(&mut self, flip: bool) -> RemeshResult<()>;

  fn align_mesh(&mut self) -> RemeshResult<()>;

  /// Weld coincident elements introduced by extraction.
  fn stitch_mesh(&mut self) -> RemeshResult<()>;

  fn export_file(&self, path: &Path) -> RemeshResult<()>;

  fn export_buffers(&self) -> RemeshResult<MeshBuffers>;

  fn stats(&self) -> &RunStats;

  fn stats_mut(&mut self) -> &mut RunStats;
}
