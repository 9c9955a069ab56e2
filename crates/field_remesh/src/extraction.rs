//! Extraction path selection.
//!
//! One explicit choice per run: surface meshes take the 2D path with every
//! flag enabled, volumetric meshes take the 3D path with only `recolor` and
//! `splitting` (the 3D extractor handles decomposition internally).

use tracing::debug;

use crate::error::RemeshResult;
use crate::resource::MeshResource;
use crate::types::Topology;

/// Flags configured immediately before extraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractionFlags {
  /// Recompute per-face colour labels.
  pub recolor: bool,
  /// Split non-manifold vertices.
  pub splitting: bool,
  /// Pair lattice triangles into quads.
  pub decompose: bool,
  /// Remove valence-2 interior vertices.
  pub doublets: bool,
  /// Fan-triangulate polygons with more than four corners.
  pub triangulate: bool,
}

impl ExtractionFlags {
  /// All five flags set.
  pub fn surface() -> Self {
    Self {
      recolor: true,
      splitting: true,
      decompose: true,
      doublets: true,
      triangulate: true,
    }
  }

  /// Only `recolor` and `splitting`.
  pub fn volumetric() -> Self {
    Self {
      recolor: true,
      splitting: true,
      ..Self::default()
    }
  }
}

/// Which extractor runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionPath {
  Surface2D,
  Volumetric3D,
}

impl ExtractionPath {
  pub fn for_topology(topology: Topology) -> Self {
    match topology {
      Topology::Surface => ExtractionPath::Surface2D,
      Topology::Volumetric => ExtractionPath::Volumetric3D,
    }
  }

  pub fn flags(self) -> ExtractionFlags {
    match self {
      ExtractionPath::Surface2D => ExtractionFlags::surface(),
      ExtractionPath::Volumetric3D => ExtractionFlags::volumetric(),
    }
  }
}

/// Select the path from the mesh topology, set its flags and extract.
pub fn extract<M: MeshResource + ?Sized>(mesh: &mut M) -> RemeshResult<ExtractionPath> {
  let path = ExtractionPath::for_topology(mesh.topology());
  let flags = path.flags();
  debug!(?path, ?flags, "selected extraction path");

  mesh.set_extraction_flags(flags);
  match path {
    ExtractionPath::Surface2D => mesh.extract_2d()?,
    ExtractionPath::Volumetric3D => mesh.extract_3d()?,
  }
  Ok(path)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pipeline::test_utils::{Call, RecordingMesh};

  #[test]
  fn test_surface_sets_all_flags() {
    let flags = ExtractionPath::for_topology(Topology::Surface).flags();
    assert!(flags.recolor && flags.splitting && flags.decompose);
    assert!(flags.doublets && flags.triangulate);
  }

  #[test]
  fn test_volumetric_flag_subset() {
    let flags = ExtractionPath::for_topology(Topology::Volumetric).flags();
    assert!(flags.recolor && flags.splitting);
    assert!(!flags.decompose && !flags.doublets && !flags.triangulate);
  }

  #[test]
  fn test_surface_mesh_runs_2d_extraction() {
    let mut mesh = RecordingMesh::new();
    let path = extract(&mut mesh).unwrap();

    assert_eq!(path, ExtractionPath::Surface2D);
    assert_eq!(
      mesh.calls(),
      vec![
        Call::SetExtractionFlags(ExtractionFlags::surface()),
        Call::Extract2D
      ]
    );
  }

  #[test]
  fn test_volumetric_mesh_runs_3d_extraction() {
    let mut mesh = RecordingMesh::new().with_topology(Topology::Volumetric);
    let path = extract(&mut mesh).unwrap();

    assert_eq!(path, ExtractionPath::Volumetric3D);
    assert_eq!(
      mesh.calls(),
      vec![
        Call::SetExtractionFlags(ExtractionFlags::volumetric()),
        Call::Extract3D
      ]
    );
  }
}
