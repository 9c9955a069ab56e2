//! `MultiResolutionMesh`: the bundled mesh resource.

use std::path::Path;

use tracing::{debug, info};

use super::extract::{self, Extraction};
use super::fields;
use super::geometry::SurfaceMesh;
use super::hierarchy::Hierarchy;
use super::meshio::{self, RawMesh};
use super::postprocess::PolyMesh;
use super::MeshResource;
use crate::config::SolverSettings;
use crate::constants::{MAX_SUBDIVIDED_VERTICES, SUBDIVISION_RATIO, WELD_RATIO};
use crate::error::{RemeshError, RemeshResult};
use crate::extraction::ExtractionFlags;
use crate::metrics::RunStats;
use crate::optimizer::{FieldPass, OptimizerOptions};
use crate::pipeline::MeshSource;
use crate::scale::ScaleEstimate;
use crate::types::{MeshBuffers, Topology};

/// Triangle-surface mesh with a multi-resolution hierarchy and RoSy
/// orientation / lattice position fields.
///
/// Each stage checks that the stages it depends on have run and fails with
/// the error kind of the stage that was skipped.
#[derive(Debug, Default)]
pub struct MultiResolutionMesh {
  settings: SolverSettings,
  raw: Option<RawMesh>,
  /// Field domain as loaded.
  surface: Option<SurfaceMesh>,
  /// Field domain after subdivision to the target scale.
  working: Option<SurfaceMesh>,
  scale: Option<f64>,
  hierarchy: Option<Hierarchy>,
  extrinsic: bool,
  orientations_solved: bool,
  positions_solved: bool,
  flags: ExtractionFlags,
  extraction: Option<Extraction>,
  poly: Option<PolyMesh>,
  stats: RunStats,
}

impl MultiResolutionMesh {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_settings(settings: SolverSettings) -> Self {
    Self {
      settings,
      ..Self::default()
    }
  }

  pub fn settings(&self) -> &SolverSettings {
    &self.settings
  }

  /// Scale applied with `set_scale`, if any.
  pub fn scale(&self) -> Option<f64> {
    self.scale
  }

  pub fn raw(&self) -> Option<&RawMesh> {
    self.raw.as_ref()
  }

  pub fn hierarchy(&self) -> Option<&Hierarchy> {
    self.hierarchy.as_ref()
  }

  pub fn extraction(&self) -> Option<&Extraction> {
    self.extraction.as_ref()
  }

  pub fn poly_mesh(&self) -> Option<&PolyMesh> {
    self.poly.as_ref()
  }

  pub fn extraction_flags(&self) -> ExtractionFlags {
    self.flags
  }

  fn solved(&self) -> RemeshResult<(&Hierarchy, &SurfaceMesh)> {
    match (&self.hierarchy, &self.working) {
      (Some(hierarchy), Some(working)) => Ok((hierarchy, working)),
      _ => Err(RemeshError::Optimization("mesh has not been built".into())),
    }
  }

  fn poly(&self, operation: &str) -> RemeshResult<&PolyMesh> {
    self
      .poly
      .as_ref()
      .ok_or_else(|| RemeshError::extraction(format!("{operation} requires convert_to_poly first")))
  }

  fn poly_mut(&mut self, operation: &str) -> RemeshResult<&mut PolyMesh> {
    self
      .poly
      .as_mut()
      .ok_or_else(|| RemeshError::extraction(format!("{operation} requires convert_to_poly first")))
  }

  fn extract_with(
    &mut self,
    expected: Topology,
    run: fn(&super::Level, &[[usize; 3]], f64, ExtractionFlags) -> RemeshResult<Extraction>,
  ) -> RemeshResult<()> {
    let topology = self.topology();
    if topology != expected {
      return Err(RemeshError::extraction(format!(
        "{expected:?} extraction requested for a {topology:?} mesh"
      )));
    }
    if !self.positions_solved {
      return Err(RemeshError::extraction("position field has not been solved"));
    }
    let (hierarchy, working) = self.solved()?;
    let extraction = run(hierarchy.finest(), &working.triangles, hierarchy.scale, self.flags)?;
    info!(
      vertices = extraction.vertex_count(),
      faces = extraction.face_count(),
      quads = extraction.quad_count(),
      "extracted mesh"
    );
    self.extraction = Some(extraction);
    self.poly = None;
    Ok(())
  }
}

impl ScaleEstimate for MultiResolutionMesh {
  /// `sqrt(area / target_faces)`; zero before a mesh is loaded.
  fn scale_estimate(&self) -> f64 {
    match &self.surface {
      Some(surface) => (surface.surface_area() / self.settings.target_faces.max(1) as f64).sqrt(),
      None => 0.0,
    }
  }
}

impl MeshResource for MultiResolutionMesh {
  fn load(&mut self, source: &MeshSource) -> RemeshResult<()> {
    let raw = match source {
      MeshSource::File(path) => meshio::read_mesh(path)?,
      MeshSource::Buffers(buffers) => RawMesh::from_buffers(buffers)?,
    };

    *self = Self::with_settings(self.settings.clone());
    self.stats.input_vertices = raw.positions.len();
    self.stats.input_faces = raw.element_count();
    let surface = raw.surface();
    info!(
      vertices = raw.positions.len(),
      elements = raw.element_count(),
      topology = ?raw.topology(),
      "loaded mesh"
    );
    self.surface = Some(surface);
    self.raw = Some(raw);
    Ok(())
  }

  fn set_scale(&mut self, scale: f64) {
    self.scale = Some(scale);
  }

  fn build(&mut self) -> RemeshResult<()> {
    let surface = self
      .surface
      .as_ref()
      .ok_or_else(|| RemeshError::resource("build called before a mesh was loaded"))?;
    let scale = match self.scale {
      Some(scale) if scale.is_finite() && scale > 0.0 => scale,
      other => {
        return Err(RemeshError::resource(format!(
          "scale must be positive and finite, got {other:?}"
        )))
      }
    };
    if surface.triangles.is_empty() {
      return Err(RemeshError::resource("mesh has no usable surface triangles"));
    }
    let area = surface.surface_area();
    if !(area > 0.0) {
      return Err(RemeshError::resource("mesh has zero surface area"));
    }

    let mut working = surface.clone();
    working.subdivide(scale * SUBDIVISION_RATIO, MAX_SUBDIVIDED_VERTICES)?;
    let hierarchy = Hierarchy::build(
      &working,
      scale,
      self.settings.max_levels,
      self.settings.coarsest_size,
    )?;

    self.stats.working_vertices = working.vertex_count();
    self.stats.hierarchy_levels = hierarchy.level_count();
    info!(
      scale,
      vertices = working.vertex_count(),
      triangles = working.triangles.len(),
      levels = hierarchy.level_count(),
      "built hierarchy"
    );
    self.working = Some(working);
    self.hierarchy = Some(hierarchy);
    self.orientations_solved = false;
    self.positions_solved = false;
    Ok(())
  }

  fn optimize(&mut self, options: &OptimizerOptions) -> RemeshResult<()> {
    let settings = &self.settings;
    let hierarchy = self
      .hierarchy
      .as_mut()
      .ok_or_else(|| RemeshError::Optimization("optimize called before build".into()))?;
    self.extrinsic = options.extrinsic;

    match options.pass {
      FieldPass::Orientations => {
        fields::optimize_orientations(
          hierarchy,
          options,
          settings.symmetry,
          settings.orientation_iterations,
          settings.seed,
        );
        self.orientations_solved = true;
        self.positions_solved = false;
      }
      FieldPass::Positions => {
        if !self.orientations_solved {
          return Err(RemeshError::Optimization(
            "position pass needs a solved orientation field".into(),
          ));
        }
        fields::optimize_positions(hierarchy, options, settings.position_iterations);
        self.positions_solved = true;
      }
    }
    Ok(())
  }

  fn detect_orientation_singularities(&mut self) -> RemeshResult<usize> {
    if !self.orientations_solved {
      return Err(RemeshError::Optimization("orientation field has not been solved".into()));
    }
    let (hierarchy, working) = self.solved()?;
    let count = fields::orientation_singularities(
      hierarchy.finest(),
      &working.triangles,
      self.extrinsic,
      self.settings.symmetry,
    );
    debug!(count, "orientation singularities");
    self.stats.orientation_singularities = count;
    Ok(count)
  }

  fn detect_position_singularities(&mut self) -> RemeshResult<usize> {
    if !self.positions_solved {
      return Err(RemeshError::Optimization("position field has not been solved".into()));
    }
    let (hierarchy, working) = self.solved()?;
    let count = fields::position_singularities(hierarchy.finest(), &working.triangles, hierarchy.scale);
    debug!(count, "position singularities");
    self.stats.position_singularities = count;
    Ok(count)
  }

  fn topology(&self) -> Topology {
    self.raw.as_ref().map(RawMesh::topology).unwrap_or_default()
  }

  fn set_extraction_flags(&mut self, flags: ExtractionFlags) {
    self.flags = flags;
  }

  fn extract_2d(&mut self) -> RemeshResult<()> {
    self.extract_with(Topology::Surface, extract::extract_surface)
  }

  fn extract_3d(&mut self) -> RemeshResult<()> {
    self.extract_with(Topology::Volumetric, extract::extract_volume)
  }

  fn convert_to_poly(&mut self) -> RemeshResult<()> {
    let extraction = self
      .extraction
      .as_ref()
      .ok_or_else(|| RemeshError::extraction("convert_to_poly requires an extraction"))?;
    let poly = PolyMesh::from_extraction(extraction);
    debug!(vertices = poly.vertex_count(), faces = poly.face_count(), "converted to polygons");
    self.poly = Some(poly);
    Ok(())
  }

  fn label_mesh(&mut self, flip: bool) -> RemeshResult<()> {
    self.poly_mut("label_mesh")?.label(flip);
    Ok(())
  }

  fn align_mesh(&mut self) -> RemeshResult<()> {
    let poly = self.poly_mut("align_mesh")?;
    if !poly.is_labeled() {
      return Err(RemeshError::extraction("align_mesh requires label_mesh first"));
    }
    let rotated = poly.align();
    debug!(rotated, "aligned faces");
    Ok(())
  }

  fn stitch_mesh(&mut self) -> RemeshResult<()> {
    let tolerance = WELD_RATIO * self.scale.unwrap_or(0.0);
    let poly = self.poly_mut("stitch_mesh")?;
    let summary = poly.stitch(tolerance);
    let (vertices, faces) = (poly.vertex_count(), poly.face_count());
    debug!(?summary, "stitched mesh");
    if faces == 0 {
      return Err(RemeshError::extraction("stitching removed every face"));
    }
    self.stats.output_vertices = vertices;
    self.stats.output_faces = faces;
    Ok(())
  }

  fn export_file(&self, path: &Path) -> RemeshResult<()> {
    let buffers = self.poly("export")?.to_buffers();
    meshio::write_mesh(path, &buffers)?;
    info!(path = %path.display(), faces = buffers.face_count(), "exported mesh");
    Ok(())
  }

  fn export_buffers(&self) -> RemeshResult<MeshBuffers> {
    Ok(self.poly("export")?.to_buffers())
  }

  fn stats(&self) -> &RunStats {
    &self.stats
  }

  fn stats_mut(&mut self) -> &mut RunStats {
    &mut self.stats
  }
}

#[cfg(test)]
#[path = "mesh_test.rs"]
mod mesh_test;
