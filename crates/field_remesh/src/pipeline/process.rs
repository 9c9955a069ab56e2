//! Pipeline Orchestrator
//!
//! Drives one mesh resource through the fixed stage sequence. The calling
//! thread issues at most one asynchronous operation at a time and always
//! blocks on it before moving on.
//!
//! # Usage
//!
//! ```ignore
//! let remesher = Remesher::new(RemeshConfig::default())?;
//! let request = RemeshRequest::new(
//!     MeshSource::File("bunny.obj".into()),
//!     MeshSink::File("bunny_remeshed.obj".into()),
//! )
//! .with_scale(ScaleRequest::Fixed(0.02));
//!
//! let report = remesher.process(MultiResolutionMesh::new(), request)?;
//! for record in report.timings() {
//!     println!("{}: {:?}", record.name, record.elapsed);
//! }
//! ```

use std::path::Path;

use tracing::{info, info_span};

use super::io::{MeshSink, MeshSource};
use crate::config::RemeshConfig;
use crate::constants::{STAGE_EXTRACTION, STAGE_POSY, STAGE_PREPROCESS, STAGE_ROSY};
use crate::error::RemeshResult;
use crate::extraction::{self, ExtractionPath};
use crate::metrics::{RunStats, StageRecord, StageTimer};
use crate::optimizer::{FieldOptimizer, OptimizerOptions};
use crate::resource::{MeshResource, MultiResolutionMesh};
use crate::scale::{resolve_scale, ScaleRequest};
use crate::threading::WorkerPool;
use crate::types::{Faces, MeshBuffers, Verts};

/// Inputs for one run.
#[derive(Clone, Debug, PartialEq)]
pub struct RemeshRequest {
  pub source: MeshSource,
  pub sink: MeshSink,
  pub scale: ScaleRequest,
  /// Forwarded to the labeling stage.
  pub flip_orientation: bool,
}

impl RemeshRequest {
  /// Auto scale, default orientation.
  pub fn new(source: MeshSource, sink: MeshSink) -> Self {
    Self {
      source,
      sink,
      scale: ScaleRequest::Auto,
      flip_orientation: false,
    }
  }

  pub fn with_scale(mut self, scale: ScaleRequest) -> Self {
    self.scale = scale;
    self
  }

  pub fn with_flip(mut self, flip_orientation: bool) -> Self {
    self.flip_orientation = flip_orientation;
    self
  }
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RemeshReport<M> {
  /// The mesh resource after export, usable for re-export.
  pub mesh: M,
  /// Scale that was applied.
  pub scale: f64,
  pub extraction: ExtractionPath,
  /// Output mesh for a buffer sink, `None` for a file sink.
  pub output: Option<MeshBuffers>,
}

impl<M: MeshResource> RemeshReport<M> {
  pub fn stats(&self) -> &RunStats {
    self.mesh.stats()
  }

  pub fn timings(&self) -> &[StageRecord] {
    &self.mesh.stats().timings
  }
}

/// Remeshing pipeline bound to one worker pool.
#[derive(Debug)]
pub struct Remesher {
  config: RemeshConfig,
  pool: WorkerPool,
}

impl Remesher {
  /// Validate `config` and build the worker pool it asks for.
  pub fn new(config: RemeshConfig) -> RemeshResult<Self> {
    config.validate()?;
    let pool = WorkerPool::new(config.parallelism)?;
    info!(threads = pool.num_threads(), "remesher ready");
    Ok(Self { config, pool })
  }

  pub fn config(&self) -> &RemeshConfig {
    &self.config
  }

  pub fn pool(&self) -> &WorkerPool {
    &self.pool
  }

  /// Run every stage on `mesh` in order.
  ///
  /// Any failure aborts the run: the mesh is dropped and nothing is exported.
  pub fn process<M: MeshResource>(
    &self,
    mut mesh: M,
    request: RemeshRequest,
  ) -> RemeshResult<RemeshReport<M>> {
    let RemeshRequest {
      source,
      sink,
      scale,
      flip_orientation,
    } = request;
    source.validate()?;
    sink.validate()?;
    let mut timer = StageTimer::new();

    // =========================================================================
    // Stage 1: load, scale, build
    // =========================================================================
    let scale = {
      let _span = info_span!("stage", name = STAGE_PREPROCESS).entered();
      timer.begin_stage(STAGE_PREPROCESS);

      mesh.load(&source)?;
      let scale = resolve_scale(scale, &mesh);
      info!(scale, "resolved scale");
      mesh.set_scale(scale);
      mesh.build()?;

      finish_stage(&mut timer, &mut mesh);
      scale
    };

    // =========================================================================
    // Stages 2-3: orientation pass, then position pass on the same controller
    // =========================================================================
    let options = OptimizerOptions::orientation_pass();
    let mut optimizer = FieldOptimizer::new(mesh, self.pool.clone());
    {
      let _span = info_span!("stage", name = STAGE_ROSY).entered();
      timer.begin_stage(STAGE_ROSY);

      optimizer.configure(options)?;
      optimizer.start()?;
      optimizer.wait()?;
      let mesh = optimizer.mesh_mut()?;
      self.pool.install(|| mesh.detect_orientation_singularities())?;

      finish_stage(&mut timer, mesh);
    }
    {
      let _span = info_span!("stage", name = STAGE_POSY).entered();
      timer.begin_stage(STAGE_POSY);

      optimizer.configure(options.for_positions())?;
      optimizer.start()?;
      optimizer.wait()?;
      let mesh = optimizer.mesh_mut()?;
      self.pool.install(|| mesh.detect_position_singularities())?;

      finish_stage(&mut timer, mesh);
    }
    let mut mesh = optimizer.shutdown()?;

    // =========================================================================
    // Stage 4: extraction
    // =========================================================================
    let extraction = {
      let _span = info_span!("stage", name = STAGE_EXTRACTION).entered();
      timer.begin_stage(STAGE_EXTRACTION);

      let path = extraction::extract(&mut mesh)?;

      finish_stage(&mut timer, &mut mesh);
      path
    };

    // Post-processing, strictly in this order.
    mesh.convert_to_poly()?;
    mesh.label_mesh(flip_orientation)?;
    mesh.align_mesh()?;
    mesh.stitch_mesh()?;

    let output = match &sink {
      MeshSink::File(path) => {
        mesh.export_file(path)?;
        None
      }
      MeshSink::Buffers => Some(mesh.export_buffers()?),
    };

    let stats = mesh.stats();
    info!(
      total_ms = stats.total().as_millis() as u64,
      faces = stats.output_faces,
      vertices = stats.output_vertices,
      "remesh complete"
    );

    Ok(RemeshReport {
      mesh,
      scale,
      extraction,
      output,
    })
  }
}

fn finish_stage<M: MeshResource + ?Sized>(timer: &mut StageTimer, mesh: &mut M) {
  let record = timer.end_stage();
  info!(stage = record.name, elapsed_us = record.elapsed_us(), "stage complete");
  mesh.stats_mut().record(record);
}

fn non_empty(value: &str) -> Option<&Path> {
  (!value.trim().is_empty()).then(|| Path::new(value))
}

/// Caller-facing batch entry point.
///
/// Empty `input`/`output` strings mean "absent". A `scale` that is not
/// positive and finite means auto. `faces` and `verts` supply the input when
/// there is no input path and receive the output when there is no output
/// path; they are only overwritten once every stage has succeeded.
pub fn run_batch(
  input: &str,
  output: &str,
  scale: f64,
  flip_orientation: bool,
  faces: &mut Faces,
  verts: &mut Verts,
  config: &RemeshConfig,
) -> RemeshResult<RunStats> {
  let source = MeshSource::resolve(non_empty(input), faces, verts)?;
  let sink = MeshSink::resolve(non_empty(output))?;
  let request = RemeshRequest::new(source, sink)
    .with_scale(ScaleRequest::from_raw(scale))
    .with_flip(flip_orientation);

  let remesher = Remesher::new(config.clone())?;
  let report = remesher.process(MultiResolutionMesh::with_settings(config.solver.clone()), request)?;

  if let Some(buffers) = report.output {
    *faces = buffers.faces;
    *verts = buffers.verts;
  }
  Ok(report.mesh.stats().clone())
}

#[cfg(test)]
#[path = "process_test.rs"]
mod process_test;
