use std::path::PathBuf;

use super::*;
use crate::config::{Parallelism, SolverSettings};
use crate::constants::STAGE_ORDER;
use crate::error::RemeshError;
use crate::extraction::ExtractionFlags;
use crate::pipeline::test_utils::{unit_cube, Call, FailAt, RecordingMesh};
use crate::types::Topology;

fn remesher() -> Remesher {
  Remesher::new(RemeshConfig::single_threaded()).unwrap()
}

fn buffer_request() -> RemeshRequest {
  RemeshRequest::new(MeshSource::Buffers(unit_cube()), MeshSink::Buffers)
}

#[test]
fn test_surface_run_calls_every_stage_in_order() {
  let mesh = RecordingMesh::new().with_estimate(0.123456);
  let log = mesh.log();
  let report = remesher().process(mesh, buffer_request()).unwrap();

  let orientation = OptimizerOptions::orientation_pass();
  assert_eq!(
    log.calls(),
    vec![
      Call::Load(MeshSource::Buffers(unit_cube())),
      Call::SetScale(0.1235),
      Call::Build,
      Call::Optimize(orientation),
      Call::DetectOrientation,
      Call::Optimize(orientation.for_positions()),
      Call::DetectPosition,
      Call::SetExtractionFlags(ExtractionFlags::surface()),
      Call::Extract2D,
      Call::ConvertToPoly,
      Call::Label(false),
      Call::Align,
      Call::Stitch,
      Call::ExportBuffers,
    ]
  );
  assert_eq!(report.scale, 0.1235);
  assert_eq!(report.extraction, ExtractionPath::Surface2D);
  assert_eq!(report.output, Some(unit_cube()));
}

#[test]
fn test_optimizer_passes_use_standard_toggles() {
  let mesh = RecordingMesh::new();
  let log = mesh.log();
  remesher().process(mesh, buffer_request()).unwrap();

  let passes: Vec<OptimizerOptions> = log
    .calls()
    .into_iter()
    .filter_map(|call| match call {
      Call::Optimize(options) => Some(options),
      _ => None,
    })
    .collect();
  assert_eq!(passes.len(), 2);
  for options in &passes {
    assert!(!options.extrinsic && options.alignment);
    assert!(options.randomization && options.hierarchy);
  }
  assert!(passes[0].optimize_orientations() && !passes[0].optimize_positions());
  assert!(passes[1].optimize_positions() && !passes[1].optimize_orientations());
}

#[test]
fn test_stage_timings_follow_fixed_order() {
  for topology in [Topology::Surface, Topology::Volumetric] {
    let mesh = RecordingMesh::new().with_topology(topology);
    let report = remesher().process(mesh, buffer_request()).unwrap();

    assert_eq!(report.stats().stage_names(), STAGE_ORDER.to_vec());
    assert_eq!(report.timings().len(), 4);
  }
}

#[test]
fn test_volumetric_run_takes_3d_path() {
  let mesh = RecordingMesh::new().with_topology(Topology::Volumetric);
  let log = mesh.log();
  let report = remesher().process(mesh, buffer_request()).unwrap();

  let calls = log.calls();
  assert_eq!(report.extraction, ExtractionPath::Volumetric3D);
  assert!(calls.contains(&Call::SetExtractionFlags(ExtractionFlags::volumetric())));
  assert!(calls.contains(&Call::Extract3D));
  assert!(!calls.contains(&Call::Extract2D));
}

#[test]
fn test_fixed_scale_and_flip_are_forwarded() {
  let mesh = RecordingMesh::new().with_estimate(0.5);
  let log = mesh.log();
  let request = buffer_request()
    .with_scale(ScaleRequest::Fixed(0.25))
    .with_flip(true);
  let report = remesher().process(mesh, request).unwrap();

  let calls = log.calls();
  assert_eq!(report.scale, 0.25);
  assert!(calls.contains(&Call::SetScale(0.25)));
  assert!(calls.contains(&Call::Label(true)));
}

#[test]
fn test_file_sink_exports_to_path() {
  let mesh = RecordingMesh::new();
  let log = mesh.log();
  let out = PathBuf::from("out.obj");
  let request = RemeshRequest::new(
    MeshSource::File(PathBuf::from("in.obj")),
    MeshSink::File(out.clone()),
  );
  let report = remesher().process(mesh, request).unwrap();

  let calls = log.calls();
  assert_eq!(calls.first(), Some(&Call::Load(MeshSource::File(PathBuf::from("in.obj")))));
  assert_eq!(calls.last(), Some(&Call::ExportFile(out)));
  assert!(!calls.contains(&Call::ExportBuffers));
  assert!(report.output.is_none());
}

#[test]
fn test_unsupported_formats_rejected_before_any_stage() {
  let requests = [
    RemeshRequest::new(MeshSource::File(PathBuf::from("in.stl")), MeshSink::Buffers),
    RemeshRequest::new(MeshSource::Buffers(unit_cube()), MeshSink::File(PathBuf::from("out.mesh"))),
    RemeshRequest::new(MeshSource::File(PathBuf::from("in.obj")), MeshSink::File(PathBuf::from("out"))),
  ];

  for request in requests {
    let mesh = RecordingMesh::new();
    let log = mesh.log();
    let result = remesher().process(mesh, request);

    assert!(matches!(result, Err(RemeshError::Config(_))));
    assert!(log.calls().is_empty());
  }
}

#[test]
fn test_failures_abort_without_output() {
  let cases = [
    (FailAt::Load, Call::Load(MeshSource::Buffers(unit_cube()))),
    (FailAt::Build, Call::Build),
    (FailAt::Optimize, Call::Optimize(OptimizerOptions::orientation_pass())),
    (FailAt::Extract, Call::Extract2D),
    (FailAt::Stitch, Call::Stitch),
    (FailAt::Export, Call::ExportBuffers),
  ];

  for (fail_at, last) in cases {
    let mesh = RecordingMesh::new().failing_at(fail_at);
    let log = mesh.log();
    let result = remesher().process(mesh, buffer_request());

    let err = result.expect_err("injected failure must abort the run");
    match fail_at {
      FailAt::Load | FailAt::Build => assert!(matches!(err, RemeshError::Resource(_))),
      FailAt::Optimize => assert!(matches!(err, RemeshError::Optimization(_))),
      FailAt::Extract | FailAt::Stitch | FailAt::Export => {
        assert!(matches!(err, RemeshError::Extraction(_)))
      }
    }
    assert_eq!(log.calls().last(), Some(&last), "{fail_at:?}");
  }
}

#[test]
fn test_failed_pass_stops_before_singularity_detection() {
  let mesh = RecordingMesh::new().failing_at(FailAt::Optimize);
  let log = mesh.log();
  assert!(remesher().process(mesh, buffer_request()).is_err());
  assert!(!log.calls().contains(&Call::DetectOrientation));
}

#[test]
fn test_panicking_solver_is_an_optimization_error() {
  let mesh = RecordingMesh::new().panicking_on_optimize();
  let log = mesh.log();
  let result = remesher().process(mesh, buffer_request());

  assert!(matches!(result, Err(RemeshError::Optimization(_))));
  assert_eq!(log.calls().last(), Some(&Call::Build));
}

#[test]
fn test_invalid_config_is_rejected() {
  let config = RemeshConfig::default().with_solver(SolverSettings {
    coarsest_size: 0,
    ..SolverSettings::default()
  });
  assert!(matches!(Remesher::new(config), Err(RemeshError::Config(_))));
}

#[test]
fn test_remesher_uses_configured_parallelism() {
  let config = RemeshConfig::default().with_parallelism(Parallelism::Fixed(2));
  let pipeline = Remesher::new(config).unwrap();
  assert_eq!(pipeline.pool().num_threads(), 2);
  assert_eq!(pipeline.config().parallelism, Parallelism::Fixed(2));
}

#[test]
fn test_multi_threaded_pool_runs_the_same_sequence() {
  let config = RemeshConfig::default().with_parallelism(Parallelism::Fixed(4));
  let parallel = Remesher::new(config).unwrap();
  let single = RecordingMesh::new();
  let multi = RecordingMesh::new();
  let (single_log, multi_log) = (single.log(), multi.log());

  remesher().process(single, buffer_request()).unwrap();
  parallel.process(multi, buffer_request()).unwrap();
  assert_eq!(single_log.calls(), multi_log.calls());
}
