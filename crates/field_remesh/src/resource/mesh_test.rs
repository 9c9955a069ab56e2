use super::*;
use crate::pipeline::test_utils::{temp_path, unit_cube, write_temp_file, TETRAHEDRON_MEDIT};

fn loaded_cube() -> MultiResolutionMesh {
  let mut mesh = MultiResolutionMesh::new();
  mesh.load(&MeshSource::Buffers(unit_cube())).unwrap();
  mesh
}

/// Drive a loaded mesh through both field passes at `scale`.
fn solve(mesh: &mut MultiResolutionMesh, scale: f64) {
  mesh.set_scale(scale);
  mesh.build().unwrap();
  let options = OptimizerOptions::orientation_pass();
  mesh.optimize(&options).unwrap();
  mesh.detect_orientation_singularities().unwrap();
  mesh.optimize(&options.for_positions()).unwrap();
  mesh.detect_position_singularities().unwrap();
}

fn post_process(mesh: &mut MultiResolutionMesh) {
  mesh.convert_to_poly().unwrap();
  mesh.label_mesh(false).unwrap();
  mesh.align_mesh().unwrap();
  mesh.stitch_mesh().unwrap();
}

#[test]
fn test_cube_scale_estimate() {
  let mesh = loaded_cube();
  // sqrt(6 / 600)
  assert!((mesh.scale_estimate() - 0.1).abs() < 1e-12);
  assert_eq!(mesh.stats().input_vertices, 8);
  assert_eq!(mesh.stats().input_faces, 12);
  assert_eq!(mesh.topology(), Topology::Surface);
}

#[test]
fn test_estimate_before_load_is_zero() {
  assert_eq!(MultiResolutionMesh::new().scale_estimate(), 0.0);
}

#[test]
fn test_target_faces_drives_estimate() {
  let mut mesh = MultiResolutionMesh::with_settings(SolverSettings {
    target_faces: 24,
    ..SolverSettings::default()
  });
  mesh.load(&MeshSource::Buffers(unit_cube())).unwrap();
  assert!((mesh.scale_estimate() - 0.5).abs() < 1e-12);
}

#[test]
fn test_build_rejects_invalid_scale() {
  for scale in [0.0, -1.0, f64::NAN, f64::INFINITY] {
    let mut mesh = loaded_cube();
    mesh.set_scale(scale);
    assert!(matches!(mesh.build(), Err(RemeshError::Resource(_))), "scale {scale}");
  }

  let mut unscaled = loaded_cube();
  assert!(matches!(unscaled.build(), Err(RemeshError::Resource(_))));
}

#[test]
fn test_build_before_load() {
  let mut mesh = MultiResolutionMesh::new();
  mesh.set_scale(0.1);
  assert!(matches!(mesh.build(), Err(RemeshError::Resource(_))));
}

#[test]
fn test_zero_area_mesh_is_rejected() {
  let flat = MeshBuffers::new(
    vec![vec![0, 1, 2]],
    vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
  );
  let mut mesh = MultiResolutionMesh::new();
  mesh.load(&MeshSource::Buffers(flat)).unwrap();
  mesh.set_scale(0.1);
  assert!(matches!(mesh.build(), Err(RemeshError::Resource(_))));
}

#[test]
fn test_build_subdivides_to_half_scale() {
  let mut mesh = loaded_cube();
  mesh.set_scale(0.25);
  mesh.build().unwrap();

  let working = mesh.working.as_ref().unwrap();
  assert!(working.max_edge_length() <= 0.125 + 1e-12);
  assert!((working.surface_area() - 6.0).abs() < 1e-9);
  assert_eq!(mesh.stats().working_vertices, working.vertex_count());
  assert!(mesh.stats().hierarchy_levels >= 2);
}

#[test]
fn test_stage_dependencies_are_enforced() {
  let mut mesh = loaded_cube();
  let options = OptimizerOptions::orientation_pass();
  assert!(matches!(mesh.optimize(&options), Err(RemeshError::Optimization(_))));

  mesh.set_scale(0.25);
  mesh.build().unwrap();
  assert!(matches!(
    mesh.optimize(&options.for_positions()),
    Err(RemeshError::Optimization(_))
  ));
  assert!(matches!(
    mesh.detect_orientation_singularities(),
    Err(RemeshError::Optimization(_))
  ));

  mesh.optimize(&options).unwrap();
  assert!(matches!(
    mesh.detect_position_singularities(),
    Err(RemeshError::Optimization(_))
  ));
  mesh.set_extraction_flags(ExtractionFlags::surface());
  assert!(matches!(mesh.extract_2d(), Err(RemeshError::Extraction(_))));
  assert!(matches!(mesh.convert_to_poly(), Err(RemeshError::Extraction(_))));
  assert!(matches!(mesh.label_mesh(false), Err(RemeshError::Extraction(_))));
  assert!(matches!(mesh.export_buffers(), Err(RemeshError::Extraction(_))));
}

#[test]
fn test_full_surface_sequence() {
  let mut mesh = loaded_cube();
  solve(&mut mesh, 0.25);
  mesh.set_extraction_flags(ExtractionFlags::surface());
  assert!(matches!(mesh.extract_3d(), Err(RemeshError::Extraction(_))));
  mesh.extract_2d().unwrap();
  assert!(matches!(mesh.align_mesh(), Err(RemeshError::Extraction(_))));
  post_process(&mut mesh);

  let output = mesh.export_buffers().unwrap();
  assert!(!output.is_empty());
  assert!(output.indices_valid());
  assert!(output.faces.iter().all(|f| (3..=4).contains(&f.len())));
  assert_eq!(mesh.stats().output_faces, output.face_count());
  assert_eq!(mesh.stats().output_vertices, output.vertex_count());

  // Re-export is value-identical.
  assert_eq!(mesh.export_buffers().unwrap(), output);
}

#[test]
fn test_export_file_round_trips() {
  let mut mesh = loaded_cube();
  solve(&mut mesh, 0.25);
  mesh.set_extraction_flags(ExtractionFlags::surface());
  mesh.extract_2d().unwrap();
  post_process(&mut mesh);

  let path = temp_path("mesh_export", "cube.obj");
  mesh.export_file(&path).unwrap();
  let raw = meshio::read_mesh(&path).unwrap();
  assert_eq!(raw.polygons.len(), mesh.stats().output_faces);
  assert_eq!(raw.positions.len(), mesh.stats().output_vertices);
}

#[test]
fn test_volumetric_mesh_takes_3d_path() {
  let path = write_temp_file("mesh_volume", "tet.mesh", TETRAHEDRON_MEDIT);
  let mut mesh = MultiResolutionMesh::new();
  mesh.load(&MeshSource::File(path)).unwrap();

  assert_eq!(mesh.topology(), Topology::Volumetric);
  assert_eq!(mesh.stats().input_faces, 1);

  solve(&mut mesh, 0.1);
  mesh.set_extraction_flags(ExtractionFlags::volumetric());
  assert!(matches!(mesh.extract_2d(), Err(RemeshError::Extraction(_))));
  mesh.extract_3d().unwrap();
  post_process(&mut mesh);

  let output = mesh.export_buffers().unwrap();
  assert!(!output.is_empty());
  assert!(output.indices_valid());
}

#[test]
fn test_reload_resets_state() {
  let mut mesh = loaded_cube();
  solve(&mut mesh, 0.25);
  mesh.load(&MeshSource::Buffers(unit_cube())).unwrap();

  assert!(mesh.hierarchy().is_none());
  assert!(mesh.scale().is_none());
  assert!(mesh.stats().timings.is_empty());
  assert!(matches!(
    mesh.detect_orientation_singularities(),
    Err(RemeshError::Optimization(_))
  ));
}
