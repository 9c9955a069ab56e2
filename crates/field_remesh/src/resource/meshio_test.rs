use std::io::Cursor;

use super::*;

fn path() -> &'static Path {
  Path::new("test.obj")
}

#[test]
fn test_read_obj_triangles_and_quads() {
  let text = "\
# a quad and a triangle
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 0.5 2 0
vn 0 0 1
f 1 2 3 4
f 4/1/1 3/2/1 5/3/1
";
  let raw = read_obj(Cursor::new(text), path()).unwrap();

  assert_eq!(raw.positions.len(), 5);
  assert_eq!(raw.polygons, vec![vec![0, 1, 2, 3], vec![3, 2, 4]]);
  assert_eq!(raw.topology(), Topology::Surface);
  assert!(raw.validate().is_ok());
}

#[test]
fn test_read_obj_relative_indices() {
  let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
  let raw = read_obj(Cursor::new(text), path()).unwrap();
  assert_eq!(raw.polygons, vec![vec![0, 1, 2]]);
}

#[test]
fn test_read_obj_reports_line_of_bad_coordinate() {
  let text = "v 0 0 0\nv 1 nope 0\n";
  match read_obj(Cursor::new(text), path()) {
    Err(RemeshError::Parse { line, .. }) => assert_eq!(line, 2),
    other => panic!("expected parse error, got {other:?}"),
  }
}

#[test]
fn test_read_obj_rejects_zero_index() {
  let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n";
  assert!(matches!(
    read_obj(Cursor::new(text), path()),
    Err(RemeshError::Parse { line: 4, .. })
  ));
}

#[test]
fn test_read_medit_tetrahedron() {
  let text = "\
MeshVersionFormatted 1
Dimension 3
Vertices
4
0 0 0 1
1 0 0 1
0 1 0 1
0 0 1 1
Edges
1
1 2 0
Tetrahedra
1
1 2 3 4 0
End
";
  let raw = read_medit(Cursor::new(text), Path::new("tet.mesh")).unwrap();

  assert_eq!(raw.positions.len(), 4);
  assert_eq!(raw.tets, vec![[0, 1, 2, 3]]);
  assert_eq!(raw.topology(), Topology::Volumetric);
  assert_eq!(raw.element_count(), 1);
}

#[test]
fn test_read_medit_unknown_section() {
  let text = "MeshVersionFormatted 1\nDimension 3\nPrisms\n0\n";
  assert!(matches!(
    read_medit(Cursor::new(text), Path::new("x.mesh")),
    Err(RemeshError::Parse { line: 3, .. })
  ));
}

#[test]
fn test_read_medit_truncated() {
  let text = "Vertices\n2\n0 0 0 0\n";
  assert!(matches!(
    read_medit(Cursor::new(text), Path::new("x.mesh")),
    Err(RemeshError::Parse { .. })
  ));
}

#[test]
fn test_read_medit_rejects_counts_past_end_of_file() {
  let cases = [
    ("Vertices 18446744073709551615\n0 0 0 0\n", 1),
    ("Dimension 3\nEdges 9223372036854775807\n", 2),
    ("Tetrahedra\n4611686018427387904\n1 2 3 4 0\n", 2),
    ("Triangles 2\n1 2 3 0\n", 1),
  ];
  for (text, line) in cases {
    match read_medit(Cursor::new(text), Path::new("x.mesh")) {
      Err(RemeshError::Parse { line: l, .. }) => assert_eq!(l, line, "{text:?}"),
      other => panic!("expected a parse error for {text:?}, got {other:?}"),
    }
  }
}

#[test]
fn test_format_negotiation() {
  assert_eq!(MeshFormat::from_path(Path::new("a/b.OBJ")).unwrap(), MeshFormat::Obj);
  assert_eq!(MeshFormat::from_path(Path::new("b.mesh")).unwrap(), MeshFormat::Medit);
  assert!(matches!(
    MeshFormat::from_path(Path::new("b.stl")),
    Err(RemeshError::Config(_))
  ));
  assert!(MeshFormat::from_path(Path::new("noext")).is_err());
}

#[test]
fn test_from_buffers_validation() {
  let ok = MeshBuffers::new(vec![vec![0, 1, 2]], vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
  assert!(RawMesh::from_buffers(&ok).is_ok());

  let out_of_range = MeshBuffers::new(vec![vec![0, 1, 3]], ok.verts.clone());
  assert!(matches!(RawMesh::from_buffers(&out_of_range), Err(RemeshError::Resource(_))));

  let short_face = MeshBuffers::new(vec![vec![0, 1]], ok.verts.clone());
  assert!(matches!(RawMesh::from_buffers(&short_face), Err(RemeshError::Resource(_))));

  let empty = MeshBuffers::default();
  assert!(matches!(RawMesh::from_buffers(&empty), Err(RemeshError::Resource(_))));

  let nan = MeshBuffers::new(vec![vec![0, 1, 2]], vec![[f32::NAN, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
  assert!(matches!(RawMesh::from_buffers(&nan), Err(RemeshError::Resource(_))));
}

#[test]
fn test_write_obj_then_read_back() {
  let buffers = MeshBuffers::new(
    vec![vec![0, 1, 2, 3]],
    vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
  );
  let mut bytes = Vec::new();
  write_obj(&mut bytes, &buffers).unwrap();

  let raw = read_obj(Cursor::new(bytes), path()).unwrap();
  assert_eq!(raw.polygons, buffers.faces);
  assert_eq!(raw.positions[2], DVec3::new(1.0, 1.0, 0.0));
}

#[test]
fn test_write_mesh_rejects_non_obj_target() {
  let buffers = MeshBuffers::new(vec![vec![0, 1, 2]], vec![[0.0; 3]; 3]);
  let target = std::env::temp_dir().join("field_remesh_reject.mesh");
  assert!(matches!(write_mesh(&target, &buffers), Err(RemeshError::Config(_))));
  assert!(!target.exists());
}

#[test]
fn test_write_mesh_file() {
  let buffers = MeshBuffers::new(vec![vec![0, 1, 2]], vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
  let dir = std::env::temp_dir().join(format!("field_remesh_io_{}", std::process::id()));
  std::fs::create_dir_all(&dir).unwrap();
  let target = dir.join("tri.obj");

  write_mesh(&target, &buffers).unwrap();
  let raw = read_mesh(&target).unwrap();

  assert_eq!(raw.polygons, vec![vec![0, 1, 2]]);
  assert!(!dir.join(".tri.obj.partial").exists());
  std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_read_missing_file_is_resource_error() {
  let missing = std::env::temp_dir().join("field_remesh_does_not_exist.obj");
  assert!(matches!(read_mesh(&missing), Err(RemeshError::Resource(_))));
}
