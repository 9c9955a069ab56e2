//! Core data types shared by the orchestrator and mesh resources.

/// Polygonal faces as index tuples (each with at least three corners).
pub type Faces = Vec<Vec<usize>>;

/// Vertex coordinates as `f32` triples.
pub type Verts = Vec<[f32; 3]>;

/// An in-memory mesh: ordered faces plus ordered vertex positions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshBuffers {
  pub faces: Faces,
  pub verts: Verts,
}

impl MeshBuffers {
  pub fn new(faces: Faces, verts: Verts) -> Self {
    Self { faces, verts }
  }

  /// True when there is nothing to remesh.
  pub fn is_empty(&self) -> bool {
    self.faces.is_empty() || self.verts.is_empty()
  }

  pub fn face_count(&self) -> usize {
    self.faces.len()
  }

  pub fn vertex_count(&self) -> usize {
    self.verts.len()
  }

  /// Check every face has at least three corners and every index is in range.
  pub fn indices_valid(&self) -> bool {
    let n = self.verts.len();
    self
      .faces
      .iter()
      .all(|face| face.len() >= 3 && face.iter().all(|&i| i < n))
  }
}

/// Topology kind of the loaded mesh, decides the extraction path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Topology {
  /// Polygon/triangle surface mesh.
  #[default]
  Surface,
  /// Tetrahedral volume mesh.
  Volumetric,
}

/// Edge label assigned by the labeling stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeLabel {
  /// Edge running along the orientation field.
  Course,
  /// Edge running across the orientation field.
  Wale,
}

impl EdgeLabel {
  pub fn swapped(self) -> Self {
    match self {
      EdgeLabel::Course => EdgeLabel::Wale,
      EdgeLabel::Wale => EdgeLabel::Course,
    }
  }
}
