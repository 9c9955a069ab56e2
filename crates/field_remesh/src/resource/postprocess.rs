//! Polygon mesh post-processing: orientation, edge labels, alignment and
//! stitching.

use std::collections::{HashMap, HashSet, VecDeque};
use std::f64::consts::FRAC_1_SQRT_2;

use glam::DVec3;
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::extract::Extraction;
use super::geometry::edge_key;
use crate::types::{EdgeLabel, MeshBuffers};

/// Output polygon mesh with per-vertex field directions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolyMesh {
  pub positions: Vec<DVec3>,
  pub directions: Vec<DVec3>,
  pub faces: Vec<Vec<usize>>,
  pub colors: Vec<usize>,
  /// One label per face edge (`face[k] -> face[k + 1]`); empty until labelled.
  pub labels: Vec<Vec<EdgeLabel>>,
  flip: bool,
}

/// Outcome of `PolyMesh::stitch`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StitchSummary {
  pub welded_vertices: usize,
  pub degenerate_faces: usize,
  pub duplicate_faces: usize,
  pub unreferenced_vertices: usize,
}

impl PolyMesh {
  /// Materialise an extraction result, dropping unreferenced vertices.
  pub fn from_extraction(extraction: &Extraction) -> Self {
    let mut mesh = Self {
      positions: extraction.positions.clone(),
      directions: extraction.directions.clone(),
      faces: extraction.faces.clone(),
      colors: extraction.colors.clone(),
      labels: Vec::new(),
      flip: false,
    };
    mesh.compact();
    mesh
  }

  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  pub fn face_count(&self) -> usize {
    self.faces.len()
  }

  pub fn is_labeled(&self) -> bool {
    !self.faces.is_empty() && self.labels.len() == self.faces.len()
  }

  // ===========================================================================
  // Labeling
  // ===========================================================================

  /// Orient faces consistently and outward, reversed when `flip`, then label
  /// every edge.
  pub fn label(&mut self, flip: bool) {
    let reversed = self.orient_faces(flip);
    self.flip = flip;
    self.relabel();
    debug!(reversed, flip, "labelled mesh");
  }

  /// Breadth-first winding propagation per connected component, then make
  /// each component's signed volume positive. Returns the faces reversed.
  fn orient_faces(&mut self, flip: bool) -> usize {
    let mut edge_faces: HashMap<(usize, usize), SmallVec<[usize; 2]>> = HashMap::new();
    for (f, face) in self.faces.iter().enumerate() {
      for (a, b) in face_edges(face) {
        edge_faces.entry(edge_key(a, b)).or_default().push(f);
      }
    }

    let mut reversed = vec![false; self.faces.len()];
    let mut visited = vec![false; self.faces.len()];
    let mut queue = VecDeque::new();

    for seed in 0..self.faces.len() {
      if visited[seed] {
        continue;
      }
      visited[seed] = true;
      queue.push_back(seed);
      let mut component = Vec::new();

      while let Some(f) = queue.pop_front() {
        component.push(f);
        let edges: SmallVec<[(usize, usize); 8]> = face_edges(&self.faces[f]).collect();
        for (a, b) in edges {
          let Some(neighbors) = edge_faces.get(&edge_key(a, b)) else {
            continue;
          };
          for &g in neighbors {
            if visited[g] {
              continue;
            }
            visited[g] = true;
            if has_directed_edge(&self.faces[g], a, b) {
              self.faces[g].reverse();
              reversed[g] = !reversed[g];
            }
            queue.push_back(g);
          }
        }
      }

      if self.signed_volume(&component) < 0.0 {
        for &f in &component {
          self.faces[f].reverse();
          reversed[f] = !reversed[f];
        }
      }
    }

    if flip {
      for (face, r) in self.faces.iter_mut().zip(reversed.iter_mut()) {
        face.reverse();
        *r = !*r;
      }
    }
    reversed.into_iter().filter(|&r| r).count()
  }

  fn signed_volume(&self, faces: &[usize]) -> f64 {
    faces
      .iter()
      .map(|&f| {
        let face = &self.faces[f];
        let p0 = self.positions[face[0]];
        (1..face.len() - 1)
          .map(|k| p0.dot(self.positions[face[k]].cross(self.positions[face[k + 1]])))
          .sum::<f64>()
      })
      .sum::<f64>()
      / 6.0
  }

  fn edge_label(&self, a: usize, b: usize) -> EdgeLabel {
    let edge = (self.positions[b] - self.positions[a]).normalize_or_zero();
    let label = if edge.dot(self.directions[a]).abs() >= FRAC_1_SQRT_2 {
      EdgeLabel::Course
    } else {
      EdgeLabel::Wale
    };
    if self.flip {
      label.swapped()
    } else {
      label
    }
  }

  fn relabel(&mut self) {
    self.labels = self
      .faces
      .iter()
      .map(|face| face_edges(face).map(|(a, b)| self.edge_label(a, b)).collect())
      .collect();
  }

  // ===========================================================================
  // Alignment
  // ===========================================================================

  /// Rotate each face so its first edge is a `Course` edge where it has one.
  /// Returns the number of faces rotated.
  pub fn align(&mut self) -> usize {
    let mut rotated = 0;
    for (face, labels) in self.faces.iter_mut().zip(self.labels.iter_mut()) {
      match labels.iter().position(|&l| l == EdgeLabel::Course) {
        Some(k) if k > 0 => {
          face.rotate_left(k);
          labels.rotate_left(k);
          rotated += 1;
        }
        _ => {}
      }
    }
    rotated
  }

  // ===========================================================================
  // Stitching
  // ===========================================================================

  /// Weld vertices within `tolerance`, drop degenerate and duplicate faces,
  /// then drop unreferenced vertices.
  pub fn stitch(&mut self, tolerance: f64) -> StitchSummary {
    let mut summary = StitchSummary::default();
    let remap = weld_map(&self.positions, tolerance);
    summary.welded_vertices = remap.iter().enumerate().filter(|&(i, &r)| i != r).count();

    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    let mut faces = Vec::with_capacity(self.faces.len());
    let mut colors = Vec::with_capacity(self.faces.len());
    for (f, face) in self.faces.iter().enumerate() {
      let mut cleaned: Vec<usize> = Vec::with_capacity(face.len());
      for &v in face {
        let v = remap[v];
        if cleaned.last() != Some(&v) {
          cleaned.push(v);
        }
      }
      while cleaned.len() > 1 && cleaned.first() == cleaned.last() {
        cleaned.pop();
      }

      let mut key = cleaned.clone();
      key.sort_unstable();
      key.dedup();
      if cleaned.len() < 3 || key.len() != cleaned.len() {
        summary.degenerate_faces += 1;
        continue;
      }
      if !seen.insert(key) {
        summary.duplicate_faces += 1;
        continue;
      }
      faces.push(cleaned);
      colors.push(self.colors.get(f).copied().unwrap_or(0));
    }

    if summary.degenerate_faces > 0 {
      warn!(dropped = summary.degenerate_faces, "dropped degenerate faces while stitching");
    }

    let labeled = self.is_labeled();
    self.faces = faces;
    self.colors = colors;
    summary.unreferenced_vertices = self.compact();
    if labeled {
      self.relabel();
    } else {
      self.labels.clear();
    }
    summary
  }

  /// Drop vertices no face references and renumber. Returns how many went.
  fn compact(&mut self) -> usize {
    let mut new_index = vec![usize::MAX; self.positions.len()];
    let mut next = 0;
    for face in &self.faces {
      for &v in face {
        if new_index[v] == usize::MAX {
          new_index[v] = next;
          next += 1;
        }
      }
    }

    let mut positions = vec![DVec3::ZERO; next];
    let mut directions = vec![DVec3::ZERO; next];
    for (old, &new) in new_index.iter().enumerate() {
      if new != usize::MAX {
        positions[new] = self.positions[old];
        directions[new] = self.directions[old];
      }
    }
    for face in &mut self.faces {
      for v in face.iter_mut() {
        *v = new_index[*v];
      }
    }

    let dropped = self.positions.len() - next;
    self.positions = positions;
    self.directions = directions;
    dropped
  }

  pub fn to_buffers(&self) -> MeshBuffers {
    MeshBuffers::new(
      self.faces.clone(),
      self
        .positions
        .iter()
        .map(|p| [p.x as f32, p.y as f32, p.z as f32])
        .collect(),
    )
  }
}

fn face_edges(face: &[usize]) -> impl Iterator<Item = (usize, usize)> + '_ {
  (0..face.len()).map(move |k| (face[k], face[(k + 1) % face.len()]))
}

fn has_directed_edge(face: &[usize], a: usize, b: usize) -> bool {
  face_edges(face).any(|e| e == (a, b))
}

/// Map each vertex to the first earlier vertex within `tolerance`, or itself.
fn weld_map(positions: &[DVec3], tolerance: f64) -> Vec<usize> {
  if !(tolerance > 0.0) {
    return (0..positions.len()).collect();
  }
  let cell_of = |p: DVec3| {
    let c = (p / tolerance).floor();
    (c.x as i64, c.y as i64, c.z as i64)
  };

  let mut grid: HashMap<(i64, i64, i64), SmallVec<[usize; 2]>> = HashMap::new();
  let mut remap = Vec::with_capacity(positions.len());
  for (i, &p) in positions.iter().enumerate() {
    let (cx, cy, cz) = cell_of(p);
    let mut target = i;
    'search: for dx in -1..=1 {
      for dy in -1..=1 {
        for dz in -1..=1 {
          let Some(candidates) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
            continue;
          };
          if let Some(&j) = candidates.iter().find(|&&j| positions[j].distance(p) <= tolerance) {
            target = j;
            break 'search;
          }
        }
      }
    }
    if target == i {
      grid.entry((cx, cy, cz)).or_default().push(i);
    }
    remap.push(target);
  }
  remap
}

#[cfg(test)]
#[path = "postprocess_test.rs"]
mod postprocess_test;
