//! Triangle surface the fields are solved on.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use glam::DVec3;
use smallvec::SmallVec;

use crate::error::{RemeshError, RemeshResult};

/// Undirected edge key with the smaller index first.
#[inline]
pub(crate) fn edge_key(a: usize, b: usize) -> (usize, usize) {
  if a < b {
    (a, b)
  } else {
    (b, a)
  }
}

/// Neighbour list, inline for typical valences.
pub type Neighbors = SmallVec<[usize; 8]>;

/// Indexed triangle mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurfaceMesh {
  pub positions: Vec<DVec3>,
  pub triangles: Vec<[usize; 3]>,
}

impl SurfaceMesh {
  /// Fan-triangulate polygons, dropping triangles with repeated corners.
  pub fn from_polygons(positions: Vec<DVec3>, polygons: &[Vec<usize>]) -> Self {
    let mut triangles = Vec::with_capacity(polygons.len() * 2);
    for poly in polygons {
      for k in 1..poly.len().saturating_sub(1) {
        let tri = [poly[0], poly[k], poly[k + 1]];
        if tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2] {
          triangles.push(tri);
        }
      }
    }
    Self {
      positions,
      triangles,
    }
  }

  /// Boundary surface of a tetrahedral mesh: faces used by exactly one tet.
  pub fn tet_boundary(positions: Vec<DVec3>, tets: &[[usize; 4]]) -> Self {
    let mut counts: HashMap<[usize; 3], (usize, [usize; 3])> = HashMap::new();
    let mut order: Vec<[usize; 3]> = Vec::new();

    for &[a, b, c, d] in tets {
      for face in [[b, c, d], [a, d, c], [a, b, d], [a, c, b]] {
        let mut key = face;
        key.sort_unstable();
        let entry = counts.entry(key).or_insert_with(|| {
          order.push(key);
          (0, face)
        });
        entry.0 += 1;
      }
    }

    let triangles = order
      .iter()
      .filter_map(|key| counts.get(key))
      .filter(|(count, _)| *count == 1)
      .map(|(_, face)| *face)
      .collect();

    Self {
      positions,
      triangles,
    }
  }

  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  pub fn triangle_area(&self, tri: &[usize; 3]) -> f64 {
    let [a, b, c] = tri.map(|i| self.positions[i]);
    0.5 * (b - a).cross(c - a).length()
  }

  pub fn surface_area(&self) -> f64 {
    self.triangles.iter().map(|t| self.triangle_area(t)).sum()
  }

  /// Area-weighted vertex normals. Isolated or degenerate vertices get +Z.
  pub fn vertex_normals(&self) -> Vec<DVec3> {
    let mut normals = vec![DVec3::ZERO; self.positions.len()];
    for &[a, b, c] in &self.triangles {
      let n = (self.positions[b] - self.positions[a]).cross(self.positions[c] - self.positions[a]);
      normals[a] += n;
      normals[b] += n;
      normals[c] += n;
    }
    normals
      .into_iter()
      .map(|n| n.try_normalize().unwrap_or(DVec3::Z))
      .collect()
  }

  /// Sorted, de-duplicated vertex neighbours.
  pub fn adjacency(&self) -> Vec<Neighbors> {
    let mut adjacency: Vec<Neighbors> = vec![Neighbors::new(); self.positions.len()];
    for &[a, b, c] in &self.triangles {
      for (u, v) in [(a, b), (b, c), (c, a)] {
        adjacency[u].push(v);
        adjacency[v].push(u);
      }
    }
    for list in &mut adjacency {
      list.sort_unstable();
      list.dedup();
    }
    adjacency
  }

  /// Unit tangent along the boundary at boundary vertices, `None` elsewhere.
  pub fn boundary_tangents(&self) -> Vec<Option<DVec3>> {
    let mut uses: HashMap<(usize, usize), usize> = HashMap::new();
    for &[a, b, c] in &self.triangles {
      for (u, v) in [(a, b), (b, c), (c, a)] {
        *uses.entry(edge_key(u, v)).or_default() += 1;
      }
    }

    // Accumulate in triangle order so the sums are reproducible.
    let mut tangents = vec![DVec3::ZERO; self.positions.len()];
    let mut on_boundary = vec![false; self.positions.len()];
    for &[a, b, c] in &self.triangles {
      for (u, v) in [(a, b), (b, c), (c, a)] {
        if uses.get(&edge_key(u, v)) == Some(&1) {
          let dir = (self.positions[v] - self.positions[u]).normalize_or_zero();
          tangents[u] += dir;
          tangents[v] += dir;
          on_boundary[u] = true;
          on_boundary[v] = true;
        }
      }
    }

    tangents
      .into_iter()
      .zip(on_boundary)
      .map(|(t, boundary)| if boundary { t.try_normalize() } else { None })
      .collect()
  }

  pub fn max_edge_length(&self) -> f64 {
    self
      .triangles
      .iter()
      .flat_map(|&[a, b, c]| [(a, b), (b, c), (c, a)])
      .map(|(u, v)| self.positions[u].distance(self.positions[v]))
      .fold(0.0, f64::max)
  }

  /// Split edges longer than `max_edge` at their midpoints, longest first,
  /// keeping the mesh conforming.
  pub fn subdivide(&mut self, max_edge: f64, max_vertices: usize) -> RemeshResult<()> {
    if !(max_edge > 0.0) {
      return Err(RemeshError::resource(format!("invalid subdivision length {max_edge}")));
    }

    let mut edge_faces: HashMap<(usize, usize), SmallVec<[usize; 2]>> = HashMap::new();
    for (f, &[a, b, c]) in self.triangles.iter().enumerate() {
      for (u, v) in [(a, b), (b, c), (c, a)] {
        edge_faces.entry(edge_key(u, v)).or_default().push(f);
      }
    }

    let mut queue: BinaryHeap<QueuedEdge> = edge_faces
      .keys()
      .filter_map(|&(u, v)| self.queued(u, v, max_edge))
      .collect();

    while let Some(QueuedEdge { a, b, .. }) = queue.pop() {
      let Some(faces) = edge_faces.remove(&(a, b)) else {
        continue;
      };
      if self.positions.len() >= max_vertices {
        return Err(RemeshError::resource(format!(
          "subdivision exceeded {max_vertices} vertices; scale is too small for this mesh"
        )));
      }

      let m = self.positions.len();
      self.positions.push((self.positions[a] + self.positions[b]) * 0.5);

      for f in faces {
        let tri = self.triangles[f];
        let Some(i) = (0..3).find(|&i| edge_key(tri[i], tri[(i + 1) % 3]) == (a, b)) else {
          continue;
        };
        let (u, v, c) = (tri[i], tri[(i + 1) % 3], tri[(i + 2) % 3]);
        let g = self.triangles.len();
        self.triangles[f] = [u, m, c];
        self.triangles.push([m, v, c]);

        if let Some(list) = edge_faces.get_mut(&edge_key(v, c)) {
          for face in list.iter_mut() {
            if *face == f {
              *face = g;
            }
          }
        }
        edge_faces.entry(edge_key(u, m)).or_default().push(f);
        edge_faces.entry(edge_key(m, v)).or_default().push(g);
        let mc = edge_faces.entry(edge_key(m, c)).or_default();
        mc.push(f);
        mc.push(g);

        for (p, q) in [(u, m), (m, v), (m, c)] {
          if let Some(edge) = self.queued(p, q, max_edge) {
            queue.push(edge);
          }
        }
      }
    }

    Ok(())
  }

  fn queued(&self, u: usize, v: usize, max_edge: f64) -> Option<QueuedEdge> {
    let length = self.positions[u].distance(self.positions[v]);
    if length > max_edge {
      let (a, b) = edge_key(u, v);
      Some(QueuedEdge { length, a, b })
    } else {
      None
    }
  }
}

/// Heap entry ordered by length, ties broken by indices for determinism.
#[derive(Clone, Copy, Debug)]
struct QueuedEdge {
  length: f64,
  a: usize,
  b: usize,
}

impl PartialEq for QueuedEdge {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for QueuedEdge {}

impl PartialOrd for QueuedEdge {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for QueuedEdge {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .length
      .total_cmp(&other.length)
      .then_with(|| other.a.cmp(&self.a))
      .then_with(|| other.b.cmp(&self.b))
  }
}
