//! Lattice extraction and the extraction-flag passes.
//!
//! Extraction clusters mesh vertices whose lattice points coincide, turns
//! every triangle spanning three clusters into an output triangle, then runs
//! the passes selected by `ExtractionFlags`.

use std::collections::{HashMap, HashSet};

use glam::DVec3;
use smallvec::SmallVec;
use tracing::debug;

use super::geometry::edge_key;
use super::hierarchy::Level;
use crate::constants::{CLUSTER_RATIO, DIAGONAL_RATIO};
use crate::error::{RemeshError, RemeshResult};
use crate::extraction::ExtractionFlags;

/// Disjoint-set forest with union by rank and path halving.
#[derive(Clone, Debug)]
pub(crate) struct UnionFind {
  parent: Vec<usize>,
  rank: Vec<u8>,
}

impl UnionFind {
  pub fn new(n: usize) -> Self {
    Self {
      parent: (0..n).collect(),
      rank: vec![0; n],
    }
  }

  pub fn find(&mut self, mut x: usize) -> usize {
    while self.parent[x] != x {
      self.parent[x] = self.parent[self.parent[x]];
      x = self.parent[x];
    }
    x
  }

  pub fn union(&mut self, a: usize, b: usize) {
    let (ra, rb) = (self.find(a), self.find(b));
    if ra == rb {
      return;
    }
    match self.rank[ra].cmp(&self.rank[rb]) {
      std::cmp::Ordering::Less => self.parent[ra] = rb,
      std::cmp::Ordering::Greater => self.parent[rb] = ra,
      std::cmp::Ordering::Equal => {
        self.parent[rb] = ra;
        self.rank[ra] += 1;
      }
    }
  }

  /// Dense set ids in order of first appearance of each root.
  pub fn labels(&mut self) -> Vec<usize> {
    let mut ids: HashMap<usize, usize> = HashMap::new();
    (0..self.parent.len())
      .map(|i| {
        let root = self.find(i);
        let next = ids.len();
        *ids.entry(root).or_insert(next)
      })
      .collect()
  }
}

/// Output of extraction, before polygon conversion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extraction {
  pub positions: Vec<DVec3>,
  pub normals: Vec<DVec3>,
  /// Orientation field direction carried to each output vertex.
  pub directions: Vec<DVec3>,
  pub faces: Vec<Vec<usize>>,
  /// Per-face colour (connected component) label.
  pub colors: Vec<usize>,
}

impl Extraction {
  pub fn face_count(&self) -> usize {
    self.faces.len()
  }

  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  pub fn quad_count(&self) -> usize {
    self.faces.iter().filter(|f| f.len() == 4).count()
  }

  fn push_vertex_copy(&mut self, v: usize) -> usize {
    self.positions.push(self.positions[v]);
    self.normals.push(self.normals[v]);
    self.directions.push(self.directions[v]);
    self.positions.len() - 1
  }
}

// =============================================================================
// Entry points
// =============================================================================

/// Surface extraction honouring every flag.
pub fn extract_surface(
  level: &Level,
  triangles: &[[usize; 3]],
  scale: f64,
  flags: ExtractionFlags,
) -> RemeshResult<Extraction> {
  let mut extraction = lattice_triangles(level, triangles, scale);
  if flags.decompose {
    let quads = pair_quads(&mut extraction, scale);
    debug!(quads, "paired lattice triangles");
  }
  if flags.doublets {
    let removed = remove_doublets(&mut extraction);
    debug!(removed, "removed doublet vertices");
  }
  if flags.triangulate {
    triangulate_large(&mut extraction);
  }
  finish(extraction, flags)
}

/// Volumetric extraction on the boundary surface.
///
/// Quads are always paired; of the flags only `recolor` and `splitting` are
/// honoured.
pub fn extract_volume(
  level: &Level,
  triangles: &[[usize; 3]],
  scale: f64,
  flags: ExtractionFlags,
) -> RemeshResult<Extraction> {
  let mut extraction = lattice_triangles(level, triangles, scale);
  let quads = pair_quads(&mut extraction, scale);
  debug!(quads, "paired boundary lattice triangles");
  finish(
    extraction,
    ExtractionFlags {
      recolor: flags.recolor,
      splitting: flags.splitting,
      ..ExtractionFlags::default()
    },
  )
}

fn finish(mut extraction: Extraction, flags: ExtractionFlags) -> RemeshResult<Extraction> {
  if flags.splitting {
    let split = split_nonmanifold(&mut extraction);
    if split > 0 {
      debug!(split, "split non-manifold vertices");
    }
  }
  extraction.colors = if flags.recolor {
    face_components(&extraction.faces)
  } else {
    vec![0; extraction.faces.len()]
  };

  if extraction.faces.is_empty() {
    return Err(RemeshError::extraction(
      "extraction produced no faces; the scale is likely too large for this mesh",
    ));
  }
  Ok(extraction)
}

// =============================================================================
// Lattice clustering
// =============================================================================

fn lattice_triangles(level: &Level, triangles: &[[usize; 3]], scale: f64) -> Extraction {
  let n = level.len();
  let threshold = CLUSTER_RATIO * scale;

  let mut sets = UnionFind::new(n);
  let mut referenced = vec![false; n];
  for &[a, b, c] in triangles {
    for (u, v) in [(a, b), (b, c), (c, a)] {
      referenced[u] = true;
      if level.origin[u].distance(level.origin[v]) < threshold {
        sets.union(u, v);
      }
    }
  }

  let mut extraction = Extraction::default();
  let mut cluster_of = vec![usize::MAX; n];
  let mut roots: HashMap<usize, usize> = HashMap::new();
  let mut members: Vec<usize> = Vec::new();
  for i in (0..n).filter(|&i| referenced[i]) {
    let root = sets.find(i);
    let id = *roots.entry(root).or_insert_with(|| {
      extraction.positions.push(DVec3::ZERO);
      extraction.normals.push(DVec3::ZERO);
      extraction.directions.push(level.orientation[i]);
      members.push(0);
      members.len() - 1
    });
    cluster_of[i] = id;
    extraction.positions[id] += level.origin[i];
    extraction.normals[id] += level.normals[i];
    members[id] += 1;
  }
  for (p, &count) in extraction.positions.iter_mut().zip(&members) {
    *p /= count as f64;
  }
  for normal in &mut extraction.normals {
    *normal = normal.try_normalize().unwrap_or(DVec3::Z);
  }

  let mut seen: HashSet<[usize; 3]> = HashSet::new();
  for tri in triangles {
    let [a, b, c] = tri.map(|i| cluster_of[i]);
    if a == b || b == c || a == c {
      continue;
    }
    let mut key = [a, b, c];
    key.sort_unstable();
    if seen.insert(key) {
      extraction.faces.push(vec![a, b, c]);
    }
  }
  extraction.colors = vec![0; extraction.faces.len()];
  debug!(
    vertices = extraction.vertex_count(),
    triangles = extraction.face_count(),
    "lattice extraction"
  );
  extraction
}

// =============================================================================
// Flag passes
// =============================================================================

fn longest_edge(positions: &[DVec3], face: &[usize]) -> (usize, f64) {
  let mut best = (0, f64::NEG_INFINITY);
  for k in 0..face.len() {
    let length = positions[face[k]].distance(positions[face[(k + 1) % face.len()]]);
    if length > best.1 {
      best = (k, length);
    }
  }
  best
}

/// Merge triangle pairs across their shared lattice diagonal into quads.
/// Returns the number of quads emitted.
fn pair_quads(extraction: &mut Extraction, scale: f64) -> usize {
  let min_diagonal = DIAGONAL_RATIO * scale;
  let faces = &extraction.faces;
  let positions = &extraction.positions;

  let diagonal: Vec<Option<(usize, usize)>> = faces
    .iter()
    .map(|face| {
      if face.len() != 3 {
        return None;
      }
      let (k, length) = longest_edge(positions, face);
      (length > min_diagonal).then(|| (face[k], face[(k + 1) % 3]))
    })
    .collect();

  let mut by_diagonal: HashMap<(usize, usize), SmallVec<[usize; 2]>> = HashMap::new();
  for (f, d) in diagonal.iter().enumerate() {
    if let Some((u, v)) = d {
      by_diagonal.entry(edge_key(*u, *v)).or_default().push(f);
    }
  }

  let mut paired = vec![false; faces.len()];
  let mut quad_at: Vec<Option<Vec<usize>>> = vec![None; faces.len()];
  let mut quad_keys: HashSet<[usize; 4]> = HashSet::new();
  let mut quad_vertices: HashMap<usize, Vec<[usize; 4]>> = HashMap::new();

  for f in 0..faces.len() {
    let Some((u, v)) = diagonal[f] else {
      continue;
    };
    if paired[f] {
      continue;
    }
    let Some(&g) = by_diagonal
      .get(&edge_key(u, v))
      .and_then(|list| list.iter().find(|&&g| g != f && !paired[g]))
    else {
      continue;
    };
    let w = faces[f].iter().copied().find(|&x| x != u && x != v);
    let z = faces[g].iter().copied().find(|&x| x != u && x != v);
    let (Some(w), Some(z)) = (w, z) else {
      continue;
    };
    if w == z {
      continue;
    }

    paired[f] = true;
    paired[g] = true;
    let quad = [u, z, v, w];
    let mut key = quad;
    key.sort_unstable();
    if quad_keys.insert(key) {
      for corner in key {
        quad_vertices.entry(corner).or_default().push(key);
      }
      quad_at[f] = Some(quad.to_vec());
    }
  }

  let covered = |face: &[usize]| {
    face.len() == 3
      && quad_vertices
        .get(&face[0])
        .is_some_and(|quads| quads.iter().any(|q| face.iter().all(|c| q.contains(c))))
  };

  let mut result = Vec::with_capacity(faces.len());
  for (f, face) in faces.iter().enumerate() {
    if let Some(quad) = quad_at[f].take() {
      result.push(quad);
    } else if !paired[f] && !covered(face) {
      result.push(face.clone());
    }
  }

  let quads = quad_keys.len();
  extraction.faces = result;
  extraction.colors = vec![0; extraction.faces.len()];
  quads
}

/// Merge the two faces around every interior valence-2 vertex.
fn remove_doublets(extraction: &mut Extraction) -> usize {
  let mut removed = 0;
  loop {
    let faces = &mut extraction.faces;
    let mut vertex_faces: Vec<SmallVec<[usize; 4]>> =
      vec![SmallVec::new(); extraction.positions.len()];
    for (f, face) in faces.iter().enumerate() {
      for &v in face {
        vertex_faces[v].push(f);
      }
    }

    let mut alive = vec![true; faces.len()];
    let mut touched = vec![false; faces.len()];
    let mut changed = false;

    for (v, incident) in vertex_faces.iter().enumerate() {
      let &[f1, f2] = incident.as_slice() else {
        continue;
      };
      if f1 == f2 || touched[f1] || touched[f2] {
        continue;
      }
      let Some(merged) = merge_around(&faces[f1], &faces[f2], v) else {
        continue;
      };
      faces[f1] = merged;
      alive[f2] = false;
      touched[f1] = true;
      touched[f2] = true;
      removed += 1;
      changed = true;
    }

    if !changed {
      break;
    }
    let mut keep = alive.iter();
    faces.retain(|_| keep.next().copied().unwrap_or(true));
  }
  extraction.colors = vec![0; extraction.faces.len()];
  removed
}

/// Join `f1` and `f2` across the two edges they share at `v`, dropping `v`.
fn merge_around(f1: &[usize], f2: &[usize], v: usize) -> Option<Vec<usize>> {
  let rotated = |face: &[usize]| -> Option<Vec<usize>> {
    let k = face.iter().position(|&x| x == v)?;
    Some(face[k..].iter().chain(&face[..k]).copied().collect())
  };
  let (r1, r2) = (rotated(f1)?, rotated(f2)?);
  let (b, a) = (r1[1], *r1.last()?);
  if a == b || r2[1] != a || *r2.last()? != b {
    return None;
  }

  let merged: Vec<usize> = r1[1..]
    .iter()
    .chain(&r2[2..r2.len() - 1])
    .copied()
    .collect();
  let mut distinct = merged.clone();
  distinct.sort_unstable();
  distinct.dedup();
  (merged.len() >= 3 && distinct.len() == merged.len()).then_some(merged)
}

/// Fan-triangulate polygons with more than four corners.
fn triangulate_large(extraction: &mut Extraction) {
  let mut result = Vec::with_capacity(extraction.faces.len());
  for face in extraction.faces.drain(..) {
    if face.len() > 4 {
      for k in 1..face.len() - 1 {
        result.push(vec![face[0], face[k], face[k + 1]]);
      }
    } else {
      result.push(face);
    }
  }
  extraction.faces = result;
  extraction.colors = vec![0; extraction.faces.len()];
}

/// Give every edge-connected fan of faces around a vertex its own copy of
/// that vertex. Returns the number of vertices added.
fn split_nonmanifold(extraction: &mut Extraction) -> usize {
  let mut corners: Vec<SmallVec<[(usize, usize); 6]>> =
    vec![SmallVec::new(); extraction.positions.len()];
  for (f, face) in extraction.faces.iter().enumerate() {
    for (k, &v) in face.iter().enumerate() {
      corners[v].push((f, k));
    }
  }

  let mut added = 0;
  for list in corners {
    if list.len() < 2 {
      continue;
    }
    let neighbors: Vec<[usize; 2]> = list
      .iter()
      .map(|&(f, k)| {
        let face = &extraction.faces[f];
        let len = face.len();
        [face[(k + len - 1) % len], face[(k + 1) % len]]
      })
      .collect();

    let mut fans = UnionFind::new(list.len());
    for i in 0..list.len() {
      for j in i + 1..list.len() {
        if neighbors[i].iter().any(|w| neighbors[j].contains(w)) {
          fans.union(i, j);
        }
      }
    }
    let labels = fans.labels();
    let fan_count = labels.iter().copied().max().map_or(0, |m| m + 1);
    if fan_count < 2 {
      continue;
    }

    let (f0, k0) = list[0];
    let original = extraction.faces[f0][k0];
    let copies: Vec<usize> = (1..fan_count)
      .map(|_| extraction.push_vertex_copy(original))
      .collect();
    for (&(f, k), &label) in list.iter().zip(&labels) {
      if label > 0 {
        extraction.faces[f][k] = copies[label - 1];
      }
    }
    added += fan_count - 1;
  }
  added
}

/// Connected components of faces sharing an edge, labelled in face order.
pub(crate) fn face_components(faces: &[Vec<usize>]) -> Vec<usize> {
  let mut sets = UnionFind::new(faces.len());
  let mut first_face: HashMap<(usize, usize), usize> = HashMap::new();
  for (f, face) in faces.iter().enumerate() {
    for k in 0..face.len() {
      let key = edge_key(face[k], face[(k + 1) % face.len()]);
      match first_face.get(&key) {
        Some(&g) => sets.union(f, g),
        None => {
          first_face.insert(key, f);
        }
      }
    }
  }
  sets.labels()
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod extract_test;
