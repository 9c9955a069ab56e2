//! Multi-resolution hierarchy the field solver runs on.
//!
//! Level 0 is the (subdivided) mesh graph. Each coarser level clusters the
//! nodes of the previous one on a uniform grid whose cell size doubles per
//! level. Coarse nodes keep the mean position and the normalised summed
//! normal of their children; adjacency is inherited from fine edges that
//! cross cluster boundaries.

use std::collections::HashMap;

use glam::DVec3;
use tracing::debug;

use super::geometry::{Neighbors, SurfaceMesh};
use crate::error::{RemeshError, RemeshResult};

/// One resolution level, with the fields solved on it.
#[derive(Clone, Debug, Default)]
pub struct Level {
  pub positions: Vec<DVec3>,
  pub normals: Vec<DVec3>,
  pub adjacency: Vec<Neighbors>,
  /// Boundary tangent for nodes on an open boundary.
  pub boundary: Vec<Option<DVec3>>,
  /// Node index in the next coarser level. Empty on the coarsest level.
  pub parent: Vec<usize>,
  /// Orientation field: one unit tangent per node.
  pub orientation: Vec<DVec3>,
  /// Position field: one lattice origin per node.
  pub origin: Vec<DVec3>,
}

impl Level {
  fn from_surface(surface: &SurfaceMesh) -> Self {
    let n = surface.vertex_count();
    Self {
      positions: surface.positions.clone(),
      normals: surface.vertex_normals(),
      adjacency: surface.adjacency(),
      boundary: surface.boundary_tangents(),
      parent: Vec::new(),
      orientation: vec![DVec3::ZERO; n],
      origin: surface.positions.clone(),
    }
  }

  pub fn len(&self) -> usize {
    self.positions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  /// Cluster this level's nodes into cells of size `cell`.
  ///
  /// Returns the coarse level and fills `self.parent`.
  fn coarsen(&mut self, cell: f64) -> Level {
    let mut cluster_of: HashMap<(i64, i64, i64), usize> = HashMap::new();
    let mut parent = Vec::with_capacity(self.len());
    let mut counts: Vec<usize> = Vec::new();
    let mut positions: Vec<DVec3> = Vec::new();
    let mut normals: Vec<DVec3> = Vec::new();
    let mut boundary: Vec<Option<DVec3>> = Vec::new();

    for (i, p) in self.positions.iter().enumerate() {
      let c = (*p / cell).floor();
      let key = (c.x as i64, c.y as i64, c.z as i64);
      let id = *cluster_of.entry(key).or_insert_with(|| {
        counts.push(0);
        positions.push(DVec3::ZERO);
        normals.push(DVec3::ZERO);
        boundary.push(None);
        counts.len() - 1
      });
      counts[id] += 1;
      positions[id] += *p;
      normals[id] += self.normals[i];
      if boundary[id].is_none() {
        boundary[id] = self.boundary[i];
      }
      parent.push(id);
    }

    for (p, &count) in positions.iter_mut().zip(&counts) {
      *p /= count as f64;
    }
    for n in &mut normals {
      *n = n.try_normalize().unwrap_or(DVec3::Z);
    }

    let mut adjacency: Vec<Neighbors> = vec![Neighbors::new(); counts.len()];
    for (i, neighbors) in self.adjacency.iter().enumerate() {
      for &j in neighbors {
        let (a, b) = (parent[i], parent[j]);
        if a != b {
          adjacency[a].push(b);
        }
      }
    }
    for list in &mut adjacency {
      list.sort_unstable();
      list.dedup();
    }

    self.parent = parent;
    let n = counts.len();
    Level {
      origin: positions.clone(),
      positions,
      normals,
      adjacency,
      boundary,
      parent: Vec::new(),
      orientation: vec![DVec3::ZERO; n],
    }
  }
}

/// Levels from finest (index 0) to coarsest. Never empty.
#[derive(Clone, Debug)]
pub struct Hierarchy {
  pub levels: Vec<Level>,
  pub scale: f64,
}

impl Hierarchy {
  /// Build the hierarchy over `surface` for the given target edge length.
  pub fn build(
    surface: &SurfaceMesh,
    scale: f64,
    max_levels: usize,
    coarsest_size: usize,
  ) -> RemeshResult<Self> {
    if surface.positions.is_empty() || surface.triangles.is_empty() {
      return Err(RemeshError::resource("cannot build a hierarchy over an empty surface"));
    }

    let mut levels = vec![Level::from_surface(surface)];
    while levels.len() < max_levels {
      let cell = scale * f64::powi(2.0, levels.len() as i32);
      let Some(finer) = levels.last_mut() else {
        break;
      };
      if finer.len() <= coarsest_size {
        break;
      }
      let coarse = finer.coarsen(cell);
      if coarse.len() >= finer.len() {
        // No reduction at this cell size; undo the parent links.
        finer.parent.clear();
        break;
      }
      debug!(level = levels.len(), nodes = coarse.len(), "hierarchy level built");
      levels.push(coarse);
    }

    Ok(Self { levels, scale })
  }

  pub fn finest(&self) -> &Level {
    &self.levels[0]
  }

  pub fn finest_mut(&mut self) -> &mut Level {
    &mut self.levels[0]
  }

  pub fn level_count(&self) -> usize {
    self.levels.len()
  }
}

#[cfg(test)]
#[path = "hierarchy_test.rs"]
mod hierarchy_test;
