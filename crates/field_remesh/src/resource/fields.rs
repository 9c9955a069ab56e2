//! Orientation (2- or 4-RoSy) and position (lattice) field solver.
//!
//! Both fields are smoothed with Jacobi sweeps: every node's new value is
//! computed from the previous sweep only, so results do not depend on the
//! number of worker threads.

use glam::{DQuat, DVec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::hierarchy::{Hierarchy, Level};
use crate::config::RosySymmetry;
use crate::optimizer::OptimizerOptions;

// =============================================================================
// Frame helpers
// =============================================================================

/// Project `v` into the tangent plane of `n` and normalise.
#[inline]
pub(crate) fn project_tangent(v: DVec3, n: DVec3) -> Option<DVec3> {
  (v - n * n.dot(v)).try_normalize()
}

/// Representative of `q_j` (a RoSy direction at a node with normal `n_j`)
/// closest to `q_i`, and the number of `1 / fold` turns taken to reach it.
///
/// A 2-RoSy direction only matches its negation, a 4-RoSy direction also
/// matches its quarter turns.
///
/// Non-extrinsic comparison first rotates the neighbour frame into the
/// tangent plane of `n_i`.
pub(crate) fn compat_orientation(
  q_i: DVec3,
  n_i: DVec3,
  q_j: DVec3,
  n_j: DVec3,
  extrinsic: bool,
  symmetry: RosySymmetry,
) -> (DVec3, i32) {
  let (q_j, n_j) = if extrinsic {
    (q_j, n_j)
  } else {
    (DQuat::from_rotation_arc(n_j, n_i) * q_j, n_i)
  };
  let turned = n_j.cross(q_j);
  let four = [q_j, turned, -q_j, -turned];
  let two = [q_j, -q_j];
  let candidates: &[DVec3] = match symmetry {
    RosySymmetry::Two => &two,
    RosySymmetry::Four => &four,
  };

  let mut best = 0;
  let mut best_dot = f64::NEG_INFINITY;
  for (k, c) in candidates.iter().enumerate() {
    let dot = q_i.dot(*c);
    if dot > best_dot {
      best_dot = dot;
      best = k;
    }
  }
  (candidates[best], best as i32)
}

/// Lattice point of the lattice (`origin`, axes `q`, `t`, spacing `scale`)
/// nearest to `p`.
#[inline]
pub(crate) fn lattice_round(origin: DVec3, q: DVec3, t: DVec3, p: DVec3, scale: f64) -> DVec3 {
  let d = p - origin;
  origin + q * ((q.dot(d) / scale).round() * scale) + t * ((t.dot(d) / scale).round() * scale)
}

#[inline]
fn cross_axis(level: &Level, i: usize) -> DVec3 {
  level.normals[i].cross(level.orientation[i])
}

/// World axis least aligned with `n`.
fn least_aligned_axis(n: DVec3) -> DVec3 {
  let a = n.abs();
  if a.x <= a.y && a.x <= a.z {
    DVec3::X
  } else if a.y <= a.z {
    DVec3::Y
  } else {
    DVec3::Z
  }
}

fn axis_direction(n: DVec3) -> DVec3 {
  project_tangent(least_aligned_axis(n), n).unwrap_or(DVec3::X)
}

// =============================================================================
// Orientation field
// =============================================================================

/// Solve the orientation field over the hierarchy.
pub fn optimize_orientations(
  hierarchy: &mut Hierarchy,
  options: &OptimizerOptions,
  symmetry: RosySymmetry,
  iterations: usize,
  seed: u64,
) {
  let count = hierarchy.level_count();
  let (start, sweeps) = if options.hierarchy {
    (count - 1, iterations)
  } else {
    (0, iterations * count)
  };

  init_orientations(&mut hierarchy.levels[start], options.randomization, seed);
  for l in (0..=start).rev() {
    if l < start {
      let (fine, coarse) = hierarchy.levels.split_at_mut(l + 1);
      prolong_orientations(&mut fine[l], &coarse[0]);
    }
    let level = &mut hierarchy.levels[l];
    for _ in 0..sweeps {
      smooth_orientations(level, options.extrinsic, options.alignment, symmetry);
    }
    if options.alignment {
      pin_boundary(level);
    }
  }

  if !options.hierarchy {
    restrict_orientations(hierarchy);
  }
}

fn init_orientations(level: &mut Level, randomization: bool, seed: u64) {
  if randomization {
    let mut rng = StdRng::seed_from_u64(seed);
    level.orientation = level
      .normals
      .iter()
      .map(|&n| {
        let v = DVec3::new(
          rng.random_range(-1.0..1.0),
          rng.random_range(-1.0..1.0),
          rng.random_range(-1.0..1.0),
        );
        project_tangent(v, n).unwrap_or_else(|| axis_direction(n))
      })
      .collect();
  } else {
    level.orientation = level.normals.iter().map(|&n| axis_direction(n)).collect();
  }
}

fn pin_boundary(level: &mut Level) {
  for i in 0..level.len() {
    if let Some(t) = level.boundary[i] {
      if let Some(q) = project_tangent(t, level.normals[i]) {
        level.orientation[i] = q;
      }
    }
  }
}

fn smooth_orientations(level: &mut Level, extrinsic: bool, alignment: bool, symmetry: RosySymmetry) {
  let view: &Level = level;
  let updated: Vec<DVec3> = (0..view.len())
    .into_par_iter()
    .map(|i| {
      let n_i = view.normals[i];
      let q_i = view.orientation[i];
      if alignment {
        if let Some(q) = view.boundary[i].and_then(|t| project_tangent(t, n_i)) {
          return q;
        }
      }
      let mut sum = q_i;
      for &j in &view.adjacency[i] {
        let (c, _) =
          compat_orientation(q_i, n_i, view.orientation[j], view.normals[j], extrinsic, symmetry);
        sum += c;
      }
      project_tangent(sum, n_i).unwrap_or(q_i)
    })
    .collect();
  level.orientation = updated;
}

fn prolong_orientations(fine: &mut Level, coarse: &Level) {
  let view: &Level = fine;
  let updated: Vec<DVec3> = (0..view.len())
    .into_par_iter()
    .map(|i| {
      let n = view.normals[i];
      let q = coarse.orientation[view.parent[i]];
      project_tangent(q, n).unwrap_or_else(|| axis_direction(n))
    })
    .collect();
  fine.orientation = updated;
}

/// Give coarse levels an orientation from their first child, for runs that
/// solved only the finest level.
fn restrict_orientations(hierarchy: &mut Hierarchy) {
  for l in 0..hierarchy.level_count().saturating_sub(1) {
    let (fine, coarse) = hierarchy.levels.split_at_mut(l + 1);
    let (fine, coarse) = (&fine[l], &mut coarse[0]);
    let mut assigned = vec![false; coarse.len()];
    for (i, &p) in fine.parent.iter().enumerate() {
      if !assigned[p] {
        assigned[p] = true;
        let n = coarse.normals[p];
        coarse.orientation[p] =
          project_tangent(fine.orientation[i], n).unwrap_or_else(|| axis_direction(n));
      }
    }
  }
}

// =============================================================================
// Position field
// =============================================================================

/// Solve the position field over the hierarchy. Requires orientations.
pub fn optimize_positions(hierarchy: &mut Hierarchy, options: &OptimizerOptions, iterations: usize) {
  let scale = hierarchy.scale;
  let count = hierarchy.level_count();
  let (start, sweeps) = if options.hierarchy {
    (count - 1, iterations)
  } else {
    (0, iterations * count)
  };

  {
    let level = &mut hierarchy.levels[start];
    level.origin = level.positions.clone();
  }
  for l in (0..=start).rev() {
    if l < start {
      let (fine, coarse) = hierarchy.levels.split_at_mut(l + 1);
      prolong_positions(&mut fine[l], &coarse[0], scale);
    }
    let level = &mut hierarchy.levels[l];
    for _ in 0..sweeps {
      smooth_positions(level, scale);
    }
  }
}

fn smooth_positions(level: &mut Level, scale: f64) {
  let view: &Level = level;
  let updated: Vec<DVec3> = (0..view.len())
    .into_par_iter()
    .map(|i| {
      let (p_i, n_i, q_i, o_i) = (
        view.positions[i],
        view.normals[i],
        view.orientation[i],
        view.origin[i],
      );
      let t_i = cross_axis(view, i);

      let mut sum = o_i;
      let mut weight = 1.0;
      for &j in &view.adjacency[i] {
        let mid = 0.5 * (p_i + view.positions[j]);
        let a_i = lattice_round(o_i, q_i, t_i, mid, scale);
        let a_j = lattice_round(view.origin[j], view.orientation[j], cross_axis(view, j), a_i, scale);
        sum += o_i + (a_j - a_i);
        weight += 1.0;
      }
      let avg = sum / weight;
      let avg = avg - n_i * n_i.dot(avg - p_i);
      lattice_round(avg, q_i, t_i, p_i, scale)
    })
    .collect();
  level.origin = updated;
}

fn prolong_positions(fine: &mut Level, coarse: &Level, scale: f64) {
  let view: &Level = fine;
  let updated: Vec<DVec3> = (0..view.len())
    .into_par_iter()
    .map(|i| {
      let (p, n) = (view.positions[i], view.normals[i]);
      let o = coarse.origin[view.parent[i]];
      let o = o - n * n.dot(o - p);
      lattice_round(o, view.orientation[i], cross_axis(view, i), p, scale)
    })
    .collect();
  fine.origin = updated;
}

// =============================================================================
// Singularities
// =============================================================================

/// Triangles around which the orientation field turns by a non-zero number
/// of `1 / fold` turns (mod fold).
pub fn orientation_singularities(
  level: &Level,
  triangles: &[[usize; 3]],
  extrinsic: bool,
  symmetry: RosySymmetry,
) -> usize {
  triangles
    .par_iter()
    .filter(|&&[a, b, c]| {
      let turns: i32 = [(a, b), (b, c), (c, a)]
        .iter()
        .map(|&(x, y)| {
          compat_orientation(
            level.orientation[x],
            level.normals[x],
            level.orientation[y],
            level.normals[y],
            extrinsic,
            symmetry,
          )
          .1
        })
        .sum();
      turns.rem_euclid(symmetry.fold()) != 0
    })
    .count()
}

/// Triangles around which the lattice translations do not cancel.
///
/// Each edge contributes the offset from the first node's lattice point
/// nearest the edge midpoint to the second node's lattice point nearest that.
pub fn position_singularities(level: &Level, triangles: &[[usize; 3]], scale: f64) -> usize {
  triangles
    .par_iter()
    .filter(|&&[a, b, c]| {
      let mut total = DVec3::ZERO;
      for (x, y) in [(a, b), (b, c), (c, a)] {
        let mid = 0.5 * (level.positions[x] + level.positions[y]);
        let a_x = lattice_round(level.origin[x], level.orientation[x], cross_axis(level, x), mid, scale);
        let a_y = lattice_round(level.origin[y], level.orientation[y], cross_axis(level, y), a_x, scale);
        total += a_y - a_x;
      }
      total.length() > 0.5 * scale
    })
    .count()
}

#[cfg(test)]
#[path = "fields_test.rs"]
mod fields_test;
