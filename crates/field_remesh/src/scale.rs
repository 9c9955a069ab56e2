//! Target edge-length resolution.
//!
//! A caller either supplies a positive scale or leaves it unset, in which
//! case the mesh's own estimate is used after rounding to 4 decimal digits.

use crate::constants::SCALE_PRECISION;

/// Caller's scale choice.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum ScaleRequest {
  /// Derive the scale from the mesh's intrinsic estimate.
  #[default]
  Auto,
  /// Use this edge length as-is.
  Fixed(f64),
}

impl ScaleRequest {
  /// Interpret a raw value: positive and finite is `Fixed`, anything else
  /// (negative sentinel, zero, NaN) is `Auto`.
  pub fn from_raw(value: f64) -> Self {
    if value.is_finite() && value > 0.0 {
      ScaleRequest::Fixed(value)
    } else {
      ScaleRequest::Auto
    }
  }
}

impl From<Option<f64>> for ScaleRequest {
  fn from(value: Option<f64>) -> Self {
    value.map_or(ScaleRequest::Auto, ScaleRequest::from_raw)
  }
}

/// Anything able to provide an intrinsic scale estimate.
pub trait ScaleEstimate {
  fn scale_estimate(&self) -> f64;
}

/// Round to 4 decimal digits: `round(x * 10000) / 10000`.
///
/// Ties are broken away from zero on the `f64` product (`f64::round`).
#[inline]
pub fn quantize_scale(estimate: f64) -> f64 {
  (estimate * SCALE_PRECISION).round() / SCALE_PRECISION
}

/// Resolve the scale to apply to the mesh.
///
/// A `Fixed` request is returned unchanged; a `Fixed` request holding a
/// non-positive value is treated as `Auto`. Validating the estimate is left
/// to the mesh resource.
pub fn resolve_scale<E: ScaleEstimate + ?Sized>(request: ScaleRequest, mesh: &E) -> f64 {
  match request {
    ScaleRequest::Fixed(scale) if scale.is_finite() && scale > 0.0 => scale,
    _ => quantize_scale(mesh.scale_estimate()),
  }
}

#[cfg(test)]
#[path = "scale_test.rs"]
mod scale_test;
