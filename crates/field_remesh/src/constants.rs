//! Constants shared across the pipeline.

/// Stage names in the order they are recorded in `RunStats::timings`.
pub const STAGE_PREPROCESS: &str = "data pre-processing";
pub const STAGE_ROSY: &str = "rosy optimization";
pub const STAGE_POSY: &str = "posy optimization";
pub const STAGE_EXTRACTION: &str = "mesh extraction";

/// All timed stages, in execution order.
pub const STAGE_ORDER: [&str; 4] = [STAGE_PREPROCESS, STAGE_ROSY, STAGE_POSY, STAGE_EXTRACTION];

/// Auto-resolved scales are rounded to 1 / SCALE_PRECISION (4 decimal digits).
pub const SCALE_PRECISION: f64 = 10_000.0;

/// Edges longer than `scale * SUBDIVISION_RATIO` are split during build.
pub const SUBDIVISION_RATIO: f64 = 0.5;

/// Lattice points closer than `scale * CLUSTER_RATIO` are merged on extraction.
pub const CLUSTER_RATIO: f64 = 0.5;

/// Extracted triangles are paired into quads across edges longer than
/// `scale * DIAGONAL_RATIO` (the lattice diagonal is about 1.41 * scale).
pub const DIAGONAL_RATIO: f64 = 1.2;

/// Vertices closer than `scale * WELD_RATIO` are welded when stitching.
pub const WELD_RATIO: f64 = 1e-6;

/// Upper bound on edge splits during build, guards against absurdly small scales.
pub const MAX_SUBDIVIDED_VERTICES: usize = 4_000_000;

// Solver defaults
pub const DEFAULT_ORIENTATION_ITERATIONS: usize = 16;
pub const DEFAULT_POSITION_ITERATIONS: usize = 16;
pub const DEFAULT_MAX_LEVELS: usize = 8;
pub const DEFAULT_COARSEST_SIZE: usize = 32;
pub const DEFAULT_SEED: u64 = 0x5EED;
pub const DEFAULT_TARGET_FACES: usize = 600;
