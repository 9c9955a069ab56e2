//! field_remesh - Field-aligned remeshing pipeline
//!
//! Turns a triangle or tetrahedral mesh into a quad-dominant surface mesh
//! whose edges follow a smooth RoSy orientation field (2-fold by default), at
//! a chosen target edge length.
//!
//! # Features
//!
//! - **Fixed stage pipeline**: load, scale, build, orientation pass, position
//!   pass, extraction, post-processing, export; each major stage timed
//! - **Asynchronous optimizer**: field passes run on a dedicated rayon pool
//!   behind an explicit state machine
//! - **Dual I/O**: mesh files (OBJ, MEDIT) or in-memory buffers, one source
//!   and one sink per run
//! - **Bundled mesh resource**: multi-resolution hierarchy, Jacobi field
//!   smoothing, lattice extraction and stitching
//!
//! # Example
//!
//! ```ignore
//! use field_remesh::{run_batch, RemeshConfig};
//!
//! let mut faces = vec![/* index tuples */];
//! let mut verts = vec![/* [x, y, z] */];
//!
//! // Empty paths: read from and write back to the buffers. Negative scale: auto.
//! let stats = run_batch("", "", -1.0, false, &mut faces, &mut verts, &RemeshConfig::default())?;
//!
//! println!("{} faces in {:?}", stats.output_faces, stats.total());
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use config::{Parallelism, RemeshConfig, RosySymmetry, SolverSettings};
pub use constants::{STAGE_EXTRACTION, STAGE_ORDER, STAGE_POSY, STAGE_PREPROCESS, STAGE_ROSY};
pub use error::{OptimizerUsageError, RemeshError, RemeshResult};
pub use types::{EdgeLabel, Faces, MeshBuffers, Topology, Verts};

// Scale resolution
pub mod scale;
pub use scale::{quantize_scale, resolve_scale, ScaleEstimate, ScaleRequest};

// Stage timing and run statistics
pub mod metrics;
pub use metrics::{RunStats, StageRecord, StageTimer};

// Worker pool for asynchronous optimisation
pub mod threading;
pub use threading::{TaskHandle, WorkerPool};

// Field optimizer controller
pub mod optimizer;
pub use optimizer::{FieldOptimizer, FieldPass, OptimizerOptions, OptimizerPhase};

// Extraction path selection
pub mod extraction;
pub use extraction::{ExtractionFlags, ExtractionPath};

// Mesh resources
pub mod resource;
pub use resource::{MeshResource, MultiResolutionMesh};

// Pipeline orchestrator
pub mod pipeline;
pub use pipeline::{run_batch, MeshSink, MeshSource, RemeshReport, RemeshRequest, Remesher};
