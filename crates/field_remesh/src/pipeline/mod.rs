//! Remeshing Pipeline
//!
//! A fixed, strictly sequential stage graph over one mesh resource. Field
//! optimisation runs on the worker pool; everything else runs on the
//! caller's thread.
//!
//! ```text
//! ┌──────────────┐    ┌──────────┐    ┌──────────┐    ┌────────────┐    ┌─────────────────┐    ┌────────┐
//! │ Pre-process  ├───►│   Rosy   ├───►│   Posy   ├───►│ Extraction ├───►│ Post-processing ├───►│ Export │
//! └──────────────┘    └──────────┘    └──────────┘    └────────────┘    └─────────────────┘    └────────┘
//!        │                  │               │                │                   │                  │
//!  load/scale/build   orientation     position field    2D or 3D path     convert/label/     file or buffers
//!                     field + sing.   + singularities                      align/stitch
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Pre-processing**: load from exactly one source, resolve the scale,
//!    build the hierarchy
//! 2. **Rosy**: orientation pass on the worker, then orientation singularities
//! 3. **Posy**: position pass on the same controller, then position
//!    singularities; the controller is shut down afterwards
//! 4. **Extraction**: topology picks the surface or volumetric extractor
//!
//! The four stages above are timed and recorded in `RunStats::timings`.
//! Post-processing and export follow untimed.

pub mod io;
pub mod process;

// Test utilities
#[cfg(test)]
pub mod test_utils;


// Re-exports
pub use io::{MeshSink, MeshSource};
pub use process::{run_batch, RemeshReport, RemeshRequest, Remesher};
