//! Input sources and output sinks.
//!
//! A run reads from exactly one source and writes to exactly one sink. Both
//! are resolved once, at entry, so stages never see an ambiguous choice.

use std::path::{Path, PathBuf};

use crate::error::{RemeshError, RemeshResult};
use crate::resource::meshio::{self, MeshFormat};
use crate::types::{Faces, MeshBuffers, Verts};

/// Where the input mesh comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum MeshSource {
  /// A mesh file; the format is negotiated from the extension.
  File(PathBuf),
  /// Caller-supplied faces and vertices.
  Buffers(MeshBuffers),
}

impl MeshSource {
  /// Pick the source for a run.
  ///
  /// A non-empty `path` always wins and the buffers are ignored. Without a
  /// path the buffers are used, and if they are empty too there is no input.
  pub fn resolve(path: Option<&Path>, faces: &Faces, verts: &Verts) -> RemeshResult<Self> {
    if let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) {
      let source = MeshSource::File(path.to_path_buf());
      source.validate()?;
      return Ok(source);
    }
    if faces.is_empty() || verts.is_empty() {
      return Err(RemeshError::config(
        "no input mesh: neither an input path nor in-memory faces and vertices were given",
      ));
    }
    Ok(MeshSource::Buffers(MeshBuffers::new(faces.clone(), verts.clone())))
  }

  /// A file source must have a readable format.
  pub fn validate(&self) -> RemeshResult<()> {
    match self {
      MeshSource::File(path) => MeshFormat::from_path(path).map(|_| ()),
      MeshSource::Buffers(_) => Ok(()),
    }
  }

  pub fn is_file(&self) -> bool {
    matches!(self, MeshSource::File(_))
  }
}

/// Where the output mesh goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeshSink {
  /// Write an OBJ file at this path.
  File(PathBuf),
  /// Hand faces and vertices back to the caller.
  Buffers,
}

impl MeshSink {
  /// A non-empty `path` selects a file, otherwise the caller's buffers.
  pub fn resolve(path: Option<&Path>) -> RemeshResult<Self> {
    let sink = match path.filter(|p| !p.as_os_str().is_empty()) {
      Some(path) => MeshSink::File(path.to_path_buf()),
      None => MeshSink::Buffers,
    };
    sink.validate()?;
    Ok(sink)
  }

  /// A file sink must name a format that can be written.
  pub fn validate(&self) -> RemeshResult<()> {
    match self {
      MeshSink::File(path) => meshio::check_export_path(path),
      MeshSink::Buffers => Ok(()),
    }
  }
}
