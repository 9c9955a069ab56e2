//! Mesh file I/O.
//!
//! Reads Wavefront OBJ (surface) and MEDIT `.mesh` (surface or tetrahedral)
//! files, writes OBJ. The format is chosen from the file extension.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use glam::DVec3;

use super::geometry::SurfaceMesh;
use crate::error::{RemeshError, RemeshResult};
use crate::types::{MeshBuffers, Topology};

/// Supported mesh file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshFormat {
  Obj,
  Medit,
}

impl MeshFormat {
  /// Negotiate the format from a path's extension (case-insensitive).
  pub fn from_path(path: &Path) -> RemeshResult<Self> {
    let extension = path
      .extension()
      .and_then(|e| e.to_str())
      .map(|e| e.to_ascii_lowercase())
      .unwrap_or_default();
    match extension.as_str() {
      "obj" => Ok(MeshFormat::Obj),
      "mesh" => Ok(MeshFormat::Medit),
      _ => Err(RemeshError::config(format!(
        "unsupported mesh format for {}: expected .obj or .mesh",
        path.display()
      ))),
    }
  }
}

/// Mesh as loaded, before any processing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawMesh {
  pub positions: Vec<DVec3>,
  /// Surface polygons (ignored for the field domain when tets are present).
  pub polygons: Vec<Vec<usize>>,
  pub tets: Vec<[usize; 4]>,
}

impl RawMesh {
  /// Convert caller buffers, validating them.
  pub fn from_buffers(buffers: &MeshBuffers) -> RemeshResult<Self> {
    let raw = Self {
      positions: buffers
        .verts
        .iter()
        .map(|v| DVec3::new(v[0] as f64, v[1] as f64, v[2] as f64))
        .collect(),
      polygons: buffers.faces.clone(),
      tets: Vec::new(),
    };
    raw.validate()?;
    Ok(raw)
  }

  pub fn topology(&self) -> Topology {
    if self.tets.is_empty() {
      Topology::Surface
    } else {
      Topology::Volumetric
    }
  }

  /// Number of primary elements (tets for volumes, polygons for surfaces).
  pub fn element_count(&self) -> usize {
    match self.topology() {
      Topology::Surface => self.polygons.len(),
      Topology::Volumetric => self.tets.len(),
    }
  }

  /// Reject empty meshes, short faces, bad indices and non-finite positions.
  pub fn validate(&self) -> RemeshResult<()> {
    if self.positions.is_empty() {
      return Err(RemeshError::resource("mesh has no vertices"));
    }
    if self.polygons.is_empty() && self.tets.is_empty() {
      return Err(RemeshError::resource("mesh has no faces"));
    }
    if let Some(i) = self.positions.iter().position(|p| !p.is_finite()) {
      return Err(RemeshError::resource(format!("vertex {i} has a non-finite coordinate")));
    }
    let n = self.positions.len();
    for (f, face) in self.polygons.iter().enumerate() {
      if face.len() < 3 {
        return Err(RemeshError::resource(format!(
          "face {f} has {} corners, at least 3 required",
          face.len()
        )));
      }
      if let Some(&i) = face.iter().find(|&&i| i >= n) {
        return Err(RemeshError::resource(format!(
          "face {f} references vertex {i}, mesh has {n} vertices"
        )));
      }
    }
    for (t, tet) in self.tets.iter().enumerate() {
      if let Some(&i) = tet.iter().find(|&&i| i >= n) {
        return Err(RemeshError::resource(format!(
          "tetrahedron {t} references vertex {i}, mesh has {n} vertices"
        )));
      }
    }
    Ok(())
  }

  /// Triangle surface the fields live on: the polygons for a surface mesh,
  /// the boundary of the tetrahedra for a volume.
  pub fn surface(&self) -> SurfaceMesh {
    match self.topology() {
      Topology::Surface => SurfaceMesh::from_polygons(self.positions.clone(), &self.polygons),
      Topology::Volumetric => SurfaceMesh::tet_boundary(self.positions.clone(), &self.tets),
    }
  }
}

/// Read a mesh file, negotiating the format from its extension.
pub fn read_mesh(path: &Path) -> RemeshResult<RawMesh> {
  let format = MeshFormat::from_path(path)?;
  let file = File::open(path).map_err(|e| {
    RemeshError::resource(format!("cannot open {}: {e}", path.display()))
  })?;
  let reader = BufReader::new(file);
  let raw = match format {
    MeshFormat::Obj => read_obj(reader, path)?,
    MeshFormat::Medit => read_medit(reader, path)?,
  };
  raw.validate()?;
  Ok(raw)
}

fn parse_error(path: &Path, line: usize, message: impl Into<String>) -> RemeshError {
  RemeshError::Parse {
    path: path.to_path_buf(),
    line,
    message: message.into(),
  }
}

/// Parse Wavefront OBJ. Only `v` and `f` records are used.
pub fn read_obj<R: BufRead>(reader: R, path: &Path) -> RemeshResult<RawMesh> {
  let mut raw = RawMesh::default();

  for (idx, line) in reader.lines().enumerate() {
    let line_no = idx + 1;
    let line = line?;
    let line = line.split('#').next().unwrap_or("").trim();
    let mut tokens = line.split_whitespace();

    match tokens.next() {
      Some("v") => {
        let mut coords = [0.0f64; 3];
        for c in coords.iter_mut() {
          let token = tokens
            .next()
            .ok_or_else(|| parse_error(path, line_no, "vertex needs three coordinates"))?;
          *c = token
            .parse()
            .map_err(|e| parse_error(path, line_no, format!("bad coordinate {token:?}: {e}")))?;
        }
        raw.positions.push(DVec3::from_array(coords));
      }
      Some("f") => {
        let mut face = Vec::new();
        for token in tokens {
          let index_str = token.split('/').next().unwrap_or("");
          let index: i64 = index_str
            .parse()
            .map_err(|e| parse_error(path, line_no, format!("bad face index {token:?}: {e}")))?;
          let resolved = match index {
            i if i > 0 => i - 1,
            i if i < 0 => raw.positions.len() as i64 + i,
            _ => return Err(parse_error(path, line_no, "face index 0 is invalid")),
          };
          if resolved < 0 {
            return Err(parse_error(
              path,
              line_no,
              format!("relative index {index} points before the first vertex"),
            ));
          }
          face.push(resolved as usize);
        }
        if face.len() < 3 {
          return Err(parse_error(path, line_no, "face needs at least three corners"));
        }
        raw.polygons.push(face);
      }
      _ => {}
    }
  }

  Ok(raw)
}

/// Parse an ASCII MEDIT `.mesh` file.
///
/// Reads `Vertices`, `Triangles`, `Quadrilaterals` and `Tetrahedra`; other
/// known sections are skipped. Element indices are 1-based and every record
/// ends with a reference tag.
pub fn read_medit<R: BufRead>(reader: R, path: &Path) -> RemeshResult<RawMesh> {
  let mut tokens: Vec<(usize, String)> = Vec::new();
  for (idx, line) in reader.lines().enumerate() {
    let line = line?;
    let content = line.split('#').next().unwrap_or("");
    tokens.extend(content.split_whitespace().map(|t| (idx + 1, t.to_string())));
  }

  let mut cursor = TokenCursor {
    tokens: &tokens,
    pos: 0,
    path,
  };
  let mut raw = RawMesh::default();
  let mut dimension = 3usize;

  while let Some((line, keyword)) = cursor.next_token() {
    match keyword {
      "MeshVersionFormatted" => {
        cursor.next_usize()?;
      }
      "Dimension" => {
        dimension = cursor.next_usize()?;
        if dimension != 3 {
          return Err(parse_error(path, line, format!("dimension {dimension} not supported")));
        }
      }
      "Vertices" => {
        let count = cursor.next_count(dimension + 1)?;
        raw.positions.reserve(count);
        for _ in 0..count {
          let mut coords = [0.0f64; 3];
          for c in coords.iter_mut().take(dimension) {
            *c = cursor.next_f64()?;
          }
          cursor.next_token_required()?; // reference
          raw.positions.push(DVec3::from_array(coords));
        }
      }
      "Triangles" | "Quadrilaterals" => {
        let corners = if keyword == "Triangles" { 3 } else { 4 };
        let count = cursor.next_count(corners + 1)?;
        raw.polygons.reserve(count);
        for _ in 0..count {
          let mut face = Vec::with_capacity(corners);
          for _ in 0..corners {
            face.push(cursor.next_index()?);
          }
          cursor.next_token_required()?;
          raw.polygons.push(face);
        }
      }
      "Tetrahedra" => {
        let count = cursor.next_count(5)?;
        raw.tets.reserve(count);
        for _ in 0..count {
          let mut tet = [0usize; 4];
          for corner in tet.iter_mut() {
            *corner = cursor.next_index()?;
          }
          cursor.next_token_required()?;
          raw.tets.push(tet);
        }
      }
      "Edges" | "Corners" | "RequiredVertices" | "Ridges" | "Hexahedra" | "Normals"
      | "Tangents" => {
        let per_record = match keyword {
          "Edges" => 3,
          "Corners" | "RequiredVertices" | "Ridges" => 1,
          "Hexahedra" => 9,
          _ => 3,
        };
        let count = cursor.next_count(per_record)?;
        cursor.skip(count * per_record);
      }
      "End" => break,
      other => {
        return Err(parse_error(path, line, format!("unknown section {other:?}")));
      }
    }
  }

  Ok(raw)
}

struct TokenCursor<'a> {
  tokens: &'a [(usize, String)],
  pos: usize,
  path: &'a Path,
}

impl<'a> TokenCursor<'a> {
  fn next_token(&mut self) -> Option<(usize, &'a str)> {
    let tokens = self.tokens;
    let (line, token) = tokens.get(self.pos)?;
    self.pos += 1;
    Some((*line, token.as_str()))
  }

  fn next_token_required(&mut self) -> RemeshResult<(usize, &'a str)> {
    let last_line = self.tokens.last().map_or(0, |(l, _)| *l);
    self
      .next_token()
      .ok_or_else(|| parse_error(self.path, last_line, "unexpected end of file"))
  }

  fn next_usize(&mut self) -> RemeshResult<usize> {
    let (line, token) = self.next_token_required()?;
    token
      .parse()
      .map_err(|e| parse_error(self.path, line, format!("expected a count, got {token:?}: {e}")))
  }

  fn next_f64(&mut self) -> RemeshResult<f64> {
    let (line, token) = self.next_token_required()?;
    token
      .parse()
      .map_err(|e| parse_error(self.path, line, format!("bad coordinate {token:?}: {e}")))
  }

  /// Record count of a section whose records are `per_record` tokens long.
  ///
  /// Rejects counts the rest of the file cannot hold, so the caller can
  /// size buffers from the result.
  fn next_count(&mut self, per_record: usize) -> RemeshResult<usize> {
    let (line, _) = self.peek_required()?;
    let count = self.next_usize()?;
    let remaining = self.tokens.len() - self.pos;
    match count.checked_mul(per_record) {
      Some(needed) if needed <= remaining => Ok(count),
      _ => Err(parse_error(
        self.path,
        line,
        format!("section declares {count} records but only {remaining} tokens follow"),
      )),
    }
  }

  fn peek_required(&self) -> RemeshResult<(usize, &'a str)> {
    let tokens = self.tokens;
    let last_line = tokens.last().map_or(0, |(l, _)| *l);
    tokens
      .get(self.pos)
      .map(|(line, token)| (*line, token.as_str()))
      .ok_or_else(|| parse_error(self.path, last_line, "unexpected end of file"))
  }

  fn skip(&mut self, count: usize) {
    self.pos = (self.pos + count).min(self.tokens.len());
  }

  /// 1-based element index converted to 0-based.
  fn next_index(&mut self) -> RemeshResult<usize> {
    let (line, token) = self.next_token_required()?;
    let index: usize = token
      .parse()
      .map_err(|e| parse_error(self.path, line, format!("bad index {token:?}: {e}")))?;
    index
      .checked_sub(1)
      .ok_or_else(|| parse_error(self.path, line, "index 0 is invalid"))
  }
}

/// Write buffers as OBJ.
pub fn write_obj<W: Write>(mut writer: W, buffers: &MeshBuffers) -> RemeshResult<()> {
  writeln!(writer, "# {} vertices, {} faces", buffers.verts.len(), buffers.faces.len())?;
  for v in &buffers.verts {
    writeln!(writer, "v {} {} {}", v[0], v[1], v[2])?;
  }
  for face in &buffers.faces {
    write!(writer, "f")?;
    for &i in face {
      write!(writer, " {}", i + 1)?;
    }
    writeln!(writer)?;
  }
  writer.flush()?;
  Ok(())
}

/// Reject export targets other than `.obj`.
pub fn check_export_path(path: &Path) -> RemeshResult<()> {
  match MeshFormat::from_path(path)? {
    MeshFormat::Obj => Ok(()),
    MeshFormat::Medit => Err(RemeshError::config(format!(
      "cannot export {}: only .obj output is supported",
      path.display()
    ))),
  }
}

/// Write buffers to `path` as OBJ.
///
/// The file is written to a temporary sibling first and renamed into place,
/// so a failed export never leaves a partial file at `path`.
pub fn write_mesh(path: &Path, buffers: &MeshBuffers) -> RemeshResult<()> {
  check_export_path(path)?;

  let tmp = temp_sibling(path);
  let result = File::create(&tmp)
    .map_err(RemeshError::from)
    .and_then(|file| write_obj(BufWriter::new(file), buffers))
    .and_then(|_| std::fs::rename(&tmp, path).map_err(RemeshError::from));
  if result.is_err() {
    let _ = std::fs::remove_file(&tmp);
  }
  result
}

fn temp_sibling(path: &Path) -> PathBuf {
  let name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "mesh.obj".to_string());
  path.with_file_name(format!(".{name}.partial"))
}

#[cfg(test)]
#[path = "meshio_test.rs"]
mod meshio_test;
