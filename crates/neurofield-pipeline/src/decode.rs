//! Decoder seams for mesh and field-sample files.
//!
//! The upstream solver exports a flat little-endian interchange layout for
//! both inputs; the decoders here read that layout. Anything richer (the
//! solver's own mesh format, compressed arrays) plugs in behind the same
//! traits.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use neurofield_core::{FieldRecord, FieldSample, RawMesh};

/// Row width of a field-sample record in bytes (4 little-endian f64).
const FIELD_ROW_BYTES: usize = 32;

/// Magic bytes leading a flat mesh file.
const MESH_MAGIC: [u8; 4] = *b"NFMS";

// ============================================================================
// Errors
// ============================================================================

/// Errors decoding a mesh file. All variants are fatal to the load that
/// requested them.
#[derive(Error, Debug)]
pub enum MeshDecodeError {
    /// The file could not be read.
    #[error("failed to read mesh file {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The file contents do not match the expected layout.
    #[error("mesh file {path} is malformed: {reason}")]
    Malformed {
        /// Path that failed
        path: PathBuf,
        /// What was wrong
        reason: String,
    },
}

/// Errors decoding one field-sample file. Recoverable at the merge level:
/// the offending source is logged and skipped.
#[derive(Error, Debug)]
pub enum SampleDecodeError {
    /// The file exists but could not be read.
    #[error("failed to read sample file {path}: {source}")]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The file length is not a whole number of records.
    #[error("sample file {path} is truncated: {len} bytes is not a multiple of {row} per record")]
    TruncatedRecord {
        /// Path that failed
        path: PathBuf,
        /// File length in bytes
        len: usize,
        /// Expected bytes per record
        row: usize,
    },
}

// ============================================================================
// Decoder traits
// ============================================================================

/// Decodes a mesh file into raw mesh data.
pub trait MeshDecoder: Send + Sync {
    /// Decode the file at `path`. A missing file is an error; a mesh is
    /// required for every load.
    fn decode(&self, path: &Path) -> Result<RawMesh, MeshDecodeError>;
}

/// Decodes a per-tissue field-sample file.
pub trait FieldSampleDecoder: Send + Sync {
    /// Decode the file at `path`. An absent file yields the explicit empty
    /// sample, not an error: a tissue may legitimately have no samples.
    fn decode(&self, path: &Path) -> Result<FieldSample, SampleDecodeError>;
}

// ============================================================================
// Flat binary layout
// ============================================================================

/// Decoder for the flat little-endian mesh layout.
///
/// Layout: `b"NFMS"`, then node/tetra/triangle counts as u32, then node
/// coordinates as f64 triples, tetra cells as u32 quadruples, and triangle
/// cells as u32 triples.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatMeshDecoder;

impl FlatMeshDecoder {
    /// Serialize a mesh into the flat layout. Used by the upstream export
    /// step and by fixtures.
    #[must_use]
    pub fn encode(mesh: &RawMesh) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            16 + mesh.nodes.len() * 24
                + mesh.tetra_cells.len() * 16
                + mesh.triangle_cells.len() * 12,
        );
        out.extend_from_slice(&MESH_MAGIC);
        out.extend_from_slice(&(mesh.nodes.len() as u32).to_le_bytes());
        out.extend_from_slice(&(mesh.tetra_cells.len() as u32).to_le_bytes());
        out.extend_from_slice(&(mesh.triangle_cells.len() as u32).to_le_bytes());
        for node in &mesh.nodes {
            for coord in node {
                out.extend_from_slice(&coord.to_le_bytes());
            }
        }
        for cell in &mesh.tetra_cells {
            for index in cell {
                out.extend_from_slice(&index.to_le_bytes());
            }
        }
        for cell in &mesh.triangle_cells {
            for index in cell {
                out.extend_from_slice(&index.to_le_bytes());
            }
        }
        out
    }
}

/// Cursor over a byte slice for the fixed-width reads below.
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let slice = self.data.get(self.offset..self.offset + n)?;
        self.offset += n;
        Some(slice)
    }

    fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.take(4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_f64(&mut self) -> Option<f64> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Some(f64::from_le_bytes(buf))
    }
}

impl MeshDecoder for FlatMeshDecoder {
    fn decode(&self, path: &Path) -> Result<RawMesh, MeshDecodeError> {
        let data = fs::read(path).map_err(|source| MeshDecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let malformed = |reason: &str| MeshDecodeError::Malformed {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let mut reader = Reader::new(&data);
        let magic = reader.take(4).ok_or_else(|| malformed("missing header"))?;
        if magic != MESH_MAGIC {
            return Err(malformed("bad magic bytes"));
        }

        let node_count = reader.read_u32().ok_or_else(|| malformed("missing node count"))? as usize;
        let tetra_count =
            reader.read_u32().ok_or_else(|| malformed("missing tetra count"))? as usize;
        let triangle_count =
            reader.read_u32().ok_or_else(|| malformed("missing triangle count"))? as usize;

        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            let x = reader.read_f64();
            let y = reader.read_f64();
            let z = reader.read_f64();
            match (x, y, z) {
                (Some(x), Some(y), Some(z)) => nodes.push([x, y, z]),
                _ => return Err(malformed("node section ends early")),
            }
        }

        let mut tetra_cells = Vec::with_capacity(tetra_count);
        for _ in 0..tetra_count {
            let mut cell = [0u32; 4];
            for slot in &mut cell {
                *slot = reader
                    .read_u32()
                    .ok_or_else(|| malformed("tetra section ends early"))?;
            }
            tetra_cells.push(cell);
        }

        let mut triangle_cells = Vec::with_capacity(triangle_count);
        for _ in 0..triangle_count {
            let mut cell = [0u32; 3];
            for slot in &mut cell {
                *slot = reader
                    .read_u32()
                    .ok_or_else(|| malformed("triangle section ends early"))?;
            }
            triangle_cells.push(cell);
        }

        if reader.offset != data.len() {
            return Err(malformed("trailing bytes after cell data"));
        }

        Ok(RawMesh {
            nodes,
            tetra_cells,
            triangle_cells,
        })
    }
}

/// Decoder for flat field-sample files: rows of 4 little-endian f64
/// (x, y, z, magnitude), no header.
#[derive(Clone, Copy, Debug, Default)]
pub struct FlatFieldDecoder;

impl FlatFieldDecoder {
    /// Serialize a sample sequence into the flat row layout.
    #[must_use]
    pub fn encode(sample: &FieldSample) -> Vec<u8> {
        let mut out = Vec::with_capacity(sample.len() * FIELD_ROW_BYTES);
        for record in sample {
            for coord in record.position {
                out.extend_from_slice(&coord.to_le_bytes());
            }
            out.extend_from_slice(&record.magnitude.to_le_bytes());
        }
        out
    }
}

impl FieldSampleDecoder for FlatFieldDecoder {
    fn decode(&self, path: &Path) -> Result<FieldSample, SampleDecodeError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            // Absent tissue file: explicit empty result, not an error.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(SampleDecodeError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if data.len() % FIELD_ROW_BYTES != 0 {
            return Err(SampleDecodeError::TruncatedRecord {
                path: path.to_path_buf(),
                len: data.len(),
                row: FIELD_ROW_BYTES,
            });
        }

        let mut records = Vec::with_capacity(data.len() / FIELD_ROW_BYTES);
        for row in data.chunks_exact(FIELD_ROW_BYTES) {
            let mut values = [0.0f64; 4];
            for (i, value) in values.iter_mut().enumerate() {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&row[i * 8..(i + 1) * 8]);
                *value = f64::from_le_bytes(buf);
            }
            records.push(FieldRecord::from_row(values));
        }

        Ok(records)
    }
}

// ============================================================================
// Tests
// ============================================================================
