//! Minimal STL codec: binary and ASCII in, binary out.
//!
//! Binary STL format:
//! - 80-byte header (arbitrary text)
//! - u32 triangle count (little-endian)
//! - For each triangle: 3×f32 normal + 3×(3×f32 vertex) + u16 attribute = 50 bytes
//!
//! Files that start with `solid` are ASCII unless their length matches the
//! binary layout exactly (some exporters write `solid` into binary headers).

use std::fs;
use std::path::Path;

use crate::mesh::{cross, sub, TriMesh};

const HEADER_SIZE: usize = 80;
const TRIANGLE_SIZE: usize = 50;

/// Errors from reading or writing STL data.
#[derive(Debug, thiserror::Error)]
pub enum StlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file too small to be STL ({len} bytes)")]
    TooShort { len: usize },

    #[error("binary STL truncated: header declares {declared} triangles, data holds {available}")]
    Truncated { declared: u32, available: usize },

    #[error("ASCII STL line {line}: {reason}")]
    InvalidAscii { line: usize, reason: String },

    #[error("mesh has no triangles")]
    Empty,

    #[error("index {index} out of range (vertex count = {vertex_count})")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Encoding of an STL payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StlEncoding {
    Binary,
    Ascii,
}

/// Decide whether `bytes` hold ASCII or binary STL.
pub fn detect_encoding(bytes: &[u8]) -> StlEncoding {
    let starts_with_solid = {
        let head = &bytes[..bytes.len().min(HEADER_SIZE)];
        let text = String::from_utf8_lossy(head);
        text.trim_start().starts_with("solid")
    };
    if starts_with_solid && !binary_size_matches(bytes) {
        StlEncoding::Ascii
    } else {
        StlEncoding::Binary
    }
}

fn binary_size_matches(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_SIZE + 4 {
        return false;
    }
    let count = declared_count(bytes) as usize;
    bytes.len() == HEADER_SIZE + 4 + count * TRIANGLE_SIZE
}

fn declared_count(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([
        bytes[HEADER_SIZE],
        bytes[HEADER_SIZE + 1],
        bytes[HEADER_SIZE + 2],
        bytes[HEADER_SIZE + 3],
    ])
}

/// Read and index an STL file. Empty meshes are rejected.
pub fn read_stl(path: &Path) -> Result<TriMesh, StlError> {
    let bytes = fs::read(path)?;
    parse_stl(&bytes)
}

/// Parse STL bytes of either encoding into an indexed mesh.
pub fn parse_stl(bytes: &[u8]) -> Result<TriMesh, StlError> {
    let soup = match detect_encoding(bytes) {
        StlEncoding::Binary => parse_binary(bytes)?,
        StlEncoding::Ascii => parse_ascii(bytes)?,
    };
    if soup.is_empty() {
        return Err(StlError::Empty);
    }
    Ok(TriMesh::from_soup(&soup))
}

fn parse_binary(bytes: &[u8]) -> Result<Vec<[[f32; 3]; 3]>, StlError> {
    if bytes.len() < HEADER_SIZE + 4 {
        return Err(StlError::TooShort { len: bytes.len() });
    }
    let declared = declared_count(bytes);
    let body = &bytes[HEADER_SIZE + 4..];
    let available = body.len() / TRIANGLE_SIZE;
    if (declared as usize) > available {
        return Err(StlError::Truncated {
            declared,
            available,
        });
    }

    let read_f32 = |chunk: &[u8], at: usize| {
        f32::from_le_bytes([chunk[at], chunk[at + 1], chunk[at + 2], chunk[at + 3]])
    };

    let mut soup = Vec::with_capacity(declared as usize);
    for record in body.chunks_exact(TRIANGLE_SIZE).take(declared as usize) {
        // Skip the stored normal (12 bytes); it is recomputed on export.
        let mut facet = [[0.0f32; 3]; 3];
        for (v, vertex) in facet.iter_mut().enumerate() {
            for (k, coord) in vertex.iter_mut().enumerate() {
                *coord = read_f32(record, 12 + v * 12 + k * 4);
            }
        }
        soup.push(facet);
    }
    Ok(soup)
}

fn parse_ascii(bytes: &[u8]) -> Result<Vec<[[f32; 3]; 3]>, StlError> {
    let text = String::from_utf8_lossy(bytes);
    let mut soup = Vec::new();
    let mut pending: Vec<[f32; 3]> = Vec::with_capacity(3);

    for (idx, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("vertex") => {
                let mut vertex = [0.0f32; 3];
                for coord in vertex.iter_mut() {
                    let token = tokens.next().ok_or_else(|| StlError::InvalidAscii {
                        line: idx + 1,
                        reason: "vertex needs three coordinates".to_string(),
                    })?;
                    *coord = token.parse().map_err(|e| StlError::InvalidAscii {
                        line: idx + 1,
                        reason: format!("bad coordinate {token:?}: {e}"),
                    })?;
                }
                pending.push(vertex);
            }
            Some("endloop") => {
                if pending.len() != 3 {
                    return Err(StlError::InvalidAscii {
                        line: idx + 1,
                        reason: format!("facet has {} vertices, expected 3", pending.len()),
                    });
                }
                soup.push([pending[0], pending[1], pending[2]]);
                pending.clear();
            }
            _ => {}
        }
    }

    if !pending.is_empty() {
        return Err(StlError::InvalidAscii {
            line: text.lines().count(),
            reason: "unterminated facet".to_string(),
        });
    }
    Ok(soup)
}

/// Unit facet normal, or +Z for degenerate triangles.
fn facet_normal(mesh: &TriMesh, tri: &[u32; 3]) -> [f32; 3] {
    let (p0, p1, p2) = (mesh.position(tri[0]), mesh.position(tri[1]), mesh.position(tri[2]));
    let n = cross(sub(p1, p0), sub(p2, p0));
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 1e-12 {
        [(n[0] / len) as f32, (n[1] / len) as f32, (n[2] / len) as f32]
    } else {
        [0.0, 0.0, 1.0]
    }
}

/// Encode a mesh as binary STL with freshly computed facet normals.
pub fn write_binary_stl(mesh: &TriMesh, name: &str) -> Result<Vec<u8>, StlError> {
    let tri_count = mesh.triangles.len();
    if tri_count == 0 {
        return Err(StlError::Empty);
    }

    let vertex_count = mesh.positions.len();
    for tri in &mesh.triangles {
        for &index in tri {
            if index as usize >= vertex_count {
                return Err(StlError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }
    }

    let mut buf = Vec::with_capacity(HEADER_SIZE + 4 + tri_count * TRIANGLE_SIZE);

    let header = format!("binary STL: {}", name);
    let header_bytes = header.as_bytes();
    buf.extend_from_slice(&header_bytes[..header_bytes.len().min(HEADER_SIZE)]);
    buf.resize(HEADER_SIZE, 0u8);

    buf.extend_from_slice(&(tri_count as u32).to_le_bytes());

    for tri in &mesh.triangles {
        for c in facet_normal(mesh, tri) {
            buf.extend_from_slice(&c.to_le_bytes());
        }
        for &index in tri {
            for c in mesh.positions[index as usize] {
                buf.extend_from_slice(&c.to_le_bytes());
            }
        }
        // Attribute byte count (unused)
        buf.extend_from_slice(&0u16.to_le_bytes());
    }

    Ok(buf)
}
