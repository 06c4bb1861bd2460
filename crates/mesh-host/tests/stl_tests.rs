//! Tests for the STL codec.

use mesh_host::stl::{detect_encoding, parse_stl, write_binary_stl, StlEncoding, StlError};
use mesh_host::TriMesh;

fn make_triangle_mesh() -> TriMesh {
    TriMesh {
        positions: vec![
            [0.0, 0.0, 0.0], // v0
            [1.0, 0.0, 0.0], // v1
            [0.0, 1.0, 0.0], // v2
        ],
        triangles: vec![[0, 1, 2]],
    }
}

fn make_box_mesh() -> TriMesh {
    // Simple box: 8 vertices, 12 triangles (2 per face)
    TriMesh {
        positions: vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ],
        triangles: vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [2, 3, 7],
            [2, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ],
    }
}

const ASCII_TRIANGLE: &str = "solid tri
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid tri
";

#[test]
fn binary_stl_header_is_80_bytes() {
    let stl = write_binary_stl(&make_triangle_mesh(), "test").unwrap();
    assert!(stl.len() >= 80, "Binary STL must be at least 80 bytes");
    let header = String::from_utf8_lossy(&stl[..80]);
    assert!(header.contains("test"), "Header should contain solid name");
}

#[test]
fn binary_stl_file_size_formula() {
    let mesh = make_box_mesh();
    let stl = write_binary_stl(&mesh, "box").unwrap();
    let expected_size = 80 + 4 + mesh.triangle_count() * 50;
    assert_eq!(stl.len(), expected_size, "Binary STL size = 80 + 4 + N*50");
}

#[test]
fn binary_stl_normal_is_recomputed() {
    let stl = write_binary_stl(&make_triangle_mesh(), "tri").unwrap();
    let nz = f32::from_le_bytes([stl[92], stl[93], stl[94], stl[95]]);
    assert!((nz - 1.0).abs() < 1e-6, "CCW triangle in XY plane faces +Z");
}

#[test]
fn binary_output_parses_back_to_shared_vertices() {
    let mesh = make_box_mesh();
    let stl = write_binary_stl(&mesh, "box").unwrap();
    assert_eq!(detect_encoding(&stl), StlEncoding::Binary);
    let parsed = parse_stl(&stl).unwrap();
    assert_eq!(parsed.triangle_count(), 12);
    assert_eq!(parsed.vertex_count(), 8, "identical corners are shared on import");
    assert!(parsed.stats().is_manifold());
}

#[test]
fn ascii_stl_is_detected_and_parsed() {
    assert_eq!(
        detect_encoding(ASCII_TRIANGLE.as_bytes()),
        StlEncoding::Ascii
    );
    let mesh = parse_stl(ASCII_TRIANGLE.as_bytes()).unwrap();
    assert_eq!(mesh, make_triangle_mesh());
}

#[test]
fn binary_header_starting_with_solid_is_still_binary() {
    let mut stl = write_binary_stl(&make_triangle_mesh(), "x").unwrap();
    stl[..5].copy_from_slice(b"solid");
    assert_eq!(detect_encoding(&stl), StlEncoding::Binary);
    assert_eq!(parse_stl(&stl).unwrap().triangle_count(), 1);
}

#[test]
fn truncated_binary_is_rejected() {
    let stl = write_binary_stl(&make_box_mesh(), "box").unwrap();
    let err = parse_stl(&stl[..stl.len() - 10]).unwrap_err();
    assert!(matches!(err, StlError::Truncated { declared: 12, available: 11 }));
}

#[test]
fn tiny_file_is_rejected() {
    assert!(matches!(
        parse_stl(b"abc").unwrap_err(),
        StlError::TooShort { len: 3 }
    ));
}

#[test]
fn ascii_with_bad_coordinate_reports_line() {
    let bad = ASCII_TRIANGLE.replace("vertex 1 0 0", "vertex 1 zero 0");
    match parse_stl(bad.as_bytes()).unwrap_err() {
        StlError::InvalidAscii { line, .. } => assert_eq!(line, 5),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn ascii_without_facets_is_empty() {
    let err = parse_stl(b"solid nothing\nendsolid nothing\n").unwrap_err();
    assert!(matches!(err, StlError::Empty));
}

#[test]
fn empty_mesh_cannot_be_written() {
    assert!(matches!(
        write_binary_stl(&TriMesh::new(), "empty").unwrap_err(),
        StlError::Empty
    ));
}

#[test]
fn invalid_index_returns_error() {
    let mesh = TriMesh {
        positions: vec![[0.0, 0.0, 0.0]], // Only 1 vertex
        triangles: vec![[0, 1, 2]],
    };
    assert!(write_binary_stl(&mesh, "bad").is_err());
}
