//! Indexed triangle mesh used by the built-in host.

use std::collections::{HashMap, VecDeque};

use crate::types::MeshStats;

/// Undirected edge key with the smaller vertex index first.
pub type EdgeKey = (u32, u32);

pub fn edge_key(a: u32, b: u32) -> EdgeKey {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Indexed triangle mesh. Positions are single precision like STL itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriMesh {
    pub positions: Vec<[f32; 3]>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an indexed mesh from a triangle soup, sharing bit-identical positions.
    pub fn from_soup(soup: &[[[f32; 3]; 3]]) -> Self {
        let mut mesh = TriMesh::new();
        let mut index: HashMap<[u32; 3], u32> = HashMap::new();
        for facet in soup {
            let mut tri = [0u32; 3];
            for (slot, p) in tri.iter_mut().zip(facet.iter()) {
                let bits = [p[0].to_bits(), p[1].to_bits(), p[2].to_bits()];
                *slot = *index.entry(bits).or_insert_with(|| {
                    mesh.positions.push(*p);
                    (mesh.positions.len() - 1) as u32
                });
            }
            mesh.triangles.push(tri);
        }
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn position(&self, v: u32) -> [f64; 3] {
        let p = self.positions[v as usize];
        [p[0] as f64, p[1] as f64, p[2] as f64]
    }

    /// Map every undirected edge to the triangles that use it.
    pub fn edge_faces(&self) -> HashMap<EdgeKey, Vec<usize>> {
        let mut map: HashMap<EdgeKey, Vec<usize>> = HashMap::new();
        for (fi, tri) in self.triangles.iter().enumerate() {
            for i in 0..3 {
                map.entry(edge_key(tri[i], tri[(i + 1) % 3]))
                    .or_default()
                    .push(fi);
            }
        }
        map
    }

    /// Label each triangle with the index of its edge-connected component.
    /// Returns (labels, component count).
    pub fn components(&self) -> (Vec<usize>, usize) {
        let edges = self.edge_faces();
        let mut labels = vec![usize::MAX; self.triangles.len()];
        let mut count = 0;
        for seed in 0..self.triangles.len() {
            if labels[seed] != usize::MAX {
                continue;
            }
            labels[seed] = count;
            let mut queue = VecDeque::from([seed]);
            while let Some(fi) = queue.pop_front() {
                let tri = self.triangles[fi];
                for i in 0..3 {
                    let key = edge_key(tri[i], tri[(i + 1) % 3]);
                    for &nb in edges.get(&key).map(Vec::as_slice).unwrap_or(&[]) {
                        if labels[nb] == usize::MAX {
                            labels[nb] = count;
                            queue.push_back(nb);
                        }
                    }
                }
            }
            count += 1;
        }
        (labels, count)
    }

    /// Unnormalized face normal (cross product of two edges).
    pub fn face_cross(&self, fi: usize) -> [f64; 3] {
        let [a, b, c] = self.triangles[fi];
        let (p0, p1, p2) = (self.position(a), self.position(b), self.position(c));
        cross(sub(p1, p0), sub(p2, p0))
    }

    /// Signed volume of the tetrahedron spanned by the origin and triangle `fi`.
    pub fn signed_tet_volume(&self, fi: usize) -> f64 {
        let [a, b, c] = self.triangles[fi];
        dot(self.position(a), cross(self.position(b), self.position(c))) / 6.0
    }

    /// Axis-aligned bounds, or None for a mesh without vertices.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = self.positions.first()?;
        let mut min = [first[0] as f64, first[1] as f64, first[2] as f64];
        let mut max = min;
        for v in 0..self.positions.len() as u32 {
            let p = self.position(v);
            for k in 0..3 {
                min[k] = min[k].min(p[k]);
                max[k] = max[k].max(p[k]);
            }
        }
        Some((min, max))
    }

    pub fn stats(&self) -> MeshStats {
        let edges = self.edge_faces();
        MeshStats {
            vertices: self.positions.len(),
            triangles: self.triangles.len(),
            boundary_edges: edges.values().filter(|f| f.len() == 1).count(),
            non_manifold_edges: edges.values().filter(|f| f.len() > 2).count(),
        }
    }
}

pub(crate) fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
