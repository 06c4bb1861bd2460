//! Basic repair operations for the built-in host: vertex merge, hole fill,
//! normal consistency and recentering. Each returns how much it changed.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace};

use crate::mesh::{dot, edge_key, sub, EdgeKey, TriMesh};

/// Merge vertices closer than `distance`, drop triangles that collapse and
/// vertices no longer referenced. Returns the number of merged vertices.
pub fn merge_vertices(mesh: &mut TriMesh, distance: f64) -> usize {
    if mesh.positions.is_empty() || distance <= 0.0 || !distance.is_finite() {
        return 0;
    }

    let cell_size = distance * 2.0;
    let cell_of = |p: [f64; 3]| {
        (
            (p[0] / cell_size).floor() as i64,
            (p[1] / cell_size).floor() as i64,
            (p[2] / cell_size).floor() as i64,
        )
    };

    let mut grid: HashMap<(i64, i64, i64), Vec<u32>> = HashMap::new();
    for v in 0..mesh.positions.len() as u32 {
        grid.entry(cell_of(mesh.position(v))).or_default().push(v);
    }

    let mut remap: Vec<u32> = (0..mesh.positions.len() as u32).collect();
    let mut merged = 0;
    for v in 0..mesh.positions.len() as u32 {
        if remap[v as usize] != v {
            continue;
        }
        let p = mesh.position(v);
        let (cx, cy, cz) = cell_of(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = grid.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &other in candidates {
                        if other <= v || remap[other as usize] != other {
                            continue;
                        }
                        let q = mesh.position(other);
                        let d2 = (p[0] - q[0]).powi(2)
                            + (p[1] - q[1]).powi(2)
                            + (p[2] - q[2]).powi(2);
                        if d2 <= distance * distance {
                            remap[other as usize] = v;
                            merged += 1;
                        }
                    }
                }
            }
        }
    }

    if merged == 0 {
        return 0;
    }

    for tri in &mut mesh.triangles {
        for v in tri.iter_mut() {
            *v = remap[*v as usize];
        }
    }
    let before = mesh.triangles.len();
    mesh.triangles.retain(|&[a, b, c]| a != b && b != c && a != c);
    let collapsed = before - mesh.triangles.len();
    let removed = remove_unreferenced_vertices(mesh);
    debug!(merged, collapsed, removed, "merged vertices");
    merged
}

/// Compact the vertex array to the vertices triangles actually use.
pub fn remove_unreferenced_vertices(mesh: &mut TriMesh) -> usize {
    let mut new_index = vec![u32::MAX; mesh.positions.len()];
    let mut positions = Vec::with_capacity(mesh.positions.len());
    for tri in &mut mesh.triangles {
        for v in tri.iter_mut() {
            let slot = &mut new_index[*v as usize];
            if *slot == u32::MAX {
                *slot = positions.len() as u32;
                positions.push(mesh.positions[*v as usize]);
            }
            *v = *slot;
        }
    }
    let removed = mesh.positions.len() - positions.len();
    mesh.positions = positions;
    removed
}

/// Directed boundary edges in the orientation of their only triangle,
/// in triangle order.
fn boundary_half_edges(mesh: &TriMesh, edges: &HashMap<EdgeKey, Vec<usize>>) -> Vec<(u32, u32)> {
    let mut out = Vec::new();
    for tri in &mesh.triangles {
        for i in 0..3 {
            let (a, b) = (tri[i], tri[(i + 1) % 3]);
            if edges.get(&edge_key(a, b)).map_or(0, Vec::len) == 1 {
                out.push((a, b));
            }
        }
    }
    out
}

/// Trace closed loops of boundary half-edges. Open chains are dropped.
pub fn boundary_loops(mesh: &TriMesh) -> Vec<Vec<u32>> {
    let edges = mesh.edge_faces();
    let half_edges = boundary_half_edges(mesh, &edges);
    let mut outgoing: HashMap<u32, Vec<u32>> = HashMap::new();
    for &(a, b) in &half_edges {
        outgoing.entry(a).or_default().push(b);
    }

    let mut used: HashSet<(u32, u32)> = HashSet::new();
    let mut loops = Vec::new();
    for &(start, first) in &half_edges {
        if used.contains(&(start, first)) {
            continue;
        }
        used.insert((start, first));
        let mut verts = vec![start];
        let mut current = first;
        let mut closed = false;
        while verts.len() <= half_edges.len() {
            if current == start {
                closed = true;
                break;
            }
            verts.push(current);
            let next = outgoing
                .get(&current)
                .and_then(|targets| targets.iter().find(|&&n| !used.contains(&(current, n))))
                .copied();
            match next {
                Some(n) => {
                    used.insert((current, n));
                    current = n;
                }
                None => break,
            }
        }
        if closed && verts.len() >= 3 {
            loops.push(verts);
        } else {
            trace!(start, "boundary chain is not closed");
        }
    }
    loops
}

/// Fill holes bounded by at most `max_sides` edges (0 = no limit).
///
/// A flat component whose only boundary is a single loop is an open sheet;
/// its rim is not a hole and is left alone. Returns the number of holes filled.
pub fn fill_holes(mesh: &mut TriMesh, max_sides: usize) -> usize {
    let loops = boundary_loops(mesh);
    if loops.is_empty() {
        return 0;
    }

    let (labels, count) = mesh.components();
    let mut component_vertices: Vec<HashSet<u32>> = vec![HashSet::new(); count];
    let mut vertex_component: HashMap<u32, usize> = HashMap::new();
    for (fi, tri) in mesh.triangles.iter().enumerate() {
        for &v in tri {
            component_vertices[labels[fi]].insert(v);
            vertex_component.insert(v, labels[fi]);
        }
    }

    let mut loops_per_component = vec![0usize; count];
    for hole in &loops {
        if let Some(&c) = vertex_component.get(&hole[0]) {
            loops_per_component[c] += 1;
        }
    }

    let mut filled = 0;
    for hole in loops {
        let sides = hole.len();
        if max_sides != 0 && sides > max_sides {
            trace!(sides, max_sides, "hole too large to fill");
            continue;
        }
        if let Some(&c) = vertex_component.get(&hole[0]) {
            if loops_per_component[c] == 1 && is_flat(mesh, &hole, &component_vertices[c]) {
                trace!(sides, "boundary is the rim of a flat sheet, not filling");
                continue;
            }
        }

        // Fill triangles run against the boundary's direction so winding matches.
        if sides <= 4 {
            for i in 1..sides - 1 {
                mesh.triangles.push([hole[0], hole[i + 1], hole[i]]);
            }
        } else {
            let mut centre = [0.0f64; 3];
            for &v in &hole {
                let p = mesh.position(v);
                for k in 0..3 {
                    centre[k] += p[k] / sides as f64;
                }
            }
            mesh.positions.push([centre[0] as f32, centre[1] as f32, centre[2] as f32]);
            let c = (mesh.positions.len() - 1) as u32;
            for i in 0..sides {
                mesh.triangles.push([c, hole[(i + 1) % sides], hole[i]]);
            }
        }
        filled += 1;
    }
    debug!(filled, "filled holes");
    filled
}

/// Whether every vertex of a component lies in the plane of `rim`.
fn is_flat(mesh: &TriMesh, rim: &[u32], vertices: &HashSet<u32>) -> bool {
    // Newell normal and centroid of the rim.
    let mut normal = [0.0f64; 3];
    let mut centroid = [0.0f64; 3];
    for (i, &v) in rim.iter().enumerate() {
        let p = mesh.position(v);
        let q = mesh.position(rim[(i + 1) % rim.len()]);
        normal[0] += (p[1] - q[1]) * (p[2] + q[2]);
        normal[1] += (p[2] - q[2]) * (p[0] + q[0]);
        normal[2] += (p[0] - q[0]) * (p[1] + q[1]);
        for k in 0..3 {
            centroid[k] += p[k] / rim.len() as f64;
        }
    }
    let len = dot(normal, normal).sqrt();

    let mut extent = 0.0f64;
    for &v in vertices {
        let d = sub(mesh.position(v), centroid);
        extent = extent.max(dot(d, d).sqrt());
    }
    if len <= f64::EPSILON * extent.max(1.0) {
        return true;
    }

    let tolerance = 1e-6 * extent.max(f64::MIN_POSITIVE);
    vertices
        .iter()
        .all(|&v| (dot(sub(mesh.position(v), centroid), normal) / len).abs() <= tolerance)
}

/// Make triangle winding agree across shared edges, then turn each closed
/// component outward. Returns the number of flipped triangles.
pub fn make_normals_consistent(mesh: &mut TriMesh) -> usize {
    let edges = mesh.edge_faces();
    let mut visited = vec![false; mesh.triangles.len()];
    let mut flipped = vec![false; mesh.triangles.len()];

    for seed in 0..mesh.triangles.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        let mut queue = VecDeque::from([seed]);
        while let Some(fi) = queue.pop_front() {
            let tri = mesh.triangles[fi];
            for i in 0..3 {
                let (a, b) = (tri[i], tri[(i + 1) % 3]);
                let Some(faces) = edges.get(&edge_key(a, b)) else {
                    continue;
                };
                if faces.len() != 2 {
                    continue;
                }
                for &nb in faces {
                    if visited[nb] {
                        continue;
                    }
                    visited[nb] = true;
                    if has_directed_edge(&mesh.triangles[nb], a, b) {
                        mesh.triangles[nb].swap(1, 2);
                        flipped[nb] = !flipped[nb];
                    }
                    queue.push_back(nb);
                }
            }
        }
    }

    // Closed components with negative volume are inside out.
    let (labels, count) = mesh.components();
    let mut volume = vec![0.0f64; count];
    let mut closed = vec![true; count];
    for (fi, tri) in mesh.triangles.iter().enumerate() {
        volume[labels[fi]] += mesh.signed_tet_volume(fi);
        for i in 0..3 {
            if edges.get(&edge_key(tri[i], tri[(i + 1) % 3])).map_or(0, Vec::len) != 2 {
                closed[labels[fi]] = false;
            }
        }
    }
    for (fi, tri) in mesh.triangles.iter_mut().enumerate() {
        let c = labels[fi];
        if closed[c] && volume[c] < 0.0 {
            tri.swap(1, 2);
            flipped[fi] = !flipped[fi];
        }
    }

    let count = flipped.iter().filter(|&&f| f).count();
    debug!(flipped = count, "normals made consistent");
    count
}

fn has_directed_edge(tri: &[u32; 3], a: u32, b: u32) -> bool {
    (0..3).any(|i| tri[i] == a && tri[(i + 1) % 3] == b)
}

/// Translate the mesh so its volume centre (bounding-box centre for flat or
/// open meshes) is at the origin. Returns the applied offset.
pub fn center_on_volume(mesh: &mut TriMesh) -> [f64; 3] {
    let Some((min, max)) = mesh.bounds() else {
        return [0.0; 3];
    };

    let mut total = 0.0;
    let mut weighted = [0.0f64; 3];
    for fi in 0..mesh.triangles.len() {
        let vol = mesh.signed_tet_volume(fi);
        let [a, b, c] = mesh.triangles[fi];
        let (pa, pb, pc) = (mesh.position(a), mesh.position(b), mesh.position(c));
        for k in 0..3 {
            weighted[k] += vol * (pa[k] + pb[k] + pc[k]) / 4.0;
        }
        total += vol;
    }

    let centre = if total.abs() > 1e-12 {
        [weighted[0] / total, weighted[1] / total, weighted[2] / total]
    } else {
        [
            (min[0] + max[0]) / 2.0,
            (min[1] + max[1]) / 2.0,
            (min[2] + max[2]) / 2.0,
        ]
    };

    for p in &mut mesh.positions {
        for k in 0..3 {
            p[k] = (p[k] as f64 - centre[k]) as f32;
        }
    }
    debug!(x = centre[0], y = centre[1], z = centre[2], "recentered mesh");
    [-centre[0], -centre[1], -centre[2]]
}
