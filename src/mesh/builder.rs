//! Half-edge graph construction with winding repair.
//!
//! [`build_graph`] converts a [`TriMesh`] into a [`HalfEdgeGraph`] in two
//! phases. The first phase allocates one graph-vertex per real mesh vertex
//! and three half-edges plus one graph-face per triangle, pairing the two
//! half-edges of every undirected edge through a hash map keyed by the
//! unordered endpoint pair — adjacency is reconstructed in `O(F)` without
//! scanning face pairs. The second phase seeds the first face as oriented and
//! propagates a consistent winding outward across `flip` links, physically
//! reversing faces that disagree with an oriented neighbor.
//!
//! The propagation runs on an explicit stack, so deep face chains cannot
//! overflow the call stack. Input that cannot be consistently oriented
//! (non-orientable surfaces), edges with more than two incident faces, and
//! faces unreachable from the seed (disconnected components) are reported as
//! errors rather than left half-repaired.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use nalgebra::Vector3;

use super::graph::{GraphFace, GraphVertex, HalfEdge, HalfEdgeGraph};
use super::index::{FaceId, HalfEdgeId, VertexId};
use super::trimesh::TriMesh;
use crate::error::{MeshError, Result};

/// Unordered hash key for an undirected edge between external indices.
#[inline]
fn edge_key(a: usize, b: usize) -> (usize, usize) {
    debug_assert_ne!(a, b);
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Build a half-edge graph from a face-vertex mesh.
///
/// The mesh's faces need not be consistently wound: winding is repaired
/// outward from the first face. The graph borrows nothing from the mesh; it
/// copies positions and records each external index, and is intended to be
/// dropped once the computation that needed it finishes.
///
/// # Errors
///
/// - [`MeshError::NonManifoldEdge`] if an edge has more than two incident
///   faces
/// - [`MeshError::NonOrientable`] if winding repair finds two faces that
///   cannot agree
/// - [`MeshError::Disconnected`] if any face is unreachable from the first
///   (call per connected component if disconnected input is expected)
///
/// # Example
///
/// ```
/// use fairing::mesh::{build_graph, TriMesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::origin(), // sentinel
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let mesh = TriMesh::new(vertices, vec![[1, 2, 3]]).unwrap();
///
/// let graph = build_graph(&mesh).unwrap();
/// assert_eq!(graph.num_vertices(), 3);
/// assert_eq!(graph.num_halfedges(), 3);
/// assert!(graph.is_consistent());
/// ```
pub fn build_graph(mesh: &TriMesh) -> Result<HalfEdgeGraph> {
    let mut graph = HalfEdgeGraph::default();

    // Graph-vertices mirror the real mesh vertices; arena slot i-1 holds
    // external index i.
    graph.vertices.reserve(mesh.num_vertices());
    for i in mesh.vertex_indices() {
        graph.vertices.push(GraphVertex {
            position: *mesh.position(i),
            index: i,
            out: HalfEdgeId::invalid(),
        });
    }

    graph.halfedges.reserve(mesh.num_faces() * 3);
    graph.faces.reserve(mesh.num_faces());

    let mut edge_map: HashMap<(usize, usize), HalfEdgeId> =
        HashMap::with_capacity(mesh.num_faces() * 3 / 2);

    for face in mesh.faces() {
        let base = graph.halfedges.len();
        let edges = [
            HalfEdgeId::new(base),
            HalfEdgeId::new(base + 1),
            HalfEdgeId::new(base + 2),
        ];
        let fid = FaceId::new(graph.faces.len());

        // Half-edge k points to corner k and spans the undirected edge
        // between corners k and k+1.
        for k in 0..3 {
            let head = VertexId::new(face[k] - 1);
            graph.halfedges.push(HalfEdge {
                vertex: head,
                face: fid,
                next: edges[(k + 1) % 3],
                flip: HalfEdgeId::invalid(),
            });
            graph.vertices[head.index()].out = edges[k];
        }
        graph.faces.push(GraphFace {
            edge: edges[0],
            oriented: false,
        });

        for k in 0..3 {
            let key = edge_key(face[k], face[(k + 1) % 3]);
            match edge_map.entry(key) {
                Entry::Occupied(entry) => {
                    let other = *entry.get();
                    if graph.halfedges[other.index()].flip.is_valid() {
                        return Err(MeshError::NonManifoldEdge { v0: key.0, v1: key.1 });
                    }
                    graph.halfedges[other.index()].flip = edges[k];
                    graph.halfedges[edges[k].index()].flip = other;
                }
                Entry::Vacant(entry) => {
                    entry.insert(edges[k]);
                }
            }
        }
    }

    orient_faces(&mut graph)?;

    debug_assert!(graph.is_consistent());
    Ok(graph)
}

/// Propagate a consistent winding outward from the first face.
fn orient_faces(graph: &mut HalfEdgeGraph) -> Result<()> {
    graph.faces[0].oriented = true;
    let mut stack = vec![FaceId::new(0)];

    while let Some(f) = stack.pop() {
        for he in graph.face_halfedges(f) {
            let flip = graph.flip(he);
            if !flip.is_valid() {
                continue; // boundary edge, nothing across it
            }

            let neighbor = graph.face_of(flip);
            // Opposing half-edges of a consistently wound edge point to
            // different endpoints; equal heads mean the faces disagree.
            let same_head = graph.head(flip) == graph.head(he);

            if graph.face(neighbor).oriented {
                if same_head {
                    return Err(MeshError::NonOrientable {
                        face: neighbor.index(),
                    });
                }
            } else {
                if same_head {
                    reverse_face(graph, neighbor);
                }
                graph.faces[neighbor.index()].oriented = true;
                stack.push(neighbor);
            }
        }
    }

    let unreached = graph.faces.iter().filter(|f| !f.oriented).count();
    if unreached > 0 {
        return Err(MeshError::Disconnected { unreached });
    }
    Ok(())
}

/// Physically reverse a face's winding.
///
/// Each half-edge stays on its own undirected edge (so existing `flip`
/// pairings remain valid) but points to the opposite endpoint, and the `next`
/// cycle is rebuilt in the opposite rotational order.
fn reverse_face(graph: &mut HalfEdgeGraph, f: FaceId) {
    let [e0, e1, e2] = graph.face_halfedges(f);
    let h0 = graph.head(e0);
    let h1 = graph.head(e1);
    let h2 = graph.head(e2);

    // e_k spans {h_k, h_{k+1}}; its new head is its old next's head, and its
    // new next is its old predecessor.
    {
        let he = &mut graph.halfedges[e0.index()];
        he.vertex = h1;
        he.next = e2;
    }
    {
        let he = &mut graph.halfedges[e1.index()];
        he.vertex = h2;
        he.next = e0;
    }
    {
        let he = &mut graph.halfedges[e2.index()];
        he.vertex = h0;
        he.next = e1;
    }

    // Refresh ring entry points for the three corners.
    graph.vertices[h0.index()].out = e2;
    graph.vertices[h1.index()].out = e0;
    graph.vertices[h2.index()].out = e1;
}

/// Compute area-weighted vertex normals for a mesh.
///
/// Builds a transient half-edge graph, accumulates each vertex's one-ring
/// face normals weighted by face area, and returns the results in the mesh's
/// sentinel-padded 1-indexed layout (slot 0 is zero). The normals are left
/// unnormalized; scale to unit length if a caller needs direction only.
pub fn vertex_normals(mesh: &TriMesh) -> Result<Vec<Vector3<f64>>> {
    let graph = build_graph(mesh)?;

    let mut normals = vec![Vector3::zeros(); mesh.num_vertices() + 1];
    for v in graph.vertex_ids() {
        normals[graph.vertex(v).index] = graph.vertex_normal(v);
    }
    Ok(normals)
}
