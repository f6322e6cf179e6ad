//! Half-edge graph data structure.
//!
//! The graph is the connectivity representation the fairing solver works on.
//! Each mesh edge is split into two directed **half-edges**, one per adjacent
//! face; a half-edge knows the vertex it points to (`vertex`), the face it
//! borders (`face`), the next half-edge around that face (`next`), and the
//! opposing half-edge of the same undirected edge (`flip`). Boundary edges
//! have no opposing face, so their `flip` is the invalid sentinel.
//!
//! Elements live in flat arenas addressed by [`VertexId`], [`HalfEdgeId`],
//! and [`FaceId`]; dropping the graph releases everything at once. A graph is
//! step-scoped working storage: it is built fresh from a
//! [`TriMesh`](super::TriMesh) by [`build_graph`](super::build_graph) and
//! discarded when the step that built it finishes.
//!
//! # Invariants
//!
//! For a successfully built graph:
//!
//! - following `next` three times from any half-edge returns to it
//! - `flip` is an involution: `flip(flip(he)) == he`
//! - the two half-edges of an interior edge point to *different* endpoints
//!   (consistent winding of the two adjacent faces)

use nalgebra::{Point3, Vector3};

use super::index::{FaceId, HalfEdgeId, VertexId};

/// A vertex of the half-edge graph.
#[derive(Debug, Clone)]
pub struct GraphVertex {
    /// The 3D position, copied from the external mesh.
    pub position: Point3<f64>,

    /// The external (1-indexed) vertex slot this graph-vertex mirrors.
    pub index: usize,

    /// One incident half-edge whose head is this vertex; the entry point for
    /// one-ring walks. The vertex does not own its half-edges.
    pub out: HalfEdgeId,
}

/// A directed half-edge, owned by exactly one face.
#[derive(Debug, Clone, Copy)]
pub struct HalfEdge {
    /// The vertex this half-edge points to (its head).
    pub vertex: VertexId,

    /// The face this half-edge borders.
    pub face: FaceId,

    /// The next half-edge counter-clockwise around `face`.
    pub next: HalfEdgeId,

    /// The opposing half-edge of the same undirected edge, belonging to the
    /// adjacent face. Invalid for boundary edges.
    pub flip: HalfEdgeId,
}

/// A face of the half-edge graph.
#[derive(Debug, Clone, Copy)]
pub struct GraphFace {
    /// One half-edge belonging to this face.
    pub edge: HalfEdgeId,

    /// Winding-repair mark; only meaningful during construction.
    pub(crate) oriented: bool,
}

/// A half-edge connectivity graph for a triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct HalfEdgeGraph {
    pub(crate) vertices: Vec<GraphVertex>,
    pub(crate) halfedges: Vec<HalfEdge>,
    pub(crate) faces: Vec<GraphFace>,
}

impl HalfEdgeGraph {
    // ==================== Accessors ====================

    /// Number of graph-vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.halfedges.len()
    }

    /// Number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get a graph-vertex by id.
    #[inline]
    pub fn vertex(&self, id: VertexId) -> &GraphVertex {
        &self.vertices[id.index()]
    }

    /// Get a half-edge by id.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId) -> &HalfEdge {
        &self.halfedges[id.index()]
    }

    /// Get a face by id.
    #[inline]
    pub fn face(&self, id: FaceId) -> &GraphFace {
        &self.faces[id.index()]
    }

    /// Position of a graph-vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> &Point3<f64> {
        &self.vertex(v).position
    }

    // ==================== Topology ====================

    /// The head of a half-edge: the vertex it points to.
    #[inline]
    pub fn head(&self, he: HalfEdgeId) -> VertexId {
        self.halfedge(he).vertex
    }

    /// The next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.halfedge(he).next
    }

    /// The opposing half-edge, invalid for boundary edges.
    #[inline]
    pub fn flip(&self, he: HalfEdgeId) -> HalfEdgeId {
        self.halfedge(he).flip
    }

    /// The face a half-edge borders.
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId) -> FaceId {
        self.halfedge(he).face
    }

    /// The two endpoints of a half-edge's undirected edge: its head and the
    /// head of its `next` (the tail).
    #[inline]
    pub fn endpoints(&self, he: HalfEdgeId) -> (VertexId, VertexId) {
        (self.head(he), self.head(self.next(he)))
    }

    /// Check if a half-edge lies on the mesh boundary (no opposing face).
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId) -> bool {
        !self.flip(he).is_valid()
    }

    /// Iterate over all vertex ids.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        (0..self.vertices.len()).map(VertexId::new)
    }

    /// Iterate over all half-edge ids.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId> + '_ {
        (0..self.halfedges.len()).map(HalfEdgeId::new)
    }

    /// Iterate over all face ids.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// The three half-edges of a face, in cycle order.
    pub fn face_halfedges(&self, f: FaceId) -> [HalfEdgeId; 3] {
        let he0 = self.face(f).edge;
        let he1 = self.next(he0);
        let he2 = self.next(he1);
        [he0, he1, he2]
    }

    /// The three corner vertices of a face, in winding order.
    pub fn face_triangle(&self, f: FaceId) -> [VertexId; 3] {
        let [he0, he1, he2] = self.face_halfedges(f);
        [self.head(he0), self.head(he1), self.head(he2)]
    }

    /// Iterate over the half-edges pointing to `v`, one per adjacent face.
    ///
    /// The walk is `he = next(flip(he))` starting from `out`. For an interior
    /// vertex it visits the whole one-ring; at a boundary vertex it stops at
    /// the first gap, yielding a partial ring.
    pub fn vertex_ring(&self, v: VertexId) -> RingIter<'_> {
        RingIter::new(self, v)
    }

    /// Number of faces adjacent to `v` reachable by the ring walk.
    pub fn valence(&self, v: VertexId) -> usize {
        self.vertex_ring(v).count()
    }

    /// Flag per arena slot: does the vertex touch a boundary edge?
    pub fn boundary_vertices(&self) -> Vec<bool> {
        let mut boundary = vec![false; self.vertices.len()];
        for he in self.halfedge_ids() {
            if self.is_boundary_halfedge(he) {
                let (a, b) = self.endpoints(he);
                boundary[a.index()] = true;
                boundary[b.index()] = true;
            }
        }
        boundary
    }

    // ==================== Geometry ====================

    /// Unnormalized face normal: `(v2 - v1) × (v3 - v1)` over the corners in
    /// winding order. Its magnitude is twice the triangle's area.
    pub fn face_normal(&self, f: FaceId) -> Vector3<f64> {
        let [v1, v2, v3] = self.face_triangle(f);
        let p1 = self.position(v1);
        let p2 = self.position(v2);
        let p3 = self.position(v3);
        (p2 - p1).cross(&(p3 - p1))
    }

    /// Face area measure: the norm of [`face_normal`](Self::face_normal),
    /// i.e. twice the triangle's area (the parallelogram area). The fairing
    /// operator accumulates this measure directly, so it is kept undivided.
    pub fn face_area(&self, f: FaceId) -> f64 {
        self.face_normal(f).norm()
    }

    /// Area-weighted vertex normal, left unnormalized.
    ///
    /// Each one-ring face contributes its unnormalized normal scaled by its
    /// [`face_area`](Self::face_area), so larger adjacent triangles dominate.
    /// Callers that need a unit normal normalize explicitly.
    pub fn vertex_normal(&self, v: VertexId) -> Vector3<f64> {
        let mut normal = Vector3::zeros();
        for he in self.vertex_ring(v) {
            let f = self.face_of(he);
            normal += self.face_normal(f) * self.face_area(f);
        }
        normal
    }

    /// Cotangent pair `cot α + cot β` for an interior edge.
    ///
    /// `α` is the angle at the vertex opposite the edge in `he`'s face, `β`
    /// the angle at the opposite vertex in the flipped face. Each cotangent
    /// is computed as `(A·B) / |A×B|` on the vectors from the opposite vertex
    /// to the edge endpoints. Must only be called on interior edges; boundary
    /// edges have no second angle.
    pub fn cot_pair(&self, he: HalfEdgeId) -> f64 {
        debug_assert!(!self.is_boundary_halfedge(he), "cot_pair on boundary edge");

        let v1 = self.head(he);
        let v2 = self.head(self.next(he));
        let v3 = self.head(self.next(self.next(he)));
        let flip = self.flip(he);
        let v4 = self.head(self.next(self.next(flip)));

        let p1 = self.position(v1);
        let p2 = self.position(v2);

        cotangent(self.position(v3), p1, p2) + cotangent(self.position(v4), p1, p2)
    }

    // ==================== Validation ====================

    /// Check all structural invariants: `next` closure, flip symmetry, face
    /// and vertex back-references, and winding consistency across every
    /// interior edge.
    pub fn is_consistent(&self) -> bool {
        for he in self.halfedge_ids() {
            // next^3 closure within one face
            let n1 = self.next(he);
            let n2 = self.next(n1);
            let n3 = self.next(n2);
            if n3 != he {
                return false;
            }
            if self.face_of(n1) != self.face_of(he) {
                return false;
            }

            let flip = self.flip(he);
            if flip.is_valid() {
                if self.flip(flip) != he {
                    return false;
                }
                // opposing half-edges of a consistently wound edge point to
                // different endpoints
                if self.head(flip) == self.head(he) {
                    return false;
                }
            }
        }

        for f in self.face_ids() {
            if self.face_of(self.face(f).edge) != f {
                return false;
            }
        }

        for v in self.vertex_ids() {
            let out = self.vertex(v).out;
            if !out.is_valid() || self.head(out) != v {
                return false;
            }
        }

        true
    }
}

/// Cotangent of the angle at `apex` in the triangle (`apex`, `a`, `b`).
fn cotangent(apex: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let u = a - apex;
    let v = b - apex;

    let cross_norm = u.cross(&v).norm();
    if cross_norm < 1e-12 {
        return 0.0; // degenerate corner
    }

    u.dot(&v) / cross_norm
}

/// Iterator over the half-edges pointing to a vertex, one per adjacent face.
pub struct RingIter<'a> {
    graph: &'a HalfEdgeGraph,
    start: HalfEdgeId,
    current: HalfEdgeId,
    done: bool,
}

impl<'a> RingIter<'a> {
    fn new(graph: &'a HalfEdgeGraph, v: VertexId) -> Self {
        let start = graph.vertex(v).out;
        Self {
            graph,
            start,
            current: start,
            done: !start.is_valid(),
        }
    }
}

impl<'a> Iterator for RingIter<'a> {
    type Item = HalfEdgeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self.current;

        // Step into the adjacent face across the current edge. `flip` points
        // away from the head, so `next(flip)` again points to it.
        let flip = self.graph.flip(self.current);
        if flip.is_valid() {
            self.current = self.graph.next(flip);
            if self.current == self.start {
                self.done = true;
            }
        } else {
            // boundary gap: the ring cannot be closed from here
            self.done = true;
        }

        Some(result)
    }
}
