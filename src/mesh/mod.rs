//! Mesh data structures.
//!
//! Two representations live here, with a one-way conversion between them:
//!
//! - [`TriMesh`] — the external face-vertex form, 1-indexed with a sentinel
//!   slot 0. This is the persistent representation: its vertex positions are
//!   the only state that survives and accumulates change across fairing
//!   steps.
//! - [`HalfEdgeGraph`] — the connectivity form built from a [`TriMesh`] by
//!   [`build_graph`], giving O(1) local adjacency traversal. The graph is
//!   step-scoped working storage, rebuilt from scratch whenever the mesh's
//!   positions have changed; keeping only one long-lived representation
//!   avoids maintaining two views of the connectivity in sync.
//!
//! Elements of the graph are addressed by the type-safe ids [`VertexId`],
//! [`HalfEdgeId`], and [`FaceId`].

mod builder;
mod graph;
mod index;
mod trimesh;

pub use builder::{build_graph, vertex_normals};
pub use graph::{GraphFace, GraphVertex, HalfEdge, HalfEdgeGraph, RingIter};
pub use index::{FaceId, HalfEdgeId, VertexId};
pub use trimesh::TriMesh;
