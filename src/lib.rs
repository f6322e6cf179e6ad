//! # Fairing
//!
//! Implicit fairing of triangle meshes via the discrete cotangent Laplacian.
//!
//! The crate takes a face-vertex triangle mesh, builds a half-edge
//! connectivity graph (repairing inconsistent face winding along the way),
//! assembles the backward-Euler smoothing operator `F = I - h * L` from
//! cotangent edge weights, solves the three coordinate channels, and writes
//! the smoothed positions back into the mesh. Face topology never changes.
//!
//! ## Features
//!
//! - **Half-edge graph**: O(1) adjacency traversal over an index-addressed
//!   arena, built fresh per smoothing step
//! - **Winding repair**: faces are re-oriented consistently from a seed face;
//!   non-orientable and non-manifold input is rejected, not half-fixed
//! - **Implicit integration**: one sparse solve per step buys stability at
//!   large time steps
//! - **Typed errors**: malformed input, degenerate geometry, and solver
//!   failure are distinct [`MeshError`](error::MeshError) variants
//!
//! ## Quick Start
//!
//! ```
//! use fairing::prelude::*;
//! use nalgebra::Point3;
//!
//! // A tetrahedron in the 1-indexed convention: slot 0 is a sentinel.
//! let vertices = vec![
//!     Point3::origin(),
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//! let faces = vec![[1, 3, 2], [1, 2, 4], [2, 3, 4], [3, 1, 4]];
//! let mut mesh = TriMesh::new(vertices, faces).unwrap();
//!
//! // One implicit smoothing step.
//! let options = FairOptions::default().with_time_step(0.01);
//! fair(&mut mesh, &options).unwrap();
//!
//! assert_eq!(mesh.num_faces(), 4); // topology untouched
//! ```
//!
//! ## Connectivity Queries
//!
//! The half-edge graph is also usable on its own:
//!
//! ```
//! use fairing::prelude::*;
//! use nalgebra::Point3;
//!
//! # let vertices = vec![
//! #     Point3::origin(),
//! #     Point3::new(0.0, 0.0, 0.0),
//! #     Point3::new(1.0, 0.0, 0.0),
//! #     Point3::new(0.5, 1.0, 0.0),
//! # ];
//! # let mesh = TriMesh::new(vertices, vec![[1, 2, 3]]).unwrap();
//! let graph = build_graph(&mesh).unwrap();
//! for f in graph.face_ids() {
//!     let area2 = graph.face_area(f); // twice the triangle area
//!     assert!(area2 > 0.0);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod fair;
pub mod mesh;

pub use fair::{fair, fair_all, FairOptions};

/// Prelude module for convenient imports.
///
/// ```
/// use fairing::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{MeshError, Result};
    pub use crate::fair::{fair, fair_all, FairOptions};
    pub use crate::mesh::{
        build_graph, vertex_normals, FaceId, HalfEdgeGraph, HalfEdgeId, TriMesh, VertexId,
    };
}

// Re-export nalgebra so downstream code can match the crate's vector types.
pub use nalgebra;
