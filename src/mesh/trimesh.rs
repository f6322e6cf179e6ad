//! External face-vertex mesh representation.
//!
//! [`TriMesh`] is the representation handed across the crate boundary: a flat
//! list of vertex positions and a flat list of triangles. It follows the
//! 1-indexed convention of OBJ-style tooling — **slot 0 of the vertex array
//! is an unused sentinel**, and face corners index from 1.
//!
//! Topology is validated once at construction and immutable afterwards; only
//! positions can change. Fairing mutates positions in place and never touches
//! the face list.

use nalgebra::Point3;

use crate::error::{MeshError, Result};

/// A triangle mesh in face-vertex form, 1-indexed with a sentinel slot 0.
///
/// # Example
///
/// ```
/// use fairing::mesh::TriMesh;
/// use nalgebra::Point3;
///
/// // Slot 0 is a sentinel; real vertices start at index 1.
/// let vertices = vec![
///     Point3::origin(), // sentinel
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[1, 2, 3]];
///
/// let mesh = TriMesh::new(vertices, faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct TriMesh {
    /// Vertex positions; `vertices[0]` is the unused sentinel.
    vertices: Vec<Point3<f64>>,
    /// Triangles as 1-indexed vertex triples.
    faces: Vec<[usize; 3]>,
}

impl TriMesh {
    /// Create a mesh from a sentinel-padded vertex list and 1-indexed faces.
    ///
    /// The face list is validated here, before any connectivity work: every
    /// corner must reference an existing vertex slot in `1..vertices.len()`,
    /// and the three corners of a face must be distinct.
    ///
    /// # Errors
    ///
    /// - [`MeshError::EmptyMesh`] if `faces` is empty
    /// - [`MeshError::InvalidVertexIndex`] for an out-of-range (or sentinel)
    ///   corner index
    /// - [`MeshError::DegenerateFace`] for a face with repeated corners
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Result<Self> {
        if faces.is_empty() {
            return Err(MeshError::EmptyMesh);
        }

        for (fi, face) in faces.iter().enumerate() {
            for &vi in face {
                if vi == 0 || vi >= vertices.len() {
                    return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
                }
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                return Err(MeshError::DegenerateFace { face: fi });
            }
        }

        Ok(Self { vertices, faces })
    }

    /// Number of real vertices (the sentinel slot is not counted).
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    /// Number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get the position of vertex `i` (1-indexed).
    #[inline]
    pub fn position(&self, i: usize) -> &Point3<f64> {
        debug_assert!(i >= 1, "vertex index 0 is the sentinel slot");
        &self.vertices[i]
    }

    /// Set the position of vertex `i` (1-indexed).
    #[inline]
    pub fn set_position(&mut self, i: usize, pos: Point3<f64>) {
        debug_assert!(i >= 1, "vertex index 0 is the sentinel slot");
        self.vertices[i] = pos;
    }

    /// The full position array, sentinel slot included.
    #[inline]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// The face list (1-indexed corner triples).
    #[inline]
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Iterate over real vertex indices, `1..=num_vertices()`.
    pub fn vertex_indices(&self) -> impl Iterator<Item = usize> {
        1..self.vertices.len()
    }

    /// Centroid of the real vertices, or `None` for a vertex-free mesh.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        let n = self.num_vertices();
        if n == 0 {
            return None;
        }
        let sum = self.vertices[1..]
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords);
        Some(Point3::from(sum / n as f64))
    }
}
