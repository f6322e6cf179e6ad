//! Implicit mesh fairing.
//!
//! Fairing smooths a mesh by one or more backward-Euler diffusion steps: each
//! step solves `(I - h * L) x_h = x_0` for the three coordinate channels,
//! where `L` is the cotangent-weighted Laplace-Beltrami operator assembled in
//! [`operator`]. Solving the implicit system instead of stepping explicitly
//! keeps the flow stable for large time steps, at the cost of a linear solve
//! per step.
//!
//! A step is strictly sequential: build the half-edge graph, assemble the
//! operator, solve the x/y/z systems, write the positions back, drop the
//! graph. The three channels decouple because the operator depends only on
//! connectivity and geometry, not on which coordinate is being diffused. If a
//! solve fails, the mesh is left untouched for that step. Boundary vertices
//! do not move (their operator rows are pinned).
//!
//! Independent meshes are faired in parallel by [`fair_all`]; steps of a
//! single mesh can never be, since each step reads the previous step's
//! output.
//!
//! # Example
//!
//! ```
//! use fairing::{fair, FairOptions};
//! use fairing::mesh::TriMesh;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::origin(), // sentinel slot
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//! let faces = vec![[1, 3, 2], [1, 2, 4], [2, 3, 4], [3, 1, 4]];
//! let mut mesh = TriMesh::new(vertices, faces).unwrap();
//!
//! let options = FairOptions::default().with_time_step(0.05);
//! fair(&mut mesh, &options).unwrap();
//! ```
//!
//! # Reference
//!
//! Desbrun, M., et al. (1999). "Implicit fairing of irregular meshes using
//! diffusion and curvature flow." SIGGRAPH 99.

mod operator;
mod sparse;

pub use operator::assemble_operator;
pub use sparse::{bicgstab, CsrMatrix};

use nalgebra::{DVector, Point3};
use rayon::prelude::*;

use crate::error::{MeshError, Result};
use crate::mesh::{build_graph, TriMesh};

/// Options for implicit fairing.
#[derive(Debug, Clone)]
pub struct FairOptions {
    /// Diffusion time step `h`. Larger values smooth more aggressively per
    /// step. Must be finite and non-negative; `h = 0` is the identity step.
    pub time_step: f64,

    /// Number of fairing steps. Each step rebuilds connectivity from the
    /// previous step's output.
    pub steps: usize,

    /// Iteration budget for the linear solver, per coordinate channel.
    pub max_iterations: usize,

    /// Relative residual tolerance for the linear solver.
    pub tolerance: f64,

    /// Whether [`fair_all`] fairs meshes of a batch in parallel.
    pub parallel: bool,
}

impl Default for FairOptions {
    fn default() -> Self {
        Self {
            time_step: 0.001,
            steps: 1,
            max_iterations: 1000,
            tolerance: 1e-10,
            parallel: true,
        }
    }
}

impl FairOptions {
    /// Set the diffusion time step.
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Set the number of fairing steps.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Set the solver iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the solver tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set whether batch fairing runs in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded batch execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Fair a mesh in place.
///
/// Runs `options.steps` implicit diffusion steps of size `options.time_step`.
/// Face topology is never changed; only vertex positions move. On error the
/// mesh keeps the positions of the last completed step (the original
/// positions if the first step fails), so a caller can retry with a smaller
/// time step.
///
/// # Errors
///
/// Any [`MeshError`] from graph construction (non-manifold, non-orientable,
/// or disconnected input), [`MeshError::InvalidParameter`] for a negative or
/// non-finite time step, and [`MeshError::SingularSystem`] /
/// [`MeshError::ConvergenceFailed`] from the solver.
pub fn fair(mesh: &mut TriMesh, options: &FairOptions) -> Result<()> {
    if !options.time_step.is_finite() || options.time_step < 0.0 {
        return Err(MeshError::invalid_param(
            "time_step",
            options.time_step,
            "must be finite and non-negative",
        ));
    }

    for _ in 0..options.steps {
        fair_step(mesh, options)?;
    }
    Ok(())
}

/// One implicit diffusion step.
fn fair_step(mesh: &mut TriMesh, options: &FairOptions) -> Result<()> {
    let graph = build_graph(mesh)?;
    let f = assemble_operator(&graph, options.time_step);
    let n = graph.num_vertices();

    let channel = |pick: fn(&Point3<f64>) -> f64| -> DVector<f64> {
        DVector::from_fn(n, |i, _| pick(mesh.position(i + 1)))
    };
    let x0 = channel(|p| p.x);
    let y0 = channel(|p| p.y);
    let z0 = channel(|p| p.z);

    // The current positions warm-start the solver: for small h the solution
    // stays near them, and for h = 0 they are exact.
    let xh = bicgstab(&f, &x0, Some(&x0), options.max_iterations, options.tolerance)?;
    let yh = bicgstab(&f, &y0, Some(&y0), options.max_iterations, options.tolerance)?;
    let zh = bicgstab(&f, &z0, Some(&z0), options.max_iterations, options.tolerance)?;

    // All three channels solved; only now touch the mesh.
    for i in 1..=n {
        mesh.set_position(i, Point3::new(xh[i - 1], yh[i - 1], zh[i - 1]));
    }

    // The graph goes out of scope here; the next step rebuilds it from the
    // updated positions.
    Ok(())
}

/// Fair a batch of independent meshes.
///
/// Meshes are independent, so the batch is faired in parallel unless
/// `options.parallel` is false. The first error encountered is returned;
/// every mesh is individually either fully stepped or untouched, as in
/// [`fair`].
pub fn fair_all(meshes: &mut [TriMesh], options: &FairOptions) -> Result<()> {
    if options.parallel {
        meshes.par_iter_mut().try_for_each(|mesh| fair(mesh, options))
    } else {
        meshes.iter_mut().try_for_each(|mesh| fair(mesh, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn unit_tetrahedron() -> TriMesh {
        let vertices = vec![
            Point3::origin(),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let faces = vec![[1, 3, 2], [1, 2, 4], [2, 3, 4], [3, 1, 4]];
        TriMesh::new(vertices, faces).unwrap()
    }

    fn regular_tetrahedron() -> TriMesh {
        let vertices = vec![
            Point3::origin(),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(1.0, -1.0, -1.0),
            Point3::new(-1.0, 1.0, -1.0),
            Point3::new(-1.0, -1.0, 1.0),
        ];
        // winding need not be consistent; construction repairs it
        let faces = vec![[1, 2, 3], [1, 2, 4], [1, 3, 4], [2, 3, 4]];
        TriMesh::new(vertices, faces).unwrap()
    }

    /// Octahedron subdivided once and projected to the unit sphere.
    fn sphere_mesh() -> TriMesh {
        let mut verts: Vec<Point3<f64>> = vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(-1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, -1.0),
        ];
        let coarse: Vec<[usize; 3]> = vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ];

        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |verts: &mut Vec<Point3<f64>>, a: usize, b: usize| -> usize {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let m = Point3::from((verts[a].coords + verts[b].coords) * 0.5);
                verts.push(m);
                verts.len() - 1
            })
        };

        let mut faces = Vec::with_capacity(coarse.len() * 4);
        for [a, b, c] in coarse {
            let ab = midpoint(&mut verts, a, b);
            let bc = midpoint(&mut verts, b, c);
            let ca = midpoint(&mut verts, c, a);
            faces.push([a, ab, ca]);
            faces.push([ab, b, bc]);
            faces.push([ca, bc, c]);
            faces.push([ab, bc, ca]);
        }

        for p in &mut verts {
            *p = Point3::from(p.coords.normalize());
        }

        // shift to the 1-indexed sentinel layout
        let mut vertices = vec![Point3::origin()];
        vertices.extend(verts);
        let faces = faces
            .into_iter()
            .map(|[a, b, c]| [a + 1, b + 1, c + 1])
            .collect();
        TriMesh::new(vertices, faces).unwrap()
    }

    fn pairwise_distances(mesh: &TriMesh) -> Vec<f64> {
        let n = mesh.num_vertices();
        let mut out = Vec::new();
        for i in 1..=n {
            for j in (i + 1)..=n {
                out.push((mesh.position(i) - mesh.position(j)).norm());
            }
        }
        out
    }

    #[test]
    fn test_zero_time_step_is_identity() {
        let mut mesh = unit_tetrahedron();
        let original: Vec<Point3<f64>> =
            mesh.vertex_indices().map(|i| *mesh.position(i)).collect();

        let options = FairOptions::default().with_time_step(0.0);
        fair(&mut mesh, &options).unwrap();

        for (i, orig) in mesh.vertex_indices().zip(original.iter()) {
            assert!(
                (mesh.position(i) - orig).norm() < 1e-9,
                "vertex {} moved under h = 0",
                i
            );
        }
    }

    #[test]
    fn test_regular_tetrahedron_stays_regular() {
        let mut mesh = regular_tetrahedron();
        let before = pairwise_distances(&mesh);

        let options = FairOptions::default().with_time_step(0.5);
        fair(&mut mesh, &options).unwrap();

        let after = pairwise_distances(&mesh);

        // the symmetry group fixes the operator, so all six distances stay
        // mutually equal...
        let first = after[0];
        for d in &after {
            assert!(
                (d - first).abs() < 1e-6 * first,
                "distances diverged: {} vs {}",
                d,
                first
            );
        }
        // ...and the flow contracts the mesh toward its centroid
        assert!(after[0] < before[0]);
    }

    #[test]
    fn test_flat_quad_stays_planar() {
        let vertices = vec![
            Point3::origin(),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let faces = vec![[1, 2, 3], [1, 3, 4]];
        let mut mesh = TriMesh::new(vertices, faces).unwrap();

        let options = FairOptions::default().with_time_step(0.01);
        fair(&mut mesh, &options).unwrap();

        for i in mesh.vertex_indices() {
            assert!(
                mesh.position(i).z.abs() < 1e-9,
                "vertex {} left the plane",
                i
            );
        }
    }

    #[test]
    fn test_noisy_sphere_smooths() {
        let mut mesh = sphere_mesh();

        // deterministic radial bumps
        for i in mesh.vertex_indices().collect::<Vec<_>>() {
            let bump = 1.0 + 0.15 * (i as f64 * 3.7).sin();
            let p = *mesh.position(i);
            mesh.set_position(i, Point3::from(p.coords * bump));
        }

        let radius_variance = |mesh: &TriMesh| -> f64 {
            let c = mesh.centroid().unwrap();
            let radii: Vec<f64> = mesh
                .vertex_indices()
                .map(|i| (mesh.position(i) - c).norm())
                .collect();
            let mean = radii.iter().sum::<f64>() / radii.len() as f64;
            radii.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / radii.len() as f64
        };

        let before = radius_variance(&mesh);
        let options = FairOptions::default().with_time_step(0.5);
        fair(&mut mesh, &options).unwrap();
        let after = radius_variance(&mesh);

        assert!(
            after < before,
            "fairing did not reduce radius variance: {} -> {}",
            before,
            after
        );
    }

    #[test]
    fn test_multiple_steps_compose() {
        let mut stepped = sphere_mesh();
        let mut composed = sphere_mesh();

        let one = FairOptions::default().with_time_step(0.1);
        fair(&mut stepped, &one).unwrap();
        fair(&mut stepped, &one).unwrap();

        let two = FairOptions::default().with_time_step(0.1).with_steps(2);
        fair(&mut composed, &two).unwrap();

        for i in stepped.vertex_indices() {
            assert!((stepped.position(i) - composed.position(i)).norm() < 1e-8);
        }
    }

    #[test]
    fn test_invalid_time_step_rejected() {
        let mut mesh = unit_tetrahedron();

        let negative = FairOptions::default().with_time_step(-0.1);
        assert!(matches!(
            fair(&mut mesh, &negative),
            Err(MeshError::InvalidParameter { name: "time_step", .. })
        ));

        let nan = FairOptions::default().with_time_step(f64::NAN);
        assert!(fair(&mut mesh, &nan).is_err());
    }

    #[test]
    fn test_failed_step_leaves_mesh_unchanged() {
        // disconnected input fails in graph construction, after which the
        // positions must be exactly as they were
        let vertices = vec![
            Point3::origin(),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
            Point3::new(11.0, 0.0, 0.0),
            Point3::new(10.5, 1.0, 0.0),
        ];
        let faces = vec![[1, 2, 3], [4, 5, 6]];
        let mut mesh = TriMesh::new(vertices.clone(), faces).unwrap();

        let options = FairOptions::default().with_time_step(0.1);
        assert!(fair(&mut mesh, &options).is_err());

        for i in mesh.vertex_indices() {
            assert_eq!(mesh.position(i), &vertices[i]);
        }
    }

    #[test]
    fn test_batch_matches_single() {
        let options = FairOptions::default().with_time_step(0.2);

        let mut single = regular_tetrahedron();
        fair(&mut single, &options).unwrap();

        let mut batch = vec![regular_tetrahedron(), regular_tetrahedron()];
        fair_all(&mut batch, &options).unwrap();

        let mut sequential = vec![regular_tetrahedron(), regular_tetrahedron()];
        fair_all(&mut sequential, &options.clone().sequential()).unwrap();

        for mesh in batch.iter().chain(sequential.iter()) {
            for i in mesh.vertex_indices() {
                assert!((mesh.position(i) - single.position(i)).norm() < 1e-9);
            }
        }
    }
}
