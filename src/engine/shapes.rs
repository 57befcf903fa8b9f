// Procedural target shapes for the particle cloud.
// Each generator fills a fixed-size flat buffer (x, y, z per particle).

use std::f32::consts::PI;
use std::sync::Arc;

use rand::Rng;

/// Number of particles in every shape. Never changes at runtime.
pub const PARTICLE_COUNT: usize = 15_000;

/// Scalar length of a point buffer: three floats per particle.
pub const POINT_SCALARS: usize = PARTICLE_COUNT * 3;

// ============================================================================
// POINT SET
// ============================================================================

/// Fixed-length flat buffer of particle positions.
///
/// Always holds exactly `POINT_SCALARS` floats. There is no way to push or
/// truncate; shapes are built whole and swapped whole.
#[derive(Clone, PartialEq)]
pub struct PointSet {
    data: Box<[f32]>,
}

impl PointSet {
    /// All particles at the origin.
    pub fn zeroed() -> Self {
        Self { data: vec![0.0; POINT_SCALARS].into_boxed_slice() }
    }

    /// Build a point set by evaluating `f` once per particle index.
    pub fn from_fn(mut f: impl FnMut(usize) -> [f32; 3]) -> Self {
        let mut data = Vec::with_capacity(POINT_SCALARS);
        for i in 0..PARTICLE_COUNT {
            data.extend_from_slice(&f(i));
        }
        Self { data: data.into_boxed_slice() }
    }

    pub fn as_slice(&self) -> &[f32] { &self.data }

    pub fn as_mut_slice(&mut self) -> &mut [f32] { &mut self.data }

    pub fn len(&self) -> usize { self.data.len() }

    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Position of particle `i`.
    pub fn point(&self, i: usize) -> [f32; 3] {
        let i3 = i * 3;
        [self.data[i3], self.data[i3 + 1], self.data[i3 + 2]]
    }

    pub fn points(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        self.data.chunks_exact(3).map(|c| [c[0], c[1], c[2]])
    }

    pub fn all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

impl std::fmt::Debug for PointSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointSet").field("particles", &(self.data.len() / 3)).finish()
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

/// Spiral cone: height in [-10, 10], radius tapering towards the top.
pub fn generate_tree<R: Rng + ?Sized>(rng: &mut R) -> PointSet {
    PointSet::from_fn(|i| {
        let y = rng.gen_range(-10.0..10.0_f32);
        let radius = (10.0 - y) * 0.4 * rng.r#gen::<f32>();
        // Index term sweeps particles around; height term twists them into bands.
        let angle = i as f32 * 0.1 + y * 2.0;
        [angle.cos() * radius, y, angle.sin() * radius]
    })
}

/// Thick spherical shell, radius in [15, 40), uniform over directions.
pub fn generate_explode<R: Rng + ?Sized>(rng: &mut R) -> PointSet {
    PointSet::from_fn(|_| {
        let theta = rng.r#gen::<f32>() * PI * 2.0;
        // acos(2u - 1), not uniform phi, or points bunch at the poles.
        let phi = (rng.r#gen::<f32>() * 2.0 - 1.0).clamp(-1.0, 1.0).acos();
        let r = rng.gen_range(15.0..40.0_f32);
        [
            r * phi.sin() * theta.cos(),
            r * phi.sin() * theta.sin(),
            r * phi.cos(),
        ]
    })
}

// ============================================================================
// SHAPE LIBRARY
// ============================================================================

/// The fixed shapes, generated once at startup and shared by reference.
#[derive(Clone)]
pub struct ShapeLibrary {
    pub tree: Arc<PointSet>,
    pub explode: Arc<PointSet>,
}

impl ShapeLibrary {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            tree: Arc::new(generate_tree(rng)),
            explode: Arc::new(generate_explode(rng)),
        }
    }
}
