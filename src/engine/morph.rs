// Particle morph engine.
//
// Two buffers: `current` is owned here and nudged toward `target` every tick;
// `target` is an immutable shared snapshot that is only ever swapped whole.
// Readers of a target never see a half-written shape.

use std::sync::Arc;

use bevy_ecs::prelude::*;

use super::mode::Mode;
use super::shapes::{PointSet, ShapeLibrary};

/// Fraction of the remaining gap closed per tick.
pub const MORPH_RATE: f32 = 0.08;
/// Ambient spin of the whole cloud around Y, radians per tick.
pub const ROTATION_PER_TICK: f32 = 0.001;

/// Pick the shape a mode should morph toward.
///
/// IMAGE without a derived reference falls back to the tree.
pub fn select_target(
    mode: Mode,
    shapes: &ShapeLibrary,
    reference: Option<&Arc<PointSet>>,
) -> Arc<PointSet> {
    match (mode, reference) {
        (Mode::Explode, _) => shapes.explode.clone(),
        (Mode::Image, Some(points)) => points.clone(),
        (Mode::Image, None) | (Mode::Tree, _) => shapes.tree.clone(),
    }
}

/// What the current target was selected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Selection {
    mode: Mode,
    /// Reference image version; only meaningful in IMAGE mode.
    image_version: u64,
}

#[derive(Resource)]
pub struct MorphEngine {
    current: PointSet,
    target: Arc<PointSet>,
    selection: Option<Selection>,
    rate: f32,
    rotation_step: f32,
    rotation: f32,
    ticks: u64,
}

impl MorphEngine {
    /// Start at rest on `initial`.
    pub fn new(initial: Arc<PointSet>) -> Self {
        Self::from_buffers(initial.as_ref().clone(), initial)
    }

    pub fn from_buffers(current: PointSet, target: Arc<PointSet>) -> Self {
        Self {
            current,
            target,
            selection: None,
            rate: MORPH_RATE,
            rotation_step: ROTATION_PER_TICK,
            rotation: 0.0,
            ticks: 0,
        }
    }

    pub fn with_rates(mut self, rate: f32, rotation_step: f32) -> Self {
        self.rate = rate;
        self.rotation_step = rotation_step;
        self
    }

    /// Swap in a new target snapshot.
    pub fn set_target(&mut self, target: Arc<PointSet>) {
        self.target = target;
    }

    /// Re-point the target if the mode (or, in IMAGE mode, the reference
    /// image version) differs from the last selection. Returns true on change.
    pub fn retarget(
        &mut self,
        mode: Mode,
        image_version: u64,
        shapes: &ShapeLibrary,
        reference: Option<&Arc<PointSet>>,
    ) -> bool {
        let selection = Selection {
            mode,
            image_version: if mode == Mode::Image { image_version } else { 0 },
        };
        if self.selection == Some(selection) {
            return false;
        }
        self.selection = Some(selection);
        self.set_target(select_target(mode, shapes, reference));
        true
    }

    /// One frame of integration plus the ambient spin.
    pub fn tick(&mut self) {
        let k = self.rate;
        let target = self.target.as_slice();
        for (c, t) in self.current.as_mut_slice().iter_mut().zip(target) {
            *c += (t - *c) * k;
        }
        self.rotation = (self.rotation + self.rotation_step).rem_euclid(std::f32::consts::TAU);
        self.ticks += 1;
    }

    pub fn positions(&self) -> &[f32] { self.current.as_slice() }

    pub fn target(&self) -> &Arc<PointSet> { &self.target }

    /// Rotation about Y to apply when drawing, radians in [0, 2pi).
    pub fn rotation(&self) -> f32 { self.rotation }

    pub fn ticks(&self) -> u64 { self.ticks }

    /// Largest per-scalar distance between current and target.
    pub fn max_gap(&self) -> f32 {
        self.current
            .as_slice()
            .iter()
            .zip(self.target.as_slice())
            .map(|(c, t)| (t - c).abs())
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::shapes::POINT_SCALARS;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn constant(v: f32) -> Arc<PointSet> {
        Arc::new(PointSet::from_fn(|_| [v, v, v]))
    }

    #[test]
    fn test_converges_monotonically() {
        let mut engine = MorphEngine::from_buffers(PointSet::zeroed(), constant(5.0));
        let initial = engine.max_gap();
        assert_eq!(initial, 5.0);

        let mut previous = initial;
        for _ in 0..56 {
            engine.tick();
            let gap = engine.max_gap();
            assert!(gap < previous);
            previous = gap;
        }
        // 0.92^55 is just over 1%; the 56th tick crosses it.
        assert!(previous <= initial * 0.01, "gap after 56 ticks: {previous}");
        assert_eq!(engine.ticks(), 56);
    }

    #[test]
    fn test_first_tick_closes_eight_percent() {
        let mut engine = MorphEngine::from_buffers(PointSet::zeroed(), constant(10.0));
        engine.tick();
        assert!(engine.positions().iter().all(|&v| (v - 0.8).abs() < 1e-6));
        assert_eq!(engine.positions().len(), POINT_SCALARS);
    }

    #[test]
    fn test_converged_engine_idles() {
        let target = constant(-3.0);
        let mut engine = MorphEngine::new(target.clone());
        assert_eq!(engine.max_gap(), 0.0);
        for _ in 0..10 {
            engine.tick();
        }
        assert_eq!(engine.positions(), target.as_slice());
    }

    #[test]
    fn test_rotation_advances_regardless_of_morph() {
        let mut engine = MorphEngine::new(constant(1.0));
        for _ in 0..1000 {
            engine.tick();
        }
        assert!((engine.rotation() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_select_target() {
        let mut rng = StdRng::seed_from_u64(2);
        let shapes = ShapeLibrary::generate(&mut rng);
        let image = constant(1.0);

        assert!(Arc::ptr_eq(&select_target(Mode::Tree, &shapes, Some(&image)), &shapes.tree));
        assert!(Arc::ptr_eq(&select_target(Mode::Explode, &shapes, None), &shapes.explode));
        assert!(Arc::ptr_eq(&select_target(Mode::Image, &shapes, Some(&image)), &image));
        assert!(Arc::ptr_eq(&select_target(Mode::Image, &shapes, None), &shapes.tree));
    }

    #[test]
    fn test_retarget_only_on_change() {
        let mut rng = StdRng::seed_from_u64(4);
        let shapes = ShapeLibrary::generate(&mut rng);
        let mut engine = MorphEngine::new(shapes.tree.clone());

        assert!(engine.retarget(Mode::Tree, 0, &shapes, None));
        assert!(!engine.retarget(Mode::Tree, 0, &shapes, None));
        // Image version is irrelevant outside IMAGE mode.
        assert!(!engine.retarget(Mode::Tree, 3, &shapes, None));

        assert!(engine.retarget(Mode::Image, 0, &shapes, None));
        assert!(Arc::ptr_eq(engine.target(), &shapes.tree));

        let image = constant(2.0);
        assert!(engine.retarget(Mode::Image, 1, &shapes, Some(&image)));
        assert!(Arc::ptr_eq(engine.target(), &image));

        assert!(engine.retarget(Mode::Explode, 1, &shapes, Some(&image)));
        assert!(Arc::ptr_eq(engine.target(), &shapes.explode));
    }

    #[test]
    fn test_target_swap_leaves_old_snapshot_intact() {
        let first = constant(1.0);
        let mut engine = MorphEngine::new(first.clone());
        let held = engine.target().clone();
        engine.set_target(constant(9.0));
        engine.tick();
        assert!(Arc::ptr_eq(&held, &first));
        assert!(held.as_slice().iter().all(|&v| v == 1.0));
    }
}
