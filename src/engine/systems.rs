// ECS systems for one simulated frame, and the `Simulation` that owns them.
//
// Order per frame: gesture samples -> upload timer -> target selection -> morph.
// The morph system is the only writer of particle positions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bevy_ecs::prelude::*;
use log::{debug, info};

use super::mode::{next_mode, GestureSample, Mode};
use super::morph::MorphEngine;
use super::resources::*;
use super::shapes::{PointSet, ShapeLibrary};
use super::upload::UploadTransition;

// ============================================================================
// SYSTEMS
// ============================================================================

/// Apply every pending gesture sample in arrival order.
/// While an upload preview is pending the samples are recorded but the
/// preview keeps control of the mode.
pub fn gesture_system(
    mut inbox: ResMut<GestureInbox>,
    mut control: ResMut<ControlState>,
    upload: Res<UploadTransition>,
    tuning: Res<GestureTuning>,
) {
    for sample in inbox.samples.drain(..) {
        let pinching = sample.is_pinching(tuning.pinch_threshold);
        control.pinching = pinching;
        control.gesture = sample.label;

        if upload.is_pending() {
            continue;
        }
        let next = next_mode(&control.gesture, pinching, control.has_reference_image, control.mode);
        if next != control.mode {
            info!("mode {} -> {} (gesture {}, pinch {})", control.mode, next, control.gesture, pinching);
            control.mode = next;
        }
    }
}

/// Expire the upload preview.
pub fn upload_timer_system(
    clock: Res<FrameClock>,
    mut upload: ResMut<UploadTransition>,
    mut control: ResMut<ControlState>,
) {
    if !upload.is_pending() {
        return;
    }
    // A pinch only keeps IMAGE if there is an image to show.
    let pinching = control.pinching && control.has_reference_image;
    match upload.poll(clock.now, pinching) {
        Some(mode) => {
            info!("upload preview over, mode {} -> {}", control.mode, mode);
            control.mode = mode;
        }
        None if !upload.is_pending() => {
            debug!("upload preview over while pinching, keeping {}", control.mode);
        }
        None => {}
    }
}

pub fn target_selection_system(
    control: Res<ControlState>,
    shapes: Res<Shapes>,
    image: Res<ReferenceImage>,
    mut engine: ResMut<MorphEngine>,
) {
    if engine.retarget(control.mode, image.version, &shapes.0, image.points.as_ref()) {
        debug!("target -> {} (image v{})", control.mode, image.version);
    }
}

pub fn morph_system(mut engine: ResMut<MorphEngine>) {
    engine.tick();
}

/// The fixed shape library as a world resource.
#[derive(Resource, Clone)]
pub struct Shapes(pub ShapeLibrary);

// ============================================================================
// SIMULATION
// ============================================================================

/// Tunables for a simulation instance.
#[derive(Debug, Clone, Copy)]
pub struct SimulationParams {
    pub morph_rate: f32,
    pub rotation_per_tick: f32,
    pub pinch_threshold: f32,
    pub upload_preview: Duration,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            morph_rate: super::morph::MORPH_RATE,
            rotation_per_tick: super::morph::ROTATION_PER_TICK,
            pinch_threshold: super::pinch::PINCH_THRESHOLD,
            upload_preview: super::upload::UPLOAD_PREVIEW,
        }
    }
}

/// ECS world plus the per-frame schedule.
///
/// Inputs arrive through `push_sample`, `begin_upload`, `publish_image`;
/// `step` runs one frame; the renderer reads `positions` and `mode`.
pub struct Simulation {
    world: World,
    schedule: Schedule,
}

impl Simulation {
    pub fn new(shapes: ShapeLibrary, params: SimulationParams, now: Instant) -> Self {
        let mut world = World::new();
        let engine = MorphEngine::new(shapes.tree.clone())
            .with_rates(params.morph_rate, params.rotation_per_tick);

        world.insert_resource(engine);
        world.insert_resource(Shapes(shapes));
        world.insert_resource(ControlState::default());
        world.insert_resource(GestureInbox::default());
        world.insert_resource(ReferenceImage::default());
        world.insert_resource(GestureTuning { pinch_threshold: params.pinch_threshold });
        world.insert_resource(UploadTransition::new(params.upload_preview));
        world.insert_resource(FrameClock::new(now));

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (gesture_system, upload_timer_system, target_selection_system, morph_system).chain(),
        );

        Self { world, schedule }
    }

    pub fn push_sample(&mut self, sample: GestureSample) {
        self.world.resource_mut::<GestureInbox>().samples.push(sample);
    }

    /// A new reference image was supplied: show IMAGE now, start the preview timer.
    pub fn begin_upload(&mut self, now: Instant) {
        let mode = self.world.resource_mut::<UploadTransition>().begin(now);
        let mut control = self.world.resource_mut::<ControlState>();
        control.has_reference_image = true;
        if control.mode != mode {
            info!("upload received, mode {} -> {}", control.mode, mode);
            control.mode = mode;
        }
    }

    pub fn publish_image(&mut self, points: Arc<PointSet>) {
        self.world.resource_mut::<ReferenceImage>().publish(points);
    }

    /// Derivation of the latest upload failed. Without earlier points there is
    /// no reference image after all, so the preview ends and IMAGE is left.
    pub fn reject_image(&mut self) {
        let has_points = self.world.resource::<ReferenceImage>().points.is_some();
        if !has_points {
            self.world.resource_mut::<UploadTransition>().cancel();
        }
        let mut control = self.world.resource_mut::<ControlState>();
        control.has_reference_image = has_points;
        if !has_points && control.mode == Mode::Image {
            info!("upload failed, mode {} -> {}", control.mode, Mode::Tree);
            control.mode = Mode::Tree;
        }
    }

    /// Run one frame.
    pub fn step(&mut self, now: Instant) {
        {
            let mut clock = self.world.resource_mut::<FrameClock>();
            clock.now = now;
            clock.frame += 1;
        }
        self.schedule.run(&mut self.world);
    }

    pub fn control(&self) -> &ControlState {
        self.world.resource::<ControlState>()
    }

    pub fn mode(&self) -> Mode {
        self.control().mode
    }

    pub fn engine(&self) -> &MorphEngine {
        self.world.resource::<MorphEngine>()
    }

    pub fn positions(&self) -> &[f32] {
        self.engine().positions()
    }

    pub fn upload_pending(&self) -> bool {
        self.world.resource::<UploadTransition>().is_pending()
    }

    pub fn frame(&self) -> u64 {
        self.world.resource::<FrameClock>().frame
    }
}
