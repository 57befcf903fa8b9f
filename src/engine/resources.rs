// ECS resources shared by the frame systems.
// The world holds exactly one of each; nothing here is per-particle.

use std::sync::Arc;
use std::time::Instant;

use bevy_ecs::prelude::*;

use super::mode::{GestureLabel, GestureSample, Mode};
use super::pinch::PINCH_THRESHOLD;
use super::shapes::PointSet;

/// Published control state: the active mode and the inputs that chose it.
#[derive(Resource, Debug, Clone, Default)]
pub struct ControlState {
    pub mode: Mode,
    pub gesture: GestureLabel,
    pub pinching: bool,
    /// True once an image has been uploaded, even while it is still being sampled.
    pub has_reference_image: bool,
}

/// Gesture samples received since the last frame, oldest first.
#[derive(Resource, Debug, Default)]
pub struct GestureInbox {
    pub samples: Vec<GestureSample>,
}

/// Latest derived reference-image points.
///
/// `version` increases on every publish so the engine can tell a new image
/// from the one it is already morphing toward.
#[derive(Resource, Debug, Clone, Default)]
pub struct ReferenceImage {
    pub points: Option<Arc<PointSet>>,
    pub version: u64,
}

impl ReferenceImage {
    pub fn publish(&mut self, points: Arc<PointSet>) {
        self.points = Some(points);
        self.version += 1;
    }
}

/// Tuning read by the gesture system.
#[derive(Resource, Debug, Clone, Copy)]
pub struct GestureTuning {
    pub pinch_threshold: f32,
}

impl Default for GestureTuning {
    fn default() -> Self {
        Self { pinch_threshold: PINCH_THRESHOLD }
    }
}

/// Wall-clock time of the frame being simulated.
#[derive(Resource, Debug, Clone, Copy)]
pub struct FrameClock {
    pub now: Instant,
    pub frame: u64,
}

impl FrameClock {
    pub fn new(now: Instant) -> Self {
        Self { now, frame: 0 }
    }
}
