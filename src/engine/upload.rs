// Timed IMAGE preview after a new reference image arrives.
//
// One deadline at most. A second upload replaces the pending deadline.
// Time is passed in by the caller so the frame loop and tests share one clock.

use std::time::{Duration, Instant};

use bevy_ecs::prelude::*;

use super::mode::Mode;

pub const UPLOAD_PREVIEW: Duration = Duration::from_millis(1500);

#[derive(Resource, Debug, Clone)]
pub struct UploadTransition {
    hold: Duration,
    deadline: Option<Instant>,
}

impl Default for UploadTransition {
    fn default() -> Self {
        Self::new(UPLOAD_PREVIEW)
    }
}

impl UploadTransition {
    pub fn new(hold: Duration) -> Self {
        Self { hold, deadline: None }
    }

    /// Start (or restart) the preview. Returns the mode to force immediately.
    pub fn begin(&mut self, now: Instant) -> Mode {
        self.deadline = Some(now + self.hold);
        Mode::Image
    }

    /// While pending, the preview owns the mode.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fire the deadline if it has passed.
    ///
    /// Returns `Some(Mode::Tree)` when the preview ends without a pinch.
    /// With a pinch held the mode is left alone and `None` is returned.
    pub fn poll(&mut self, now: Instant, is_pinching: bool) -> Option<Mode> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                if is_pinching { None } else { Some(Mode::Tree) }
            }
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}
