// Gesture input: the video/classifier seams and the sampling loop.
//
// The classifier itself is external. This module defines what it must provide
// and turns its raw recognition output into the sample the engine consumes.

pub mod sampler;
pub mod sim;

use anyhow::Result;
use image::RgbaImage;

use crate::engine::mode::{GestureLabel, GestureSample};
use crate::engine::pinch::Landmark;

pub use sampler::{FrameGate, Sampler, VisionService};

// ============================================================================
// Frames
// ============================================================================

/// One video frame as handed to the classifier.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Presentation time in seconds. Unchanged time means the same frame.
    pub time: f64,
    /// Pixels, if the source has any. Simulated sources leave this empty.
    pub image: Option<RgbaImage>,
}

/// Anything that can report the frame currently on screen.
pub trait VideoSource: Send + 'static {
    /// `None` while the source has no decodable frame yet.
    fn current_frame(&mut self) -> Option<VideoFrame>;
}

// ============================================================================
// Classifier
// ============================================================================

/// A ranked label candidate for one hand.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub score: f32,
}

impl Category {
    pub fn new(name: &str, score: f32) -> Self {
        Self { name: name.to_string(), score }
    }
}

/// Raw classifier output for one frame.
///
/// `gestures[h]` is the ranked candidate list for hand `h`;
/// `landmarks[h]` is that hand's 21 landmarks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recognition {
    pub gestures: Vec<Vec<Category>>,
    pub landmarks: Vec<Vec<Landmark>>,
}

impl Recognition {
    /// First hand only: its top label, and its landmarks when a gesture was reported.
    pub fn to_sample(&self) -> GestureSample {
        let Some(top) = self.gestures.first().and_then(|ranked| ranked.first()) else {
            return GestureSample::none();
        };
        GestureSample::new(GestureLabel::parse(&top.name), self.landmarks.first().cloned())
    }
}

/// Hand-gesture classifier running in video mode.
pub trait GestureClassifier: Send + 'static {
    fn classify(&mut self, frame: &VideoFrame, timestamp_ms: u64) -> Result<Recognition>;
}
