// Keyboard-driven stand-in for a camera and gesture model.
//
// The window's key handler sets a `HandPose` on a shared `SimulatedHand`;
// `SimulatedClassifier` reports that pose with a synthetic 21-point hand whose
// thumb and index tips touch when pinching.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{bail, Result};

use super::{Category, GestureClassifier, Recognition, VideoFrame, VideoSource};
use crate::engine::pinch::{Landmark, INDEX_TIP, THUMB_TIP};

/// Pose of the simulated hand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum HandPose {
    /// No hand in view.
    #[default]
    Absent,
    Fist,
    OpenPalm,
    ThumbUp,
    /// Hand in view, no recognised gesture, thumb and index tips touching.
    Pinch,
}

impl HandPose {
    fn label(&self) -> Option<&'static str> {
        match self {
            Self::Absent => None,
            Self::Fist => Some("Closed_Fist"),
            Self::OpenPalm => Some("Open_Palm"),
            Self::ThumbUp => Some("Thumb_Up"),
            Self::Pinch => Some("None"),
        }
    }
}

/// Shared handle to the current simulated pose.
#[derive(Clone, Default)]
pub struct SimulatedHand {
    pose: Arc<Mutex<HandPose>>,
}

impl SimulatedHand {
    pub fn set(&self, pose: HandPose) {
        if let Ok(mut guard) = self.pose.lock() {
            *guard = pose;
        }
    }

    pub fn get(&self) -> HandPose {
        self.pose.lock().map(|guard| *guard).unwrap_or_default()
    }
}

/// 21 landmarks of a relaxed right hand, normalized to the frame.
pub fn hand_landmarks(pinch: bool) -> Vec<Landmark> {
    let wrist = Landmark::new(0.50, 0.80, 0.0);
    let mut points = vec![wrist; 21];
    // Five fingers, four joints each, fanning out from the wrist.
    for finger in 0..5 {
        let spread = (finger as f32 - 2.0) * 0.07;
        for joint in 0..4 {
            let reach = 0.08 + joint as f32 * 0.06;
            points[1 + finger * 4 + joint] = Landmark::new(
                wrist.x + spread * (1.0 + joint as f32 * 0.3),
                wrist.y - reach,
                -0.02 * joint as f32,
            );
        }
    }
    if pinch {
        let thumb = points[THUMB_TIP];
        points[INDEX_TIP] = Landmark::new(thumb.x + 0.01, thumb.y - 0.01, thumb.z);
    }
    points
}

pub struct SimulatedClassifier {
    hand: SimulatedHand,
}

impl SimulatedClassifier {
    pub fn initialize(hand: SimulatedHand) -> Result<Self> {
        Ok(Self { hand })
    }
}

impl GestureClassifier for SimulatedClassifier {
    fn classify(&mut self, _frame: &VideoFrame, _timestamp_ms: u64) -> Result<Recognition> {
        let pose = self.hand.get();
        let Some(label) = pose.label() else {
            return Ok(Recognition::default());
        };
        Ok(Recognition {
            gestures: vec![vec![Category::new(label, 0.9)]],
            landmarks: vec![hand_landmarks(pose == HandPose::Pinch)],
        })
    }
}

/// Video clock ticking at a fixed frame rate. No pixels.
pub struct SimulatedCamera {
    fps: u32,
    started: Instant,
}

impl SimulatedCamera {
    pub fn open(fps: u32) -> Result<Self> {
        if fps == 0 {
            bail!("camera frame rate must be positive");
        }
        Ok(Self { fps, started: Instant::now() })
    }
}

impl VideoSource for SimulatedCamera {
    fn current_frame(&mut self) -> Option<VideoFrame> {
        let elapsed = self.started.elapsed().as_secs_f64();
        let index = (elapsed * self.fps as f64).floor();
        Some(VideoFrame { time: index / self.fps as f64, image: None })
    }
}
