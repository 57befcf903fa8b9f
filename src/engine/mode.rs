// Gesture vocabulary and the mode decision rules.
//
// `next_mode` is a pure function of the latest sample and the previous mode.
// The caller threads the previous mode through; nothing is hidden here.

use std::fmt;

use super::pinch::{hand_is_pinching, Landmark};

// ============================================================================
// MODE
// ============================================================================

/// Target shape the particle cloud is morphing toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Tree,
    Explode,
    Image,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tree => "TREE",
            Self::Explode => "EXPLODE",
            Self::Image => "IMAGE",
        }
    }

    /// Particle tint (linear-ish sRGB, 0..1).
    pub fn color(&self) -> [f32; 3] {
        match self {
            Self::Tree => rgb(0xD4, 0xAF, 0x37),
            Self::Explode => rgb(0xFF, 0xFF, 0xFF),
            Self::Image => rgb(0xFF, 0xAA, 0x00),
        }
    }
}

fn rgb(r: u8, g: u8, b: u8) -> [f32; 3] {
    [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0]
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// GESTURE LABEL
// ============================================================================

/// Category names produced by the hand-gesture classifier.
///
/// Only `ClosedFist` and `OpenPalm` drive mode changes; the rest are carried
/// for display and otherwise fall through to "hold last mode".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum GestureLabel {
    #[default]
    None,
    ClosedFist,
    OpenPalm,
    PointingUp,
    ThumbDown,
    ThumbUp,
    Victory,
    ILoveYou,
    Other(String),
}

impl GestureLabel {
    pub fn parse(name: &str) -> Self {
        match name {
            "" | "None" => Self::None,
            "Closed_Fist" => Self::ClosedFist,
            "Open_Palm" => Self::OpenPalm,
            "Pointing_Up" => Self::PointingUp,
            "Thumb_Down" => Self::ThumbDown,
            "Thumb_Up" => Self::ThumbUp,
            "Victory" => Self::Victory,
            "ILoveYou" => Self::ILoveYou,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::None => "None",
            Self::ClosedFist => "Closed_Fist",
            Self::OpenPalm => "Open_Palm",
            Self::PointingUp => "Pointing_Up",
            Self::ThumbDown => "Thumb_Down",
            Self::ThumbUp => "Thumb_Up",
            Self::Victory => "Victory",
            Self::ILoveYou => "ILoveYou",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// GESTURE SAMPLE
// ============================================================================

/// Top-ranked label and landmarks of the first detected hand in one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GestureSample {
    pub label: GestureLabel,
    pub landmarks: Option<Vec<Landmark>>,
}

impl GestureSample {
    pub fn new(label: GestureLabel, landmarks: Option<Vec<Landmark>>) -> Self {
        Self { label, landmarks }
    }

    /// No hand in frame.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_pinching(&self, threshold: f32) -> bool {
        self.landmarks
            .as_deref()
            .is_some_and(|hand| hand_is_pinching(hand, threshold))
    }
}

// ============================================================================
// DECISION RULES
// ============================================================================

/// Next active mode. First matching rule wins:
///
/// 1. pinch with a reference image shows the image
/// 2. open palm explodes
/// 3. closed fist assembles the tree
/// 4. releasing a pinch while on the image returns to the tree
/// 5. anything else keeps the previous mode
pub fn next_mode(
    gesture: &GestureLabel,
    is_pinching: bool,
    has_reference_image: bool,
    previous: Mode,
) -> Mode {
    if is_pinching && has_reference_image {
        Mode::Image
    } else if *gesture == GestureLabel::OpenPalm {
        Mode::Explode
    } else if *gesture == GestureLabel::ClosedFist {
        Mode::Tree
    } else if !is_pinching && previous == Mode::Image {
        Mode::Tree
    } else {
        previous
    }
}

/// One-line description of what the current hand pose is asking for.
pub fn status_text(gesture: &GestureLabel, is_pinching: bool, has_reference_image: bool) -> &'static str {
    if is_pinching && has_reference_image {
        "IMAGE REVEAL (Pinching)"
    } else if *gesture == GestureLabel::ClosedFist {
        "ASSEMBLE TREE (Fist)"
    } else if *gesture == GestureLabel::OpenPalm {
        "EXPLODE (Open Hand)"
    } else {
        "IDLE (Waiting for gesture)"
    }
}
