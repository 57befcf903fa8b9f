// Thumb/index proximity check on normalized hand landmarks.
// Stateless: one call per gesture sample, no smoothing.

/// Index of the thumb tip in the 21-point hand landmark list.
pub const THUMB_TIP: usize = 4;
/// Index of the index-finger tip in the 21-point hand landmark list.
pub const INDEX_TIP: usize = 8;

/// Default pinch distance in normalized image coordinates.
pub const PINCH_THRESHOLD: f32 = 0.05;

/// One hand landmark. `x`/`y` are normalized to the video frame ([0, 1]),
/// `z` is relative depth and is ignored by the pinch test.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn planar_distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// True iff both tips are present and strictly closer than `PINCH_THRESHOLD`.
pub fn is_pinching(thumb_tip: Option<&Landmark>, index_tip: Option<&Landmark>) -> bool {
    is_pinching_within(thumb_tip, index_tip, PINCH_THRESHOLD)
}

pub fn is_pinching_within(
    thumb_tip: Option<&Landmark>,
    index_tip: Option<&Landmark>,
    threshold: f32,
) -> bool {
    match (thumb_tip, index_tip) {
        (Some(thumb), Some(index)) => thumb.planar_distance(index) < threshold,
        _ => false,
    }
}

/// Pinch test on a full landmark list (first hand).
pub fn hand_is_pinching(landmarks: &[Landmark], threshold: f32) -> bool {
    is_pinching_within(landmarks.get(THUMB_TIP), landmarks.get(INDEX_TIP), threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_tips_pinch() {
        let thumb = Landmark::new(0.40, 0.50, 0.0);
        let index = Landmark::new(0.42, 0.51, -0.3);
        assert!(is_pinching(Some(&thumb), Some(&index)));
    }

    #[test]
    fn test_far_tips_do_not_pinch() {
        let thumb = Landmark::new(0.40, 0.50, 0.0);
        let index = Landmark::new(0.55, 0.30, 0.0);
        assert!(!is_pinching(Some(&thumb), Some(&index)));
    }

    #[test]
    fn test_pinch_is_symmetric() {
        let pairs = [
            (Landmark::new(0.1, 0.1, 0.0), Landmark::new(0.12, 0.13, 0.0)),
            (Landmark::new(0.5, 0.5, 0.0), Landmark::new(0.6, 0.5, 0.0)),
            (Landmark::new(0.0, 0.0, 0.0), Landmark::new(0.0, 0.049, 0.0)),
        ];
        for (a, b) in pairs {
            assert_eq!(is_pinching(Some(&a), Some(&b)), is_pinching(Some(&b), Some(&a)));
        }
    }

    #[test]
    fn test_threshold_is_exclusive() {
        // 0.0 and 0.05 are exact in the distance computation along one axis.
        let thumb = Landmark::new(0.0, 0.0, 0.0);
        let index = Landmark::new(0.05, 0.0, 0.0);
        assert_eq!(thumb.planar_distance(&index), PINCH_THRESHOLD);
        assert!(!is_pinching(Some(&thumb), Some(&index)));
    }

    #[test]
    fn test_depth_is_ignored() {
        let thumb = Landmark::new(0.3, 0.3, 0.0);
        let index = Landmark::new(0.3, 0.3, 5.0);
        assert!(is_pinching(Some(&thumb), Some(&index)));
    }

    #[test]
    fn test_missing_landmark_is_not_a_pinch() {
        let tip = Landmark::new(0.3, 0.3, 0.0);
        assert!(!is_pinching(None, Some(&tip)));
        assert!(!is_pinching(Some(&tip), None));
        assert!(!is_pinching(None, None));
        // Truncated landmark list: index tip missing.
        let short = vec![tip; 6];
        assert!(!hand_is_pinching(&short, PINCH_THRESHOLD));
    }
}
