//! Pinch classification for a single hand.
//!
//! The decision is an axis-aligned box test: thumb and index tips pinch when
//! they are closer than the threshold along *each* of x, y and z.  That is a
//! cheaper stand-in for a Euclidean sphere test; a Euclidean variant would
//! need its own threshold.
//!
//! The Euclidean distance is still exposed, but only as the overlay's circle
//! radius.

use crate::frame::Joint;
use crate::projection::ScreenSize;

/// Default per-axis pinch threshold (mm).
pub const DEFAULT_PINCH_THRESHOLD_MM: f32 = 20.0;

/// Result of classifying one thumb/index pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinchObservation {
    pub is_pinching: bool,
    /// `|thumb - index|` per axis (mm).
    pub axis_deltas: [f32; 3],
}

impl PinchObservation {
    /// Straight-line tip separation (mm).  Cosmetic only.
    pub fn display_distance(&self) -> f32 {
        let [dx, dy, dz] = self.axis_deltas;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Overlay circle radius in pixels: the tip distance scaled by
    /// `height / 1000`, rounded up.
    pub fn display_radius(&self, screen: ScreenSize) -> u32 {
        let r = self.display_distance() * (screen.height as f32 / 1000.0);
        r.ceil().max(0.0) as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinchClassifier {
    threshold_mm: f32,
}

impl Default for PinchClassifier {
    fn default() -> Self {
        PinchClassifier { threshold_mm: DEFAULT_PINCH_THRESHOLD_MM }
    }
}

impl PinchClassifier {
    /// `threshold_mm` must be finite and positive; configuration validates it.
    pub fn new(threshold_mm: f32) -> Self {
        debug_assert!(threshold_mm.is_finite() && threshold_mm > 0.0);
        PinchClassifier { threshold_mm }
    }

    pub fn threshold_mm(&self) -> f32 {
        self.threshold_mm
    }

    pub fn classify(&self, thumb_tip: Joint, index_tip: Joint) -> PinchObservation {
        let axis_deltas = thumb_tip.abs_diff(index_tip);
        let is_pinching = axis_deltas.iter().all(|&d| d < self.threshold_mm);
        PinchObservation { is_pinching, axis_deltas }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32, z: f32) -> Joint {
        Joint::new(x, y, z)
    }

    #[test]
    fn close_tips_pinch() {
        let obs = PinchClassifier::default().classify(at(0.0, 0.0, 0.0), at(5.0, -5.0, 19.9));
        assert!(obs.is_pinching);
        assert_eq!(obs.axis_deltas, [5.0, 5.0, 19.9]);
    }

    #[test]
    fn exactly_threshold_on_any_axis_is_not_pinching() {
        let c = PinchClassifier::default();
        let origin = at(100.0, 100.0, 100.0);
        assert!(!c.classify(origin, origin.offset(20.0, 0.0, 0.0)).is_pinching);
        assert!(!c.classify(origin, origin.offset(0.0, -20.0, 0.0)).is_pinching);
        assert!(!c.classify(origin, origin.offset(0.0, 0.0, 20.0)).is_pinching);
    }

    #[test]
    fn just_under_threshold_on_all_axes_pinches() {
        let c = PinchClassifier::default();
        let origin = at(0.0, 0.0, 0.0);
        assert!(c.classify(origin, origin.offset(19.99, 19.99, 19.99)).is_pinching);
    }

    #[test]
    fn shrinking_any_axis_never_unpinches() {
        let c = PinchClassifier::default();
        let origin = at(0.0, 0.0, 0.0);
        let start = [15.0_f32, 12.0, 18.0];
        assert!(c.classify(origin, at(start[0], start[1], start[2])).is_pinching);
        for axis in 0..3 {
            let mut d = start;
            while d[axis] > 0.0 {
                d[axis] = (d[axis] - 1.5).max(0.0);
                assert!(
                    c.classify(origin, at(d[0], d[1], d[2])).is_pinching,
                    "axis {} delta {} unpinched",
                    axis,
                    d[axis]
                );
            }
        }
    }

    #[test]
    fn box_test_is_not_euclidean() {
        // Each axis < 20 but straight-line distance ≈ 32.9 mm.
        let obs = PinchClassifier::default().classify(at(0.0, 0.0, 0.0), at(19.0, 19.0, 19.0));
        assert!(obs.is_pinching);
        assert!(obs.display_distance() > 20.0);
    }

    #[test]
    fn custom_threshold() {
        let c = PinchClassifier::new(5.0);
        assert!(!c.classify(at(0.0, 0.0, 0.0), at(6.0, 0.0, 0.0)).is_pinching);
        assert_eq!(c.threshold_mm(), 5.0);
    }

    #[test]
    fn display_radius_scales_with_screen_height() {
        let obs = PinchObservation { is_pinching: false, axis_deltas: [30.0, 40.0, 0.0] };
        assert_eq!(obs.display_distance(), 50.0);
        assert_eq!(obs.display_radius(ScreenSize::new(700, 500)), 25);
        // 50 * 0.333 = 16.65 → 17
        assert_eq!(obs.display_radius(ScreenSize::new(700, 333)), 17);
    }
}
