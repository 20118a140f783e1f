//! Two-hand role correlation.
//!
//! One hand is the *trigger*: its pinch arms the calibration.  The other is
//! the *subject*: its thumb and index tips are what gets recorded.  Roles are
//! fixed by handedness through [`HandRoles`].
//!
//! When a frame carries more than one hand of the same handedness, the last
//! one in the frame's hand list wins.

use crate::calibration::SubjectSnapshot;
use crate::frame::{DigitKind, Frame, Hand, Handedness, Joint};
use crate::pinch::{PinchClassifier, PinchObservation};

/// Which handedness plays the trigger role; the subject is the other one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandRoles {
    pub trigger: Handedness,
}

impl Default for HandRoles {
    fn default() -> Self {
        HandRoles { trigger: Handedness::Left }
    }
}

impl HandRoles {
    pub fn new(trigger: Handedness) -> Self {
        HandRoles { trigger }
    }

    pub fn subject(&self) -> Handedness {
        self.trigger.opposite()
    }
}

/// What one frame says about the trigger and subject hands.
///
/// A hand that is absent leaves its fields at "not seen" / `None`; nothing is
/// carried over from earlier frames.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CorrelationResult {
    pub trigger_seen: bool,
    pub trigger_pinching: bool,
    /// `None` when the trigger hand is absent or a tip is untracked.
    pub trigger_pinch: Option<PinchObservation>,
    pub trigger_thumb: Option<Joint>,
    pub trigger_index: Option<Joint>,
    pub subject_seen: bool,
    pub subject_thumb: Option<Joint>,
    pub subject_index: Option<Joint>,
}

impl CorrelationResult {
    pub fn both_seen(&self) -> bool {
        self.trigger_seen && self.subject_seen
    }

    /// Subject fingertips, if the subject hand is in view with both tips.
    pub fn subject_snapshot(&self) -> Option<SubjectSnapshot> {
        if !self.subject_seen {
            return None;
        }
        Some(SubjectSnapshot {
            thumb: self.subject_thumb?,
            index: self.subject_index?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Correlator {
    roles: HandRoles,
    classifier: PinchClassifier,
}

impl Correlator {
    pub fn new(roles: HandRoles, classifier: PinchClassifier) -> Self {
        Correlator { roles, classifier }
    }

    pub fn roles(&self) -> HandRoles {
        self.roles
    }

    pub fn classifier(&self) -> &PinchClassifier {
        &self.classifier
    }

    pub fn correlate(&self, frame: &Frame) -> CorrelationResult {
        let mut result = CorrelationResult::default();

        for hand in &frame.hands {
            if hand.handedness == self.roles.trigger {
                self.observe_trigger(hand, &mut result);
            } else {
                observe_subject(hand, &mut result);
            }
        }
        result
    }

    fn observe_trigger(&self, hand: &Hand, result: &mut CorrelationResult) {
        let thumb = hand.tip(DigitKind::Thumb);
        let index = hand.tip(DigitKind::Index);
        let pinch = match (thumb, index) {
            (Some(t), Some(i)) => Some(self.classifier.classify(t, i)),
            _ => None,
        };
        result.trigger_seen = true;
        result.trigger_thumb = thumb;
        result.trigger_index = index;
        result.trigger_pinch = pinch;
        result.trigger_pinching = pinch.map_or(false, |p| p.is_pinching);
    }
}

fn observe_subject(hand: &Hand, result: &mut CorrelationResult) {
    result.subject_seen = true;
    result.subject_thumb = hand.tip(DigitKind::Thumb);
    result.subject_index = hand.tip(DigitKind::Index);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Bone;

    const PINCH: [f32; 3] = [2.0, 1.0, 2.0];
    const OPEN: [f32; 3] = [45.0, 0.0, 35.0];

    fn hand(h: Handedness, x: f32, gap: [f32; 3]) -> Hand {
        Hand::posed(h, Joint::new(x, 200.0, 0.0), gap)
    }

    fn frame(hands: Vec<Hand>) -> Frame {
        Frame::new(1, 1_000, hands)
    }

    #[test]
    fn empty_frame_sees_nothing() {
        let r = Correlator::default().correlate(&frame(vec![]));
        assert_eq!(r, CorrelationResult::default());
        assert!(r.subject_snapshot().is_none());
    }

    #[test]
    fn left_pinch_right_subject() {
        let right = hand(Handedness::Right, 120.0, OPEN);
        let r = Correlator::default()
            .correlate(&frame(vec![hand(Handedness::Left, -120.0, PINCH), right.clone()]));
        assert!(r.both_seen());
        assert!(r.trigger_pinching);
        let snap = r.subject_snapshot().unwrap();
        assert_eq!(snap.thumb, right.tip(DigitKind::Thumb).unwrap());
        assert_eq!(snap.index, right.tip(DigitKind::Index).unwrap());
    }

    #[test]
    fn subject_hand_pinch_is_not_classified() {
        // Right hand pinching, left open: trigger is not pinching.
        let r = Correlator::default().correlate(&frame(vec![
            hand(Handedness::Left, -120.0, OPEN),
            hand(Handedness::Right, 120.0, PINCH),
        ]));
        assert!(r.trigger_seen);
        assert!(!r.trigger_pinching);
    }

    #[test]
    fn configured_right_trigger_swaps_roles() {
        let left = hand(Handedness::Left, -120.0, OPEN);
        let correlator = Correlator::new(HandRoles::new(Handedness::Right), PinchClassifier::default());
        let r = correlator.correlate(&frame(vec![left.clone(), hand(Handedness::Right, 120.0, PINCH)]));
        assert!(r.trigger_pinching);
        assert_eq!(r.subject_thumb, left.tip(DigitKind::Thumb));
        assert_eq!(HandRoles::new(Handedness::Right).subject(), Handedness::Left);
    }

    #[test]
    fn only_trigger_hand_present() {
        let r = Correlator::default().correlate(&frame(vec![hand(Handedness::Left, 0.0, PINCH)]));
        assert!(r.trigger_seen && r.trigger_pinching);
        assert!(!r.subject_seen);
        assert!(r.subject_snapshot().is_none());
    }

    #[test]
    fn last_hand_of_same_handedness_wins() {
        let r = Correlator::default().correlate(&frame(vec![
            hand(Handedness::Left, -120.0, PINCH),
            hand(Handedness::Left, -60.0, OPEN),
        ]));
        assert!(r.trigger_seen);
        assert!(!r.trigger_pinching);

        let first = hand(Handedness::Right, 60.0, OPEN);
        let last = hand(Handedness::Right, 150.0, OPEN);
        let r = Correlator::default().correlate(&frame(vec![first, last.clone()]));
        assert_eq!(r.subject_thumb, last.tip(DigitKind::Thumb));
    }

    #[test]
    fn untracked_trigger_tip_is_no_observation() {
        let mut left = hand(Handedness::Left, -120.0, PINCH);
        left.digits[DigitKind::Index as usize].bones[3] = Bone::missing();
        let r = Correlator::default().correlate(&frame(vec![left]));
        assert!(r.trigger_seen);
        assert!(r.trigger_pinch.is_none());
        assert!(!r.trigger_pinching);
    }

    #[test]
    fn untracked_subject_tip_gives_no_snapshot() {
        let mut right = hand(Handedness::Right, 120.0, OPEN);
        right.digits[DigitKind::Thumb as usize].bones[3].next_joint = None;
        let r = Correlator::default().correlate(&frame(vec![right]));
        assert!(r.subject_seen);
        assert!(r.subject_snapshot().is_none());
    }
}
