//! Overlay renderer: one frame + calibration state → one pixel buffer.
//!
//! Rendering is a pure function.  Every call starts from a black buffer and
//! redraws everything, so no drawing state survives between frames.  Joints
//! whose projection is `None` are skipped, never replaced with a default.

use std::time::{Duration, Instant};

use serde::Deserialize;

use hand_pinch::{
    BoneKind, CalibrationState, CorrelationResult, Frame, Hand, HandRoles, Projector,
    ScreenPoint, ScreenSize, BONES_PER_DIGIT,
};

use crate::canvas::{FrameBuffer, BLACK, BLUE, GREEN, RED, WHITE, YELLOW};
use crate::sensor::TrackingMode;

const TEXT_SCALE: i32 = 2;
const LINE_GAP: i32 = 4;
const MARGIN: i32 = 10;

/// How hands are drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Bone endpoints only.
    Dots,
    /// Joints, bones, webbing and forearm.
    Skeleton,
}

impl RenderMode {
    pub fn toggled(self) -> Self {
        match self {
            RenderMode::Dots => RenderMode::Skeleton,
            RenderMode::Skeleton => RenderMode::Dots,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RenderMode::Dots => "Dots",
            RenderMode::Skeleton => "Skeleton",
        }
    }
}

/// Outcome of the one capture, as far as the overlay cares.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureStatus {
    Saved { file_name: String },
    Failed { reason: String },
}

/// Everything one overlay render depends on.
pub struct OverlayInput<'a> {
    pub frame: &'a Frame,
    pub correlation: &'a CorrelationResult,
    pub state: CalibrationState,
    pub capture: Option<&'a CaptureStatus>,
    pub mode: RenderMode,
    pub tracking_mode: Option<TrackingMode>,
    pub now: Instant,
}

#[derive(Clone, Copy, Debug)]
pub struct OverlayRenderer {
    projector: Projector,
    roles: HandRoles,
    delay: Duration,
}

impl OverlayRenderer {
    pub fn new(size: ScreenSize, roles: HandRoles, delay: Duration) -> Self {
        OverlayRenderer { projector: Projector::new(size), roles, delay }
    }

    pub fn size(&self) -> ScreenSize {
        self.projector.size()
    }

    pub fn render(&self, input: &OverlayInput<'_>) -> FrameBuffer {
        let mut buf = FrameBuffer::new(self.size(), BLACK);

        if let Some(mode) = input.tracking_mode {
            let y = self.size().height as i32 - MARGIN - FrameBuffer::text_height(TEXT_SCALE);
            buf.draw_text(&format!("Tracking Mode: {}", mode.name()), MARGIN, y, TEXT_SCALE, GREEN);
        }

        for hand in &input.frame.hands {
            match input.mode {
                RenderMode::Dots => self.draw_dots(&mut buf, hand),
                RenderMode::Skeleton => self.draw_skeleton(&mut buf, hand),
            }
        }

        self.draw_pinch_feedback(&mut buf, input);
        self.draw_captions(&mut buf, input);
        buf
    }

    // ── Hands ─────────────────────────────────────────────────────────────

    fn draw_dots(&self, buf: &mut FrameBuffer, hand: &Hand) {
        for digit in &hand.digits {
            for bone in &digit.bones {
                if let Some(p) = self.projector.project(bone.prev_joint) {
                    buf.fill_circle(p, 2, WHITE);
                }
                if let Some(p) = self.projector.project(bone.next_joint) {
                    buf.fill_circle(p, 2, YELLOW);
                }
            }
        }
    }

    fn draw_skeleton(&self, buf: &mut FrameBuffer, hand: &Hand) {
        let p = |j| self.projector.project(j);
        let wrist = p(hand.wrist());
        let elbow = p(hand.elbow());

        for end in [wrist, elbow].into_iter().flatten() {
            buf.fill_circle(end, 3, WHITE);
        }
        if let (Some(w), Some(e)) = (wrist, elbow) {
            buf.draw_line(w, e, 2, WHITE);
        }

        for (d, digit) in hand.digits.iter().enumerate() {
            for (b, bone) in digit.bones.iter().enumerate() {
                let start = p(bone.prev_joint);
                let end = p(bone.next_joint);
                for joint in [start, end].into_iter().flatten() {
                    buf.fill_circle(joint, 3, WHITE);
                }
                if let (Some(s), Some(e)) = (start, end) {
                    buf.draw_line(s, e, 2, WHITE);
                }

                // Webbing to the neighbouring digit's matching bone.
                if webbed(d, b) {
                    let next_start = p(hand.digits[d + 1].bones[b].prev_joint);
                    if let (Some(s), Some(n)) = (start, next_start) {
                        buf.draw_line(s, n, 2, WHITE);
                    }
                }

                if b == BoneKind::Metacarpal as usize {
                    if let (Some(s), Some(w)) = (start, wrist) {
                        buf.draw_line(s, w, 2, WHITE);
                    }
                }
            }
        }
    }

    // ── Pinch circle and subject highlight ────────────────────────────────

    fn draw_pinch_feedback(&self, buf: &mut FrameBuffer, input: &OverlayInput<'_>) {
        let obs = input.correlation;
        let Some(pinch) = obs.trigger_pinch else { return };
        let (Some(thumb), Some(index)) = (
            self.projector.project(obs.trigger_thumb),
            self.projector.project(obs.trigger_index),
        ) else {
            return;
        };

        let centre = ScreenPoint::new(ceil_mid(thumb.x, index.x), ceil_mid(thumb.y, index.y));
        // Garbage tips can give an absurd radius; nothing past the screen shows.
        let r = pinch.display_radius(self.size()).min(self.size().height) as i32;
        if pinch.is_pinching {
            buf.fill_circle(centre, r, WHITE);
        } else {
            buf.draw_circle(centre, r, WHITE);
        }

        if obs.both_seen() && pinch.is_pinching {
            for tip in [obs.subject_thumb, obs.subject_index] {
                if let Some(p) = self.projector.project(tip) {
                    buf.fill_circle(p, 3, BLUE);
                }
            }
        }
    }

    // ── Captions ──────────────────────────────────────────────────────────

    fn draw_captions(&self, buf: &mut FrameBuffer, input: &OverlayInput<'_>) {
        let trigger = self.roles.trigger.name();
        match input.state {
            CalibrationState::Idle => {
                let msg = format!("Move both hands into frame and pinch your {} hand.", trigger);
                self.upper_right(buf, 1, &msg, GREEN);
            }
            CalibrationState::Armed { .. } => {
                self.upper_right(buf, 1, "Please wait...", GREEN);
                let notice = format!(
                    "Pinching has been observed. Calibration will be conducted in {}s.",
                    self.delay.as_secs_f64().ceil()
                );
                self.centred(buf, 9, &notice);
                if let Some(secs) = input.state.seconds_remaining(input.now) {
                    self.centred(buf, 10, &secs.to_string());
                }
            }
            CalibrationState::Fired => match input.capture {
                Some(CaptureStatus::Failed { reason }) => {
                    self.upper_right(buf, 1, "Calibration capture FAILED.", RED);
                    self.upper_right(buf, 2, reason, RED);
                    self.upper_right(buf, 3, "Press x key to close this window.", GREEN);
                }
                Some(CaptureStatus::Saved { file_name }) => {
                    self.upper_right(buf, 1, "Calibration has been completed.", GREEN);
                    self.upper_right(buf, 2, "Press x key to close this window.", GREEN);
                    self.upper_right(buf, 3, &format!("Filename : {}", file_name), GREEN);
                }
                None => self.upper_right(buf, 1, "Calibration has been completed.", GREEN),
            },
        }
    }

    fn line_y(level: i32) -> i32 {
        MARGIN + (level - 1) * (FrameBuffer::text_height(TEXT_SCALE) + LINE_GAP)
    }

    fn upper_right(&self, buf: &mut FrameBuffer, level: i32, text: &str, color: u32) {
        let w = FrameBuffer::text_width(text, TEXT_SCALE);
        let x = (self.size().width as i32 - MARGIN - w).max(0);
        buf.draw_text(text, x, Self::line_y(level), TEXT_SCALE, color);
    }

    fn centred(&self, buf: &mut FrameBuffer, level: i32, text: &str) {
        let w = FrameBuffer::text_width(text, TEXT_SCALE);
        let x = ((self.size().width as i32 - w) / 2).max(0);
        buf.draw_text(text, x, Self::line_y(level), TEXT_SCALE, GREEN);
    }
}

/// Thumb metacarpal, and the first two bones of index..ring, link sideways.
fn webbed(digit: usize, bone: usize) -> bool {
    debug_assert!(bone < BONES_PER_DIGIT);
    (digit == 0 && bone == 0) || ((1..4).contains(&digit) && bone < 2)
}

/// Ceiling of the midpoint of two integers.
fn ceil_mid(a: i32, b: i32) -> i32 {
    let sum = a as i64 + b as i64;
    (sum.div_euclid(2) + sum.rem_euclid(2)) as i32
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_pinch::{Bone, Correlator, Handedness, Joint};

    const SIZE: ScreenSize = ScreenSize::new(700, 500);

    fn renderer() -> OverlayRenderer {
        OverlayRenderer::new(SIZE, HandRoles::default(), Duration::from_secs(3))
    }

    fn hand(h: Handedness, x: f32, gap: [f32; 3]) -> Hand {
        Hand::posed(h, Joint::new(x, 200.0, 40.0), gap)
    }

    fn render(frame: &Frame, state: CalibrationState, mode: RenderMode) -> FrameBuffer {
        let correlation = Correlator::default().correlate(frame);
        renderer().render(&OverlayInput {
            frame,
            correlation: &correlation,
            state,
            capture: None,
            mode,
            tracking_mode: Some(TrackingMode::Desktop),
            now: Instant::now(),
        })
    }

    #[test]
    fn empty_frame_renders_captions_only() {
        let buf = render(&Frame::default(), CalibrationState::Idle, RenderMode::Skeleton);
        assert_eq!(buf.width(), 700);
        assert_eq!(buf.height(), 500);
        // Centre of the screen is untouched.
        assert_eq!(buf.pixel(350, 250), Some(BLACK));
        assert!(buf.count_not(BLACK) > 0);
    }

    #[test]
    fn dots_mark_joints() {
        let h = hand(Handedness::Right, 120.0, [40.0, 0.0, 30.0]);
        let tip = Projector::new(SIZE).project(h.digits[2].tip()).unwrap();
        let frame = Frame::new(1, 0, vec![h]);
        let buf = render(&frame, CalibrationState::Idle, RenderMode::Dots);
        assert_eq!(buf.pixel(tip.x, tip.y), Some(YELLOW));
    }

    #[test]
    fn skeleton_draws_more_than_dots() {
        let frame = Frame::new(1, 0, vec![hand(Handedness::Right, 120.0, [40.0, 0.0, 30.0])]);
        let dots = render(&frame, CalibrationState::Idle, RenderMode::Dots);
        let skel = render(&frame, CalibrationState::Idle, RenderMode::Skeleton);
        assert!(skel.count_not(BLACK) > dots.count_not(BLACK));
    }

    #[test]
    fn missing_joints_are_skipped_not_defaulted() {
        let mut h = hand(Handedness::Right, 120.0, [40.0, 0.0, 30.0]);
        h.arm = Bone::missing();
        for digit in h.digits.iter_mut() {
            for bone in digit.bones.iter_mut() {
                *bone = Bone::missing();
            }
        }
        let with_gaps = Frame::new(1, 0, vec![h]);
        for mode in [RenderMode::Dots, RenderMode::Skeleton] {
            let buf = render(&with_gaps, CalibrationState::Idle, mode);
            let blank = render(&Frame::default(), CalibrationState::Idle, mode);
            assert_eq!(buf, blank, "{:?}", mode);
            // A default (0,0,0) joint would land at the centre.
            assert_eq!(buf.pixel(350, 250), Some(BLACK));
        }
    }

    #[test]
    fn pinch_circle_filled_only_when_pinching() {
        let open = Frame::new(1, 0, vec![hand(Handedness::Left, -120.0, [60.0, 0.0, 60.0])]);
        let pinch = Frame::new(1, 0, vec![hand(Handedness::Left, -120.0, [2.0, 1.0, 2.0])]);

        let centre = |f: &Frame| {
            let c = Correlator::default().correlate(f);
            let p = Projector::new(SIZE);
            let (t, i) = (p.project(c.trigger_thumb).unwrap(), p.project(c.trigger_index).unwrap());
            ScreenPoint::new(ceil_mid(t.x, i.x), ceil_mid(t.y, i.y))
        };

        // Wide gap → large hollow ring; the centre stays dark.
        let c = centre(&open);
        let buf = render(&open, CalibrationState::Idle, RenderMode::Dots);
        assert_eq!(buf.pixel(c.x, c.y), Some(BLACK));

        let c = centre(&pinch);
        let buf = render(&pinch, CalibrationState::Idle, RenderMode::Dots);
        assert_ne!(buf.pixel(c.x, c.y), Some(BLACK));
    }

    #[test]
    fn wild_tip_distance_draws_a_bounded_ring() {
        let far = Frame::new(1, 0, vec![hand(Handedness::Left, -120.0, [3.0e30, 0.0, 0.0])]);
        for mode in [RenderMode::Dots, RenderMode::Skeleton] {
            let buf = render(&far, CalibrationState::Idle, mode);
            assert_eq!(buf.width(), 700);
        }
        assert_eq!(ceil_mid(i32::MAX, i32::MAX), i32::MAX);

        let c = Correlator::default().correlate(&far);
        let r = c.trigger_pinch.unwrap().display_radius(SIZE);
        assert!(r > SIZE.height);
    }

    #[test]
    fn subject_tips_highlighted_while_pinching() {
        let right = hand(Handedness::Right, 120.0, [30.0, 0.0, 25.0]);
        let thumb = Projector::new(SIZE).project(right.digits[0].tip()).unwrap();
        let frame = Frame::new(1, 0, vec![hand(Handedness::Left, -120.0, [2.0, 1.0, 2.0]), right]);
        let buf = render(&frame, CalibrationState::Idle, RenderMode::Dots);
        assert_eq!(buf.pixel(thumb.x, thumb.y), Some(BLUE));
    }

    #[test]
    fn captions_differ_by_state() {
        let frame = Frame::default();
        let now = Instant::now();
        let idle = render(&frame, CalibrationState::Idle, RenderMode::Dots);
        let armed = render(
            &frame,
            CalibrationState::Armed { deadline: now + Duration::from_secs(3), armed_with: None },
            RenderMode::Dots,
        );
        let fired = render(&frame, CalibrationState::Fired, RenderMode::Dots);
        assert_ne!(idle, armed);
        assert_ne!(armed, fired);
        assert_ne!(idle, fired);
    }

    #[test]
    fn capture_failure_is_visible() {
        let frame = Frame::default();
        let correlation = CorrelationResult::default();
        let saved = CaptureStatus::Saved { file_name: "Finger_calibration.json".into() };
        let failed = CaptureStatus::Failed { reason: "disk full".into() };
        let input = |capture| OverlayInput {
            frame: &frame,
            correlation: &correlation,
            state: CalibrationState::Fired,
            capture,
            mode: RenderMode::Dots,
            tracking_mode: None,
            now: Instant::now(),
        };
        let ok = renderer().render(&input(Some(&saved)));
        let bad = renderer().render(&input(Some(&failed)));
        assert_ne!(ok, bad);
        assert!(bad.pixels().contains(&RED));
        assert!(!ok.pixels().contains(&RED));
    }

    #[test]
    fn render_mode_toggles() {
        assert_eq!(RenderMode::Dots.toggled(), RenderMode::Skeleton);
        assert_eq!(RenderMode::Skeleton.toggled(), RenderMode::Dots);
    }

    #[test]
    fn webbing_pattern() {
        assert!(webbed(0, 0));
        assert!(!webbed(0, 1));
        assert!(webbed(1, 0) && webbed(3, 1));
        assert!(!webbed(3, 2));
        assert!(!webbed(4, 0));
    }

    #[test]
    fn ceil_mid_rounds_up() {
        assert_eq!(ceil_mid(2, 5), 4);
        assert_eq!(ceil_mid(-3, 0), -1);
        assert_eq!(ceil_mid(4, 4), 4);
    }
}
