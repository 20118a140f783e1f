//! Hand-pose frame model.
//!
//! Coordinates are sensor-space millimetres.  A [`Frame`] owns its hands, a
//! hand owns five digits and an arm segment, and a digit owns four bones.
//! Any joint may be missing (`None`) when the sensor lost track of it.

use serde::{Deserialize, Serialize};

pub const DIGITS_PER_HAND: usize = 5;
pub const BONES_PER_DIGIT: usize = 4;

// ════════════════════════════════════════════════════════════════════════════
// Joint
// ════════════════════════════════════════════════════════════════════════════

/// A 3D point in sensor space (mm).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Joint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Joint {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Joint { x, y, z }
    }

    pub fn offset(self, dx: f32, dy: f32, dz: f32) -> Self {
        Joint::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Linear interpolation toward `other`; `t` = 0.0 → self, 1.0 → other.
    pub fn lerp(self, other: Joint, t: f32) -> Self {
        Joint::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }

    /// Per-axis absolute difference `|self_i - other_i|`.
    pub fn abs_diff(self, other: Joint) -> [f32; 3] {
        [
            (self.x - other.x).abs(),
            (self.y - other.y).abs(),
            (self.z - other.z).abs(),
        ]
    }

    pub fn distance(self, other: Joint) -> f32 {
        let [dx, dy, dz] = self.abs_diff(other);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Handedness
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    pub fn opposite(self) -> Self {
        match self {
            Handedness::Left => Handedness::Right,
            Handedness::Right => Handedness::Left,
        }
    }

    /// Lower-case name, as used in record field values (`right_thumb`).
    pub fn name(self) -> &'static str {
        match self {
            Handedness::Left => "left",
            Handedness::Right => "right",
        }
    }

    /// +1 for the left hand, -1 for the right: the side of the palm (along
    /// sensor x) the thumb sits on when the palm faces down.
    fn thumb_side(self) -> f32 {
        match self {
            Handedness::Left => 1.0,
            Handedness::Right => -1.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Bone / Digit
// ════════════════════════════════════════════════════════════════════════════

/// Ordered joint pair: `prev_joint` is proximal, `next_joint` distal.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bone {
    pub prev_joint: Option<Joint>,
    pub next_joint: Option<Joint>,
}

impl Bone {
    pub fn new(prev_joint: Joint, next_joint: Joint) -> Self {
        Bone { prev_joint: Some(prev_joint), next_joint: Some(next_joint) }
    }

    /// A bone the sensor is not tracking.
    pub fn missing() -> Self {
        Bone::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoneKind {
    Metacarpal = 0,
    Proximal = 1,
    Intermediate = 2,
    Distal = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DigitKind {
    Thumb = 0,
    Index = 1,
    Middle = 2,
    Ring = 3,
    Pinky = 4,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Digit {
    pub bones: [Bone; BONES_PER_DIGIT],
}

impl Digit {
    pub fn bone(&self, kind: BoneKind) -> &Bone {
        &self.bones[kind as usize]
    }

    pub fn distal(&self) -> &Bone {
        self.bone(BoneKind::Distal)
    }

    /// Fingertip: the distal bone's distal joint.
    pub fn tip(&self) -> Option<Joint> {
        self.distal().next_joint
    }

    /// Chain four bones through five joints, base to tip.
    fn chain(joints: [Joint; BONES_PER_DIGIT + 1]) -> Self {
        let mut bones = [Bone::missing(); BONES_PER_DIGIT];
        for (i, bone) in bones.iter_mut().enumerate() {
            *bone = Bone::new(joints[i], joints[i + 1]);
        }
        Digit { bones }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Hand
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct Hand {
    pub handedness: Handedness,
    pub digits: [Digit; DIGITS_PER_HAND],
    /// Forearm: `prev_joint` = elbow, `next_joint` = wrist.
    pub arm: Bone,
}

impl Hand {
    pub fn digit(&self, kind: DigitKind) -> &Digit {
        &self.digits[kind as usize]
    }

    pub fn tip(&self, kind: DigitKind) -> Option<Joint> {
        self.digit(kind).tip()
    }

    pub fn wrist(&self) -> Option<Joint> {
        self.arm.next_joint
    }

    pub fn elbow(&self) -> Option<Joint> {
        self.arm.prev_joint
    }

    /// Build a plausible palm-down hand around `palm`.
    ///
    /// Fingers extend toward −z.  The index finger is straight; the thumb tip
    /// is placed `thumb_gap` away from the index tip, so a small gap gives a
    /// pinch and a wide one an open hand.  Used by the simulated sensor and
    /// by tests.
    pub fn posed(handedness: Handedness, palm: Joint, thumb_gap: [f32; 3]) -> Self {
        let side = handedness.thumb_side();
        let wrist = palm.offset(0.0, 0.0, 45.0);
        let elbow = wrist.offset(0.0, -20.0, 240.0);

        // Index..pinky knuckles fan out away from the thumb side.
        const KNUCKLE_X: [f32; 4] = [24.0, 8.0, -8.0, -24.0];
        const SEGMENTS: [f32; 3] = [35.0, 22.0, 18.0];

        let mut digits = [Digit::default(); DIGITS_PER_HAND];
        for (i, knuckle_x) in KNUCKLE_X.iter().enumerate() {
            let base = wrist.offset(side * knuckle_x * 0.5, 0.0, -5.0);
            let knuckle = palm.offset(side * knuckle_x, 0.0, -35.0);
            let p1 = knuckle.offset(0.0, 0.0, -SEGMENTS[0]);
            let p2 = p1.offset(0.0, 0.0, -SEGMENTS[1]);
            let tip = p2.offset(0.0, 0.0, -SEGMENTS[2]);
            digits[i + 1] = Digit::chain([base, knuckle, p1, p2, tip]);
        }

        let index_tip = digits[DigitKind::Index as usize].tip().unwrap_or(palm);
        let thumb_tip = index_tip.offset(side * thumb_gap[0], thumb_gap[1], thumb_gap[2]);
        let thumb_base = wrist.offset(side * 20.0, 0.0, -10.0);
        // Leap-style thumb: zero-length metacarpal.
        digits[DigitKind::Thumb as usize] = Digit::chain([
            thumb_base,
            thumb_base,
            thumb_base.lerp(thumb_tip, 0.45),
            thumb_base.lerp(thumb_tip, 0.75),
            thumb_tip,
        ]);

        Hand { handedness, digits, arm: Bone::new(elbow, wrist) }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Frame
// ════════════════════════════════════════════════════════════════════════════

/// One snapshot of every tracked hand at a sensor tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub id: u64,
    /// Sensor-domain timestamp (µs).
    pub timestamp_us: i64,
    pub hands: Vec<Hand>,
}

impl Frame {
    pub fn new(id: u64, timestamp_us: i64, hands: Vec<Hand>) -> Self {
        Frame { id, timestamp_us, hands }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
