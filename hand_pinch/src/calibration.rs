//! The calibration latch.
//!
//! ```text
//!            trigger pinching, both hands seen
//!   Idle ─────────────────────────────────────▶ Armed { deadline = now + delay }
//!    ▲                                             │
//!    │   trigger released, either hand out of view │
//!    └─────────────────────────────────────────────┤
//!                                                  │ now ≥ deadline, still pinching,
//!                                                  │ subject tips in this frame
//!                                                  ▼
//!                                                Fired  (absorbing)
//! ```
//!
//! Before the deadline, losing either hand disarms.  Past the deadline without
//! subject tips the machine stays `Armed` and fires on the first later frame
//! that has them.  A delay too large to add to the clock never arms.  The record is always built from
//! the frame that causes the fire, never from the arming frame.

use std::time::{Duration, Instant};

use crate::correlate::CorrelationResult;
use crate::frame::Joint;

/// Delay between arming and firing.
pub const DEFAULT_CAPTURE_DELAY: Duration = Duration::from_secs(3);

/// Subject thumb and index tips at one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SubjectSnapshot {
    pub thumb: Joint,
    pub index: Joint,
}

impl SubjectSnapshot {
    /// Largest tip displacement (mm) between two snapshots.
    pub fn drift_from(&self, earlier: &SubjectSnapshot) -> f32 {
        self.thumb.distance(earlier.thumb).max(self.index.distance(earlier.index))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CalibrationState {
    Idle,
    Armed {
        deadline: Instant,
        /// Subject tips when the machine armed.  Informational only.
        armed_with: Option<SubjectSnapshot>,
    },
    Fired,
}

impl CalibrationState {
    pub fn is_idle(&self) -> bool {
        matches!(self, CalibrationState::Idle)
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, CalibrationState::Armed { .. })
    }

    pub fn is_fired(&self) -> bool {
        matches!(self, CalibrationState::Fired)
    }

    /// Whole seconds left on the countdown, rounded up.  `None` unless armed.
    pub fn seconds_remaining(&self, now: Instant) -> Option<u64> {
        match self {
            CalibrationState::Armed { deadline, .. } => {
                let left = deadline.saturating_duration_since(now);
                Some(left.as_secs_f64().ceil() as u64)
            }
            _ => None,
        }
    }
}

/// What a single [`CalibrationMachine::step`] did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transition {
    /// No state change.
    Unchanged,
    Armed { deadline: Instant },
    Disarmed,
    /// Deadline passed while pinching, but the subject tips were not in view.
    Deferred,
    /// Terminal.  Carries the subject tips to record.
    Fired(SubjectSnapshot),
}

#[derive(Clone, Debug)]
pub struct CalibrationMachine {
    state: CalibrationState,
    delay: Duration,
}

impl Default for CalibrationMachine {
    fn default() -> Self {
        CalibrationMachine::new(DEFAULT_CAPTURE_DELAY)
    }
}

impl CalibrationMachine {
    pub fn new(delay: Duration) -> Self {
        CalibrationMachine { state: CalibrationState::Idle, delay }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Feed one frame's observation.
    pub fn step(&mut self, obs: &CorrelationResult, now: Instant) -> Transition {
        match self.state {
            CalibrationState::Fired => Transition::Unchanged,

            CalibrationState::Idle => {
                if obs.both_seen() && obs.trigger_pinching {
                    let Some(deadline) = now.checked_add(self.delay) else {
                        return Transition::Unchanged;
                    };
                    self.state = CalibrationState::Armed {
                        deadline,
                        armed_with: obs.subject_snapshot(),
                    };
                    Transition::Armed { deadline }
                } else {
                    Transition::Unchanged
                }
            }

            CalibrationState::Armed { deadline, .. } => {
                if !(obs.trigger_seen && obs.trigger_pinching) {
                    self.state = CalibrationState::Idle;
                    return Transition::Disarmed;
                }
                if now < deadline {
                    if !obs.subject_seen {
                        self.state = CalibrationState::Idle;
                        return Transition::Disarmed;
                    }
                    return Transition::Unchanged;
                }
                match obs.subject_snapshot() {
                    Some(snapshot) => {
                        self.state = CalibrationState::Fired;
                        Transition::Fired(snapshot)
                    }
                    None => Transition::Deferred,
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
