//! # hand_pinch
//!
//! The frame-processing core behind the pinch-shot calibration tool.
//!
//! A motion sensor delivers one [`Frame`] per tick.  Each frame flows through:
//!
//! | Stage | Module | Output |
//! |---|---|---|
//! | Projection | [`projection`] | 2D screen points for the overlay |
//! | Pinch classification | [`pinch`] | [`PinchObservation`] per hand |
//! | Role correlation | [`correlate`] | [`CorrelationResult`] (trigger / subject) |
//! | Calibration latch | [`calibration`] | [`Transition`], at most one fire |
//! | Capture | [`record`], [`capture`] | the calibration record on disk |
//!
//! The trigger hand (left by default) arms a three-second countdown by
//! pinching.  Releasing the pinch disarms it.  If the pinch is still held when
//! the countdown runs out, the subject hand's thumb and index fingertips are
//! written to a JSON record and the latch goes terminal.

pub mod frame;
pub mod projection;
pub mod pinch;
pub mod correlate;
pub mod calibration;
pub mod record;
pub mod capture;

pub use frame::{
    Bone, BoneKind, Digit, DigitKind, Frame, Hand, Handedness, Joint, BONES_PER_DIGIT,
    DIGITS_PER_HAND,
};
pub use projection::{project, Projector, ScreenPoint, ScreenSize};
pub use pinch::{PinchClassifier, PinchObservation, DEFAULT_PINCH_THRESHOLD_MM};
pub use correlate::{CorrelationResult, Correlator, HandRoles};
pub use calibration::{
    CalibrationMachine, CalibrationState, SubjectSnapshot, Transition, DEFAULT_CAPTURE_DELAY,
};
pub use record::{CalibrationDocument, CalibrationRecord, Position, RecordError};
pub use capture::{CaptureError, CaptureWriter, DirectoryStore, RecordStore};
