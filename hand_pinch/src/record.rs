//! The calibration record and its on-disk JSON document.
//!
//! The document is a three-element array, reproduced field for field for the
//! tools that read it:
//!
//! ```json
//! [
//!   { "global_time": "2024/05/01 14:03:07.123456", "leap_time": 8812349911 },
//!   { "finger_type": "right_thumb", "position": { "x": 12.5, "y": -3.0, "z": 40.2 } },
//!   { "finger_type": "right_index", "position": { "x": 8.1,  "y": -1.4, "z": 38.9 } }
//! ]
//! ```

use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::calibration::SubjectSnapshot;
use crate::frame::{Handedness, Joint};

/// `global_time` layout: local time, microsecond precision.
pub const GLOBAL_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.6f";

// ════════════════════════════════════════════════════════════════════════════
// RecordError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum RecordError {
    Json(serde_json::Error),
    Timestamp(chrono::ParseError),
    FingerType { expected: String, found: String },
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(e) => write!(f, "calibration document: {}", e),
            Self::Timestamp(e) => write!(f, "global_time: {}", e),
            Self::FingerType { expected, found } => {
                write!(f, "finger_type: expected {:?}, found {:?}", expected, found)
            }
        }
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Timestamp(e) => Some(e),
            Self::FingerType { .. } => None,
        }
    }
}

impl From<serde_json::Error> for RecordError {
    fn from(e: serde_json::Error) -> Self {
        RecordError::Json(e)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Document entries
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<Joint> for Position {
    fn from(j: Joint) -> Self {
        Position { x: widen(j.x), y: widen(j.y), z: widen(j.z) }
    }
}

/// `f32` to `f64` through the shortest decimal naming the same `f32`, so a
/// tip reported as 38.9 is written as 38.9 rather than 38.900001525878906.
fn widen(v: f32) -> f64 {
    v.to_string().parse().unwrap_or(v as f64)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub global_time: String,
    pub leap_time: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerEntry {
    pub finger_type: String,
    pub position: Position,
}

/// Serialises as a JSON array of exactly three entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationDocument(pub TimeEntry, pub FingerEntry, pub FingerEntry);

// ════════════════════════════════════════════════════════════════════════════
// CalibrationRecord
// ════════════════════════════════════════════════════════════════════════════

/// One captured calibration.  Built once, at fire time.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationRecord {
    /// Local wall-clock time, truncated to whole microseconds.
    pub wall_clock: NaiveDateTime,
    /// Sensor-domain monotonic time (µs).
    pub sensor_time_us: i64,
    pub subject: Handedness,
    pub thumb: Position,
    pub index: Position,
}

impl CalibrationRecord {
    pub fn new(
        wall_clock: DateTime<Local>,
        sensor_time_us: i64,
        subject: Handedness,
        snapshot: SubjectSnapshot,
    ) -> Self {
        let naive = wall_clock.naive_local();
        let micros = naive.nanosecond() / 1_000 * 1_000;
        CalibrationRecord {
            wall_clock: naive.with_nanosecond(micros).unwrap_or(naive),
            sensor_time_us,
            subject,
            thumb: snapshot.thumb.into(),
            index: snapshot.index.into(),
        }
    }

    fn finger_type(subject: Handedness, finger: &str) -> String {
        format!("{}_{}", subject.name(), finger)
    }

    pub fn to_document(&self) -> CalibrationDocument {
        CalibrationDocument(
            TimeEntry {
                global_time: self.wall_clock.format(GLOBAL_TIME_FORMAT).to_string(),
                leap_time: self.sensor_time_us,
            },
            FingerEntry {
                finger_type: Self::finger_type(self.subject, "thumb"),
                position: self.thumb,
            },
            FingerEntry {
                finger_type: Self::finger_type(self.subject, "index"),
                position: self.index,
            },
        )
    }

    pub fn from_document(doc: &CalibrationDocument) -> Result<Self, RecordError> {
        let CalibrationDocument(time, thumb, index) = doc;
        let subject = if thumb.finger_type.starts_with("left_") {
            Handedness::Left
        } else {
            Handedness::Right
        };
        for (entry, finger) in [(thumb, "thumb"), (index, "index")] {
            let expected = Self::finger_type(subject, finger);
            if entry.finger_type != expected {
                return Err(RecordError::FingerType {
                    expected,
                    found: entry.finger_type.clone(),
                });
            }
        }
        let wall_clock = NaiveDateTime::parse_from_str(&time.global_time, GLOBAL_TIME_FORMAT)
            .map_err(RecordError::Timestamp)?;
        Ok(CalibrationRecord {
            wall_clock,
            sensor_time_us: time.leap_time,
            subject,
            thumb: thumb.position,
            index: index.position,
        })
    }

    /// Pretty-printed JSON, two-space indent.
    pub fn to_json(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    pub fn from_json(text: &str) -> Result<Self, RecordError> {
        let doc: CalibrationDocument = serde_json::from_str(text)?;
        Self::from_document(&doc)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
