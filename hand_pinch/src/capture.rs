//! Capture writer: persists the calibration record.
//!
//! The writer does not enforce "at most once"; the calibration latch does.
//! What the writer guarantees is that the final path never holds a truncated
//! file: bytes go to a hidden temporary sibling first and are renamed into
//! place only after a successful flush.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::record::{CalibrationRecord, RecordError};

// ════════════════════════════════════════════════════════════════════════════
// CaptureError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum CaptureError {
    Serialize(RecordError),
    CreateDir { path: PathBuf, source: std::io::Error },
    Write { path: PathBuf, source: std::io::Error },
    Rename { from: PathBuf, to: PathBuf, source: std::io::Error },
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(e) => write!(f, "cannot serialise record: {}", e),
            Self::CreateDir { path, source } => {
                write!(f, "cannot create {}: {}", path.display(), source)
            }
            Self::Write { path, source } => {
                write!(f, "cannot write {}: {}", path.display(), source)
            }
            Self::Rename { from, to, source } => {
                write!(f, "cannot move {} to {}: {}", from.display(), to.display(), source)
            }
        }
    }
}

impl std::error::Error for CaptureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialize(e) => Some(e),
            Self::CreateDir { source, .. }
            | Self::Write { source, .. }
            | Self::Rename { source, .. } => Some(source),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// RecordStore — where named records end up
// ════════════════════════════════════════════════════════════════════════════

/// Durable storage for named records.
pub trait RecordStore: Send {
    /// Store `contents` under `name`, replacing any previous record, and
    /// return the final location.
    fn write_record(&self, name: &str, contents: &[u8]) -> Result<PathBuf, CaptureError>;
}

/// Records as files in one directory, created on first write.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordStore for DirectoryStore {
    fn write_record(&self, name: &str, contents: &[u8]) -> Result<PathBuf, CaptureError> {
        fs::create_dir_all(&self.dir).map_err(|source| CaptureError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let target = self.dir.join(name);
        let staging = self.dir.join(format!(".{}.tmp", name));

        let written = File::create(&staging).and_then(|mut f| {
            f.write_all(contents)?;
            f.sync_all()
        });
        if let Err(source) = written {
            discard(&staging);
            return Err(CaptureError::Write { path: staging, source });
        }

        if let Err(source) = fs::rename(&staging, &target) {
            discard(&staging);
            return Err(CaptureError::Rename { from: staging, to: target, source });
        }
        debug!(path = %target.display(), bytes = contents.len(), "record stored");
        Ok(target)
    }
}

fn discard(staging: &Path) {
    if let Err(e) = fs::remove_file(staging) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %staging.display(), error = %e, "could not remove staging file");
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CaptureWriter
// ════════════════════════════════════════════════════════════════════════════

pub struct CaptureWriter {
    store: Box<dyn RecordStore>,
    file_name: String,
}

impl CaptureWriter {
    pub fn new<S: RecordStore + 'static>(store: S, file_name: impl Into<String>) -> Self {
        CaptureWriter { store: Box::new(store), file_name: file_name.into() }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Serialise and store `record`; returns the final path.
    pub fn write(&self, record: &CalibrationRecord) -> Result<PathBuf, CaptureError> {
        let json = record.to_json().map_err(CaptureError::Serialize)?;
        self.store.write_record(&self.file_name, json.as_bytes())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::SubjectSnapshot;
    use crate::frame::{Handedness, Joint};
    use chrono::Local;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static SCRATCH_ID: AtomicUsize = AtomicUsize::new(0);

    /// Unique scratch directory under the system temp dir.
    fn scratch() -> PathBuf {
        let n = SCRATCH_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("hand_pinch_capture_{}_{}", std::process::id(), n))
    }

    fn record(x: f32) -> CalibrationRecord {
        CalibrationRecord::new(
            Local::now(),
            1_234_567,
            Handedness::Right,
            SubjectSnapshot {
                thumb: Joint::new(x, -3.0, 40.25),
                index: Joint::new(8.5, -1.5, 38.75),
            },
        )
    }

    #[test]
    fn writes_into_nested_missing_directory() {
        let root = scratch();
        let dir = root.join("CalibrationData");
        let writer = CaptureWriter::new(DirectoryStore::new(&dir), "Finger_calibration.json");

        let rec = record(12.5);
        let path = writer.write(&rec).unwrap();
        assert_eq!(path, dir.join("Finger_calibration.json"));

        let back = CalibrationRecord::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, rec);
        assert!(!dir.join(".Finger_calibration.json.tmp").exists());

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn written_positions_match_sensor_decimals() {
        let root = scratch();
        let writer = CaptureWriter::new(DirectoryStore::new(&root), "Finger_calibration.json");
        let rec = CalibrationRecord::new(
            Local::now(),
            77,
            Handedness::Right,
            SubjectSnapshot {
                thumb: Joint::new(12.5, -3.0, 40.2),
                index: Joint::new(8.1, -1.4, 38.9),
            },
        );

        let path = writer.write(&rec).unwrap();
        let back = CalibrationRecord::from_json(&fs::read_to_string(&path).unwrap()).unwrap();

        let close = |a: f64, b: f64| (a - b).abs() < 1e-6;
        for (got, want) in [(back.thumb, [12.5, -3.0, 40.2]), (back.index, [8.1, -1.4, 38.9])] {
            assert!(
                close(got.x, want[0]) && close(got.y, want[1]) && close(got.z, want[2]),
                "{:?} vs {:?}",
                got,
                want
            );
        }
        assert_eq!(back.sensor_time_us, 77);
        assert_eq!(back.wall_clock, rec.wall_clock);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn rewrite_replaces_previous_file() {
        let root = scratch();
        let writer = CaptureWriter::new(DirectoryStore::new(&root), "run.json");
        writer.write(&record(1.0)).unwrap();
        let path = writer.write(&record(2.0)).unwrap();
        let back = CalibrationRecord::from_json(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(back.thumb.x, 2.0);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn directory_blocked_by_file_is_create_dir_error() {
        let root = scratch();
        fs::create_dir_all(&root).unwrap();
        let blocker = root.join("not_a_dir");
        fs::write(&blocker, b"x").unwrap();

        let writer = CaptureWriter::new(DirectoryStore::new(blocker.join("sub")), "f.json");
        let err = writer.write(&record(0.0)).unwrap_err();
        assert!(matches!(err, CaptureError::CreateDir { .. }), "{}", err);
        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn failed_rename_leaves_no_partial_file() {
        let root = scratch();
        // A directory squatting on the target name makes the rename fail.
        fs::create_dir_all(root.join("taken.json").join("inner")).unwrap();

        let writer = CaptureWriter::new(DirectoryStore::new(&root), "taken.json");
        let err = writer.write(&record(0.0)).unwrap_err();
        assert!(matches!(err, CaptureError::Rename { .. }), "{}", err);
        assert!(!root.join(".taken.json.tmp").exists());
        assert!(root.join("taken.json").is_dir());
        fs::remove_dir_all(&root).ok();
    }
}
