//! Producer side: everything that runs once per sensor event.
//!
//! [`Pipeline`] owns the calibration latch and the capture writer and turns
//! each tracking frame into a rendered overlay.  Finished buffers go through
//! a [`FrameSlot`] to the presentation loop.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::Local;
use tracing::{debug, error, info};

use hand_pinch::{
    CalibrationMachine, CalibrationRecord, CalibrationState, CaptureWriter, CorrelationResult,
    Correlator, Frame, SubjectSnapshot, Transition,
};

use crate::canvas::FrameBuffer;
use crate::config::Config;
use crate::overlay::{CaptureStatus, OverlayInput, OverlayRenderer, RenderMode};
use crate::sensor::{SensorClock, SensorEvent, TrackingMode};

// ════════════════════════════════════════════════════════════════════════════
// FrameSlot — latest-buffer handoff
// ════════════════════════════════════════════════════════════════════════════

/// A rendered overlay tagged with its position in the output sequence.
#[derive(Debug)]
pub struct RenderedFrame {
    pub sequence: u64,
    pub buffer: FrameBuffer,
}

/// Holds only the newest rendered frame.
///
/// The producer swaps in each new frame; the consumer takes whatever is
/// newest.  Frames can be dropped, but a frame older than one already
/// published or already shown is never handed out.
#[derive(Default)]
pub struct FrameSlot {
    latest: Mutex<Option<Arc<RenderedFrame>>>,
}

impl FrameSlot {
    pub fn new() -> Self {
        FrameSlot::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<RenderedFrame>>> {
        // A panicking holder cannot leave the Option half-written.
        self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the held frame unless it is already newer.
    pub fn publish(&self, frame: RenderedFrame) {
        let mut latest = self.lock();
        if latest.as_ref().map_or(true, |held| frame.sequence > held.sequence) {
            *latest = Some(Arc::new(frame));
        }
    }

    /// The held frame if it is newer than `last_shown`.
    pub fn take_newer(&self, last_shown: u64) -> Option<Arc<RenderedFrame>> {
        self.lock().as_ref().filter(|f| f.sequence > last_shown).cloned()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Pipeline
// ════════════════════════════════════════════════════════════════════════════

/// Result of the one capture attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureOutcome {
    Saved(PathBuf),
    Failed(String),
}

pub struct Pipeline {
    config: Config,
    correlator: Correlator,
    machine: CalibrationMachine,
    writer: CaptureWriter,
    clock: Arc<dyn SensorClock>,
    renderer: OverlayRenderer,

    tracking_mode: Option<TrackingMode>,
    capture: Option<CaptureOutcome>,
    capture_status: Option<CaptureStatus>,
    last_transition: Transition,
    sequence: u64,
    frames_seen: u64,
}

impl Pipeline {
    pub fn new(config: Config, writer: CaptureWriter, clock: Arc<dyn SensorClock>) -> Self {
        Pipeline {
            correlator: config.correlator(),
            machine: CalibrationMachine::new(config.capture_delay()),
            renderer: OverlayRenderer::new(
                config.screen_size(),
                config.roles(),
                config.capture_delay(),
            ),
            config,
            writer,
            clock,
            tracking_mode: None,
            capture: None,
            capture_status: None,
            last_transition: Transition::Unchanged,
            sequence: 0,
            frames_seen: 0,
        }
    }

    pub fn state(&self) -> CalibrationState { self.machine.state() }
    pub fn capture(&self) -> Option<&CaptureOutcome> { self.capture.as_ref() }
    pub fn tracking_mode(&self) -> Option<TrackingMode> { self.tracking_mode }
    pub fn frames_seen(&self) -> u64 { self.frames_seen }

    /// Handle one sensor event; tracking frames yield a rendered overlay.
    pub fn handle_event(
        &mut self,
        event: SensorEvent,
        mode: RenderMode,
        now: Instant,
    ) -> Option<RenderedFrame> {
        match event {
            SensorEvent::Connection { connected } => {
                info!(connected, "sensor connection");
                None
            }
            SensorEvent::Device(device) => {
                info!(serial = %device.serial, "found device");
                None
            }
            SensorEvent::TrackingMode(m) => {
                info!(mode = m.name(), "tracking mode changed");
                self.tracking_mode = Some(m);
                None
            }
            SensorEvent::Tracking(frame) => Some(self.process(&frame, mode, now)),
        }
    }

    /// Run one frame through correlate → latch → capture → render.
    pub fn process(&mut self, frame: &Frame, mode: RenderMode, now: Instant) -> RenderedFrame {
        self.frames_seen += 1;

        // Frames off the stride carry no observation and leave the latch alone.
        let correlation = if self.config.classifies(frame.id) {
            let c = self.correlator.correlate(frame);
            let before = self.machine.state();
            let transition = self.machine.step(&c, now);
            self.on_transition(transition, before);
            c
        } else {
            CorrelationResult::default()
        };

        let buffer = self.renderer.render(&OverlayInput {
            frame,
            correlation: &correlation,
            state: self.machine.state(),
            capture: self.capture_status.as_ref(),
            mode,
            tracking_mode: self.tracking_mode,
            now,
        });

        self.sequence += 1;
        RenderedFrame { sequence: self.sequence, buffer }
    }

    fn on_transition(&mut self, transition: Transition, before: CalibrationState) {
        match transition {
            Transition::Unchanged => {}
            Transition::Armed { .. } => {
                info!(
                    "Pinching has been observed. Calibration will be conducted in {:.0}s.",
                    self.machine.delay().as_secs_f64()
                );
            }
            Transition::Disarmed => debug!("pinch released or hand lost, calibration disarmed"),
            Transition::Deferred => {
                if self.last_transition != Transition::Deferred {
                    debug!("deadline passed without subject fingertips, waiting");
                }
            }
            Transition::Fired(snapshot) => {
                if let CalibrationState::Armed { armed_with: Some(armed), .. } = before {
                    debug!(drift_mm = snapshot.drift_from(&armed), "subject drift since arming");
                }
                self.fire(snapshot);
            }
        }
        self.last_transition = transition;
    }

    fn fire(&mut self, snapshot: SubjectSnapshot) {
        let subject = self.config.roles().subject();
        let record = CalibrationRecord::new(Local::now(), self.clock.now_micros(), subject, snapshot);

        match self.writer.write(&record) {
            Ok(path) => {
                info!(path = %path.display(), "calibration record written");
                self.capture_status = Some(CaptureStatus::Saved {
                    file_name: self.writer.file_name().to_string(),
                });
                self.capture = Some(CaptureOutcome::Saved(path));
            }
            Err(e) => {
                error!(error = %e, "calibration capture failed");
                self.capture_status = Some(CaptureStatus::Failed { reason: e.to_string() });
                self.capture = Some(CaptureOutcome::Failed(e.to_string()));
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
