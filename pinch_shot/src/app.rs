//! Top-level wiring.
//!
//! Three threads cooperate:
//!
//! * the **sensor** thread delivers [`SensorEvent`]s (simulated by default,
//!   hardware with `--features leap`);
//! * the **producer** thread runs the [`Pipeline`] over each event and
//!   publishes rendered overlays into a [`FrameSlot`];
//! * the **main** thread owns the window, shows the newest overlay, and turns
//!   key presses into commands.
//!
//! Shutdown asks the sensor to stop and then joins both threads, so a record
//! write already in progress always finishes.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

use hand_pinch::{CaptureWriter, DirectoryStore};

use crate::config::Config;
use crate::overlay::RenderMode;
use crate::pipeline::{CaptureOutcome, FrameSlot, Pipeline};
use crate::sensor::{spawn_sensor_source, SensorCommand, SensorEvent, SensorLink, SimInput};
use crate::window::{PresentationWindow, UiCommand};

// ════════════════════════════════════════════════════════════════════════════
// RunSummary
// ════════════════════════════════════════════════════════════════════════════

/// What a session achieved, reported once the window closes.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub capture: Option<CaptureOutcome>,
}

impl RunSummary {
    pub fn capture_failed(&self) -> bool {
        matches!(self.capture, Some(CaptureOutcome::Failed(_)))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SharedRenderMode
// ════════════════════════════════════════════════════════════════════════════

/// Hands format, toggled from the window and read by the producer.
#[derive(Clone, Debug)]
pub struct SharedRenderMode(Arc<Mutex<RenderMode>>);

impl SharedRenderMode {
    pub fn new(mode: RenderMode) -> Self {
        SharedRenderMode(Arc::new(Mutex::new(mode)))
    }

    pub fn get(&self) -> RenderMode {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Flip between dots and skeleton; returns the new mode.
    pub fn toggle(&self) -> RenderMode {
        let mut mode = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *mode = mode.toggled();
        *mode
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Thread plumbing
// ════════════════════════════════════════════════════════════════════════════

#[cfg(not(feature = "leap"))]
fn start_sensor(config: &Config) -> (SensorLink, Option<Sender<SimInput>>) {
    use crate::sensor::SimSensorSource;

    let (sim_tx, sim_rx) = std::sync::mpsc::channel();
    let source = SimSensorSource::new(
        sim_rx,
        config.calibration.trigger_hand,
        config.display.tracking_mode,
    );
    (spawn_sensor_source(source), Some(sim_tx))
}

#[cfg(feature = "leap")]
fn start_sensor(config: &Config) -> (SensorLink, Option<Sender<SimInput>>) {
    use crate::sensor::LeapSensorSource;

    let source = LeapSensorSource { initial_mode: config.display.tracking_mode };
    (spawn_sensor_source(source), None)
}

/// Run the pipeline over every event until the sensor hangs up.
pub fn spawn_producer(
    mut pipeline: Pipeline,
    events: Receiver<SensorEvent>,
    slot: Arc<FrameSlot>,
    mode: SharedRenderMode,
) -> JoinHandle<RunSummary> {
    thread::spawn(move || {
        for event in events {
            if let Some(frame) = pipeline.handle_event(event, mode.get(), Instant::now()) {
                slot.publish(frame);
            }
        }
        debug!("sensor stream ended");
        RunSummary {
            frames_processed: pipeline.frames_seen(),
            capture: pipeline.capture().cloned(),
        }
    })
}

fn join_sensor(commands: &Sender<SensorCommand>, thread: JoinHandle<()>) -> Result<()> {
    // The sensor may already be gone; that is fine.
    let _ = commands.send(SensorCommand::Shutdown);
    thread.join().map_err(|_| anyhow!("sensor thread panicked"))
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the calibration tool until the window closes or `X` is pressed.
pub fn run(config: Config) -> Result<RunSummary> {
    let (link, sim_tx) = start_sensor(&config);
    let SensorLink { events, commands, clock, thread: sensor_thread } = link;

    let mut window = match PresentationWindow::new(config.screen_size(), sim_tx) {
        Ok(w) => w,
        Err(e) => {
            join_sensor(&commands, sensor_thread)?;
            return Err(anyhow!("cannot open window: {}", e));
        }
    };

    info!(
        trigger = config.roles().trigger.name(),
        subject = config.roles().subject().name(),
        output = %config.output_path().display(),
        "ready, pinch the trigger hand to calibrate"
    );

    let writer = CaptureWriter::new(
        DirectoryStore::new(&config.calibration.output_dir),
        config.calibration.file_name.clone(),
    );
    let render_mode = SharedRenderMode::new(config.display.hands_format);
    let slot = Arc::new(FrameSlot::new());
    let producer = spawn_producer(
        Pipeline::new(config, writer, clock),
        events,
        slot.clone(),
        render_mode.clone(),
    );

    let mut last_shown = 0;
    'ui: while window.is_open() {
        for command in window.poll_commands() {
            match command {
                UiCommand::Exit => break 'ui,
                UiCommand::SetTrackingMode(mode) => {
                    info!(mode = mode.name(), "requesting tracking mode");
                    if commands.send(SensorCommand::SetTrackingMode(mode)).is_err() {
                        warn!("sensor is gone, tracking mode not sent");
                    }
                }
                UiCommand::ToggleRenderMode => {
                    let mode = render_mode.toggle();
                    info!(mode = mode.name(), "hands format");
                }
            }
        }

        if producer.is_finished() {
            warn!("sensor stream ended, closing");
            break;
        }

        let fresh = slot.take_newer(last_shown);
        if let Some(frame) = &fresh {
            last_shown = frame.sequence;
        }
        if let Err(e) = window.present(fresh.as_deref().map(|f| &f.buffer)) {
            warn!(error = %e, "window update failed, closing");
            break;
        }
    }

    info!("shutting down");
    join_sensor(&commands, sensor_thread)?;
    producer.join().map_err(|_| anyhow!("producer thread panicked"))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::mpsc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use hand_pinch::Handedness;

    use crate::sensor::{MonotonicClock, SimScene, SimSensorSource, TrackingMode};

    static SCRATCH_ID: AtomicUsize = AtomicUsize::new(0);

    fn scratch() -> PathBuf {
        let n = SCRATCH_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("pinch_shot_app_{}_{}", std::process::id(), n))
    }

    fn pipeline_in(dir: &Path, config: Config) -> Pipeline {
        let writer = CaptureWriter::new(DirectoryStore::new(dir), config.calibration.file_name.clone());
        Pipeline::new(config, writer, Arc::new(MonotonicClock::new()))
    }

    #[test]
    fn render_mode_toggles_across_clones() {
        let a = SharedRenderMode::new(RenderMode::Dots);
        let b = a.clone();
        assert_eq!(b.toggle(), RenderMode::Skeleton);
        assert_eq!(a.get(), RenderMode::Skeleton);
    }

    #[test]
    fn producer_publishes_and_summarises() {
        let dir = scratch();
        let mut config = Config::default();
        config.calibration.delay_secs = 0.0;

        let (tx, rx) = mpsc::channel();
        let slot = Arc::new(FrameSlot::new());
        let producer = spawn_producer(
            pipeline_in(&dir, config),
            rx,
            slot.clone(),
            SharedRenderMode::new(RenderMode::Skeleton),
        );

        let mut scene = SimScene::new(Handedness::Left);
        scene.apply(SimInput::Pinch(true));
        tx.send(SensorEvent::Connection { connected: true }).unwrap();
        tx.send(SensorEvent::TrackingMode(TrackingMode::Desktop)).unwrap();
        for ts in 0..3 {
            tx.send(SensorEvent::Tracking(scene.next_frame(ts))).unwrap();
        }
        drop(tx);

        let summary = producer.join().unwrap();
        assert_eq!(summary.frames_processed, 3);
        assert_eq!(
            summary.capture,
            Some(CaptureOutcome::Saved(dir.join("Finger_calibration.json")))
        );
        assert!(!summary.capture_failed());
        assert_eq!(slot.take_newer(0).map(|f| f.sequence), Some(3));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn producer_without_pinch_captures_nothing() {
        let dir = scratch();
        let (tx, rx) = mpsc::channel();
        let slot = Arc::new(FrameSlot::new());
        let producer = spawn_producer(
            pipeline_in(&dir, Config::default()),
            rx,
            slot,
            SharedRenderMode::new(RenderMode::Dots),
        );

        let mut scene = SimScene::new(Handedness::Left);
        for ts in 0..5 {
            tx.send(SensorEvent::Tracking(scene.next_frame(ts))).unwrap();
        }
        drop(tx);

        let summary = producer.join().unwrap();
        assert_eq!(summary.frames_processed, 5);
        assert_eq!(summary.capture, None);
        assert!(!dir.exists());
    }

    #[test]
    fn sensor_shutdown_ends_producer() {
        let dir = scratch();
        let (_sim_tx, sim_rx) = mpsc::channel();
        let mut source = SimSensorSource::new(sim_rx, Handedness::Left, TrackingMode::Desktop);
        source.tick = Duration::from_millis(1);
        let SensorLink { events, commands, clock, thread } = spawn_sensor_source(source);

        let writer = CaptureWriter::new(DirectoryStore::new(&dir), "Finger_calibration.json");
        let producer = spawn_producer(
            Pipeline::new(Config::default(), writer, clock),
            events,
            Arc::new(FrameSlot::new()),
            SharedRenderMode::new(RenderMode::Dots),
        );

        std::thread::sleep(Duration::from_millis(20));
        join_sensor(&commands, thread).unwrap();
        let summary = producer.join().unwrap();
        assert!(summary.frames_processed > 0);
        assert_eq!(summary.capture, None);
    }
}
