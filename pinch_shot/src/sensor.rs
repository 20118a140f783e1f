//! Sensor input — real LeapMotion hardware or a keyboard-driven
//! simulation.
//!
//! The public interface is [`SensorEvent`] delivered over a `mpsc` channel,
//! plus [`SensorCommand`]s going the other way.  Consumers don't need to know
//! whether frames came from real hardware or the simulator.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info};

use hand_pinch::{Frame, Hand, Handedness, Joint};

// ════════════════════════════════════════════════════════════════════════════
// Events and commands
// ════════════════════════════════════════════════════════════════════════════

/// Sensor tracking profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    Desktop,
    Hmd,
    ScreenTop,
}

impl TrackingMode {
    pub fn name(self) -> &'static str {
        match self {
            TrackingMode::Desktop => "Desktop",
            TrackingMode::Hmd => "HMD",
            TrackingMode::ScreenTop => "ScreenTop",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub serial: String,
}

/// Everything the sensor can tell us.
#[derive(Clone, Debug, PartialEq)]
pub enum SensorEvent {
    Connection { connected: bool },
    Device(DeviceInfo),
    TrackingMode(TrackingMode),
    Tracking(Frame),
}

/// Requests to the sensor thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorCommand {
    SetTrackingMode(TrackingMode),
    /// Detach from the device and end the thread.
    Shutdown,
}

// ════════════════════════════════════════════════════════════════════════════
// SensorClock / SensorSource
// ════════════════════════════════════════════════════════════════════════════

/// "What time is it on the sensor?" — stamps the calibration record.
pub trait SensorClock: Send + Sync {
    fn now_micros(&self) -> i64;
}

/// Microseconds since the clock was created.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        MonotonicClock { origin: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::new()
    }
}

impl SensorClock for MonotonicClock {
    fn now_micros(&self) -> i64 {
        self.origin.elapsed().as_micros() as i64
    }
}

/// Anything that can deliver [`SensorEvent`]s over a channel.
pub trait SensorSource: Send + 'static {
    fn clock(&self) -> Arc<dyn SensorClock>;
    fn run(self: Box<Self>, events: Sender<SensorEvent>, commands: Receiver<SensorCommand>);
}

/// Both ends of a running sensor thread.
pub struct SensorLink {
    pub events: Receiver<SensorEvent>,
    pub commands: Sender<SensorCommand>,
    pub clock: Arc<dyn SensorClock>,
    pub thread: JoinHandle<()>,
}

/// Spawn a sensor source on its own thread.
pub fn spawn_sensor_source<S: SensorSource>(source: S) -> SensorLink {
    let (event_tx, events) = mpsc::channel();
    let (commands, command_rx) = mpsc::channel();
    let clock = source.clock();
    let thread = thread::spawn(move || Box::new(source).run(event_tx, command_rx));
    SensorLink { events, commands, clock, thread }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapSensorSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Sensor source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
#[cfg(feature = "leap")]
pub struct LeapSensorSource {
    pub initial_mode: TrackingMode,
}

#[cfg(feature = "leap")]
struct LeapClock;

#[cfg(feature = "leap")]
impl SensorClock for LeapClock {
    fn now_micros(&self) -> i64 {
        leaprs::leap_get_now()
    }
}

#[cfg(feature = "leap")]
impl SensorSource for LeapSensorSource {
    fn clock(&self) -> Arc<dyn SensorClock> {
        Arc::new(LeapClock)
    }

    fn run(self: Box<Self>, events: Sender<SensorEvent>, commands: Receiver<SensorCommand>) {
        use leaprs::*;
        use tracing::{error, warn};

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c) => c,
            Err(e) => {
                error!(error = ?e, "failed to create LeapC connection");
                return;
            }
        };
        if let Err(e) = connection.open() {
            error!(error = ?e, "failed to open LeapMotion connection");
            return;
        }
        if let Err(e) = connection.set_tracking_mode(leap_mode(self.initial_mode)) {
            warn!(error = ?e, "initial tracking mode rejected");
        }

        loop {
            match commands.try_recv() {
                Ok(SensorCommand::SetTrackingMode(mode)) => {
                    if let Err(e) = connection.set_tracking_mode(leap_mode(mode)) {
                        warn!(error = ?e, mode = mode.name(), "tracking mode rejected");
                    }
                }
                Ok(SensorCommand::Shutdown) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {}
            }

            let msg = match connection.poll(100) {
                Ok(m) => m,
                Err(_) => continue,
            };

            let event = match msg.event() {
                Event::Connection(_) => SensorEvent::Connection { connected: true },
                Event::ConnectionLost(_) => SensorEvent::Connection { connected: false },
                Event::Device(d) => {
                    // Opening can fail while another client holds the device;
                    // the unopened info query still gives the serial.
                    let serial = match d.device().open() {
                        Ok(dev) => dev.get_info().map(|i| i.serial().to_string()),
                        Err(e) => {
                            warn!(error = ?e, "cannot open device, using best-effort info");
                            d.device().get_info().map(|i| i.serial().to_string())
                        }
                    };
                    SensorEvent::Device(DeviceInfo {
                        serial: serial.unwrap_or_else(|_| "unknown".to_string()),
                    })
                }
                Event::TrackingMode(m) => SensorEvent::TrackingMode(match m.current_tracking_mode() {
                    leaprs::TrackingMode::Hmd => TrackingMode::Hmd,
                    leaprs::TrackingMode::ScreenTop => TrackingMode::ScreenTop,
                    _ => TrackingMode::Desktop,
                }),
                Event::Tracking(frame) => SensorEvent::Tracking(Frame::new(
                    frame.tracking_frame_id() as u64,
                    frame.info().timestamp(),
                    frame.hands().iter().map(leap_hand).collect(),
                )),
                _ => continue,
            };
            if events.send(event).is_err() {
                break;
            }
        }
    }
}

#[cfg(feature = "leap")]
fn leap_mode(mode: TrackingMode) -> leaprs::TrackingMode {
    match mode {
        TrackingMode::Desktop => leaprs::TrackingMode::Desktop,
        TrackingMode::Hmd => leaprs::TrackingMode::Hmd,
        TrackingMode::ScreenTop => leaprs::TrackingMode::ScreenTop,
    }
}

#[cfg(feature = "leap")]
fn leap_hand(hand: &leaprs::Hand) -> Hand {
    use hand_pinch::{Bone, Digit};

    fn joint(v: leaprs::LeapVector) -> Joint {
        Joint::new(v.x, v.y, v.z)
    }
    fn bone(b: &leaprs::Bone) -> Bone {
        Bone::new(joint(b.prev_joint()), joint(b.next_joint()))
    }

    let mut digits = [Digit::default(); 5];
    for (slot, digit) in digits.iter_mut().zip(hand.digits()) {
        slot.bones = [
            bone(&digit.metacarpal()),
            bone(&digit.proximal()),
            bone(&digit.intermediate()),
            bone(&digit.distal()),
        ];
    }
    Hand {
        handedness: if hand.hand_type() == leaprs::HandType::Left {
            Handedness::Left
        } else {
            Handedness::Right
        },
        digits,
        arm: bone(&hand.arm()),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimSensorSource — keyboard-driven synthetic hands (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the window that steers the simulated hands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimInput {
    /// Trigger hand pinch held (`true`) or released.
    Pinch(bool),
    /// Show or hide one hand.
    ToggleHand(Handedness),
}

const SIM_PINCH_GAP: [f32; 3] = [2.0, 1.5, 2.0];
const SIM_OPEN_GAP: [f32; 3] = [45.0, 0.0, 35.0];
const SIM_SUBJECT_GAP: [f32; 3] = [30.0, 0.0, 25.0];

/// Synthetic two-hand scene.
#[derive(Clone, Debug)]
pub struct SimScene {
    trigger: Handedness,
    pinching: bool,
    left_visible: bool,
    right_visible: bool,
    frame_id: u64,
}

impl SimScene {
    pub fn new(trigger: Handedness) -> Self {
        SimScene {
            trigger,
            pinching: false,
            left_visible: true,
            right_visible: true,
            frame_id: 0,
        }
    }

    pub fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::Pinch(down) => self.pinching = down,
            SimInput::ToggleHand(Handedness::Left) => self.left_visible = !self.left_visible,
            SimInput::ToggleHand(Handedness::Right) => self.right_visible = !self.right_visible,
        }
    }

    /// Next frame.  Hands sway a few millimetres so the overlay is alive.
    pub fn next_frame(&mut self, timestamp_us: i64) -> Frame {
        self.frame_id += 1;
        let sway = (self.frame_id as f32 * 0.05).sin() * 6.0;

        let mut hands = Vec::with_capacity(2);
        for (handedness, visible, x) in [
            (Handedness::Left, self.left_visible, -120.0),
            (Handedness::Right, self.right_visible, 120.0),
        ] {
            if !visible {
                continue;
            }
            let gap = if handedness != self.trigger {
                SIM_SUBJECT_GAP
            } else if self.pinching {
                SIM_PINCH_GAP
            } else {
                SIM_OPEN_GAP
            };
            hands.push(Hand::posed(handedness, Joint::new(x + sway, 200.0, 40.0), gap));
        }
        Frame::new(self.frame_id, timestamp_us, hands)
    }
}

/// Sensor source that renders a [`SimScene`] at a fixed tick.
pub struct SimSensorSource {
    pub input: Receiver<SimInput>,
    pub scene: SimScene,
    pub tick: Duration,
    pub initial_mode: TrackingMode,
    pub clock: Arc<MonotonicClock>,
}

impl SimSensorSource {
    pub fn new(input: Receiver<SimInput>, trigger: Handedness, initial_mode: TrackingMode) -> Self {
        SimSensorSource {
            input,
            scene: SimScene::new(trigger),
            tick: Duration::from_millis(11), // ~90 Hz, like the device
            initial_mode,
            clock: Arc::new(MonotonicClock::new()),
        }
    }
}

impl SensorSource for SimSensorSource {
    fn clock(&self) -> Arc<dyn SensorClock> {
        self.clock.clone()
    }

    fn run(self: Box<Self>, events: Sender<SensorEvent>, commands: Receiver<SensorCommand>) {
        let SimSensorSource { input, mut scene, tick, initial_mode, clock } = *self;

        let hello = [
            SensorEvent::Connection { connected: true },
            SensorEvent::Device(DeviceInfo { serial: "SIM-0001".to_string() }),
            SensorEvent::TrackingMode(initial_mode),
        ];
        for event in hello {
            if events.send(event).is_err() {
                return;
            }
        }
        info!("simulated sensor running");

        'frames: loop {
            loop {
                match commands.try_recv() {
                    Ok(SensorCommand::SetTrackingMode(mode)) => {
                        if events.send(SensorEvent::TrackingMode(mode)).is_err() {
                            break 'frames;
                        }
                    }
                    Ok(SensorCommand::Shutdown) | Err(TryRecvError::Disconnected) => break 'frames,
                    Err(TryRecvError::Empty) => break,
                }
            }
            for sim in input.try_iter() {
                scene.apply(sim);
            }

            let frame = scene.next_frame(clock.now_micros());
            if events.send(SensorEvent::Tracking(frame)).is_err() {
                break;
            }
            thread::sleep(tick);
        }

        debug!("simulated sensor detached");
        let _ = events.send(SensorEvent::Connection { connected: false });
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
