//! Presentation window using `minifb`.
//!
//! The window only shows whatever buffer it is handed and turns key presses
//! into [`UiCommand`]s.  In simulation builds it also forwards the sim keys
//! to the synthetic sensor.
//!
//! | Key | Command |
//! |---|---|
//! | `X` | Exit |
//! | `H` | HMD tracking mode |
//! | `S` | ScreenTop tracking mode |
//! | `D` | Desktop tracking mode |
//! | `F` | Toggle Skeleton / Dots |
//! | `P` (hold) | *sim*: pinch the trigger hand |
//! | `L` / `R` | *sim*: hide / show the left / right hand |

use std::sync::mpsc::Sender;

use minifb::{Key, KeyRepeat, Window, WindowOptions};

use hand_pinch::{Handedness, ScreenSize};

use crate::canvas::FrameBuffer;
use crate::sensor::{SimInput, TrackingMode};

pub const WINDOW_TITLE: &str = "Pinch Shot — fingertip calibration";

/// Synchronous UI state changes requested from the keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiCommand {
    Exit,
    SetTrackingMode(TrackingMode),
    ToggleRenderMode,
}

/// Map a freshly pressed key to its command.
pub fn command_for_key(key: Key) -> Option<UiCommand> {
    match key {
        Key::X => Some(UiCommand::Exit),
        Key::H => Some(UiCommand::SetTrackingMode(TrackingMode::Hmd)),
        Key::S => Some(UiCommand::SetTrackingMode(TrackingMode::ScreenTop)),
        Key::D => Some(UiCommand::SetTrackingMode(TrackingMode::Desktop)),
        Key::F => Some(UiCommand::ToggleRenderMode),
        _ => None,
    }
}

const COMMAND_KEYS: [Key; 5] = [Key::X, Key::H, Key::S, Key::D, Key::F];

pub struct PresentationWindow {
    window: Window,
    sim_tx: Option<Sender<SimInput>>,
    pinch_held: bool,
}

impl PresentationWindow {
    pub fn new(size: ScreenSize, sim_tx: Option<Sender<SimInput>>) -> Result<Self, String> {
        let mut window = Window::new(
            WINDOW_TITLE,
            size.width as usize,
            size.height as usize,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(PresentationWindow { window, sim_tx, pinch_held: false })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// Poll keyboard input.  Sim keys go straight to the synthetic sensor.
    pub fn poll_commands(&mut self) -> Vec<UiCommand> {
        let commands: Vec<UiCommand> = COMMAND_KEYS
            .iter()
            .filter(|&&k| self.window.is_key_pressed(k, KeyRepeat::No))
            .filter_map(|&k| command_for_key(k))
            .collect();

        if let Some(tx) = &self.sim_tx {
            let held = self.window.is_key_down(Key::P);
            if held != self.pinch_held {
                self.pinch_held = held;
                let _ = tx.send(SimInput::Pinch(held));
            }
            if self.window.is_key_pressed(Key::L, KeyRepeat::No) {
                let _ = tx.send(SimInput::ToggleHand(Handedness::Left));
            }
            if self.window.is_key_pressed(Key::R, KeyRepeat::No) {
                let _ = tx.send(SimInput::ToggleHand(Handedness::Right));
            }
        }

        commands
    }

    /// Show `buf`, or just pump window events when there is nothing new.
    pub fn present(&mut self, buf: Option<&FrameBuffer>) -> Result<(), String> {
        match buf {
            Some(b) => self
                .window
                .update_with_buffer(b.pixels(), b.width(), b.height())
                .map_err(|e| e.to_string()),
            None => {
                self.window.update();
                Ok(())
            }
        }
    }
}
