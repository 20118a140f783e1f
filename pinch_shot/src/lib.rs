//! # pinch_shot
//!
//! Pinch-shot fingertip calibration for a LeapMotion controller.
//!
//! The user pinches thumb and index of the *trigger* hand and holds the pinch.
//! After the capture delay the fingertip positions of the other hand, the
//! *subject*, are written once to a JSON calibration record.  A live overlay
//! shows both hands, pinch feedback, and a countdown.
//!
//! ## Pipeline
//!
//! ```text
//! sensor thread ──SensorEvent──▶ producer thread ──FrameSlot──▶ window (main)
//!                                 correlate → latch → capture → render
//! ```
//!
//! ## Keys
//!
//! | Key | Action |
//! |---|---|
//! | `X` | Exit |
//! | `H` / `S` / `D` | HMD / ScreenTop / Desktop tracking mode |
//! | `F` | Toggle Skeleton / Dots |
//!
//! ## Feature flags
//!
//! * (default) **Simulation mode**: `P` (hold) pinches the trigger hand,
//!   `L` / `R` hide or show a hand.
//! * `leap` **Hardware mode**: polls a real LeapMotion controller via LeapC.

pub mod canvas;
pub mod config;
pub mod sensor;
pub mod overlay;
pub mod window;
pub mod pipeline;
pub mod app;
