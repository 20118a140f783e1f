//! Application configuration, loaded from an optional TOML file.
//!
//! Every field has a default, so an absent file or a partial one is fine.
//! Validation runs once at startup; nothing is re-checked mid-stream.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use hand_pinch::{
    Correlator, HandRoles, Handedness, PinchClassifier, ScreenSize, DEFAULT_PINCH_THRESHOLD_MM,
};

use crate::overlay::RenderMode;
use crate::sensor::TrackingMode;

/// Larger than any monitor we expect; also keeps `width * height` sane.
const MAX_SCREEN_DIM: u32 = 8192;

/// Longest hold we accept before the capture fires (seconds).
const MAX_CAPTURE_DELAY_SECS: f64 = 300.0;

// ════════════════════════════════════════════════════════════════════════════
// ConfigError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ScreenSize { width: u32, height: u32 },
    PinchThreshold(f32),
    FrameStride,
    CaptureDelay(f64),
    FileName(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScreenSize { width, height } => write!(
                f,
                "screen size {}x{} out of range (1..={} per side)",
                width, height, MAX_SCREEN_DIM
            ),
            Self::PinchThreshold(t) => write!(f, "pinch threshold must be finite and > 0, got {}", t),
            Self::FrameStride => write!(f, "frame stride must be at least 1"),
            Self::CaptureDelay(d) => write!(
                f,
                "capture delay must be between 0 and {} seconds, got {}",
                MAX_CAPTURE_DELAY_SECS, d
            ),
            Self::FileName(n) => write!(f, "record file name {:?} must be a bare file name", n),
        }
    }
}

impl std::error::Error for ConfigError {}

// ════════════════════════════════════════════════════════════════════════════
// Config sections
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub screen: ScreenConfig,
    #[serde(default)]
    pub pinch: PinchConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScreenConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinchConfig {
    /// Per-axis thumb/index distance below which the hand pinches (mm).
    #[serde(default = "default_threshold_mm")]
    pub threshold_mm: f32,
    /// Classify only frames whose id is a multiple of this.
    #[serde(default = "default_frame_stride")]
    pub frame_stride: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationConfig {
    /// Seconds the pinch must be held before the capture fires.
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,
    #[serde(default = "default_trigger_hand")]
    pub trigger_hand: Handedness,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_file_name")]
    pub file_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_hands_format")]
    pub hands_format: RenderMode,
    #[serde(default = "default_tracking_mode")]
    pub tracking_mode: TrackingMode,
}

fn default_width() -> u32 { 700 }
fn default_height() -> u32 { 500 }
fn default_threshold_mm() -> f32 { DEFAULT_PINCH_THRESHOLD_MM }
fn default_frame_stride() -> u64 { 1 }
fn default_delay_secs() -> f64 { 3.0 }
fn default_trigger_hand() -> Handedness { Handedness::Left }
fn default_output_dir() -> PathBuf { PathBuf::from("CalibrationData") }
fn default_file_name() -> String { "Finger_calibration.json".to_string() }
fn default_hands_format() -> RenderMode { RenderMode::Dots }
fn default_tracking_mode() -> TrackingMode { TrackingMode::Desktop }

impl Default for ScreenConfig {
    fn default() -> Self {
        Self { width: default_width(), height: default_height() }
    }
}

impl Default for PinchConfig {
    fn default() -> Self {
        Self { threshold_mm: default_threshold_mm(), frame_stride: default_frame_stride() }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            trigger_hand: default_trigger_hand(),
            output_dir: default_output_dir(),
            file_name: default_file_name(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { hands_format: default_hands_format(), tracking_mode: default_tracking_mode() }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            screen: ScreenConfig::default(),
            pinch: PinchConfig::default(),
            calibration: CalibrationConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Loading and validation
// ════════════════════════════════════════════════════════════════════════════

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Defaults when the file does not exist; any other problem is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ScreenConfig { width, height } = self.screen;
        if width == 0 || height == 0 || width > MAX_SCREEN_DIM || height > MAX_SCREEN_DIM {
            return Err(ConfigError::ScreenSize { width, height });
        }
        let t = self.pinch.threshold_mm;
        if !t.is_finite() || t <= 0.0 {
            return Err(ConfigError::PinchThreshold(t));
        }
        if self.pinch.frame_stride == 0 {
            return Err(ConfigError::FrameStride);
        }
        let d = self.calibration.delay_secs;
        if !(0.0..=MAX_CAPTURE_DELAY_SECS).contains(&d) {
            return Err(ConfigError::CaptureDelay(d));
        }
        let name = &self.calibration.file_name;
        let bare = Path::new(name).file_name().map_or(false, |f| f == name.as_str());
        if name.is_empty() || !bare {
            return Err(ConfigError::FileName(name.clone()));
        }
        Ok(())
    }

    pub fn screen_size(&self) -> ScreenSize {
        ScreenSize::new(self.screen.width, self.screen.height)
    }

    pub fn capture_delay(&self) -> Duration {
        Duration::from_secs_f64(self.calibration.delay_secs)
    }

    pub fn roles(&self) -> HandRoles {
        HandRoles::new(self.calibration.trigger_hand)
    }

    pub fn correlator(&self) -> Correlator {
        Correlator::new(self.roles(), PinchClassifier::new(self.pinch.threshold_mm))
    }

    /// Whether frame `id` is classified, or passes through as "no observation".
    pub fn classifies(&self, id: u64) -> bool {
        id % self.pinch.frame_stride == 0
    }

    pub fn output_path(&self) -> PathBuf {
        self.calibration.output_dir.join(&self.calibration.file_name)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
