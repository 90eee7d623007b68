//! Command-line surface and the immutable [`PipelineConfig`] it produces.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, ValueEnum};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown marker dictionary {0:?} (expected e.g. DICT_6X6_250)")]
    UnknownDictionary(String),
    #[error("{what} needs the `{feature}` feature; rebuild with --features {feature}")]
    FeatureDisabled { what: &'static str, feature: &'static str },
}

// ════════════════════════════════════════════════════════════════════════════
// MarkerDictionary
// ════════════════════════════════════════════════════════════════════════════

/// The OpenCV predefined ArUco dictionaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MarkerDictionary {
    Dict4x4_50,
    Dict4x4_100,
    Dict4x4_250,
    Dict4x4_1000,
    Dict5x5_50,
    Dict5x5_100,
    Dict5x5_250,
    Dict5x5_1000,
    Dict6x6_50,
    Dict6x6_100,
    #[default]
    Dict6x6_250,
    Dict6x6_1000,
    Dict7x7_50,
    Dict7x7_100,
    Dict7x7_250,
    Dict7x7_1000,
    ArucoOriginal,
}

impl MarkerDictionary {
    pub const ALL: [MarkerDictionary; 17] = [
        Self::Dict4x4_50, Self::Dict4x4_100, Self::Dict4x4_250, Self::Dict4x4_1000,
        Self::Dict5x5_50, Self::Dict5x5_100, Self::Dict5x5_250, Self::Dict5x5_1000,
        Self::Dict6x6_50, Self::Dict6x6_100, Self::Dict6x6_250, Self::Dict6x6_1000,
        Self::Dict7x7_50, Self::Dict7x7_100, Self::Dict7x7_250, Self::Dict7x7_1000,
        Self::ArucoOriginal,
    ];

    /// The OpenCV constant name, e.g. `"DICT_6X6_250"`.
    pub fn name(self) -> &'static str {
        match self {
            Self::Dict4x4_50    => "DICT_4X4_50",
            Self::Dict4x4_100   => "DICT_4X4_100",
            Self::Dict4x4_250   => "DICT_4X4_250",
            Self::Dict4x4_1000  => "DICT_4X4_1000",
            Self::Dict5x5_50    => "DICT_5X5_50",
            Self::Dict5x5_100   => "DICT_5X5_100",
            Self::Dict5x5_250   => "DICT_5X5_250",
            Self::Dict5x5_1000  => "DICT_5X5_1000",
            Self::Dict6x6_50    => "DICT_6X6_50",
            Self::Dict6x6_100   => "DICT_6X6_100",
            Self::Dict6x6_250   => "DICT_6X6_250",
            Self::Dict6x6_1000  => "DICT_6X6_1000",
            Self::Dict7x7_50    => "DICT_7X7_50",
            Self::Dict7x7_100   => "DICT_7X7_100",
            Self::Dict7x7_250   => "DICT_7X7_250",
            Self::Dict7x7_1000  => "DICT_7X7_1000",
            Self::ArucoOriginal => "DICT_ARUCO_ORIGINAL",
        }
    }
}

impl fmt::Display for MarkerDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MarkerDictionary {
    type Err = ConfigError;

    /// Accepts the OpenCV name in any case, with or without the `DICT_` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let wanted = if upper.starts_with("DICT_") { upper } else { format!("DICT_{}", upper) };
        Self::ALL
            .into_iter()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownDictionary(s.to_string()))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SourceKind
// ════════════════════════════════════════════════════════════════════════════

/// Where frames, hands and markers come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// A capture device through OpenCV.
    Camera,
    /// Synthetic frames, an orbiting hand, and a ring of markers.
    Sim,
}

impl Default for SourceKind {
    fn default() -> Self {
        if cfg!(feature = "camera") { SourceKind::Camera } else { SourceKind::Sim }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Camera => "camera",
            SourceKind::Sim    => "sim",
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PipelineConfig
// ════════════════════════════════════════════════════════════════════════════

/// Everything the driver and the backends need, fixed at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub device_index:   i32,
    pub show_display:   bool,
    pub host:           String,
    pub port:           u16,
    /// Detect markers on the negative image (light markers on dark paper).
    pub invert_markers: bool,
    pub dictionary:     MarkerDictionary,
    pub source:         SourceKind,
    /// Stop after this many processed frames.
    pub max_frames:     Option<u64>,
    /// MediaPipe hand-landmark ONNX model.  `None` disables hand tracking
    /// on the camera source.
    pub hand_model:     Option<PathBuf>,
    /// Log messages instead of sending them.
    pub dry_run:        bool,
    pub verbose:        bool,
    /// Frame size for the simulated source.
    pub sim_width:      u32,
    pub sim_height:     u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            device_index:   0,
            show_display:   false,
            host:           "127.0.0.1".to_string(),
            port:           8000,
            invert_markers: false,
            dictionary:     MarkerDictionary::default(),
            source:         SourceKind::default(),
            max_frames:     None,
            hand_model:     None,
            dry_run:        false,
            verbose:        false,
            sim_width:      640,
            sim_height:     480,
        }
    }
}

impl PipelineConfig {
    /// Reject combinations this build cannot serve.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source == SourceKind::Camera && !cfg!(feature = "camera") {
            return Err(ConfigError::FeatureDisabled { what: "--source camera", feature: "camera" });
        }
        if self.hand_model.is_some() && !cfg!(feature = "hands") {
            return Err(ConfigError::FeatureDisabled { what: "--hand-model", feature: "hands" });
        }
        Ok(())
    }

    /// Default `tracing` filter directive for this run.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Cli
// ════════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(
    name = "aruco_hands",
    version,
    about = "Track hands and ArUco markers, stream both as OSC over UDP"
)]
pub struct Cli {
    /// Capture device index
    #[arg(long, default_value_t = 0)]
    pub input: i32,

    /// Show the debug window (0 or 1)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub show: u8,

    /// OSC destination host
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,

    /// OSC destination port
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Detect markers on the inverted image
    #[arg(long)]
    pub inverted: bool,

    /// ArUco dictionary, by OpenCV name
    #[arg(long, default_value = "DICT_6X6_250")]
    pub dictionary: MarkerDictionary,

    /// Frame source [default: camera when built with it, otherwise sim]
    #[arg(long, value_enum)]
    pub source: Option<SourceKind>,

    /// Stop after N frames
    #[arg(long, value_name = "N")]
    pub frames: Option<u64>,

    /// MediaPipe hand_landmark ONNX model
    #[arg(long, value_name = "PATH")]
    pub hand_model: Option<PathBuf>,

    /// Log OSC messages instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Debug-level logging, including every OSC message
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn into_config(self) -> PipelineConfig {
        PipelineConfig {
            device_index:   self.input,
            show_display:   self.show == 1,
            host:           self.ip,
            port:           self.port,
            invert_markers: self.inverted,
            dictionary:     self.dictionary,
            source:         self.source.unwrap_or_default(),
            max_frames:     self.frames,
            hand_model:     self.hand_model,
            dry_run:        self.dry_run,
            verbose:        self.verbose,
            ..PipelineConfig::default()
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
