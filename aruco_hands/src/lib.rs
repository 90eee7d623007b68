//! # aruco_hands
//!
//! Live hand-landmark and ArUco-marker fusion streamed as OSC.
//!
//! Every frame:
//!
//! 1. hands are detected on the frame as captured and sent as `/hands`;
//! 2. markers are detected (optionally on the inverted frame), sent as
//!    `/aruco/marker` and remembered in a [`MarkerRegistry`](aruco_space::MarkerRegistry);
//! 3. each index fingertip is tested against every marker ever seen, and
//!    each hit is sent as `/hand_detected`.
//!
//! ## Feature flags
//!
//! * (default): **Simulation**: grey frames, one orbiting hand, a ring of
//!   four markers that leave the view after a few seconds.
//! * `camera`: OpenCV capture device and `ArucoDetector`.
//! * `hands`: MediaPipe hand landmarks through ONNX Runtime (implies `camera`).
//!
//! ## Debug window
//!
//! `--show 1` opens a window with the frame, the hand skeleton, and every
//! known marker: green when seen this frame, grey when only remembered,
//! yellow while a fingertip is over it.  `Esc` closes it and stops the run.

pub mod app;
pub mod config;
pub mod frame;
pub mod pipeline;
pub mod provider;
pub mod sim;
pub mod visualizer;

#[cfg(feature = "camera")]
pub mod aruco;
#[cfg(feature = "camera")]
pub mod camera;
#[cfg(feature = "hands")]
pub mod landmarker;

pub use config::{Cli, ConfigError, MarkerDictionary, PipelineConfig, SourceKind};
pub use frame::{CaptureError, Frame, FrameSource, PixelFormat};
pub use pipeline::{
    CancelToken, IterationOutcome, IterationReport, Overlay, PipelineDriver, Renderer,
    RunSummary, StopReason,
};
pub use provider::{HandFeatureProvider, MarkerFeatureProvider, NoHands, ProviderError};
