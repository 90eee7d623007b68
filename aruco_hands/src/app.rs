//! Assembly: turn a [`PipelineConfig`] into a ready [`PipelineDriver`].
//!
//! Backend choice by source:
//!
//! | | frames | hands | markers |
//! |---|---|---|---|
//! | `sim` | [`SimFrameSource`] | [`SimHandProvider`] | [`SimMarkerProvider`] ring on the orbit |
//! | `camera` | `CameraSource` | `OrtHandLandmarker` with `--hand-model`, else [`NoHands`] | `ArucoMarkerProvider` |

use std::time::Duration;

use anyhow::{Context, Result};
use aruco_osc::{EventEmitter, LoggingEmitter, NullEmitter, UdpEmitter};
use tracing::info;

use crate::config::{PipelineConfig, SourceKind};
use crate::frame::FrameSource;
use crate::pipeline::{CancelToken, PipelineDriver, RunSummary};
use crate::provider::{HandFeatureProvider, MarkerFeatureProvider, NoHands};
use crate::sim::{SimFrameSource, SimHandProvider, SimMarkerProvider};
use crate::visualizer::Visualizer;

/// Simulated frames arrive at roughly camera rate.
pub const SIM_FRAME_INTERVAL: Duration = Duration::from_millis(33);
/// Simulated markers are in view for this many frames, then only the
/// registry remembers them.
pub const SIM_MARKER_FRAMES:  u64 = 90;
const SIM_MARKER_COUNT:       u32 = 4;

// ════════════════════════════════════════════════════════════════════════════
// Emitter
// ════════════════════════════════════════════════════════════════════════════

pub fn build_emitter(config: &PipelineConfig) -> Result<Box<dyn EventEmitter>> {
    if config.dry_run {
        info!("dry run: OSC messages are logged, not sent");
        return Ok(Box::new(LoggingEmitter::loud(NullEmitter)));
    }
    let udp = UdpEmitter::connect(&config.host, config.port)
        .with_context(|| format!("setting up OSC output to {}:{}", config.host, config.port))?;
    info!(dest = %udp.target(), "sending OSC");
    Ok(Box::new(LoggingEmitter::new(udp)))
}

// ════════════════════════════════════════════════════════════════════════════
// Frames and providers
// ════════════════════════════════════════════════════════════════════════════

pub fn build_frame_source(config: &PipelineConfig) -> Result<Box<dyn FrameSource>> {
    match config.source {
        SourceKind::Sim => Ok(Box::new(
            SimFrameSource::new(config.sim_width, config.sim_height).with_interval(SIM_FRAME_INTERVAL),
        )),
        SourceKind::Camera => camera_source(config),
    }
}

#[cfg(feature = "camera")]
fn camera_source(config: &PipelineConfig) -> Result<Box<dyn FrameSource>> {
    let camera = crate::camera::CameraSource::open(config.device_index)
        .with_context(|| format!("opening capture device {}", config.device_index))?;
    Ok(Box::new(camera))
}

#[cfg(not(feature = "camera"))]
fn camera_source(_config: &PipelineConfig) -> Result<Box<dyn FrameSource>> {
    Err(crate::config::ConfigError::FeatureDisabled { what: "--source camera", feature: "camera" }.into())
}

pub fn build_hand_provider(config: &PipelineConfig) -> Result<Box<dyn HandFeatureProvider>> {
    match (config.source, &config.hand_model) {
        (SourceKind::Sim, _)          => Ok(Box::new(SimHandProvider::default())),
        (SourceKind::Camera, None)    => {
            info!("no --hand-model given; hand tracking disabled");
            Ok(Box::new(NoHands))
        }
        (SourceKind::Camera, Some(path)) => landmarker(path),
    }
}

#[cfg(feature = "hands")]
fn landmarker(path: &std::path::Path) -> Result<Box<dyn HandFeatureProvider>> {
    let model = crate::landmarker::OrtHandLandmarker::load(path)
        .with_context(|| format!("loading hand model {}", path.display()))?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "hands"))]
fn landmarker(_path: &std::path::Path) -> Result<Box<dyn HandFeatureProvider>> {
    Err(crate::config::ConfigError::FeatureDisabled { what: "--hand-model", feature: "hands" }.into())
}

pub fn build_marker_provider(config: &PipelineConfig) -> Result<Box<dyn MarkerFeatureProvider>> {
    match config.source {
        SourceKind::Sim => {
            let orbit = SimHandProvider::default();
            Ok(Box::new(
                SimMarkerProvider::for_orbit(&orbit, SIM_MARKER_COUNT).visible_for(SIM_MARKER_FRAMES),
            ))
        }
        SourceKind::Camera => aruco(config),
    }
}

#[cfg(feature = "camera")]
fn aruco(config: &PipelineConfig) -> Result<Box<dyn MarkerFeatureProvider>> {
    let detector = crate::aruco::ArucoMarkerProvider::new(config.dictionary)
        .with_context(|| format!("creating ArUco detector for {}", config.dictionary))?;
    Ok(Box::new(detector))
}

#[cfg(not(feature = "camera"))]
fn aruco(_config: &PipelineConfig) -> Result<Box<dyn MarkerFeatureProvider>> {
    Err(crate::config::ConfigError::FeatureDisabled { what: "ArUco detection", feature: "camera" }.into())
}

// ════════════════════════════════════════════════════════════════════════════
// Driver
// ════════════════════════════════════════════════════════════════════════════

/// Everything except the emitter, which callers may want to choose.
pub fn build_driver(config: &PipelineConfig, emitter: Box<dyn EventEmitter>) -> Result<PipelineDriver> {
    config.validate()?;

    // providers before the device, so a bad model path fails without
    // grabbing the camera
    let hands   = build_hand_provider(config)?;
    let markers = build_marker_provider(config)?;
    let frames  = build_frame_source(config)?;

    let driver = PipelineDriver::new(config, frames, hands, markers, emitter);
    Ok(if config.show_display {
        driver.with_renderer(Box::new(Visualizer::new()))
    } else {
        driver
    })
}

/// Build everything from `config` and run until stopped.
pub fn run(config: &PipelineConfig, cancel: &CancelToken) -> Result<RunSummary> {
    let emitter = build_emitter(config)?;
    let mut driver = build_driver(config, emitter)?;
    info!(
        source   = %config.source,
        dict     = %config.dictionary,
        inverted = config.invert_markers,
        display  = config.show_display,
        "pipeline starting"
    );
    Ok(driver.run(cancel))
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
