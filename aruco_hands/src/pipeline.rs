//! The per-frame loop.
//!
//! ```text
//!  FrameSource ─► Frame ─┬─► HandFeatureProvider ──► /hands  (index, 21 points)
//!                        │
//!                        └─► [inverted?] ─► MarkerFeatureProvider ──► /aruco/marker
//!                                                  │
//!                                                  ▼
//!                           MarkerRegistry (every marker ever seen)
//!                                                  │
//!                  fingertips ──► detect_interactions ──► /hand_detected
//! ```
//!
//! Everything runs on the calling thread.  Cancellation is checked once per
//! iteration, so a blocked `next_frame` delays shutdown by one frame.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use aruco_osc::{DeliveryStats, Event, EventEmitter};
use aruco_space::{
    detect_interactions, FrameDims, InteractionEvent, MarkerRegistry, NormalizedHand,
    NormalizedMarker,
};
use tracing::{debug, debug_span, info, warn};

use crate::config::PipelineConfig;
use crate::frame::{Frame, FrameSource};
use crate::provider::{HandFeatureProvider, MarkerFeatureProvider};

// ════════════════════════════════════════════════════════════════════════════
// CancelToken
// ════════════════════════════════════════════════════════════════════════════

/// Shared stop flag.  Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }
    pub fn cancel(&self) { self.0.store(true, Ordering::SeqCst) }
    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::SeqCst) }
}

// ════════════════════════════════════════════════════════════════════════════
// Renderer seam
// ════════════════════════════════════════════════════════════════════════════

/// What one iteration saw, borrowed for drawing.
pub struct Overlay<'a> {
    pub frame:        &'a Frame,
    pub dims:         FrameDims,
    pub hands:        &'a [NormalizedHand],
    /// Markers detected in this frame.
    pub markers:      &'a [NormalizedMarker],
    pub registry:     &'a MarkerRegistry,
    pub interactions: &'a [InteractionEvent],
}

pub trait Renderer {
    /// Draw one iteration.  Returns `false` once the user has asked to close.
    fn render(&mut self, overlay: &Overlay<'_>) -> bool;
}

// ════════════════════════════════════════════════════════════════════════════
// Outcomes
// ════════════════════════════════════════════════════════════════════════════

/// Counts from one completed iteration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IterationReport {
    pub frame:        u64,
    pub hands:        usize,
    pub markers:      usize,
    pub new_markers:  usize,
    pub interactions: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterationOutcome {
    Continue(IterationReport),
    /// The frame had zero area; nothing was emitted.
    Skipped,
    /// The renderer asked to close; this frame was fully processed.
    Closed(IterationReport),
    EndOfStream,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Cancelled,
    WindowClosed,
    FrameLimit,
}

/// Totals for a whole run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunSummary {
    pub iterations:    u64,
    pub skipped:       u64,
    pub hands:         u64,
    pub markers:       u64,
    pub interactions:  u64,
    pub registry_size: usize,
    pub delivery:      DeliveryStats,
    pub elapsed:       Duration,
    pub stop:          StopReason,
}

impl RunSummary {
    /// Mean processed frames per second.
    pub fn fps(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.iterations as f64 / secs } else { 0.0 }
    }

    fn add(&mut self, r: &IterationReport) {
        self.iterations   += 1;
        self.hands        += r.hands as u64;
        self.markers      += r.markers as u64;
        self.interactions += r.interactions as u64;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PipelineDriver
// ════════════════════════════════════════════════════════════════════════════

pub struct PipelineDriver {
    frames:         Box<dyn FrameSource>,
    hands:          Box<dyn HandFeatureProvider>,
    markers:        Box<dyn MarkerFeatureProvider>,
    emitter:        Box<dyn EventEmitter>,
    renderer:       Option<Box<dyn Renderer>>,
    registry:       MarkerRegistry,
    invert_markers: bool,
    max_frames:     Option<u64>,
    iterations:     u64,
}

impl PipelineDriver {
    pub fn new(
        config:  &PipelineConfig,
        frames:  Box<dyn FrameSource>,
        hands:   Box<dyn HandFeatureProvider>,
        markers: Box<dyn MarkerFeatureProvider>,
        emitter: Box<dyn EventEmitter>,
    ) -> Self {
        PipelineDriver {
            frames,
            hands,
            markers,
            emitter,
            renderer:       None,
            registry:       MarkerRegistry::new(),
            invert_markers: config.invert_markers,
            max_frames:     config.max_frames,
            iterations:     0,
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Start from an existing registry instead of an empty one.
    pub fn with_registry(mut self, registry: MarkerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &MarkerRegistry { &self.registry }

    /// Completed iterations so far (skipped frames excluded).
    pub fn iterations(&self) -> u64 { self.iterations }

    /// Acquire, detect, emit and render one frame.
    pub fn run_iteration(&mut self) -> IterationOutcome {
        // ── 1. Acquire ────────────────────────────────────────────────────
        let frame = match self.frames.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("capture reported end of stream");
                return IterationOutcome::EndOfStream;
            }
            Err(e) => {
                warn!("capture failed, stopping: {}", e);
                return IterationOutcome::EndOfStream;
            }
        };

        // ── 2. One FrameDims for the whole iteration ──────────────────────
        let dims = match FrameDims::new(frame.width(), frame.height()) {
            Ok(dims) => dims,
            Err(e) => {
                warn!("skipping frame: {}", e);
                return IterationOutcome::Skipped;
            }
        };

        let frame_no = self.iterations;
        let _span = debug_span!("pipeline.iteration", frame = frame_no).entered();

        // ── 3. Hands, on the frame as captured ────────────────────────────
        let detected_hands = self.hands.detect_hands(&frame).unwrap_or_else(|e| {
            warn!("hand provider failed on this frame: {}", e);
            Vec::new()
        });
        let hands: Vec<NormalizedHand> = detected_hands
            .iter()
            .map(|h| NormalizedHand::from_detection(h, dims))
            .collect();
        for (index, hand) in hands.iter().enumerate() {
            self.emitter.emit_event(&Event::Hand { index, hand });
        }

        // ── 4–5. Markers, optionally on the negative ──────────────────────
        let detected_markers = if self.invert_markers {
            self.markers.detect_markers(&frame.inverted())
        } else {
            self.markers.detect_markers(&frame)
        }
        .unwrap_or_else(|e| {
            warn!("marker provider failed on this frame: {}", e);
            Vec::new()
        });

        let mut new_markers = 0;
        let markers: Vec<NormalizedMarker> = detected_markers
            .iter()
            .map(|m| NormalizedMarker::from_detection(m, dims))
            .collect();
        for marker in &markers {
            self.emitter.emit_event(&Event::Marker(marker));
            if self.registry.upsert(marker.marker_id, marker.quad) {
                new_markers += 1;
                info!(marker_id = marker.marker_id, known = self.registry.len(), "new marker");
            }
        }

        // ── 6. Hover over anything ever seen ──────────────────────────────
        let interactions = detect_interactions(&hands, &self.registry);
        for hit in &interactions {
            debug!(hand = hit.hand_index, marker_id = hit.marker_id, "fingertip over marker");
            self.emitter.emit_event(&Event::HandDetected { marker_id: hit.marker_id });
        }

        self.iterations += 1;
        let report = IterationReport {
            frame:        frame_no,
            hands:        hands.len(),
            markers:      markers.len(),
            new_markers,
            interactions: interactions.len(),
        };

        // ── 7. Overlay ────────────────────────────────────────────────────
        if let Some(renderer) = self.renderer.as_mut() {
            let overlay = Overlay {
                frame:        &frame,
                dims,
                hands:        &hands,
                markers:      &markers,
                registry:     &self.registry,
                interactions: &interactions,
            };
            if !renderer.render(&overlay) {
                return IterationOutcome::Closed(report);
            }
        }

        IterationOutcome::Continue(report)
    }

    /// Loop until the stream ends, the window closes, the frame limit is
    /// reached or `cancel` is set.  Releases the frame source exactly once.
    pub fn run(&mut self, cancel: &CancelToken) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary {
            iterations:    0,
            skipped:       0,
            hands:         0,
            markers:       0,
            interactions:  0,
            registry_size: 0,
            delivery:      DeliveryStats::default(),
            elapsed:       Duration::ZERO,
            stop:          StopReason::EndOfStream,
        };

        summary.stop = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if self.max_frames.is_some_and(|n| summary.iterations >= n) {
                break StopReason::FrameLimit;
            }
            match self.run_iteration() {
                IterationOutcome::Continue(r) => summary.add(&r),
                IterationOutcome::Skipped     => summary.skipped += 1,
                IterationOutcome::Closed(r)   => {
                    summary.add(&r);
                    break StopReason::WindowClosed;
                }
                IterationOutcome::EndOfStream => break StopReason::EndOfStream,
            }
        };

        self.frames.release();

        summary.registry_size = self.registry.len();
        summary.delivery      = self.emitter.stats();
        summary.elapsed       = started.elapsed();
        info!(
            iterations   = summary.iterations,
            skipped      = summary.skipped,
            hands        = summary.hands,
            markers      = summary.markers,
            interactions = summary.interactions,
            registry     = summary.registry_size,
            sent         = summary.delivery.sent,
            dropped      = summary.delivery.dropped,
            elapsed_ms   = summary.elapsed.as_millis() as u64,
            fps          = %format!("{:.1}", summary.fps()),
            stop         = ?summary.stop,
            "pipeline stopped"
        );
        summary
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    use approx::assert_relative_eq;
    use aruco_osc::{OscArg, RecordingEmitter};
    use aruco_space::{HandDetection, MarkerDetection, PixelPoint};

    use crate::frame::CaptureError;
    use crate::provider::ProviderError;
    use crate::sim::synthetic_hand;

    // ── scripted doubles ──────────────────────────────────────────────────

    struct ScriptedFrames {
        frames:   VecDeque<Result<Frame, CaptureError>>,
        releases: Arc<AtomicUsize>,
    }

    impl ScriptedFrames {
        fn new(frames: Vec<Frame>) -> (Self, Arc<AtomicUsize>) {
            let releases = Arc::new(AtomicUsize::new(0));
            let src = ScriptedFrames {
                frames:   frames.into_iter().map(Ok).collect(),
                releases: releases.clone(),
            };
            (src, releases)
        }

        fn repeat(frame: Frame, n: usize) -> (Self, Arc<AtomicUsize>) {
            Self::new(vec![frame; n])
        }
    }

    impl FrameSource for ScriptedFrames {
        fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
            self.frames.pop_front().transpose()
        }
        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Replays one script entry per call, then reports nothing.
    /// Records the first byte of every frame it is shown.
    struct Scripted<T> {
        script: VecDeque<Result<Vec<T>, ProviderError>>,
        seen:   Arc<Mutex<Vec<u8>>>,
    }

    impl<T> Scripted<T> {
        fn new(script: Vec<Vec<T>>) -> Self {
            Scripted { script: script.into_iter().map(Ok).collect(), seen: Arc::default() }
        }

        fn failing_once(mut self, err: ProviderError) -> Self {
            self.script.push_front(Err(err));
            self
        }

        fn next(&mut self, frame: &Frame) -> Result<Vec<T>, ProviderError> {
            self.seen.lock().unwrap().push(frame.data()[0]);
            self.script.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    type ScriptedHands   = Scripted<HandDetection>;
    type ScriptedMarkers = Scripted<MarkerDetection>;

    impl HandFeatureProvider for ScriptedHands {
        fn detect_hands(&mut self, frame: &Frame) -> Result<Vec<HandDetection>, ProviderError> {
            self.next(frame)
        }
    }

    impl MarkerFeatureProvider for ScriptedMarkers {
        fn detect_markers(&mut self, frame: &Frame) -> Result<Vec<MarkerDetection>, ProviderError> {
            self.next(frame)
        }
    }

    struct ClosingRenderer {
        after: usize,
        calls: usize,
    }

    impl Renderer for ClosingRenderer {
        fn render(&mut self, overlay: &Overlay<'_>) -> bool {
            assert_eq!(overlay.dims.width(), overlay.frame.width());
            self.calls += 1;
            self.calls < self.after
        }
    }

    // ── fixtures ──────────────────────────────────────────────────────────

    fn marker_7() -> MarkerDetection {
        MarkerDetection::new(7, [
            PixelPoint::new(10.0, 10.0),
            PixelPoint::new(110.0, 10.0),
            PixelPoint::new(110.0, 110.0),
            PixelPoint::new(10.0, 110.0),
        ])
    }

    fn hand_at(x: f32, y: f32) -> HandDetection {
        synthetic_hand(PixelPoint::new(x, y), 20.0)
    }

    fn driver(
        config:  PipelineConfig,
        frames:  ScriptedFrames,
        hands:   ScriptedHands,
        markers: ScriptedMarkers,
    ) -> (PipelineDriver, RecordingEmitter) {
        let sink = RecordingEmitter::new();
        let d = PipelineDriver::new(
            &config,
            Box::new(frames),
            Box::new(hands),
            Box::new(markers),
            Box::new(sink.clone()),
        );
        (d, sink)
    }

    fn floats(args: &[OscArg]) -> Vec<f32> {
        args.iter().filter_map(|a| match a { OscArg::Float(v) => Some(*v), _ => None }).collect()
    }

    // ── tests ─────────────────────────────────────────────────────────────

    #[test]
    fn lone_marker_is_emitted_and_registered() {
        let (frames, _) = ScriptedFrames::repeat(Frame::filled(200, 200, 0), 1);
        let (mut d, sink) = driver(
            PipelineConfig::default(),
            frames,
            ScriptedHands::new(vec![vec![]]),
            ScriptedMarkers::new(vec![vec![marker_7()]]),
        );

        let outcome = d.run_iteration();
        assert!(matches!(outcome, IterationOutcome::Continue(r) if r.markers == 1 && r.new_markers == 1));

        assert_eq!(sink.addresses(), vec!["/aruco/marker".to_string()]);
        let msg = &sink.messages()[0];
        assert_eq!(msg.args()[0], OscArg::Int(7));
        let expected = [0.05, 0.05, 0.55, 0.05, 0.55, 0.55, 0.05, 0.55];
        for (got, want) in floats(msg.args()).iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-6);
        }

        assert_eq!(d.registry().len(), 1);
        let quad = d.registry().get(7).unwrap();
        let corners = [(0.05, 0.05), (0.55, 0.05), (0.55, 0.55), (0.05, 0.55)];
        for (got, (x, y)) in quad.corners.iter().zip(corners) {
            assert_relative_eq!(got.x, x, epsilon = 1e-6);
            assert_relative_eq!(got.y, y, epsilon = 1e-6);
        }
    }

    #[test]
    fn emission_order_is_hands_then_markers_then_hovers() {
        let (frames, _) = ScriptedFrames::repeat(Frame::filled(200, 200, 0), 1);
        let (mut d, sink) = driver(
            PipelineConfig::default(),
            frames,
            // first hand hovers over marker 7, second is far away
            ScriptedHands::new(vec![vec![hand_at(60.0, 60.0), hand_at(180.0, 20.0)]]),
            ScriptedMarkers::new(vec![vec![marker_7()]]),
        );

        d.run_iteration();
        assert_eq!(
            sink.addresses(),
            vec!["/hands", "/hands", "/aruco/marker", "/hand_detected"]
        );
        let msgs = sink.messages();
        assert_eq!(msgs[0].args()[0], OscArg::Int(0));
        assert_eq!(msgs[1].args()[0], OscArg::Int(1));
        assert_eq!(msgs[0].args().len(), 43);
        assert_eq!(msgs[3].args(), &[OscArg::Int(7)]);
    }

    #[test]
    fn end_of_stream_on_third_pull_means_two_iterations_one_release() {
        let (frames, releases) = ScriptedFrames::repeat(Frame::filled(32, 32, 0), 2);
        let (mut d, _) = driver(
            PipelineConfig::default(),
            frames,
            ScriptedHands::new(vec![]),
            ScriptedMarkers::new(vec![]),
        );

        let summary = d.run(&CancelToken::new());
        assert_eq!(summary.iterations, 2);
        assert_eq!(summary.stop, StopReason::EndOfStream);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn read_error_ends_the_run_like_end_of_stream() {
        let (mut frames, releases) = ScriptedFrames::repeat(Frame::filled(8, 8, 0), 1);
        frames.frames.push_back(Err(CaptureError::Read("device unplugged".into())));
        frames.frames.push_back(Ok(Frame::filled(8, 8, 0)));
        let (mut d, _) = driver(
            PipelineConfig::default(),
            frames,
            ScriptedHands::new(vec![]),
            ScriptedMarkers::new(vec![]),
        );

        let summary = d.run(&CancelToken::new());
        assert_eq!(summary.iterations, 1);
        assert_eq!(summary.stop, StopReason::EndOfStream);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn seeded_registry_is_hovered_before_any_marker_is_seen() {
        let dims = FrameDims::new(200, 200).unwrap();
        let mut known = MarkerRegistry::new();
        known.upsert(7, NormalizedMarker::from_detection(&marker_7(), dims).quad);

        let (frames, _) = ScriptedFrames::repeat(Frame::filled(200, 200, 0), 1);
        let (d, sink) = driver(
            PipelineConfig::default(),
            frames,
            ScriptedHands::new(vec![vec![hand_at(60.0, 60.0)]]),
            ScriptedMarkers::new(vec![vec![]]),
        );
        let mut d = d.with_registry(known);

        d.run_iteration();
        assert_eq!(sink.addresses(), vec!["/hands", "/hand_detected"]);
        assert!(d.registry().contains(7));
    }

    #[test]
    fn markers_out_of_view_still_trigger_hovers() {
        let (frames, _) = ScriptedFrames::repeat(Frame::filled(200, 200, 0), 2);
        let (mut d, sink) = driver(
            PipelineConfig::default(),
            frames,
            ScriptedHands::new(vec![vec![], vec![hand_at(60.0, 60.0)]]),
            ScriptedMarkers::new(vec![vec![marker_7()], vec![]]),
        );

        d.run_iteration();
        d.run_iteration();
        assert_eq!(
            sink.addresses(),
            vec!["/aruco/marker", "/hands", "/hand_detected"]
        );
    }

    #[test]
    fn hover_uses_the_quad_from_this_frame_when_a_marker_moves() {
        let moved = MarkerDetection::new(7, [
            PixelPoint::new(120.0, 120.0),
            PixelPoint::new(190.0, 120.0),
            PixelPoint::new(190.0, 190.0),
            PixelPoint::new(120.0, 190.0),
        ]);
        let (frames, _) = ScriptedFrames::repeat(Frame::filled(200, 200, 0), 2);
        let (mut d, sink) = driver(
            PipelineConfig::default(),
            frames,
            // the fingertip follows the marker to wherever it is this frame
            ScriptedHands::new(vec![vec![hand_at(150.0, 150.0)], vec![hand_at(60.0, 60.0)]]),
            ScriptedMarkers::new(vec![vec![moved], vec![marker_7()]]),
        );

        d.run_iteration();
        assert_eq!(sink.addresses().last().map(String::as_str), Some("/hand_detected"));
        d.run_iteration();
        assert_eq!(sink.addresses().iter().filter(|a| *a == "/hand_detected").count(), 2);

        // hovering where the marker used to be: the registry only keeps the latest quad
        let (frames, _) = ScriptedFrames::repeat(Frame::filled(200, 200, 0), 2);
        let (mut d, sink) = driver(
            PipelineConfig::default(),
            frames,
            ScriptedHands::new(vec![vec![], vec![hand_at(150.0, 150.0)]]),
            ScriptedMarkers::new(vec![vec![shifted(&marker_7(), 80.0)], vec![marker_7()]]),
        );
        d.run_iteration();
        d.run_iteration();
        assert!(!sink.addresses().iter().any(|a| a == "/hand_detected"));
    }

    fn shifted(m: &MarkerDetection, by: f32) -> MarkerDetection {
        MarkerDetection::new(m.marker_id, m.corners.map(|p| PixelPoint::new(p.x + by, p.y + by)).corners)
    }

    #[test]
    fn hovering_fires_every_frame() {
        let (frames, _) = ScriptedFrames::repeat(Frame::filled(200, 200, 0), 3);
        let (mut d, sink) = driver(
            PipelineConfig::default(),
            frames,
            ScriptedHands::new(vec![vec![hand_at(60.0, 60.0)]; 3]),
            ScriptedMarkers::new(vec![vec![marker_7()]]),
        );

        let summary = d.run(&CancelToken::new());
        assert_eq!(summary.interactions, 3);
        assert_eq!(sink.addresses().iter().filter(|a| *a == "/hand_detected").count(), 3);
    }

    #[test]
    fn inversion_reaches_only_the_marker_provider() {
        let (frames, _) = ScriptedFrames::repeat(Frame::filled(16, 16, 10), 1);
        let hands   = ScriptedHands::new(vec![]);
        let markers = ScriptedMarkers::new(vec![]);
        let (hands_saw, markers_saw) = (hands.seen.clone(), markers.seen.clone());
        let config = PipelineConfig { invert_markers: true, ..PipelineConfig::default() };
        let (mut d, _) = driver(config, frames, hands, markers);

        d.run_iteration();
        assert_eq!(*hands_saw.lock().unwrap(), vec![10]);
        assert_eq!(*markers_saw.lock().unwrap(), vec![245]);
    }

    #[test]
    fn without_inversion_both_providers_see_the_original() {
        let (frames, _) = ScriptedFrames::repeat(Frame::filled(16, 16, 10), 1);
        let hands   = ScriptedHands::new(vec![]);
        let markers = ScriptedMarkers::new(vec![]);
        let markers_saw = markers.seen.clone();
        let (mut d, _) = driver(PipelineConfig::default(), frames, hands, markers);

        d.run_iteration();
        assert_eq!(*markers_saw.lock().unwrap(), vec![10]);
    }

    #[test]
    fn provider_failure_counts_as_nothing_detected() {
        let (frames, _) = ScriptedFrames::repeat(Frame::filled(200, 200, 0), 2);
        let (mut d, sink) = driver(
            PipelineConfig::default(),
            frames,
            ScriptedHands::new(vec![]).failing_once(ProviderError::Inference("boom".into())),
            ScriptedMarkers::new(vec![vec![marker_7()]])
                .failing_once(ProviderError::Detection("bad frame".into())),
        );

        assert!(matches!(d.run_iteration(), IterationOutcome::Continue(r) if r.markers == 0));
        assert!(sink.is_empty());
        assert!(matches!(d.run_iteration(), IterationOutcome::Continue(r) if r.markers == 1));
        assert_eq!(d.registry().len(), 1);
    }

    #[test]
    fn zero_sized_frames_are_skipped() {
        let (frames, releases) = ScriptedFrames::new(vec![
            Frame::filled(0, 10, 0),
            Frame::filled(200, 200, 0),
        ]);
        let (mut d, sink) = driver(
            PipelineConfig::default(),
            frames,
            ScriptedHands::new(vec![]),
            ScriptedMarkers::new(vec![vec![marker_7()]]),
        );

        let summary = d.run(&CancelToken::new());
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.iterations, 1);
        assert_eq!(sink.addresses(), vec!["/aruco/marker".to_string()]);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancelled_before_start_processes_nothing() {
        let (frames, releases) = ScriptedFrames::repeat(Frame::filled(8, 8, 0), 5);
        let (mut d, sink) = driver(
            PipelineConfig::default(),
            frames,
            ScriptedHands::new(vec![]),
            ScriptedMarkers::new(vec![]),
        );
        let cancel = CancelToken::new();
        cancel.clone().cancel();

        let summary = d.run(&cancel);
        assert_eq!(summary.iterations, 0);
        assert_eq!(summary.stop, StopReason::Cancelled);
        assert!(sink.is_empty());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn frame_limit_stops_the_run() {
        let (frames, releases) = ScriptedFrames::repeat(Frame::filled(8, 8, 0), 10);
        let config = PipelineConfig { max_frames: Some(3), ..PipelineConfig::default() };
        let (mut d, _) = driver(config, frames, ScriptedHands::new(vec![]), ScriptedMarkers::new(vec![]));

        let summary = d.run(&CancelToken::new());
        assert_eq!(summary.iterations, 3);
        assert_eq!(summary.stop, StopReason::FrameLimit);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closing_the_window_stops_after_that_frame() {
        let (frames, releases) = ScriptedFrames::repeat(Frame::filled(8, 8, 0), 10);
        let (d, _) = driver(
            PipelineConfig::default(),
            frames,
            ScriptedHands::new(vec![]),
            ScriptedMarkers::new(vec![]),
        );
        let mut d = d.with_renderer(Box::new(ClosingRenderer { after: 2, calls: 0 }));

        let summary = d.run(&CancelToken::new());
        assert_eq!(summary.iterations, 2);
        assert_eq!(summary.stop, StopReason::WindowClosed);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn summary_reports_registry_size_and_totals() {
        let second = MarkerDetection::new(2, [
            PixelPoint::new(150.0, 150.0),
            PixelPoint::new(190.0, 150.0),
            PixelPoint::new(190.0, 190.0),
            PixelPoint::new(150.0, 190.0),
        ]);
        let (frames, _) = ScriptedFrames::repeat(Frame::filled(200, 200, 0), 3);
        let (mut d, sink) = driver(
            PipelineConfig::default(),
            frames,
            ScriptedHands::new(vec![vec![hand_at(5.0, 5.0)]; 3]),
            ScriptedMarkers::new(vec![vec![marker_7()], vec![second, marker_7()], vec![]]),
        );

        let summary = d.run(&CancelToken::new());
        assert_eq!(summary.iterations, 3);
        assert_eq!(summary.hands, 3);
        assert_eq!(summary.markers, 3);
        assert_eq!(summary.registry_size, 2);
        assert_eq!(summary.delivery, DeliveryStats { sent: sink.len() as u64, dropped: 0 });
        assert_eq!(d.registry().snapshot().map(|(id, _)| id).collect::<Vec<_>>(), vec![2, 7]);
    }
}
