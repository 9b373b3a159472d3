//! Pipeline orchestrator - coordinates all components.
//!
//! Owns the window-advance loop: drain ingestion, extract one
//! receive-time window, run detection, feed the matcher, resolve
//! overdue parcels, and push distance updates downstream.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use contracts::{
    CameraConfig, CameraId, Detection, Detector, FrameSet, ImageData, ImageFormat, LineBlueprint,
    LocalGates, MatcherConfig, Notification, SetFrame, Stage,
};
use frame_sync::{FrameSynchronizer, WindowExtract};
use ingestion::{IngestionPipeline, MockCameraSource, ScannerListener, ScannerListenerConfig};
use matcher::{MasterStatus, MatchFailure, MatchOutcome, PendingDecision, StageMatcher};
use observability::{
    record_buffer_depth, record_detect_latency_ms, record_frame_received, record_match_outcome,
    record_window_extracted, record_window_latency_ms,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::detector::LineScanDetector;
use super::PipelineStats;

/// Distance updates are quantized to this step (meters).
const DISTANCE_STEP_M: f64 = 0.5;

/// Thumbnail edge length (pixels) and JPEG quality.
const THUMBNAIL_PX: u32 = 80;
const THUMBNAIL_QUALITY: u8 = 85;

/// Small backward jitter allowance in local association (pixels).
const BACKWARD_JITTER_PX: f64 = 5.0;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The line blueprint configuration
    pub blueprint: LineBlueprint,

    /// Maximum number of windows to process (None = unlimited)
    pub max_windows: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Mock camera frame rate (Hz)
    pub mock_fps: f64,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until shutdown, timeout, or the window limit.
    ///
    /// The current window always completes before the loop exits, so a
    /// shutdown never leaves a half-processed set behind.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        // Initialize Metrics (optional)
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Setup Ingestion: mock camera sources. Real transports plug in
        // behind the same FrameSource trait.
        info!("Setting up ingestion pipeline...");
        let mut ingestion = IngestionPipeline::new(self.config.buffer_size);
        for camera in blueprint.cameras_in_order() {
            let source = MockCameraSource::with_id(&camera.id, self.config.mock_fps, 800, 600);
            ingestion.register_camera(camera.id.clone(), Box::new(source), None);
        }
        let active_cameras = ingestion.camera_count();
        info!(
            cameras = active_cameras,
            fps = self.config.mock_fps,
            "Camera sources registered (mock)"
        );

        // Scanner feed
        let scanner_listener = blueprint.scanner.as_ref().map(|scanner| {
            ScannerListener::new(
                ScannerListenerConfig::new(&scanner.host, scanner.port),
                ingestion.metrics(),
            )
        });
        let mut scan_rx = scanner_listener
            .as_ref()
            .map(|listener| listener.start(self.config.buffer_size));
        if scan_rx.is_none() {
            warn!("No scanner configured - no master records will be created");
        }

        // Setup Notify Dispatcher
        let (notify_tx, notify_rx) = mpsc::channel::<Notification>(self.config.buffer_size);

        if blueprint.notifiers.is_empty() {
            warn!("No notifiers configured - tracking events will be dropped");
        }

        let dispatcher = notifier::create_dispatcher(blueprint.notifiers.clone(), notify_rx)
            .context("Failed to create notify dispatcher")?;
        let active_notifiers = blueprint.notifiers.len();
        let dispatcher_handle = dispatcher.spawn();
        info!(notifiers = active_notifiers, "Notify dispatcher started");

        // Start frames flowing
        ingestion.start_all();
        let frame_rx = ingestion
            .take_receiver()
            .context("Failed to get ingestion receiver")?;

        let detector: Arc<dyn Detector> = Arc::new(LineScanDetector::new());
        let mut controller = Controller::new(blueprint, detector, notify_tx);
        controller.stats.active_cameras = active_cameras;
        controller.stats.active_notifiers = active_notifiers;

        info!(
            max_windows = ?self.config.max_windows,
            window_s = blueprint.sync.window_s,
            "Pipeline running"
        );

        let idle = Duration::from_millis(10);
        let mut last_stats = Instant::now();

        loop {
            if *shutdown.borrow() {
                info!("Shutdown requested, completing current window");
                break;
            }
            if let Some(timeout) = self.config.timeout {
                if start_time.elapsed() >= timeout {
                    info!(timeout_secs = timeout.as_secs(), "Pipeline timeout reached");
                    break;
                }
            }
            if let Some(max) = self.config.max_windows {
                if controller.windows_advanced() >= max {
                    info!(windows = max, "Reached window limit");
                    break;
                }
            }

            // Drain inputs; producers run concurrently, the controller
            // consumes between windows.
            while let Ok(packet) = frame_rx.try_recv() {
                controller.stats.frames_received += 1;
                record_frame_received(packet.camera_id.as_str());
                controller.sync.put(packet);
            }
            if let Some(rx) = scan_rx.as_mut() {
                while let Ok(event) = rx.try_recv() {
                    controller.stats.scans_received += 1;
                    controller.matcher.on_scan_event(&event);
                }
            }

            let advanced = controller.tick().await;

            if last_stats.elapsed() >= Duration::from_secs(1) {
                controller.log_period_stats();
                last_stats = Instant::now();
            }

            if !advanced {
                tokio::time::sleep(idle).await;
            }
        }

        // Shutdown
        info!("Shutting down pipeline...");
        ingestion.stop_all();
        if let Some(listener) = &scanner_listener {
            listener.stop();
        }

        // Dropping the controller closes the notification channel
        let mut stats = controller.into_stats();

        // Wait for the dispatcher to flush
        let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;

        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            windows = stats.windows_complete,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// One locally tracked box on a camera.
#[derive(Debug, Clone)]
struct LocalTrack {
    /// Box center at the last sighting (pixels)
    last_pos: (f64, f64),

    /// Master this track resolved to, if any
    master_id: Option<String>,
}

/// Window-advance controller.
///
/// Single-owner state machine: exactly one task drives it, so the
/// synchronizer, matcher and per-camera track tables need no locking.
struct Controller {
    sync: FrameSynchronizer,
    matcher: StageMatcher,
    matcher_config: MatcherConfig,

    /// Camera configurations in belt order
    cameras: Vec<CameraConfig>,

    /// Camera whose frames feed thumbnails
    local_camera_id: Option<String>,

    /// Where position thumbnails are persisted, if anywhere
    thumbnail_dir: Option<std::path::PathBuf>,

    belt_speed: f64,
    window_s: f64,
    max_wait_wall: Duration,
    stale_frame_s: f64,
    resolve_ahead_s: f64,

    detector: Arc<dyn Detector>,
    notify_tx: mpsc::Sender<Notification>,

    /// Current window anchor in receive time
    cursor: Option<f64>,

    /// Wall-clock time of the last window advance
    last_window_wall: Instant,

    /// Window count at the last stats tick
    last_period_windows: u64,

    /// Receive-to-capture lag seen on the last complete set, so
    /// forced advances can stay on the capture clock
    capture_lag_s: f64,

    /// Live local tracks per camera
    active_tracks: HashMap<String, HashMap<String, LocalTrack>>,

    /// Per-camera local uid counters
    local_uid_counter: HashMap<String, u64>,

    /// Last consumed capture time per camera, for the resolve-ahead guard
    last_consumed: HashMap<String, f64>,

    /// Monotonic detection id
    detection_seq: u64,

    /// Thumbnails captured in the current set, keyed by master uid
    set_thumbnails: HashMap<String, Bytes>,

    stats: PipelineStats,
}

impl Controller {
    fn new(
        blueprint: &LineBlueprint,
        detector: Arc<dyn Detector>,
        notify_tx: mpsc::Sender<Notification>,
    ) -> Self {
        let cameras: Vec<CameraConfig> =
            blueprint.cameras_in_order().into_iter().cloned().collect();

        Self {
            sync: FrameSynchronizer::new(blueprint.to_sync_config()),
            matcher: StageMatcher::new(blueprint.to_matcher_config()),
            matcher_config: blueprint.to_matcher_config(),
            cameras,
            local_camera_id: blueprint.local_camera().map(|c| c.id.clone()),
            thumbnail_dir: blueprint.line.thumbnail_dir.clone(),
            belt_speed: blueprint.line.belt_speed,
            window_s: blueprint.sync.window_s,
            max_wait_wall: Duration::from_secs_f64(blueprint.sync.max_wait_wall_s),
            stale_frame_s: blueprint.sync.stale_frame_s,
            resolve_ahead_s: blueprint.sync.resolve_ahead_s,
            detector,
            notify_tx,
            cursor: None,
            last_window_wall: Instant::now(),
            last_period_windows: 0,
            capture_lag_s: 0.0,
            active_tracks: HashMap::new(),
            local_uid_counter: HashMap::new(),
            last_consumed: HashMap::new(),
            detection_seq: 0,
            set_thumbnails: HashMap::new(),
            stats: PipelineStats::default(),
        }
    }

    fn windows_advanced(&self) -> u64 {
        self.stats.windows_complete + self.stats.windows_forced
    }

    fn into_stats(self) -> PipelineStats {
        self.stats
    }

    /// Try to advance one window. Returns whether the cursor moved.
    async fn tick(&mut self) -> bool {
        let start = match self.cursor {
            Some(t) => t,
            None => match self.sync.min_head_receive_time() {
                Some(t) => {
                    debug!(anchor = t, "window cursor initialized");
                    self.last_window_wall = Instant::now();
                    self.cursor = Some(t);
                    t
                }
                None => return false,
            },
        };
        let end = start + self.window_s;

        match self.sync.extract_set(start, end) {
            WindowExtract::Complete(set) => {
                let t0 = Instant::now();
                self.process_set(&set).await;
                let latency_ms = t0.elapsed().as_secs_f64() * 1000.0;

                record_window_extracted(true);
                record_window_latency_ms(latency_ms);
                self.stats.metrics.update_window(true, &[]);
                self.stats.metrics.record_latency_ms(latency_ms);
                self.stats.windows_complete += 1;

                self.advance(end);
                true
            }
            WindowExtract::Incomplete { missing } => {
                if self.last_window_wall.elapsed() >= self.max_wait_wall {
                    warn!(
                        window_start = start,
                        window_end = end,
                        missing = ?missing,
                        "window never completed, forcing advance"
                    );

                    // No vision this window; distances still move with
                    // time, on the capture clock seen last.
                    self.set_thumbnails.clear();
                    self.report_distances(end - self.capture_lag_s);
                    self.sync.remove_interval(start, end);

                    record_window_extracted(false);
                    self.stats.metrics.update_window(false, &missing);
                    self.stats.metrics.record_forced_advance();
                    self.stats.windows_forced += 1;

                    self.advance(end);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn advance(&mut self, end: f64) {
        self.cursor = Some(end);
        self.last_window_wall = Instant::now();
        self.matcher.archive_expired(end);
    }

    /// Process one complete window: detect on every frame concurrently,
    /// then match per camera in belt order.
    async fn process_set(&mut self, set: &FrameSet) {
        self.set_thumbnails.clear();

        // Detection fan-out, joined before any matching starts
        let mut tasks = Vec::new();
        for camera in &self.cameras {
            let Some(frame) = set.get(&camera.id) else {
                continue;
            };
            let detector = self.detector.clone();
            let camera_id = CameraId::from(camera.id.as_str());
            let image = frame.image.clone();
            let region = camera.region_for_height(frame.image.height);
            tasks.push((
                camera.id.clone(),
                tokio::task::spawn_blocking(move || {
                    let started = Instant::now();
                    let result = detector.detect(&camera_id, &image, &region);
                    (result, started.elapsed())
                }),
            ));
        }

        let mut detections: HashMap<String, Vec<Detection>> = HashMap::new();
        for (camera_id, task) in tasks {
            match task.await {
                Ok((Ok(dets), elapsed)) => {
                    record_detect_latency_ms(&camera_id, elapsed.as_secs_f64() * 1000.0);
                    detections.insert(camera_id, dets);
                }
                Ok((Err(err), _)) => {
                    warn!(camera_id = %camera_id, error = %err, "detection failed, treating as empty");
                }
                Err(err) => {
                    warn!(camera_id = %camera_id, error = %err, "detection task failed");
                }
            }
        }

        // Matching in belt order keeps upstream queues ahead of
        // downstream consumers within the same window.
        let cameras = self.cameras.clone();
        let mut max_capture = f64::NEG_INFINITY;
        for camera in &cameras {
            let Some(frame) = set.get(&camera.id) else {
                continue;
            };
            max_capture = max_capture.max(frame.capture_time);
            let dets = detections.remove(&camera.id).unwrap_or_default();
            self.process_camera(camera, frame, &dets);
        }

        // Distance extrapolation runs on the capture clock; the matcher
        // deadlines live in that domain too.
        if max_capture.is_finite() {
            self.capture_lag_s = (set.window_end - max_capture).max(0.0);
            self.report_distances(max_capture);
        }
    }

    /// Local association and matcher feeding for one camera frame.
    fn process_camera(&mut self, camera: &CameraConfig, frame: &SetFrame, detections: &[Detection]) {
        let time_s = frame.capture_time;
        let gates = camera.gates_for_height(frame.image.height);
        let is_local = self.local_camera_id.as_deref() == Some(camera.id.as_str());

        let prev = self.active_tracks.remove(&camera.id).unwrap_or_default();
        let mut new_active: HashMap<String, LocalTrack> = HashMap::new();
        self.last_consumed.insert(camera.id.clone(), time_s);

        for det in detections {
            if !det.on_primary_line && !det.on_eol_line {
                continue;
            }
            let (cx, cy) = det.center;

            match best_track(&prev, det.center, &gates) {
                Some(local_uid) => {
                    // Continuation of a known local track; no matcher call.
                    let master_id = prev[local_uid].master_id.clone();
                    if let Some(mid) = &master_id {
                        if self
                            .matcher
                            .master(mid)
                            .is_some_and(|m| m.status == MasterStatus::Missing)
                        {
                            continue;
                        }
                        if is_local {
                            if let Some(thumb) = encode_thumbnail(&frame.image, det.bbox) {
                                self.store_thumbnail(mid.clone(), thumb);
                            }
                        }
                    }
                    new_active.insert(
                        local_uid.clone(),
                        LocalTrack {
                            last_pos: (cx, cy),
                            master_id,
                        },
                    );
                }
                None => {
                    let counter = self.local_uid_counter.entry(camera.id.clone()).or_insert(0);
                    *counter += 1;
                    let local_uid = format!("{}_{:03}", camera.id, counter);
                    self.detection_seq += 1;

                    let stage = if det.on_eol_line {
                        Stage::EndOfLine
                    } else {
                        camera.stage
                    };
                    let outcome =
                        self.matcher
                            .attempt_match(stage, time_s, det.width(), self.detection_seq);
                    record_match_outcome(stage.as_str(), outcome_label(&outcome));

                    match outcome {
                        MatchOutcome::Matched { uid } | MatchOutcome::AlreadyMatched { uid } => {
                            self.stats.matches_ok += 1;
                            self.stats.metrics.matches_ok += 1;

                            if self.is_final_stage(&uid, stage) {
                                // Fresh sighting at the route's last
                                // checkpoint: the parcel sailed past its
                                // pickup point still on the belt.
                                info!(uid = %uid, stage = %stage, "parcel missed its pickup");
                                self.matcher.mark_missing(&uid, time_s);
                                self.stats.missing += 1;
                                self.stats.metrics.missing += 1;
                                self.notify(Notification::Missing { uid });
                                continue;
                            }

                            if stage == Stage::EndOfLine {
                                self.notify(Notification::Eol { uid: uid.clone() });
                            }
                            if is_local {
                                if let Some(thumb) = encode_thumbnail(&frame.image, det.bbox) {
                                    self.store_thumbnail(uid.clone(), thumb);
                                }
                            }
                            new_active.insert(
                                local_uid,
                                LocalTrack {
                                    last_pos: (cx, cy),
                                    master_id: Some(uid),
                                },
                            );
                        }
                        MatchOutcome::Failed(failure) => {
                            match failure {
                                MatchFailure::OutOfMargin => {
                                    self.stats.metrics.matches_out_of_margin += 1;
                                }
                                MatchFailure::EmptyQueue => {
                                    self.stats.metrics.matches_empty_queue += 1;
                                }
                                _ => {}
                            }
                            debug!(
                                camera_id = %camera.id,
                                stage = %stage,
                                failure = ?failure,
                                "detection left unmatched"
                            );
                            new_active.insert(
                                local_uid,
                                LocalTrack {
                                    last_pos: (cx, cy),
                                    master_id: None,
                                },
                            );
                        }
                    }
                }
            }
        }

        // Tracks that fell out of view go pending from this checkpoint
        for (local_uid, track) in &prev {
            if !new_active.contains_key(local_uid) {
                if let Some(mid) = &track.master_id {
                    self.matcher.mark_pending(mid, camera.stage);
                }
            }
        }

        self.active_tracks.insert(camera.id.clone(), new_active);

        // Timeout decisions run against this frame's capture clock,
        // once per processed camera.
        self.resolve_all(time_s);
    }

    /// Timeout decisions for every live master, guarded against stale
    /// windows and cameras that ran ahead.
    fn resolve_all(&mut self, now_s: f64) {
        let wall = ingestion::seconds_of_day();
        if wall - now_s > self.stale_frame_s {
            debug!(
                window_time = now_s,
                lag_s = wall - now_s,
                "stale window, skipping pending resolution"
            );
            return;
        }

        let min_consumed = self
            .last_consumed
            .values()
            .copied()
            .fold(f64::INFINITY, f64::min);
        if min_consumed.is_finite() && now_s > min_consumed + self.resolve_ahead_s {
            debug!(
                window_time = now_s,
                min_consumed,
                "window ahead of slowest camera, skipping pending resolution"
            );
            return;
        }

        for uid in self.matcher.live_uids() {
            let Some(resolution) = self.matcher.resolve_pending(&uid, now_s) else {
                continue;
            };
            match resolution.decision {
                PendingDecision::Pickup => {
                    info!(uid = %uid, from = %resolution.from_stage, "parcel picked up");
                    self.stats.pickups += 1;
                    self.stats.metrics.pickups += 1;
                    self.notify(Notification::Pickup { uid });
                }
                PendingDecision::Disappear => {
                    warn!(
                        uid = %uid,
                        from = %resolution.from_stage,
                        next = %resolution.next_stage,
                        "parcel disappeared outside any pickup zone"
                    );
                    self.stats.disappears += 1;
                    self.stats.metrics.disappears += 1;
                    self.notify(Notification::Disappear { uid });
                }
            }
        }
    }

    /// Keep a thumbnail for the current set and persist it if a
    /// thumbnail directory is configured.
    fn store_thumbnail(&mut self, uid: String, thumb: Bytes) {
        if let Some(dir) = &self.thumbnail_dir {
            let path = dir.join(format!("{uid}.jpg"));
            if let Err(err) = std::fs::write(&path, &thumb) {
                warn!(uid = %uid, error = %err, "thumbnail write failed");
            }
        }
        self.set_thumbnails.insert(uid, thumb);
    }

    /// Edge-triggered distance reporting for live masters.
    fn report_distances(&mut self, now_s: f64) {
        let belt_speed = self.belt_speed;
        let mut updates: Vec<(String, f64, Option<Bytes>)> = Vec::new();

        for uid in self.matcher.live_uids() {
            let Some(master) = self.matcher.master_mut(&uid) else {
                continue;
            };
            let Some(remaining) = master.remaining_distance(now_s, belt_speed) else {
                continue;
            };
            let step = quantize_distance(remaining);
            if master.last_sent_distance == Some(step) {
                continue;
            }
            master.last_sent_distance = Some(step);
            updates.push((uid, step, self.set_thumbnails.get(&master.uid).cloned()));
        }

        for (uid, distance, thumbnail) in updates {
            self.notify(Notification::Position {
                uid,
                distance,
                thumbnail,
            });
        }
    }

    /// Fire-and-forget handoff to the dispatcher.
    fn notify(&mut self, notification: Notification) {
        match self.notify_tx.try_send(notification) {
            Ok(()) => {
                self.stats.notifications_sent += 1;
            }
            Err(err) => {
                warn!(error = %err, "notification dropped");
            }
        }
    }

    fn is_final_stage(&self, uid: &str, stage: Stage) -> bool {
        let Some(master) = self.matcher.master(uid) else {
            return false;
        };
        self.matcher_config
            .route(&master.route_code)
            .and_then(|plan| plan.final_stage())
            == Some(stage)
    }

    /// One-second ingest stats line plus buffer depth gauges.
    fn log_period_stats(&mut self) {
        let period = self.sync.stats_and_reset();
        for camera in &period {
            record_buffer_depth(camera.camera_id.as_str(), camera.buffered);
        }
        let bottleneck = period
            .iter()
            .min_by_key(|s| s.received)
            .map(|s| s.camera_id.to_string());
        let frame_counts: Vec<(String, u64)> = period
            .iter()
            .map(|s| (s.camera_id.to_string(), s.received))
            .collect();
        let quarter_counts: Vec<(String, [u64; 4])> = period
            .iter()
            .map(|s| (s.camera_id.to_string(), s.quarters))
            .collect();

        // Windows advanced this period against the ceiling of one
        // window per window_s of stream time.
        let advanced = self.windows_advanced() - self.last_period_windows;
        self.last_period_windows = self.windows_advanced();
        let efficiency = advanced as f64 * self.window_s;

        info!(
            frame_counts = ?frame_counts,
            quarter_counts = ?quarter_counts,
            bottleneck = ?bottleneck,
            masters = self.matcher.master_count(),
            sets_formed = self.sync.set_count(),
            efficiency_pct = efficiency * 100.0,
            "period stats"
        );
    }
}

/// Quantize a remaining distance to the reporting step.
fn quantize_distance(distance: f64) -> f64 {
    (distance / DISTANCE_STEP_M).round() * DISTANCE_STEP_M
}

/// Short label for one match outcome, for metrics.
fn outcome_label(outcome: &MatchOutcome) -> &'static str {
    match outcome {
        MatchOutcome::Matched { .. } => "success",
        MatchOutcome::AlreadyMatched { .. } => "already_matched",
        MatchOutcome::Failed(MatchFailure::EmptyQueue) => "empty_queue",
        MatchOutcome::Failed(MatchFailure::UnknownMaster) => "unknown_master",
        MatchOutcome::Failed(MatchFailure::OutOfMargin) => "out_of_margin",
        MatchOutcome::Failed(MatchFailure::TimeReversed) => "time_reversed",
    }
}

/// Best local track for a detection center, under the motion gates.
///
/// Horizontal offset must stay within `dist_eps`; signed forward travel
/// must stay within `[-BACKWARD_JITTER_PX, max_dy]`. Among admissible
/// tracks the lowest `dx + 0.3 * dy` wins.
fn best_track<'a>(
    tracks: &'a HashMap<String, LocalTrack>,
    center: (f64, f64),
    gates: &LocalGates,
) -> Option<&'a String> {
    let (cx, cy) = center;
    let mut best: Option<(&'a String, f64)> = None;

    for (uid, track) in tracks {
        let dx = (cx - track.last_pos.0).abs();
        let dy = (cy - track.last_pos.1) * gates.forward_sign;
        if dx > gates.dist_eps || dy < -BACKWARD_JITTER_PX || dy > gates.max_dy {
            continue;
        }
        let score = dx + dy * 0.3;
        if best.is_none_or(|(_, s)| score < s) {
            best = Some((uid, score));
        }
    }

    best.map(|(uid, _)| uid)
}

/// Crop a bounding box out of a frame and encode it as JPEG.
fn encode_thumbnail(image_data: &ImageData, bbox: (i32, i32, i32, i32)) -> Option<Bytes> {
    let (x, y, w, h) = bbox;
    let x = x.max(0) as u32;
    let y = y.max(0) as u32;
    if x >= image_data.width || y >= image_data.height {
        return None;
    }
    let w = (w.max(0) as u32).min(image_data.width - x);
    let h = (h.max(0) as u32).min(image_data.height - y);
    if w == 0 || h == 0 {
        return None;
    }

    let dynamic = match image_data.format {
        ImageFormat::Rgb8 => image::RgbImage::from_raw(
            image_data.width,
            image_data.height,
            image_data.data.to_vec(),
        )
        .map(image::DynamicImage::ImageRgb8)?,
        ImageFormat::Bgr8 => {
            let mut rgb = image_data.data.to_vec();
            for px in rgb.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
            image::RgbImage::from_raw(image_data.width, image_data.height, rgb)
                .map(image::DynamicImage::ImageRgb8)?
        }
        ImageFormat::Gray8 => image::GrayImage::from_raw(
            image_data.width,
            image_data.height,
            image_data.data.to_vec(),
        )
        .map(image::DynamicImage::ImageLuma8)?,
        ImageFormat::Jpeg => image::load_from_memory(&image_data.data).ok()?,
    };

    let thumb = dynamic.crop_imm(x, y, w, h).resize_exact(
        THUMBNAIL_PX,
        THUMBNAIL_PX,
        image::imageops::FilterType::Triangle,
    );
    let mut buf = std::io::Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, THUMBNAIL_QUALITY);
    thumb.write_with_encoder(encoder).ok()?;
    Some(Bytes::from(buf.into_inner()))
}
