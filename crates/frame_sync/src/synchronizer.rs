//! Frame synchronizer implementation.

use std::cmp::Ordering;
use std::collections::HashMap;

use contracts::{CameraId, FramePacket, FrameSet, FrameSyncConfig, SetFrame};
use serde::Serialize;
use tracing::instrument;

use crate::buffer::CameraBuffer;

/// Result of extracting one receive-time window.
#[derive(Debug)]
pub enum WindowExtract {
    /// Every camera contributed at least one frame
    Complete(FrameSet),
    /// One or more cameras had nothing in the window; buffers untouched
    Incomplete { missing: Vec<CameraId> },
}

/// Per-camera counters for one stats period.
#[derive(Debug, Clone, Serialize)]
pub struct CameraStats {
    pub camera_id: CameraId,
    /// Frames received during the period
    pub received: u64,
    /// Arrivals per 250 ms quarter of their receive second
    pub quarters: [u64; 4],
    /// Frames currently buffered
    pub buffered: usize,
    /// Frames dropped since startup
    pub dropped: u64,
    /// Out-of-order arrivals since startup
    pub out_of_order: u64,
}

/// Candidate frame metadata gathered during selection
#[derive(Debug, Clone, Copy)]
struct Candidate {
    slab_key: usize,
    capture_time: f64,
}

/// Multi-camera frame synchronizer
///
/// Groups frames on receive time: capture clocks across the line drift,
/// but arrival at this process is a shared clock. Windows are extracted
/// by the pipeline loop, not produced on push.
#[derive(Debug)]
pub struct FrameSynchronizer {
    /// Configuration
    config: FrameSyncConfig,
    /// Per-camera buffers
    buffers: HashMap<CameraId, CameraBuffer>,
    /// Extracted set counter
    set_counter: u64,
}

impl FrameSynchronizer {
    /// Create a new synchronizer with the given configuration
    pub fn new(config: FrameSyncConfig) -> Self {
        let buffers = config
            .cameras
            .iter()
            .map(|id| (id.clone(), CameraBuffer::new(config.max_per_camera)))
            .collect();

        Self {
            config,
            buffers,
            set_counter: 0,
        }
    }

    /// Push one frame into its camera buffer
    ///
    /// Frames from cameras outside the configuration are dropped.
    #[instrument(
        level = "trace",
        name = "frame_sync_put",
        skip(self, packet),
        fields(camera_id = %packet.camera_id, receive_time = packet.receive_time)
    )]
    pub fn put(&mut self, packet: FramePacket) {
        let Some(buffer) = self.buffers.get_mut(&packet.camera_id) else {
            tracing::warn!(camera_id = %packet.camera_id, "frame from unknown camera dropped");
            metrics::counter!("sync_unknown_camera_frames").increment(1);
            return;
        };

        metrics::counter!(
            "sync_frames_received",
            "camera_id" => packet.camera_id.to_string()
        )
        .increment(1);

        buffer.push(packet);
    }

    /// Earliest receive time across all camera heads
    ///
    /// Returns `None` while any camera buffer is empty: a window anchor
    /// is only meaningful once every camera has something buffered.
    pub fn min_head_receive_time(&self) -> Option<f64> {
        let mut min: Option<f64> = None;
        for buffer in self.buffers.values() {
            let head = buffer.min_receive_time()?;
            min = Some(min.map_or(head, |m: f64| m.min(head)));
        }
        min
    }

    /// Extract one synchronized set for [window_start, window_end)
    ///
    /// Picks one representative frame per camera: network cameras by
    /// capture-time median, the local camera by capture time nearest to
    /// the mean of the network picks (its clock is this machine's own,
    /// so the median rule would bias it against the remote cameras).
    ///
    /// On success the selected frames are removed from their buffers;
    /// everything else, including unselected in-window frames, stays.
    /// An incomplete window mutates nothing.
    #[instrument(
        name = "frame_sync_extract",
        level = "debug",
        skip(self),
        fields(window_start, window_end)
    )]
    pub fn extract_set(&mut self, window_start: f64, window_end: f64) -> WindowExtract {
        let mut candidates: HashMap<CameraId, Vec<Candidate>> = HashMap::new();
        let mut missing = Vec::new();

        for camera_id in &self.config.cameras {
            let in_window: Vec<Candidate> = self
                .buffers
                .get(camera_id)
                .map(|b| {
                    b.frames_in_interval(window_start, window_end)
                        .into_iter()
                        .map(|(slab_key, frame)| Candidate {
                            slab_key,
                            capture_time: frame.capture_time,
                        })
                        .collect()
                })
                .unwrap_or_default();

            if in_window.is_empty() {
                missing.push(camera_id.clone());
            } else {
                candidates.insert(camera_id.clone(), in_window);
            }
        }

        if !missing.is_empty() {
            metrics::counter!("sync_sets_total", "status" => "incomplete").increment(1);
            return WindowExtract::Incomplete { missing };
        }

        // Network cameras first: their median picks anchor the local pick.
        let mut picks: HashMap<CameraId, usize> = HashMap::new();
        let mut network_capture_sum = 0.0;
        let mut network_capture_count = 0usize;

        for (camera_id, cams) in &mut candidates {
            if self.config.local_camera.as_ref() == Some(camera_id) {
                continue;
            }
            let pick = median_candidate(cams);
            network_capture_sum += pick.capture_time;
            network_capture_count += 1;
            picks.insert(camera_id.clone(), pick.slab_key);
        }

        if let Some(local_id) = &self.config.local_camera {
            if let Some(cams) = candidates.get_mut(local_id) {
                let pick = if network_capture_count > 0 {
                    let mean = network_capture_sum / network_capture_count as f64;
                    nearest_candidate(cams, mean)
                } else {
                    median_candidate(cams)
                };
                picks.insert(local_id.clone(), pick.slab_key);
            }
        }

        let mut frames: HashMap<CameraId, SetFrame> = HashMap::new();
        for (camera_id, slab_key) in picks {
            if let Some(buffer) = self.buffers.get_mut(&camera_id) {
                if let Some(packet) = buffer.remove_key(slab_key) {
                    frames.insert(camera_id, SetFrame::from(packet));
                }
            }
        }

        self.set_counter += 1;
        metrics::counter!("sync_sets_total", "status" => "complete").increment(1);

        WindowExtract::Complete(FrameSet {
            window_start,
            window_end,
            frames,
        })
    }

    /// Discard every frame with receive time in [start, end)
    ///
    /// Used to force-advance a window that never completed, bounding
    /// buffer growth.
    #[instrument(name = "frame_sync_remove_interval", level = "trace", skip(self))]
    pub fn remove_interval(&mut self, start: f64, end: f64) {
        for buffer in self.buffers.values_mut() {
            buffer.remove_interval(start, end);
        }
    }

    /// Per-camera counters for the period since the last call
    pub fn stats_and_reset(&mut self) -> Vec<CameraStats> {
        let mut stats: Vec<CameraStats> = self
            .config
            .cameras
            .iter()
            .filter_map(|camera_id| {
                let buffer = self.buffers.get_mut(camera_id)?;
                Some(CameraStats {
                    camera_id: camera_id.clone(),
                    received: buffer.take_received_in_period(),
                    quarters: buffer.take_quarter_counts(),
                    buffered: buffer.len(),
                    dropped: buffer.dropped_count(),
                    out_of_order: buffer.out_of_order_count(),
                })
            })
            .collect();
        stats.sort_by(|a, b| a.camera_id.as_str().cmp(b.camera_id.as_str()));
        stats
    }

    /// Extracted set counter
    pub fn set_count(&self) -> u64 {
        self.set_counter
    }
}

/// Median pick by capture time.
fn median_candidate(cams: &mut [Candidate]) -> Candidate {
    cams.sort_by(|a, b| {
        a.capture_time
            .partial_cmp(&b.capture_time)
            .unwrap_or(Ordering::Equal)
    });
    cams[cams.len() / 2]
}

/// Candidate whose capture time is closest to `target`.
fn nearest_candidate(cams: &[Candidate], target: f64) -> Candidate {
    cams.iter()
        .copied()
        .min_by(|a, b| {
            let da = (a.capture_time - target).abs();
            let db = (b.capture_time - target).abs();
            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
        })
        .unwrap_or(cams[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::{ImageData, ImageFormat};

    fn make_frame(camera_id: &str, capture_time: f64, receive_time: f64) -> FramePacket {
        FramePacket {
            camera_id: camera_id.into(),
            capture_time,
            receive_time,
            image: ImageData {
                width: 4,
                height: 4,
                format: ImageFormat::Gray8,
                data: Bytes::from(vec![0u8; 16]),
            },
        }
    }

    fn config(cameras: &[&str], local: Option<&str>) -> FrameSyncConfig {
        FrameSyncConfig {
            cameras: cameras.iter().map(|c| CameraId::from(*c)).collect(),
            local_camera: local.map(CameraId::from),
            window_s: 0.5,
            max_wait_wall_s: 0.5,
            max_per_camera: 16,
        }
    }

    #[test]
    fn test_min_head_requires_all_cameras() {
        let mut sync = FrameSynchronizer::new(config(&["a", "b"], None));

        sync.put(make_frame("a", 1.0, 1.0));
        assert_eq!(sync.min_head_receive_time(), None);

        sync.put(make_frame("b", 1.2, 1.2));
        assert_eq!(sync.min_head_receive_time(), Some(1.0));
    }

    #[test]
    fn test_unknown_camera_ignored() {
        let mut sync = FrameSynchronizer::new(config(&["a"], None));
        sync.put(make_frame("ghost", 1.0, 1.0));
        assert_eq!(sync.min_head_receive_time(), None);
    }

    #[test]
    fn test_extract_incomplete_mutates_nothing() {
        let mut sync = FrameSynchronizer::new(config(&["a", "b", "c"], None));

        sync.put(make_frame("a", 1.1, 1.1));
        sync.put(make_frame("c", 1.2, 1.2));

        match sync.extract_set(1.0, 1.5) {
            WindowExtract::Incomplete { missing } => {
                assert_eq!(missing, vec![CameraId::from("b")]);
            }
            other => panic!("expected incomplete, got {other:?}"),
        }

        // Frames from the present cameras were not consumed
        sync.put(make_frame("b", 1.3, 1.3));
        match sync.extract_set(1.0, 1.5) {
            WindowExtract::Complete(set) => assert_eq!(set.len(), 3),
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_picks_median_and_consumes_only_picks() {
        let mut sync = FrameSynchronizer::new(config(&["a"], None));

        sync.put(make_frame("a", 1.00, 1.01));
        sync.put(make_frame("a", 1.10, 1.02));
        sync.put(make_frame("a", 1.20, 1.03));

        match sync.extract_set(1.0, 1.5) {
            WindowExtract::Complete(set) => {
                assert_eq!(set.len(), 1);
                assert_eq!(set.get("a").unwrap().capture_time, 1.10);
            }
            other => panic!("expected complete, got {other:?}"),
        }

        // The two unselected frames are still buffered
        match sync.extract_set(1.0, 1.5) {
            WindowExtract::Complete(set) => {
                assert_eq!(set.get("a").unwrap().capture_time, 1.20);
            }
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn test_local_camera_picked_nearest_to_network_mean() {
        let mut sync = FrameSynchronizer::new(config(&["local", "n1", "n2"], Some("local")));

        // Network medians land at 1.10 and 1.30, mean 1.20
        sync.put(make_frame("n1", 1.10, 1.05));
        sync.put(make_frame("n2", 1.30, 1.06));

        // Local clock offset from the network ones; 1.19 is nearest to 1.20
        sync.put(make_frame("local", 1.02, 1.01));
        sync.put(make_frame("local", 1.19, 1.02));
        sync.put(make_frame("local", 1.48, 1.03));

        match sync.extract_set(1.0, 1.5) {
            WindowExtract::Complete(set) => {
                assert_eq!(set.get("local").unwrap().capture_time, 1.19);
                assert_eq!(set.get("n1").unwrap().capture_time, 1.10);
                assert_eq!(set.get("n2").unwrap().capture_time, 1.30);
            }
            other => panic!("expected complete, got {other:?}"),
        }
    }

    #[test]
    fn test_remove_interval_then_extract_is_incomplete() {
        let mut sync = FrameSynchronizer::new(config(&["a", "b"], None));

        sync.put(make_frame("a", 1.1, 1.1));
        sync.put(make_frame("b", 1.2, 1.2));
        sync.put(make_frame("a", 1.7, 1.7));

        sync.remove_interval(1.0, 1.5);
        assert!(matches!(
            sync.extract_set(1.0, 1.5),
            WindowExtract::Incomplete { .. }
        ));

        // Frames outside the interval survive
        assert_eq!(sync.min_head_receive_time(), None);
        sync.put(make_frame("b", 1.8, 1.8));
        assert!(matches!(
            sync.extract_set(1.5, 2.0),
            WindowExtract::Complete(_)
        ));
    }

    #[test]
    fn test_stats_and_reset() {
        let mut sync = FrameSynchronizer::new(config(&["a", "b"], None));

        sync.put(make_frame("a", 1.0, 1.0));
        sync.put(make_frame("a", 1.1, 1.1));
        sync.put(make_frame("a", 1.6, 1.6));
        sync.put(make_frame("b", 1.3, 1.3));

        let stats = sync.stats_and_reset();
        assert_eq!(stats.len(), 2);
        let a = stats.iter().find(|s| s.camera_id == "a").unwrap();
        assert_eq!(a.received, 3);
        assert_eq!(a.buffered, 3);
        assert_eq!(a.quarters, [2, 0, 1, 0]);
        let b = stats.iter().find(|s| s.camera_id == "b").unwrap();
        assert_eq!(b.quarters, [0, 1, 0, 0]);

        let stats = sync.stats_and_reset();
        assert_eq!(stats.iter().map(|s| s.received).sum::<u64>(), 0);
        assert!(stats.iter().all(|s| s.quarters == [0, 0, 0, 0]));
    }
}
