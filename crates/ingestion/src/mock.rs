//! Mock camera source
//!
//! For running the pipeline without real cameras.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{FrameCallback, FramePacket, FrameSource, ImageData, ImageFormat};
use tracing::debug;

use crate::clock::seconds_of_day;

/// Mock camera configuration
#[derive(Debug, Clone)]
pub struct MockCameraConfig {
    pub camera_id: String,

    /// Frame rate (Hz)
    pub frequency_hz: f64,

    pub image_width: u32,
    pub image_height: u32,
}

impl Default for MockCameraConfig {
    fn default() -> Self {
        Self {
            camera_id: "mock_cam".to_string(),
            frequency_hz: 10.0,
            image_width: 800,
            image_height: 600,
        }
    }
}

/// Mock camera source
///
/// Emits flat gray frames at a fixed rate, capture-timed off the wall
/// clock so downstream timing logic behaves as with real cameras.
pub struct MockCameraSource {
    config: MockCameraConfig,
    running: Arc<AtomicBool>,
}

impl MockCameraSource {
    pub fn new(config: MockCameraConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_id(camera_id: &str, frequency_hz: f64, width: u32, height: u32) -> Self {
        Self::new(MockCameraConfig {
            camera_id: camera_id.to_string(),
            frequency_hz,
            image_width: width,
            image_height: height,
        })
    }
}

impl FrameSource for MockCameraSource {
    fn camera_id(&self) -> &str {
        &self.config.camera_id
    }

    fn listen(&self, callback: FrameCallback) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let config = self.config.clone();
        let running = self.running.clone();

        std::thread::spawn(move || {
            let interval = Duration::from_secs_f64(1.0 / config.frequency_hz);
            let frame_size = (config.image_width * config.image_height * 3) as usize;

            debug!(
                camera_id = %config.camera_id,
                frequency_hz = config.frequency_hz,
                "mock camera source started"
            );

            while running.load(Ordering::Relaxed) {
                let now = seconds_of_day();
                let packet = FramePacket {
                    camera_id: config.camera_id.as_str().into(),
                    capture_time: now,
                    // Overwritten by the adapter on delivery
                    receive_time: now,
                    image: ImageData {
                        width: config.image_width,
                        height: config.image_height,
                        format: ImageFormat::Rgb8,
                        data: Bytes::from(vec![128u8; frame_size]),
                    },
                };

                callback(packet);
                std::thread::sleep(interval);
            }

            debug!(camera_id = %config.camera_id, "mock camera source stopped");
        });
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn mock_camera_emits_frames() {
        let source = MockCameraSource::with_id("test_cam", 100.0, 100, 80);
        let (tx, rx) = mpsc::channel();

        source.listen(Arc::new(move |packet| {
            let _ = tx.send(packet);
        }));

        for _ in 0..3 {
            let packet = rx.recv_timeout(Duration::from_secs(1)).unwrap();
            assert_eq!(&*packet.camera_id, "test_cam");
            assert_eq!(packet.image.width, 100);
            assert_eq!(packet.image.height, 80);
            assert_eq!(packet.image.data.len(), 100 * 80 * 3);
        }

        source.stop();
        assert!(!source.is_listening());
    }
}
