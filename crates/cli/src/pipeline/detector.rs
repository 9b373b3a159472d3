//! Built-in luminance line-scan detector.
//!
//! Scans the configured detection lines for bright runs (parcels are
//! lighter than the belt) and reports them as bounding boxes. A
//! production deployment swaps in an ML backend behind the same
//! [`Detector`] trait; this one keeps the pipeline self-contained for
//! demo runs and tests.

use contracts::{CameraId, Detection, Detector, ImageData, ImageFormat, RegionConfig, TrackError};

/// Luminance threshold detector over the detection lines.
#[derive(Debug, Clone)]
pub struct LineScanDetector {
    /// Minimum luminance for a parcel pixel
    pub threshold: u8,

    /// Minimum run width to count as a parcel (pixels)
    pub min_width: u32,

    /// Dark gaps up to this wide are bridged inside a run (pixels)
    pub max_gap: u32,
}

impl Default for LineScanDetector {
    fn default() -> Self {
        Self {
            threshold: 160,
            min_width: 20,
            max_gap: 4,
        }
    }
}

impl LineScanDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Luminance of one pixel row, regardless of pixel format.
    fn luma_row(image: &ImageData, y: u32) -> Result<Vec<u8>, TrackError> {
        let width = image.width as usize;
        match image.format {
            ImageFormat::Gray8 => {
                let start = y as usize * width;
                Ok(image.data[start..start + width].to_vec())
            }
            ImageFormat::Rgb8 | ImageFormat::Bgr8 => {
                let start = y as usize * width * 3;
                let row = &image.data[start..start + width * 3];
                Ok(row
                    .chunks_exact(3)
                    .map(|px| ((px[0] as u16 + px[1] as u16 + px[2] as u16) / 3) as u8)
                    .collect())
            }
            ImageFormat::Jpeg => {
                let decoded = image::load_from_memory(&image.data)
                    .map_err(|e| TrackError::detector("", e.to_string()))?
                    .to_luma8();
                let row: Vec<u8> = (0..decoded.width())
                    .map(|x| decoded.get_pixel(x, y.min(decoded.height() - 1)).0[0])
                    .collect();
                Ok(row)
            }
        }
    }

    /// Bright runs along one row, gap-bridged and width-filtered.
    fn scan_row(&self, row: &[u8]) -> Vec<(u32, u32)> {
        let mut runs = Vec::new();
        let mut start: Option<usize> = None;
        let mut gap = 0usize;

        for (x, &luma) in row.iter().enumerate() {
            if luma >= self.threshold {
                if start.is_none() {
                    start = Some(x);
                }
                gap = 0;
            } else if let Some(s) = start {
                gap += 1;
                if gap > self.max_gap as usize {
                    let end = x - gap + 1;
                    if (end - s) as u32 >= self.min_width {
                        runs.push((s as u32, (end - s) as u32));
                    }
                    start = None;
                    gap = 0;
                }
            }
        }

        if let Some(s) = start {
            let end = row.len() - gap;
            if (end - s) as u32 >= self.min_width {
                runs.push((s as u32, (end - s) as u32));
            }
        }

        runs
    }

    fn detect_on_line(
        &self,
        image: &ImageData,
        line_y: i32,
        margin: i32,
        region: &RegionConfig,
        out: &mut Vec<Detection>,
    ) -> Result<(), TrackError> {
        if line_y < 0 || line_y >= image.height as i32 {
            return Ok(());
        }

        let row = Self::luma_row(image, line_y as u32)?;
        for (x, w) in self.scan_row(&row) {
            let bbox = (x as i32, line_y - margin, w as i32, margin * 2);
            out.push(Detection::from_bbox(bbox, region));
        }
        Ok(())
    }
}

impl Detector for LineScanDetector {
    fn detect(
        &self,
        camera: &CameraId,
        image: &ImageData,
        region: &RegionConfig,
    ) -> Result<Vec<Detection>, TrackError> {
        let mut detections = Vec::new();

        self.detect_on_line(image, region.primary_y, region.primary_margin, region, &mut detections)
            .map_err(|e| TrackError::detector(camera.to_string(), e.to_string()))?;

        if let (Some(eol_y), Some(eol_margin)) = (region.eol_y, region.eol_margin) {
            self.detect_on_line(image, eol_y, eol_margin, region, &mut detections)
                .map_err(|e| TrackError::detector(camera.to_string(), e.to_string()))?;
        }

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn gray_image(width: u32, height: u32, bright: &[(u32, u32, u32)]) -> ImageData {
        // bright: (y, x_start, width) spans set to 220 on a 40 background
        let mut data = vec![40u8; (width * height) as usize];
        for &(y, x, w) in bright {
            for dx in 0..w {
                data[(y * width + x + dx) as usize] = 220;
            }
        }
        ImageData {
            width,
            height,
            format: ImageFormat::Gray8,
            data: Bytes::from(data),
        }
    }

    fn region(primary_y: i32, eol_y: Option<i32>) -> RegionConfig {
        RegionConfig {
            primary_y,
            primary_margin: 10,
            eol_y,
            eol_margin: eol_y.map(|_| 8),
        }
    }

    #[test]
    fn finds_run_on_primary_line() {
        let image = gray_image(200, 100, &[(50, 40, 60)]);
        let detector = LineScanDetector::new();

        let dets = detector
            .detect(&CameraId::from("cam"), &image, &region(50, None))
            .unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox, (40, 40, 60, 20));
        assert!(dets[0].on_primary_line);
        assert!(!dets[0].on_eol_line);
    }

    #[test]
    fn narrow_runs_filtered_and_gaps_bridged() {
        // 10px run is below min_width; a 30px run split by a 3px gap counts once
        let image = gray_image(
            200,
            100,
            &[(50, 10, 10), (50, 100, 15), (50, 118, 12)],
        );
        let detector = LineScanDetector::new();

        let dets = detector
            .detect(&CameraId::from("cam"), &image, &region(50, None))
            .unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox.0, 100);
        assert_eq!(dets[0].bbox.2, 30);
    }

    #[test]
    fn scans_eol_line_when_configured() {
        let image = gray_image(200, 100, &[(90, 60, 40)]);
        let detector = LineScanDetector::new();

        let dets = detector
            .detect(&CameraId::from("cam"), &image, &region(50, Some(90)))
            .unwrap();
        assert_eq!(dets.len(), 1);
        assert!(dets[0].on_eol_line);
        assert!(!dets[0].on_primary_line);
    }

    #[test]
    fn rgb_rows_average_channels() {
        let width = 100u32;
        let mut data = vec![30u8; (width * 60 * 3) as usize];
        for x in 20..70u32 {
            let base = ((30 * width + x) * 3) as usize;
            data[base] = 220;
            data[base + 1] = 220;
            data[base + 2] = 220;
        }
        let image = ImageData {
            width,
            height: 60,
            format: ImageFormat::Rgb8,
            data: Bytes::from(data),
        };

        let dets = LineScanDetector::new()
            .detect(&CameraId::from("cam"), &image, &region(30, None))
            .unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox.2, 50);
    }

    #[test]
    fn line_outside_image_yields_nothing() {
        let image = gray_image(100, 50, &[(20, 10, 40)]);
        let dets = LineScanDetector::new()
            .detect(&CameraId::from("cam"), &image, &region(80, None))
            .unwrap();
        assert!(dets.is_empty());
    }
}
