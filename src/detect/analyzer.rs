use std::io::Cursor;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context};
use image::ImageReader;
use log::info;
use uuid::Uuid;

use crate::config::GameConfig;
use crate::error::GameError;
use crate::models::{AnimalClass, BoundingBox, ContourPoint, Detection, ImageAnalysis, RawDetection};

use super::{ConfidenceStore, Detector, ADJUSTMENT_LIMIT};

/// Turns raw detector output into game detections.
///
/// Pixel boxes become normalized center boxes, class ids become semantic
/// classes through the configured table, and the learned per-class
/// confidence adjustment is applied before the threshold. The detector is
/// slow and CPU/GPU-bound, so both the image header probe and the
/// inference run under `spawn_blocking`, off the request path.
#[derive(Clone)]
pub struct ImageAnalyzer {
    detector: Arc<dyn Detector>,
    confidence: ConfidenceStore,
    config: GameConfig,
}

impl ImageAnalyzer {
    pub fn new(detector: Arc<dyn Detector>, confidence: ConfidenceStore, config: GameConfig) -> Self {
        Self {
            detector,
            confidence,
            config,
        }
    }

    pub async fn analyze(&self, image_bytes: Vec<u8>) -> Result<ImageAnalysis, GameError> {
        let started = Instant::now();
        let image_id = short_image_id();
        let bytes = Arc::new(image_bytes);

        let (width, height) = {
            let bytes = Arc::clone(&bytes);
            tokio::task::spawn_blocking(move || probe_dimensions(&bytes))
                .await
                .map_err(|err| GameError::Detector(anyhow!("dimension probe task failed: {err}")))??
        };

        // A positive class adjustment can lift a borderline candidate over
        // the threshold, so the detector floor sits one limit below it.
        let floor = (self.config.confidence_threshold - ADJUSTMENT_LIMIT).max(0.0);
        let raw = {
            let detector = Arc::clone(&self.detector);
            let bytes = Arc::clone(&bytes);
            tokio::task::spawn_blocking(move || detector.detect(&bytes, floor))
                .await
                .map_err(|err| GameError::Detector(anyhow!("detector task failed: {err}")))?
                .map_err(GameError::Detector)?
        };

        let mut detections = Vec::with_capacity(raw.len());
        for candidate in raw {
            let class = self.config.resolve_class(candidate.class_id)?;
            let adjusted = self.confidence.apply(class, candidate.confidence);
            if adjusted < self.config.confidence_threshold {
                continue;
            }
            detections.push(normalize(candidate, class, adjusted, width as f64, height as f64));
        }

        let target_count = detections.iter().filter(|d| d.is_target).count();
        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            "analyzed image {image_id}: {} detections ({target_count} targets) in {processing_time_ms:.1}ms",
            detections.len()
        );

        Ok(ImageAnalysis {
            image_id,
            detections,
            processing_time_ms,
            has_target: target_count > 0,
            target_count,
        })
    }
}

fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32), GameError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("image format sniffing failed")?;
    let (width, height) = reader
        .into_dimensions()
        .context("image header decode failed")?;
    if width == 0 || height == 0 {
        return Err(GameError::Detector(anyhow!("image has a zero dimension")));
    }
    Ok((width, height))
}

fn normalize(
    raw: RawDetection,
    class: AnimalClass,
    confidence: f64,
    width: f64,
    height: f64,
) -> Detection {
    let [x1, y1, x2, y2] = raw.bbox_pixels;
    let bbox = BoundingBox {
        x: (x1 + x2) / 2.0 / width,
        y: (y1 + y2) / 2.0 / height,
        width: (x2 - x1) / width,
        height: (y2 - y1) / height,
    };
    let contour = raw.contour_pixels.map(|points| {
        points
            .into_iter()
            .map(|[px, py]| ContourPoint {
                x: px / width,
                y: py / height,
            })
            .collect()
    });
    Detection::new(class, confidence, bbox, contour)
}

fn short_image_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    struct CannedDetector(Vec<RawDetection>);

    impl Detector for CannedDetector {
        fn detect(&self, _image: &[u8], _confidence_floor: f64) -> anyhow::Result<Vec<RawDetection>> {
            Ok(self.0.clone())
        }
    }

    struct FailingDetector;

    impl Detector for FailingDetector {
        fn detect(&self, _image: &[u8], _confidence_floor: f64) -> anyhow::Result<Vec<RawDetection>> {
            bail!("model backend unavailable")
        }
    }

    /// 100x50 PNG so pixel-space boxes normalize to round numbers.
    fn test_image() -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbImage::new(100, 50)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn analyzer(detector: impl Detector + 'static) -> ImageAnalyzer {
        ImageAnalyzer::new(
            Arc::new(detector),
            ConfidenceStore::new(),
            GameConfig::default(),
        )
    }

    #[tokio::test]
    async fn normalizes_pixel_boxes_to_unit_space() {
        let analyzer = analyzer(CannedDetector(vec![RawDetection {
            class_id: 0,
            confidence: 0.9,
            bbox_pixels: [25.0, 10.0, 75.0, 40.0],
            contour_pixels: Some(vec![[50.0, 25.0]]),
        }]));

        let analysis = analyzer.analyze(test_image()).await.unwrap();
        assert_eq!(analysis.detections.len(), 1);
        assert!(analysis.has_target);
        assert_eq!(analysis.target_count, 1);
        assert_eq!(analysis.image_id.len(), 8);

        let bbox = analysis.detections[0].bbox;
        assert!((bbox.x - 0.5).abs() < 1e-9);
        assert!((bbox.y - 0.5).abs() < 1e-9);
        assert!((bbox.width - 0.5).abs() < 1e-9);
        assert!((bbox.height - 0.6).abs() < 1e-9);

        let contour = analysis.detections[0].contour.as_ref().unwrap();
        assert!((contour[0].x - 0.5).abs() < 1e-9);
        assert!((contour[0].y - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn adjustment_can_lift_a_borderline_detection_over_threshold() {
        let confidence = ConfidenceStore::new();
        let analyzer = ImageAnalyzer::new(
            Arc::new(CannedDetector(vec![RawDetection {
                class_id: 0,
                confidence: 0.4,
                bbox_pixels: [0.0, 0.0, 50.0, 25.0],
                contour_pixels: None,
            }])),
            confidence.clone(),
            GameConfig::default(),
        );

        // Below the 0.5 threshold without help.
        let analysis = analyzer.analyze(test_image()).await.unwrap();
        assert!(analysis.detections.is_empty());
        assert!(!analysis.has_target);

        confidence.add(AnimalClass::Target(crate::models::TargetKind::Boar), 0.2);
        let analysis = analyzer.analyze(test_image()).await.unwrap();
        assert_eq!(analysis.detections.len(), 1);
        assert!((analysis.detections[0].confidence - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unmapped_class_id_fails_the_analysis() {
        let analyzer = analyzer(CannedDetector(vec![RawDetection {
            class_id: 42,
            confidence: 0.9,
            bbox_pixels: [0.0, 0.0, 10.0, 10.0],
            contour_pixels: None,
        }]));

        assert!(matches!(
            analyzer.analyze(test_image()).await,
            Err(GameError::UnknownClass(42))
        ));
    }

    #[tokio::test]
    async fn detector_failure_surfaces_as_distinct_error() {
        let analyzer = analyzer(FailingDetector);
        assert!(matches!(
            analyzer.analyze(test_image()).await,
            Err(GameError::Detector(_))
        ));
    }

    #[tokio::test]
    async fn garbage_bytes_fail_the_dimension_probe() {
        let analyzer = analyzer(CannedDetector(Vec::new()));
        assert!(analyzer.analyze(vec![0u8; 16]).await.is_err());
    }
}
