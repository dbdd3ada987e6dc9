use anyhow::Result;

use crate::models::RawDetection;

/// Boundary to the external vision model.
///
/// Implementations run the actual inference, which may be slow and
/// CPU/GPU-bound; the engine never calls this on the async runtime
/// directly (see `ImageAnalyzer`). `confidence_floor` is a pre-filter
/// hint: candidates below it can be dropped early, the engine still
/// applies its own per-class adjusted threshold on top.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &[u8], confidence_floor: f64) -> Result<Vec<RawDetection>>;
}
