mod analyzer;
mod confidence;
mod detector;

pub use analyzer::ImageAnalyzer;
pub use confidence::{ConfidenceStore, ADJUSTMENT_LIMIT};
pub use detector::Detector;
pub use hit_test::check_hit;
