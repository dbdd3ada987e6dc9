mod pattern;
mod service;

pub use pattern::ClassPattern;
pub use service::{GlobalMetrics, LearningService, LearningSummary, Recommendation};
