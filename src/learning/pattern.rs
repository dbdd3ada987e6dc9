use serde::{Deserialize, Serialize};

use crate::models::{ClickEvent, Detection};

/// Per-class running statistics extracted from player clicks.
///
/// Counts only grow within a session; the biases are exponential moving
/// averages living in the same normalized space as their inputs, so the
/// confidence mean stays in [0, 1] and positions stay on the unit square.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPattern {
    pub hit_count: u32,
    pub miss_count: u32,
    pub avg_confidence_when_hit: f64,
    pub position_bias_x: f64,
    pub position_bias_y: f64,
    pub size_preference_width: f64,
    pub size_preference_height: f64,
}

impl ClassPattern {
    /// Folds a confirmed target hit into the pattern.
    pub fn record_target_hit(
        &mut self,
        click: &ClickEvent,
        detection: &Detection,
        learning_rate: f64,
    ) {
        self.hit_count += 1;
        let n = self.hit_count as f64;
        self.avg_confidence_when_hit += (detection.confidence - self.avg_confidence_when_hit) / n;

        self.position_bias_x += learning_rate * (click.x - self.position_bias_x);
        self.position_bias_y += learning_rate * (click.y - self.position_bias_y);
        self.size_preference_width +=
            learning_rate * (detection.bbox.width - self.size_preference_width);
        self.size_preference_height +=
            learning_rate * (detection.bbox.height - self.size_preference_height);
    }

    /// A hit on a non-target only counts as a mistake for that class; no
    /// position or size learning happens.
    pub fn record_mistake(&mut self) {
        self.miss_count += 1;
    }

    pub fn observations(&self) -> u32 {
        self.hit_count + self.miss_count
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.observations();
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }

    pub fn error_rate(&self) -> f64 {
        let total = self.observations();
        if total == 0 {
            0.0
        } else {
            self.miss_count as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnimalClass, BoundingBox, TargetKind};
    use chrono::Utc;

    fn click(x: f64, y: f64) -> ClickEvent {
        ClickEvent {
            x,
            y,
            timestamp: Utc::now(),
            image_id: "img".to_string(),
            session_id: "session".to_string(),
        }
    }

    fn detection(confidence: f64, width: f64, height: f64) -> Detection {
        Detection::new(
            AnimalClass::Target(TargetKind::Boar),
            confidence,
            BoundingBox {
                x: 0.5,
                y: 0.5,
                width,
                height,
            },
            None,
        )
    }

    #[test]
    fn confidence_mean_is_a_true_running_average() {
        let mut pattern = ClassPattern::default();
        pattern.record_target_hit(&click(0.5, 0.5), &detection(0.6, 0.2, 0.2), 0.05);
        pattern.record_target_hit(&click(0.5, 0.5), &detection(0.9, 0.2, 0.2), 0.05);

        assert_eq!(pattern.hit_count, 2);
        assert!((pattern.avg_confidence_when_hit - 0.75).abs() < 1e-9);
    }

    #[test]
    fn position_bias_moves_one_learning_rate_step_per_hit() {
        let mut pattern = ClassPattern::default();
        pattern.record_target_hit(&click(1.0, 0.0), &detection(0.8, 0.4, 0.3), 0.1);

        assert!((pattern.position_bias_x - 0.1).abs() < 1e-9);
        assert_eq!(pattern.position_bias_y, 0.0);
        assert!((pattern.size_preference_width - 0.04).abs() < 1e-9);
        assert!((pattern.size_preference_height - 0.03).abs() < 1e-9);
    }

    #[test]
    fn mistakes_only_bump_the_miss_count() {
        let mut pattern = ClassPattern::default();
        pattern.record_mistake();
        pattern.record_mistake();

        assert_eq!(pattern.miss_count, 2);
        assert_eq!(pattern.hit_count, 0);
        assert_eq!(pattern.avg_confidence_when_hit, 0.0);
        assert_eq!(pattern.success_rate(), 0.0);
        assert_eq!(pattern.error_rate(), 1.0);
    }

    #[test]
    fn rates_default_to_zero_without_observations() {
        let pattern = ClassPattern::default();
        assert_eq!(pattern.success_rate(), 0.0);
        assert_eq!(pattern.error_rate(), 0.0);
    }
}
