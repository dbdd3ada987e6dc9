use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};
use serde::Serialize;

use crate::detect::ConfidenceStore;
use crate::models::{AnimalClass, ClickEvent, ClickResult, Detection, GameSession};

use super::pattern::ClassPattern;

/// Counters aggregated across every session since the last reset.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalMetrics {
    pub total_rounds: u32,
    pub player_correct: u32,
    pub player_wrong: u32,
    pub opponent_correct: u32,
    pub opponent_wrong: u32,
    pub avg_reaction_time: f64,
}

/// Snapshot returned by `summary()`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSummary {
    pub metrics: GlobalMetrics,
    pub class_patterns: HashMap<AnimalClass, ClassPattern>,
    pub confidence_adjustments: HashMap<AnimalClass, f64>,
    pub images_analyzed: usize,
}

/// One prioritized detection from `recommend()`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub detection: Detection,
    pub priority: f64,
    pub should_click: bool,
}

#[derive(Default)]
struct LearningState {
    patterns: HashMap<AnimalClass, ClassPattern>,
    images_seen: HashSet<String>,
    metrics: GlobalMetrics,
    reaction_samples: u32,
}

/// The adaptive loop: consumes click events, maintains per-class patterns,
/// and pushes a bounded confidence correction into the shared store at
/// every round boundary.
///
/// Every update here is best-effort. Nothing in this service can fail a
/// click response; even a poisoned lock is recovered and logged.
#[derive(Clone)]
pub struct LearningService {
    state: Arc<Mutex<LearningState>>,
    confidence: ConfidenceStore,
    learning_rate: f64,
}

impl LearningService {
    pub fn new(confidence: ConfidenceStore, learning_rate: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(LearningState::default())),
            confidence,
            learning_rate,
        }
    }

    fn state(&self) -> MutexGuard<'_, LearningState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("learning state lock poisoned, continuing with last state");
            poisoned.into_inner()
        })
    }

    /// Records one player click. A miss teaches nothing; a hit updates the
    /// pattern for the hit detection's class.
    pub fn record_click(
        &self,
        session: &GameSession,
        click: &ClickEvent,
        hit: Option<&Detection>,
        detections: &[Detection],
    ) {
        let mut state = self.state();
        state.images_seen.insert(click.image_id.clone());

        let Some(detection) = hit else {
            debug!(
                "miss on image {} recorded ({} detections in frame)",
                click.image_id,
                detections.len()
            );
            return;
        };

        if detection.is_target {
            state.metrics.player_correct += 1;
        } else {
            state.metrics.player_wrong += 1;
        }

        if let Some(round) = &session.current_round {
            let reaction_secs =
                (click.timestamp - round.started_at).num_milliseconds().max(0) as f64 / 1000.0;
            state.reaction_samples += 1;
            let n = state.reaction_samples as f64;
            state.metrics.avg_reaction_time +=
                (reaction_secs - state.metrics.avg_reaction_time) / n;
        }

        let learning_rate = self.learning_rate;
        let pattern = state.patterns.entry(detection.class).or_default();
        if detection.is_target {
            pattern.record_target_hit(click, detection, learning_rate);
        } else {
            pattern.record_mistake();
        }
    }

    /// Tallies the opponent's simulated clicks into the global metrics.
    pub fn record_opponent_results(&self, results: &[ClickResult]) {
        let mut state = self.state();
        for result in results.iter().filter(|r| r.hit) {
            match result.target_class {
                Some(class) if class.is_target() => state.metrics.opponent_correct += 1,
                Some(_) => state.metrics.opponent_wrong += 1,
                None => {}
            }
        }
    }

    /// Round boundary: compares the two actors and pushes a per-class
    /// correction into the confidence store.
    ///
    /// Classes the opponent already reads reliably absorb more of the
    /// correction (their error rate discounts less); the store bounds the
    /// accumulated total.
    pub fn on_round_end(&self, player_accuracy_pct: f64, opponent_accuracy_pct: f64) {
        let diff = player_accuracy_pct - opponent_accuracy_pct;
        let base_adjustment = self.learning_rate * diff / 100.0;

        let mut state = self.state();
        state.metrics.total_rounds += 1;
        for (class, pattern) in &state.patterns {
            if pattern.observations() == 0 {
                continue;
            }
            let class_delta = base_adjustment * (1.0 - pattern.error_rate());
            self.confidence.add(*class, class_delta);
        }
    }

    /// Priority-orders an image's detections for the opponent.
    ///
    /// Priority starts at the detection confidence, gets a 1.5x target
    /// boost, is scaled by the observed success rate of the class, and is
    /// finally crushed to 10% for humans. Humans are never click-worthy.
    pub fn recommend(&self, detections: &[Detection]) -> Vec<Recommendation> {
        let state = self.state();
        let mut recommendations: Vec<Recommendation> = detections
            .iter()
            .map(|detection| {
                let mut priority = detection.confidence;
                if detection.is_target {
                    priority *= 1.5;
                }
                if let Some(pattern) = state.patterns.get(&detection.class) {
                    if pattern.observations() > 0 {
                        priority *= 0.5 + 0.5 * pattern.success_rate();
                    }
                }
                if detection.class == AnimalClass::Human {
                    priority *= 0.1;
                }
                Recommendation {
                    should_click: priority > 0.5 && detection.class != AnimalClass::Human,
                    priority,
                    detection: detection.clone(),
                }
            })
            .collect();

        // Stable sort keeps input order among equal priorities.
        recommendations.sort_by(|a, b| {
            b.priority
                .partial_cmp(&a.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        recommendations
    }

    /// Difficulty estimate for an image in [0, 1]; 0.5 when there is
    /// nothing to judge.
    ///
    /// Weighted sum of: object count (more is harder), target scarcity,
    /// human presence (riskier) and model uncertainty.
    pub fn difficulty(&self, detections: &[Detection]) -> f64 {
        if detections.is_empty() {
            return 0.5;
        }

        let count = detections.len() as f64;
        let targets = detections.iter().filter(|d| d.is_target).count() as f64;
        let humans = detections
            .iter()
            .filter(|d| d.class == AnimalClass::Human)
            .count() as f64;
        let avg_confidence = detections.iter().map(|d| d.confidence).sum::<f64>() / count;

        let detection_factor = (count / 10.0).min(1.0);
        let target_factor = 1.0 - targets / count;
        let human_factor = (humans * 0.3).min(1.0);
        let confidence_factor = 1.0 - avg_confidence;

        (0.25 * detection_factor
            + 0.30 * target_factor
            + 0.25 * human_factor
            + 0.20 * confidence_factor)
            .clamp(0.0, 1.0)
    }

    pub fn summary(&self) -> LearningSummary {
        let state = self.state();
        LearningSummary {
            metrics: state.metrics,
            class_patterns: state.patterns.clone(),
            confidence_adjustments: self.confidence.snapshot(),
            images_analyzed: state.images_seen.len(),
        }
    }

    /// Clears every learned pattern, metric and confidence adjustment.
    pub fn reset(&self) {
        let mut state = self.state();
        *state = LearningState::default();
        self.confidence.clear();
    }
}
