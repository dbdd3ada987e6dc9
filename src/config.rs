use std::collections::HashMap;

use crate::error::GameError;
use crate::models::{AnimalClass, DistractorKind, TargetKind};

/// Tunable game parameters.
///
/// Defaults mirror the shipped game balance; everything here is injectable
/// so tests can vary the incentive structure without touching the policy
/// code.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Seconds the player gets per round.
    pub round_time_secs: u64,
    /// Rounds in a full game.
    pub rounds_per_game: u32,
    /// Base points for a confirmed target hit.
    pub target_points: i32,
    /// Penalty for hitting a non-target animal (negative).
    pub wrong_animal_penalty: i32,
    /// Penalty for hitting a human (negative, severe).
    pub human_penalty: i32,
    /// Multiplier reserved for fast-reaction bonuses.
    pub speed_bonus_multiplier: f64,
    /// Confidence-to-bonus scale for target hits: bonus = floor(conf * scale).
    pub confidence_bonus_scale: f64,
    /// Opponent's starting click confidence.
    pub opponent_base_confidence: f64,
    /// Opponent's base simulated reaction time in seconds.
    pub opponent_reaction_secs: f64,
    /// Learning rate for pattern EMAs and round-end confidence corrections.
    pub learning_rate: f64,
    /// Minimum adjusted confidence for a detection to enter a round.
    pub confidence_threshold: f64,
    /// Margin added around detection boxes when resolving clicks.
    pub hit_tolerance: f64,
    /// Idle time before the reaper abandons a session, in seconds.
    pub session_idle_timeout_secs: u64,
    /// Raw model class id -> semantic class.
    pub class_map: HashMap<u32, AnimalClass>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_time_secs: 5,
            rounds_per_game: 10,
            target_points: 100,
            wrong_animal_penalty: -30,
            human_penalty: -200,
            speed_bonus_multiplier: 1.5,
            confidence_bonus_scale: 50.0,
            opponent_base_confidence: 0.7,
            opponent_reaction_secs: 1.5,
            learning_rate: 0.05,
            confidence_threshold: 0.5,
            hit_tolerance: 0.05,
            session_idle_timeout_secs: 300,
            class_map: default_class_map(),
        }
    }
}

impl GameConfig {
    /// Default config with a few knobs overridable from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(value) = env_f64("BOARHUNT_LEARNING_RATE") {
            config.learning_rate = value;
        }
        if let Some(value) = env_f64("BOARHUNT_CONFIDENCE_THRESHOLD") {
            config.confidence_threshold = value;
        }
        if let Some(value) = env_f64("BOARHUNT_OPPONENT_CONFIDENCE") {
            config.opponent_base_confidence = value;
        }
        config
    }

    /// Resolves a raw model class id through the configured table.
    /// Unmapped ids are an error, never a silent default class.
    pub fn resolve_class(&self, class_id: u32) -> Result<AnimalClass, GameError> {
        self.class_map
            .get(&class_id)
            .copied()
            .ok_or(GameError::UnknownClass(class_id))
    }
}

/// Class table of the shipped detection model.
fn default_class_map() -> HashMap<u32, AnimalClass> {
    HashMap::from([
        (0, AnimalClass::Target(TargetKind::Boar)),
        (1, AnimalClass::Target(TargetKind::WildBoar)),
        (2, AnimalClass::Distractor(DistractorKind::Dog)),
        (3, AnimalClass::Distractor(DistractorKind::Monkey)),
        (4, AnimalClass::Human),
    ])
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}
