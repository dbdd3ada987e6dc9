use crate::config::GameConfig;
use crate::models::{AnimalClass, Detection, DistractorKind};

/// Outcome of resolving one scored hit.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub points: i32,
    pub is_penalty: bool,
    pub message: String,
}

/// Maps a hit detection to a point delta. Deterministic given its inputs.
///
/// Priority order: target bonus, human penalty, domestic-pig half penalty,
/// generic wrong-animal penalty.
pub fn score_detection(detection: &Detection, config: &GameConfig) -> ScoreOutcome {
    if detection.is_target {
        let bonus = (detection.confidence * config.confidence_bonus_scale).floor() as i32;
        let points = config.target_points + bonus;
        return ScoreOutcome {
            points,
            is_penalty: false,
            message: format!("Wild boar down! +{points} points"),
        };
    }

    match detection.class {
        AnimalClass::Human => ScoreOutcome {
            points: config.human_penalty,
            is_penalty: true,
            message: "Human hit! Severe penalty applied".to_string(),
        },
        AnimalClass::Distractor(DistractorKind::Pig) => ScoreOutcome {
            points: config.wrong_animal_penalty / 2,
            is_penalty: true,
            message: "Domestic pig! Light penalty".to_string(),
        },
        class => ScoreOutcome {
            points: config.wrong_animal_penalty,
            is_penalty: true,
            message: format!("Wrong animal ({class}), penalty applied"),
        },
    }
}
