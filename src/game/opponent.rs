use rand::Rng;

use crate::config::GameConfig;
use crate::models::{AnimalClass, Detection};

/// Upper bound on one simulated hesitation so an opponent turn can never
/// stall a session, whatever reaction time is configured.
pub const DELAY_CAP_SECS: f64 = 0.1;

/// Per-session state of the simulated opponent.
#[derive(Debug, Clone)]
pub struct OpponentState {
    pub confidence: f64,
    pub reaction_secs: f64,
}

impl OpponentState {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            confidence: config.opponent_base_confidence,
            reaction_secs: config.opponent_reaction_secs,
        }
    }
}

/// One planned opponent action: which detection gets clicked and after how
/// long a simulated hesitation. The recorded reaction is the sampled one;
/// only the actual sleep is capped.
#[derive(Debug, Clone)]
pub struct PlannedClick {
    pub detection_index: usize,
    pub reaction_secs: f64,
}

/// Decides which detections the opponent clicks this turn.
///
/// The base draw follows the current confidence; true targets pick up an
/// extra 30% draw, humans are gated down to 10%, and remaining distractors
/// take a 20% mistake draw.
pub fn plan_turn<R: Rng>(
    state: &OpponentState,
    detections: &[Detection],
    rng: &mut R,
) -> Vec<PlannedClick> {
    let mut planned = Vec::new();
    for (index, detection) in detections.iter().enumerate() {
        let mut clicks = rng.gen_bool(state.confidence.clamp(0.0, 1.0));
        if detection.is_target {
            clicks = clicks || rng.gen_bool(0.3);
        } else if detection.class == AnimalClass::Human {
            clicks = clicks && rng.gen_bool(0.1);
        } else {
            clicks = clicks || rng.gen_bool(0.2);
        }

        if clicks {
            planned.push(PlannedClick {
                detection_index: index,
                reaction_secs: state.reaction_secs * rng.gen_range(0.8..=1.2),
            });
        }
    }
    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, DistractorKind, TargetKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn detection(class: AnimalClass) -> Detection {
        Detection::new(
            class,
            0.8,
            BoundingBox {
                x: 0.5,
                y: 0.5,
                width: 0.2,
                height: 0.2,
            },
            None,
        )
    }

    fn state(confidence: f64) -> OpponentState {
        OpponentState {
            confidence,
            reaction_secs: 1.5,
        }
    }

    #[test]
    fn full_confidence_clicks_every_non_human() {
        let detections = vec![
            detection(AnimalClass::Target(TargetKind::Boar)),
            detection(AnimalClass::Distractor(DistractorKind::Dog)),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let planned = plan_turn(&state(1.0), &detections, &mut rng);
            assert_eq!(planned.len(), 2);
        }
    }

    #[test]
    fn zero_confidence_never_clicks_humans() {
        let detections = vec![detection(AnimalClass::Human)];
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            assert!(plan_turn(&state(0.0), &detections, &mut rng).is_empty());
        }
    }

    #[test]
    fn human_clicks_are_heavily_suppressed_even_at_full_confidence() {
        let detections = vec![detection(AnimalClass::Human)];
        let mut rng = StdRng::seed_from_u64(13);
        let clicked = (0..1000)
            .filter(|_| !plan_turn(&state(1.0), &detections, &mut rng).is_empty())
            .count();
        // The gate allows roughly 10%; anything near the base rate is a bug.
        assert!(clicked < 200, "human clicked {clicked}/1000 times");
    }

    #[test]
    fn zero_confidence_still_makes_occasional_mistakes() {
        let detections = vec![detection(AnimalClass::Distractor(DistractorKind::Monkey))];
        let mut rng = StdRng::seed_from_u64(17);
        let clicked = (0..1000)
            .filter(|_| !plan_turn(&state(0.0), &detections, &mut rng).is_empty())
            .count();
        assert!(clicked > 100 && clicked < 350, "mistake rate {clicked}/1000");
    }

    #[test]
    fn sampled_reaction_stays_within_twenty_percent_of_base() {
        let detections = vec![detection(AnimalClass::Target(TargetKind::Boar))];
        let mut rng = StdRng::seed_from_u64(19);
        for _ in 0..100 {
            for click in plan_turn(&state(1.0), &detections, &mut rng) {
                assert!(click.reaction_secs >= 1.5 * 0.8);
                assert!(click.reaction_secs <= 1.5 * 1.2);
            }
        }
    }
}
