use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AnimalClass, Detection};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "Active",
            SessionStatus::Completed => "Completed",
            SessionStatus::Abandoned => "Abandoned",
        }
    }
}

/// Per-actor tally. Lives per round, then rolls into the session's
/// cumulative totals additively when the round is finalized.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerScore {
    pub total_points: i32,
    pub correct_hits: u32,
    pub wrong_hits: u32,
    pub human_hits: u32,
    pub reaction_time_avg: f64,
}

impl PlayerScore {
    /// Folds one scored hit in, keeping the reaction-time running mean.
    pub fn record(&mut self, points: i32, class: AnimalClass, reaction_secs: f64) {
        if class.is_target() {
            self.correct_hits += 1;
        } else {
            self.wrong_hits += 1;
            if class == AnimalClass::Human {
                self.human_hits += 1;
            }
        }
        self.total_points += points;
        let shots = self.shots() as f64;
        self.reaction_time_avg += (reaction_secs - self.reaction_time_avg) / shots;
    }

    pub fn shots(&self) -> u32 {
        self.correct_hits + self.wrong_hits
    }

    pub fn accuracy_pct(&self) -> f64 {
        let shots = self.shots();
        if shots == 0 {
            0.0
        } else {
            self.correct_hits as f64 / shots as f64 * 100.0
        }
    }

    /// Rolls another tally into this one.
    pub fn absorb(&mut self, other: &PlayerScore) {
        let combined_shots = self.shots() + other.shots();
        if combined_shots > 0 {
            self.reaction_time_avg = (self.reaction_time_avg * self.shots() as f64
                + other.reaction_time_avg * other.shots() as f64)
                / combined_shots as f64;
        }
        self.total_points += other.total_points;
        self.correct_hits += other.correct_hits;
        self.wrong_hits += other.wrong_hits;
        self.human_hits += other.human_hits;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRound {
    pub round_number: u32,
    pub image_id: String,
    pub time_limit_secs: u64,
    pub started_at: DateTime<Utc>,
    pub player_score: PlayerScore,
    pub opponent_score: PlayerScore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub session_id: String,
    pub player_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub rounds_completed: u32,
    pub total_rounds: u32,
    /// Cumulative player tally across finalized rounds.
    pub player_total: PlayerScore,
    /// Cumulative opponent tally across finalized rounds.
    pub opponent_total: PlayerScore,
    pub current_round: Option<GameRound>,
    pub status: SessionStatus,
}

/// One player (or opponent) click, normalized coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub x: f64,
    pub y: f64,
    pub timestamp: DateTime<Utc>,
    pub image_id: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickResult {
    pub hit: bool,
    pub target_class: Option<AnimalClass>,
    pub points_earned: i32,
    pub is_penalty: bool,
    pub message: String,
}

/// Everything a caller needs to render a freshly started round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStart {
    pub round: GameRound,
    pub detections: Vec<Detection>,
    pub difficulty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Winner {
    Player,
    Opponent,
    Tie,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub session_id: String,
    pub winner: Winner,
    pub player_final_score: i32,
    pub opponent_final_score: i32,
    pub player_accuracy: f64,
    pub opponent_accuracy: f64,
    pub total_targets_found: u32,
    pub player_stats: PlayerScore,
    pub opponent_stats: PlayerScore,
}
