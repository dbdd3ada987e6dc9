use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{info, warn};
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::detect::check_hit;
use crate::error::GameError;
use crate::models::{
    ClickEvent, ClickResult, Detection, GameResult, GameRound, GameSession, ImageAnalysis,
    PlayerScore, SessionStatus, Winner,
};

use super::opponent::{plan_turn, OpponentState, DELAY_CAP_SECS};
use super::scoring::score_detection;

struct SessionEntry {
    session: GameSession,
    opponent: OpponentState,
    last_activity: DateTime<Utc>,
}

/// Session and round lifecycle for every concurrent player.
///
/// Shared maps sit behind async mutexes and locks are held only for short
/// synchronous sections, never across detector calls or opponent delays.
/// Cumulative per-actor totals are updated exactly once, when a round (or
/// a still-open round at game end) is folded in.
#[derive(Clone)]
pub struct GameService {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    detection_cache: Arc<Mutex<HashMap<String, Vec<Detection>>>>,
    config: GameConfig,
}

impl GameService {
    pub fn new(config: GameConfig) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            detection_cache: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    pub async fn create_session(&self, player_name: Option<String>) -> GameSession {
        let now = Utc::now();
        let session = GameSession {
            session_id: Uuid::new_v4().to_string(),
            player_name,
            created_at: now,
            rounds_completed: 0,
            total_rounds: self.config.rounds_per_game,
            player_total: PlayerScore::default(),
            opponent_total: PlayerScore::default(),
            current_round: None,
            status: SessionStatus::Active,
        };

        let entry = SessionEntry {
            session: session.clone(),
            opponent: OpponentState::new(&self.config),
            last_activity: now,
        };
        self.sessions
            .lock()
            .await
            .insert(session.session_id.clone(), entry);

        info!("created session {}", session.session_id);
        session
    }

    pub async fn get_session(&self, session_id: &str) -> Result<GameSession, GameError> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))
    }

    /// Cheap pre-flight so callers can fail before paying for an analysis.
    /// `begin_round` re-checks under the same lock, so a racing caller
    /// still gets a clean `InvalidState`.
    pub async fn ensure_round_can_start(&self, session_id: &str) -> Result<(), GameError> {
        let sessions = self.sessions.lock().await;
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))?;
        if entry.session.current_round.is_some() {
            return Err(GameError::InvalidState("round already in progress"));
        }
        Ok(())
    }

    /// Starts the next round from an analyzed image and caches its
    /// detections for click resolution.
    pub async fn begin_round(
        &self,
        session_id: &str,
        analysis: &ImageAnalysis,
    ) -> Result<GameRound, GameError> {
        let round = {
            let mut sessions = self.sessions.lock().await;
            let entry = sessions
                .get_mut(session_id)
                .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))?;
            if entry.session.current_round.is_some() {
                return Err(GameError::InvalidState("round already in progress"));
            }

            let round = GameRound {
                round_number: entry.session.rounds_completed + 1,
                image_id: analysis.image_id.clone(),
                time_limit_secs: self.config.round_time_secs,
                started_at: Utc::now(),
                player_score: PlayerScore::default(),
                opponent_score: PlayerScore::default(),
            };
            entry.session.current_round = Some(round.clone());
            entry.last_activity = round.started_at;
            round
        };

        self.detection_cache
            .lock()
            .await
            .insert(analysis.image_id.clone(), analysis.detections.clone());

        info!(
            "round {} started for session {session_id} on image {}",
            round.round_number, round.image_id
        );
        Ok(round)
    }

    /// Resolves a player click. A miss is a normal result, not an error.
    pub async fn process_click(
        &self,
        session_id: &str,
        click: &ClickEvent,
    ) -> Result<ClickResult, GameError> {
        let detections = self
            .detection_cache
            .lock()
            .await
            .get(&click.image_id)
            .cloned()
            .unwrap_or_default();

        let mut sessions = self.sessions.lock().await;
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))?;
        let round = entry
            .session
            .current_round
            .as_mut()
            .ok_or(GameError::InvalidState("no active round"))?;
        entry.last_activity = Utc::now();

        let Some(detection) = check_hit(click.x, click.y, &detections, self.config.hit_tolerance)
        else {
            return Ok(ClickResult {
                hit: false,
                target_class: None,
                points_earned: 0,
                is_penalty: false,
                message: "Shot went wide, nothing hit".to_string(),
            });
        };

        let outcome = score_detection(detection, &self.config);
        let reaction_secs =
            (click.timestamp - round.started_at).num_milliseconds().max(0) as f64 / 1000.0;
        round
            .player_score
            .record(outcome.points, detection.class, reaction_secs);

        Ok(ClickResult {
            hit: true,
            target_class: Some(detection.class),
            points_earned: outcome.points,
            is_penalty: outcome.is_penalty,
            message: outcome.message,
        })
    }

    /// Re-resolves a click against the cached detections, for the learning
    /// loop. Returns the hit (if any) plus the full detection list.
    pub async fn click_context(&self, click: &ClickEvent) -> (Option<Detection>, Vec<Detection>) {
        let detections = self
            .detection_cache
            .lock()
            .await
            .get(&click.image_id)
            .cloned()
            .unwrap_or_default();
        let hit = check_hit(click.x, click.y, &detections, self.config.hit_tolerance).cloned();
        (hit, detections)
    }

    /// Runs the opponent's turn over an image's cached detections.
    ///
    /// Each planned click waits out a capped simulated hesitation before
    /// it resolves, re-taking the session lock per click so concurrent
    /// sessions are never held up. If the round ends mid-turn the
    /// remaining clicks are dropped.
    pub async fn opponent_turn(
        &self,
        session_id: &str,
        image_id: &str,
    ) -> Result<Vec<ClickResult>, GameError> {
        let detections = self
            .detection_cache
            .lock()
            .await
            .get(image_id)
            .cloned()
            .unwrap_or_default();

        let planned = {
            let mut sessions = self.sessions.lock().await;
            let entry = sessions
                .get_mut(session_id)
                .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))?;
            if entry.session.current_round.is_none() {
                return Err(GameError::InvalidState("no active round"));
            }
            entry.last_activity = Utc::now();
            plan_turn(&entry.opponent, &detections, &mut rand::thread_rng())
        };

        let mut results = Vec::with_capacity(planned.len());
        for click in planned {
            sleep(Duration::from_secs_f64(click.reaction_secs.min(DELAY_CAP_SECS))).await;

            let detection = &detections[click.detection_index];
            let outcome = score_detection(detection, &self.config);

            let mut sessions = self.sessions.lock().await;
            let Some(entry) = sessions.get_mut(session_id) else {
                warn!("session {session_id} retired mid opponent turn");
                break;
            };
            let Some(round) = entry.session.current_round.as_mut() else {
                break;
            };
            round
                .opponent_score
                .record(outcome.points, detection.class, click.reaction_secs);

            results.push(ClickResult {
                hit: true,
                target_class: Some(detection.class),
                points_earned: outcome.points,
                is_penalty: outcome.is_penalty,
                message: format!("Opponent: {}", outcome.message),
            });
        }

        Ok(results)
    }

    /// Finalizes the current round: rolls its tallies into the session
    /// cumulatives and purges the image's detection cache entry.
    pub async fn end_round(&self, session_id: &str) -> Result<GameRound, GameError> {
        let round = {
            let mut sessions = self.sessions.lock().await;
            let entry = sessions
                .get_mut(session_id)
                .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))?;
            let round = entry
                .session
                .current_round
                .take()
                .ok_or(GameError::InvalidState("no active round to end"))?;
            entry.session.rounds_completed += 1;
            entry.session.player_total.absorb(&round.player_score);
            entry.session.opponent_total.absorb(&round.opponent_score);
            entry.last_activity = Utc::now();
            round
        };

        self.detection_cache.lock().await.remove(&round.image_id);
        info!(
            "round {} ended for session {session_id} (player {:+}, opponent {:+})",
            round.round_number, round.player_score.total_points, round.opponent_score.total_points
        );
        Ok(round)
    }

    /// Ends the game, retiring the session and its opponent state
    /// entirely. A still-open round is folded into the totals first.
    pub async fn end_game(&self, session_id: &str) -> Result<GameResult, GameError> {
        let mut entry = self
            .sessions
            .lock()
            .await
            .remove(session_id)
            .ok_or_else(|| GameError::SessionNotFound(session_id.to_string()))?;

        if let Some(round) = entry.session.current_round.take() {
            entry.session.player_total.absorb(&round.player_score);
            entry.session.opponent_total.absorb(&round.opponent_score);
            self.detection_cache.lock().await.remove(&round.image_id);
        }
        entry.session.status = SessionStatus::Completed;

        let player = entry.session.player_total;
        let opponent = entry.session.opponent_total;
        let winner = match player.total_points.cmp(&opponent.total_points) {
            std::cmp::Ordering::Greater => Winner::Player,
            std::cmp::Ordering::Less => Winner::Opponent,
            std::cmp::Ordering::Equal => Winner::Tie,
        };

        info!(
            "session {session_id} finished: {:?} ({} vs {})",
            winner, player.total_points, opponent.total_points
        );

        Ok(GameResult {
            session_id: session_id.to_string(),
            winner,
            player_final_score: player.total_points,
            opponent_final_score: opponent.total_points,
            player_accuracy: player.accuracy_pct(),
            opponent_accuracy: opponent.accuracy_pct(),
            total_targets_found: player.correct_hits + opponent.correct_hits,
            player_stats: player,
            opponent_stats: opponent,
        })
    }

    /// Retires sessions idle past the configured timeout, purging any
    /// cached detections they still hold. Returns how many were reaped.
    pub async fn abandon_idle(&self, now: DateTime<Utc>) -> usize {
        let idle_cutoff = ChronoDuration::seconds(self.config.session_idle_timeout_secs as i64);
        let mut stale_images = Vec::new();
        let mut reaped = 0usize;

        {
            let mut sessions = self.sessions.lock().await;
            sessions.retain(|session_id, entry| {
                if now - entry.last_activity <= idle_cutoff {
                    return true;
                }
                entry.session.status = SessionStatus::Abandoned;
                if let Some(round) = &entry.session.current_round {
                    stale_images.push(round.image_id.clone());
                }
                info!("session {session_id} abandoned after inactivity");
                reaped += 1;
                false
            });
        }

        if !stale_images.is_empty() {
            let mut cache = self.detection_cache.lock().await;
            for image_id in &stale_images {
                cache.remove(image_id);
            }
        }
        reaped
    }

    pub async fn active_session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
