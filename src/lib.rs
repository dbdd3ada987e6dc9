pub mod config;
pub mod detect;
pub mod error;
pub mod game;
pub mod learning;
pub mod models;

use std::sync::Arc;

use log::warn;

pub use config::GameConfig;
pub use detect::{check_hit, ConfidenceStore, Detector, ImageAnalyzer, ADJUSTMENT_LIMIT};
pub use error::GameError;
pub use game::{score_detection, GameService, ScoreOutcome, SessionReaper};
pub use learning::{ClassPattern, LearningService, LearningSummary, Recommendation};
pub use models::{
    AnimalClass, BoundingBox, ClickEvent, ClickResult, ContourPoint, Detection, DistractorKind,
    GameResult, GameRound, GameSession, ImageAnalysis, PlayerScore, RawDetection, RoundStart,
    SessionStatus, TargetKind, Winner,
};

/// One process-wide bundle of the engine's services.
///
/// Constructed once at startup around an injected [`Detector`] and handed
/// by reference into whatever transport sits on top. The confidence store
/// is shared between the analyzer (reads on every pass) and the learning
/// loop (writes at round boundaries).
pub struct GameServices {
    pub config: GameConfig,
    pub analyzer: ImageAnalyzer,
    pub game: GameService,
    pub learning: LearningService,
}

impl GameServices {
    pub fn new(detector: Arc<dyn Detector>, config: GameConfig) -> Self {
        let confidence = ConfidenceStore::new();
        let analyzer = ImageAnalyzer::new(detector, confidence.clone(), config.clone());
        let game = GameService::new(config.clone());
        let learning = LearningService::new(confidence, config.learning_rate);
        Self {
            config,
            analyzer,
            game,
            learning,
        }
    }

    pub async fn create_session(&self, player_name: Option<String>) -> GameSession {
        self.game.create_session(player_name).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<GameSession, GameError> {
        self.game.get_session(session_id).await
    }

    /// Analyzes the image off the request path, then starts the round over
    /// its detections.
    pub async fn start_round(
        &self,
        session_id: &str,
        image_bytes: Vec<u8>,
    ) -> Result<RoundStart, GameError> {
        self.game.ensure_round_can_start(session_id).await?;
        let analysis = self.analyzer.analyze(image_bytes).await?;
        let difficulty = self.learning.difficulty(&analysis.detections);
        let round = self.game.begin_round(session_id, &analysis).await?;
        Ok(RoundStart {
            round,
            detections: analysis.detections,
            difficulty,
        })
    }

    /// Scores the click, then feeds the learning loop. Learning is
    /// best-effort: its bookkeeping can never fail the click response.
    pub async fn submit_click(
        &self,
        session_id: &str,
        click: ClickEvent,
    ) -> Result<ClickResult, GameError> {
        let result = self.game.process_click(session_id, &click).await?;

        match self.game.get_session(session_id).await {
            Ok(session) => {
                let (hit, detections) = self.game.click_context(&click).await;
                self.learning
                    .record_click(&session, &click, hit.as_ref(), &detections);
            }
            Err(err) => warn!("skipping learning update: {err}"),
        }

        Ok(result)
    }

    pub async fn run_opponent_turn(
        &self,
        session_id: &str,
        image_id: &str,
    ) -> Result<Vec<ClickResult>, GameError> {
        let results = self.game.opponent_turn(session_id, image_id).await?;
        self.learning.record_opponent_results(&results);
        Ok(results)
    }

    /// Finalizes the round and runs the comparative learning update from
    /// its per-actor accuracies.
    pub async fn end_round(&self, session_id: &str) -> Result<GameRound, GameError> {
        let round = self.game.end_round(session_id).await?;
        self.learning.on_round_end(
            round.player_score.accuracy_pct(),
            round.opponent_score.accuracy_pct(),
        );
        Ok(round)
    }

    pub async fn end_game(&self, session_id: &str) -> Result<GameResult, GameError> {
        self.game.end_game(session_id).await
    }

    pub fn learning_summary(&self) -> LearningSummary {
        self.learning.summary()
    }

    pub fn reset_learning(&self) {
        self.learning.reset()
    }
}

/// Initializes env_logger the way the shipped binaries do; safe to call
/// more than once (later calls are ignored).
pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
