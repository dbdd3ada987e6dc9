mod opponent;
mod reaper;
mod scoring;
mod service;

pub use opponent::{plan_turn, OpponentState, PlannedClick, DELAY_CAP_SECS};
pub use reaper::SessionReaper;
pub use scoring::{score_detection, ScoreOutcome};
pub use service::GameService;
