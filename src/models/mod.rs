mod detection;
mod game;

pub use detection::{
    AnimalClass, BoundingBox, ContourPoint, Detection, DistractorKind, ImageAnalysis,
    RawDetection, TargetKind,
};
pub use game::{
    ClickEvent, ClickResult, GameResult, GameRound, GameSession, PlayerScore, RoundStart,
    SessionStatus, Winner,
};
