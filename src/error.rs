use thiserror::Error;

/// Errors surfaced by the engine's public operations.
///
/// State machine violations are recovered into typed errors, never panics.
/// A click that hits nothing is a normal `ClickResult`, not an error, and a
/// detector failure is distinguishable from an empty detection list.
#[derive(Error, Debug)]
pub enum GameError {
    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("unmapped detector class id {0}")]
    UnknownClass(u32),

    #[error("detector failure: {0}")]
    Detector(#[from] anyhow::Error),
}
