use thiserror::Error;

use super::player::UserId;

/// Errors raised by board construction, snapshot decoding and session stores.
///
/// Ordinary rule violations (wrong turn, not enough cash, ...) are never errors;
/// they are reported to players through the message sink.
#[derive(Debug, Error)]
pub enum GameError {
    /// A document referenced a player id that is not part of the session.
    #[error("unknown player id: {0}")]
    UnknownPlayer(UserId),

    /// A document referenced a square name that is not on the board.
    #[error("unknown square: {0}")]
    UnknownSquare(String),

    /// Board layout rejected at construction time.
    #[error("invalid board: {0}")]
    InvalidBoard(String),

    /// Structural problem in a stored session document.
    #[error("invalid session document: {0}")]
    InvalidDocument(String),

    /// Owner references and player property lists disagree.
    #[error("inconsistent ownership for {square}: {detail}")]
    InconsistentOwnership { square: String, detail: String },

    /// Wrapper around IO errors (directory creation, file access).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around serde_json encoding and decoding errors.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
