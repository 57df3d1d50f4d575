//! Error types for the engine core
//!
//! Boundary errors (move text, legality, difficulty) are rejected before any state changes.
//! `SearchInvariantViolation` marks an internal defect and fails only the current search call.
//! Persistence failures are wrapped so callers can downgrade them to warnings.

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur in the engine core
#[derive(Error, Debug)]
pub enum EngineError {
    /// Move text could not be parsed as UCI notation
    #[error("Malformed move notation: {text:?}")]
    MalformedMoveNotation { text: String },

    /// Well-formed move that is not legal in the current position
    #[error("Illegal move {uci} in position {fen}")]
    IllegalMoveAttempt { uci: String, fen: String },

    /// The search picked a move outside the root legal set
    #[error("Search returned illegal move {mv} in position {fen}")]
    SearchInvariantViolation { mv: String, fen: String },

    /// Difficulty level outside 1..=10
    #[error("Invalid difficulty level: {0} (must be 1-10)")]
    InvalidDifficulty(u8),

    /// FEN text could not be turned into a legal position
    #[error("Invalid position {fen:?}: {reason}")]
    InvalidPosition { fen: String, reason: String },

    /// A move was requested after the game finished
    #[error("Game is already over")]
    GameOver,

    /// The external store failed
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(#[from] StoreError),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
