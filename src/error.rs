//! Error types raised while loading a level or wiring a round together.

use thiserror::Error;

/// Malformed character-grid level source.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("unrecognized map character {ch:?} at row {row}, column {col}")]
    UnrecognizedCharacter { row: usize, col: usize, ch: char },

    #[error("level has {found} rows, expected {expected}")]
    RowCount { found: usize, expected: usize },

    #[error("row {row} has {found} columns, expected {expected}")]
    RowWidth {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// Geometry requests that indicate a programming error in the caller.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("tile ({row}, {col}) is outside the {height}x{width} grid")]
    OutOfBounds {
        row: i64,
        col: i64,
        height: usize,
        width: usize,
    },

    #[error("direction vector does not resolve to a compass direction")]
    UnresolvedDirection,
}

/// Failures that abort starting a round.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("level error: {0}")]
    Level(#[from] LevelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing collaborator: {0}")]
    MissingCollaborator(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
