use thiserror::Error;

use crate::board::SlotId;

/// An unrecognized character in expression text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unexpected character '{found}' at position {offset}")]
pub struct LexError {
    pub found: char,
    /// Character offset of `found` in the input.
    pub offset: usize,
}

/// Malformed grammar in expression text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at position {offset}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Everything that can go wrong turning slot text into an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl ExpressionError {
    /// Human-readable message without the position suffix.
    pub fn message(&self) -> String {
        match self {
            ExpressionError::Lex(e) => format!("unexpected character '{}'", e.found),
            ExpressionError::Parse(e) => e.message.clone(),
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            ExpressionError::Lex(e) => e.offset,
            ExpressionError::Parse(e) => e.offset,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid x-range [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },
    #[error("sample count {count} outside 2..={max}")]
    SampleCount { count: usize, max: usize },
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("a board needs at least one function slot")]
    NoSlots,
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot read settings: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to save or load a game document.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("cannot access '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed game document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid game document: {0}")]
    Invalid(String),
    #[error("no game stored under '{0}'")]
    NotFound(String),
}

/// A worker batch that no longer matches the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("generation {got} is stale, board is at {current}")]
    StaleGeneration { got: u64, current: u64 },
    #[error("text of slot {slot} changed while it was being sampled")]
    SlotChanged { slot: SlotId },
    #[error(transparent)]
    Board(#[from] BoardError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("there is no function slot {0}")]
    UnknownSlot(SlotId),
    #[error("{given} functions do not fit into {slots} slots")]
    TooManyFunctions { given: usize, slots: usize },
}

#[derive(Debug, Error)]
pub enum DotGenerationError {
    #[error("cannot place {requested} dots on a grid of {available} cells")]
    TooManyDots { requested: usize, available: usize },
}
