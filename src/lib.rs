//! Engine of the PollyNom puzzle: the player types functions of `x`, their
//! graphs are plotted, and every dot a graph passes through is hit. Good dots
//! add to the score, bad dots subtract from it.
//!
//! The pieces, from text to score:
//! - [`expression`] tokenizes, parses and evaluates slot text,
//! - [`sampler`] turns an expression into continuous [`Segment`]s,
//! - [`board`] and [`scoring`] hold the dots and slots and mark hits,
//! - [`coordinator`] runs recomputes in the background and publishes them,
//! - [`persistence`] reads and writes `*.qpn` games.

pub mod board;
pub mod config;
pub mod coordinator;
pub mod dots;
pub mod error;
pub mod expression;
pub mod geometry;
pub mod persistence;
pub mod sampler;
pub mod scoring;

pub use board::{Board, Dot, DotKind, FunctionSlot, SlotError, SlotId, SlotResult, SlotState};
pub use config::{LoadPolicy, PlotSettings};
pub use coordinator::{CancelHandle, Coordinator, PlotState, PlotSurface, PlotUpdate, SlotGraph};
pub use dots::{DotGenerator, FixedDotGenerator, RandomDotGenerator};
pub use error::{
    BoardError, CommitError, DotGenerationError, ExpressionError, LexError, ParseError, PersistenceError,
    SettingsError,
};
pub use expression::{parse, Expr, Outcome, Undefined};
pub use persistence::{DiskRepository, GameDocument, MemoryRepository, Repository};
pub use sampler::{sample_expression, Segment};
