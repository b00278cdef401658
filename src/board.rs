//! Ground truth of a running game: the fixed dots, the player's function
//! slots, the score and the recompute generation.
//!
//! Only the owner of a [`Board`] mutates it. Background sampling hands its
//! results to [`Board::commit`], which rejects anything computed for an
//! older generation or an outdated slot text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_DOT_RADIUS;
use crate::error::{BoardError, CommitError, ExpressionError};
use crate::expression::{parse, Expr};
use crate::sampler::Segment;
use crate::scoring;

// =============================================================================
// DOTS
// =============================================================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DotKind {
    Good,
    Bad,
}

/// A marked point of the puzzle. Position, kind, radius and weight never
/// change while a game is loaded; the hit flag only goes from false to true.
#[derive(Debug, Clone, PartialEq)]
pub struct Dot {
    x: f64,
    y: f64,
    kind: DotKind,
    radius: f64,
    weight: u32,
    hit: bool,
}

impl Dot {
    pub fn new(x: f64, y: f64, kind: DotKind) -> Self {
        Self {
            x,
            y,
            kind,
            radius: DEFAULT_DOT_RADIUS,
            weight: 1,
            hit: false,
        }
    }

    pub fn good(x: f64, y: f64) -> Self {
        Self::new(x, y, DotKind::Good)
    }

    pub fn bad(x: f64, y: f64) -> Self {
        Self::new(x, y, DotKind::Bad)
    }

    /// Hit tolerance: a curve passing within this distance hits the dot.
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub(crate) fn with_hit(mut self, hit: bool) -> Self {
        self.hit = hit;
        self
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn kind(&self) -> DotKind {
        self.kind
    }

    pub fn is_good(&self) -> bool {
        self.kind == DotKind::Good
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn is_hit(&self) -> bool {
        self.hit
    }

    pub(crate) fn mark_hit(&mut self) {
        self.hit = true;
    }

    fn reset(&mut self) {
        self.hit = false;
    }
}

// =============================================================================
// FUNCTION SLOTS
// =============================================================================

/// 1-based slot number, as shown next to the input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(pub usize);

impl SlotId {
    /// Zero-based position, `None` for the invalid `SlotId(0)`.
    pub fn index(self) -> Option<usize> {
        self.0.checked_sub(1)
    }

    pub fn from_index(index: usize) -> Self {
        SlotId(index + 1)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    Empty,
    Valid(Expr),
    Error(ExpressionError),
}

impl SlotState {
    fn parse(text: &str) -> Self {
        if text.trim().is_empty() {
            return SlotState::Empty;
        }
        match parse(text) {
            Ok(expr) => SlotState::Valid(expr),
            Err(err) => SlotState::Error(err),
        }
    }
}

/// A parse failure in one slot, ready for inline display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotError {
    pub slot: SlotId,
    pub message: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSlot {
    id: SlotId,
    text: String,
    state: SlotState,
    /// Bumped on every text change; lets a commit detect results sampled
    /// from text the player has since replaced.
    revision: u64,
    segments: Option<Vec<Segment>>,
}

impl FunctionSlot {
    fn new(id: SlotId) -> Self {
        Self {
            id,
            text: String::new(),
            state: SlotState::Empty,
            revision: 0,
            segments: None,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn expression(&self) -> Option<&Expr> {
        match &self.state {
            SlotState::Valid(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<SlotError> {
        match &self.state {
            SlotState::Error(err) => Some(SlotError {
                slot: self.id,
                message: err.message(),
                offset: err.offset(),
            }),
            _ => None,
        }
    }

    /// Segments of the last committed sampling, if still current.
    pub fn segments(&self) -> Option<&[Segment]> {
        self.segments.as_deref()
    }

    pub fn needs_sampling(&self) -> bool {
        self.expression().is_some() && self.segments.is_none()
    }

    fn set_text(&mut self, text: &str) {
        if self.text == text {
            return;
        }
        self.text = text.to_string();
        self.revision += 1;
        self.reparse();
    }

    fn reparse(&mut self) {
        let state = SlotState::parse(&self.text);
        if state != self.state {
            self.segments = None;
        }
        self.state = state;
        if !matches!(self.state, SlotState::Valid(_)) {
            self.segments = Some(Vec::new());
        }
    }
}

// =============================================================================
// BOARD
// =============================================================================

/// Segments sampled for one slot in one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotResult {
    pub slot: SlotId,
    pub revision: u64,
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    dots: Vec<Dot>,
    slots: Vec<FunctionSlot>,
    score: i64,
    generation: u64,
}

impl Board {
    pub fn new(dots: Vec<Dot>, slot_count: usize) -> Self {
        let mut board = Self {
            dots,
            slots: (0..slot_count)
                .map(|i| FunctionSlot::new(SlotId::from_index(i)))
                .collect(),
            score: 0,
            generation: 0,
        };
        board.score = scoring::score(&board.dots);
        board
    }

    pub fn dots(&self) -> &[Dot] {
        &self.dots
    }

    pub fn slots(&self) -> &[FunctionSlot] {
        &self.slots
    }

    pub fn slot(&self, id: SlotId) -> Option<&FunctionSlot> {
        id.index().and_then(|i| self.slots.get(i))
    }

    fn slot_mut(&mut self, id: SlotId) -> Result<&mut FunctionSlot, BoardError> {
        id.index()
            .and_then(|i| self.slots.get_mut(i))
            .ok_or(BoardError::UnknownSlot(id))
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn texts(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.text.clone()).collect()
    }

    /// Replaces the text of one slot and reparses it immediately.
    pub fn set_slot_text(&mut self, id: SlotId, text: &str) -> Result<&SlotState, BoardError> {
        let slot = self.slot_mut(id)?;
        slot.set_text(text);
        Ok(&slot.state)
    }

    /// Fills the slots in order; slots beyond `texts` become empty.
    pub fn set_texts<S: AsRef<str>>(&mut self, texts: &[S]) -> Result<(), BoardError> {
        if texts.len() > self.slots.len() {
            return Err(BoardError::TooManyFunctions {
                given: texts.len(),
                slots: self.slots.len(),
            });
        }
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.set_text(texts.get(i).map_or("", |t| t.as_ref()));
        }
        Ok(())
    }

    pub fn errors(&self) -> Vec<SlotError> {
        self.slots.iter().filter_map(FunctionSlot::error).collect()
    }

    /// Starts a recompute: reparses every slot and advances the generation.
    pub fn begin_generation(&mut self) -> u64 {
        for slot in &mut self.slots {
            slot.reparse();
        }
        self.generation += 1;
        self.generation
    }

    /// Applies one generation's sampling results in a single pass and
    /// rescores. Either everything is applied or nothing is.
    pub fn commit(&mut self, generation: u64, results: Vec<SlotResult>) -> Result<i64, CommitError> {
        if generation != self.generation {
            return Err(CommitError::StaleGeneration {
                got: generation,
                current: self.generation,
            });
        }
        for result in &results {
            let slot = self.slot(result.slot).ok_or(BoardError::UnknownSlot(result.slot))?;
            if slot.revision != result.revision || slot.expression().is_none() {
                return Err(CommitError::SlotChanged { slot: result.slot });
            }
        }

        for result in results {
            self.slot_mut(result.slot)?.segments = Some(result.segments);
        }
        scoring::mark_hits(&mut self.dots, &self.slots);
        self.score = scoring::score(&self.dots);
        Ok(self.score)
    }

    /// Full game reload: new dots and slot texts, all hits and the score
    /// reset. The generation keeps counting so older work stays stale.
    pub fn reload<S: AsRef<str>>(&mut self, mut dots: Vec<Dot>, texts: &[S]) -> Result<(), BoardError> {
        for dot in &mut dots {
            dot.reset();
        }
        self.restore(dots, texts)
    }

    /// Like [`Board::reload`], but keeps the hit flags carried by `dots`
    /// and scores them.
    pub(crate) fn restore<S: AsRef<str>>(&mut self, dots: Vec<Dot>, texts: &[S]) -> Result<(), BoardError> {
        let mut fresh = Board::new(dots, self.slots.len());
        fresh.set_texts(texts)?;
        fresh.generation = self.generation + 1;
        *self = fresh;
        Ok(())
    }

    /// Empties every slot and resets hits and score, keeping the dots.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.set_text("");
        }
        for dot in &mut self.dots {
            dot.reset();
        }
        self.score = 0;
        self.generation += 1;
    }
}
