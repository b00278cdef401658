//! Runs recompute generations in the background and hands their results to
//! the board in one piece.
//!
//! The coordinator owns the [`Board`]. A recompute snapshots the parsed
//! expression of every slot that needs sampling, samples them in parallel
//! on a background thread, and collects one report per slot over a
//! channel. Only when every report of the current generation has arrived
//! are they committed together. A cancelled or superseded generation is
//! dropped as a whole.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rayon::prelude::*;

use crate::board::{Board, Dot, SlotError, SlotId, SlotResult, SlotState};
use crate::config::{LoadPolicy, PlotSettings};
use crate::dots::DotGenerator;
use crate::error::{BoardError, DotGenerationError, PersistenceError, SettingsError};
use crate::expression::Expr;
use crate::persistence::Repository;
use crate::sampler::{sample_until, Segment};

/// How long [`Coordinator::wait`] blocks before rechecking cancellation.
const WAIT_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotState {
    Idle,
    Computing(u64),
    Cancelling(u64),
    Done(u64),
}

/// Thread-safe "stop waiting" switch for one generation.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// One slot's graph as it should be drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotGraph {
    pub slot: SlotId,
    pub text: String,
    pub segments: Vec<Segment>,
}

/// Snapshot of everything a surface needs to redraw.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotUpdate {
    pub generation: u64,
    pub graphs: Vec<SlotGraph>,
    pub dots: Vec<Dot>,
    pub score: i64,
}

/// Whatever displays the game: a window, a terminal, a test recorder.
pub trait PlotSurface {
    fn show_plot(&mut self, update: &PlotUpdate);
    fn show_errors(&mut self, errors: &[SlotError]);
}

struct SamplingJob {
    slot: SlotId,
    revision: u64,
    expr: Expr,
}

struct WorkerReport {
    generation: u64,
    slot: SlotId,
    revision: u64,
    /// `None` when the worker stopped because of cancellation.
    segments: Option<Vec<Segment>>,
}

struct Running {
    generation: u64,
    cancel: CancelHandle,
    receiver: Receiver<WorkerReport>,
    expected: usize,
    reports: Vec<WorkerReport>,
}

impl Running {
    fn accept(&mut self, report: WorkerReport) {
        if report.generation == self.generation {
            self.reports.push(report);
        }
    }

    fn is_complete(&self) -> bool {
        self.reports.len() >= self.expected
    }

    fn was_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.reports.iter().any(|r| r.segments.is_none())
    }
}

pub struct Coordinator {
    board: Board,
    settings: PlotSettings,
    state: PlotState,
    running: Option<Running>,
}

impl Coordinator {
    /// Fails on settings that [`PlotSettings::validate`] rejects.
    pub fn new(board: Board, settings: PlotSettings) -> Result<Self, SettingsError> {
        settings.validate()?;
        Ok(Self {
            board,
            settings,
            state: PlotState::Idle,
            running: None,
        })
    }

    /// An empty board with `settings.slot_count` slots and the given dots.
    pub fn with_dots(dots: Vec<Dot>, settings: PlotSettings) -> Result<Self, SettingsError> {
        let board = Board::new(dots, settings.slot_count);
        Self::new(board, settings)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn settings(&self) -> &PlotSettings {
        &self.settings
    }

    pub fn state(&self) -> PlotState {
        self.state
    }

    // =========================================================================
    // RECOMPUTE
    // =========================================================================

    /// Starts a new generation, superseding any generation still running.
    /// Slots whose segments are cached are not sampled again.
    pub fn request_recompute(&mut self) -> u64 {
        self.abandon();
        let generation = self.board.begin_generation();

        let jobs: Vec<SamplingJob> = self
            .board
            .slots()
            .iter()
            .filter(|slot| slot.needs_sampling())
            .filter_map(|slot| {
                Some(SamplingJob {
                    slot: slot.id(),
                    revision: slot.revision(),
                    expr: slot.expression()?.clone(),
                })
            })
            .collect();

        if jobs.is_empty() {
            self.state = match self.board.commit(generation, Vec::new()) {
                Ok(_) => PlotState::Done(generation),
                Err(_) => PlotState::Idle,
            };
            return generation;
        }

        let cancel = CancelHandle::default();
        let (sender, receiver) = mpsc::channel();
        let expected = jobs.len();
        let settings = self.settings.clone();
        let token = cancel.clone();
        thread::spawn(move || {
            jobs.into_par_iter().for_each_with(sender, |sender, job| {
                let segments = sample_until(&job.expr, &settings, || token.is_cancelled());
                // The receiver is gone once the generation was abandoned.
                let _ = sender.send(WorkerReport {
                    generation,
                    slot: job.slot,
                    revision: job.revision,
                    segments,
                });
            });
        });

        self.running = Some(Running {
            generation,
            cancel,
            receiver,
            expected,
            reports: Vec::with_capacity(expected),
        });
        self.state = PlotState::Computing(generation);
        generation
    }

    /// Asks the running generation to stop. Its results will be discarded.
    pub fn cancel(&mut self) {
        if let Some(running) = &self.running {
            running.cancel.cancel();
            self.state = PlotState::Cancelling(running.generation);
        }
    }

    /// Handle that cancels the current generation from any thread.
    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.running.as_ref().map(|r| r.cancel.clone())
    }

    /// Collects whatever reports have arrived without blocking.
    pub fn poll(&mut self) -> PlotState {
        let mut disconnected = false;
        if let Some(running) = self.running.as_mut() {
            loop {
                match running.receiver.try_recv() {
                    Ok(report) => running.accept(report),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }
        self.settle(disconnected);
        self.state
    }

    /// Blocks until the running generation is committed or discarded.
    pub fn wait(&mut self) -> PlotState {
        while let Some(running) = self.running.as_mut() {
            let disconnected = match running.receiver.recv_timeout(WAIT_TICK) {
                Ok(report) => {
                    running.accept(report);
                    false
                }
                Err(RecvTimeoutError::Timeout) => false,
                Err(RecvTimeoutError::Disconnected) => true,
            };
            self.settle(disconnected);
        }
        self.state
    }

    /// Marks a finished generation as consumed by the surface.
    pub fn acknowledge(&mut self) {
        if let PlotState::Done(_) = self.state {
            self.state = PlotState::Idle;
        }
    }

    fn settle(&mut self, disconnected: bool) {
        let Some(running) = &self.running else {
            return;
        };
        let generation = running.generation;

        if running.was_cancelled() {
            self.state = PlotState::Cancelling(generation);
            if running.is_complete() || disconnected {
                self.running = None;
                self.state = PlotState::Idle;
            }
            return;
        }
        if !running.is_complete() {
            if disconnected {
                // a worker died without reporting
                self.running = None;
                self.state = PlotState::Idle;
            }
            return;
        }

        let Some(running) = self.running.take() else {
            return;
        };
        let results = running
            .reports
            .into_iter()
            .filter_map(|report| {
                Some(SlotResult {
                    slot: report.slot,
                    revision: report.revision,
                    segments: report.segments?,
                })
            })
            .collect();
        self.state = match self.board.commit(generation, results) {
            Ok(_) => PlotState::Done(generation),
            Err(_) => PlotState::Idle,
        };
    }

    /// Cancels and forgets the running generation, if any.
    fn abandon(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
        }
        self.state = PlotState::Idle;
    }

    // =========================================================================
    // EDITING
    // =========================================================================

    /// Changes a slot's text. Changing it while a generation is computing
    /// cancels that generation.
    pub fn set_slot_text(&mut self, id: SlotId, text: &str) -> Result<&SlotState, BoardError> {
        let changes = self.board.slot(id).is_some_and(|slot| slot.text() != text);
        if changes && matches!(self.state, PlotState::Computing(_)) {
            self.cancel();
        }
        self.board.set_slot_text(id, text)
    }

    /// Fills slots from the first one on, leaving the rest empty.
    pub fn set_texts<S: AsRef<str>>(&mut self, texts: &[S]) -> Result<(), BoardError> {
        if texts.len() > self.board.slots().len() {
            return Err(BoardError::TooManyFunctions {
                given: texts.len(),
                slots: self.board.slots().len(),
            });
        }
        for i in 0..self.board.slots().len() {
            let text = texts.get(i).map_or("", |t| t.as_ref());
            self.set_slot_text(SlotId::from_index(i), text)?;
        }
        Ok(())
    }

    /// Empties all slots and resets hits and score.
    pub fn clear(&mut self) {
        self.abandon();
        self.board.clear();
    }

    /// Starts over with freshly generated dots and empty slots.
    pub fn new_game(&mut self, generator: &mut impl DotGenerator) -> Result<(), DotGenerationError> {
        let dots = generator.generate()?;
        self.abandon();
        let no_texts: [&str; 0] = [];
        // an empty text list always fits
        let _ = self.board.reload(dots, &no_texts);
        Ok(())
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Replaces the game with a stored one. A failed load changes nothing.
    ///
    /// Under [`LoadPolicy::Recompute`] the loaded texts are sampled right
    /// away, so hits and score come back once the generation commits.
    pub fn load_game(&mut self, repository: &impl Repository, id: &str) -> Result<(), PersistenceError> {
        let document = repository.load(id)?;
        document.validate(self.board.slots().len())?;
        self.abandon();
        document.apply(&mut self.board, self.settings.load_policy)?;
        if self.settings.load_policy == LoadPolicy::Recompute {
            self.request_recompute();
        }
        Ok(())
    }

    pub fn save_game(&self, repository: &mut impl Repository, id: &str) -> Result<(), PersistenceError> {
        repository.save(&self.board, id)
    }

    // =========================================================================
    // PRESENTATION
    // =========================================================================

    /// Committed state of the board, ready to draw.
    pub fn update(&self) -> PlotUpdate {
        PlotUpdate {
            generation: self.board.generation(),
            graphs: self
                .board
                .slots()
                .iter()
                .map(|slot| SlotGraph {
                    slot: slot.id(),
                    text: slot.text().to_string(),
                    segments: slot.segments().map(<[Segment]>::to_vec).unwrap_or_default(),
                })
                .collect(),
            dots: self.board.dots().to_vec(),
            score: self.board.score(),
        }
    }

    pub fn publish(&self, surface: &mut impl PlotSurface) {
        surface.show_errors(&self.board.errors());
        surface.show_plot(&self.update());
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.abandon();
    }
}
