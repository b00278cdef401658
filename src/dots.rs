//! Sources of puzzle dots: a seeded random layout and two fixed puzzles.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use crate::board::Dot;
use crate::error::DotGenerationError;

// =============================================================================
// CONFIGURATION
// =============================================================================
/// Cells per row of the placement grid; the grid spans -9..=9 on both axes.
const GRID_LINE: usize = 19;
const GRID_CELLS: usize = GRID_LINE * GRID_LINE;
const GRID_SHIFT: f64 = 9.0;
/// Maximum displacement of a dot from its cell centre.
const JITTER: f64 = 0.15;
pub const DEFAULT_GOOD_DOTS: usize = 8;
pub const DEFAULT_BAD_DOTS: usize = 2;

pub trait DotGenerator {
    fn generate(&mut self) -> Result<Vec<Dot>, DotGenerationError>;
}

/// Places good dots, then bad dots, on distinct cells of the grid.
#[derive(Debug, Clone)]
pub struct RandomDotGenerator {
    good: usize,
    bad: usize,
    rng: StdRng,
}

impl RandomDotGenerator {
    pub fn new(good: usize, bad: usize, seed: u64) -> Self {
        Self {
            good,
            bad,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy(good: usize, bad: usize) -> Self {
        Self {
            good,
            bad,
            rng: StdRng::from_entropy(),
        }
    }
}

impl DotGenerator for RandomDotGenerator {
    fn generate(&mut self) -> Result<Vec<Dot>, DotGenerationError> {
        let requested = self.good + self.bad;
        if requested > GRID_CELLS {
            return Err(DotGenerationError::TooManyDots {
                requested,
                available: GRID_CELLS,
            });
        }

        let cells = index::sample(&mut self.rng, GRID_CELLS, requested).into_vec();
        let dots = cells
            .into_iter()
            .enumerate()
            .map(|(i, cell)| {
                let x = (cell / GRID_LINE) as f64 - GRID_SHIFT + self.rng.gen_range(-JITTER..=JITTER);
                let y = (cell % GRID_LINE) as f64 - GRID_SHIFT + self.rng.gen_range(-JITTER..=JITTER);
                if i < self.good {
                    Dot::good(x, y)
                } else {
                    Dot::bad(x, y)
                }
            })
            .collect();
        Ok(dots)
    }
}

/// Alternates between two hand-made puzzles. With period 1 it always
/// yields the first; with period 2 the second is the first mirrored about
/// the origin.
#[derive(Debug, Clone)]
pub struct FixedDotGenerator {
    period: usize,
    state: usize,
}

const FIXED_SET: [(f64, f64, bool); 5] = [
    (1.0, 1.0, true),
    (-8.0, -0.25, true),
    (-4.0, 0.35, true),
    (5.0, -5.0, true),
    (2.5, 5.0, false),
];

impl FixedDotGenerator {
    /// `period` is clamped to 1..=2, the number of built-in sets.
    pub fn new(period: usize) -> Self {
        Self {
            period: period.clamp(1, 2),
            state: 0,
        }
    }
}

impl Default for FixedDotGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl DotGenerator for FixedDotGenerator {
    fn generate(&mut self) -> Result<Vec<Dot>, DotGenerationError> {
        let sign = if self.state == 0 { 1.0 } else { -1.0 };
        self.state = (self.state + 1) % self.period;
        Ok(FIXED_SET
            .iter()
            .map(|&(x, y, good)| {
                if good {
                    Dot::good(sign * x, sign * y)
                } else {
                    Dot::bad(sign * x, sign * y)
                }
            })
            .collect())
    }
}
