//! Turns an expression into drawable, continuous pieces of its graph.
//!
//! The expression is evaluated on an evenly spaced grid over the visible
//! x-range. Consecutive defined samples form a [`Segment`]; an undefined or
//! off-plot sample, or a jump steeper than the configured threshold, ends
//! the current segment.

use crate::config::PlotSettings;
use crate::expression::{Expr, Outcome};

/// How many samples are evaluated between two cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 256;

/// One continuous piece of a graph, ordered by increasing x.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Segment {
    points: Vec<(f64, f64)>,
}

impl Segment {
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn x_range(&self) -> Option<(f64, f64)> {
        Some((self.points.first()?.0, self.points.last()?.0))
    }
}

impl From<Vec<(f64, f64)>> for Segment {
    fn from(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }
}

/// Linearly spaced positions from `start` to `end`, both included.
pub fn linspace(start: f64, end: f64, num: usize) -> impl Iterator<Item = f64> {
    let last = num.saturating_sub(1);
    (0..num).map(move |i| {
        if i == last {
            end
        } else {
            start + (end - start) * i as f64 / last as f64
        }
    })
}

/// Lazily evaluates `expr` at every grid position of `settings`.
pub fn samples<'a>(expr: &'a Expr, settings: &PlotSettings) -> impl Iterator<Item = (f64, Outcome)> + 'a {
    linspace(settings.x_min, settings.x_max, settings.sample_count).map(move |x| (x, expr.eval(x)))
}

/// Groups a sample sequence into segments.
struct SegmentBuilder {
    y_limit: f64,
    steepness: f64,
    current: Vec<(f64, f64)>,
    finished: Vec<Segment>,
}

impl SegmentBuilder {
    fn new(settings: &PlotSettings) -> Self {
        Self {
            y_limit: settings.y_limit,
            steepness: settings.steepness_threshold,
            current: Vec::new(),
            finished: Vec::new(),
        }
    }

    fn push(&mut self, x: f64, outcome: Outcome) {
        let y = match outcome {
            Ok(y) if y.abs() <= self.y_limit => y,
            _ => {
                self.close();
                return;
            }
        };
        if let Some(&(_, last_y)) = self.current.last() {
            if (y - last_y).abs() > self.steepness {
                self.close();
            }
        }
        self.current.push((x, y));
    }

    fn close(&mut self) {
        let points = std::mem::take(&mut self.current);
        if points.len() >= 2 {
            self.finished.push(Segment { points });
        }
    }

    fn finish(mut self) -> Vec<Segment> {
        self.close();
        self.finished
    }
}

/// Splits an ordered `(x, outcome)` sequence into segments.
pub fn segments_from_samples(
    samples: impl IntoIterator<Item = (f64, Outcome)>,
    settings: &PlotSettings,
) -> Vec<Segment> {
    let mut builder = SegmentBuilder::new(settings);
    for (x, outcome) in samples {
        builder.push(x, outcome);
    }
    builder.finish()
}

pub fn sample_expression(expr: &Expr, settings: &PlotSettings) -> Vec<Segment> {
    segments_from_samples(samples(expr, settings), settings)
}

/// Like [`sample_expression`], but polls `should_stop` periodically and
/// returns `None` as soon as it reports true.
pub fn sample_until(
    expr: &Expr,
    settings: &PlotSettings,
    should_stop: impl Fn() -> bool,
) -> Option<Vec<Segment>> {
    let mut builder = SegmentBuilder::new(settings);
    for (i, (x, outcome)) in samples(expr, settings).enumerate() {
        if i % CANCEL_CHECK_INTERVAL == 0 && should_stop() {
            return None;
        }
        builder.push(x, outcome);
    }
    if should_stop() {
        return None;
    }
    Some(builder.finish())
}
