//! Hit testing of dots against sampled graphs, and the score rule.

use crate::board::{Dot, FunctionSlot, SlotId};
use crate::geometry::is_near_polyline;
use crate::sampler::Segment;

/// Whether any segment passes within the dot's radius.
pub fn touches(dot: &Dot, segments: &[Segment]) -> bool {
    segments
        .iter()
        .any(|segment| is_near_polyline(dot.position(), segment.points(), dot.radius()))
}

/// First slot, in slot order, whose graph touches `dot`.
pub fn find_hit<'a>(dot: &Dot, slots: impl IntoIterator<Item = &'a FunctionSlot>) -> Option<SlotId> {
    slots
        .into_iter()
        .find(|slot| slot.segments().is_some_and(|segments| touches(dot, segments)))
        .map(FunctionSlot::id)
}

/// Marks every not-yet-hit dot that some slot's graph touches. Returns how
/// many dots became hit. Already hit dots are never reset.
pub fn mark_hits(dots: &mut [Dot], slots: &[FunctionSlot]) -> usize {
    let mut newly_hit = 0;
    for dot in dots.iter_mut().filter(|dot| !dot.is_hit()) {
        if find_hit(dot, slots).is_some() {
            dot.mark_hit();
            newly_hit += 1;
        }
    }
    newly_hit
}

/// Weighted good hits minus weighted bad hits.
pub fn score(dots: &[Dot]) -> i64 {
    dots.iter()
        .filter(|dot| dot.is_hit())
        .map(|dot| {
            let weight = i64::from(dot.weight());
            if dot.is_good() {
                weight
            } else {
                -weight
            }
        })
        .sum()
}
