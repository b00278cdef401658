//! Point-to-polyline distances used by hit testing.

use num_traits::Float;

/// Euclidean distance from `p` to the closed line segment `a`-`b`.
pub fn distance_to_segment<T: Float>(p: (T, T), a: (T, T), b: (T, T)) -> T {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let length_sq = dx * dx + dy * dy;
    if length_sq == T::zero() {
        return (p.0 - a.0).hypot(p.1 - a.1);
    }
    // Projection parameter of p onto the infinite line, clamped to the segment.
    let t = ((p.0 - a.0) * dx + (p.1 - a.1) * dy) / length_sq;
    let t = t.max(T::zero()).min(T::one());
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    (p.0 - cx).hypot(p.1 - cy)
}

/// Whether `p` lies within `tolerance` of the polyline through `points`.
pub fn is_near_polyline<T: Float>(p: (T, T), points: &[(T, T)], tolerance: T) -> bool {
    match points {
        [] => false,
        [only] => (p.0 - only.0).hypot(p.1 - only.1) <= tolerance,
        _ => points
            .windows(2)
            .any(|pair| distance_to_segment(p, pair[0], pair[1]) <= tolerance),
    }
}
