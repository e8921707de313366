#![forbid(unsafe_code)]

//! Directional candidate search.
//!
//! Given a travel direction, the origin's bounds and a set of candidate
//! bounds, picks the candidate that best continues the motion. Candidates
//! are first filtered to the half-plane in front of the origin, then ranked
//! by *precedence*, a score that rewards alignment with the travel axis and
//! closeness:
//!
//! ```text
//! precedence = 0                          if angle > 89°
//!            = 1 / (angle × distance⁴)    otherwise
//! ```
//!
//! `angle` and `distance` are measured between the two nearest points of
//! the facing edges: the midpoint of the overlapping span when the
//! perpendicular spans overlap, otherwise the two closest corners.
//!
//! # Invariants
//!
//! 1. A candidate outside the half-plane is never returned.
//! 2. A candidate whose connecting line is more than 89° off the travel axis
//!    is never returned.
//! 3. Identical or overlapping bounds never divide by zero: a zero angle
//!    and any distance below [`EPSILON`] are replaced by it.
//! 4. Ties on precedence go to the smaller center-to-center distance, then
//!    to the earlier candidate.
//!
//! # Complexity
//!
//! Every search is a single O(n) pass over the candidates.

use spotlight_core::geometry::{Point, Rect};
use tracing::trace;

use super::tree::{Direction, FocusId};

/// Angle (degrees) beyond which a candidate no longer counts as lying in the
/// travel direction.
pub const ANGLE_CUTOFF_DEGREES: f64 = 89.0;

/// Floor applied to degenerate angles and distances.
pub const EPSILON: f64 = 0.1;

/// Edge tolerance (pixels) for the half-plane test; touching edges are
/// adjacent, not overlapping.
const EDGE_TOLERANCE: f64 = 1.0;

/// Whether `candidate` lies in the half-plane `dir` of `origin`.
#[must_use]
pub fn in_half_plane(dir: Direction, origin: &Rect, candidate: &Rect) -> bool {
    match dir {
        Direction::Up => candidate.bottom() - EDGE_TOLERANCE <= origin.top(),
        Direction::Down => origin.bottom() - EDGE_TOLERANCE <= candidate.top(),
        Direction::Left => candidate.right() - EDGE_TOLERANCE <= origin.left(),
        Direction::Right => origin.right() - EDGE_TOLERANCE <= candidate.left(),
    }
}

/// The two points used to measure the gap between `origin` and `candidate`.
///
/// Along the travel axis the points sit on the facing edges. Across it they
/// share the middle of the overlapping span, or sit on the nearest corners
/// when the spans do not overlap.
fn adjacent_points(dir: Direction, origin: &Rect, candidate: &Rect) -> (Point, Point) {
    let (o_lo, o_hi, c_lo, c_hi) = if dir.is_vertical() {
        (origin.left(), origin.right(), candidate.left(), candidate.right())
    } else {
        (origin.top(), origin.bottom(), candidate.top(), candidate.bottom())
    };

    let lo = o_lo.max(c_lo);
    let hi = o_hi.min(c_hi);
    let (across_o, across_c) = if lo <= hi {
        let mid = (lo + hi) / 2.0;
        (mid, mid)
    } else if c_lo >= o_hi {
        (o_hi, c_lo)
    } else {
        (o_lo, c_hi)
    };

    match dir {
        Direction::Up => (
            Point::new(across_o, origin.top()),
            Point::new(across_c, candidate.bottom()),
        ),
        Direction::Down => (
            Point::new(across_o, origin.bottom()),
            Point::new(across_c, candidate.top()),
        ),
        Direction::Left => (
            Point::new(origin.left(), across_o),
            Point::new(candidate.right(), across_c),
        ),
        Direction::Right => (
            Point::new(origin.right(), across_o),
            Point::new(candidate.left(), across_c),
        ),
    }
}

/// Angle (degrees) off the travel axis and distance between the adjacent
/// points. A zero angle becomes [`EPSILON`]; distance is floored at it.
#[must_use]
pub fn angle_and_distance(dir: Direction, origin: &Rect, candidate: &Rect) -> (f64, f64) {
    let (a, b) = adjacent_points(dir, origin, candidate);
    let dx = (b.x - a.x).abs();
    let dy = (b.y - a.y).abs();
    let slope = if dir.is_vertical() { dx / dy } else { dy / dx };

    let mut angle = slope.atan().to_degrees();
    if angle.is_nan() || angle == 0.0 {
        angle = EPSILON;
    }
    let distance = dx.hypot(dy).max(EPSILON);
    (angle, distance)
}

/// Precedence score of `candidate` relative to `origin` for `dir`.
///
/// Returns 0 for candidates outside the half-plane or past the angle cutoff.
#[must_use]
pub fn precedence(dir: Direction, origin: &Rect, candidate: &Rect) -> f64 {
    if !in_half_plane(dir, origin, candidate) {
        return 0.0;
    }
    let (angle, distance) = angle_and_distance(dir, origin, candidate);
    if angle > ANGLE_CUTOFF_DEGREES {
        0.0
    } else {
        1.0 / (angle * distance.powi(4))
    }
}

/// Best neighbor of `origin` in direction `dir`.
///
/// `exclude` drops one id from consideration (typically the origin itself).
/// Returns `None` when no candidate has a non-zero precedence.
pub fn select_neighbor<I>(
    dir: Direction,
    origin: Rect,
    candidates: I,
    exclude: Option<FocusId>,
) -> Option<FocusId>
where
    I: IntoIterator<Item = (FocusId, Rect)>,
{
    let origin_center = origin.center();
    let mut best: Option<(FocusId, f64, f64)> = None;

    for (id, bounds) in candidates {
        if exclude == Some(id) {
            continue;
        }
        let score = precedence(dir, &origin, &bounds);
        trace!(
            candidate = id,
            direction = dir.as_str(),
            precedence = score,
            "scored candidate"
        );
        if score <= 0.0 {
            continue;
        }
        let center_distance = origin_center.distance(bounds.center());
        let better = match best {
            None => true,
            Some((_, best_score, best_distance)) => {
                score > best_score || (score == best_score && center_distance < best_distance)
            }
        };
        if better {
            best = Some((id, score, center_distance));
        }
    }

    best.map(|(id, _, _)| id)
}

/// Candidate nearest to a pointer position.
///
/// With a direction the search runs as [`select_neighbor`] from a 1×1
/// rectangle at `point`. Without one it picks the candidate whose center is
/// closest to `point`, with no half-plane or angle filtering.
pub fn nearest_to_point<I>(point: Point, dir: Option<Direction>, candidates: I) -> Option<FocusId>
where
    I: IntoIterator<Item = (FocusId, Rect)>,
{
    match dir {
        Some(dir) => select_neighbor(dir, Rect::unit_at(point), candidates, None),
        None => candidates
            .into_iter()
            .map(|(id, bounds)| (id, point.distance(bounds.center())))
            .fold(None, |best: Option<(FocusId, f64)>, (id, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((id, d)),
            })
            .map(|(id, _)| id),
    }
}

// =========================================================================
// Tests
// =========================================================================
