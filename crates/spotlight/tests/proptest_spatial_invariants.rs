//! Property-based invariant tests for the directional candidate search.
//!
//! 1. A selected neighbor always lies in the half-plane of the direction.
//! 2. The excluded id is never selected.
//! 3. Angle is never zero and distance is floored at `EPSILON`; precedence
//!    is never negative or NaN.
//! 4. Candidates more than 89° off the travel axis score zero.
//! 5. A lone candidate in front of the origin with an overlapping span is
//!    always selected.
//! 6. The pointer search without a direction finds something whenever there
//!    is a candidate.

use proptest::prelude::*;
use spotlight::focus::spatial::{
    ANGLE_CUTOFF_DEGREES, EPSILON, angle_and_distance, in_half_plane, nearest_to_point,
    precedence, select_neighbor,
};
use spotlight::focus::{Direction, FocusId};
use spotlight_core::geometry::{Point, Rect};

// ── Strategy helpers ──────────────────────────────────────────────────

fn arb_rect() -> impl Strategy<Value = Rect> {
    (0u16..2000, 0u16..2000, 1u16..400, 1u16..400).prop_map(|(x, y, w, h)| {
        Rect::new(f64::from(x), f64::from(y), f64::from(w), f64::from(h))
    })
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Up),
        Just(Direction::Down),
        Just(Direction::Left),
        Just(Direction::Right),
    ]
}

fn arb_candidates() -> impl Strategy<Value = Vec<(FocusId, Rect)>> {
    prop::collection::vec(arb_rect(), 0..24).prop_map(|rects| {
        rects
            .into_iter()
            .enumerate()
            .map(|(i, r)| (i as FocusId + 1, r))
            .collect()
    })
}

/// A rect placed `gap` pixels in front of `origin` along `dir`, sharing the
/// same perpendicular span.
fn in_front(dir: Direction, origin: &Rect, gap: f64) -> Rect {
    let (w, h) = (origin.width, origin.height);
    match dir {
        Direction::Up => Rect::new(origin.x, origin.y - gap - h, w, h),
        Direction::Down => Rect::new(origin.x, origin.bottom() + gap, w, h),
        Direction::Left => Rect::new(origin.x - gap - w, origin.y, w, h),
        Direction::Right => Rect::new(origin.right() + gap, origin.y, w, h),
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Selection
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn selected_neighbor_is_in_half_plane(
        dir in arb_direction(),
        origin in arb_rect(),
        candidates in arb_candidates(),
    ) {
        if let Some(id) = select_neighbor(dir, origin, candidates.clone(), None) {
            let (_, bounds) = candidates
                .iter()
                .find(|(c, _)| *c == id)
                .copied()
                .expect("selected id comes from the candidates");
            prop_assert!(in_half_plane(dir, &origin, &bounds));
            prop_assert!(precedence(dir, &origin, &bounds) > 0.0);
        }
    }

    #[test]
    fn excluded_id_is_never_selected(
        dir in arb_direction(),
        origin in arb_rect(),
        candidates in arb_candidates(),
        pick in 0usize..24,
    ) {
        prop_assume!(!candidates.is_empty());
        let excluded = candidates[pick % candidates.len()].0;
        let selected = select_neighbor(dir, origin, candidates, Some(excluded));
        prop_assert_ne!(selected, Some(excluded));
    }

    #[test]
    fn lone_aligned_candidate_is_selected(
        dir in arb_direction(),
        origin in arb_rect(),
        gap in 0.0f64..500.0,
    ) {
        let target = in_front(dir, &origin, gap);
        prop_assert_eq!(select_neighbor(dir, origin, vec![(7, target)], None), Some(7));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Scoring
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn angle_and_distance_are_floored(
        dir in arb_direction(),
        origin in arb_rect(),
        candidate in arb_rect(),
    ) {
        let (angle, distance) = angle_and_distance(dir, &origin, &candidate);
        prop_assert!(angle > 0.0);
        prop_assert!(distance >= EPSILON);
        let score = precedence(dir, &origin, &candidate);
        prop_assert!(!score.is_nan());
        prop_assert!(score >= 0.0);
    }

    #[test]
    fn steep_candidates_score_zero(
        dir in arb_direction(),
        origin in arb_rect(),
        candidate in arb_rect(),
    ) {
        let (angle, _) = angle_and_distance(dir, &origin, &candidate);
        if angle > ANGLE_CUTOFF_DEGREES {
            prop_assert_eq!(precedence(dir, &origin, &candidate), 0.0);
        }
    }

    #[test]
    fn half_plane_is_exclusive_for_opposites(
        dir in arb_direction(),
        origin in arb_rect(),
        gap in 2.0f64..500.0,
    ) {
        let target = in_front(dir, &origin, gap);
        prop_assert!(in_half_plane(dir, &origin, &target));
        prop_assert!(!in_half_plane(dir.opposite(), &origin, &target));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Pointer search
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn pointer_search_without_direction_always_finds(
        x in 0.0f64..2000.0,
        y in 0.0f64..2000.0,
        candidates in arb_candidates(),
    ) {
        let found = nearest_to_point(Point::new(x, y), None, candidates.clone());
        prop_assert_eq!(found.is_some(), !candidates.is_empty());
    }
}
