//! Greedy stop sequencing
//!
//! Orders pickup stops by repeated nearest-neighbor hops from an origin.
//! This is a heuristic, not an optimizer: route sizes are bounded by
//! vehicle capacity, so the O(n²) scan is acceptable and the result is a
//! pure function of the input: no randomness, no external state.

use crate::services::geo::distance_between;
use crate::types::{Coordinates, StopWithEmployee};

/// Pick the visiting order for a set of stop coordinates.
///
/// Returns indices into `coords`, each exactly once. The walk starts from
/// `origin` when it is valid, otherwise from the first valid coordinate in
/// input order. A stop without a valid coordinate sits at infinite
/// distance from everything, so it drains to the end of the order; when no
/// stop ever has a valid coordinate the input order is preserved.
///
/// Ties break to the earlier input index (strict-less scan), and the
/// reference point only advances onto valid coordinates; after an invalid
/// stop the search continues from the last known-good location.
pub fn greedy_order(coords: &[Option<Coordinates>], origin: Option<Coordinates>) -> Vec<usize> {
    let n = coords.len();
    if n == 0 {
        return vec![];
    }

    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);

    let mut current: Option<Coordinates> = origin
        .filter(Coordinates::is_valid)
        .or_else(|| coords.iter().flatten().find(|c| c.is_valid()).copied());

    for _ in 0..n {
        let Some(next) = find_next(coords, &visited, current.as_ref()) else {
            break;
        };
        if visited[next] {
            break;
        }

        visited[next] = true;
        order.push(next);

        if let Some(c) = coords[next].filter(|c| c.is_valid()) {
            current = Some(c);
        }
    }

    // Anything the walk never reached keeps its relative input order.
    for (index, seen) in visited.iter().enumerate() {
        if !seen {
            order.push(index);
        }
    }

    order
}

/// Nearest unvisited stop to the reference point, first-wins on equal
/// distance. Falls back to the first unvisited stop when no candidate has
/// a finite distance.
fn find_next(
    coords: &[Option<Coordinates>],
    visited: &[bool],
    current: Option<&Coordinates>,
) -> Option<usize> {
    let mut next = None;
    let mut min_distance = f64::INFINITY;

    for (index, coord) in coords.iter().enumerate() {
        if visited[index] {
            continue;
        }

        let distance = distance_between(current, coord.as_ref());
        if distance < min_distance {
            min_distance = distance;
            next = Some(index);
        }
    }

    next.or_else(|| visited.iter().position(|seen| !seen))
}

/// Resolve the sequencing origin: an explicit coordinate first, the
/// organization HQ second, otherwise none; the walk then starts at the
/// first stop with a valid coordinate.
pub fn resolve_origin(
    explicit: Option<Coordinates>,
    hq: Option<Coordinates>,
) -> Option<Coordinates> {
    explicit
        .filter(Coordinates::is_valid)
        .or_else(|| hq.filter(Coordinates::is_valid))
}

/// Reorder stops by the greedy walk
pub fn sequence_stops(
    stops: Vec<StopWithEmployee>,
    origin: Option<Coordinates>,
) -> Vec<StopWithEmployee> {
    let coords: Vec<Option<Coordinates>> = stops.iter().map(|s| s.coordinates()).collect();
    let order = greedy_order(&coords, origin);

    let mut slots: Vec<Option<StopWithEmployee>> = stops.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|index| slots[index].take())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn coord(lat: f64, lng: f64) -> Option<Coordinates> {
        Some(Coordinates { lat, lng })
    }

    fn stop_at(lat: Option<f64>, lng: Option<f64>) -> StopWithEmployee {
        StopWithEmployee {
            id: Uuid::new_v4(),
            employee_id: Some(Uuid::new_v4()),
            employee_name: Some("Test".to_string()),
            employee_location: None,
            lat,
            lng,
            sequence: None,
            estimated_arrival_time: None,
        }
    }

    // -----------------------------------------------------------------------
    // 1. Empty input
    // -----------------------------------------------------------------------
    #[test]
    fn empty_input_returns_empty() {
        assert!(greedy_order(&[], coord(9.02, 38.76)).is_empty());
        assert!(greedy_order(&[], None).is_empty());
    }

    // -----------------------------------------------------------------------
    // 2. Greedy correctness: nearest first, then next-nearest from there
    // -----------------------------------------------------------------------
    #[test]
    fn orders_by_nearest_neighbor_from_origin() {
        // Origin at (0, 0); A one step north, B two steps, C far away.
        let coords = vec![
            coord(0.10, 0.0), // C (index 0, farthest)
            coord(0.01, 0.0), // A (index 1, nearest)
            coord(0.02, 0.0), // B (index 2)
        ];

        let order = greedy_order(&coords, coord(0.0, 0.0));
        assert_eq!(order, vec![1, 2, 0]);
    }

    // -----------------------------------------------------------------------
    // 3. Determinism: same input, same output
    // -----------------------------------------------------------------------
    #[test]
    fn deterministic_for_fixed_input() {
        let coords = vec![
            coord(9.03, 38.77),
            None,
            coord(9.10, 38.90),
            coord(9.02, 38.75),
        ];
        let origin = coord(9.02, 38.76);

        let first = greedy_order(&coords, origin);
        let second = greedy_order(&coords, origin);
        assert_eq!(first, second);
    }

    // -----------------------------------------------------------------------
    // 4. Completeness: output is a permutation, invalid stops included once
    // -----------------------------------------------------------------------
    #[test]
    fn output_is_a_permutation() {
        let coords = vec![
            coord(9.03, 38.77),
            None,
            coord(9.10, 38.90),
            None,
            coord(9.02, 38.75),
        ];

        let mut order = greedy_order(&coords, coord(9.02, 38.76));
        assert_eq!(order.len(), coords.len());
        order.sort_unstable();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    // -----------------------------------------------------------------------
    // 5. Ties break to input order
    // -----------------------------------------------------------------------
    #[test]
    fn equal_distance_prefers_earlier_index() {
        let coords = vec![
            coord(0.01, 0.0), // same place, index 0
            coord(0.01, 0.0), // same place, index 1
        ];

        let order = greedy_order(&coords, coord(0.0, 0.0));
        assert_eq!(order, vec![0, 1]);
    }

    // -----------------------------------------------------------------------
    // 6. Missing origin falls back to the first valid stop
    // -----------------------------------------------------------------------
    #[test]
    fn no_origin_starts_at_first_valid_stop() {
        // First valid coordinate is index 1, so the walk starts there
        // (distance zero to itself) and continues to its neighbor.
        let coords = vec![
            None,
            coord(0.05, 0.0),
            coord(0.06, 0.0),
            coord(0.50, 0.0),
        ];

        let order = greedy_order(&coords, None);
        assert_eq!(order, vec![1, 2, 3, 0]);
    }

    #[test]
    fn invalid_origin_is_ignored() {
        let coords = vec![coord(0.02, 0.0), coord(0.01, 0.0)];
        let origin = Some(Coordinates { lat: f64::NAN, lng: 0.0 });

        // Walk starts at the first valid stop (index 0), not the NaN origin.
        let order = greedy_order(&coords, origin);
        assert_eq!(order, vec![0, 1]);
    }

    // -----------------------------------------------------------------------
    // 7. No valid coordinates anywhere: input order preserved
    // -----------------------------------------------------------------------
    #[test]
    fn all_invalid_preserves_input_order() {
        let coords: Vec<Option<Coordinates>> = vec![None, None, None];
        let order = greedy_order(&coords, None);
        assert_eq!(order, vec![0, 1, 2]);
    }

    // -----------------------------------------------------------------------
    // 8. Invalid stop drains to the end, reference point stays known-good
    // -----------------------------------------------------------------------
    #[test]
    fn invalid_stop_is_appended_last() {
        let coords = vec![
            None,             // no coordinate
            coord(0.01, 0.0), // near origin
            coord(0.10, 0.0), // far
        ];

        let order = greedy_order(&coords, coord(0.0, 0.0));
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn reference_survives_fallback_pick() {
        // Only one valid stop. After it is placed, every remaining
        // candidate is at infinite distance, so the fallback appends the
        // invalid ones in input order.
        let coords = vec![None, None, coord(0.01, 0.0)];
        let order = greedy_order(&coords, coord(0.0, 0.0));
        assert_eq!(order, vec![2, 0, 1]);
    }

    // -----------------------------------------------------------------------
    // 9. HQ origin, near stop, far stop, missing stop
    // -----------------------------------------------------------------------
    #[test]
    fn hq_scenario_near_far_missing() {
        let hq = coord(9.02, 38.76);
        let coords = vec![
            None,             // missing coordinates
            coord(9.10, 38.90), // ~17 km out
            coord(9.03, 38.77), // ~1.5 km out
        ];

        let order = greedy_order(&coords, hq);
        assert_eq!(order, vec![2, 1, 0]);
    }

    // -----------------------------------------------------------------------
    // resolve_origin
    // -----------------------------------------------------------------------
    #[test]
    fn origin_prefers_explicit_over_hq() {
        let explicit = Coordinates { lat: 1.0, lng: 1.0 };
        let hq = Coordinates { lat: 2.0, lng: 2.0 };

        assert_eq!(resolve_origin(Some(explicit), Some(hq)), Some(explicit));
        assert_eq!(resolve_origin(None, Some(hq)), Some(hq));
        assert_eq!(resolve_origin(None, None), None);
    }

    #[test]
    fn origin_skips_invalid_explicit() {
        let broken = Coordinates { lat: f64::NAN, lng: 1.0 };
        let hq = Coordinates { lat: 2.0, lng: 2.0 };
        assert_eq!(resolve_origin(Some(broken), Some(hq)), Some(hq));
    }

    // -----------------------------------------------------------------------
    // sequence_stops wrapper
    // -----------------------------------------------------------------------
    #[test]
    fn sequence_stops_reorders_and_keeps_all() {
        let near = stop_at(Some(0.01), Some(0.0));
        let far = stop_at(Some(0.10), Some(0.0));
        let missing = stop_at(None, None);

        let near_id = near.id;
        let far_id = far.id;
        let missing_id = missing.id;

        let ordered = sequence_stops(
            vec![missing, far, near],
            Some(Coordinates { lat: 0.0, lng: 0.0 }),
        );

        let ids: Vec<_> = ordered.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![near_id, far_id, missing_id]);
    }
}
