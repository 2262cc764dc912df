//! Geographic calculations

use crate::types::Coordinates;

/// Earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_distance(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Distance between two optional points in kilometers.
///
/// An absent or invalid coordinate on either side yields an infinite
/// distance, so unreachable stops rank behind every reachable one instead
/// of failing the caller.
pub fn distance_between(from: Option<&Coordinates>, to: Option<&Coordinates>) -> f64 {
    match (from, to) {
        (Some(a), Some(b)) if a.is_valid() && b.is_valid() => haversine_distance(a, b),
        _ => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_hq_to_near_stop() {
        // Organization HQ to a stop one block over (~1.6 km).
        let hq = Coordinates { lat: 9.02, lng: 38.76 };
        let stop = Coordinates { lat: 9.03, lng: 38.77 };

        let distance = haversine_distance(&hq, &stop);
        assert!(distance > 1.0 && distance < 2.0, "got {} km", distance);
    }

    #[test]
    fn test_haversine_hq_to_far_stop() {
        let hq = Coordinates { lat: 9.02, lng: 38.76 };
        let stop = Coordinates { lat: 9.10, lng: 38.90 };

        let distance = haversine_distance(&hq, &stop);
        // Roughly 17-18 km across town.
        assert!(distance > 16.0 && distance < 19.0, "got {} km", distance);
    }

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinates { lat: 9.02, lng: 38.76 };
        let distance = haversine_distance(&point, &point);
        assert!(distance.abs() < 0.001);
    }

    #[test]
    fn test_distance_between_missing_is_infinite() {
        let point = Coordinates { lat: 9.02, lng: 38.76 };
        assert!(distance_between(None, Some(&point)).is_infinite());
        assert!(distance_between(Some(&point), None).is_infinite());
        assert!(distance_between(None, None).is_infinite());
    }

    #[test]
    fn test_distance_between_invalid_is_infinite() {
        let point = Coordinates { lat: 9.02, lng: 38.76 };
        let broken = Coordinates { lat: f64::NAN, lng: 38.76 };
        assert!(distance_between(Some(&broken), Some(&point)).is_infinite());

        let out_of_range = Coordinates { lat: 95.0, lng: 38.76 };
        assert!(distance_between(Some(&point), Some(&out_of_range)).is_infinite());
    }

    #[test]
    fn test_distance_between_valid_matches_haversine() {
        let a = Coordinates { lat: 9.02, lng: 38.76 };
        let b = Coordinates { lat: 9.03, lng: 38.77 };
        let expected = haversine_distance(&a, &b);
        assert_eq!(distance_between(Some(&a), Some(&b)), expected);
    }
}
