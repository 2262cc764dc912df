//! Map projection for ordered routes
//!
//! Turns an ordered stop sequence into the parallel arrays the map widget
//! consumes. Read-side only; nothing here touches the database.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::StopWithEmployee;

/// Label used when a stop has no owning employee
const UNASSIGNED_LABEL: &str = "Unassigned Stop";

/// Display payload for an ordered stop sequence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapStops {
    /// [lng, lat] per plotted stop (GeoJSON axis order)
    pub coordinates: Vec<[f64; 2]>,
    pub labels: Vec<String>,
    pub employee_ids: Vec<Option<Uuid>>,
    /// 1-based position among plotted stops
    pub ordinals: Vec<i32>,
}

/// Project an ordered stop sequence for display.
///
/// Stops without a valid coordinate remain part of the route but are not
/// plotted and do not consume an ordinal slot.
pub fn project_stops(stops: &[StopWithEmployee]) -> MapStops {
    let mut map = MapStops::default();

    for stop in stops {
        let Some(coords) = stop.coordinates() else {
            continue;
        };

        let label = match &stop.employee_name {
            Some(name) => {
                let location = stop.employee_location.as_deref().unwrap_or("");
                format!("{name}\n{location}")
            }
            None => UNASSIGNED_LABEL.to_string(),
        };

        map.coordinates.push([coords.lng, coords.lat]);
        map.labels.push(label);
        map.employee_ids.push(stop.employee_id);
        map.ordinals.push(map.coordinates.len() as i32);
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(
        name: Option<&str>,
        location: Option<&str>,
        lat: Option<f64>,
        lng: Option<f64>,
    ) -> StopWithEmployee {
        StopWithEmployee {
            id: Uuid::new_v4(),
            employee_id: name.map(|_| Uuid::new_v4()),
            employee_name: name.map(str::to_string),
            employee_location: location.map(str::to_string),
            lat,
            lng,
            sequence: None,
            estimated_arrival_time: None,
        }
    }

    #[test]
    fn test_projects_parallel_arrays() {
        let stops = vec![
            stop(Some("Abebe"), Some("Bole"), Some(9.03), Some(38.77)),
            stop(Some("Sara"), Some("Piassa"), Some(9.10), Some(38.90)),
        ];

        let map = project_stops(&stops);
        assert_eq!(map.coordinates.len(), 2);
        assert_eq!(map.labels.len(), 2);
        assert_eq!(map.employee_ids.len(), 2);
        assert_eq!(map.ordinals, vec![1, 2]);
        // GeoJSON axis order: lng first.
        assert_eq!(map.coordinates[0], [38.77, 9.03]);
        assert_eq!(map.labels[0], "Abebe\nBole");
    }

    #[test]
    fn test_skips_stops_without_coordinates() {
        let stops = vec![
            stop(Some("Abebe"), Some("Bole"), Some(9.03), Some(38.77)),
            stop(Some("Mulu"), None, None, None),
            stop(Some("Sara"), Some("Piassa"), Some(9.10), Some(38.90)),
        ];

        let map = project_stops(&stops);
        // The unplottable middle stop leaves no gap in the ordinals.
        assert_eq!(map.coordinates.len(), 2);
        assert_eq!(map.ordinals, vec![1, 2]);
        assert_eq!(map.labels, vec!["Abebe\nBole", "Sara\nPiassa"]);
    }

    #[test]
    fn test_unassigned_stop_label() {
        let stops = vec![stop(None, None, Some(9.03), Some(38.77))];

        let map = project_stops(&stops);
        assert_eq!(map.labels, vec!["Unassigned Stop"]);
        assert_eq!(map.employee_ids, vec![None]);
    }

    #[test]
    fn test_label_with_missing_location() {
        let stops = vec![stop(Some("Abebe"), None, Some(9.03), Some(38.77))];

        let map = project_stops(&stops);
        assert_eq!(map.labels, vec!["Abebe\n"]);
    }

    #[test]
    fn test_invalid_coordinate_is_skipped() {
        let stops = vec![stop(Some("Abebe"), None, Some(f64::NAN), Some(38.77))];

        let map = project_stops(&stops);
        assert!(map.coordinates.is_empty());
        assert!(map.ordinals.is_empty());
    }
}
