//! OSRM API response types for the Trip service.
//!
//! The Trip service solves a travelling salesman problem over the supplied
//! coordinates. With `source=first`, `destination=last` and
//! `roundtrip=false` the first and last coordinates stay fixed.
//!
//! See: <http://project-osrm.org/docs/v5.24.0/api/#trip-service>

use serde::Deserialize;

/// OSRM Trip API response.
#[derive(Debug, Deserialize)]
pub struct TripResponse {
    /// Status code from OSRM.
    ///
    /// Common values:
    /// - `"Ok"` - Request was successful
    /// - `"InvalidQuery"` - Invalid query parameters
    /// - `"NoTrips"` - No trip visiting all destinations exists
    /// - `"NotImplemented"` - Unsupported option combination
    pub code: String,

    /// Optional error message when `code` is not `"Ok"`.
    pub message: Option<String>,

    /// One entry per input coordinate, in input order.
    pub waypoints: Option<Vec<TripWaypoint>>,
}

impl TripResponse {
    /// Check if the response indicates success.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == "Ok"
    }
}

/// Placement of one input coordinate within the computed trip.
#[derive(Debug, Deserialize)]
pub struct TripWaypoint {
    /// Position of this coordinate in the trip.
    pub waypoint_index: usize,
    /// Index of the trip this coordinate belongs to.
    #[serde(default)]
    pub trips_index: usize,
    /// Coordinate snapped to the road network, `[lon, lat]`.
    pub location: [f64; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialise_success_response() {
        let json = r#"{
            "code": "Ok",
            "waypoints": [
                {"waypoint_index": 0, "trips_index": 0, "location": [-0.1, 51.5], "name": "A"},
                {"waypoint_index": 2, "trips_index": 0, "location": [-0.2, 51.6], "name": ""},
                {"waypoint_index": 1, "trips_index": 0, "location": [-0.3, 51.7], "name": "C"}
            ],
            "trips": []
        }"#;

        let response: TripResponse = serde_json::from_str(json).expect("should deserialise");

        assert!(response.is_ok());
        let waypoints = response.waypoints.expect("should have waypoints");
        assert_eq!(waypoints.len(), 3);
        assert_eq!(waypoints[1].waypoint_index, 2);
        assert_eq!(waypoints[2].location, [-0.3, 51.7]);
    }

    #[test]
    fn deserialise_error_response() {
        let json = r#"{
            "code": "NoTrips",
            "message": "No trip visiting all destinations possible."
        }"#;

        let response: TripResponse = serde_json::from_str(json).expect("should deserialise");

        assert!(!response.is_ok());
        assert!(response.waypoints.is_none());
        assert_eq!(
            response.message.as_deref(),
            Some("No trip visiting all destinations possible.")
        );
    }
}
