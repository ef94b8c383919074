use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// A single retained GPS sample after preprocessing.
///
/// `heading` and `speed` are derived, never taken from the raw ping: for
/// every sample after the first, heading is the initial bearing from the
/// previous sample and speed is haversine distance over elapsed seconds.
/// The first sample carries zeros.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexedPosition {
    /// Epoch milliseconds. Strictly increasing within a trip.
    pub timestamp_ms: i64,
    pub lat: f64,
    pub lng: f64,
    /// Derived heading in degrees, `[0, 360)`.
    pub heading: f64,
    /// Derived ground speed in m/s.
    pub speed: f64,
    /// Reported GPS accuracy in meters, when the device supplied one.
    pub accuracy: Option<f64>,
}

impl IndexedPosition {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// The kernel's answer to "where was the vehicle at time t".
///
/// `ratio` is the clamped position within the bracketing segment: 0 at
/// `gps[index]`, 1 at `gps[index + 1]` (or when resting on the last sample).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolatedPosition {
    pub lat: f64,
    pub lng: f64,
    pub heading: f64,
    pub speed: f64,
    pub ratio: f64,
}
