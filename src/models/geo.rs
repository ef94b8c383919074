use serde::{Deserialize, Serialize};

/// A WGS84 coordinate.
///
/// The wire form is a two-element `[lng, lat]` array, matching the map
/// layer's GeoJSON-style convention, so planned routes deserialize directly
/// from the data service payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when the coordinate can be placed on a map: finite, within
    /// latitude/longitude range, and not the null-island `(0, 0)` fix that
    /// GPS units emit before acquiring a signal.
    pub fn is_plottable(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= 90.0
            && self.lng.abs() <= 180.0
            && !(self.lat == 0.0 && self.lng == 0.0)
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from(pair: [f64; 2]) -> Self {
        Self {
            lng: pair[0],
            lat: pair[1],
        }
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(p: GeoPoint) -> [f64; 2] {
        [p.lng, p.lat]
    }
}

/// An ordered sequence of route coordinates.
pub type Polyline = Vec<GeoPoint>;
