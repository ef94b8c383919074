use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::models::{Polyline, RawPlaybackData};

/// JSON ingestion boundary for playback payloads.
///
/// The data-access layer delivers one `RawPlaybackData` document per trip
/// (and, optionally, a planned route as an array of `[lng, lat]` pairs);
/// this is the only place the engine touches serialization of its input.
pub struct PlaybackDataLoader;

impl PlaybackDataLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse a playback payload from a JSON file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<RawPlaybackData> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read playback data file: {:?}", path.as_ref()))?;
        self.parse(&content)
    }

    /// Parse a playback payload from a JSON string.
    pub fn parse(&self, json: &str) -> Result<RawPlaybackData> {
        serde_json::from_str(json).context("Failed to parse playback data payload")
    }

    /// Parse a planned route delivered as an array of `[lng, lat]` pairs.
    pub fn parse_route(&self, json: &str) -> Result<Polyline> {
        serde_json::from_str(json).context("Failed to parse planned route")
    }
}

impl Default for PlaybackDataLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_payload() {
        let json = r#"{
            "time_range": {
                "start": "2026-03-01T08:00:00Z",
                "end": "2026-03-01T08:10:00Z"
            },
            "events": [
                {
                    "id": "p1",
                    "timestamp": "2026-03-01T08:00:05Z",
                    "location": [-74.0, 40.7],
                    "event_type": "gps_ping",
                    "metadata": { "accuracy": 4.2 }
                },
                {
                    "id": "e1",
                    "timestamp": "2026-03-01T08:03:00Z",
                    "location": [-74.001, 40.701],
                    "event_type": "arrival"
                }
            ],
            "stop_analytics": [
                {
                    "id": "s1",
                    "facility_id": "fac-1",
                    "facility_name": "North Depot",
                    "arrival_time": "2026-03-01T08:03:00Z",
                    "departure_time": "2026-03-01T08:06:00Z",
                    "delayed": false,
                    "location": [-74.001, 40.701]
                }
            ],
            "analytics": { "batch_id": "batch-3", "total_distance_m": 1234.5 }
        }"#;

        let raw = PlaybackDataLoader::new().parse(json).unwrap();
        assert!(raw.time_range.is_some());
        assert_eq!(raw.events.len(), 2);
        assert!(raw.events[0].is_gps_ping());
        assert_eq!(raw.events[0].location.unwrap().lat, 40.7);
        assert_eq!(raw.stop_analytics.len(), 1);
        assert_eq!(raw.analytics.unwrap().batch_id.as_deref(), Some("batch-3"));
    }

    #[test]
    fn test_parse_minimal_payload() {
        // The loader accepts structurally valid but unreplayable payloads;
        // deciding they cannot be replayed is the preprocessor's call.
        let raw = PlaybackDataLoader::new()
            .parse(r#"{ "time_range": null, "events": [], "analytics": null }"#)
            .unwrap();
        assert!(raw.time_range.is_none());
        assert!(raw.events.is_empty());
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let result = PlaybackDataLoader::new().parse("{ not json");
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Failed to parse playback data payload"));
    }

    #[test]
    fn test_parse_route() {
        let route = PlaybackDataLoader::new()
            .parse_route("[[-74.0, 40.7], [-74.01, 40.71]]")
            .unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(route[1].lng, -74.01);
    }
}
