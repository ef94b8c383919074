use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{EnhancedStop, GeoPoint, IndexedEvent, IndexedPosition, Polyline, RawEvent, StopAnalytics};

/// The declared playback window for a trip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Trip-level aggregate analytics, passed through to the timeline header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TripAnalytics {
    pub batch_id: Option<String>,
    #[serde(default)]
    pub total_distance_m: f64,
    #[serde(default)]
    pub total_stops: u32,
    #[serde(default)]
    pub completed_stops: u32,
    #[serde(default)]
    pub delayed_stops: u32,
    /// Anything else the analytics service attaches; not interpreted here.
    #[serde(default)]
    pub extra: Value,
}

/// Everything the data-access layer hands over for one trip. Read-only input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPlaybackData {
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub events: Vec<RawEvent>,
    #[serde(default)]
    pub stop_analytics: Vec<StopAnalytics>,
    pub analytics: Option<TripAnalytics>,
}

/// A contiguous run of GPS samples off the planned route.
///
/// Indices refer to the trip's `gps` array. Magnitudes are meters:
/// `max_deviation_m` is the worst single sample, `total_deviation_m` the sum
/// over the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviationSegment {
    pub start_index: usize,
    pub end_index: usize,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    pub points: Vec<GeoPoint>,
    pub max_deviation_m: f64,
    pub total_deviation_m: f64,
}

/// The preprocessed, immutable unit of one playback session.
///
/// Built once by the preprocessor and never mutated afterwards; the playback
/// state machine owns the only high-frequency mutable value (`current_time`)
/// separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedTrip {
    pub id: String,
    pub batch_id: Option<String>,
    pub start_time_ms: i64,
    pub end_time_ms: i64,
    /// Strictly increasing by timestamp.
    pub gps: Vec<IndexedPosition>,
    /// Sorted by start time, synthetic deviation events merged in.
    pub events: Vec<IndexedEvent>,
    pub stops: Vec<EnhancedStop>,
    pub planned_route: Option<Polyline>,
    pub analytics: TripAnalytics,
    /// Same length as `gps`; `[0] == 0.0`, non-decreasing. Meters.
    pub cumulative_distances: Vec<f64>,
    /// Exact start timestamp -> indices into `events`.
    pub event_start_map: HashMap<i64, Vec<usize>>,
    /// Exact effective-end timestamp -> indices into `events`.
    pub event_end_map: HashMap<i64, Vec<usize>>,
}

impl NormalizedTrip {
    pub fn duration_ms(&self) -> i64 {
        self.end_time_ms - self.start_time_ms
    }

    /// Total driven distance over the retained GPS track, in meters.
    pub fn total_distance_m(&self) -> f64 {
        self.cumulative_distances.last().copied().unwrap_or(0.0)
    }

    pub fn find_event(&self, event_id: &str) -> Option<&IndexedEvent> {
        self.events.iter().find(|e| e.id == event_id)
    }

    pub fn find_stop(&self, stop_id: &str) -> Option<&EnhancedStop> {
        self.stops.iter().find(|s| s.id == stop_id)
    }

    /// Rebuild both activation maps from the current event list. Called by
    /// the preprocessor after merging synthetic events; the maps are keyed by
    /// exact timestamps so the timeline can answer "what fires at this
    /// instant" without scanning.
    pub fn rebuild_event_maps(&mut self) {
        self.event_start_map.clear();
        self.event_end_map.clear();
        for (i, event) in self.events.iter().enumerate() {
            self.event_start_map
                .entry(event.start_time_ms)
                .or_default()
                .push(i);
            self.event_end_map
                .entry(event.effective_end_ms())
                .or_default()
                .push(i);
        }
    }
}
