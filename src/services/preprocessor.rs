use serde_json::json;
use tracing::{debug, warn};

use crate::models::{
    EnhancedStop, EventKind, GeoPoint, IndexedEvent, IndexedPosition, NormalizedTrip, Polyline,
    RawPlaybackData,
};
use crate::services::geometry::{
    binary_search_position, compute_cumulative_distances, detect_deviations, downsample_positions,
    haversine_distance, initial_bearing,
};

/// Turns one trip's raw event/analytics payload into a validated,
/// time-sorted, enriched `NormalizedTrip`.
///
/// Thresholds are fixed at construction so one preprocessor can be reused
/// across trips with consistent behavior.
pub struct TripPreprocessor {
    /// Distance from the planned route beyond which a sample counts as
    /// off-route.
    deviation_threshold_m: f64,
    /// Hard cap on retained GPS samples; oversized traces are downsampled.
    max_gps_points: usize,
    /// Tolerated slack between the declared time range and the first/last
    /// GPS sample before a data-quality warning is emitted.
    boundary_tolerance_ms: i64,
    /// Inter-sample gap beyond which a GPS-gap warning is emitted.
    gap_warning_ms: i64,
}

impl Default for TripPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TripPreprocessor {
    pub fn new() -> Self {
        Self {
            deviation_threshold_m: 100.0,
            max_gps_points: 50_000,
            boundary_tolerance_ms: 60_000,
            gap_warning_ms: 120_000,
        }
    }

    pub fn with_deviation_threshold(mut self, threshold_m: f64) -> Self {
        self.deviation_threshold_m = threshold_m;
        self
    }

    pub fn with_max_gps_points(mut self, max_points: usize) -> Self {
        self.max_gps_points = max_points;
        self
    }

    /// Build the immutable playback record for one trip.
    ///
    /// Returns `None` when the trip cannot be replayed at all: no declared
    /// time range, no events, no analytics, or no valid GPS fix after
    /// filtering. Data-quality problems short of that are logged and
    /// processing continues with best-effort data.
    pub fn preprocess(
        &self,
        raw: &RawPlaybackData,
        trip_id: &str,
        planned_route: Option<Polyline>,
    ) -> Option<NormalizedTrip> {
        let Some(range) = raw.time_range else {
            warn!(trip_id, "playback data has no time range, nothing to replay");
            return None;
        };
        if raw.events.is_empty() {
            warn!(trip_id, "playback data has zero events, nothing to replay");
            return None;
        }
        let Some(analytics) = raw.analytics.clone() else {
            warn!(trip_id, "playback data has no trip analytics, nothing to replay");
            return None;
        };

        let start_time_ms = range.start.timestamp_millis();
        let end_time_ms = range.end.timestamp_millis();

        let gps = self.build_gps_track(raw, trip_id);
        if gps.is_empty() {
            warn!(trip_id, "no valid GPS positions after filtering, nothing to replay");
            return None;
        }

        self.check_track_quality(&gps, trip_id, start_time_ms, end_time_ms);

        let mut events = self.index_events(raw, trip_id, start_time_ms, end_time_ms);
        let cumulative_distances = compute_cumulative_distances(&gps);
        let stops = self.enhance_stops(raw, &gps);

        let planned_route = planned_route.filter(|route| !route.is_empty());
        if let Some(route) = &planned_route {
            let segments = detect_deviations(&gps, route, self.deviation_threshold_m);
            debug!(trip_id, count = segments.len(), "route deviation segments detected");
            for segment in &segments {
                events.push(IndexedEvent {
                    // Deterministic id: reruns over identical input produce
                    // identical trips, which golden-output tests rely on.
                    id: format!("{trip_id}-deviation-{}", segment.start_index),
                    kind: EventKind::Deviation,
                    start_time_ms: segment.start_time_ms,
                    end_time_ms: Some(segment.end_time_ms),
                    location: segment
                        .points
                        .first()
                        .copied()
                        .unwrap_or_else(|| gps[segment.start_index].point()),
                    metadata: json!({
                        "max_deviation_m": segment.max_deviation_m,
                        "total_deviation_m": segment.total_deviation_m,
                        "sample_count": segment.points.len(),
                    }),
                });
            }
            events.sort_by_key(|e| e.start_time_ms);
        }

        let mut trip = NormalizedTrip {
            id: trip_id.to_string(),
            batch_id: analytics.batch_id.clone(),
            start_time_ms,
            end_time_ms,
            gps,
            events,
            stops,
            planned_route,
            analytics,
            cumulative_distances,
            event_start_map: Default::default(),
            event_end_map: Default::default(),
        };
        trip.rebuild_event_maps();
        Some(trip)
    }

    /// Extract, filter, order and enrich the GPS track.
    fn build_gps_track(&self, raw: &RawPlaybackData, trip_id: &str) -> Vec<IndexedPosition> {
        let mut dropped = 0usize;
        let mut positions: Vec<IndexedPosition> = raw
            .events
            .iter()
            .filter(|e| e.is_gps_ping())
            .filter_map(|e| {
                let point = e.location.filter(GeoPoint::is_plottable).or_else(|| {
                    dropped += 1;
                    None
                })?;
                Some(IndexedPosition {
                    timestamp_ms: e.timestamp.timestamp_millis(),
                    lat: point.lat,
                    lng: point.lng,
                    heading: 0.0,
                    speed: 0.0,
                    accuracy: e.metadata.get("accuracy").and_then(|v| v.as_f64()),
                })
            })
            .collect();

        if dropped > 0 {
            debug!(trip_id, dropped, "discarded unplottable GPS fixes");
        }

        positions.sort_by_key(|p| p.timestamp_ms);
        // Exact-timestamp collisions keep the first occurrence; the sort is
        // stable so feed order decides.
        positions.dedup_by_key(|p| p.timestamp_ms);

        let positions = downsample_positions(positions, self.max_gps_points);
        derive_kinematics(positions)
    }

    /// Non-fatal data-quality checks: warn and continue.
    fn check_track_quality(
        &self,
        gps: &[IndexedPosition],
        trip_id: &str,
        start_time_ms: i64,
        end_time_ms: i64,
    ) {
        let first = gps[0].timestamp_ms;
        let last = gps[gps.len() - 1].timestamp_ms;

        if first < start_time_ms - self.boundary_tolerance_ms {
            warn!(
                trip_id,
                overshoot_ms = start_time_ms - first,
                "first GPS sample precedes the declared time range"
            );
        }
        if last > end_time_ms + self.boundary_tolerance_ms {
            warn!(
                trip_id,
                overshoot_ms = last - end_time_ms,
                "last GPS sample exceeds the declared time range"
            );
        }

        let mut gap_count = 0usize;
        let mut max_gap_ms = 0i64;
        for pair in gps.windows(2) {
            let gap = pair[1].timestamp_ms - pair[0].timestamp_ms;
            if gap > self.gap_warning_ms {
                gap_count += 1;
                max_gap_ms = max_gap_ms.max(gap);
            }
        }
        if gap_count > 0 {
            warn!(trip_id, gap_count, max_gap_ms, "large gaps in GPS coverage");
        }
    }

    /// Re-type the discrete (non-ping) events onto the playback timeline.
    /// Unrecognized kinds are skipped silently; kinds without a usable
    /// location cannot be placed on the map and are skipped too.
    fn index_events(
        &self,
        raw: &RawPlaybackData,
        trip_id: &str,
        start_time_ms: i64,
        end_time_ms: i64,
    ) -> Vec<IndexedEvent> {
        let mut out_of_range = 0usize;
        let mut events: Vec<IndexedEvent> = raw
            .events
            .iter()
            .filter(|e| !e.is_gps_ping())
            .filter_map(|e| {
                let kind = EventKind::parse(&e.event_type)?;
                let location = e.location.filter(GeoPoint::is_plottable)?;
                let timestamp_ms = e.timestamp.timestamp_millis();
                if timestamp_ms < start_time_ms || timestamp_ms > end_time_ms {
                    out_of_range += 1;
                }
                let end = e
                    .metadata
                    .get("duration_ms")
                    .and_then(|v| v.as_i64())
                    .map(|d| timestamp_ms + d.max(0));
                Some(IndexedEvent {
                    id: e.id.clone(),
                    kind,
                    start_time_ms: timestamp_ms,
                    end_time_ms: end,
                    location,
                    metadata: e.metadata.clone(),
                })
            })
            .collect();

        if out_of_range > 0 {
            // Tolerated boundary artifact: the event stays on the timeline.
            warn!(trip_id, out_of_range, "events fall outside the declared time range");
        }

        events.sort_by_key(|e| e.start_time_ms);
        events
    }

    /// Augment stop analytics with the GPS fix nearest in time to arrival
    /// and the derived status.
    fn enhance_stops(&self, raw: &RawPlaybackData, gps: &[IndexedPosition]) -> Vec<EnhancedStop> {
        raw.stop_analytics
            .iter()
            .map(|stop| {
                let arrival_time_ms = stop.arrival_time.timestamp_millis();
                EnhancedStop {
                    id: stop.id.clone(),
                    facility_id: stop.facility_id.clone(),
                    facility_name: stop.facility_name.clone(),
                    arrival_time_ms,
                    departure_time_ms: stop.departure_time.map(|t| t.timestamp_millis()),
                    location: stop.location,
                    nearest_position: nearest_position(gps, arrival_time_ms),
                    status: EnhancedStop::derive_status(stop),
                }
            })
            .collect()
    }
}

/// Derive heading and speed for every consecutive pair. The first sample has
/// nothing to derive from and keeps zeros.
fn derive_kinematics(mut positions: Vec<IndexedPosition>) -> Vec<IndexedPosition> {
    for i in 1..positions.len() {
        let prev = positions[i - 1];
        let curr = positions[i];
        let elapsed_s = (curr.timestamp_ms - prev.timestamp_ms) as f64 / 1000.0;

        positions[i].heading = initial_bearing(prev.point(), curr.point());
        positions[i].speed = if elapsed_s > 0.0 {
            haversine_distance(prev.point(), curr.point()) / elapsed_s
        } else {
            0.0
        };
    }
    positions
}

/// GPS sample nearest in time to `time_ms`, as a map point.
fn nearest_position(gps: &[IndexedPosition], time_ms: i64) -> Option<GeoPoint> {
    let floor = match binary_search_position(gps, time_ms) {
        Some(i) => i,
        None => return gps.first().map(IndexedPosition::point),
    };
    let best = match gps.get(floor + 1) {
        Some(next)
            if (next.timestamp_ms - time_ms).abs() < (time_ms - gps[floor].timestamp_ms).abs() =>
        {
            next
        }
        _ => &gps[floor],
    };
    Some(best.point())
}
