use crate::models::{IndexedEvent, NormalizedTrip};
use crate::services::geometry::{binary_search_position, haversine_distance, interpolate_position};

/// Everything the map and timeline need to paint one frame.
#[derive(Debug, Clone)]
pub struct RenderSnapshot<'a> {
    pub lat: f64,
    pub lng: f64,
    pub heading: f64,
    pub speed: f64,
    /// Position within the bracketing GPS segment, `[0, 1]`.
    pub ratio: f64,
    /// Distance driven up to this instant, in meters.
    pub distance_traveled_m: f64,
    /// Events whose activation window contains this instant.
    pub active_events: Vec<&'a IndexedEvent>,
}

/// Derive the renderable state for `current_time_ms`.
///
/// Recomputed from scratch on every tick, never cached across ticks: the
/// distance comes from the cumulative array plus the interpolated partial
/// segment rather than a running accumulator, so a seek lands on exactly the
/// same frame sequential playback would have produced. Returns `None` only
/// for a trip with an empty GPS track, which the preprocessor never emits.
pub fn render_snapshot(trip: &NormalizedTrip, current_time_ms: i64) -> Option<RenderSnapshot<'_>> {
    let gps = &trip.gps;
    if gps.is_empty() {
        return None;
    }

    // Before the first fix the vehicle pins to it with nothing traveled.
    let Some(index) = binary_search_position(gps, current_time_ms) else {
        let first = &gps[0];
        return Some(RenderSnapshot {
            lat: first.lat,
            lng: first.lng,
            heading: first.heading,
            speed: 0.0,
            ratio: 0.0,
            distance_traveled_m: 0.0,
            active_events: active_events(trip, current_time_ms),
        });
    };

    let position = interpolate_position(current_time_ms, gps, index);

    let partial = match gps.get(index + 1) {
        Some(next) => position.ratio * haversine_distance(gps[index].point(), next.point()),
        None => 0.0,
    };
    let distance_traveled_m = trip.cumulative_distances.get(index).copied().unwrap_or(0.0) + partial;

    Some(RenderSnapshot {
        lat: position.lat,
        lng: position.lng,
        heading: position.heading,
        speed: position.speed,
        ratio: position.ratio,
        distance_traveled_m,
        active_events: active_events(trip, current_time_ms),
    })
}

/// Events active at `time_ms`: `start <= t <= end`, where a missing end
/// collapses to the start. The list is start-time sorted, so the scan stops
/// at the first event that has not started yet.
pub fn active_events(trip: &NormalizedTrip, time_ms: i64) -> Vec<&IndexedEvent> {
    trip.events
        .iter()
        .take_while(|e| e.start_time_ms <= time_ms)
        .filter(|e| e.is_active_at(time_ms))
        .collect()
}

/// Events whose activation starts at exactly `time_ms`, answered through the
/// start map without scanning the timeline.
pub fn events_at_instant(trip: &NormalizedTrip, time_ms: i64) -> Vec<&IndexedEvent> {
    trip.event_start_map
        .get(&time_ms)
        .map(|indices| indices.iter().map(|&i| &trip.events[i]).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventKind, GeoPoint, IndexedPosition, TripAnalytics};

    fn make_position(timestamp_ms: i64, lat: f64, lng: f64) -> IndexedPosition {
        IndexedPosition {
            timestamp_ms,
            lat,
            lng,
            heading: 0.0,
            speed: 0.0,
            accuracy: None,
        }
    }

    fn make_event(id: &str, start_ms: i64, end_ms: Option<i64>) -> IndexedEvent {
        IndexedEvent {
            id: id.into(),
            kind: EventKind::Delay,
            start_time_ms: start_ms,
            end_time_ms: end_ms,
            location: GeoPoint::new(40.0, -74.0),
            metadata: serde_json::Value::Null,
        }
    }

    fn make_trip(gps: Vec<IndexedPosition>, events: Vec<IndexedEvent>) -> NormalizedTrip {
        use crate::services::geometry::compute_cumulative_distances;

        let cumulative_distances = compute_cumulative_distances(&gps);
        let mut trip = NormalizedTrip {
            id: "t1".into(),
            batch_id: None,
            start_time_ms: gps.first().map(|p| p.timestamp_ms).unwrap_or(0),
            end_time_ms: gps.last().map(|p| p.timestamp_ms).unwrap_or(0),
            gps,
            events,
            stops: vec![],
            planned_route: None,
            analytics: TripAnalytics::default(),
            cumulative_distances,
            event_start_map: Default::default(),
            event_end_map: Default::default(),
        };
        trip.rebuild_event_maps();
        trip
    }

    #[test]
    fn test_sparse_trip_interpolates_midpoint() {
        // Ten-minute trip, one fix at each end, nothing in between.
        let trip = make_trip(
            vec![make_position(0, 40.0, -74.0), make_position(600_000, 40.01, -74.01)],
            vec![],
        );
        let snap = render_snapshot(&trip, 300_000).unwrap();

        assert!((snap.ratio - 0.5).abs() < 1e-9);
        assert!((snap.lat - 40.005).abs() < 1e-9);
        assert!((snap.lng - (-74.005)).abs() < 1e-9);
        // Midpoint of the only segment: half its length traveled.
        assert!((snap.distance_traveled_m - trip.total_distance_m() / 2.0).abs() < 1.0);
    }

    #[test]
    fn test_distance_is_cumulative_plus_partial() {
        let trip = make_trip(
            vec![
                make_position(0, 40.0, -74.0),
                make_position(60_000, 40.001, -74.0),
                make_position(120_000, 40.002, -74.0),
            ],
            vec![],
        );

        // Quarter of the way into the second segment.
        let snap = render_snapshot(&trip, 75_000).unwrap();
        let segment = haversine_distance(trip.gps[1].point(), trip.gps[2].point());
        let expected = trip.cumulative_distances[1] + 0.25 * segment;
        assert!((snap.distance_traveled_m - expected).abs() < 1e-6);

        // Seeking straight there matches sequential playback: recompute at
        // the end and compare with the final cumulative total.
        let end = render_snapshot(&trip, 120_000).unwrap();
        assert!((end.distance_traveled_m - trip.total_distance_m()).abs() < 1e-9);
        assert_eq!(end.ratio, 1.0);
    }

    #[test]
    fn test_before_first_fix_pins_to_it() {
        let trip = make_trip(
            vec![make_position(10_000, 40.0, -74.0), make_position(20_000, 40.001, -74.0)],
            vec![],
        );
        let snap = render_snapshot(&trip, 500).unwrap();
        assert_eq!(snap.lat, 40.0);
        assert_eq!(snap.distance_traveled_m, 0.0);
        assert_eq!(snap.ratio, 0.0);
    }

    #[test]
    fn test_active_event_window() {
        let trip = make_trip(
            vec![make_position(0, 40.0, -74.0), make_position(100_000, 40.001, -74.0)],
            vec![
                make_event("windowed", 10_000, Some(30_000)),
                make_event("instant", 20_000, None),
                make_event("later", 90_000, None),
            ],
        );

        let ids = |t| {
            render_snapshot(&trip, t)
                .unwrap()
                .active_events
                .iter()
                .map(|e| e.id.clone())
                .collect::<Vec<_>>()
        };

        assert!(ids(9_999).is_empty());
        assert_eq!(ids(10_000), vec!["windowed"]);
        assert_eq!(ids(20_000), vec!["windowed", "instant"]);
        assert_eq!(ids(20_001), vec!["windowed"]);
        assert_eq!(ids(30_000), vec!["windowed"]);
        assert!(ids(30_001).is_empty());
        assert_eq!(ids(90_000), vec!["later"]);
    }

    #[test]
    fn test_events_at_instant_uses_start_map() {
        let trip = make_trip(
            vec![make_position(0, 40.0, -74.0)],
            vec![
                make_event("a", 10_000, Some(30_000)),
                make_event("b", 10_000, None),
            ],
        );
        let hits = events_at_instant(&trip, 10_000);
        assert_eq!(hits.len(), 2);
        assert!(events_at_instant(&trip, 10_001).is_empty());
    }
}
