use crate::models::{DeviationSegment, GeoPoint, IndexedPosition, InterpolatedPosition, Polyline};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Result of projecting a point onto a polyline.
#[derive(Debug, Clone, Copy)]
pub struct ClosestPoint {
    pub point: GeoPoint,
    pub distance_m: f64,
    pub segment_index: usize,
}

/// Haversine distance between two GPS points in meters.
pub fn haversine_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();

    EARTH_RADIUS_M * c
}

/// Initial bearing from `a` to `b` in degrees, normalized to `[0, 360)`.
pub fn initial_bearing(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Prefix sum of consecutive haversine distances. First entry is 0; the
/// output has the same length as the input and is non-decreasing.
pub fn compute_cumulative_distances(gps: &[IndexedPosition]) -> Vec<f64> {
    let mut distances = Vec::with_capacity(gps.len());
    let mut total = 0.0;

    for (i, sample) in gps.iter().enumerate() {
        if i > 0 {
            total += haversine_distance(gps[i - 1].point(), sample.point());
        }
        distances.push(total);
    }

    distances
}

/// Find the last GPS sample at or before `time_ms`.
///
/// Returns `None` when `time_ms` precedes the first sample, and the last
/// index when it is at or past the final sample. O(log n) over the sorted
/// track.
pub fn binary_search_position(gps: &[IndexedPosition], time_ms: i64) -> Option<usize> {
    if gps.is_empty() || time_ms < gps[0].timestamp_ms {
        return None;
    }
    let last = gps.len() - 1;
    if time_ms >= gps[last].timestamp_ms {
        return Some(last);
    }

    let mut lo = 0;
    let mut hi = last;
    while lo < hi {
        // Round up so the loop always narrows toward the floor index.
        let mid = (lo + hi + 1) / 2;
        if gps[mid].timestamp_ms <= time_ms {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    Some(lo)
}

/// Linearly interpolate the vehicle state between `gps[index]` and its
/// successor at `time_ms`.
///
/// Heading is interpolated along the circular shortest path, so 350° -> 10°
/// sweeps through north rather than backwards through 180°. When `index` is
/// the last sample the position is returned unmodified with `ratio = 1`.
pub fn interpolate_position(
    time_ms: i64,
    gps: &[IndexedPosition],
    index: usize,
) -> InterpolatedPosition {
    let current = &gps[index];

    let Some(next) = gps.get(index + 1) else {
        return InterpolatedPosition {
            lat: current.lat,
            lng: current.lng,
            heading: current.heading,
            speed: current.speed,
            ratio: 1.0,
        };
    };

    let span = (next.timestamp_ms - current.timestamp_ms) as f64;
    let ratio = if span > 0.0 {
        ((time_ms - current.timestamp_ms) as f64 / span).clamp(0.0, 1.0)
    } else {
        0.0
    };

    // Shortest angular difference in (-180, 180].
    let mut heading_delta = next.heading - current.heading;
    if heading_delta > 180.0 {
        heading_delta -= 360.0;
    } else if heading_delta < -180.0 {
        heading_delta += 360.0;
    }

    InterpolatedPosition {
        lat: current.lat + (next.lat - current.lat) * ratio,
        lng: current.lng + (next.lng - current.lng) * ratio,
        heading: (current.heading + heading_delta * ratio + 360.0) % 360.0,
        speed: current.speed + (next.speed - current.speed) * ratio,
        ratio,
    }
}

/// Project `point` onto every segment of `polyline` and keep the global
/// minimum.
///
/// Returns `None` for an empty polyline; a single-point polyline measures
/// straight to that point with segment index 0.
pub fn closest_point_on_polyline(point: GeoPoint, polyline: &Polyline) -> Option<ClosestPoint> {
    let first = polyline.first()?;

    let mut best = ClosestPoint {
        point: *first,
        distance_m: haversine_distance(point, *first),
        segment_index: 0,
    };

    for (i, segment) in polyline.windows(2).enumerate() {
        let projected = project_onto_segment(point, segment[0], segment[1]);
        let distance = haversine_distance(point, projected);
        if distance < best.distance_m {
            best = ClosestPoint {
                point: projected,
                distance_m: distance,
                segment_index: i,
            };
        }
    }

    Some(best)
}

/// Project onto the segment `a -> b` in a local equirectangular frame.
/// Adequate at route-segment scale; the threshold comparisons downstream are
/// in the tens of meters.
fn project_onto_segment(p: GeoPoint, a: GeoPoint, b: GeoPoint) -> GeoPoint {
    let cos_lat = (a.lat.to_radians()).cos();
    let px = (p.lng - a.lng) * cos_lat;
    let py = p.lat - a.lat;
    let bx = (b.lng - a.lng) * cos_lat;
    let by = b.lat - a.lat;

    let seg_len_sq = bx * bx + by * by;
    if seg_len_sq == 0.0 {
        return a;
    }

    let t = ((px * bx + py * by) / seg_len_sq).clamp(0.0, 1.0);
    GeoPoint::new(a.lat + by * t, a.lng + (b.lng - a.lng) * t)
}

/// Run-length encode "off the planned route" over the actual GPS track.
///
/// A single greedy pass: while the closest-point distance exceeds the
/// threshold the current segment is extended, tracking the max and the sum of
/// the deviation; the moment it drops back to or under the threshold the
/// segment is closed and emitted. Deliberately local: no smoothing and no
/// minimum-length filter, so a single off-route sample yields a one-sample
/// segment.
pub fn detect_deviations(
    actual: &[IndexedPosition],
    planned: &Polyline,
    threshold_m: f64,
) -> Vec<DeviationSegment> {
    if planned.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut open: Option<DeviationSegment> = None;

    for (i, sample) in actual.iter().enumerate() {
        let distance = match closest_point_on_polyline(sample.point(), planned) {
            Some(closest) => closest.distance_m,
            None => break,
        };

        if distance > threshold_m {
            let segment = open.get_or_insert_with(|| DeviationSegment {
                start_index: i,
                end_index: i,
                start_time_ms: sample.timestamp_ms,
                end_time_ms: sample.timestamp_ms,
                points: Vec::new(),
                max_deviation_m: 0.0,
                total_deviation_m: 0.0,
            });
            segment.end_index = i;
            segment.end_time_ms = sample.timestamp_ms;
            segment.points.push(sample.point());
            segment.max_deviation_m = segment.max_deviation_m.max(distance);
            segment.total_deviation_m += distance;
        } else if let Some(segment) = open.take() {
            segments.push(segment);
        }
    }

    if let Some(segment) = open {
        segments.push(segment);
    }

    segments
}

/// Interval-based downsampling that bounds preprocessing and rendering cost
/// on oversized traces.
///
/// Deterministic for a given input; always keeps the original first and last
/// sample, so the output can exceed `max_points` by at most one.
pub fn downsample_positions(
    positions: Vec<IndexedPosition>,
    max_points: usize,
) -> Vec<IndexedPosition> {
    let cap = max_points.max(2);
    if positions.len() <= cap {
        return positions;
    }

    // Ceiling division keeps the sampled count at or under the cap.
    let interval = (positions.len() + cap - 1) / cap;
    let last_index = positions.len() - 1;

    let mut kept: Vec<IndexedPosition> = positions
        .iter()
        .step_by(interval)
        .copied()
        .collect();

    if kept.last().map(|p| p.timestamp_ms) != Some(positions[last_index].timestamp_ms) {
        kept.push(positions[last_index]);
    }

    kept
}
