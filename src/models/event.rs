use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::GeoPoint;

/// Event kinds the playback engine understands.
///
/// Raw events arrive with free-form string kinds; anything that does not map
/// to one of these is dropped during preprocessing. `Deviation` is never
/// supplied by the data service, only synthesized from route-deviation
/// detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Arrival,
    Departure,
    Delay,
    Proof,
    Deviation,
}

impl EventKind {
    /// Map a raw event kind string. Returns `None` for kinds the engine
    /// does not replay (those are silently skipped, not an error).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "arrival" | "facility_arrival" => Some(EventKind::Arrival),
            "departure" | "facility_departure" => Some(EventKind::Departure),
            "delay" | "delay_reported" => Some(EventKind::Delay),
            "proof" | "proof_of_delivery" => Some(EventKind::Proof),
            "deviation" | "route_deviation" => Some(EventKind::Deviation),
            _ => None,
        }
    }
}

/// A discrete event exactly as the data service supplies it.
///
/// GPS pings travel on the same feed as delivery events; `event_type`
/// distinguishes them and `metadata` carries per-kind extras (accuracy for
/// pings, signature references for proofs, and so on).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub location: Option<GeoPoint>,
    pub event_type: String,
    #[serde(default)]
    pub metadata: Value,
}

impl RawEvent {
    /// True for the position-sample kinds that feed the GPS track rather
    /// than the event timeline.
    pub fn is_gps_ping(&self) -> bool {
        matches!(self.event_type.as_str(), "gps" | "gps_ping" | "position")
    }
}

/// A re-typed event on the playback timeline.
///
/// An event is active at time `t` when `start_time_ms <= t <= end`, where a
/// missing end collapses to the start (instantaneous event).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedEvent {
    pub id: String,
    pub kind: EventKind,
    pub start_time_ms: i64,
    pub end_time_ms: Option<i64>,
    pub location: GeoPoint,
    #[serde(default)]
    pub metadata: Value,
}

impl IndexedEvent {
    /// End of the activation window; instantaneous events end when they start.
    pub fn effective_end_ms(&self) -> i64 {
        self.end_time_ms.unwrap_or(self.start_time_ms)
    }

    pub fn is_active_at(&self, time_ms: i64) -> bool {
        self.start_time_ms <= time_ms && time_ms <= self.effective_end_ms()
    }
}
