use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GeoPoint;

/// A facility-visit analytics record as supplied by the data service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopAnalytics {
    pub id: String,
    pub facility_id: Option<String>,
    pub facility_name: Option<String>,
    pub arrival_time: DateTime<Utc>,
    pub departure_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delayed: bool,
    pub location: Option<GeoPoint>,
}

/// Derived outcome of a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    Completed,
    Delayed,
    Missed,
}

/// A stop record enriched for the timeline view: the raw analytics plus the
/// GPS sample nearest in time to the arrival and a derived status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedStop {
    pub id: String,
    pub facility_id: Option<String>,
    pub facility_name: Option<String>,
    pub arrival_time_ms: i64,
    pub departure_time_ms: Option<i64>,
    pub location: Option<GeoPoint>,
    /// Nearest-in-time GPS fix, used when the record itself has no location.
    pub nearest_position: Option<GeoPoint>,
    pub status: StopStatus,
}

impl EnhancedStop {
    /// Missed when no departure was ever recorded, delayed when the source
    /// flags it, otherwise completed.
    pub fn derive_status(analytics: &StopAnalytics) -> StopStatus {
        if analytics.departure_time.is_none() {
            StopStatus::Missed
        } else if analytics.delayed {
            StopStatus::Delayed
        } else {
            StopStatus::Completed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_stop(departed: bool, delayed: bool) -> StopAnalytics {
        let arrival = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        StopAnalytics {
            id: "s1".into(),
            facility_id: Some("fac-9".into()),
            facility_name: Some("North Depot".into()),
            arrival_time: arrival,
            departure_time: departed.then(|| arrival + chrono::Duration::minutes(12)),
            delayed,
            location: None,
        }
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(
            EnhancedStop::derive_status(&make_stop(false, false)),
            StopStatus::Missed
        );
        // No departure wins over the delay flag.
        assert_eq!(
            EnhancedStop::derive_status(&make_stop(false, true)),
            StopStatus::Missed
        );
        assert_eq!(
            EnhancedStop::derive_status(&make_stop(true, true)),
            StopStatus::Delayed
        );
        assert_eq!(
            EnhancedStop::derive_status(&make_stop(true, false)),
            StopStatus::Completed
        );
    }
}
