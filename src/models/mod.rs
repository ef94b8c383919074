mod event;
mod geo;
mod position;
mod stop;
mod trip;

pub use event::{EventKind, IndexedEvent, RawEvent};
pub use geo::{GeoPoint, Polyline};
pub use position::{IndexedPosition, InterpolatedPosition};
pub use stop::{EnhancedStop, StopAnalytics, StopStatus};
pub use trip::{DeviationSegment, NormalizedTrip, RawPlaybackData, TimeRange, TripAnalytics};
