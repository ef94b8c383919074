use serde::{Deserialize, Serialize};

use crate::models::NormalizedTrip;

/// The fixed set of playback rates offered by the scrubber UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackSpeed {
    #[default]
    X1,
    X2,
    X5,
    X10,
}

impl PlaybackSpeed {
    /// Factor applied to wall-clock elapsed time on every tick.
    pub fn multiplier(&self) -> i64 {
        match self {
            PlaybackSpeed::X1 => 1,
            PlaybackSpeed::X2 => 2,
            PlaybackSpeed::X5 => 5,
            PlaybackSpeed::X10 => 10,
        }
    }
}

/// Playback session state. A plain value: callers construct it, own it, and
/// feed it through [`apply`]. Nothing else mutates `current_time_ms`.
#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    pub trip: Option<NormalizedTrip>,
    /// The single high-frequency mutable value; clamped to the trip's
    /// `[start_time_ms, end_time_ms]`, zero when no trip is loaded.
    pub current_time_ms: i64,
    pub is_playing: bool,
    pub speed: PlaybackSpeed,
    pub highlighted_event: Option<String>,
    pub highlighted_stop: Option<String>,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at_end(&self) -> bool {
        matches!(&self.trip, Some(trip) if self.current_time_ms >= trip.end_time_ms)
    }
}

/// Every transition the playback view can request.
#[derive(Debug, Clone)]
pub enum PlaybackAction {
    /// Load a freshly preprocessed trip: rewind to its start, pause, and
    /// drop any highlight from the previous session.
    LoadTrip(NormalizedTrip),
    /// Drop the current trip entirely (user closed playback or picked a
    /// different trip before its data arrived).
    ClearTrip,
    /// Absolute seek. Clamped to the trip bounds; reaching the end pauses.
    SetCurrentTime(i64),
    TogglePlayPause,
    SetSpeed(PlaybackSpeed),
    /// Seek to an event's start, highlight it, and pause.
    JumpToEvent(String),
    /// Seek to a stop's arrival, highlight it, and pause.
    JumpToStop(String),
    SkipForward(i64),
    SkipBackward(i64),
    /// External animation tick: wall-clock elapsed milliseconds since the
    /// previous frame. The active speed multiplier is applied here.
    Advance(i64),
}

/// Reducer over the playback state.
///
/// Takes the state by value and returns the successor; there is no other
/// mutation path, which keeps every consumer (map, scrubber, timeline) in
/// lockstep with a single source of truth.
pub fn apply(mut state: PlaybackState, action: PlaybackAction) -> PlaybackState {
    match action {
        PlaybackAction::LoadTrip(trip) => {
            state.current_time_ms = trip.start_time_ms;
            state.trip = Some(trip);
            state.is_playing = false;
            state.highlighted_event = None;
            state.highlighted_stop = None;
        }
        PlaybackAction::ClearTrip => {
            state = PlaybackState {
                speed: state.speed,
                ..PlaybackState::new()
            };
        }
        PlaybackAction::SetCurrentTime(time_ms) => {
            if let Some(trip) = &state.trip {
                let clamped = time_ms.clamp(trip.start_time_ms, trip.end_time_ms);
                state.current_time_ms = clamped;
                if clamped == trip.end_time_ms {
                    // Terminal condition of the run: auto-pause at the end.
                    state.is_playing = false;
                }
            }
        }
        PlaybackAction::TogglePlayPause => {
            if let Some(trip) = &state.trip {
                if state.current_time_ms >= trip.end_time_ms {
                    // Toggling at the end restarts the replay.
                    state.current_time_ms = trip.start_time_ms;
                    state.is_playing = true;
                } else {
                    state.is_playing = !state.is_playing;
                }
            }
        }
        PlaybackAction::SetSpeed(speed) => {
            state.speed = speed;
        }
        PlaybackAction::JumpToEvent(event_id) => {
            if let Some(target) = state
                .trip
                .as_ref()
                .and_then(|t| t.find_event(&event_id))
                .map(|e| e.start_time_ms)
            {
                state = apply(state, PlaybackAction::SetCurrentTime(target));
                state.is_playing = false;
                state.highlighted_event = Some(event_id);
                state.highlighted_stop = None;
            }
        }
        PlaybackAction::JumpToStop(stop_id) => {
            if let Some(target) = state
                .trip
                .as_ref()
                .and_then(|t| t.find_stop(&stop_id))
                .map(|s| s.arrival_time_ms)
            {
                state = apply(state, PlaybackAction::SetCurrentTime(target));
                state.is_playing = false;
                state.highlighted_stop = Some(stop_id);
                state.highlighted_event = None;
            }
        }
        PlaybackAction::SkipForward(seconds) => {
            let target = state.current_time_ms + seconds * 1000;
            state = apply(state, PlaybackAction::SetCurrentTime(target));
        }
        PlaybackAction::SkipBackward(seconds) => {
            let target = state.current_time_ms - seconds * 1000;
            state = apply(state, PlaybackAction::SetCurrentTime(target));
        }
        PlaybackAction::Advance(elapsed_ms) => {
            if state.is_playing && state.trip.is_some() {
                let target = state.current_time_ms + elapsed_ms * state.speed.multiplier();
                state = apply(state, PlaybackAction::SetCurrentTime(target));
            }
        }
    }
    state
}
