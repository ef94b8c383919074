//! Trip playback engine.
//!
//! Reconstructs a vehicle's historical trip from sparse GPS pings and
//! discrete delivery events into a smooth, seekable timeline. The pipeline:
//! raw payload -> [`TripPreprocessor`] -> immutable [`NormalizedTrip`] ->
//! [`apply`] advances the playback clock -> [`render_snapshot`] derives the
//! frame the map paints.
//!
//! Rendering, persistence and live tracking live elsewhere; this crate owns
//! preprocessing, the pure geometry/query kernel, the playback state machine
//! and the per-tick derivation.

pub mod models;
pub mod services;

pub use models::{NormalizedTrip, RawPlaybackData};
pub use services::{apply, render_snapshot, PlaybackAction, PlaybackState, TripPreprocessor};
