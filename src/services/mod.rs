pub mod geometry;
pub mod loader;
pub mod playback;
pub mod preprocessor;
pub mod snapshot;

pub use loader::PlaybackDataLoader;
pub use playback::{apply, PlaybackAction, PlaybackSpeed, PlaybackState};
pub use preprocessor::TripPreprocessor;
pub use snapshot::{render_snapshot, RenderSnapshot};
