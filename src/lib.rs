//! sheetplay - Plays analysed sheet music in the terminal.
//!
//! This library provides the playback engine: score ingestion, a tone
//! synthesizer, a frame scheduler and a page view renderer.

pub mod app;
pub mod audio;
pub mod playback;
pub mod score;
pub mod ui;
pub mod view;

// Re-export commonly used types
pub use app::App;
pub use audio::{engine::AudioEngine, export::export_to_wav};
pub use playback::{PlaybackEvent, PlaybackState, Scheduler};
pub use score::{AnalysisResult, Frame, FrameId, PageRect};
pub use view::ViewRenderer;
