//! Visual side of playback: page images and the magnified frame view.

pub mod canvas;
pub mod pages;
pub mod renderer;

pub use canvas::{Canvas, PixelRect, Rgba};
pub use pages::{LoadProgress, PageError, PageImage, PageImages, PageLoader};
pub use renderer::{RenderOutcome, SkipReason, ViewRenderer, DISPLAY_HEIGHT};
