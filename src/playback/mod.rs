//! Playback scheduling.
//!
//! This module owns the frame sequence of a loaded analysis and advances
//! through it on a single cancellable timer, triggering tone output and
//! announcing frame changes to the display.

pub mod scheduler;
pub mod timer;

pub use scheduler::{
    LoadError, PlaybackError, PlaybackEvent, PlaybackState, Scheduler, MAX_SPEED, MIN_SPEED,
    NOTE_TRIM, SPEED_STEP,
};
pub use timer::{TimerHandle, TimerSlot};
