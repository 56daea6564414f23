//! Audio output for frame playback.
//!
//! This module provides simple tone synthesis and audio output via rodio.
//! It supports:
//! - Pitch tokens rendered as enveloped triangle-wave voices
//! - Chords started on one shared sample
//! - Live output through the default audio device
//! - WAV export functionality

pub mod engine;
pub mod export;
pub mod tone;

pub use engine::{AudioEngine, RodioOutputFactory};
pub use export::export_to_wav;
pub use tone::{OutputFactory, SilentOutput, ToneOutput, VoiceBank, SAMPLE_RATE};
