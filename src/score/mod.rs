//! Score data structures for recognized sheet-music pages.
//!
//! This module provides the local model that playback runs on: frames of
//! simultaneous pitches, their durations in beats, and the page regions and
//! note-head highlights shown while they sound. It also contains the pitch
//! math shared by the synthesizer and the offline exporter.

mod analysis;
mod frame;
mod schema;

pub use analysis::{AnalysisResult, IngestError};
pub use frame::{Frame, FrameId, PageRect, NORMALIZED_SCALE};
pub use schema::response_schema;

/// Chromatic note names within an octave, indexed by semitone.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Token that marks a silent frame or a silent note within a frame.
pub const REST_TOKEN: &str = "rest";

/// Frequency used when a pitch token cannot be parsed.
pub const DEFAULT_FREQUENCY: f64 = 440.0;

/// Smallest duration a frame may have, in beats.
/// Keeps zero or negative durations from producing zero-length timers.
pub const MIN_DURATION_BEATS: f64 = 0.05;

/// Longest wall-clock time a single frame may occupy, in seconds.
pub const MAX_FRAME_SECS: f64 = 600.0;

/// Highest MIDI note number a token may name (G9).
pub const MAX_MIDI_NOTE: i32 = 127;

/// A parsed pitch token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pitch {
    /// The silence sentinel. Produces no sound.
    Rest,
    /// A pitched note, as a MIDI note number (A4 = 69).
    Note { midi: i32 },
    /// A token that could not be parsed. Plays at the default frequency.
    Unknown,
}

impl Pitch {
    /// Parses a note token like "C4", "F#5" or "rest".
    ///
    /// Accepts `<letter>[#]<octave digits>` with surrounding whitespace.
    /// Letters are case-insensitive. Anything else, including notes above
    /// `MAX_MIDI_NOTE`, is `Pitch::Unknown`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sheetplay::score::Pitch;
    ///
    /// assert_eq!(Pitch::parse("A4"), Pitch::Note { midi: 69 });
    /// assert_eq!(Pitch::parse("REST"), Pitch::Rest);
    /// assert_eq!(Pitch::parse("H2"), Pitch::Unknown);
    /// ```
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        if token.eq_ignore_ascii_case(REST_TOKEN) {
            return Pitch::Rest;
        }

        let mut chars = token.chars();
        let letter = match chars.next() {
            Some(c) => c.to_ascii_uppercase(),
            None => return Pitch::Unknown,
        };
        let rest = chars.as_str();
        let (sharp, digits) = match rest.strip_prefix('#') {
            Some(digits) => (true, digits),
            None => (false, rest),
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Pitch::Unknown;
        }
        let octave: i32 = match digits.parse() {
            Ok(octave) => octave,
            Err(_) => return Pitch::Unknown,
        };

        let mut name = String::with_capacity(2);
        name.push(letter);
        if sharp {
            name.push('#');
        }
        match NOTE_NAMES.iter().position(|&n| n == name) {
            Some(semitone) => match octave
                .checked_add(1)
                .and_then(|o| o.checked_mul(12))
                .and_then(|base| base.checked_add(semitone as i32))
            {
                Some(midi) if midi <= MAX_MIDI_NOTE => Pitch::Note { midi },
                _ => Pitch::Unknown,
            },
            // "E#" and "B#" are not in the chromatic table
            None => Pitch::Unknown,
        }
    }

    /// Returns the frequency in Hz, or None for a rest.
    pub fn frequency(&self) -> Option<f64> {
        match self {
            Pitch::Rest => None,
            Pitch::Note { midi } => Some(midi_to_frequency(*midi)),
            Pitch::Unknown => Some(DEFAULT_FREQUENCY),
        }
    }
}

/// Converts a MIDI note number to equal-tempered frequency (A4 = 440 Hz).
pub fn midi_to_frequency(midi: i32) -> f64 {
    440.0 * 2f64.powf((midi as f64 - 69.0) / 12.0)
}

/// Raises a frame duration to the positive floor.
/// Non-finite values are treated as degenerate.
pub fn floor_duration(beats: f64) -> f64 {
    if beats.is_finite() && beats >= MIN_DURATION_BEATS {
        beats
    } else {
        MIN_DURATION_BEATS
    }
}

/// Wall-clock length of a frame in seconds, at most `MAX_FRAME_SECS`.
///
/// # Arguments
///
/// * `tempo` - Tempo in beats per minute (must be positive)
/// * `beats` - Frame duration in beats
/// * `speed` - Playback speed multiplier (must be positive)
pub fn frame_seconds(tempo: f64, beats: f64, speed: f64) -> f64 {
    let secs = (60.0 / tempo) * floor_duration(beats) / speed;
    // f64::min also maps NaN to the cap
    secs.min(MAX_FRAME_SECS)
}
