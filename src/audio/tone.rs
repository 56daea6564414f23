//! Tone synthesis for frame playback.
//!
//! Each pitch in a frame becomes a short-lived voice: a triangle oscillator
//! shaped by an attack/sustain/release envelope. Voices are mixed into a
//! single output path at a fixed master gain and drop themselves once their
//! envelope has run out.

use crate::score::{Pitch, DEFAULT_FREQUENCY, MAX_FRAME_SECS};

/// Sample rate for audio synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Master output level. Keeps dense chords from clipping.
pub const MASTER_GAIN: f32 = 0.25;

/// Time to reach peak level.
pub const ATTACK_SECS: f64 = 0.02;

/// Level reached at the end of the attack.
pub const PEAK_LEVEL: f64 = 1.0;

/// Level held until the release starts.
pub const SUSTAIN_LEVEL: f64 = 0.8;

/// Level the release decays toward. Never reached exactly.
pub const FLOOR_LEVEL: f64 = 0.001;

/// Fraction of the note length held before the release.
pub const SUSTAIN_FRACTION: f64 = 0.8;

/// Shortest hold after the attack, so very short notes still speak.
pub const MIN_SUSTAIN_SECS: f64 = 0.01;

/// Shortest release.
pub const MIN_RELEASE_SECS: f64 = 0.01;

/// Extra time a voice stays alive after its envelope ends.
pub const VOICE_TAIL_SECS: f64 = 0.05;

/// Attack/sustain/release envelope for one note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    /// Time at which the release begins, in seconds from note start.
    release_start: f64,
    /// Time at which the envelope reaches the floor.
    end: f64,
}

impl Envelope {
    /// Builds the envelope for a note of the given length in seconds.
    ///
    /// Lengths are clamped to `0..=MAX_FRAME_SECS`.
    pub fn for_duration(duration_secs: f64) -> Self {
        let duration = if duration_secs.is_finite() {
            duration_secs.clamp(0.0, MAX_FRAME_SECS)
        } else {
            0.0
        };
        let release_start = (duration * SUSTAIN_FRACTION).max(ATTACK_SECS + MIN_SUSTAIN_SECS);
        let end = duration.max(release_start + MIN_RELEASE_SECS);
        Self { release_start, end }
    }

    /// Length of the envelope in seconds.
    pub fn length(&self) -> f64 {
        self.end
    }

    /// Amplitude at `t` seconds after the note started.
    pub fn level_at(&self, t: f64) -> f64 {
        if t < 0.0 || t >= self.end {
            0.0
        } else if t < ATTACK_SECS {
            PEAK_LEVEL * t / ATTACK_SECS
        } else if t < self.release_start {
            SUSTAIN_LEVEL
        } else {
            // Exponential ramp from sustain toward the floor
            let progress = (t - self.release_start) / (self.end - self.release_start);
            SUSTAIN_LEVEL * (FLOOR_LEVEL / SUSTAIN_LEVEL).powf(progress)
        }
    }
}

/// One synthesized tone for one pitch.
#[derive(Debug, Clone)]
pub struct Voice {
    /// Oscillator frequency in Hz.
    pub frequency: f64,
    /// Sample clock value at which the voice starts.
    pub start_sample: u64,
    envelope: Envelope,
    phase: f64,
}

impl Voice {
    fn new(frequency: f64, start_sample: u64, duration_secs: f64) -> Self {
        Self {
            frequency,
            start_sample,
            envelope: Envelope::for_duration(duration_secs),
            phase: 0.0,
        }
    }

    /// Sample clock value after which the voice is discarded.
    pub fn stop_sample(&self) -> u64 {
        let secs = self.envelope.length() + VOICE_TAIL_SECS;
        self.start_sample
            .saturating_add((secs * SAMPLE_RATE as f64).ceil() as u64)
    }

    /// Renders the voice's contribution at `clock`.
    fn next_sample(&mut self, clock: u64) -> f32 {
        if clock < self.start_sample {
            return 0.0;
        }
        let t = (clock - self.start_sample) as f64 / SAMPLE_RATE as f64;
        // Triangle wave in [-1, 1]
        let wave = 1.0 - 4.0 * (self.phase - 0.5).abs();
        self.phase = (self.phase + self.frequency / SAMPLE_RATE as f64).fract();
        (wave * self.envelope.level_at(t)) as f32
    }
}

/// Returns true if `frequency` can be synthesized at `SAMPLE_RATE`.
fn audible(frequency: f64) -> bool {
    frequency.is_finite() && frequency > 0.0 && frequency < SAMPLE_RATE as f64 / 2.0
}

/// The shared output path: a sample clock plus every active voice.
#[derive(Debug)]
pub struct VoiceBank {
    clock: u64,
    voices: Vec<Voice>,
    master_gain: f32,
}

impl VoiceBank {
    /// Creates an empty bank at the default master gain.
    pub fn new() -> Self {
        Self {
            clock: 0,
            voices: Vec::with_capacity(16),
            master_gain: MASTER_GAIN,
        }
    }

    /// Current sample clock.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Voices that have not finished yet.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Starts one voice for a pitch token.
    ///
    /// # Arguments
    ///
    /// * `token` - Pitch token like "C4"; "rest" is silent, unparseable tokens play 440 Hz
    /// * `duration_secs` - Note length in seconds
    /// * `start_offset_secs` - Delay from the current clock before the voice starts
    ///
    /// # Returns
    ///
    /// true if a voice was started
    pub fn render_note(&mut self, token: &str, duration_secs: f64, start_offset_secs: f64) -> bool {
        let offset = if start_offset_secs.is_finite() {
            start_offset_secs.max(0.0)
        } else {
            0.0
        };
        let start = self
            .clock
            .saturating_add((offset * SAMPLE_RATE as f64).round() as u64);
        self.start_voice(token, duration_secs, start)
    }

    /// Starts one voice per pitch, all at the same start sample.
    ///
    /// # Returns
    ///
    /// The number of voices started
    pub fn render_chord<S: AsRef<str>>(&mut self, tokens: &[S], duration_secs: f64) -> usize {
        let start = self.clock;
        let mut started = 0;
        for token in tokens {
            if self.start_voice(token.as_ref(), duration_secs, start) {
                started += 1;
            }
        }
        started
    }

    fn start_voice(&mut self, token: &str, duration_secs: f64, start: u64) -> bool {
        let pitch = Pitch::parse(token);
        if pitch == Pitch::Unknown {
            tracing::debug!("unparseable pitch {:?}, using default frequency", token);
        }
        match pitch.frequency() {
            Some(frequency) if !audible(frequency) => {
                tracing::debug!("pitch {:?} out of range, using default frequency", token);
                self.voices
                    .push(Voice::new(DEFAULT_FREQUENCY, start, duration_secs));
                true
            }
            Some(frequency) => {
                self.voices.push(Voice::new(frequency, start, duration_secs));
                true
            }
            None => false,
        }
    }

    /// Drops every voice immediately.
    pub fn silence(&mut self) {
        self.voices.clear();
    }

    /// Mixes mono samples into `out` and advances the clock.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            let clock = self.clock;
            let mix: f32 = self.voices.iter_mut().map(|v| v.next_sample(clock)).sum();
            *sample = mix * self.master_gain;
            self.clock += 1;
        }
        let clock = self.clock;
        self.voices.retain(|v| v.stop_sample() > clock);
    }
}

impl Default for VoiceBank {
    fn default() -> Self {
        Self::new()
    }
}

/// Destination for a frame's pitches.
///
/// The scheduler talks to audio only through this trait.
pub trait ToneOutput {
    /// Sounds every pitch together for `duration_secs`.
    fn render_chord(&mut self, pitches: &[String], duration_secs: f64);

    /// Stops everything that is sounding.
    fn silence(&mut self);
}

impl<T: ToneOutput + ?Sized> ToneOutput for Box<T> {
    fn render_chord(&mut self, pitches: &[String], duration_secs: f64) {
        (**self).render_chord(pitches, duration_secs);
    }

    fn silence(&mut self) {
        (**self).silence();
    }
}

/// Opens one `ToneOutput` per playback session.
pub trait OutputFactory {
    type Output: ToneOutput;

    /// Opens the audio endpoint.
    fn open(&mut self) -> anyhow::Result<Self::Output>;
}

impl<F, O> OutputFactory for F
where
    F: FnMut() -> anyhow::Result<O>,
    O: ToneOutput,
{
    type Output = O;

    fn open(&mut self) -> anyhow::Result<O> {
        self()
    }
}

/// Output that discards everything. Used when audio is muted.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentOutput;

impl ToneOutput for SilentOutput {
    fn render_chord(&mut self, _pitches: &[String], _duration_secs: f64) {}

    fn silence(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let env = Envelope::for_duration(1.0);
        assert_eq!(env.level_at(0.0), 0.0);
        assert!((env.level_at(ATTACK_SECS / 2.0) - PEAK_LEVEL / 2.0).abs() < 1e-9);
        assert_eq!(env.level_at(0.5), SUSTAIN_LEVEL);
        // Decaying after 80%, never reaching zero before the end
        let late = env.level_at(0.99);
        assert!(late > 0.0 && late < SUSTAIN_LEVEL);
        assert!(env.level_at(0.9) > env.level_at(0.95));
        assert_eq!(env.level_at(1.0), 0.0);
    }

    #[test]
    fn test_short_note_still_attacks() {
        let env = Envelope::for_duration(0.005);
        assert!(env.length() >= ATTACK_SECS + MIN_SUSTAIN_SECS + MIN_RELEASE_SECS);
        assert_eq!(env.level_at(ATTACK_SECS + 0.001), SUSTAIN_LEVEL);
    }

    #[test]
    fn test_chord_starts_together() {
        let mut bank = VoiceBank::new();
        let mut buf = vec![0.0; 100];
        bank.render(&mut buf);

        let started = bank.render_chord(&["E4", "G4", "C5"], 0.5);
        assert_eq!(started, 3);
        assert_eq!(bank.voices().len(), 3);
        assert!(bank.voices().iter().all(|v| v.start_sample == 100));
    }

    #[test]
    fn test_rest_and_duplicates() {
        let mut bank = VoiceBank::new();
        assert_eq!(bank.render_chord(&["rest"], 0.5), 0);
        assert_eq!(bank.render_chord(&["C4", "C4"], 0.5), 2);
        let empty: [&str; 0] = [];
        assert_eq!(bank.render_chord(&empty, 0.5), 0);
    }

    #[test]
    fn test_unknown_pitch_plays_default() {
        let mut bank = VoiceBank::new();
        assert!(bank.render_note("??", 0.5, 0.0));
        assert_eq!(bank.voices()[0].frequency, 440.0);
    }

    #[test]
    fn test_out_of_range_pitch_keeps_mix_finite() {
        let mut bank = VoiceBank::new();
        assert_eq!(bank.render_chord(&["C9999", "C4"], 0.5), 2);
        assert!(bank.voices().iter().all(|v| v.frequency.is_finite()));

        let mut buf = vec![0.0f32; 2048];
        bank.render(&mut buf);
        assert!(buf.iter().all(|s| s.is_finite()));
        assert!(buf.iter().any(|s| s.abs() > 0.0));

        assert!(audible(DEFAULT_FREQUENCY));
        assert!(!audible(f64::INFINITY));
        assert!(!audible(f64::NAN));
        assert!(!audible(SAMPLE_RATE as f64));
    }

    #[test]
    fn test_huge_lengths_do_not_overflow() {
        let mut bank = VoiceBank::new();
        assert!(bank.render_note("A4", 1e300, 1e300));
        let voice = &bank.voices()[0];
        assert!(voice.stop_sample() >= voice.start_sample);
        assert!(Envelope::for_duration(1e300).length() <= MAX_FRAME_SECS);
    }

    #[test]
    fn test_note_offset() {
        let mut bank = VoiceBank::new();
        bank.render_note("A4", 0.5, 0.5);
        assert_eq!(bank.voices()[0].start_sample, SAMPLE_RATE as u64 / 2);
    }

    #[test]
    fn test_voices_expire() {
        let mut bank = VoiceBank::new();
        bank.render_note("A4", 0.1, 0.0);
        let stop = bank.voices()[0].stop_sample();
        let limit = ((0.1 + VOICE_TAIL_SECS) * SAMPLE_RATE as f64).ceil() as u64;
        assert!(stop <= limit);

        let mut buf = vec![0.0; stop as usize];
        bank.render(&mut buf);
        assert!(bank.voices().is_empty());
        assert!(buf.iter().any(|s| s.abs() > 0.0));
        assert!(buf.iter().all(|s| s.abs() <= MASTER_GAIN));
    }

    #[test]
    fn test_silence_clears() {
        let mut bank = VoiceBank::new();
        bank.render_chord(&["C4", "E4"], 2.0);
        bank.silence();
        assert!(bank.voices().is_empty());
    }
}
