//! Audio engine for real-time tone playback.
//!
//! Provides a `ToneOutput` backed by rodio: a single continuous source
//! renders buffers from the shared voice bank, so every voice in a chord
//! sums into the same output path.

use super::tone::{OutputFactory, SilentOutput, ToneOutput, VoiceBank, SAMPLE_RATE};
use anyhow::{Context, Result};
use rodio::{OutputStream, OutputStreamHandle, Source};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Audio buffer size for low-latency playback.
/// Smaller = lower latency but higher CPU usage.
const BUFFER_SIZE: usize = 256;

/// Audio source that pulls samples from the voice bank.
/// Implements rodio's Source trait for playback.
struct BankSource {
    /// The voice bank (shared with the engine).
    bank: Arc<Mutex<VoiceBank>>,
    /// Mono render buffer.
    buf: Vec<f32>,
    /// Current position in the buffer.
    buf_pos: usize,
}

impl BankSource {
    fn new(bank: Arc<Mutex<VoiceBank>>) -> Self {
        Self {
            bank,
            buf: vec![0.0; BUFFER_SIZE],
            buf_pos: BUFFER_SIZE, // Start at end to trigger first render
        }
    }
}

impl Iterator for BankSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.buf_pos >= BUFFER_SIZE {
            if let Ok(mut bank) = self.bank.lock() {
                bank.render(&mut self.buf);
            } else {
                // Only fill with silence if we can't get the lock
                self.buf.fill(0.0);
            }
            self.buf_pos = 0;
        }

        let sample = self.buf[self.buf_pos];
        self.buf_pos += 1;
        Some(sample)
    }
}

impl Source for BankSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite stream
    }
}

/// One audio output endpoint for a playback session.
///
/// Dropping the engine closes the output stream.
pub struct AudioEngine {
    /// The voice bank (wrapped for sharing with the audio thread).
    bank: Arc<Mutex<VoiceBank>>,
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    /// Audio output handle for playback.
    _stream_handle: OutputStreamHandle,
}

impl AudioEngine {
    /// Opens the default audio device and starts the mixing source.
    ///
    /// # Errors
    ///
    /// Returns error if audio output cannot be initialized
    pub fn new() -> Result<Self> {
        let bank = Arc::new(Mutex::new(VoiceBank::new()));

        let (stream, stream_handle) =
            OutputStream::try_default().context("Failed to open audio output")?;

        let source = BankSource::new(Arc::clone(&bank));
        stream_handle
            .play_raw(source)
            .context("Failed to start audio playback")?;

        tracing::debug!("audio output opened at {} Hz", SAMPLE_RATE);

        Ok(Self {
            bank,
            _stream: stream,
            _stream_handle: stream_handle,
        })
    }
}

impl ToneOutput for AudioEngine {
    fn render_chord(&mut self, pitches: &[String], duration_secs: f64) {
        if let Ok(mut bank) = self.bank.lock() {
            bank.render_chord(pitches, duration_secs);
        }
    }

    fn silence(&mut self) {
        if let Ok(mut bank) = self.bank.lock() {
            bank.silence();
        }
    }
}

/// Opens an `AudioEngine` on the default device for each session.
///
/// When muted, sessions get a `SilentOutput` instead and no device is opened.
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioOutputFactory {
    /// Skip the audio device entirely.
    pub muted: bool,
}

impl RodioOutputFactory {
    /// Creates a factory that opens the default device.
    pub fn new() -> Self {
        Self { muted: false }
    }

    /// Creates a factory that never produces sound.
    pub fn muted() -> Self {
        Self { muted: true }
    }
}

impl OutputFactory for RodioOutputFactory {
    type Output = Box<dyn ToneOutput>;

    fn open(&mut self) -> Result<Box<dyn ToneOutput>> {
        if self.muted {
            return Ok(Box::new(SilentOutput));
        }
        Ok(Box::new(AudioEngine::new()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_pulls_from_bank() {
        let bank = Arc::new(Mutex::new(VoiceBank::new()));
        bank.lock().unwrap().render_chord(&["A4"], 0.5);
        let mut source = BankSource::new(Arc::clone(&bank));

        assert_eq!(source.channels(), 1);
        assert_eq!(source.sample_rate(), SAMPLE_RATE);
        let samples: Vec<f32> = source.by_ref().take(BUFFER_SIZE * 2).collect();
        assert!(samples.iter().any(|s| s.abs() > 0.0));
        assert_eq!(bank.lock().unwrap().clock(), (BUFFER_SIZE * 2) as u64);
    }

    #[test]
    fn test_muted_factory_needs_no_device() {
        let mut factory = RodioOutputFactory::muted();
        let mut output = factory.open().unwrap();
        output.render_chord(&["C4".to_string()], 0.5);
        output.silence();
    }
}
