//! Audio export functionality.
//!
//! Renders a whole analysis offline through the same voice bank and frame
//! timing used for live playback, and writes the result to a WAV file.

use super::tone::{VoiceBank, SAMPLE_RATE, VOICE_TAIL_SECS};
use crate::playback::NOTE_TRIM;
use crate::score::{frame_seconds, AnalysisResult};
use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// Buffer size for rendering chunks.
/// Larger buffers are more efficient but use more memory.
const RENDER_BUFFER_SIZE: usize = 4096;

/// Number of samples the export of `analysis` at `speed` will contain.
///
/// Every frame occupies its wall-clock duration; a short tail is appended so
/// the last note's release is not cut off.
pub fn export_length_samples(analysis: &AnalysisResult, speed: f64) -> u64 {
    let body: u64 = analysis
        .frames
        .iter()
        .map(|f| seconds_to_samples(frame_seconds(analysis.tempo, f.duration, speed)))
        .sum();
    body + seconds_to_samples(VOICE_TAIL_SECS)
}

fn seconds_to_samples(secs: f64) -> u64 {
    (secs * SAMPLE_RATE as f64).round() as u64
}

/// Exports an analysis to a mono 16-bit WAV file.
///
/// # Arguments
///
/// * `analysis` - The analysis to render
/// * `speed` - Playback speed multiplier applied to every frame
/// * `output_path` - Path for the output WAV file
/// * `progress_callback` - Optional callback for progress updates (0.0 to 1.0)
///
/// # Errors
///
/// Returns error if:
/// - The analysis has no frames or a non-positive tempo
/// - Output file cannot be created or written
pub fn export_to_wav<P, F>(
    analysis: &AnalysisResult,
    speed: f64,
    output_path: P,
    mut progress_callback: Option<F>,
) -> Result<()>
where
    P: AsRef<Path>,
    F: FnMut(f32),
{
    if analysis.frames.is_empty() {
        bail!("Nothing to export: analysis has no frames");
    }
    if !(analysis.tempo.is_finite() && analysis.tempo > 0.0) {
        bail!("Nothing to export: invalid tempo {}", analysis.tempo);
    }
    if !(speed.is_finite() && speed > 0.0) {
        bail!("Invalid export speed {}", speed);
    }

    let spec = WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(output_path.as_ref(), spec).with_context(|| {
        format!(
            "Failed to create output WAV file: {}",
            output_path.as_ref().display()
        )
    })?;

    let total_samples = export_length_samples(analysis, speed);
    let mut bank = VoiceBank::new();
    let mut buf = vec![0.0f32; RENDER_BUFFER_SIZE];
    let mut written = 0u64;

    // Frame boundaries fall on whole samples so timing never drifts
    let mut write_span = |bank: &mut VoiceBank, samples: u64, written: &mut u64| -> Result<()> {
        let mut remaining = samples;
        while remaining > 0 {
            let chunk = remaining.min(RENDER_BUFFER_SIZE as u64) as usize;
            bank.render(&mut buf[..chunk]);
            for &sample in &buf[..chunk] {
                // Convert f32 (-1.0 to 1.0) to i16
                let value = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                writer.write_sample(value)?;
            }
            remaining -= chunk as u64;
            *written += chunk as u64;
        }
        Ok(())
    };

    for frame in &analysis.frames {
        let secs = frame_seconds(analysis.tempo, frame.duration, speed);
        bank.render_chord(&frame.notes, secs * NOTE_TRIM);
        write_span(&mut bank, seconds_to_samples(secs), &mut written)?;

        if let Some(ref mut callback) = progress_callback {
            callback(written as f32 / total_samples as f32);
        }
    }
    write_span(&mut bank, seconds_to_samples(VOICE_TAIL_SECS), &mut written)?;
    drop(write_span);

    writer.finalize().context("Failed to finalize WAV file")?;

    if let Some(ref mut callback) = progress_callback {
        callback(1.0);
    }
    tracing::info!(
        "exported {} samples to {}",
        written,
        output_path.as_ref().display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::MIN_SPEED;
    use crate::score::{Frame, PageRect, MAX_FRAME_SECS};

    fn scenario() -> AnalysisResult {
        let frame = |notes: &[&str], duration: f64| {
            Frame::new(
                0,
                notes.iter().map(|n| n.to_string()).collect(),
                duration,
                PageRect::FULL_PAGE,
                vec![],
            )
        };
        AnalysisResult::new(
            120.0,
            vec![
                frame(&["C4"], 1.0),
                frame(&["rest"], 0.5),
                frame(&["E4", "G4"], 2.0),
            ],
        )
    }

    #[test]
    fn test_export_length() {
        let analysis = scenario();
        // 0.5 s + 0.25 s + 1.0 s plus the tail
        let expected = seconds_to_samples(0.5)
            + seconds_to_samples(0.25)
            + seconds_to_samples(1.0)
            + seconds_to_samples(VOICE_TAIL_SECS);
        assert_eq!(export_length_samples(&analysis, 1.0), expected);
        assert!(export_length_samples(&analysis, 0.5) > export_length_samples(&analysis, 1.0));
    }

    #[test]
    fn test_export_length_bounded_for_extreme_timing() {
        let cap = seconds_to_samples(MAX_FRAME_SECS) + seconds_to_samples(VOICE_TAIL_SECS);

        let mut huge_duration = scenario();
        huge_duration.frames.truncate(1);
        huge_duration.frames[0].duration = 1e300;
        assert_eq!(export_length_samples(&huge_duration, 1.0), cap);

        let mut tiny_tempo = scenario();
        tiny_tempo.frames.truncate(1);
        tiny_tempo.tempo = 1e-300;
        assert_eq!(export_length_samples(&tiny_tempo, MIN_SPEED), cap);
    }

    #[test]
    fn test_export_writes_wav() {
        let analysis = scenario();
        let path = std::env::temp_dir().join(format!("sheetplay-export-{}.wav", std::process::id()));

        let mut last_progress = 0.0f32;
        export_to_wav(&analysis, 1.0, &path, Some(|p: f32| last_progress = p)).unwrap();
        assert_eq!(last_progress, 1.0);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
        assert_eq!(reader.len() as u64, export_length_samples(&analysis, 1.0));

        // The rest frame (0.5 s .. 0.75 s) is silent once the first note has died out
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        let rest_start = seconds_to_samples(0.5 + VOICE_TAIL_SECS) as usize;
        let rest_end = seconds_to_samples(0.75) as usize;
        assert!(samples[rest_start..rest_end].iter().all(|&s| s == 0));
        assert!(samples[..rest_start].iter().any(|&s| s != 0));
        assert!(samples[rest_end..].iter().any(|&s| s != 0));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_export_rejects_empty() {
        let analysis = AnalysisResult::new(120.0, vec![]);
        let path = std::env::temp_dir().join("sheetplay-never-written.wav");
        assert!(export_to_wav(&analysis, 1.0, &path, None::<fn(f32)>).is_err());
    }
}
