//! Frame-by-frame playback scheduler.
//!
//! Walks the frames of one analysis in order. Each frame is sounded through
//! the session's `ToneOutput`, announced to the surface as a
//! `PlaybackEvent`, and followed by exactly one armed advance timer. The
//! caller drives time by calling `tick` from its main loop.
//!
//! Pausing and resetting cancel the timer slot before returning, so a timer
//! armed before the call can never advance the sequence afterwards.

use super::timer::TimerSlot;
use crate::audio::{OutputFactory, ToneOutput};
use crate::score::{frame_seconds, AnalysisResult, Frame};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Slowest playback speed multiplier.
pub const MIN_SPEED: f64 = 0.25;

/// Fastest playback speed multiplier.
pub const MAX_SPEED: f64 = 2.0;

/// Step used by `speed_up` / `speed_down`.
pub const SPEED_STEP: f64 = 0.25;

/// Fraction of a frame's wall-clock length that its notes sound for.
/// Leaves a short gap so repeated pitches are heard as separate notes.
pub const NOTE_TRIM: f64 = 0.95;

/// Represents the current playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// No session loaded.
    Idle,
    /// Session loaded, not advancing.
    Ready,
    /// Advancing through frames.
    Running,
}

/// Notifications for the playback surface, drained after each call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A frame started sounding and should be displayed.
    FrameStarted { index: usize },
    /// Playback was paused on the current frame.
    Paused,
    /// Playback was reset to the first frame.
    Reset,
    /// The last frame finished; position is back at the start.
    Finished,
}

/// Errors reported when loading a session.
#[derive(Debug, Error, PartialEq)]
pub enum LoadError {
    #[error("analysis contains no frames")]
    EmptyFrames,
    #[error("invalid tempo {0}: must be a positive number of beats per minute")]
    InvalidTempo(f64),
}

/// Errors reported by transport operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("no analysis loaded")]
    NoSession,
}

/// One loaded analysis plus its audio endpoint.
struct Session<O> {
    analysis: AnalysisResult,
    /// Opened lazily on first play; dropped on reset.
    output: Option<O>,
    /// Set once opening the output has failed, so the warning is logged once.
    audio_unavailable: bool,
}

/// Drives playback of one analysis at a time.
pub struct Scheduler<F: OutputFactory> {
    factory: F,
    session: Option<Session<F::Output>>,
    state: PlaybackState,
    current_index: usize,
    speed: f64,
    timer: TimerSlot,
    events: Vec<PlaybackEvent>,
}

impl<F: OutputFactory> Scheduler<F> {
    /// Creates an idle scheduler that opens outputs through `factory`.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            session: None,
            state: PlaybackState::Idle,
            current_index: 0,
            speed: 1.0,
            timer: TimerSlot::new(),
            events: Vec::new(),
        }
    }

    /// Loads a new analysis, replacing any previous session.
    ///
    /// # Errors
    ///
    /// Returns error if the analysis has no frames or its tempo is not a
    /// positive number. The scheduler is left idle in that case.
    pub fn load(&mut self, analysis: AnalysisResult) -> Result<(), LoadError> {
        self.unload();

        if analysis.frames.is_empty() {
            tracing::warn!("rejecting analysis: no frames");
            return Err(LoadError::EmptyFrames);
        }
        if !(analysis.tempo.is_finite() && analysis.tempo > 0.0) {
            tracing::warn!("rejecting analysis: tempo {}", analysis.tempo);
            return Err(LoadError::InvalidTempo(analysis.tempo));
        }

        tracing::info!(
            "session loaded: {} frames at {} BPM",
            analysis.frames.len(),
            analysis.tempo
        );
        self.session = Some(Session {
            analysis,
            output: None,
            audio_unavailable: false,
        });
        self.current_index = 0;
        self.state = PlaybackState::Ready;
        Ok(())
    }

    /// Drops the current session, if any, and returns to idle.
    pub fn unload(&mut self) {
        self.timer.cancel();
        if let Some(mut session) = self.session.take() {
            if let Some(output) = session.output.as_mut() {
                output.silence();
            }
            tracing::debug!("session closed");
        }
        self.current_index = 0;
        self.state = PlaybackState::Idle;
    }

    /// Starts or resumes playback from the current frame.
    ///
    /// Does nothing if already running.
    ///
    /// # Errors
    ///
    /// Returns error if no analysis is loaded.
    pub fn play(&mut self, now: Instant) -> Result<(), PlaybackError> {
        if self.session.is_none() {
            return Err(PlaybackError::NoSession);
        }
        if self.state == PlaybackState::Running {
            return Ok(());
        }

        self.ensure_output();
        self.state = PlaybackState::Running;
        tracing::debug!("playing from frame {}", self.current_index);
        self.start_current_frame(now, now);
        Ok(())
    }

    /// Pauses on the current frame. Resuming continues from the same frame.
    pub fn pause(&mut self) {
        if self.state != PlaybackState::Running {
            return;
        }
        self.timer.cancel();
        self.silence_output();
        self.state = PlaybackState::Ready;
        self.events.push(PlaybackEvent::Paused);
        tracing::debug!("paused at frame {}", self.current_index);
    }

    /// Stops playback and rewinds to the first frame. Safe to call in any state.
    ///
    /// The session's audio endpoint is released and reopened on the next play.
    pub fn reset(&mut self) {
        self.timer.cancel();
        self.current_index = 0;
        match self.session.as_mut() {
            Some(session) => {
                if let Some(mut output) = session.output.take() {
                    output.silence();
                }
                self.state = PlaybackState::Ready;
                self.events.push(PlaybackEvent::Reset);
            }
            None => self.state = PlaybackState::Idle,
        }
    }

    /// Sets the speed multiplier for frames started from now on.
    ///
    /// Values are clamped to `[MIN_SPEED, MAX_SPEED]`; non-finite values are
    /// ignored. A frame that is already sounding keeps its timing.
    pub fn set_speed(&mut self, multiplier: f64) {
        if !multiplier.is_finite() {
            return;
        }
        self.speed = multiplier.clamp(MIN_SPEED, MAX_SPEED);
    }

    /// Raises the speed by one step.
    pub fn speed_up(&mut self) {
        self.set_speed(self.speed + SPEED_STEP);
    }

    /// Lowers the speed by one step.
    pub fn speed_down(&mut self) {
        self.set_speed(self.speed - SPEED_STEP);
    }

    /// Advances playback if the pending frame timer is due.
    ///
    /// Should be called regularly from the main loop. At most one frame is
    /// advanced per call, so frames are never skipped even if the caller
    /// falls behind. Each frame is timed from the previous deadline, unless
    /// the call is later than the new frame's whole length; timing then
    /// restarts from `now` instead of replaying the backlog in a burst.
    pub fn tick(&mut self, now: Instant) {
        if self.state != PlaybackState::Running {
            return;
        }
        let Some(fired) = self.timer.take_due(now) else {
            return;
        };

        let next = self.current_index + 1;
        if next >= self.frame_count() {
            self.current_index = 0;
            self.state = PlaybackState::Ready;
            self.events.push(PlaybackEvent::Finished);
            tracing::info!("playback finished");
            return;
        }

        self.current_index = next;
        // Measure from the missed deadline so polling jitter does not accumulate
        self.start_current_frame(fired.deadline(), now);
    }

    /// Sounds the current frame, announces it and arms its advance timer.
    ///
    /// The timer runs from `scheduled`, or from `now` if `scheduled` is
    /// already more than one frame length in the past.
    fn start_current_frame(&mut self, scheduled: Instant, now: Instant) {
        let speed = self.speed;
        let index = self.current_index;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some(frame) = session.analysis.frames.get(index) else {
            return;
        };

        let secs = frame_seconds(session.analysis.tempo, frame.duration, speed);
        if let Some(output) = session.output.as_mut() {
            output.render_chord(&frame.notes, secs * NOTE_TRIM);
        }
        tracing::trace!("frame {} for {:.3}s: {:?}", index, secs, frame.notes);

        // frame_seconds is positive and capped, so this cannot panic
        let length = Duration::from_secs_f64(secs);
        let start = if now.saturating_duration_since(scheduled) > length {
            tracing::debug!("frame {} started {:?} late, resyncing", index, now - scheduled);
            now
        } else {
            scheduled
        };

        self.events.push(PlaybackEvent::FrameStarted { index });
        self.timer.arm(start + length);
    }

    fn ensure_output(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.output.is_some() || session.audio_unavailable {
            return;
        }
        match self.factory.open() {
            Ok(output) => session.output = Some(output),
            Err(e) => {
                session.audio_unavailable = true;
                tracing::warn!("audio unavailable, playing silently: {:#}", e);
            }
        }
    }

    fn silence_output(&mut self) {
        if let Some(output) = self.session.as_mut().and_then(|s| s.output.as_mut()) {
            output.silence();
        }
    }

    /// Takes the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    /// Returns the current playback state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Returns whether frames are advancing.
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Running
    }

    /// Index of the frame playing or about to play.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The frame playing or about to play.
    pub fn current_frame(&self) -> Option<&Frame> {
        self.analysis()?.frames.get(self.current_index)
    }

    /// The loaded analysis.
    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.session.as_ref().map(|s| &s.analysis)
    }

    /// Number of frames in the session (0 when idle).
    pub fn frame_count(&self) -> usize {
        self.analysis().map_or(0, |a| a.frames.len())
    }

    /// Current speed multiplier.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Session tempo in BPM.
    pub fn tempo(&self) -> Option<f64> {
        self.analysis().map(|a| a.tempo)
    }

    /// When the pending advance is due, if one is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    /// Returns true if the session's audio endpoint is open.
    pub fn has_output(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.output.is_some())
    }
}
