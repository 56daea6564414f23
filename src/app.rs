//! Application state and event handling.
//!
//! This module defines the playback surface: it ties the scheduler, the page
//! images and the view renderer together and exposes the actions the
//! terminal UI binds to keys.

use crate::audio::RodioOutputFactory;
use crate::playback::{PlaybackEvent, PlaybackState, Scheduler};
use crate::score::{AnalysisResult, Frame};
use crate::view::{Canvas, LoadProgress, PageImages, PageLoader, RenderOutcome, ViewRenderer};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How long a status message stays visible.
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// Main application state.
pub struct App {
    /// Frame scheduler driving audio playback.
    scheduler: Scheduler<RodioOutputFactory>,
    /// Renders the magnified page view for the current frame.
    renderer: ViewRenderer,
    /// Decoded page images for the current session.
    pages: PageImages,
    /// Background page decoder, dropped once every page has arrived.
    loader: Option<PageLoader>,
    /// Last decoding progress reported by the loader.
    load_progress: Option<LoadProgress>,
    /// Outcome of the most recent render call.
    last_render: Option<RenderOutcome>,
    /// Analysis JSON this session was loaded from.
    analysis_path: PathBuf,
    /// Page image files, indexed by page number.
    page_paths: Vec<PathBuf>,
    /// Status message to display.
    pub status_message: Option<(String, Instant)>,
    /// Whether the help overlay is shown.
    pub show_help: bool,
    /// Set when the user asks to quit.
    pub should_quit: bool,
}

impl App {
    /// Creates an application for the given analysis and page images.
    ///
    /// Nothing is read until [`App::reload`] is called.
    ///
    /// # Arguments
    ///
    /// * `analysis_path` - Path to the analysis JSON
    /// * `page_paths` - Page images in page order
    /// * `factory` - Opens the audio output for each session
    pub fn new(analysis_path: PathBuf, page_paths: Vec<PathBuf>, factory: RodioOutputFactory) -> Self {
        Self {
            scheduler: Scheduler::new(factory),
            renderer: ViewRenderer::new(),
            pages: PageImages::default(),
            loader: None,
            load_progress: None,
            last_render: None,
            analysis_path,
            page_paths,
            status_message: None,
            show_help: false,
            should_quit: false,
        }
    }

    /// Reads the analysis and page images again, replacing the current session.
    ///
    /// The previous session is torn down first, so a failed reload leaves the
    /// application idle.
    ///
    /// # Errors
    ///
    /// Returns error if the analysis cannot be read or parsed, or has no
    /// playable frames
    pub fn reload(&mut self) -> Result<()> {
        self.scheduler.unload();
        self.loader = None;
        self.load_progress = None;
        self.last_render = None;
        self.pages = PageImages::with_len(self.page_paths.len());

        let analysis = AnalysisResult::from_file(&self.analysis_path)
            .with_context(|| format!("Failed to load {}", self.analysis_path.display()))?;
        let frames = analysis.frames.len();
        let beats = analysis.total_beats();
        let pages_needed = analysis.page_count();
        self.scheduler
            .load(analysis)
            .with_context(|| format!("Cannot play {}", self.analysis_path.display()))?;

        if pages_needed > self.page_paths.len() {
            tracing::warn!(
                "analysis refers to {} pages but {} images were given",
                pages_needed,
                self.page_paths.len()
            );
        }
        self.loader = Some(PageLoader::spawn(self.page_paths.clone()));
        self.render_current();
        self.set_status(format!("Loaded {} frames ({} beats)", frames, beats));
        Ok(())
    }

    /// Reloads and reports failure on the status line instead of returning it.
    pub fn reload_or_report(&mut self) {
        if let Err(e) = self.reload() {
            tracing::error!("reload failed: {:#}", e);
            self.set_status(format!("Load failed: {:#}", e));
        }
    }

    /// Advances everything that moves on its own. Called once per UI frame.
    pub fn update(&mut self, now: Instant) {
        if let Some(loader) = self.loader.as_mut() {
            let progress = loader.poll(&mut self.pages);
            self.load_progress = Some(progress);
            if progress.newly_complete {
                tracing::info!(
                    "pages ready: {} decoded, {} failed",
                    progress.loaded,
                    progress.failed
                );
                self.render_current();
            }
            if progress.is_complete() {
                self.loader = None;
            }
        }

        self.scheduler.tick(now);
        for event in self.scheduler.drain_events() {
            match event {
                PlaybackEvent::FrameStarted { .. } | PlaybackEvent::Reset => self.render_current(),
                PlaybackEvent::Finished => {
                    self.render_current();
                    self.set_status("Finished");
                }
                PlaybackEvent::Paused => {}
            }
        }

        self.clear_expired_status(now);
    }

    /// Toggles play/pause state.
    pub fn toggle_playback(&mut self, now: Instant) {
        if self.scheduler.is_playing() {
            self.pause();
        } else {
            self.play(now);
        }
    }

    /// Starts or resumes playback.
    pub fn play(&mut self, now: Instant) {
        match self.scheduler.play(now) {
            Ok(()) => self.set_status("Playing"),
            Err(e) => self.set_status(format!("Cannot play: {}", e)),
        }
    }

    /// Pauses on the current frame.
    pub fn pause(&mut self) {
        if self.scheduler.is_playing() {
            self.scheduler.pause();
            self.set_status("Paused");
        }
    }

    /// Stops playback and returns to the first frame.
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.set_status("Reset to first frame");
    }

    /// Sets the speed multiplier (clamped by the scheduler).
    pub fn set_speed(&mut self, multiplier: f64) {
        self.scheduler.set_speed(multiplier);
    }

    /// Plays faster by one step.
    pub fn speed_up(&mut self) {
        self.scheduler.speed_up();
        self.set_status(format!("Speed {:.2}x", self.scheduler.speed()));
    }

    /// Plays slower by one step.
    pub fn speed_down(&mut self) {
        self.scheduler.speed_down();
        self.set_status(format!("Speed {:.2}x", self.scheduler.speed()));
    }

    /// Shows or hides the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Sets a status message to display temporarily.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clears expired status messages.
    pub fn clear_expired_status(&mut self, now: Instant) {
        if let Some((_, time)) = &self.status_message {
            if now.duration_since(*time) > STATUS_TIMEOUT {
                self.status_message = None;
            }
        }
    }

    /// Redraws the view for the frame the scheduler points at.
    fn render_current(&mut self) {
        if let Some(frame) = self.scheduler.current_frame() {
            self.last_render = Some(self.renderer.render(frame, &self.pages));
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.scheduler.state()
    }

    pub fn current_index(&self) -> usize {
        self.scheduler.current_index()
    }

    pub fn frame_count(&self) -> usize {
        self.scheduler.frame_count()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.scheduler.current_frame()
    }

    pub fn speed(&self) -> f64 {
        self.scheduler.speed()
    }

    pub fn tempo(&self) -> Option<f64> {
        self.scheduler.tempo()
    }

    /// Whether the session has an audio endpoint (false before the first
    /// play and after the device failed to open).
    pub fn audio_open(&self) -> bool {
        self.scheduler.has_output()
    }

    /// The view drawn for the current frame.
    pub fn canvas(&self) -> &Canvas {
        self.renderer.canvas()
    }

    pub fn last_render(&self) -> Option<RenderOutcome> {
        self.last_render
    }

    /// Page decoding progress, if a session has been loaded.
    pub fn load_progress(&self) -> Option<LoadProgress> {
        self.load_progress
    }

    pub fn analysis_path(&self) -> &Path {
        &self.analysis_path
    }
}
