//! sheetplay - A terminal player for analysed sheet music.
//!
//! Loads a recognition result (tempo plus frames of notes with page
//! coordinates) and the page images it was produced from, then plays the
//! piece frame by frame while showing a magnified, highlighted view of the
//! notes being sounded.
//!
//! # Usage
//!
//! ```bash
//! sheetplay analysis.json page1.png page2.png
//! sheetplay --export out.wav analysis.json
//! sheetplay --dump analysis.json
//! sheetplay --print-schema
//! ```
//!
//! Press `?` for help with keyboard shortcuts.

use sheetplay::audio::{export_to_wav, RodioOutputFactory};
use sheetplay::playback::{MAX_SPEED, MIN_SPEED};
use sheetplay::score::{response_schema, AnalysisResult};
use sheetplay::{ui, App};

use anyhow::{bail, Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Command-line options for the application.
#[derive(Debug, PartialEq)]
struct CliOptions {
    /// Recognition result to play.
    analysis: Option<PathBuf>,
    /// Page images, in page order.
    pages: Vec<PathBuf>,
    /// Initial speed multiplier.
    speed: f64,
    /// Render to this WAV file instead of starting the player.
    export: Option<PathBuf>,
    /// Print the recognition response schema and exit.
    print_schema: bool,
    /// Print the analysis as ingested and exit.
    dump: bool,
    /// Never open an audio device.
    mute: bool,
}

impl CliOptions {
    /// Parses command-line arguments (without the program name).
    ///
    /// Supports:
    /// - `--speed <x>` or `-s <x>`: Initial speed multiplier
    /// - `--export <path>` or `-e <path>`: Render to WAV and exit
    /// - `--print-schema`: Print the response schema and exit
    /// - `--dump`: Print the normalized analysis and exit
    /// - `--mute` or `-m`: Play silently
    /// - `--help` or `-h`: Print help and exit
    ///
    /// The first positional argument is the analysis file, the rest are
    /// page images.
    ///
    /// # Returns
    ///
    /// `None` if help was requested
    ///
    /// # Errors
    ///
    /// Returns error on unknown options, missing values or a missing
    /// analysis path
    fn parse(args: &[String]) -> Result<Option<Self>> {
        let mut options = Self {
            analysis: None,
            pages: Vec::new(),
            speed: 1.0,
            export: None,
            print_schema: false,
            dump: false,
            mute: false,
        };
        let mut i = 0;

        while i < args.len() {
            match args[i].as_str() {
                "--speed" | "-s" => {
                    i += 1;
                    let value = args.get(i).context("--speed requires a value")?;
                    let speed: f64 = value
                        .parse()
                        .with_context(|| format!("Invalid speed: {}", value))?;
                    if !(speed.is_finite() && speed > 0.0) {
                        bail!("Speed must be a positive number, got {}", value);
                    }
                    options.speed = speed;
                }
                "--export" | "-e" => {
                    i += 1;
                    let path = args.get(i).context("--export requires a path argument")?;
                    options.export = Some(PathBuf::from(path));
                }
                "--print-schema" => options.print_schema = true,
                "--dump" => options.dump = true,
                "--mute" | "-m" => options.mute = true,
                "--help" | "-h" => return Ok(None),
                other if other.starts_with('-') && other.len() > 1 => {
                    bail!("Unknown option: {}", other);
                }
                path => {
                    if options.analysis.is_none() {
                        options.analysis = Some(PathBuf::from(path));
                    } else {
                        options.pages.push(PathBuf::from(path));
                    }
                }
            }
            i += 1;
        }

        if options.analysis.is_none() && !options.print_schema {
            bail!("Missing analysis file");
        }
        Ok(Some(options))
    }
}

fn print_usage(program: &str) {
    eprintln!("sheetplay - Terminal player for analysed sheet music");
    eprintln!();
    eprintln!("Usage: {} [OPTIONS] <analysis.json> [page images...]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --speed X         Initial speed multiplier ({} to {})", MIN_SPEED, MAX_SPEED);
    eprintln!("  -e, --export PATH     Render the analysis to a WAV file and exit");
    eprintln!("      --print-schema    Print the recognition response schema and exit");
    eprintln!("      --dump            Print the analysis after normalization and exit");
    eprintln!("  -m, --mute            Play without opening an audio device");
    eprintln!("  -h, --help            Print this help message");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for diagnostic output on stderr.");
}

/// Main entry point.
fn main() -> Result<()> {
    // Parse CLI options first (before any terminal setup)
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("sheetplay");
    let cli = match CliOptions::parse(args.get(1..).unwrap_or_default()) {
        Ok(Some(cli)) => cli,
        Ok(None) => {
            print_usage(program);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    // Initialize logging (optional, for debugging)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if cli.print_schema {
        let schema = serde_json::to_string_pretty(&response_schema())?;
        println!("{}", schema);
        return Ok(());
    }

    let analysis_path = cli.analysis.context("Missing analysis file")?;
    if cli.dump {
        return dump_analysis(&analysis_path);
    }
    if !(MIN_SPEED..=MAX_SPEED).contains(&cli.speed) {
        tracing::warn!(
            "speed {} outside {}..={}, clamping",
            cli.speed,
            MIN_SPEED,
            MAX_SPEED
        );
    }

    if let Some(output_path) = cli.export {
        return export_analysis(&analysis_path, cli.speed, &output_path);
    }

    let factory = if cli.mute {
        RodioOutputFactory::muted()
    } else {
        RodioOutputFactory::new()
    };
    let mut app = App::new(analysis_path, cli.pages, factory);
    app.set_speed(cli.speed);
    app.reload()?;

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;

    // Run main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;

    // Handle any errors from the main loop
    result
}

/// Renders an analysis to a WAV file without starting the player.
fn export_analysis(analysis_path: &Path, speed: f64, output_path: &Path) -> Result<()> {
    let analysis = AnalysisResult::from_file(analysis_path)
        .with_context(|| format!("Failed to load {}", analysis_path.display()))?;

    export_to_wav(
        &analysis,
        speed.clamp(MIN_SPEED, MAX_SPEED),
        output_path,
        Some(|progress: f32| {
            tracing::trace!("export {:.0}%", progress * 100.0);
        }),
    )
    .with_context(|| format!("Export to {} failed", output_path.display()))?;

    eprintln!("Exported to {}", output_path.display());
    Ok(())
}

/// Prints the analysis as playback will see it: defaults filled in, fences
/// stripped, local frame ids assigned.
fn dump_analysis(analysis_path: &Path) -> Result<()> {
    let analysis = AnalysisResult::from_file(analysis_path)
        .with_context(|| format!("Failed to load {}", analysis_path.display()))?;
    println!("{}", analysis.to_json()?);
    eprintln!(
        "{} frames, {} beats, {} pages",
        analysis.frames.len(),
        analysis.total_beats(),
        analysis.page_count()
    );
    Ok(())
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        // Advance playback and pick up decoded pages
        app.update(Instant::now());

        terminal.draw(|frame| ui::render(frame, app))?;

        // Handle events with a short timeout so frame timers stay responsive
        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key.code, key.modifiers);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Handles a key press event.
fn handle_key(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_help {
        match code {
            KeyCode::Char('?') | KeyCode::Esc => app.show_help = false,
            KeyCode::Char('q') => app.should_quit = true,
            _ => {}
        }
        return;
    }

    match code {
        KeyCode::Char(' ') => app.toggle_playback(Instant::now()),
        KeyCode::Char('r') => app.reset(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.speed_up(),
        KeyCode::Char('-') => app.speed_down(),
        KeyCode::Char('o') => app.reload_or_report(),
        KeyCode::Char('?') => app.toggle_help(),
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_positional_paths() {
        let cli = CliOptions::parse(&args(&["a.json", "p1.png", "p2.jpg"]))
            .unwrap()
            .unwrap();
        assert_eq!(cli.analysis, Some(PathBuf::from("a.json")));
        assert_eq!(cli.pages, vec![PathBuf::from("p1.png"), PathBuf::from("p2.jpg")]);
        assert_eq!(cli.speed, 1.0);
        assert!(!cli.mute);
    }

    #[test]
    fn test_parse_options() {
        let cli = CliOptions::parse(&args(&["--speed", "1.5", "-m", "-e", "out.wav", "a.json"]))
            .unwrap()
            .unwrap();
        assert_eq!(cli.speed, 1.5);
        assert!(cli.mute);
        assert_eq!(cli.export, Some(PathBuf::from("out.wav")));
        assert!(!cli.dump);

        let cli = CliOptions::parse(&args(&["--dump", "a.json"])).unwrap().unwrap();
        assert!(cli.dump);
        assert!(CliOptions::parse(&args(&["--dump"])).is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(CliOptions::parse(&args(&[])).is_err());
        assert!(CliOptions::parse(&args(&["--speed"])).is_err());
        assert!(CliOptions::parse(&args(&["--speed", "-1", "a.json"])).is_err());
        assert!(CliOptions::parse(&args(&["--bogus", "a.json"])).is_err());
        assert!(CliOptions::parse(&args(&["--print-schema"])).unwrap().is_some());
        assert!(CliOptions::parse(&args(&["-h"])).unwrap().is_none());
    }

    #[test]
    fn test_keys_drive_app() {
        let mut app = App::new(PathBuf::from("unused.json"), vec![], RodioOutputFactory::muted());

        handle_key(&mut app, KeyCode::Char('?'), KeyModifiers::NONE);
        assert!(app.show_help);
        // Playback keys are ignored while help is open
        handle_key(&mut app, KeyCode::Char('+'), KeyModifiers::NONE);
        assert_eq!(app.speed(), 1.0);
        handle_key(&mut app, KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.show_help);

        handle_key(&mut app, KeyCode::Char('='), KeyModifiers::NONE);
        assert_eq!(app.speed(), 1.25);
        handle_key(&mut app, KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }
}
