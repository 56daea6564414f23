//! Page view rendering.
//!
//! Shows the magnified page crop for the current frame using half-block
//! characters (two pixels per cell, stacked vertically), plus a side panel
//! listing what the frame plays.

use crate::app::App;
use crate::score::{midi_to_frequency, Pitch, DEFAULT_FREQUENCY, REST_TOKEN};
use crate::view::{Canvas, LoadProgress, RenderOutcome, SkipReason};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Width of the frame info panel.
const INFO_WIDTH: u16 = 28;

/// Upper half block: foreground paints the top pixel, background the bottom.
const HALF_BLOCK: &str = "\u{2580}";

/// Renders the page view and the frame info panel.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
pub fn render_viewport(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(INFO_WIDTH)])
        .split(area);

    render_page_view(frame, chunks[0], app);
    render_frame_info(frame, chunks[1], app);
}

fn render_page_view(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Score ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let canvas = app.canvas();
    if canvas.width() == 0 || canvas.height() == 0 {
        let message = placeholder_message(app.last_render(), app.load_progress());
        let paragraph = Paragraph::new(Line::from(Span::styled(
            message,
            Style::default().fg(Color::DarkGray),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(paragraph, inner);
        return;
    }

    frame.render_widget(Paragraph::new(canvas_lines(canvas, inner.width, inner.height)), inner);
}

/// Text shown before anything has been drawn.
fn placeholder_message(last: Option<RenderOutcome>, progress: Option<LoadProgress>) -> String {
    match (last, progress) {
        (None, _) => "No score loaded (press o to load)".to_string(),
        (Some(RenderOutcome::Skipped(SkipReason::DegenerateRegion)), _) => {
            "Frame has no region to show".to_string()
        }
        (_, Some(p)) if !p.is_complete() => format!("Loading pages {}/{}", p.loaded + p.failed, p.total),
        _ => "Page image unavailable".to_string(),
    }
}

/// Largest scale at which the canvas fits `cols` x `rows` cells.
///
/// Each cell holds one pixel across and two down.
fn fit_scale(canvas: &Canvas, cols: u16, rows: u16) -> f64 {
    if canvas.width() == 0 || canvas.height() == 0 {
        return 0.0;
    }
    let sx = cols as f64 / canvas.width() as f64;
    let sy = (rows as f64 * 2.0) / canvas.height() as f64;
    sx.min(sy)
}

/// Downsamples the canvas into styled half-block lines, centred horizontally.
fn canvas_lines(canvas: &Canvas, cols: u16, rows: u16) -> Vec<Line<'static>> {
    let scale = fit_scale(canvas, cols, rows);
    if scale <= 0.0 {
        return Vec::new();
    }
    let used_cols = ((canvas.width() as f64 * scale).floor() as u16).clamp(1, cols.max(1));
    let used_rows = ((canvas.height() as f64 * scale / 2.0).ceil() as u16).clamp(1, rows.max(1));
    let pad = " ".repeat(((cols - used_cols.min(cols)) / 2) as usize);

    let sample = |col: u16, pixel_row: u32| -> Color {
        let x = ((col as f64 + 0.5) / scale) as u32;
        let y = ((pixel_row as f64 + 0.5) / scale) as u32;
        match canvas.pixel(x.min(canvas.width() - 1), y) {
            Some([r, g, b, _]) => Color::Rgb(r, g, b),
            None => Color::Reset,
        }
    };

    let mut lines = Vec::with_capacity(used_rows as usize);
    for row in 0..used_rows {
        let mut spans = Vec::with_capacity(used_cols as usize + 1);
        spans.push(Span::raw(pad.clone()));
        for col in 0..used_cols {
            let top = sample(col, row as u32 * 2);
            let bottom = sample(col, row as u32 * 2 + 1);
            spans.push(Span::styled(HALF_BLOCK, Style::default().fg(top).bg(bottom)));
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn render_frame_info(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Frame ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let label = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line> = Vec::new();

    match app.current_frame() {
        Some(current) => {
            lines.push(Line::from(vec![
                Span::styled("Beats: ", label),
                Span::raw(format!("{}", current.duration)),
            ]));
            lines.push(Line::from(vec![
                Span::styled("Marks: ", label),
                Span::raw(current.highlights.len().to_string()),
            ]));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Notes",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )));
            if current.notes.is_empty() {
                lines.push(Line::from(Span::styled("(silent)", label)));
            }
            for token in &current.notes {
                lines.push(note_line(token));
            }
        }
        None => lines.push(Line::from(Span::styled("No frame", label))),
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// One note token with the pitch it sounds at.
fn note_line(token: &str) -> Line<'static> {
    let detail = match Pitch::parse(token) {
        Pitch::Rest => REST_TOKEN.to_string(),
        Pitch::Note { midi } => format!("{:.1} Hz", midi_to_frequency(midi)),
        Pitch::Unknown => format!("{:.1} Hz (unparsed)", DEFAULT_FREQUENCY),
    };
    Line::from(vec![
        Span::styled(format!("{:6}", token), Style::default().fg(Color::Cyan)),
        Span::styled(detail, Style::default().fg(Color::White)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_scale_uses_tighter_axis() {
        let canvas = Canvas::new(100, 20);
        // 50 columns halve the width; 20 rows would allow 2x vertically
        assert_eq!(fit_scale(&canvas, 50, 20), 0.5);
        assert_eq!(fit_scale(&Canvas::new(0, 20), 50, 20), 0.0);
    }

    #[test]
    fn test_canvas_lines_pack_two_pixels_per_cell() {
        let mut canvas = Canvas::new(4, 4);
        canvas.clear([255, 0, 0, 255]);
        let lines = canvas_lines(&canvas, 4, 2);

        assert_eq!(lines.len(), 2);
        // Padding span plus one span per column
        assert_eq!(lines[0].spans.len(), 5);
        let cell = &lines[0].spans[1];
        assert_eq!(cell.content, HALF_BLOCK);
        assert_eq!(cell.style.fg, Some(Color::Rgb(255, 0, 0)));
        assert_eq!(cell.style.bg, Some(Color::Rgb(255, 0, 0)));
    }

    #[test]
    fn test_canvas_lines_centred() {
        let canvas = Canvas::new(4, 4);
        let lines = canvas_lines(&canvas, 10, 2);
        assert_eq!(lines[0].spans[0].content, "   ");
    }

    #[test]
    fn test_note_line_details() {
        let line = note_line("A4");
        assert_eq!(line.spans[1].content, "440.0 Hz");
        assert_eq!(note_line("rest").spans[1].content, "rest");
        assert_eq!(note_line("??").spans[1].content, "440.0 Hz (unparsed)");
    }

    #[test]
    fn test_placeholder_messages() {
        assert!(placeholder_message(None, None).starts_with("No score"));
        let loading = LoadProgress {
            loaded: 1,
            failed: 0,
            total: 3,
            newly_complete: false,
        };
        assert_eq!(
            placeholder_message(Some(RenderOutcome::Skipped(SkipReason::PageMissing)), Some(loading)),
            "Loading pages 1/3"
        );
    }
}
