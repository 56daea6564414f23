//! Transport bar rendering.
//!
//! Displays playback status, frame position, page, tempo and speed.

use crate::app::App;
use crate::playback::PlaybackState;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Renders the transport bar at the top of the screen.
///
/// # Arguments
///
/// * `frame` - The frame to render to
/// * `area` - The area to render in
/// * `app` - Application state
pub fn render_transport(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .title(" Transport ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(12), // Playback state
            Constraint::Length(18), // Frame position
            Constraint::Length(10), // Page
            Constraint::Length(12), // Tempo
            Constraint::Length(14), // Speed
            Constraint::Min(20),    // Status
        ])
        .split(inner);

    let play_status = match app.playback_state() {
        PlaybackState::Running if !app.audio_open() => Span::styled(
            " [>] SILENT ",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ),
        PlaybackState::Running => Span::styled(
            " [>] PLAY ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
        PlaybackState::Ready => Span::styled(
            " [||] READY ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        PlaybackState::Idle => Span::styled(
            " [.] IDLE ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
    };
    frame.render_widget(Paragraph::new(Line::from(play_status)), chunks[0]);

    let label = Style::default().fg(Color::DarkGray);
    let value = Style::default().fg(Color::White);

    let position = Paragraph::new(Line::from(vec![
        Span::styled("Frame: ", label),
        Span::styled(
            frame_position(app.current_index(), app.frame_count()),
            value.add_modifier(Modifier::BOLD),
        ),
    ]));
    frame.render_widget(position, chunks[1]);

    let page = app
        .current_frame()
        .map(|f| f.page_index.saturating_add(1).to_string())
        .unwrap_or_else(|| "-".to_string());
    let page_widget = Paragraph::new(Line::from(vec![
        Span::styled("Page: ", label),
        Span::styled(page, value),
    ]));
    frame.render_widget(page_widget, chunks[2]);

    let tempo = app
        .tempo()
        .map(|t| format!("{}", t))
        .unwrap_or_else(|| "-".to_string());
    let tempo_widget = Paragraph::new(Line::from(vec![
        Span::styled("BPM: ", label),
        Span::styled(tempo, value),
    ]));
    frame.render_widget(tempo_widget, chunks[3]);

    let speed_widget = Paragraph::new(Line::from(vec![
        Span::styled("Speed: ", label),
        Span::styled(format!("{:.2}x", app.speed()), value),
    ]));
    frame.render_widget(speed_widget, chunks[4]);

    let status_line = if let Some((msg, _)) = &app.status_message {
        Line::from(Span::styled(
            msg.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ))
    } else {
        Line::from(Span::styled(
            "? for help",
            Style::default().fg(Color::DarkGray),
        ))
    };
    frame.render_widget(Paragraph::new(status_line), chunks[5]);
}

/// Formats the 1-based frame position, e.g. `3 / 12`.
fn frame_position(index: usize, count: usize) -> String {
    if count == 0 {
        "- / -".to_string()
    } else {
        format!("{} / {}", index + 1, count)
    }
}
