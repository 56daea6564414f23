//! Terminal user interface components.
//!
//! This module provides the visual components for the player: the transport
//! bar, the page view with its frame panel, and the help overlay.

mod help;
mod transport;
mod viewport;

use crate::app::App;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::Frame;

pub use help::render_help;
pub use transport::render_transport;
pub use viewport::render_viewport;

/// Renders the complete UI layout.
///
/// The layout is divided into:
/// - Top: Transport bar with playback state, position, tempo and speed
/// - Center: Magnified page view and frame panel
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Transport
            Constraint::Min(8),    // Page view
        ])
        .split(frame.area());

    render_transport(frame, chunks[0], app);
    render_viewport(frame, chunks[1], app);

    if app.show_help {
        render_help(frame);
    }
}

/// Helper function to center a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
