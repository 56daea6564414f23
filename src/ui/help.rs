//! Help overlay rendering.
//!
//! Displays keyboard shortcuts in a modal overlay.

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;

/// Key binding entry for the help display.
struct KeyBinding {
    key: &'static str,
    description: &'static str,
}

const PLAYBACK_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Space",
        description: "Play / Pause",
    },
    KeyBinding {
        key: "r",
        description: "Reset to the first frame",
    },
    KeyBinding {
        key: "+ / =",
        description: "Play faster",
    },
    KeyBinding {
        key: "-",
        description: "Play slower",
    },
];

const GENERAL_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "o",
        description: "Reload analysis and page images",
    },
    KeyBinding {
        key: "?",
        description: "Toggle this help",
    },
    KeyBinding {
        key: "q / Esc",
        description: "Quit",
    },
    KeyBinding {
        key: "Ctrl+C",
        description: "Force quit",
    },
];

/// Builds the help text, one section per binding group.
fn help_lines() -> Vec<Line<'static>> {
    let section_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default().fg(Color::White);

    let mut lines = Vec::new();
    for (title, bindings) in [("Playback", PLAYBACK_BINDINGS), ("General", GENERAL_BINDINGS)] {
        lines.push(Line::from(Span::styled(title, section_style)));
        for binding in bindings {
            lines.push(Line::from(vec![
                Span::styled(format!("{:15}", binding.key), key_style),
                Span::styled(binding.description, desc_style),
            ]));
        }
        lines.push(Line::from(""));
    }
    lines
}

/// Renders the help overlay.
///
/// # Arguments
///
/// * `frame` - The frame to render to
pub fn render_help(frame: &mut Frame) {
    let area = centered_rect(60, 60, frame.area());

    // Clear the area behind the popup
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Help - Keyboard Shortcuts ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Content
            Constraint::Length(1), // Fixed footer
        ])
        .split(inner);

    frame.render_widget(Paragraph::new(help_lines()), chunks[0]);

    let footer = Paragraph::new(Line::from(Span::styled(
        "Press ? or Esc to close",
        Style::default().fg(Color::DarkGray),
    )));
    frame.render_widget(footer, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_lists_every_binding() {
        let lines = help_lines();
        // Two headers, two spacers, one line per binding
        assert_eq!(
            lines.len(),
            4 + PLAYBACK_BINDINGS.len() + GENERAL_BINDINGS.len()
        );
        assert_eq!(lines[0].spans[0].content, "Playback");
    }
}
