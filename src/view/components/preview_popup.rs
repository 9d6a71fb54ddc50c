use chrono::{DateTime, Utc};
use tui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Span, Spans},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::preview::{PreviewKind, PreviewSession};

/// Rectangle of `percent_x` by `percent_y` centered in `area`
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
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
        .split(vertical[1])[1]
}

fn format_remaining(seconds: i64) -> String {
    if seconds <= 0 {
        String::from("expired, select again for a new link")
    } else {
        format!("{}m {:02}s left", seconds / 60, seconds % 60)
    }
}

/// Popup describing the open preview and its signed link
pub fn make_preview(
    session: &PreviewSession,
    now: DateTime<Utc>,
    show_controls: bool,
) -> Paragraph<'static> {
    let title = match session.kind {
        PreviewKind::Video => " Video ",
        PreviewKind::Image => " Image ",
        PreviewKind::Download => " File ",
    };
    let label = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Spans::from(vec![
            Span::styled("Name: ", label),
            Span::raw(session.entry.name.clone()),
        ]),
        Spans::from(vec![
            Span::styled("Size: ", label),
            Span::raw(session.entry.size.clone().unwrap_or_default()),
        ]),
        Spans::from(vec![
            Span::styled("Link: ", label),
            Span::raw(format_remaining(session.url.remaining(now).num_seconds())),
        ]),
        Spans::from(""),
        Spans::from(Span::styled(
            session.url.url.clone(),
            Style::default().fg(Color::Cyan),
        )),
    ];
    if show_controls {
        lines.push(Spans::from(""));
        lines.push(Spans::from(Span::styled(
            "BACKSPACE close   d delete",
            Style::default().fg(Color::DarkGray),
        )));
    }
    Paragraph::new(lines)
        .block(Block::default().title(title).borders(Borders::ALL))
        .wrap(Wrap { trim: false })
}
