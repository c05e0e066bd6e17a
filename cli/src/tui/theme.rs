//! Colors and border settings for the renderer.

use portman_core::ConnectionStatus;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Borders;

/// Presentation constants handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub title: Style,
    pub header: Style,
    pub selected: Style,
    pub border: Style,
    pub muted: Style,
    pub info: Style,
    pub error: Style,
    pub search: Style,
    pub dialog: Style,
    pub borders: Borders,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            title: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            header: Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).fg(Color::White),
            border: Style::default().fg(Color::DarkGray),
            muted: Style::default().fg(Color::DarkGray),
            info: Style::default().fg(Color::Green),
            error: Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            search: Style::default().fg(Color::White),
            dialog: Style::default().fg(Color::Red),
            borders: Borders::ALL,
        }
    }
}

impl Theme {
    /// The default theme, optionally without box borders.
    pub fn new(hide_borders: bool) -> Self {
        let theme = Self::default();
        if hide_borders {
            Self {
                borders: Borders::NONE,
                ..theme
            }
        } else {
            theme
        }
    }

    /// Accent for a connection state in the STATUS column.
    pub fn status(&self, status: &ConnectionStatus) -> Style {
        match status {
            ConnectionStatus::Listen => Style::default().fg(Color::Green),
            ConnectionStatus::Established => Style::default().fg(Color::Blue),
            ConnectionStatus::Active => Style::default().fg(Color::Magenta),
            ConnectionStatus::TimeWait
            | ConnectionStatus::CloseWait
            | ConnectionStatus::FinWait1
            | ConnectionStatus::FinWait2
            | ConnectionStatus::LastAck
            | ConnectionStatus::Closing
            | ConnectionStatus::Closed => self.muted,
            _ => Style::default(),
        }
    }
}
