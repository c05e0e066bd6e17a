//! TUI rendering.

use std::time::Instant;

use ratatui::{
    prelude::*,
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use super::app::{App, Mode, StatusKind};
use super::layout::{negotiate_widths, scroll_text, PROCESS_COLUMNS};
use super::theme::Theme;

const SEARCH_PLACEHOLDER: &str = "Search processes, ports, or addresses...";

/// Columns whose text follows the horizontal scroll offset.
const SCROLLED_COLUMNS: [usize; 3] = [4, 5, 6];

pub fn draw(f: &mut Frame, app: &App, theme: &Theme) {
    let show_search = app.mode == Mode::Searching || !app.query.is_empty();
    let frame_height = if theme.borders.is_empty() { 1 } else { 3 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(frame_height), // Header
            Constraint::Length(if show_search { frame_height } else { 0 }),
            Constraint::Min(0),               // Table
            Constraint::Length(frame_height), // Footer
        ])
        .split(f.area());

    draw_header(f, app, theme, chunks[0]);
    if show_search {
        draw_search(f, app, theme, chunks[1]);
    }
    draw_table(f, app, theme, chunks[2]);
    draw_footer(f, app, theme, chunks[3]);

    if app.mode == Mode::ConfirmingKill {
        draw_confirm(f, app, theme);
    }
}

fn block(theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(theme.borders)
        .border_style(theme.border)
}

fn draw_header(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let mut title = format!(
        "Portman | {} of {} sockets",
        app.rows().len(),
        app.total()
    );

    let labels = app.filter.active_labels();
    if !labels.is_empty() {
        title.push_str(&format!(" | Filter: {}", labels.join(" + ")));
    }
    if let Some(updated) = app.updated_at {
        title.push_str(&format!(" | updated {}", updated.format("%H:%M:%S")));
    }
    if let Some(note) = app.staleness(Instant::now()) {
        title.push_str(&format!(" | {}", note));
    }

    let header = Paragraph::new(title).style(theme.title).block(block(theme));
    f.render_widget(header, area);
}

fn draw_search(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let line = if app.query.is_empty() {
        Line::from(vec![
            Span::raw("/ "),
            Span::styled(SEARCH_PLACEHOLDER, theme.muted),
        ])
    } else if app.mode == Mode::Searching {
        Line::from(format!("/ {}_", app.query))
    } else {
        Line::from(format!("/ {}", app.query))
    };

    let search = Paragraph::new(line).style(theme.search).block(block(theme));
    f.render_widget(search, area);
}

fn draw_table(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let inner = block(theme).inner(area);
    let spacing = PROCESS_COLUMNS.len().saturating_sub(1) as u16;
    let widths = negotiate_widths(&PROCESS_COLUMNS, inner.width.saturating_sub(spacing));

    let header_cells = PROCESS_COLUMNS
        .iter()
        .map(|c| Cell::from(c.title).style(theme.header));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let rows = app.rows().iter().map(|process| {
        let texts = [
            process.pid.to_string(),
            process.protocol.to_string(),
            process.port.to_string(),
            process.status.to_string(),
            process.local_addr.clone(),
            process.remote_addr.clone(),
            process.display_name().to_string(),
        ];

        let cells = texts.into_iter().enumerate().map(|(i, text)| {
            let text = if SCROLLED_COLUMNS.contains(&i) {
                scroll_text(&text, app.scroll, usize::from(widths[i]))
            } else {
                text
            };
            let cell = Cell::from(text);
            if i == 3 {
                cell.style(theme.status(&process.status))
            } else {
                cell
            }
        });

        Row::new(cells)
    });

    let constraints: Vec<Constraint> = widths.iter().map(|w| Constraint::Length(*w)).collect();
    let table = Table::new(rows, constraints)
        .header(header)
        .block(block(theme))
        .row_highlight_style(theme.selected);

    let mut state = TableState::default();
    if !app.rows().is_empty() {
        state.select(Some(app.selected));
    }

    f.render_stateful_widget(table, area, &mut state);
}

fn draw_footer(f: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let help = match app.mode {
        Mode::Searching => "Type to search | Enter: apply | Esc: clear",
        Mode::ConfirmingKill => "y/Enter: kill | n/Esc: cancel",
        Mode::Normal => {
            "j/↓ ↑: move | /: search | k: kill | t/u/l/e: filter | :: filters | c: clear | ←/h →: scroll | r: refresh | q: quit"
        }
    };

    let (text, style) = match app.status() {
        Some(message) => {
            let style = match message.kind {
                StatusKind::Info => theme.info,
                StatusKind::Error => theme.error,
            };
            (message.text.clone(), style)
        }
        None => (help.to_string(), theme.muted),
    };

    let footer = Paragraph::new(text).style(style).block(block(theme));
    f.render_widget(footer, area);
}

fn draw_confirm(f: &mut Frame, app: &App, theme: &Theme) {
    let Some(target) = app.target.as_ref() else {
        return;
    };

    let area = centered_rect(50, 10, f.area());
    let lines = vec![
        Line::from(Span::styled("Are you sure you want to kill?", theme.dialog.bold())),
        Line::from(""),
        Line::from(format!("PID: {}", target.pid)),
        Line::from(format!("Process: {}", target.name)),
        Line::from(format!("Status: {}", target.status)),
        Line::from(format!("Address: {}", target.local_addr)),
        Line::from(""),
        Line::from(Span::styled("[y] Yes   [n] No", theme.muted)),
    ];

    let dialog = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::bordered()
                .border_style(theme.dialog)
                .title(" Kill process "),
        );

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

/// A `width` x `height` rectangle centered in `area`, clipped to fit.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
