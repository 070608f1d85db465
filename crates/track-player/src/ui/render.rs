use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use playback_view::render::CONTROLS_HEIGHT;

use super::app::App;

const CONTROLS_MAX_WIDTH: u16 = 72;

pub(crate) fn draw(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(CONTROLS_HEIGHT),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    let width = rows[1].width.min(CONTROLS_MAX_WIDTH);
    let controls_area = Rect {
        x: rows[1].x + (rows[1].width - width) / 2,
        width,
        ..rows[1]
    };
    app.layout =
        playback_view::render::draw(f, controls_area, &app.view, app.controls.skip_seconds);

    f.render_widget(
        Paragraph::new(Line::from(
            "keys: Space play/pause | ←/→ skip | m mute | +/- volume | 0-9 seek | click bar | l logs | q quit",
        ))
        .style(Style::default().fg(Color::DarkGray)),
        rows[3],
    );

    if app.logs_open {
        draw_logs(f, app);
    }
}

fn draw_logs(f: &mut Frame, app: &App) {
    let area = centered_rect(90, 80, f.area());
    f.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Logs (Esc to close, ↑/↓ scroll)");
    let height = block.inner(area).height as usize;
    let end = app.logs.len().saturating_sub(app.logs_scroll);
    let start = end.saturating_sub(height);

    let mut items: Vec<ListItem> = app
        .logs
        .range(start..end)
        .map(|line| ListItem::new(line.as_str()))
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("<no logs>"));
    }
    f.render_widget(List::new(items).block(block), area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
