//! Ratatui drawing for the control surface.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
};

use crate::view::PlaybackControlView;
use crate::view_model::ControlsView;

/// Height the control surface needs, borders included.
pub const CONTROLS_HEIGHT: u16 = 8;

/// Screen geometry of the last draw, used for mouse hit testing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControlLayout {
    pub seek_bar: Rect,
}

impl ControlLayout {
    /// Seek bar fraction under a click, or `None` when the click misses the bar.
    pub fn seek_fraction(&self, column: u16, row: u16) -> Option<f64> {
        let bar = self.seek_bar;
        if bar.width == 0 || row != bar.y || column < bar.x || column >= bar.x + bar.width {
            return None;
        }
        if bar.width == 1 {
            return Some(0.0);
        }
        Some(f64::from(column - bar.x) / f64::from(bar.width - 1))
    }
}

pub fn draw(
    f: &mut Frame,
    area: Rect,
    view: &PlaybackControlView,
    skip_seconds: f64,
) -> ControlLayout {
    let vm = ControlsView::from_view(view, skip_seconds);

    let block = Block::default().borders(Borders::ALL).title("Now Playing");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let disc = if view.is_playing() { "◉" } else { "◎" };
    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("{disc} "), Style::default().fg(Color::Magenta)),
            Span::styled(vm.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ])),
        rows[0],
    );
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!("  {}", vm.author),
            Style::default().fg(Color::Gray),
        ))),
        rows[1],
    );

    let gauge = Gauge::default()
        .ratio(vm.seek_ratio)
        .label("")
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::DarkGray));
    f.render_widget(gauge, rows[2]);

    let time_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[3]);
    f.render_widget(Paragraph::new(Line::from(vm.elapsed.clone())), time_cols[0]);
    f.render_widget(
        Paragraph::new(Line::from(vm.total.clone())).alignment(Alignment::Right),
        time_cols[1],
    );

    let controls = format!(
        "⏮ {}   [ {} ]   {} ⏭     {} {}",
        vm.skip_back, vm.play_label, vm.skip_forward, vm.mute_label, vm.volume_meter
    );
    f.render_widget(
        Paragraph::new(Line::from(controls)).alignment(Alignment::Center),
        rows[4],
    );

    let status_style = if vm.has_error {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(vm.status.clone(), status_style))),
        rows[5],
    );

    ControlLayout { seek_bar: rows[2] }
}
