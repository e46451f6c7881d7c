use ratatui::{
    layout::{Alignment, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::tui::theme;
use crate::utils::format::progress_bar;

/// Habits completed in their current period out of all habits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
}

impl Progress {
    pub fn complete(&self) -> bool {
        self.total > 0 && self.done == self.total
    }
}

pub fn render(frame: &mut Frame, area: Rect, user_name: &str, today: &str, progress: Progress) {
    let status_style = if progress.complete() {
        theme::done().add_modifier(Modifier::BOLD)
    } else {
        theme::best()
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("habitual", theme::accent().add_modifier(Modifier::BOLD)),
            Span::styled("  ·  ", theme::dim()),
            Span::styled(user_name, theme::bold()),
            Span::styled("  ·  ", theme::dim()),
            Span::styled(today, theme::dim()),
        ]),
        Line::from(vec![
            Span::styled(
                progress_bar(progress.done as u32, progress.total as u32, 16),
                status_style,
            ),
            Span::styled(format!("  {}/{} done", progress.done, progress.total), status_style),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border(true))
        .style(theme::base());

    frame.render_widget(
        Paragraph::new(lines).block(block).alignment(Alignment::Center),
        area,
    );
}
