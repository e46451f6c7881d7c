use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::models::RankedHabit;
use crate::streaks::RankOrder;
use crate::tui::theme;
use crate::utils::format::{pad, truncate};

pub fn render(frame: &mut Frame, area: Rect, ranked: &[RankedHabit], order: RankOrder) {
    let block = Block::default()
        .title(Span::styled(
            format!(" Ranking · {} ", order.label()),
            theme::accent(),
        ))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border(false))
        .style(theme::surface());

    // Borders take two rows
    let rows = (area.height as usize).saturating_sub(2);
    let title_width = (area.width as usize).saturating_sub(26).max(6);

    let mut lines = vec![Line::from(vec![
        Span::styled(format!("  {}", pad("", title_width + 4)), theme::dim()),
        Span::styled("  now  best  total", theme::dim()),
    ])];

    for (i, entry) in ranked.iter().take(rows.saturating_sub(1)).enumerate() {
        let style = if entry.summary.is_empty() {
            theme::dim()
        } else if i == 0 {
            theme::best().add_modifier(Modifier::BOLD)
        } else {
            theme::bold()
        };
        lines.push(Line::from(vec![
            Span::styled(format!("  {:>2}. ", i + 1), theme::dim()),
            Span::styled(pad(&truncate(&entry.habit.title, title_width), title_width), style),
            Span::styled(format!("  {:>3}", entry.summary.streak), theme::streak(entry.summary.streak)),
            Span::styled(format!("  {:>4}", entry.summary.best_streak), theme::best()),
            Span::styled(format!("  {:>5}", entry.summary.total), theme::dim()),
        ]));
    }

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}
