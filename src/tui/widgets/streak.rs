use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};

use crate::models::{Habit, StreakSummary};
use crate::tui::theme;
use crate::utils::format::{format_streak, progress_bar};

/// Badges for the focused habit. The bar fills as the current streak
/// approaches the best one.
pub fn render(frame: &mut Frame, area: Rect, focused: Option<(&Habit, &StreakSummary)>) {
    let block = Block::default()
        .title(Span::styled(" Streak ", theme::accent()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border(false))
        .style(theme::surface());

    let Some((habit, summary)) = focused else {
        let paragraph = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled("  Nothing selected", theme::dim())),
        ])
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let bar = progress_bar(summary.streak, summary.best_streak, 12);
    let text = vec![
        Line::from(Span::styled(format!("  {}", habit.title), theme::bold())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  ", theme::dim()),
            Span::styled(bar, theme::done()),
            Span::styled(
                format!("  {}", format_streak(summary.streak, habit.frequency)),
                theme::done().add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Best: ", theme::dim()),
            Span::styled(format_streak(summary.best_streak, habit.frequency), theme::best()),
            Span::styled("  ·  Total: ", theme::dim()),
            Span::styled(summary.total.to_string(), theme::bold()),
        ]),
        Line::from(Span::styled(
            if habit.description.is_empty() {
                String::new()
            } else {
                format!("  {}", habit.description)
            },
            theme::dim(),
        )),
    ];

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
