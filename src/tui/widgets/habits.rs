use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState},
    Frame,
};

use crate::models::Habit;
use crate::tui::theme;
use crate::utils::format::{pad, truncate};

pub struct HabitLine<'a> {
    pub habit: &'a Habit,
    /// Completed within the current day / week / month
    pub done: bool,
    pub streak: u32,
}

pub fn render(frame: &mut Frame, area: Rect, lines: &[HabitLine<'_>], focused_idx: usize) {
    let block = Block::default()
        .title(Span::styled(" Habits ", theme::accent()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border(true))
        .style(theme::surface());

    if lines.is_empty() {
        let empty = List::new(vec![
            ListItem::new(""),
            ListItem::new(Line::from(Span::styled(
                "  No habits yet. Press [a] to add one.",
                theme::dim(),
            ))),
        ])
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    // Title column takes what is left after icon, frequency and streak
    let title_width = (area.width as usize).saturating_sub(24).max(8);

    let items: Vec<ListItem> = lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            let is_focused = i == focused_idx;
            let (icon, icon_style) = if l.done {
                ("●", theme::done())
            } else {
                ("○", theme::dim())
            };
            let name_style = if is_focused {
                theme::accent().add_modifier(Modifier::BOLD)
            } else {
                theme::bold()
            };
            let title = pad(&truncate(&l.habit.title, title_width), title_width);

            ListItem::new(Line::from(vec![
                Span::styled(if is_focused { " ▸ " } else { "   " }, theme::accent()),
                Span::styled(icon, icon_style),
                Span::styled(" ", theme::dim()),
                Span::styled(title, name_style),
                Span::styled(format!(" {:<8}", l.habit.frequency.as_str()), theme::dim()),
                Span::styled(format!("🔥{:>3}", l.streak), theme::streak(l.streak)),
            ]))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(focused_idx.min(lines.len() - 1)));
    let list = List::new(items).block(block);
    frame.render_stateful_widget(list, area, &mut state);
}
