use ratatui::{
    layout::{Alignment, Rect},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::tui::theme;

/// One-line message replacing the key hints until the next key press.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// `(key, label)` pairs shown when there is no notice.
pub type Hints = [(&'static str, &'static str)];

pub const DASHBOARD_HINTS: &Hints = &[
    ("[Enter]", "done"),
    ("[a]", "add"),
    ("[x]", "delete"),
    ("[s]", "streaks"),
    ("[o]", "order"),
    ("[?]", "help"),
    ("[Esc]", "quit"),
];

pub const RANKING_HINTS: &Hints = &[("[o]", "order"), ("[Esc]", "back")];

pub fn render(frame: &mut Frame, area: Rect, notice: Option<&Notice>, hints: &Hints) {
    let line = match notice {
        Some(Notice::Info(msg)) => Line::from(Span::styled(msg.as_str(), theme::done())),
        Some(Notice::Error(msg)) => {
            Line::from(Span::styled(format!("✗ {}", msg), theme::error()))
        }
        None => Line::from(
            hints
                .iter()
                .enumerate()
                .flat_map(|(i, (key, label))| {
                    let gap = if i == 0 { "" } else { "  " };
                    [
                        Span::styled(format!("{}{}", gap, key), theme::accent()),
                        Span::styled(format!(" {}", label), theme::dim()),
                    ]
                })
                .collect::<Vec<_>>(),
        ),
    };

    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}
