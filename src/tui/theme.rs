use ratatui::style::{Color, Modifier, Style};

// Slate background with a coral accent
pub const BG: Color = Color::Rgb(20, 20, 24);
pub const SURFACE: Color = Color::Rgb(30, 30, 36);
pub const BORDER: Color = Color::Rgb(62, 62, 74);
pub const TEXT: Color = Color::Rgb(228, 226, 222);
pub const TEXT_DIM: Color = Color::Rgb(128, 126, 136);
pub const CORAL: Color = Color::Rgb(255, 127, 80);
pub const MINT: Color = Color::Rgb(104, 170, 110);
pub const HONEY: Color = Color::Rgb(222, 168, 72);
pub const BRICK: Color = Color::Rgb(200, 84, 72);

/// A streak this long or longer is drawn hot.
pub const HOT_STREAK: u32 = 7;

pub fn base() -> Style {
    Style::default().fg(TEXT).bg(BG)
}

pub fn surface() -> Style {
    Style::default().fg(TEXT).bg(SURFACE)
}

pub fn dim() -> Style {
    Style::default().fg(TEXT_DIM)
}

pub fn bold() -> Style {
    Style::default().fg(TEXT).add_modifier(Modifier::BOLD)
}

pub fn accent() -> Style {
    Style::default().fg(CORAL)
}

/// Completed habits and confirmations.
pub fn done() -> Style {
    Style::default().fg(MINT)
}

/// Best streaks and pending work.
pub fn best() -> Style {
    Style::default().fg(HONEY)
}

pub fn error() -> Style {
    Style::default().fg(BRICK)
}

/// Color a current streak by its length.
pub fn streak(n: u32) -> Style {
    match n {
        0 => dim(),
        n if n >= HOT_STREAK => accent().add_modifier(Modifier::BOLD),
        _ => best(),
    }
}

pub fn border(focused: bool) -> Style {
    if focused {
        accent()
    } else {
        Style::default().fg(BORDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streak_heats_up_with_length() {
        assert_eq!(streak(0), dim());
        assert_eq!(streak(3), best());
        assert_eq!(streak(HOT_STREAK), accent().add_modifier(Modifier::BOLD));
    }
}
