use chrono::{DateTime, FixedOffset, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::models::{Frequency, StreakSummary};

/// "3 days", "1 week"
pub fn format_streak(n: u32, frequency: Frequency) -> String {
    format!("{} {}", n, frequency.unit(n))
}

/// The three badges shown for a habit: current, best, total.
pub fn format_badges(summary: &StreakSummary, frequency: Frequency) -> String {
    format!(
        "🔥 {}  ·  🏆 {}  ·  ✓ {}",
        format_streak(summary.streak, frequency),
        format_streak(summary.best_streak, frequency),
        summary.total
    )
}

/// Local "YYYY-MM-DD HH:MM", or "never".
pub fn format_when(ts: Option<&DateTime<Utc>>, offset: FixedOffset) -> String {
    match ts {
        Some(ts) => ts.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string(),
        None => "never".to_string(),
    }
}

/// Cut `s` to at most `width` terminal columns, marking the cut with "…".
pub fn truncate(s: &str, width: usize) -> String {
    if UnicodeWidthStr::width(s) <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Pad `s` with spaces to `width` columns (no truncation).
pub fn pad(s: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(s);
    format!("{}{}", s, " ".repeat(width.saturating_sub(w)))
}

/// Create a simple ASCII progress bar
pub fn progress_bar(filled: u32, total: u32, width: usize) -> String {
    if total == 0 {
        return "░".repeat(width);
    }
    let ratio = (filled as f64 / total as f64).min(1.0);
    let filled_count = (ratio * width as f64).round() as usize;
    let empty_count = width.saturating_sub(filled_count);
    format!("{}{}", "█".repeat(filled_count), "░".repeat(empty_count))
}
