//! Small UI building blocks shared by the screens and popups

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Span,
};

/// Box title, bold when the box holds the selection
pub fn section_title(title: &str, active: bool, active_color: Color, inactive_color: Color) -> Span<'static> {
    let style = if active {
        Style::default().fg(active_color).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive_color)
    };
    Span::styled(format!(" {} ", title), style)
}

/// `key action │ ` pair for footers and popups
pub fn key_hint(key: &str, action: &str, key_color: Color, action_color: Color) -> Vec<Span<'static>> {
    vec![
        Span::styled(key.to_string(), Style::default().fg(key_color)),
        Span::styled(format!(" {} │ ", action), Style::default().fg(action_color)),
    ]
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
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
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_is_inside() {
        let outer = Rect::new(0, 0, 100, 40);
        let inner = centered_rect(50, 50, outer);
        assert_eq!(inner.width, 50);
        assert_eq!(inner.height, 20);
        assert_eq!(inner.x, 25);
        assert_eq!(inner.y, 10);
    }
}
