use diarist_core::nav::{Section, ALL_SECTIONS};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

/// Top bar with one tab per section and a busy marker.
pub struct TabBar {
    pub current: Section,
    pub loading: bool,
}

impl Widget for TabBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut spans: Vec<Span> = vec![Span::styled(
            " diarist ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )];
        spans.push(Span::raw(" "));

        for (i, section) in ALL_SECTIONS.iter().enumerate() {
            let style = if *section == self.current {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            spans.push(Span::styled(
                format!(" {} {} ", i + 1, section.title()),
                style,
            ));

            if i < ALL_SECTIONS.len() - 1 {
                spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
            }
        }

        if self.loading {
            spans.push(Span::styled(
                "  ⟳ working...",
                Style::default().fg(Color::Yellow),
            ));
        }

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
