use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

/// A one-line text input with cursor and focus highlight.
pub struct TextInput<'a> {
    pub text: &'a str,
    pub cursor: usize,
    pub focused: bool,
    pub label: &'a str,
    /// Shown in the title while unfocused, e.g. which key focuses it.
    pub hint: &'a str,
}

impl Widget for TextInput<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border_color = if self.focused {
            Color::Cyan
        } else {
            Color::DarkGray
        };

        let title = if self.focused {
            format!(" {} (Enter to submit, Esc to cancel) ", self.label)
        } else {
            format!(" {} ({}) ", self.label, self.hint)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(title);

        let inner = block.inner(area);
        block.render(area, buf);

        if inner.height == 0 || inner.width == 0 {
            return;
        }

        let cursor = self.cursor.min(self.text.len());
        let (before_cursor, after_cursor) = self.text.split_at(cursor);
        let mut spans = vec![
            Span::styled("❯ ", Style::default().fg(Color::Cyan)),
            Span::raw(before_cursor),
        ];

        if self.focused {
            let cursor_char = after_cursor.chars().next().unwrap_or(' ');
            spans.push(Span::styled(
                cursor_char.to_string(),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ));
            if after_cursor.len() > cursor_char.len_utf8() {
                spans.push(Span::raw(&after_cursor[cursor_char.len_utf8()..]));
            }
        } else {
            spans.push(Span::raw(after_cursor));
        }

        let line = Line::from(spans);
        buf.set_line(inner.x, inner.y, &line, inner.width);
    }
}
